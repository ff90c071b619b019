//! 聊天服务核心领域模型
//!
//! 包含用户、聊天室、消息、连接会话等核心实体，不依赖任何传输或存储细节。

pub mod chat;
pub mod errors;
pub mod message;
pub mod session;
pub mod user;
pub mod value_objects;

pub use chat::Chat;
pub use errors::{DomainError, RepositoryError};
pub use message::Message;
pub use session::{ClientEvent, Session, SessionCommand, SessionPhase};
pub use user::{User, UserProfile};
pub use value_objects::{ChatId, MessageId, MessageText, SessionId, Timestamp, UserId, Username};
