//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务：房间注册表、消息中继、会话路由，
//! 以及对外部适配器（密码哈希、持久层、时钟）的抽象。

pub mod clock;
pub mod dto;
pub mod error;
pub mod events;
pub mod password;
pub mod registry;
pub mod relay;
pub mod repository;
pub mod router;
pub mod services;

pub use clock::{Clock, SystemClock};
pub use dto::{ChatDto, MessageDto, UserDto};
pub use error::ApplicationError;
pub use events::ServerEvent;
pub use password::{PasswordHasher, PasswordHasherError};
pub use registry::RoomRegistry;
pub use relay::{MessageError, MessageRelay, MessageRelayDependencies};
pub use repository::{ChatRepository, MessageRepository, NewMessage, UserRepository};
pub use router::SessionRouter;
pub use services::{
    AuthenticateUserRequest, ChatService, ChatServiceDependencies, CreateChatRequest,
    InviteMemberRequest, RegisterUserRequest, UserService, UserServiceDependencies,
};
