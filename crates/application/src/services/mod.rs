mod chat_service;
mod user_service;

pub use chat_service::{ChatService, ChatServiceDependencies, CreateChatRequest, InviteMemberRequest};
pub use user_service::{AuthenticateUserRequest, RegisterUserRequest, UserService, UserServiceDependencies};
