use std::sync::Arc;

use application::{MessageRelay, RoomRegistry, SessionRouter};
use application::services::{ChatService, UserService};

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub chat_service: Arc<ChatService>,
    pub registry: Arc<RoomRegistry>,
    pub router: Arc<SessionRouter>,
    pub relay: Arc<MessageRelay>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(
        user_service: Arc<UserService>,
        chat_service: Arc<ChatService>,
        registry: Arc<RoomRegistry>,
        router: Arc<SessionRouter>,
        relay: Arc<MessageRelay>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            user_service,
            chat_service,
            registry,
            router,
            relay,
            jwt_service,
        }
    }
}
