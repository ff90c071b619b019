use std::sync::Arc;

use application::repository::memory::{
    MemoryChatRepository, MemoryMessageRepository, MemoryUserRepository,
};
use application::services::{
    ChatService, ChatServiceDependencies, UserService, UserServiceDependencies,
};
use application::{MessageRelay, MessageRelayDependencies, RoomRegistry, SessionRouter, SystemClock};
use axum::Router;
use infrastructure::BcryptPasswordHasher;
use web_api::{router as build_router_fn, AppState, JwtConfig, JwtService};

/// 在内存仓储上组装完整路由，测试不依赖外部数据库。
pub async fn build_router() -> Router {
    let user_repository = Arc::new(MemoryUserRepository::new());
    let chat_repository = Arc::new(MemoryChatRepository::new(user_repository.clone()));
    let message_repository = Arc::new(MemoryMessageRepository::new(user_repository.clone()));

    // 低 cost 让测试保持快速
    let password_hasher: Arc<dyn application::PasswordHasher> =
        Arc::new(BcryptPasswordHasher::new(4));
    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock);

    let user_service = UserService::new(UserServiceDependencies {
        user_repository: user_repository.clone(),
        password_hasher,
        clock: clock.clone(),
    });

    let chat_service = ChatService::new(ChatServiceDependencies {
        chat_repository: chat_repository.clone(),
        user_repository: user_repository.clone(),
        message_repository: message_repository.clone(),
        clock: clock.clone(),
    });

    let registry = Arc::new(RoomRegistry::new());
    let router = Arc::new(SessionRouter::new());
    let relay = Arc::new(MessageRelay::new(MessageRelayDependencies {
        registry: registry.clone(),
        router: router.clone(),
        message_repository,
        clock,
    }));

    let jwt_service = Arc::new(JwtService::new(JwtConfig {
        secret: "test-secret-key".to_string(),
        expiration_hours: 24,
    }));

    let state = AppState::new(
        Arc::new(user_service),
        Arc::new(chat_service),
        registry,
        router,
        relay,
        jwt_service,
    );

    build_router_fn(state)
}
