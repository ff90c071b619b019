//! 主应用程序入口
//!
//! 启动 Axum Web API 服务。

use std::sync::Arc;

use application::{
    services::{ChatService, ChatServiceDependencies, UserService, UserServiceDependencies},
    MessageRelay, MessageRelayDependencies, RoomRegistry, SessionRouter, SystemClock,
};
use config::AppConfig;
use infrastructure::{
    create_pg_pool, BcryptPasswordHasher, PgChatRepository, PgMessageRepository, PgUserRepository,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 严格模式：DATABASE_URL / JWT_SECRET 缺失直接拒绝启动，
    // 不会落到开发用默认密钥上
    let config = AppConfig::from_env()?;

    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').next_back().unwrap_or("unknown")
    );

    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // 仓储
    let user_repository = Arc::new(PgUserRepository::new(pg_pool.clone()));
    let chat_repository = Arc::new(PgChatRepository::new(pg_pool.clone()));
    let message_repository = Arc::new(PgMessageRepository::new(pg_pool));

    let password_hasher: Arc<dyn application::PasswordHasher> =
        Arc::new(match config.server.bcrypt_cost {
            Some(cost) => BcryptPasswordHasher::new(cost),
            None => BcryptPasswordHasher::default(),
        });
    let clock: Arc<dyn application::Clock> = Arc::new(SystemClock);

    // 应用层服务
    let user_service = UserService::new(UserServiceDependencies {
        user_repository: user_repository.clone(),
        password_hasher,
        clock: clock.clone(),
    });

    let chat_service = ChatService::new(ChatServiceDependencies {
        chat_repository,
        user_repository,
        message_repository: message_repository.clone(),
        clock: clock.clone(),
    });

    // 实时层：注册表、路由器、消息中继
    let registry = Arc::new(RoomRegistry::new());
    let session_router = Arc::new(SessionRouter::new());
    let relay = Arc::new(MessageRelay::new(MessageRelayDependencies {
        registry: registry.clone(),
        router: session_router.clone(),
        message_repository,
        clock,
    }));

    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));

    let state = AppState::new(
        Arc::new(user_service),
        Arc::new(chat_service),
        registry,
        session_router,
        relay,
        jwt_service,
    );

    // 启动 Web 服务器
    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("聊天服务器启动在 http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
