//! 基础设施层：持久化网关与凭证服务的具体实现。

pub mod db;
pub mod password;

pub use db::repositories::{PgChatRepository, PgMessageRepository, PgUserRepository};
pub use db::{create_pg_pool, DbPool};
pub use password::BcryptPasswordHasher;
