mod chat_repository_impl;
mod message_repository_impl;
mod user_repository_impl;

pub use chat_repository_impl::PgChatRepository;
pub use message_repository_impl::PgMessageRepository;
pub use user_repository_impl::PgUserRepository;

use domain::RepositoryError;

/// PostgreSQL 唯一约束冲突的 SQLSTATE。
const UNIQUE_VIOLATION: &str = "23505";

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            RepositoryError::Conflict
        }
        _ => RepositoryError::storage_with_source("database query failed", err),
    }
}
