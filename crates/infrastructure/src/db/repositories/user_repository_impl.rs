//! 用户 Repository 的 PostgreSQL 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use application::UserRepository;
use domain::{RepositoryError, Timestamp, User, UserId, Username};

use super::map_sqlx_error;
use crate::db::DbPool;

#[derive(Debug, FromRow)]
struct DbUser {
    id: i64,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<DbUser> for User {
    type Error = RepositoryError;

    fn try_from(row: DbUser) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId(row.id),
            username: Username::parse(row.username)
                .map_err(|err| RepositoryError::storage(format!("corrupt username: {err}")))?,
            password_hash: row.password_hash,
            created_at: row.created_at,
        })
    }
}

pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(
        &self,
        username: Username,
        password_hash: String,
        now: Timestamp,
    ) -> Result<User, RepositoryError> {
        let row: DbUser = sqlx::query_as(
            "INSERT INTO users (username, password_hash, created_at)
             VALUES ($1, $2, $3)
             RETURNING id, username, password_hash, created_at",
        )
        .bind(username.as_str())
        .bind(&password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.try_into()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<DbUser> = sqlx::query_as(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(i64::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<User>, RepositoryError> {
        let row: Option<DbUser> = sqlx::query_as(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TryInto::try_into).transpose()
    }
}
