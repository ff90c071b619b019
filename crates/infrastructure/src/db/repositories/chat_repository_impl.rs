//! 聊天室 Repository 的 PostgreSQL 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use application::ChatRepository;
use domain::{Chat, ChatId, RepositoryError, Timestamp, UserId, UserProfile, Username};

use super::map_sqlx_error;
use crate::db::DbPool;

#[derive(Debug, FromRow)]
struct DbChat {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<DbChat> for Chat {
    fn from(row: DbChat) -> Self {
        Chat {
            id: ChatId(row.id),
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct DbMember {
    id: i64,
    username: String,
}

impl TryFrom<DbMember> for UserProfile {
    type Error = RepositoryError;

    fn try_from(row: DbMember) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            id: UserId(row.id),
            username: Username::parse(row.username)
                .map_err(|err| RepositoryError::storage(format!("corrupt username: {err}")))?,
        })
    }
}

pub struct PgChatRepository {
    pool: DbPool,
}

impl PgChatRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn create(
        &self,
        name: String,
        creator: UserId,
        now: Timestamp,
    ) -> Result<Chat, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let row: DbChat = sqlx::query_as(
            "INSERT INTO chats (name, created_at) VALUES ($1, $2)
             RETURNING id, name, created_at",
        )
        .bind(&name)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query("INSERT INTO chat_members (chat_id, user_id, joined_at) VALUES ($1, $2, $3)")
            .bind(row.id)
            .bind(i64::from(creator))
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError> {
        let row: Option<DbChat> =
            sqlx::query_as("SELECT id, name, created_at FROM chats WHERE id = $1")
                .bind(i64::from(id))
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Chat>, RepositoryError> {
        let rows: Vec<DbChat> = sqlx::query_as(
            "SELECT c.id, c.name, c.created_at
             FROM chats c
             JOIN chat_members m ON m.chat_id = c.id
             WHERE m.user_id = $1
             ORDER BY c.id",
        )
        .bind(i64::from(user_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn members(&self, chat_id: ChatId) -> Result<Vec<UserProfile>, RepositoryError> {
        let rows: Vec<DbMember> = sqlx::query_as(
            "SELECT u.id, u.username
             FROM users u
             JOIN chat_members m ON m.user_id = u.id
             WHERE m.chat_id = $1
             ORDER BY m.joined_at, u.id",
        )
        .bind(i64::from(chat_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn add_member(&self, chat_id: ChatId, user_id: UserId) -> Result<(), RepositoryError> {
        // 幂等：重复邀请同一成员直接忽略
        sqlx::query(
            "INSERT INTO chat_members (chat_id, user_id) VALUES ($1, $2)
             ON CONFLICT (chat_id, user_id) DO NOTHING",
        )
        .bind(i64::from(chat_id))
        .bind(i64::from(user_id))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn is_member(&self, chat_id: ChatId, user_id: UserId) -> Result<bool, RepositoryError> {
        let exists: Option<(i32,)> = sqlx::query_as(
            "SELECT 1 FROM chat_members WHERE chat_id = $1 AND user_id = $2",
        )
        .bind(i64::from(chat_id))
        .bind(i64::from(user_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(exists.is_some())
    }
}
