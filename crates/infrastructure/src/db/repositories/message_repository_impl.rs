//! 消息 Repository 的 PostgreSQL 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use application::{MessageRepository, NewMessage};
use domain::{
    ChatId, Message, MessageId, MessageText, RepositoryError, UserId, UserProfile, Username,
};

use super::map_sqlx_error;
use crate::db::DbPool;

#[derive(Debug, FromRow)]
struct DbMessage {
    id: i64,
    chat_id: i64,
    text: String,
    created_at: DateTime<Utc>,
    author_id: i64,
    author_username: String,
}

impl TryFrom<DbMessage> for Message {
    type Error = RepositoryError;

    fn try_from(row: DbMessage) -> Result<Self, Self::Error> {
        Ok(Message {
            id: MessageId(row.id),
            chat_id: ChatId(row.chat_id),
            text: MessageText::parse(row.text)
                .map_err(|err| RepositoryError::storage(format!("corrupt message text: {err}")))?,
            author: UserProfile {
                id: UserId(row.author_id),
                username: Username::parse(row.author_username)
                    .map_err(|err| RepositoryError::storage(format!("corrupt username: {err}")))?,
            },
            created_at: row.created_at,
        })
    }
}

pub struct PgMessageRepository {
    pool: DbPool,
}

impl PgMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let row: DbMessage = sqlx::query_as(
            "WITH inserted AS (
                 INSERT INTO messages (chat_id, author_id, text, created_at)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id, chat_id, author_id, text, created_at
             )
             SELECT i.id, i.chat_id, i.text, i.created_at,
                    u.id AS author_id, u.username AS author_username
             FROM inserted i
             JOIN users u ON u.id = i.author_id",
        )
        .bind(i64::from(message.chat_id))
        .bind(i64::from(message.author_id))
        .bind(message.text.as_str())
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.try_into()
    }

    async fn list_for_chat(&self, chat_id: ChatId) -> Result<Vec<Message>, RepositoryError> {
        let rows: Vec<DbMessage> = sqlx::query_as(
            "SELECT m.id, m.chat_id, m.text, m.created_at,
                    u.id AS author_id, u.username AS author_username
             FROM messages m
             JOIN users u ON u.id = m.author_id
             WHERE m.chat_id = $1
             ORDER BY m.id",
        )
        .bind(i64::from(chat_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let row: Option<DbMessage> = sqlx::query_as(
            "SELECT m.id, m.chat_id, m.text, m.created_at,
                    u.id AS author_id, u.username AS author_username
             FROM messages m
             JOIN users u ON u.id = m.author_id
             WHERE m.id = $1",
        )
        .bind(i64::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TryInto::try_into).transpose()
    }
}
