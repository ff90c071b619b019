//! 持久化网关抽象。
//!
//! 实时核心只通过这些 trait 访问用户、聊天室和消息的持久存储；
//! 具体实现（PostgreSQL）位于 infrastructure crate。

use async_trait::async_trait;
use domain::{
    Chat, ChatId, Message, MessageId, MessageText, RepositoryError, Timestamp, User, UserId,
    UserProfile, Username,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// 创建用户；用户名冲突返回 `RepositoryError::Conflict`。
    async fn create(
        &self,
        username: Username,
        password_hash: String,
        now: Timestamp,
    ) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_username(&self, username: &Username)
        -> Result<Option<User>, RepositoryError>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// 创建聊天室并把创建者写入成员列表。
    async fn create(
        &self,
        name: String,
        creator: UserId,
        now: Timestamp,
    ) -> Result<Chat, RepositoryError>;
    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError>;
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Chat>, RepositoryError>;
    async fn members(&self, chat_id: ChatId) -> Result<Vec<UserProfile>, RepositoryError>;
    /// 幂等：重复添加同一成员是 no-op。
    async fn add_member(&self, chat_id: ChatId, user_id: UserId) -> Result<(), RepositoryError>;
    async fn is_member(&self, chat_id: ChatId, user_id: UserId) -> Result<bool, RepositoryError>;
}

/// 待持久化的消息。id 由存储在插入时分配。
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: ChatId,
    pub author_id: UserId,
    pub text: MessageText,
    pub created_at: Timestamp,
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 持久化消息并返回完整记录（含分配的 id 和作者公开资料）。
    async fn create(&self, message: NewMessage) -> Result<Message, RepositoryError>;
    /// 按创建顺序返回聊天室历史。
    async fn list_for_chat(&self, chat_id: ChatId) -> Result<Vec<Message>, RepositoryError>;
    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;
}

/// 内存实现的持久化网关（用于测试和本地开发）。
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    pub struct MemoryUserRepository {
        users: RwLock<HashMap<UserId, User>>,
        next_id: AtomicI64,
    }

    impl MemoryUserRepository {
        pub fn new() -> Self {
            Self {
                users: RwLock::new(HashMap::new()),
                next_id: AtomicI64::new(1),
            }
        }
    }

    #[async_trait]
    impl UserRepository for MemoryUserRepository {
        async fn create(
            &self,
            username: Username,
            password_hash: String,
            now: Timestamp,
        ) -> Result<User, RepositoryError> {
            let mut users = self.users.write().await;
            if users.values().any(|u| u.username == username) {
                return Err(RepositoryError::Conflict);
            }
            let id = UserId(self.next_id.fetch_add(1, Ordering::SeqCst));
            let user = User {
                id,
                username,
                password_hash,
                created_at: now,
            };
            users.insert(id, user.clone());
            Ok(user)
        }

        async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
            Ok(self.users.read().await.get(&id).cloned())
        }

        async fn find_by_username(
            &self,
            username: &Username,
        ) -> Result<Option<User>, RepositoryError> {
            Ok(self
                .users
                .read()
                .await
                .values()
                .find(|u| &u.username == username)
                .cloned())
        }
    }

    pub struct MemoryChatRepository {
        chats: RwLock<HashMap<ChatId, Chat>>,
        // 成员按加入顺序保存
        members: RwLock<HashMap<ChatId, Vec<UserId>>>,
        users: Arc<MemoryUserRepository>,
        next_id: AtomicI64,
    }

    impl MemoryChatRepository {
        pub fn new(users: Arc<MemoryUserRepository>) -> Self {
            Self {
                chats: RwLock::new(HashMap::new()),
                members: RwLock::new(HashMap::new()),
                users,
                next_id: AtomicI64::new(1),
            }
        }
    }

    #[async_trait]
    impl ChatRepository for MemoryChatRepository {
        async fn create(
            &self,
            name: String,
            creator: UserId,
            now: Timestamp,
        ) -> Result<Chat, RepositoryError> {
            let id = ChatId(self.next_id.fetch_add(1, Ordering::SeqCst));
            let chat = Chat {
                id,
                name,
                created_at: now,
            };
            self.chats.write().await.insert(id, chat.clone());
            self.members.write().await.insert(id, vec![creator]);
            Ok(chat)
        }

        async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, RepositoryError> {
            Ok(self.chats.read().await.get(&id).cloned())
        }

        async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Chat>, RepositoryError> {
            let members = self.members.read().await;
            let chats = self.chats.read().await;
            let mut result: Vec<Chat> = members
                .iter()
                .filter(|(_, users)| users.contains(&user_id))
                .filter_map(|(chat_id, _)| chats.get(chat_id).cloned())
                .collect();
            result.sort_by_key(|c| i64::from(c.id));
            Ok(result)
        }

        async fn members(&self, chat_id: ChatId) -> Result<Vec<UserProfile>, RepositoryError> {
            let member_ids = self
                .members
                .read()
                .await
                .get(&chat_id)
                .cloned()
                .ok_or(RepositoryError::NotFound)?;
            let mut profiles = Vec::with_capacity(member_ids.len());
            for id in member_ids {
                if let Some(user) = self.users.find_by_id(id).await? {
                    profiles.push(user.profile());
                }
            }
            Ok(profiles)
        }

        async fn add_member(
            &self,
            chat_id: ChatId,
            user_id: UserId,
        ) -> Result<(), RepositoryError> {
            let mut members = self.members.write().await;
            let entry = members.get_mut(&chat_id).ok_or(RepositoryError::NotFound)?;
            if !entry.contains(&user_id) {
                entry.push(user_id);
            }
            Ok(())
        }

        async fn is_member(
            &self,
            chat_id: ChatId,
            user_id: UserId,
        ) -> Result<bool, RepositoryError> {
            Ok(self
                .members
                .read()
                .await
                .get(&chat_id)
                .map(|users| users.contains(&user_id))
                .unwrap_or(false))
        }
    }

    pub struct MemoryMessageRepository {
        messages: RwLock<Vec<Message>>,
        users: Arc<MemoryUserRepository>,
        next_id: AtomicI64,
    }

    impl MemoryMessageRepository {
        pub fn new(users: Arc<MemoryUserRepository>) -> Self {
            Self {
                messages: RwLock::new(Vec::new()),
                users,
                next_id: AtomicI64::new(1),
            }
        }
    }

    #[async_trait]
    impl MessageRepository for MemoryMessageRepository {
        async fn create(&self, message: NewMessage) -> Result<Message, RepositoryError> {
            let author = self
                .users
                .find_by_id(message.author_id)
                .await?
                .ok_or(RepositoryError::NotFound)?;
            let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
            let stored = Message {
                id,
                chat_id: message.chat_id,
                text: message.text,
                author: author.profile(),
                created_at: message.created_at,
            };
            self.messages.write().await.push(stored.clone());
            Ok(stored)
        }

        async fn list_for_chat(&self, chat_id: ChatId) -> Result<Vec<Message>, RepositoryError> {
            Ok(self
                .messages
                .read()
                .await
                .iter()
                .filter(|m| m.chat_id == chat_id)
                .cloned()
                .collect())
        }

        async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
            Ok(self
                .messages
                .read()
                .await
                .iter()
                .find(|m| m.id == id)
                .cloned())
        }
    }
}
