use std::sync::Arc;

use domain::{ChatId, DomainError, UserId, Username};

use crate::{
    clock::Clock,
    dto::{ChatDto, MessageDto, UserDto},
    error::ApplicationError,
    repository::{ChatRepository, MessageRepository, UserRepository},
};

#[derive(Debug, Clone)]
pub struct CreateChatRequest {
    pub name: String,
    pub creator_id: UserId,
}

#[derive(Debug, Clone)]
pub struct InviteMemberRequest {
    pub chat_id: ChatId,
    /// 邀请人（从 JWT 获取）
    pub inviter_id: UserId,
    /// 被邀请人的用户名
    pub username: String,
}

pub struct ChatServiceDependencies {
    pub chat_repository: Arc<dyn ChatRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn create_chat(&self, request: CreateChatRequest) -> Result<ChatDto, ApplicationError> {
        let name = request.name.trim().to_owned();
        if name.is_empty() {
            return Err(DomainError::invalid_argument("name", "cannot be empty").into());
        }

        let now = self.deps.clock.now();
        let chat = self
            .deps
            .chat_repository
            .create(name, request.creator_id, now)
            .await?;
        let users = self.member_dtos(chat.id).await?;

        tracing::info!(chat_id = %chat.id, creator = %request.creator_id, "chat created");
        Ok(ChatDto::new(&chat, users, None))
    }

    pub async fn list_chats(&self, user_id: UserId) -> Result<Vec<ChatDto>, ApplicationError> {
        let chats = self.deps.chat_repository.list_for_user(user_id).await?;
        let mut dtos = Vec::with_capacity(chats.len());
        for chat in &chats {
            let users = self.member_dtos(chat.id).await?;
            dtos.push(ChatDto::new(chat, users, None));
        }
        Ok(dtos)
    }

    /// 聊天室详情：成员资料 + 按创建顺序的消息历史。
    pub async fn get_chat(&self, chat_id: ChatId) -> Result<ChatDto, ApplicationError> {
        let chat = self
            .deps
            .chat_repository
            .find_by_id(chat_id)
            .await?
            .ok_or(ApplicationError::Domain(DomainError::ChatNotFound))?;
        let users = self.member_dtos(chat_id).await?;
        let messages = self
            .deps
            .message_repository
            .list_for_chat(chat_id)
            .await?
            .iter()
            .map(MessageDto::from)
            .collect();
        Ok(ChatDto::new(&chat, users, Some(messages)))
    }

    /// 只有现有成员可以邀请；这是实时层 join 信任的授权边界。
    pub async fn invite(&self, request: InviteMemberRequest) -> Result<(), ApplicationError> {
        let is_member = self
            .deps
            .chat_repository
            .is_member(request.chat_id, request.inviter_id)
            .await?;
        if !is_member {
            return Err(ApplicationError::Authorization);
        }

        let username = Username::parse(request.username)?;
        let invitee = self
            .deps
            .user_repository
            .find_by_username(&username)
            .await?
            .ok_or(ApplicationError::Domain(DomainError::UserNotFound))?;

        self.deps
            .chat_repository
            .add_member(request.chat_id, invitee.id)
            .await?;

        tracing::info!(chat_id = %request.chat_id, invitee = %invitee.id, "member invited");
        Ok(())
    }

    async fn member_dtos(&self, chat_id: ChatId) -> Result<Vec<UserDto>, ApplicationError> {
        Ok(self
            .deps
            .chat_repository
            .members(chat_id)
            .await?
            .iter()
            .map(UserDto::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::repository::memory::{
        MemoryChatRepository, MemoryMessageRepository, MemoryUserRepository,
    };
    use crate::repository::NewMessage;
    use domain::MessageText;

    struct Harness {
        users: Arc<MemoryUserRepository>,
        messages: Arc<MemoryMessageRepository>,
        service: ChatService,
    }

    fn harness() -> Harness {
        let users = Arc::new(MemoryUserRepository::new());
        let chats = Arc::new(MemoryChatRepository::new(users.clone()));
        let messages = Arc::new(MemoryMessageRepository::new(users.clone()));
        let service = ChatService::new(ChatServiceDependencies {
            chat_repository: chats,
            user_repository: users.clone(),
            message_repository: messages.clone(),
            clock: Arc::new(SystemClock),
        });
        Harness {
            users,
            messages,
            service,
        }
    }

    async fn new_user(harness: &Harness, name: &str) -> UserId {
        harness
            .users
            .create(Username::parse(name).unwrap(), "hash".into(), chrono::Utc::now())
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn creator_becomes_first_member() {
        let harness = harness();
        let alice = new_user(&harness, "alice").await;

        let chat = harness
            .service
            .create_chat(CreateChatRequest {
                name: "general".into(),
                creator_id: alice,
            })
            .await
            .unwrap();

        assert_eq!(chat.users.len(), 1);
        assert_eq!(chat.users[0].username, "alice");

        let listed = harness.service.list_chats(alice).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "general");
    }

    #[tokio::test]
    async fn invite_requires_membership() {
        let harness = harness();
        let alice = new_user(&harness, "alice").await;
        let mallory = new_user(&harness, "mallory").await;
        new_user(&harness, "bob").await;

        let chat = harness
            .service
            .create_chat(CreateChatRequest {
                name: "general".into(),
                creator_id: alice,
            })
            .await
            .unwrap();

        let result = harness
            .service
            .invite(InviteMemberRequest {
                chat_id: ChatId(chat.id),
                inviter_id: mallory,
                username: "bob".into(),
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::Authorization)));

        harness
            .service
            .invite(InviteMemberRequest {
                chat_id: ChatId(chat.id),
                inviter_id: alice,
                username: "bob".into(),
            })
            .await
            .unwrap();

        let detail = harness.service.get_chat(ChatId(chat.id)).await.unwrap();
        assert_eq!(detail.users.len(), 2);
    }

    #[tokio::test]
    async fn invite_unknown_username_fails() {
        let harness = harness();
        let alice = new_user(&harness, "alice").await;
        let chat = harness
            .service
            .create_chat(CreateChatRequest {
                name: "general".into(),
                creator_id: alice,
            })
            .await
            .unwrap();

        let result = harness
            .service
            .invite(InviteMemberRequest {
                chat_id: ChatId(chat.id),
                inviter_id: alice,
                username: "ghost".into(),
            })
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::UserNotFound))
        ));
    }

    #[tokio::test]
    async fn get_chat_includes_history() {
        let harness = harness();
        let alice = new_user(&harness, "alice").await;
        let chat = harness
            .service
            .create_chat(CreateChatRequest {
                name: "general".into(),
                creator_id: alice,
            })
            .await
            .unwrap();

        harness
            .messages
            .create(NewMessage {
                chat_id: ChatId(chat.id),
                author_id: alice,
                text: MessageText::parse("hello").unwrap(),
                created_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let detail = harness.service.get_chat(ChatId(chat.id)).await.unwrap();
        let messages = detail.messages.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[0].author.username, "alice");
    }

    #[tokio::test]
    async fn get_missing_chat_fails() {
        let harness = harness();
        let result = harness.service.get_chat(ChatId(999)).await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::ChatNotFound))
        ));
    }
}
