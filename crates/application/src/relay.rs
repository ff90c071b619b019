//! 消息中继：校验入站消息、先持久化、再向房间在线成员扇出。
//!
//! 顺序保证：同一房间内持久化和广播由每房间一把互斥锁串联，
//! 任何两个监听者观察到的消息顺序等于持久化完成顺序；不同房间
//! 互不干扰。注册表的锁从不跨越持久化 await 持有。

use std::collections::HashMap;
use std::sync::Arc;

use domain::{ChatId, Message, MessageText, RepositoryError, SessionId, UserId};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::dto::MessageDto;
use crate::events::ServerEvent;
use crate::registry::RoomRegistry;
use crate::repository::{MessageRepository, NewMessage};
use crate::router::SessionRouter;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid message payload: {0}")]
    InvalidPayload(String),
    #[error("session has not joined the chat")]
    NotInRoom,
    #[error("failed to persist message")]
    PersistenceFailed(#[source] RepositoryError),
}

impl MessageError {
    /// 发送回出错会话的结构化错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::NotInRoom => "NOT_IN_ROOM",
            Self::PersistenceFailed(_) => "PERSISTENCE_FAILED",
        }
    }
}

pub struct MessageRelayDependencies {
    pub registry: Arc<RoomRegistry>,
    pub router: Arc<SessionRouter>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct MessageRelay {
    deps: MessageRelayDependencies,
    /// 每房间广播序；跨房间无全局顺序。条目在最后一个持有者
    /// 完成提交时回收，映射不会随出现过的房间 id 无界增长。
    room_order: Mutex<HashMap<ChatId, Arc<Mutex<()>>>>,
}

impl MessageRelay {
    pub fn new(deps: MessageRelayDependencies) -> Self {
        Self {
            deps,
            room_order: Mutex::new(HashMap::new()),
        }
    }

    async fn room_lock(&self, chat_id: ChatId) -> Arc<Mutex<()>> {
        let mut locks = self.room_order.lock().await;
        locks.entry(chat_id).or_default().clone()
    }

    /// 提交结束后回收房间锁条目。克隆只在 `room_lock` 持有映射锁时
    /// 发生，所以强引用计数为 2（映射 + 本次提交）意味着没有其他
    /// 提交在等待，条目可以安全移除。
    async fn recycle_room_lock(&self, chat_id: ChatId, order: Arc<Mutex<()>>) {
        let mut locks = self.room_order.lock().await;
        if Arc::strong_count(&order) == 2 {
            locks.remove(&chat_id);
        }
    }

    #[cfg(test)]
    async fn tracked_room_locks(&self) -> usize {
        self.room_order.lock().await.len()
    }

    /// 处理一次消息提交。失败只影响这一次提交：不关闭连接、
    /// 不影响其他会话；持久化失败视为瞬态，由客户端自行重发。
    pub async fn submit(
        &self,
        session_id: SessionId,
        author_id: UserId,
        chat_id: ChatId,
        raw_text: &str,
    ) -> Result<Message, MessageError> {
        let text = MessageText::parse(raw_text)
            .map_err(|err| MessageError::InvalidPayload(err.to_string()))?;

        // 防御伪造的房间 id：只有当前确实加入了房间的会话才能发言
        if !self.deps.registry.is_member(session_id, chat_id).await {
            return Err(MessageError::NotInRoom);
        }

        let order = self.room_lock(chat_id).await;
        let guard = order.lock().await;
        let result = self.persist_and_broadcast(author_id, chat_id, text).await;
        drop(guard);
        self.recycle_room_lock(chat_id, order).await;
        result
    }

    async fn persist_and_broadcast(
        &self,
        author_id: UserId,
        chat_id: ChatId,
        text: MessageText,
    ) -> Result<Message, MessageError> {
        let message = self
            .deps
            .message_repository
            .create(NewMessage {
                chat_id,
                author_id,
                text,
                created_at: self.deps.clock.now(),
            })
            .await
            .map_err(MessageError::PersistenceFailed)?;

        // 持久化成功后才广播：客户端看到的每个消息 id 都已落库。
        // 快照在发送者被并发移除时仍然有效，广播继续发给剩余成员。
        let members = self.deps.registry.members_of(chat_id).await;
        let event = ServerEvent::Message(MessageDto::from(&message));
        self.deps.router.send_to_many(&members, &event).await;

        tracing::debug!(
            message_id = %message.id,
            chat_id = %chat_id,
            recipients = members.len(),
            "message relayed"
        );

        Ok(message)
    }
}
