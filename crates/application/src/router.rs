//! 会话路由器：会话 id 到出站事件通道的映射。
//!
//! 每条连接在握手后注册自己的发送端，断开时注销。投递是
//! fire-and-forget 的：接收端已关闭只记日志，绝不影响其他收件人。

use std::collections::HashMap;

use domain::SessionId;
use tokio::sync::{mpsc, RwLock};

use crate::events::ServerEvent;

#[derive(Default)]
pub struct SessionRouter {
    senders: RwLock<HashMap<SessionId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl SessionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, session_id: SessionId, sender: mpsc::UnboundedSender<ServerEvent>) {
        let mut senders = self.senders.write().await;
        senders.insert(session_id, sender);
    }

    /// 断开时与 `RoomRegistry::remove_session` 一起调用；
    /// 之后发往该会话的事件被直接丢弃。
    pub async fn unregister(&self, session_id: SessionId) {
        let mut senders = self.senders.write().await;
        senders.remove(&session_id);
    }

    pub async fn send(&self, session_id: SessionId, event: ServerEvent) {
        let senders = self.senders.read().await;
        if let Some(sender) = senders.get(&session_id) {
            if sender.send(event).is_err() {
                tracing::debug!(session_id = %session_id, "receiver gone, event dropped");
            }
        }
    }

    pub async fn send_to_many(&self, session_ids: &[SessionId], event: &ServerEvent) {
        let senders = self.senders.read().await;
        let mut failed = 0usize;
        for session_id in session_ids {
            if let Some(sender) = senders.get(session_id) {
                if sender.send(event.clone()).is_err() {
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            tracing::debug!(failed, "skipped closed receivers during fan-out");
        }
    }
}
