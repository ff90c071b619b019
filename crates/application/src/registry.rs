//! 房间注册表：聊天室 id 到当前在线会话集合的内存映射。
//!
//! 显式持有、可注入的实例（没有进程级全局状态），每个连接会话和
//! 消息中继共享同一个 `Arc<RoomRegistry>`。所有操作都是全量成功的
//! 短临界区，只触碰内存索引；持久化和网络 I/O 永远不在锁内发生。

use std::collections::{HashMap, HashSet};

use domain::{ChatId, SessionId};
use tokio::sync::RwLock;

#[derive(Default)]
struct Indices {
    /// 房间 -> 在线会话
    room_sessions: HashMap<ChatId, HashSet<SessionId>>,
    /// 会话 -> 已加入房间（反向索引，断开时避免全表扫描）
    session_rooms: HashMap<SessionId, HashSet<ChatId>>,
}

#[derive(Default)]
pub struct RoomRegistry {
    inner: RwLock<Indices>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 会话建立后注册。只有已注册的会话才能加入房间，
    /// 这保证 `remove_session` 之后并发迟到的 `join` 不会让会话复活。
    pub async fn register_session(&self, session_id: SessionId) {
        let mut inner = self.inner.write().await;
        inner.session_rooms.entry(session_id).or_default();
    }

    /// 幂等加入。这一层不做授权检查：调用方（REST 成员流程）
    /// 已经验证过该用户有权进入此聊天室。
    pub async fn join(&self, session_id: SessionId, chat_id: ChatId) {
        let mut inner = self.inner.write().await;
        match inner.session_rooms.get_mut(&session_id) {
            Some(rooms) => {
                rooms.insert(chat_id);
            }
            // 会话已被移除，"移除获胜"
            None => return,
        }
        inner
            .room_sessions
            .entry(chat_id)
            .or_default()
            .insert(session_id);
    }

    /// 幂等离开；不在房间时是 no-op。
    pub async fn leave(&self, session_id: SessionId, chat_id: ChatId) {
        let mut inner = self.inner.write().await;
        if let Some(rooms) = inner.session_rooms.get_mut(&session_id) {
            rooms.remove(&chat_id);
        }
        if let Some(sessions) = inner.room_sessions.get_mut(&chat_id) {
            sessions.remove(&session_id);
            if sessions.is_empty() {
                inner.room_sessions.remove(&chat_id);
            }
        }
    }

    /// 断开时调用一次，把会话从它加入过的每个房间移除。
    /// 返回后该会话不会再出现在任何 `members_of` 快照中。
    pub async fn remove_session(&self, session_id: SessionId) {
        let mut inner = self.inner.write().await;
        let rooms = inner.session_rooms.remove(&session_id).unwrap_or_default();
        for chat_id in rooms {
            if let Some(sessions) = inner.room_sessions.get_mut(&chat_id) {
                sessions.remove(&session_id);
                if sessions.is_empty() {
                    inner.room_sessions.remove(&chat_id);
                }
            }
        }
    }

    /// 房间在线会话的时点快照。复制后立即释放锁，
    /// 广播迭代发生在锁外。
    pub async fn members_of(&self, chat_id: ChatId) -> Vec<SessionId> {
        let inner = self.inner.read().await;
        inner
            .room_sessions
            .get(&chat_id)
            .map(|sessions| sessions.iter().copied().collect())
            .unwrap_or_default()
    }

    pub async fn rooms_of(&self, session_id: SessionId) -> Vec<ChatId> {
        let inner = self.inner.read().await;
        inner
            .session_rooms
            .get(&session_id)
            .map(|rooms| rooms.iter().copied().collect())
            .unwrap_or_default()
    }

    pub async fn is_member(&self, session_id: SessionId, chat_id: ChatId) -> bool {
        let inner = self.inner.read().await;
        inner
            .session_rooms
            .get(&session_id)
            .map(|rooms| rooms.contains(&chat_id))
            .unwrap_or(false)
    }
}
