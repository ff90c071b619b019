use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{ChatId, SessionId, UserId};

/// 连接会话生命周期。转移是单调的：
/// `Connecting -> Authenticated -> Active -> Closed`，从 Active 无法回退。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Connecting,
    Authenticated,
    Active,
    Closed,
}

/// 客户端入站事件（已通过传输层解析的类型化形式）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Join { chat_id: ChatId },
    Leave { chat_id: ChatId },
    Message { chat_id: ChatId, text: String },
}

/// 事件处理产生的副作用描述；由连接驱动任务执行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Join { chat_id: ChatId },
    Leave { chat_id: ChatId },
    Relay { chat_id: ChatId, text: String },
    /// 事件被丢弃（会话未认证或已关闭，关闭转移具有权威性）。
    Drop,
}

/// 一条已建立连接的状态机。不持有传输与注册表引用，
/// `handle` 是 (状态, 事件) -> (新状态, 副作用) 的纯函数，便于独立测试。
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    user_id: Option<UserId>,
    phase: SessionPhase,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            user_id: None,
            phase: SessionPhase::Connecting,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// 绑定已验证的用户身份。只在握手成功后调用一次。
    pub fn authenticate(&mut self, user_id: UserId) -> Result<(), DomainError> {
        match self.phase {
            SessionPhase::Connecting => {
                self.user_id = Some(user_id);
                self.phase = SessionPhase::Authenticated;
                Ok(())
            }
            _ => Err(DomainError::SessionClosed),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// 处理一条入站事件，返回待执行的副作用。
    pub fn handle(&mut self, event: ClientEvent) -> SessionCommand {
        match self.phase {
            SessionPhase::Connecting | SessionPhase::Closed => SessionCommand::Drop,
            SessionPhase::Authenticated | SessionPhase::Active => match event {
                ClientEvent::Join { chat_id } => {
                    self.phase = SessionPhase::Active;
                    SessionCommand::Join { chat_id }
                }
                ClientEvent::Leave { chat_id } => SessionCommand::Leave { chat_id },
                ClientEvent::Message { chat_id, text } => SessionCommand::Relay { chat_id, text },
            },
        }
    }

    /// 终态转移。幂等，之后所有事件都被静默丢弃。
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticated_session() -> Session {
        let mut session = Session::new(SessionId::generate());
        session.authenticate(UserId(1)).unwrap();
        session
    }

    #[test]
    fn events_before_authentication_are_dropped() {
        let mut session = Session::new(SessionId::generate());
        let command = session.handle(ClientEvent::Join { chat_id: ChatId(7) });
        assert_eq!(command, SessionCommand::Drop);
        assert_eq!(session.phase(), SessionPhase::Connecting);
    }

    #[test]
    fn first_join_activates_session() {
        let mut session = authenticated_session();
        assert_eq!(session.phase(), SessionPhase::Authenticated);

        let command = session.handle(ClientEvent::Join { chat_id: ChatId(7) });
        assert_eq!(command, SessionCommand::Join { chat_id: ChatId(7) });
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[test]
    fn session_stays_active_across_events() {
        let mut session = authenticated_session();
        session.handle(ClientEvent::Join { chat_id: ChatId(1) });
        session.handle(ClientEvent::Leave { chat_id: ChatId(1) });
        session.handle(ClientEvent::Message {
            chat_id: ChatId(2),
            text: "hi".into(),
        });
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[test]
    fn closed_session_drops_all_events() {
        let mut session = authenticated_session();
        session.handle(ClientEvent::Join { chat_id: ChatId(7) });
        session.close();

        let command = session.handle(ClientEvent::Message {
            chat_id: ChatId(7),
            text: "late".into(),
        });
        assert_eq!(command, SessionCommand::Drop);
        assert_eq!(session.phase(), SessionPhase::Closed);
    }

    #[test]
    fn authenticate_twice_is_rejected() {
        let mut session = authenticated_session();
        assert!(session.authenticate(UserId(2)).is_err());
        assert_eq!(session.user_id(), Some(UserId(1)));
    }
}
