use serde::{Deserialize, Serialize};

use crate::dto::MessageDto;

/// 服务器推送给单条连接的实时事件。
///
/// `message` 是房间广播；`error` 只发给出错的那条连接，
/// 不会影响其他会话，也不会关闭连接。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    Message(MessageDto),
    Error { code: String, message: String },
}

impl ServerEvent {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}
