use serde::{Deserialize, Serialize};

use crate::user::UserProfile;
use crate::value_objects::{ChatId, MessageId, MessageText, Timestamp};

/// 已持久化的聊天消息。只通过 MessageRelay 创建，创建后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub text: MessageText,
    pub author: UserProfile,
    pub created_at: Timestamp,
}
