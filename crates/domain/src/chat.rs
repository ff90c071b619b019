use serde::{Deserialize, Serialize};

use crate::value_objects::{ChatId, Timestamp};

/// 聊天室。权威成员列表由持久层维护，这里只承载元数据；
/// 实时层关心的"在线成员"由 RoomRegistry 单独跟踪。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub name: String,
    pub created_at: Timestamp,
}
