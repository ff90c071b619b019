use serde::{Deserialize, Serialize};

use crate::value_objects::{Timestamp, UserId, Username};

/// 注册用户。密码哈希永远不会被序列化给客户端。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: Timestamp,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// 对外暴露的公开资料，随消息一起广播。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Username,
}
