//! 对外序列化的数据传输对象。
//!
//! 字段名使用 camelCase，与客户端约定的 JSON 线格式保持一致。

use domain::{Chat, Message, Timestamp, User, UserProfile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i64,
    pub username: String,
}

impl From<&UserProfile> for UserDto {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.into(),
            username: profile.username.as_str().to_owned(),
        }
    }
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.into(),
            username: user.username.as_str().to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: i64,
    pub text: String,
    pub created_at: Timestamp,
    pub chat_id: i64,
    pub author: UserDto,
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.into(),
            text: message.text.as_str().to_owned(),
            created_at: message.created_at,
            chat_id: message.chat_id.into(),
            author: UserDto::from(&message.author),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDto {
    pub id: i64,
    pub name: String,
    pub created_at: Timestamp,
    pub users: Vec<UserDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<MessageDto>>,
}

impl ChatDto {
    pub fn new(chat: &Chat, users: Vec<UserDto>, messages: Option<Vec<MessageDto>>) -> Self {
        Self {
            id: chat.id.into(),
            name: chat.name.clone(),
            created_at: chat.created_at,
            users,
            messages,
        }
    }
}
