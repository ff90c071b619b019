use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordHasherError {
    #[error("hash error: {0}")]
    Hash(String),
    #[error("verify error: {0}")]
    Verify(String),
}

impl PasswordHasherError {
    pub fn hash_error(message: impl Into<String>) -> Self {
        Self::Hash(message.into())
    }

    pub fn verify_error(message: impl Into<String>) -> Self {
        Self::Verify(message.into())
    }
}

/// 凭证服务依赖的哈希抽象。实现必须使用加盐哈希，
/// 明文相等比较不属于这个契约。
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, plaintext: &str) -> Result<String, PasswordHasherError>;
    async fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, PasswordHasherError>;
}
