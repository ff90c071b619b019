use application::{PasswordHasher, PasswordHasherError};
use async_trait::async_trait;

/// bcrypt 加盐哈希。哈希计算放到阻塞线程池，避免拖住异步运行时。
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<String, PasswordHasherError> {
        let plaintext = plaintext.to_owned();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .map_err(|err| PasswordHasherError::hash_error(err.to_string()))?
            .map_err(|err| PasswordHasherError::hash_error(err.to_string()))
    }

    async fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, PasswordHasherError> {
        let plaintext = plaintext.to_owned();
        let hashed = hashed.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hashed))
            .await
            .map_err(|err| PasswordHasherError::verify_error(err.to_string()))?
            .map_err(|err| PasswordHasherError::verify_error(err.to_string()))
    }
}
