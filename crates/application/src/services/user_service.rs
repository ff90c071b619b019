use std::sync::Arc;

use domain::{DomainError, User, UserId, UserProfile, Username};

use crate::{clock::Clock, error::ApplicationError, password::PasswordHasher, repository::UserRepository};

#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuthenticateUserRequest {
    pub username: String,
    pub password: String,
}

pub struct UserServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

pub struct UserService {
    deps: UserServiceDependencies,
}

impl UserService {
    pub fn new(deps: UserServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn register(&self, request: RegisterUserRequest) -> Result<User, ApplicationError> {
        let username = Username::parse(request.username)?;
        if request.password.len() < 6 {
            return Err(DomainError::invalid_argument("password", "too short").into());
        }

        if self
            .deps
            .user_repository
            .find_by_username(&username)
            .await?
            .is_some()
        {
            return Err(DomainError::UserAlreadyExists.into());
        }

        let password_hash = self.deps.password_hasher.hash(&request.password).await?;
        let now = self.deps.clock.now();
        let user = self
            .deps
            .user_repository
            .create(username, password_hash, now)
            .await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn authenticate(
        &self,
        request: AuthenticateUserRequest,
    ) -> Result<User, ApplicationError> {
        let username = Username::parse(request.username)?;
        let user = self
            .deps
            .user_repository
            .find_by_username(&username)
            .await?
            .ok_or(ApplicationError::Authentication)?;

        let password_ok = self
            .deps
            .password_hasher
            .verify(&request.password, &user.password_hash)
            .await?;
        if !password_ok {
            return Err(ApplicationError::Authentication);
        }

        Ok(user)
    }

    /// 连接握手后解析一次作者公开资料，供实时层复用。
    pub async fn get_profile(&self, user_id: UserId) -> Result<UserProfile, ApplicationError> {
        let user = self
            .deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or(ApplicationError::Domain(DomainError::UserNotFound))?;
        Ok(user.profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::password::PasswordHasherError;
    use crate::repository::memory::MemoryUserRepository;
    use async_trait::async_trait;

    /// 测试用明文哈希器（真实实现见 infrastructure::BcryptPasswordHasher）
    struct PlainHasher;

    #[async_trait]
    impl PasswordHasher for PlainHasher {
        async fn hash(&self, plaintext: &str) -> Result<String, PasswordHasherError> {
            Ok(format!("hashed:{plaintext}"))
        }

        async fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, PasswordHasherError> {
            Ok(hashed == format!("hashed:{plaintext}"))
        }
    }

    fn service() -> UserService {
        UserService::new(UserServiceDependencies {
            user_repository: Arc::new(MemoryUserRepository::new()),
            password_hasher: Arc::new(PlainHasher),
            clock: Arc::new(SystemClock),
        })
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let service = service();
        let user = service
            .register(RegisterUserRequest {
                username: "alice".into(),
                password: "secret".into(),
            })
            .await
            .unwrap();
        assert_eq!(user.username.as_str(), "alice");
        assert_eq!(user.password_hash, "hashed:secret");

        let authed = service
            .authenticate(AuthenticateUserRequest {
                username: "alice".into(),
                password: "secret".into(),
            })
            .await
            .unwrap();
        assert_eq!(authed.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let service = service();
        let request = RegisterUserRequest {
            username: "alice".into(),
            password: "secret".into(),
        };
        service.register(request.clone()).await.unwrap();
        let result = service.register(request).await;
        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::UserAlreadyExists))
        ));
    }

    #[tokio::test]
    async fn wrong_password_fails_authentication() {
        let service = service();
        service
            .register(RegisterUserRequest {
                username: "alice".into(),
                password: "secret".into(),
            })
            .await
            .unwrap();

        let result = service
            .authenticate(AuthenticateUserRequest {
                username: "alice".into(),
                password: "nope__".into(),
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::Authentication)));
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let service = service();
        let result = service
            .register(RegisterUserRequest {
                username: "alice".into(),
                password: "abc".into(),
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::Domain(_))));
    }
}
