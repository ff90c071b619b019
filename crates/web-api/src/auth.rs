//! JWT 认证模块
//!
//! 提供 JWT token 生成、验证，以及从 HTTP header / 查询参数中提取身份。

use axum::http::{HeaderMap, StatusCode};
use config::JwtConfig;
use domain::UserId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ApiError;

/// 握手与请求认证失败。认证错误直接终止本次连接尝试。
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credentials: {0}")]
    Unauthenticated(&'static str),
    #[error("invalid token: {0}")]
    InvalidToken(String),
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Unauthenticated(reason) => {
                ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", reason)
            }
            AuthError::InvalidToken(reason) => {
                ApiError::new(StatusCode::UNAUTHORIZED, "INVALID_TOKEN", reason)
            }
        }
    }
}

/// JWT Claims 结构
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub exp: i64, // 过期时间 (Unix timestamp)
}

/// JWT Token 服务
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 生成 JWT token
    pub fn generate_token(&self, user_id: UserId) -> Result<String, ApiError> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(self.config.expiration_hours);

        let claims = Claims {
            user_id: user_id.into(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|err| {
            ApiError::internal_server_error(format!("Token generation failed: {}", err))
        })
    }

    /// 验证并解析 JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|token_data| token_data.claims)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))
    }

    /// 从 headers 中提取和验证 token
    pub fn extract_user_from_headers(&self, headers: &HeaderMap) -> Result<UserId, AuthError> {
        let auth_header = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .ok_or(AuthError::Unauthenticated("missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::Unauthenticated(
                "invalid authorization header format",
            ))?;

        let claims = self.verify_token(token)?;
        Ok(UserId::from(claims.user_id))
    }

    /// WebSocket 握手走查询参数携带 token
    pub fn extract_user_from_query_token(&self, token: Option<&str>) -> Result<UserId, AuthError> {
        let token = token.ok_or(AuthError::Unauthenticated("missing token"))?;
        let claims = self.verify_token(token)?;
        Ok(UserId::from(claims.user_id))
    }
}

/// 登录响应结构
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: application::UserDto,
    pub token: String,
}
