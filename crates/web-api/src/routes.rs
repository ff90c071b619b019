use axum::{
    extract::{ws::WebSocketUpgrade, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use application::services::{
    AuthenticateUserRequest, CreateChatRequest, InviteMemberRequest, RegisterUserRequest,
};
use application::{ChatDto, UserDto};
use domain::ChatId;

use crate::auth::LoginResponse;
use crate::ws_connection::WebSocketConnection;
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct CreateChatPayload {
    name: String,
}

#[derive(Debug, Deserialize)]
struct InvitePayload {
    username: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/chats", post(create_chat).get(list_chats))
        .route("/chats/{chat_id}", get(get_chat))
        .route("/chats/{chat_id}/invite", post(invite_member))
        .route("/ws", get(websocket_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    let user = state
        .user_service
        .register(RegisterUserRequest {
            username: payload.username,
            password: payload.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserDto::from(&user))))
}

async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(AuthenticateUserRequest {
            username: payload.username,
            password: payload.password,
        })
        .await?;

    let token = state.jwt_service.generate_token(user.id)?;

    Ok(Json(LoginResponse {
        user: UserDto::from(&user),
        token,
    }))
}

async fn create_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateChatPayload>,
) -> Result<(StatusCode, Json<ChatDto>), ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state
        .chat_service
        .create_chat(CreateChatRequest {
            name: payload.name,
            creator_id: user_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(dto)))
}

async fn list_chats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ChatDto>>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let chats = state.chat_service.list_chats(user_id).await?;
    Ok(Json(chats))
}

async fn get_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chat_id): Path<i64>,
) -> Result<Json<ChatDto>, ApiError> {
    state.jwt_service.extract_user_from_headers(&headers)?;
    let dto = state.chat_service.get_chat(ChatId::from(chat_id)).await?;
    Ok(Json(dto))
}

async fn invite_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chat_id): Path<i64>,
    Json(payload): Json<InvitePayload>,
) -> Result<StatusCode, ApiError> {
    let inviter_id = state.jwt_service.extract_user_from_headers(&headers)?;
    state
        .chat_service
        .invite(InviteMemberRequest {
            chat_id: ChatId::from(chat_id),
            inviter_id,
            username: payload.username,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// WebSocket 握手：升级前完成身份验证，无效凭证直接拒绝连接。
async fn websocket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let user_id = state
        .jwt_service
        .extract_user_from_query_token(query.token.as_deref())?;

    // token 指向已不存在的用户时同样视为未认证
    let author = state
        .user_service
        .get_profile(user_id)
        .await
        .map_err(|_| ApiError::unauthenticated("Unknown user"))?;

    Ok(ws.on_upgrade(move |socket| WebSocketConnection::new(socket, state, author).run()))
}
