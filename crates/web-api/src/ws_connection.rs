use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::{ChatId, ClientEvent, Session, SessionCommand, SessionId, UserProfile};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use application::ServerEvent;

use crate::state::AppState;

/// 客户端经 WebSocket 发来的线格式帧。
///
/// 解析失败不是致命错误：回发一条 `error` 事件，连接继续存活。
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    Join { chat_id: i64 },
    #[serde(rename_all = "camelCase")]
    Leave { chat_id: i64 },
    #[serde(rename_all = "camelCase")]
    Message { chat_id: i64, text: String },
}

impl ClientFrame {
    fn into_event(self) -> ClientEvent {
        match self {
            Self::Join { chat_id } => ClientEvent::Join {
                chat_id: ChatId::from(chat_id),
            },
            Self::Leave { chat_id } => ClientEvent::Leave {
                chat_id: ChatId::from(chat_id),
            },
            Self::Message { chat_id, text } => ClientEvent::Message {
                chat_id: ChatId::from(chat_id),
                text,
            },
        }
    }
}

/// WebSocket 连接驱动
///
/// 封装单条连接的完整生命周期：
/// - 注册会话到注册表和路由器
/// - 接收客户端帧，交给会话状态机决定副作用
/// - 把路由器投递的事件写回 socket
/// - 断开时清理一次且仅一次
pub struct WebSocketConnection {
    socket: WebSocket,
    state: AppState,
    author: UserProfile,
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket, state: AppState, author: UserProfile) -> Self {
        Self {
            socket,
            state,
            author,
        }
    }

    /// 运行连接主循环，直到任一方向断开。
    pub async fn run(self) {
        let Self {
            socket,
            state,
            author,
        } = self;

        let session_id = SessionId::generate();
        let mut session = Session::new(session_id);
        if let Err(err) = session.authenticate(author.id) {
            tracing::error!(error = %err, "failed to authenticate fresh session");
            return;
        }

        // 先注册会话再注册发送端：removed 状态对迟到的 join 有权威性
        state.registry.register_session(session_id).await;
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();
        state.router.register(session_id, event_tx).await;

        tracing::info!(session_id = %session_id, user_id = %author.id, "websocket session established");

        let (mut sender, mut incoming) = socket.split();

        // 发送任务：路由器投递什么就写回什么，顺序即持久化顺序
        let mut send_task = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to serialize websocket payload");
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    break;
                }
            }
        });

        // 接收任务：解析帧、推进状态机、执行副作用
        let recv_state = state.clone();
        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(frame)) = incoming.next().await {
                match frame {
                    WsMessage::Text(text) => {
                        Self::handle_text(&recv_state, &mut session, &author, &text).await;
                    }
                    WsMessage::Close(_) => break,
                    WsMessage::Binary(_) => {
                        recv_state
                            .router
                            .send(
                                session.id(),
                                ServerEvent::error("MALFORMED_EVENT", "binary frames not supported"),
                            )
                            .await;
                    }
                    // 协议层自动回应 Ping
                    WsMessage::Ping(_) | WsMessage::Pong(_) => {}
                }
            }
            session.close();
        });

        // 任一方向结束即断开，另一方向立刻中止，不留悬挂任务
        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        // 清理恰好一次：先移出注册表，之后的广播快照不再包含本会话
        state.registry.remove_session(session_id).await;
        state.router.unregister(session_id).await;

        tracing::info!(session_id = %session_id, "websocket session closed");
    }

    async fn handle_text(state: &AppState, session: &mut Session, author: &UserProfile, text: &str) {
        let frame: ClientFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(err) => {
                state
                    .router
                    .send(session.id(), ServerEvent::error("MALFORMED_EVENT", err.to_string()))
                    .await;
                return;
            }
        };

        match session.handle(frame.into_event()) {
            SessionCommand::Join { chat_id } => {
                state.registry.join(session.id(), chat_id).await;
            }
            SessionCommand::Leave { chat_id } => {
                state.registry.leave(session.id(), chat_id).await;
            }
            SessionCommand::Relay { chat_id, text } => {
                if let Err(err) = state
                    .relay
                    .submit(session.id(), author.id, chat_id, &text)
                    .await
                {
                    // 错误只发回出错的会话，连接保持存活
                    state
                        .router
                        .send(session.id(), ServerEvent::error(err.code(), err.to_string()))
                        .await;
                }
            }
            SessionCommand::Drop => {
                tracing::debug!(session_id = %session.id(), "event dropped by session state machine");
            }
        }
    }
}
