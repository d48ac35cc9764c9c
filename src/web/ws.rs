//! WebSocket chat: one session per connection.
//!
//! The session is created when the socket opens and dropped when it closes,
//! so it is owned by the connection task and needs no lock.

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AppState;
use crate::conversation::{Role, Session};
use crate::presentation::{EXPORT_FILENAME, NOTHING_TO_EXPORT};

pub(super) fn ws_routes() -> Router<AppState> {
    Router::new().route("/ws/chat", get(ws_chat_handler))
}

// ── JSON Protocol ───────────────────────────────────────────────────────

/// Message from client → server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    Message { text: String },
    Clear,
    Export,
}

/// Message from server → client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerFrame {
    Session { id: Uuid },
    Thinking { message: String },
    Turn { role: Role, text: String },
    Cleared,
    Export { filename: String, content: String },
    Error { message: String },
}

// ── Handler ─────────────────────────────────────────────────────────────

async fn ws_chat_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    debug!("Chat client connecting");
    ws.on_upgrade(|socket| handle_chat_socket(socket, state))
}

async fn handle_chat_socket(mut socket: WebSocket, state: AppState) {
    let mut session = Session::new();
    info!(session_id = %session.id(), "Chat client connected");

    if !send_frame(&mut socket, &ServerFrame::Session { id: session.id() }).await {
        return;
    }

    loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) => {
                let frame = match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        debug!(error = %e, "Invalid JSON from chat client");
                        let error = ServerFrame::Error {
                            message: format!("invalid message: {}", e),
                        };
                        if !send_frame(&mut socket, &error).await {
                            break;
                        }
                        continue;
                    }
                };
                if !handle_frame(&mut socket, &state, &mut session, frame).await {
                    break;
                }
            }
            Some(Ok(Message::Ping(data))) => {
                if socket.send(Message::Pong(data)).await.is_err() {
                    break;
                }
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Err(e)) => {
                warn!(error = %e, "Chat WebSocket error");
                break;
            }
            _ => {}
        }
    }

    info!(
        session_id = %session.id(),
        turns = session.history().len(),
        "Chat session ended"
    );
}

/// Apply one client frame. Returns false once the socket is gone.
async fn handle_frame(
    socket: &mut WebSocket,
    state: &AppState,
    session: &mut Session,
    frame: ClientFrame,
) -> bool {
    match frame {
        ClientFrame::Message { text } => {
            if text.trim().is_empty() {
                return true;
            }
            let thinking = ServerFrame::Thinking {
                message: "Thinking...".to_string(),
            };
            if !send_frame(socket, &thinking).await {
                return false;
            }

            let before = session.history().len();
            let outcome = state.controller.send(session, &text).await;

            if let Some(message) = outcome.notice() {
                if !send_frame(socket, &ServerFrame::Error { message }).await {
                    return false;
                }
            }
            for turn in &session.history().turns()[before..] {
                let frame = ServerFrame::Turn {
                    role: turn.role(),
                    text: turn.text().to_string(),
                };
                if !send_frame(socket, &frame).await {
                    return false;
                }
            }
            true
        }
        ClientFrame::Clear => {
            state.controller.clear(session);
            send_frame(socket, &ServerFrame::Cleared).await
        }
        ClientFrame::Export if session.history().is_empty() => {
            let frame = ServerFrame::Error {
                message: NOTHING_TO_EXPORT.to_string(),
            };
            send_frame(socket, &frame).await
        }
        ClientFrame::Export => {
            let frame = ServerFrame::Export {
                filename: EXPORT_FILENAME.to_string(),
                content: state.controller.export(session),
            };
            send_frame(socket, &frame).await
        }
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &ServerFrame) -> bool {
    match serde_json::to_string(frame) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize chat frame");
            true
        }
    }
}
