//! REST endpoints for sessions, status and export.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::conversation::{LoopState, SendOutcome, Session, SessionHandle, Turn};
use crate::error::SessionError;
use crate::presentation::{self, EXPORT_FILENAME, EXPORT_MIME};

pub(super) fn rest_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(api_status))
        .route("/api/sessions", post(create_session))
        .route(
            "/api/sessions/{id}",
            get(get_session).delete(delete_session),
        )
        .route("/api/sessions/{id}/messages", post(send_message))
        .route("/api/sessions/{id}/clear", post(clear_session))
        .route("/api/sessions/{id}/export", get(export_session))
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match self {
            SessionError::NotFound { .. } => StatusCode::NOT_FOUND,
            SessionError::InvalidId(_) => StatusCode::BAD_REQUEST,
        };
        (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// JSON view of a session.
///
/// While a send is in flight the session is `Submitting` and its lock is
/// held, so only `id` and `busy: true` are reported.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub busy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turns: Option<Vec<Turn>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<&'static str>,
    /// Notice for a failed send, shown alongside the error turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionView {
    fn of(session: &Session) -> Self {
        Self {
            id: session.id(),
            busy: session.state() == LoopState::Submitting,
            turns: Some(session.history().turns().to_vec()),
            rendered: Some(presentation::render_history(session.history())),
            outcome: None,
            error: None,
        }
    }

    fn busy(id: Uuid) -> Self {
        Self {
            id,
            busy: true,
            turns: None,
            rendered: None,
            outcome: None,
            error: None,
        }
    }

    fn with_outcome(mut self, outcome: &SendOutcome) -> Self {
        self.outcome = Some(match outcome {
            SendOutcome::Ignored => "ignored",
            SendOutcome::Answered => "answered",
            SendOutcome::Failed { .. } => "failed",
        });
        self.error = outcome.notice();
        self
    }
}

async fn lookup(state: &AppState, raw: &str) -> Result<(Uuid, SessionHandle), SessionError> {
    let id = Uuid::parse_str(raw).map_err(|_| SessionError::InvalidId(raw.to_string()))?;
    let handle = state.sessions.get(id).await?;
    Ok((id, handle))
}

// ── Health / status ─────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "multi-agent-chat"
    }))
}

async fn api_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.status.as_ref().clone())
}

// ── Sessions ────────────────────────────────────────────────────────────

async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let id = state.sessions.create().await;
    (StatusCode::CREATED, Json(serde_json::json!({ "id": id })))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, SessionError> {
    let (id, handle) = lookup(&state, &id).await?;
    let view = match handle.try_lock() {
        Ok(session) => SessionView::of(&session),
        Err(_) => SessionView::busy(id),
    };
    Ok(Json(view))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, SessionError> {
    let (id, _) = lookup(&state, &id).await?;
    state.sessions.remove(id).await;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct SendRequest {
    text: String,
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SendRequest>,
) -> Result<Json<SessionView>, SessionError> {
    let (_, handle) = lookup(&state, &id).await?;
    let mut session = handle.lock().await;
    let outcome = state.controller.send(&mut session, &body.text).await;
    Ok(Json(SessionView::of(&session).with_outcome(&outcome)))
}

async fn clear_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, SessionError> {
    let (_, handle) = lookup(&state, &id).await?;
    let mut session = handle.lock().await;
    state.controller.clear(&mut session);
    Ok(Json(SessionView::of(&session)))
}

async fn export_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, SessionError> {
    let (_, handle) = lookup(&state, &id).await?;
    let session = handle.lock().await;
    if session.history().is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let text = state.controller.export(&session);
    Ok((
        [
            (header::CONTENT_TYPE, EXPORT_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        text,
    )
        .into_response())
}
