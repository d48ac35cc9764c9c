//! HTTP surface: REST session routes and the WebSocket chat endpoint.

mod routes;
mod ws;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::conversation::{ConversationController, SessionManager};
use crate::presentation::CredentialStatus;

pub use routes::SessionView;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<ConversationController>,
    pub sessions: Arc<SessionManager>,
    /// Credential status captured at startup.
    pub status: Arc<Vec<CredentialStatus>>,
}

/// Build the full router: REST, WebSocket and health.
pub fn chat_routes(state: AppState) -> Router {
    routes::rest_routes()
        .merge(ws::ws_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
