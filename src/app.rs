//! Startup: credential gating, router construction, and the HTTP server.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;

use crate::config::AppConfig;
use crate::conversation::{ConversationController, SessionManager, spawn_prune_task};
use crate::credentials::CredentialLoader;
use crate::error::Error;
use crate::presentation::{CredentialStatus, credential_status};
use crate::router::{AgentRouter, RemoteRouter};
use crate::web::{AppState, chat_routes};

/// How often idle REST sessions are swept.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Everything the surfaces need once startup has passed its gates.
pub struct App {
    pub controller: Arc<ConversationController>,
    pub status: Vec<CredentialStatus>,
}

impl App {
    /// Load credentials and build the router.
    ///
    /// Fails with `ConfigError::MissingCredentials` if any credential is absent
    /// and with `RouterError::Init` if the router cannot be constructed.
    pub fn initialize(config: &AppConfig, loader: &CredentialLoader) -> Result<Self, Error> {
        let loaded = loader.load();
        let status = credential_status(&loaded.presence());
        let credentials = loaded.require()?;

        let router = RemoteRouter::new(&config.router, &credentials)?;
        info!(endpoint = router.endpoint(), "Agent router initialized");

        Ok(Self::with_router(config, Arc::new(router), status))
    }

    /// Assemble around an already-built router.
    pub fn with_router(
        config: &AppConfig,
        router: Arc<dyn AgentRouter>,
        status: Vec<CredentialStatus>,
    ) -> Self {
        Self {
            controller: Arc::new(ConversationController::new(
                router,
                config.conversation.clone(),
            )),
            status,
        }
    }

    /// Shared state for the web handlers, with a fresh session manager.
    pub fn web_state(&self, config: &AppConfig) -> AppState {
        AppState {
            controller: Arc::clone(&self.controller),
            sessions: SessionManager::new(config.session_idle_timeout),
            status: Arc::new(self.status.clone()),
        }
    }

    /// Bind and serve HTTP until Ctrl-C.
    pub async fn serve(&self, config: &AppConfig) -> Result<(), Error> {
        let state = self.web_state(config);
        let _prune_handle = spawn_prune_task(Arc::clone(&state.sessions), PRUNE_INTERVAL);

        let listener = TcpListener::bind((config.bind, config.port)).await?;
        info!(addr = %listener.local_addr()?, "Chat server started");

        axum::serve(listener, chat_routes(state))
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutting down");
            })
            .await?;
        Ok(())
    }
}
