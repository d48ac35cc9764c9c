//! Agent router facade.
//!
//! The router is the single call point into the external multi-agent system:
//! one query in, one answer out. Everything behind it (weather lookups,
//! inference, completions) is someone else's service.

mod remote;

pub use remote::{DEFAULT_ENDPOINT, RemoteRouter, RemoteRouterConfig};

use async_trait::async_trait;

use crate::error::RouterError;

/// The narrow capability the conversation loop depends on.
#[async_trait]
pub trait AgentRouter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Route a user query and return the agent's answer.
    async fn route(&self, query: &str) -> Result<String, RouterError>;
}
