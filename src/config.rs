//! Configuration types.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::router::RemoteRouterConfig;

/// Default location of the secrets file.
pub const DEFAULT_SECRETS_PATH: &str = ".chat/secrets.toml";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub bind: IpAddr,
    /// HTTP port.
    pub port: u16,
    /// TOML secrets file consulted before the environment.
    pub secrets_path: PathBuf,
    /// Agent router service.
    pub router: RemoteRouterConfig,
    pub conversation: ConversationConfig,
    /// Idle REST sessions are pruned after this duration.
    pub session_idle_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
            secrets_path: PathBuf::from(DEFAULT_SECRETS_PATH),
            router: RemoteRouterConfig::default(),
            conversation: ConversationConfig::default(),
            session_idle_timeout: Duration::from_secs(3600), // 1 hour
        }
    }
}

/// Conversation loop settings.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Upper bound on a single router call. `None` waits indefinitely.
    pub route_timeout: Option<Duration>,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            route_timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl ConversationConfig {
    /// Build from a seconds value where `0` disables the timeout.
    pub fn from_timeout_secs(secs: u64) -> Self {
        Self {
            route_timeout: (secs > 0).then(|| Duration::from_secs(secs)),
        }
    }
}
