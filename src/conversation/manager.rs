//! Session manager: live sessions of the REST surface, keyed by id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use super::session::Session;
use crate::error::SessionError;

/// Shared handle to one session. The mutex is held for the whole of a send,
/// which keeps a session's router calls strictly sequential.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Owns every REST session. Sessions never share state with each other.
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        })
    }

    /// Start a new empty session and return its id.
    pub async fn create(&self) -> Uuid {
        let session = Session::new();
        let id = session.id();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        info!(session_id = %id, "Session created");
        id
    }

    pub async fn get(&self, id: Uuid) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound { id })
    }

    /// End a session. Returns false if it did not exist.
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(session_id = %id, "Session ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions idle for longer than the timeout. Busy sessions are kept.
    pub async fn prune_idle(&self) -> usize {
        self.prune_idle_at(Utc::now()).await
    }

    async fn prune_idle_at(&self, now: DateTime<Utc>) -> usize {
        let idle = TimeDelta::from_std(self.idle_timeout).unwrap_or(TimeDelta::MAX);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, handle| match handle.try_lock() {
            Ok(session) => {
                let keep = now - session.last_active() <= idle;
                if !keep {
                    debug!(session_id = %id, "Pruning idle session");
                }
                keep
            }
            Err(_) => true,
        });

        let pruned = before - sessions.len();
        if pruned > 0 {
            info!(count = pruned, "Pruned idle sessions");
        }
        pruned
    }
}

/// Spawn a background task that periodically prunes idle sessions.
pub fn spawn_prune_task(
    manager: Arc<SessionManager>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            manager.prune_idle().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::session::Turn;

    #[tokio::test]
    async fn create_get_remove() {
        let manager = SessionManager::new(Duration::from_secs(60));
        assert!(manager.is_empty().await);

        let id = manager.create().await;
        assert_eq!(manager.len().await, 1);

        let handle = manager.get(id).await.unwrap();
        assert_eq!(handle.lock().await.id(), id);

        assert!(manager.remove(id).await);
        assert!(!manager.remove(id).await);
        assert!(matches!(
            manager.get(id).await,
            Err(SessionError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let manager = SessionManager::new(Duration::from_secs(60));
        let a = manager.create().await;
        let b = manager.create().await;

        manager
            .get(a)
            .await
            .unwrap()
            .lock()
            .await
            .history_mut()
            .push(Turn::user("only in a"));

        assert_eq!(manager.get(a).await.unwrap().lock().await.history().len(), 1);
        assert!(manager.get(b).await.unwrap().lock().await.history().is_empty());
    }

    #[tokio::test]
    async fn prune_drops_idle_keeps_busy() {
        let manager = SessionManager::new(Duration::from_secs(60));
        let idle = manager.create().await;
        let busy = manager.create().await;

        let busy_handle = manager.get(busy).await.unwrap();
        let _guard = busy_handle.lock().await;

        let later = Utc::now() + TimeDelta::hours(1);
        assert_eq!(manager.prune_idle_at(later).await, 1);
        assert!(manager.get(idle).await.is_err());
        assert!(manager.get(busy).await.is_ok());
    }

    #[tokio::test]
    async fn prune_keeps_recent_sessions() {
        let manager = SessionManager::new(Duration::from_secs(60));
        manager.create().await;
        assert_eq!(manager.prune_idle().await, 0);
        assert_eq!(manager.len().await, 1);
    }
}
