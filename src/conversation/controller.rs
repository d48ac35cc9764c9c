//! Conversation loop: one send/clear/export cycle over a session.
//!
//! `send` always leaves the history two turns longer (user, then agent) or
//! untouched if the input is blank. Router failures, timeouts and panics
//! become an agent turn carrying an apology; they never escape.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{info, warn};

use super::session::{LoopState, Session, Turn};
use crate::config::ConversationConfig;
use crate::error::RouterError;
use crate::presentation;
use crate::router::AgentRouter;

/// Prefix of the synthetic agent turn appended when routing fails.
pub const ERROR_PREFIX: &str = "Sorry, I encountered an error: ";

/// What a `send` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; history untouched.
    Ignored,
    /// Router answered; user and agent turns appended.
    Answered,
    /// Router failed; user and error turns appended.
    Failed { error: String },
}

impl SendOutcome {
    /// Number of turns the send appended.
    pub fn appended(&self) -> usize {
        match self {
            Self::Ignored => 0,
            Self::Answered | Self::Failed { .. } => 2,
        }
    }

    /// Notice a surface shows next to the error turn, if the send failed.
    pub fn notice(&self) -> Option<String> {
        match self {
            Self::Failed { error } => Some(format!("{}{}", presentation::ERROR_NOTICE_PREFIX, error)),
            _ => None,
        }
    }
}

/// Drives sessions against a shared router.
pub struct ConversationController {
    router: Arc<dyn AgentRouter>,
    config: ConversationConfig,
}

impl ConversationController {
    pub fn new(router: Arc<dyn AgentRouter>, config: ConversationConfig) -> Self {
        Self { router, config }
    }

    /// Submit user input.
    pub async fn send(&self, session: &mut Session, input: &str) -> SendOutcome {
        if input.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        session.touch();
        session.history_mut().push(Turn::user(input));
        session.set_state(LoopState::Submitting);

        let started = Instant::now();
        let outcome = match self.call_router(input).await {
            Ok(answer) => {
                info!(
                    session_id = %session.id(),
                    router = self.router.name(),
                    latency_ms = started.elapsed().as_millis() as u64,
                    "Query routed"
                );
                session.history_mut().push(Turn::agent(answer));
                SendOutcome::Answered
            }
            Err(e) => {
                warn!(
                    session_id = %session.id(),
                    router = self.router.name(),
                    latency_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Routing failed"
                );
                session
                    .history_mut()
                    .push(Turn::agent(format!("{}{}", ERROR_PREFIX, e)));
                SendOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        session.set_state(LoopState::Idle);
        session.touch();
        outcome
    }

    /// Empty the session's history.
    pub fn clear(&self, session: &mut Session) {
        let dropped = session.history().len();
        session.history_mut().clear();
        session.touch();
        info!(session_id = %session.id(), dropped, "History cleared");
    }

    /// Serialize the session's history. Read-only.
    pub fn export(&self, session: &Session) -> String {
        presentation::export_text(session.history())
    }

    async fn call_router(&self, query: &str) -> Result<String, RouterError> {
        let call = AssertUnwindSafe(self.router.route(query)).catch_unwind();

        let result = match self.config.route_timeout {
            Some(timeout) => tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| RouterError::Timeout { timeout })?,
            None => call.await,
        };

        result.unwrap_or_else(|panic| {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(RouterError::Internal { reason })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::conversation::session::Role;

    /// Answers with the query reversed.
    struct ReverseRouter;

    #[async_trait]
    impl AgentRouter for ReverseRouter {
        fn name(&self) -> &str {
            "reverse"
        }
        async fn route(&self, query: &str) -> Result<String, RouterError> {
            Ok(query.chars().rev().collect())
        }
    }

    struct FailingRouter;

    #[async_trait]
    impl AgentRouter for FailingRouter {
        fn name(&self) -> &str {
            "failing"
        }
        async fn route(&self, _query: &str) -> Result<String, RouterError> {
            Err(RouterError::RequestFailed {
                reason: "connection reset".to_string(),
            })
        }
    }

    struct PanickingRouter;

    #[async_trait]
    impl AgentRouter for PanickingRouter {
        fn name(&self) -> &str {
            "panicking"
        }
        async fn route(&self, _query: &str) -> Result<String, RouterError> {
            panic!("weather agent blew up");
        }
    }

    struct SlowRouter;

    #[async_trait]
    impl AgentRouter for SlowRouter {
        fn name(&self) -> &str {
            "slow"
        }
        async fn route(&self, _query: &str) -> Result<String, RouterError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    fn controller(router: impl AgentRouter + 'static) -> ConversationController {
        ConversationController::new(Arc::new(router), ConversationConfig::default())
    }

    fn roles(session: &Session) -> Vec<Role> {
        session.history().turns().iter().map(|t| t.role()).collect()
    }

    #[tokio::test]
    async fn send_appends_user_then_agent() {
        let ctl = controller(ReverseRouter);
        let mut session = Session::new();

        let outcome = ctl.send(&mut session, "abc").await;
        assert_eq!(outcome, SendOutcome::Answered);
        assert_eq!(outcome.appended(), 2);
        assert!(outcome.notice().is_none());
        assert_eq!(roles(&session), vec![Role::User, Role::Agent]);
        assert_eq!(session.history().turns()[0].text(), "abc");
        assert_eq!(session.history().turns()[1].text(), "cba");
        assert_eq!(session.state(), LoopState::Idle);
    }

    #[tokio::test]
    async fn blank_input_is_a_noop() {
        let ctl = controller(ReverseRouter);
        let mut session = Session::new();

        for input in ["", " ", "\t\n  "] {
            assert_eq!(ctl.send(&mut session, input).await, SendOutcome::Ignored);
        }
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn user_turn_keeps_input_as_typed() {
        let ctl = controller(ReverseRouter);
        let mut session = Session::new();

        ctl.send(&mut session, "  padded ").await;
        assert_eq!(session.history().turns()[0].text(), "  padded ");
    }

    #[tokio::test]
    async fn router_error_becomes_agent_turn() {
        let ctl = controller(FailingRouter);
        let mut session = Session::new();

        let outcome = ctl.send(&mut session, "hi").await;
        assert_eq!(
            outcome.notice().as_deref(),
            Some("Error processing your request: Request to agent router failed: connection reset")
        );
        assert_eq!(roles(&session), vec![Role::User, Role::Agent]);
        assert_eq!(
            session.history().turns()[1].text(),
            "Sorry, I encountered an error: Request to agent router failed: connection reset"
        );
        assert_eq!(session.state(), LoopState::Idle);
    }

    #[tokio::test]
    async fn router_panic_becomes_agent_turn() {
        let ctl = controller(PanickingRouter);
        let mut session = Session::new();

        let outcome = ctl.send(&mut session, "hi").await;
        assert_eq!(outcome.appended(), 2);
        let text = session.history().turns()[1].text();
        assert!(text.starts_with(ERROR_PREFIX));
        assert!(text.contains("weather agent blew up"));
    }

    #[tokio::test]
    async fn slow_router_times_out() {
        let ctl = ConversationController::new(
            Arc::new(SlowRouter),
            ConversationConfig {
                route_timeout: Some(Duration::from_millis(50)),
            },
        );
        let mut session = Session::new();

        let outcome = ctl.send(&mut session, "hi").await;
        assert!(matches!(outcome, SendOutcome::Failed { .. }));
        assert!(session.history().turns()[1].text().contains("did not answer"));
    }

    #[tokio::test]
    async fn failure_keeps_earlier_history() {
        let ok = controller(ReverseRouter);
        let failing = controller(FailingRouter);
        let mut session = Session::new();

        ok.send(&mut session, "one").await;
        failing.send(&mut session, "two").await;
        ok.send(&mut session, "three").await;

        let texts: Vec<&str> = session.history().turns().iter().map(|t| t.text()).collect();
        assert_eq!(texts[0..2], ["one", "eno"]);
        assert_eq!(texts[2], "two");
        assert!(texts[3].starts_with(ERROR_PREFIX));
        assert_eq!(texts[4..6], ["three", "eerht"]);
    }

    #[tokio::test]
    async fn clear_empties_regardless_of_size() {
        let ctl = controller(ReverseRouter);
        let mut session = Session::new();

        ctl.clear(&mut session);
        assert!(session.history().is_empty());

        for i in 0..5 {
            ctl.send(&mut session, &format!("msg {i}")).await;
        }
        assert_eq!(session.history().len(), 10);
        ctl.clear(&mut session);
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn export_line_count_matches_turns() {
        let ctl = controller(ReverseRouter);
        let mut session = Session::new();
        ctl.send(&mut session, "hi").await;
        ctl.send(&mut session, "there").await;

        let exported = ctl.export(&session);
        assert_eq!(exported.lines().count(), session.history().len());
        assert_eq!(exported, "user: hi\nagent: ih\nuser: there\nagent: ereht");
    }
}
