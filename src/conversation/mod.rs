//! Conversation core: sessions, the send/clear/export loop, and terminal commands.

pub mod command;
pub mod controller;
pub mod manager;
pub mod session;

pub use command::{Command, CommandParser};
pub use controller::{ConversationController, ERROR_PREFIX, SendOutcome};
pub use manager::{SessionHandle, SessionManager, spawn_prune_task};
pub use session::{History, LoopState, Role, Session, Turn};
