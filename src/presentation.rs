//! Presentation: history rendering, credential status, and the text export.
//!
//! Everything here is a pure function of session state and the presence
//! flags captured at load time.

use serde::Serialize;

use crate::conversation::{History, Role, Turn};
use crate::credentials::CredentialName;

/// File name offered for the exported transcript.
pub const EXPORT_FILENAME: &str = "chat_export.txt";

/// MIME type of the exported transcript.
pub const EXPORT_MIME: &str = "text/plain; charset=utf-8";

/// Shown in place of an empty history.
pub const EMPTY_HISTORY_HINT: &str = "Start a conversation by typing a message below!";

/// Reply to an export request on an empty history.
pub const NOTHING_TO_EXPORT: &str = "Nothing to export yet.";

/// Prefix of the notice shown alongside an error turn.
pub const ERROR_NOTICE_PREFIX: &str = "Error processing your request: ";

/// Display order of the status panel.
const STATUS_ORDER: [CredentialName; 3] = [
    CredentialName::GroqApiKey,
    CredentialName::HfToken,
    CredentialName::TomorrowApiKey,
];

/// `"{role}: {text}"` per turn, newline-separated, no trailing newline.
pub fn export_text(history: &History) -> String {
    history
        .turns()
        .iter()
        .map(|turn| format!("{}: {}", turn.role(), turn.text()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Chat line for one turn.
pub fn render_turn(turn: &Turn) -> String {
    match turn.role() {
        Role::User => format!("🧑 **You:** {}", turn.text()),
        Role::Agent => format!("🤖 **Bot:** {}", turn.text()),
    }
}

/// Chat lines for the whole history, or the hint if it is empty.
pub fn render_history(history: &History) -> Vec<String> {
    if history.is_empty() {
        return vec![EMPTY_HISTORY_HINT.to_string()];
    }
    history.turns().iter().map(render_turn).collect()
}

/// One row of the API status panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialStatus {
    pub name: CredentialName,
    pub label: &'static str,
    pub connected: bool,
}

impl CredentialStatus {
    pub fn status_text(&self) -> &'static str {
        if self.connected {
            "Connected"
        } else {
            "Missing"
        }
    }

    /// `"Groq API: ✅ Connected"` style line.
    pub fn render(&self) -> String {
        let mark = if self.connected { "✅" } else { "❌" };
        format!("{}: {} {}", self.label, mark, self.status_text())
    }
}

/// Status rows from load-time presence flags.
pub fn credential_status(presence: &[(CredentialName, bool)]) -> Vec<CredentialStatus> {
    STATUS_ORDER
        .iter()
        .map(|name| CredentialStatus {
            name: *name,
            label: name.service_label(),
            connected: presence
                .iter()
                .any(|(present_name, present)| present_name == name && *present),
        })
        .collect()
}
