//! Terminal chat: stdin/stdout REPL over a single session.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::conversation::{Command, CommandParser, ConversationController, Session, command};
use crate::error::Error;
use crate::presentation::{self, CredentialStatus};

/// Interactive chat on the terminal. One session for the life of the process.
pub struct TerminalChat {
    controller: Arc<ConversationController>,
    status: Vec<CredentialStatus>,
}

impl TerminalChat {
    pub fn new(controller: Arc<ConversationController>, status: Vec<CredentialStatus>) -> Self {
        Self { controller, status }
    }

    /// Run against the process's stdin and stdout until EOF or `/quit`.
    pub async fn run(&self) -> Result<(), Error> {
        self.run_with(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Run against any line source and sink.
    pub async fn run_with<R, W>(&self, mut reader: R, mut out: W) -> Result<(), Error>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut session = Session::new();
        let mut buf = Vec::new();
        info!(session_id = %session.id(), "Terminal session started");

        out.write_all(b"Type a message and press Enter. /help for commands.\n> ")
            .await?;
        out.flush().await?;

        while let Some(line) = read_line(&mut reader, &mut buf).await? {
            match CommandParser::parse(&line) {
                Command::Send(text) => {
                    let before = session.history().len();
                    if !text.trim().is_empty() {
                        out.write_all(b"Thinking...\n").await?;
                        out.flush().await?;
                    }
                    let outcome = self.controller.send(&mut session, &text).await;
                    if let Some(notice) = outcome.notice() {
                        write_line(&mut out, &notice).await?;
                    }
                    for turn in &session.history().turns()[before..] {
                        write_line(&mut out, &presentation::render_turn(turn)).await?;
                    }
                }
                Command::Clear => {
                    self.controller.clear(&mut session);
                    write_line(&mut out, "Chat cleared.").await?;
                }
                Command::Export { .. } if session.history().is_empty() => {
                    write_line(&mut out, presentation::NOTHING_TO_EXPORT).await?;
                }
                Command::Export { path: None } => {
                    write_line(&mut out, &self.controller.export(&session)).await?;
                }
                Command::Export { path: Some(path) } => {
                    match tokio::fs::write(&path, self.controller.export(&session)).await {
                        Ok(()) => write_line(&mut out, &format!("Exported to {}", path)).await?,
                        Err(e) => {
                            warn!(path = %path, error = %e, "Export failed");
                            write_line(&mut out, &format!("Export failed: {}", e)).await?;
                        }
                    }
                }
                Command::Status => {
                    for row in &self.status {
                        write_line(&mut out, &row.render()).await?;
                    }
                }
                Command::History => {
                    for line in presentation::render_history(session.history()) {
                        write_line(&mut out, &line).await?;
                    }
                }
                Command::Help => write_line(&mut out, command::HELP).await?,
                Command::Quit => break,
            }
            out.write_all(b"> ").await?;
            out.flush().await?;
        }

        info!(
            session_id = %session.id(),
            turns = session.history().len(),
            "Terminal session ended"
        );
        Ok(())
    }
}

/// Next input line without its line ending. Invalid UTF-8 is replaced, not
/// rejected. `None` at EOF.
async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, line: &str) -> std::io::Result<()> {
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await
}
