//! Terminal input parsing.
//!
//! Slash commands map onto the loop's transitions; everything else is a
//! message for the router.

/// A parsed line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send the text as typed.
    Send(String),
    Clear,
    /// Export the history, to a file if a path is given.
    Export { path: Option<String> },
    /// Show credential status.
    Status,
    /// Re-render the history.
    History,
    Help,
    Quit,
}

/// Parses terminal lines into `Command`s.
pub struct CommandParser;

impl CommandParser {
    pub fn parse(line: &str) -> Command {
        let trimmed = line.trim();
        let lower = trimmed.to_lowercase();

        match lower.as_str() {
            "/clear" => Command::Clear,
            "/status" => Command::Status,
            "/history" => Command::History,
            "/help" | "/?" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            _ => parse_export(trimmed, &lower).unwrap_or_else(|| Command::Send(line.to_string())),
        }
    }
}

/// `/export [path]`.
fn parse_export(trimmed: &str, lower: &str) -> Option<Command> {
    if lower == "/export" {
        return Some(Command::Export { path: None });
    }
    if !lower.starts_with("/export ") {
        return None;
    }
    let path = trimmed["/export ".len()..].trim();
    Some(Command::Export {
        path: (!path.is_empty()).then(|| path.to_string()),
    })
}

/// Help text for the terminal surface.
pub const HELP: &str = "\
Commands:
  /clear          clear the conversation
  /export [path]  print the transcript, or write it to a file
  /status         show API credential status
  /history        show the conversation
  /help           this message
  /quit           exit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_sent_as_typed() {
        assert_eq!(
            CommandParser::parse("  what's the weather? "),
            Command::Send("  what's the weather? ".to_string())
        );
    }

    #[test]
    fn commands_are_case_insensitive() {
        assert_eq!(CommandParser::parse("/CLEAR"), Command::Clear);
        assert_eq!(CommandParser::parse(" /Quit "), Command::Quit);
        assert_eq!(CommandParser::parse("/exit"), Command::Quit);
        assert_eq!(CommandParser::parse("/?"), Command::Help);
    }

    #[test]
    fn export_with_and_without_path() {
        assert_eq!(
            CommandParser::parse("/export"),
            Command::Export { path: None }
        );
        assert_eq!(
            CommandParser::parse("/export  Chat Log.txt "),
            Command::Export {
                path: Some("Chat Log.txt".to_string())
            }
        );
    }

    #[test]
    fn unknown_slash_text_is_a_message() {
        assert_eq!(
            CommandParser::parse("/exporter"),
            Command::Send("/exporter".to_string())
        );
    }

    #[test]
    fn blank_line_is_an_empty_send() {
        assert_eq!(CommandParser::parse("   "), Command::Send("   ".to_string()));
    }
}
