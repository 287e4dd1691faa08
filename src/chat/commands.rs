//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the API.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Exit the chat application.
    Exit,

    /// Drop the conversation, keeping the system prompt.
    Clear,

    /// Display help information.
    Help,

    /// Display session statistics (history length, model, last usage).
    Stats,
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` only when the whole input is one of the known
/// command names; command names are case-insensitive.  Everything else,
/// including unknown names such as `/usr/bin/env` and known names followed by
/// more text, is `None` and should be sent as a regular message.
///
/// # Examples
///
/// ```
/// # use modelchat::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/exit"), Some(ChatCommand::Exit));
/// assert_eq!(parse_command("/EXIT"), Some(ChatCommand::Exit));
/// assert!(parse_command("/usr/bin/env python3?").is_none());
/// assert!(parse_command("Hello there").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let name = input.trim().strip_prefix('/')?;
    match name.to_lowercase().as_str() {
        "exit" | "quit" | "q" => Some(ChatCommand::Exit),
        "clear" => Some(ChatCommand::Clear),
        "help" | "?" => Some(ChatCommand::Help),
        "stats" | "status" => Some(ChatCommand::Stats),
        _ => None,
    }
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear conversation history (keeps the system prompt)
  /stats                 Show session statistics
  /help                  Show this help message
  /exit                  Exit the chat (also /quit)
Press Ctrl+C to cancel a reply and end the session."#
}
