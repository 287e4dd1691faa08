//! The interactive chat loop.
//!
//! [`run_chat_loop`] reads a line, dispatches slash commands, and hands
//! everything else to [`ChatSession::send_streaming`] until the user exits,
//! input ends, or the session is cancelled.  Recoverable request failures are
//! reported and the loop continues.

use tokio_util::sync::CancellationToken;

use crate::chat::commands::{ChatCommand, help_text, parse_command};
use crate::chat::session::{ChatSession, SessionStats, TurnOutcome, TurnState};
use crate::client::CompletionTransport;
use crate::error::Result;
use crate::input::{InputEvent, LineInput};
use crate::render::{Renderer, group_thousands};

/// The prompt shown before each user message.
pub const INPUT_PROMPT: &str = "Enter your message (or /exit): ";

/// Shown once when the session ends by cancellation.
pub const CANCELLED_MESSAGE: &str = "Operation cancelled.";

/// Why the chat loop returned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The user typed an exit command.
    ExitCommand,
    /// The session was cancelled with Ctrl+C.
    Cancelled,
    /// The input was closed.
    EndOfInput,
}

/// Runs the read/send loop until the session stops.
///
/// # Errors
///
/// Only failures to read input are returned; request failures are shown
/// through `renderer` and the loop keeps going.
pub async fn run_chat_loop<T: CompletionTransport>(
    session: &mut ChatSession<T>,
    input: &mut dyn LineInput,
    renderer: &mut dyn Renderer,
    cancel: &CancellationToken,
) -> Result<LoopExit> {
    let exit = loop {
        if cancel.is_cancelled() {
            renderer.display_error(CANCELLED_MESSAGE);
            break LoopExit::Cancelled;
        }
        session.transition(TurnState::AwaitingInput);

        let line = match input.read_line(INPUT_PROMPT)? {
            InputEvent::Line(line) => line,
            InputEvent::Interrupted => {
                cancel.cancel();
                renderer.display_error(CANCELLED_MESSAGE);
                break LoopExit::Cancelled;
            }
            InputEvent::Eof => break LoopExit::EndOfInput,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = parse_command(line) {
            match command {
                ChatCommand::Exit => break LoopExit::ExitCommand,
                ChatCommand::Clear => {
                    session.clear();
                    renderer.print_info("Conversation cleared.");
                }
                ChatCommand::Help => renderer.print_info(help_text()),
                ChatCommand::Stats => {
                    for line in stats_lines(&session.stats()) {
                        renderer.print_info(&line);
                    }
                }
            }
            continue;
        }

        match session.send_streaming(line, renderer, cancel).await {
            TurnOutcome::Committed { usage } => {
                if let Some(usage) = usage {
                    renderer.display_usage(&usage);
                }
            }
            TurnOutcome::RolledBack(err) => {
                renderer.display_error(&format!("Request failed: {err}"));
            }
            TurnOutcome::Cancelled => {
                renderer.display_error(CANCELLED_MESSAGE);
                break LoopExit::Cancelled;
            }
        }
    };

    session.transition(TurnState::Stopped);
    tracing::info!(?exit, turns = session.message_count(), "chat loop finished");
    Ok(exit)
}

/// The lines printed for `/stats`.
pub fn stats_lines(stats: &SessionStats) -> Vec<String> {
    let mut lines = vec![
        format!("Model: {}", stats.model),
        format!(
            "Messages: {} (history keeps {} besides the system prompt)",
            stats.message_count, stats.max_history
        ),
        format!(
            "Exchanges: {} completed, {} failed",
            stats.committed_turns, stats.rolled_back_turns
        ),
    ];
    match stats.last_usage {
        Some(usage) => lines.push(format!(
            "Last usage: {} prompt + {} completion = {} tokens",
            group_thousands(usage.prompt_tokens.into()),
            group_thousands(usage.completion_tokens.into()),
            group_thousands(usage.total_tokens.into()),
        )),
        None => lines.push("Last usage: (none)".to_string()),
    }
    lines
}
