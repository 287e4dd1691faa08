//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the conversation
//! history and runs one exchange at a time against a [`CompletionTransport`].
//! A failed exchange leaves the history exactly as it was before the user
//! turn was appended.

use tokio_util::sync::CancellationToken;

use crate::chat::config::ChatConfig;
use crate::client::CompletionTransport;
use crate::error::Error;
use crate::history::ConversationHistory;
use crate::observability::{TURNS_COMMITTED, TURNS_ROLLED_BACK};
use crate::render::Renderer;
use crate::stream::consume_stream;
use crate::types::UsageStats;

/// Where the session is in the exchange cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TurnState {
    /// Waiting for the user to type something.
    AwaitingInput,
    /// A user turn has been appended but not sent.
    PendingUser,
    /// The reply is being streamed.
    Streaming,
    /// The reply was appended and the history trimmed.
    Committed,
    /// The request failed and the user turn was removed.
    RolledBack,
    /// The session is over.
    Stopped,
}

/// How a call to [`ChatSession::send_streaming`] ended.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The reply was committed to the history.
    Committed {
        /// Usage reported for this exchange, if any.
        usage: Option<UsageStats>,
    },
    /// The request failed; the history is unchanged.
    RolledBack(Error),
    /// The user cancelled; the session must stop.
    Cancelled,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: String,
    /// The number of turns in the history, including the system turn.
    pub message_count: usize,
    /// The history bound.
    pub max_history: usize,
    /// Exchanges committed so far.
    pub committed_turns: u64,
    /// Exchanges rolled back so far.
    pub rolled_back_turns: u64,
    /// Usage of the last committed exchange, if reported.
    pub last_usage: Option<UsageStats>,
}

/// A chat session that manages conversation state and API interactions.
pub struct ChatSession<T: CompletionTransport> {
    transport: T,
    config: ChatConfig,
    history: ConversationHistory,
    state: TurnState,
    last_usage: Option<UsageStats>,
    committed_turns: u64,
    rolled_back_turns: u64,
}

impl<T: CompletionTransport> ChatSession<T> {
    /// Creates a new chat session; the history starts with the configured system prompt.
    pub fn new(transport: T, config: ChatConfig) -> Self {
        let history = ConversationHistory::new(config.system_prompt.clone());
        Self {
            transport,
            config,
            history,
            state: TurnState::AwaitingInput,
            last_usage: None,
            committed_turns: 0,
            rolled_back_turns: 0,
        }
    }

    /// Sends a user message and streams the response.
    ///
    /// This method:
    /// 1. Adds the user message to history
    /// 2. Streams the reply for the whole history, rendering fragments
    /// 3. On success, adds the assistant reply and trims the history
    /// 4. On failure, removes the user message again
    ///
    /// On cancellation the user message is left in place; the session is over.
    pub async fn send_streaming(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
        cancel: &CancellationToken,
    ) -> TurnOutcome {
        let previous_len = self.history.len();

        self.transition(TurnState::PendingUser);
        self.history.push_user(user_input);

        self.transition(TurnState::Streaming);
        renderer.write_assistant_header();
        let result = consume_stream(&self.transport, self.history.all(), renderer, cancel).await;

        match result {
            Ok(reply) => {
                renderer.finish_response();
                self.history.push_assistant(reply.text);
                self.history.trim(self.config.max_history);
                self.last_usage = reply.usage;
                self.committed_turns += 1;
                TURNS_COMMITTED.click();
                self.transition(TurnState::Committed);
                TurnOutcome::Committed { usage: reply.usage }
            }
            Err(err) if err.is_cancelled() => {
                self.transition(TurnState::Stopped);
                TurnOutcome::Cancelled
            }
            Err(err) => {
                self.history.remove_last();
                debug_assert_eq!(self.history.len(), previous_len);
                self.rolled_back_turns += 1;
                TURNS_ROLLED_BACK.click();
                tracing::warn!(error = %err, "request failed; user turn rolled back");
                self.transition(TurnState::RolledBack);
                TurnOutcome::RolledBack(err)
            }
        }
    }

    /// Clears the conversation history, keeping the system prompt.
    pub fn clear(&mut self) {
        self.history.reset();
    }

    /// Returns the conversation history.
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Returns the number of turns in the history, including the system turn.
    pub fn message_count(&self) -> usize {
        self.history.len()
    }

    /// Returns the current state.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Returns the usage of the last committed exchange.
    pub fn last_usage(&self) -> Option<UsageStats> {
        self.last_usage
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self
                .config
                .model
                .clone()
                .unwrap_or_else(|| "(unknown)".to_string()),
            message_count: self.message_count(),
            max_history: self.config.max_history,
            committed_turns: self.committed_turns,
            rolled_back_turns: self.rolled_back_turns,
            last_usage: self.last_usage,
        }
    }

    pub(crate) fn transition(&mut self, next: TurnState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "turn state");
        }
        self.state = next;
    }
}
