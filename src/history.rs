//! Bounded conversation history.
//!
//! [`ConversationHistory`] holds the ordered turns of a chat.  It is created
//! from the system prompt and keeps that system turn at index 0 for its whole
//! life: appends reject system turns, [`ConversationHistory::remove_last`]
//! refuses to pop it, and [`ConversationHistory::trim`] always re-inserts it in
//! front of the retained window.

use crate::error::{Error, Result};
use crate::types::{ChatRole, ChatTurn};

/// The ordered turns of one chat session, system turn first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationHistory {
    turns: Vec<ChatTurn>,
}

impl ConversationHistory {
    /// Creates a history holding only the system turn.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![ChatTurn::system(system_prompt)],
        }
    }

    /// Appends a user or assistant turn.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a system turn; the session has exactly
    /// one and it is fixed at construction.
    pub fn append(&mut self, turn: ChatTurn) -> Result<()> {
        if turn.is_system() {
            return Err(Error::validation(
                "the system turn is set once when the history is created",
                Some("role".to_string()),
            ));
        }
        self.turns.push(turn);
        Ok(())
    }

    /// Appends a user turn.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::user(content));
    }

    /// Appends an assistant turn.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::assistant(content));
    }

    /// Removes and returns the last turn.
    ///
    /// Used to roll back a user turn whose request failed.  Returns `None`
    /// rather than removing the system turn.
    pub fn remove_last(&mut self) -> Option<ChatTurn> {
        if self.turns.len() <= 1 {
            return None;
        }
        self.turns.pop()
    }

    /// Caps the history at `max_messages` turns plus the system turn.
    ///
    /// When the history already fits this is a no-op.  Otherwise the last
    /// `max_messages` turns by position are kept, and the system turn is put
    /// back in front of them.  The window is measured over the full list, so
    /// re-inserting the system turn never pushes a body turn out.
    pub fn trim(&mut self, max_messages: usize) {
        if self.turns.len() <= max_messages + 1 {
            return;
        }

        let start = self.turns.len() - max_messages;
        let system = self.turns.iter().find(|turn| turn.is_system()).cloned();
        let tail = self.turns[start..]
            .iter()
            .filter(|turn| !turn.is_system())
            .cloned();

        let trimmed: Vec<ChatTurn> = system.into_iter().chain(tail).collect();
        self.turns = trimmed;
    }

    /// Drops every turn except the system turn.
    pub fn reset(&mut self) {
        self.turns.truncate(1);
    }

    /// Returns the full ordered sequence of turns.
    pub fn all(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Returns the last turn.
    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    /// Returns the number of turns, including the system turn.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false; the system turn is never removed.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Returns the system prompt.
    pub fn system_prompt(&self) -> Option<&str> {
        self.turns
            .first()
            .filter(|turn| turn.role == ChatRole::System)
            .map(|turn| turn.content.as_str())
    }
}
