//! Interactive chat against an OpenAI-compatible inference endpoint.
//!
//! This module provides the streaming REPL built on top of the client
//! library.  It supports:
//!
//! - Streaming responses with real-time token display
//! - A bounded conversation history that always keeps the system prompt
//! - Rollback of the user turn when a request fails
//! - Slash commands for session control
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: one exchange at a time, with commit or rollback
//! - [`orchestrator`]: the read/dispatch loop
//! - [`commands`]: slash command parsing

pub mod commands;
pub mod config;
pub mod orchestrator;
pub mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use orchestrator::{LoopExit, run_chat_loop};
pub use session::{ChatSession, SessionStats, TurnOutcome, TurnState};
