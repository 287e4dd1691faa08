//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.  Everything here is optional:
//! without flags the binary asks for the model interactively and uses the
//! defaults below.

use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::DEFAULT_ENDPOINT;

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Default number of user/assistant turns kept besides the system turn.
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Default timeout, in seconds, for connecting and for the response head.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Command-line arguments for the modelchat tool.
#[derive(CommandLine, Debug, Default, PartialEq)]
pub struct ChatArgs {
    /// Inference endpoint.
    #[arrrg(optional, "Inference endpoint (default: https://models.github.ai/inference)", "URL")]
    pub endpoint: Option<String>,

    /// Model to use for chat.
    #[arrrg(optional, "Model to use (prompted for when omitted)", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt (default: You are a helpful assistant.)", "PROMPT")]
    pub system: Option<String>,

    /// Number of turns kept in the history besides the system prompt.
    #[arrrg(optional, "Turns of history to keep (default: 10)", "TURNS")]
    pub max_history: Option<usize>,

    /// Timeout for connecting and for the first response byte.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Sampling temperature sent with every request.
    #[arrrg(optional, "Sampling temperature (default: model default)", "TEMP")]
    pub temperature: Option<f32>,

    /// Maximum tokens per reply.
    #[arrrg(optional, "Max tokens per reply (default: model default)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

// `arrrg::CommandLine` requires `Eq`; the `f32` field rules out deriving it.
impl Eq for ChatArgs {}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The inference endpoint.
    pub endpoint: String,

    /// The model to use, if already known.
    pub model: Option<String>,

    /// The system prompt that starts every conversation.
    pub system_prompt: String,

    /// Maximum number of turns kept besides the system turn.
    pub max_history: usize,

    /// Timeout for connecting and for the response head.
    pub timeout: Duration,

    /// Sampling temperature; `None` leaves it to the model.
    pub temperature: Option<f32>,

    /// Maximum tokens per reply; `None` leaves it to the model.
    pub max_tokens: Option<u32>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_history: DEFAULT_MAX_HISTORY,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            temperature: None,
            max_tokens: None,
            use_color: true,
        }
    }

    /// Sets the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the history bound.
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the per-reply token limit.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        ChatConfig {
            endpoint: args.endpoint.unwrap_or(defaults.endpoint),
            model: args
                .model
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            system_prompt: args
                .system
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.system_prompt),
            max_history: args.max_history.unwrap_or(defaults.max_history),
            timeout: args
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            temperature: args.temperature,
            max_tokens: args.max_tokens,
            use_color: !args.no_color,
        }
    }
}
