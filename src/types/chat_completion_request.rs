use serde::Serialize;

use crate::types::ChatTurn;

/// Options controlling what the server appends to a stream.
#[derive(Debug, Copy, Clone, Serialize, PartialEq, Eq)]
pub struct StreamOptions {
    /// Ask for a final chunk carrying token usage.
    pub include_usage: bool,
}

/// Body of a streaming `chat/completions` request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatCompletionRequest<'a> {
    /// The model identifier, e.g. `openai/gpt-4.1-mini`.
    pub model: &'a str,

    /// The full conversation, system turn first.
    pub messages: &'a [ChatTurn],

    /// Always true; this crate only speaks the streaming protocol.
    pub stream: bool,

    /// Stream options.
    pub stream_options: StreamOptions,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl<'a> ChatCompletionRequest<'a> {
    /// Create a streaming request that asks for usage on the final chunk.
    pub fn streaming(model: &'a str, messages: &'a [ChatTurn]) -> Self {
        Self {
            model,
            messages,
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}
