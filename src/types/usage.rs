use serde::{Deserialize, Serialize};

/// Server-reported token counts for one completed exchange.
///
/// The service reports usage on the final chunk of a stream when the request
/// asks for it.  Usage is per turn; the session keeps only the latest value.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageStats {
    /// The number of tokens in the prompt (the whole history sent).
    #[serde(default)]
    pub prompt_tokens: u32,

    /// The number of tokens generated for the reply.
    #[serde(default)]
    pub completion_tokens: u32,

    /// The total reported by the server.
    #[serde(default)]
    pub total_tokens: u32,
}

impl UsageStats {
    /// Create a new `UsageStats`; the total is the sum of both counts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}
