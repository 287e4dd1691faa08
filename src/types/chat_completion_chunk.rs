use serde::{Deserialize, Serialize};

use crate::types::{ChatRole, UsageStats};

/// The incremental part of a choice in a streamed chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkDelta {
    /// Present on the first chunk of a reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ChatRole>,

    /// The text generated since the previous chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// One choice inside a streamed chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkChoice {
    /// Index of the choice; always 0 for single-choice requests.
    #[serde(default)]
    pub index: u32,

    /// The delta for this choice.
    #[serde(default)]
    pub delta: ChunkDelta,

    /// Why generation stopped, on the last chunk of the choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// A single `chat.completion.chunk` object from the event stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatCompletionChunk {
    /// Identifier shared by all chunks of one completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The model that served the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Choices carried by this chunk.  Empty on the usage-only final chunk.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,

    /// Token usage, on the final chunk only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageStats>,
}

/// What the stream consumer sees of one chunk: new text and/or usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamUpdate {
    /// Text to display and accumulate, if any.
    pub fragment: Option<String>,

    /// Usage statistics, if the chunk carried them.
    pub usage: Option<UsageStats>,
}

impl StreamUpdate {
    /// An update carrying only text.
    pub fn fragment(text: impl Into<String>) -> Self {
        Self {
            fragment: Some(text.into()),
            usage: None,
        }
    }

    /// An update carrying only usage.
    pub fn usage(usage: UsageStats) -> Self {
        Self {
            fragment: None,
            usage: Some(usage),
        }
    }
}

impl From<ChatCompletionChunk> for StreamUpdate {
    fn from(chunk: ChatCompletionChunk) -> Self {
        let mut fragment: Option<String> = None;
        for choice in chunk.choices {
            if let Some(content) = choice.delta.content {
                match fragment.as_mut() {
                    Some(text) => text.push_str(&content),
                    None => fragment = Some(content),
                }
            }
        }
        Self {
            fragment,
            usage: chunk.usage,
        }
    }
}
