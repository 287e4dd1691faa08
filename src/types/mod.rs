// Public modules
pub mod chat_completion_chunk;
pub mod chat_completion_request;
pub mod chat_turn;
pub mod usage;

// Re-exports
pub use chat_completion_chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta, StreamUpdate};
pub use chat_completion_request::{ChatCompletionRequest, StreamOptions};
pub use chat_turn::{ChatRole, ChatTurn};
pub use usage::UsageStats;
