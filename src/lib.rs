// Public modules
pub mod cancel;
pub mod chat;
pub mod client;
pub mod error;
pub mod history;
pub mod input;
pub mod observability;
pub mod render;
pub mod sse;
pub mod stream;
pub mod types;

// Re-exports
pub use client::{CompletionTransport, InferenceClient, UpdateStream};
pub use error::{Error, Result};
pub use history::ConversationHistory;
pub use observability::register_biometrics;
pub use stream::{StreamedReply, consume_stream};
pub use types::*;
