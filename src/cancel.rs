//! Process-wide cancellation.
//!
//! A single [`CancellationToken`] is created per session and handed to every
//! suspendable operation.  Ctrl+C cancels it instead of killing the process;
//! the chat loop notices between turns and the stream consumer notices during
//! a read.  Cancelling is one-way and idempotent.

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Routes Ctrl+C (and, with the `termination` feature, SIGTERM) to `token`.
///
/// Call this after any interactive setup: until it runs, an interrupt keeps
/// its default behavior of ending the process.
///
/// # Errors
///
/// Fails if a handler has already been installed for this process.
pub fn install_interrupt_handler(token: CancellationToken) -> Result<()> {
    ctrlc::set_handler(move || {
        if !token.is_cancelled() {
            tracing::info!("interrupt received; cancelling session");
        }
        token.cancel();
    })
    .map_err(|err| {
        Error::io(
            "failed to install the interrupt handler",
            std::io::Error::other(err.to_string()),
        )
    })
}
