//! Cooperative cancellation for the connection loop.
//!
//! The loop only looks at the token between cycles. A cycle blocked in the
//! FIFO rendezvous keeps running until a reader attaches, so the supervisor
//! never waits for the token to be acknowledged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation token shared between the supervisor and the worker.
///
/// Cloning shares state: once any clone is cancelled, all clones observe it.
///
/// # Example
///
/// ```
/// use pgpass_core::cancel::CancellationToken;
///
/// let token = CancellationToken::new();
/// let worker_view = token.clone();
///
/// token.cancel();
/// assert!(worker_view.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Checkpoint helper for loops that return early on cancellation.
    pub fn check(&self) -> Result<(), CancelledError> {
        if self.is_cancelled() {
            Err(CancelledError)
        } else {
            Ok(())
        }
    }
}

/// Returned from [`CancellationToken::check`] once cancellation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelledError;

impl std::fmt::Display for CancelledError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Shutdown requested")
    }
}

impl std::error::Error for CancelledError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_token_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_clone_shares_state() {
        let token1 = CancellationToken::new();
        let token2 = token1.clone();

        token2.cancel();

        assert!(token1.is_cancelled());
        assert_eq!(token1.check(), Err(CancelledError));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let token = CancellationToken::default();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
