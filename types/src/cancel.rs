//! Cooperative cancellation handle threaded through analysis passes.
//!
//! One token is created per logical request (a document pass, or a
//! document+function suggestion request). Issuing a new request for the
//! same target cancels the prior token. Long operations check the token
//! immediately before spawning a subprocess or issuing a network call,
//! and again after the operation resolves but before writing results.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent; observed by all clones.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
