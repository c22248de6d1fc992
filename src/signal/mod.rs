//! Interrupt handling for cache updates (SIGINT/SIGTERM)
//!
//! The handler only flips a shared [`CancelToken`]. The download loop, the
//! render pool and the update controller poll it and unwind with
//! `Error::Cancelled`; staged output is dropped and the live cache is left
//! alone. Once the final swap has started it runs to completion.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    signal_count: AtomicU8,
}

/// Action taken after receiving a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: stop the update at the next check
    InitiateCancellation,
    /// Later signals: already cancelling
    Ignore,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Number of signals received
    pub fn signal_count(&self) -> u8 {
        self.inner.signal_count.load(Ordering::SeqCst)
    }

    /// Record a SIGINT/SIGTERM.
    pub fn handle_signal(&self) -> SignalAction {
        let count = self.inner.signal_count.fetch_add(1, Ordering::SeqCst);
        self.cancel();
        if count == 0 {
            SignalAction::InitiateCancellation
        } else {
            SignalAction::Ignore
        }
    }

    /// `Err(Error::Cancelled)` once cancellation was requested.
    pub fn check(&self) -> crate::Result<()> {
        if self.is_cancelled() {
            Err(crate::Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Install the process signal handler.
///
/// Must be called at most once per process.
pub fn install_interrupt_handler(token: &CancelToken) -> Result<(), ctrlc::Error> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        if token.handle_signal() == SignalAction::InitiateCancellation {
            tracing::info!("interrupt received, cancelling update");
        }
    })
}
