//! Cooperative cancellation.
//!
//! A `CancellationToken` is handed to blocks through `BlockOptions`. When it
//! is cancelled every registered block faults with `BlockError::Cancelled`,
//! discarding its queued input. Items already being processed finish, but
//! their results are not delivered.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct TokenState {
    cancelled: bool,
    callbacks: Vec<Callback>,
}

/// Shared cancellation flag with cancel-time callbacks.
#[derive(Clone, Default)]
pub struct CancellationToken {
    state: Arc<Mutex<TokenState>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request cancellation. Callbacks run on the calling thread, once.
    pub fn cancel(&self) {
        let callbacks = {
            let mut state = self.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            std::mem::take(&mut state.callbacks)
        };
        tracing::debug!("Cancellation requested; notifying {} blocks", callbacks.len());
        for callback in callbacks {
            callback();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Run `callback` on cancellation, or right away if already cancelled.
    pub(crate) fn on_cancel(&self, callback: Callback) {
        let mut state = self.lock();
        if state.cancelled {
            drop(state);
            callback();
        } else {
            state.callbacks.push(callback);
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_callbacks_run_once() {
        let token = CancellationToken::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            token.on_cancel(Box::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert!(!token.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_late_registration_fires_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        token.on_cancel(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
