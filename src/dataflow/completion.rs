//! Completion tracking.
//!
//! Every block owns one [`Completion`]: a cloneable handle that resolves when
//! the block reaches a terminal state. It can be waited on from a thread
//! ([`Completion::wait`]) or awaited from async code (it implements
//! `Future`).
//!
//! [`UpstreamTracker`] is the per-target counter of propagation-enabled
//! sources that have not yet finished. A target completes itself when that
//! counter drops to zero.

use crate::dataflow::error::BlockError;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

/// Lifecycle state of a block.
#[derive(Debug, Clone)]
pub enum CompletionState {
    /// Accepting and processing input.
    Running,
    /// Input closed (or a fault recorded); draining in-flight work.
    Completing,
    /// Terminal: the first recorded fault.
    Faulted(BlockError),
    /// Terminal: drained with no fault.
    Succeeded,
}

impl CompletionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CompletionState::Faulted(_) | CompletionState::Succeeded)
    }

    /// Short label for logs and topology snapshots.
    pub fn label(&self) -> &'static str {
        match self {
            CompletionState::Running => "running",
            CompletionState::Completing => "completing",
            CompletionState::Faulted(_) => "faulted",
            CompletionState::Succeeded => "succeeded",
        }
    }
}

struct Cell {
    state: CompletionState,
    fault: Option<BlockError>,
    suppressed: Vec<BlockError>,
    wakers: Vec<Waker>,
}

struct Inner {
    cell: Mutex<Cell>,
    resolved: Condvar,
}

/// Handle to a block's eventual outcome.
#[derive(Clone)]
pub struct Completion {
    inner: Arc<Inner>,
}

impl Completion {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cell: Mutex::new(Cell {
                    state: CompletionState::Running,
                    fault: None,
                    suppressed: Vec::new(),
                    wakers: Vec::new(),
                }),
                resolved: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Cell> {
        self.inner.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state.
    pub fn state(&self) -> CompletionState {
        self.lock().state.clone()
    }

    /// Whether the block has reached Succeeded or Faulted.
    pub fn is_completed(&self) -> bool {
        self.lock().state.is_terminal()
    }

    /// Running → Completing. Returns `false` if already past Running.
    pub(crate) fn begin_completing(&self) -> bool {
        let mut cell = self.lock();
        if matches!(cell.state, CompletionState::Running) {
            cell.state = CompletionState::Completing;
            true
        } else {
            false
        }
    }

    /// Record a fault. The first one wins; later ones are kept as
    /// suppressed. Returns `true` if this call recorded the winning fault.
    pub(crate) fn record_fault(&self, error: BlockError) -> bool {
        let mut cell = self.lock();
        if cell.fault.is_some() || cell.state.is_terminal() {
            cell.suppressed.push(error);
            return false;
        }
        cell.fault = Some(error);
        if matches!(cell.state, CompletionState::Running) {
            cell.state = CompletionState::Completing;
        }
        true
    }

    /// Whether a fault has been recorded (resolved or not).
    pub fn is_faulting(&self) -> bool {
        let cell = self.lock();
        cell.fault.is_some() || matches!(cell.state, CompletionState::Faulted(_))
    }

    /// Move to the terminal state dictated by the recorded fault, wake all
    /// waiters, and return the outcome. Idempotent.
    pub(crate) fn resolve(&self) -> Result<(), BlockError> {
        let mut cell = self.lock();
        if let Some(outcome) = outcome_of(&cell.state) {
            return outcome;
        }
        cell.state = match cell.fault.clone() {
            Some(error) => CompletionState::Faulted(error),
            None => CompletionState::Succeeded,
        };
        let wakers = std::mem::take(&mut cell.wakers);
        let outcome = outcome_of(&cell.state).unwrap_or(Ok(()));
        drop(cell);

        self.inner.resolved.notify_all();
        for waker in wakers {
            waker.wake();
        }
        outcome
    }

    /// The outcome if already resolved.
    pub fn result(&self) -> Option<Result<(), BlockError>> {
        outcome_of(&self.lock().state)
    }

    /// Block the calling thread until resolved.
    pub fn wait(&self) -> Result<(), BlockError> {
        let mut cell = self.lock();
        loop {
            if let Some(outcome) = outcome_of(&cell.state) {
                return outcome;
            }
            cell = self
                .inner
                .resolved
                .wait(cell)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block for at most `timeout`. `None` means still unresolved.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<(), BlockError>> {
        let deadline = Instant::now() + timeout;
        let mut cell = self.lock();
        loop {
            if let Some(outcome) = outcome_of(&cell.state) {
                return Some(outcome);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            cell = self
                .inner
                .resolved
                .wait_timeout(cell, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Faults observed after the first one.
    pub fn suppressed(&self) -> Vec<BlockError> {
        self.lock().suppressed.clone()
    }
}

fn outcome_of(state: &CompletionState) -> Option<Result<(), BlockError>> {
    match state {
        CompletionState::Succeeded => Some(Ok(())),
        CompletionState::Faulted(error) => Some(Err(error.clone())),
        _ => None,
    }
}

impl Future for Completion {
    type Output = Result<(), BlockError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut cell = self.lock();
        if let Some(outcome) = outcome_of(&cell.state) {
            return Poll::Ready(outcome);
        }
        if !cell.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            cell.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("state", &self.state().label())
            .finish()
    }
}

/// Wait for every completion and return the first fault in slice order.
pub fn when_all(completions: &[Completion]) -> Result<(), BlockError> {
    let mut first = None;
    for completion in completions {
        if let Err(error) = completion.wait() {
            first.get_or_insert(error);
        }
    }
    match first {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

#[derive(Default)]
struct Counts {
    pending: usize,
    succeeded: usize,
}

/// Counter of propagation-enabled upstream sources for one target.
#[derive(Default)]
pub struct UpstreamTracker {
    counts: Mutex<Counts>,
}

impl UpstreamTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Counts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A propagation-enabled link to this target was created.
    pub fn register(&self) {
        self.lock().pending += 1;
    }

    /// A tracked source succeeded. Returns `true` if it was the last one.
    pub fn source_succeeded(&self) -> bool {
        let mut counts = self.lock();
        counts.pending = counts.pending.saturating_sub(1);
        counts.succeeded += 1;
        counts.pending == 0
    }

    /// A tracked source faulted.
    pub fn source_faulted(&self) {
        let mut counts = self.lock();
        counts.pending = counts.pending.saturating_sub(1);
    }

    /// A tracked source was unlinked before finishing. The target stops
    /// waiting on it but is not completed.
    pub fn withdraw(&self) {
        let mut counts = self.lock();
        counts.pending = counts.pending.saturating_sub(1);
    }

    pub fn pending(&self) -> usize {
        self.lock().pending
    }

    /// Tracked sources that finished successfully so far.
    pub fn succeeded(&self) -> usize {
        self.lock().succeeded
    }
}
