//! Execution context test doubles

use blockflow::dataflow::{ExecutionContext, Job};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Runs jobs inline and counts them
#[derive(Clone, Default)]
pub struct CountingContext {
    dispatched: Arc<AtomicUsize>,
}

impl CountingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }
}

impl ExecutionContext for CountingContext {
    fn dispatch(&self, job: Job) {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        job();
    }
}

/// Drops every job without running it
pub struct DroppingContext;

impl ExecutionContext for DroppingContext {
    fn dispatch(&self, job: Job) {
        drop(job);
    }
}
