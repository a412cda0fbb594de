//! "Run this on context X" port.
//!
//! Some consumers must execute on a particular thread (a UI thread is the
//! usual example). A block whose options carry an [`ExecutionContext`] hands
//! every invocation of its function to that context and waits for the
//! result; the worker thread itself never runs the function.
//!
//! [`DispatchQueue`] is the designated-thread implementation: jobs are
//! queued on a crossbeam channel and run by whichever thread pumps the
//! paired [`DispatchPump`].

use crate::dataflow::completion::Completion;
use crate::dataflow::error::BlockError;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// A unit of work marshalled onto a context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Somewhere jobs can be delivered for execution.
#[cfg_attr(test, mockall::automock)]
pub trait ExecutionContext: Send + Sync {
    /// Schedule `job`. Dropping it without running it is allowed; the
    /// waiting block then faults.
    fn dispatch(&self, job: Job);
}

/// Runs jobs immediately on the dispatching thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineContext;

impl ExecutionContext for InlineContext {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// Poll interval used by [`DispatchPump::run_until`] to re-check completion.
const PUMP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Sending half of a designated-thread context.
#[derive(Clone)]
pub struct DispatchQueue {
    name: String,
    tx: Sender<Job>,
}

/// Receiving half; owned by the designated thread.
pub struct DispatchPump {
    name: String,
    rx: Receiver<Job>,
}

/// Create a queue/pump pair.
pub fn dispatch_queue(name: impl Into<String>) -> (DispatchQueue, DispatchPump) {
    let name = name.into();
    let (tx, rx) = unbounded();
    (
        DispatchQueue {
            name: name.clone(),
            tx,
        },
        DispatchPump { name, rx },
    )
}

impl DispatchQueue {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ExecutionContext for DispatchQueue {
    fn dispatch(&self, job: Job) {
        if self.tx.send(job).is_err() {
            tracing::warn!("Dispatch pump '{}' is gone; job dropped", self.name);
        }
    }
}

impl DispatchPump {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run every job queued right now. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Pump jobs on the calling thread until `completion` resolves.
    pub fn run_until(&self, completion: &Completion) -> Result<(), BlockError> {
        loop {
            if let Some(outcome) = completion.result() {
                self.run_pending();
                return outcome;
            }
            match self.rx.recv_timeout(PUMP_POLL_INTERVAL) {
                Ok(job) => job(),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return completion.wait(),
            }
        }
    }

    /// Pump jobs until every `DispatchQueue` handle has been dropped.
    pub fn run(&self) {
        tracing::debug!("Dispatch pump '{}' started", self.name);
        while let Ok(job) = self.rx.recv() {
            job();
        }
        tracing::debug!("Dispatch pump '{}' finished", self.name);
    }
}
