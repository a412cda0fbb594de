//! Block traits and the shared worker core.
//!
//! Every concrete block is a cheap `Clone` handle around an
//! `Arc<BlockCore<I, O>>`. The core owns the input channel, the outgoing
//! link table, the completion cell and the upstream tracker, and runs
//! `parallelism` named worker threads that compete on the input.
//!
//! # Worker loop
//!
//! ```text
//! dequeue ──► transform ──► offer to matching links (blocking send)
//!    │            │
//!    │            └─ error / panic ──► fault: close + clear input
//!    └─ end of stream ──► last worker out resolves completion
//!                                 └─► propagate to linked targets
//! ```

use crate::config::BlockOptions;
use crate::dataflow::channel::{Channel, SendFuture};
use crate::dataflow::completion::{Completion, CompletionState, UpstreamTracker};
use crate::dataflow::context::ExecutionContext;
use crate::dataflow::error::{BlockError, PostError};
use crate::dataflow::id::BlockId;
use crate::dataflow::link::{self, LinkHandle, LinkOptions, LinkTable};
use crate::error::{DataflowError, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Operations shared by every block.
pub trait DataflowBlock: Send + Sync {
    fn id(&self) -> BlockId;

    fn name(&self) -> &str;

    /// Stop accepting input; finish once queued items are processed.
    /// Idempotent.
    fn complete(&self);

    /// Force the block into the Faulted state, discarding queued input.
    fn fault(&self, error: BlockError);

    /// Handle that resolves when the block reaches a terminal state.
    fn completion(&self) -> Completion;

    fn state(&self) -> CompletionState {
        self.completion().state()
    }
}

/// A block that accepts items of type `T`.
pub trait TargetBlock<T>: DataflowBlock {
    /// Non-blocking enqueue. The item is handed back on refusal.
    fn try_post(&self, item: T) -> std::result::Result<(), PostError<T>>;

    /// Non-blocking enqueue; `false` when refused.
    fn post(&self, item: T) -> bool {
        self.try_post(item).is_ok()
    }

    /// Block the caller until the item is accepted. `false` means the input
    /// closed first.
    fn send(&self, item: T) -> bool;

    /// Suspending variant of [`TargetBlock::send`].
    fn send_async(&self, item: T) -> SendFuture<T>;

    /// Propagation-enabled sources still feeding this block.
    fn upstream(&self) -> &UpstreamTracker;
}

/// A block that produces items of type `T`.
pub trait SourceBlock<T>: DataflowBlock {
    /// Link to a type-erased target.
    fn link_to_target(&self, target: Arc<dyn TargetBlock<T>>, options: LinkOptions<T>)
        -> LinkHandle;

    /// Number of live outgoing links.
    fn link_count(&self) -> usize;

    /// Link to `target`. Every produced item accepted by the link's
    /// predicate is delivered to `target` through its blocking `send`.
    fn link_to<B>(&self, target: &B, options: LinkOptions<T>) -> LinkHandle
    where
        B: TargetBlock<T> + Clone + 'static,
        Self: Sized,
    {
        self.link_to_target(Arc::new(target.clone()), options)
    }
}

/// Boxed block function.
pub(crate) type TransformFn<I, O> = dyn Fn(I) -> anyhow::Result<O> + Send + Sync;

pub(crate) struct BlockCore<I, O> {
    id: BlockId,
    name: String,
    input: Arc<Channel<I>>,
    links: Arc<LinkTable<O>>,
    completion: Completion,
    upstream: UpstreamTracker,
    active_workers: AtomicUsize,
    transform: Arc<TransformFn<I, O>>,
    context: Option<Arc<dyn ExecutionContext>>,
}

impl<I, O> BlockCore<I, O> {
    pub(crate) fn id(&self) -> BlockId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

impl<I, O> BlockCore<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    /// Validate `options`, build the core and start its workers.
    ///
    /// `kind` prefixes the generated name when `options.name` is unset.
    pub(crate) fn spawn(
        kind: &str,
        transform: Arc<TransformFn<I, O>>,
        options: BlockOptions,
    ) -> Result<Arc<Self>> {
        options.validate()?;

        let id = BlockId::next();
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| format!("{}{}", kind, id));
        let parallelism = options.parallelism;

        let core = Arc::new(Self {
            id,
            name,
            input: Arc::new(Channel::with_capacity(options.bounded_capacity)),
            links: LinkTable::new(id),
            completion: Completion::new(),
            upstream: UpstreamTracker::new(),
            active_workers: AtomicUsize::new(parallelism),
            transform,
            context: options.context.clone(),
        });

        for index in 0..parallelism {
            let worker = Arc::clone(&core);
            let spawned = thread::Builder::new()
                .name(format!("{}-w{}", core.name, index))
                .spawn(move || worker.run_worker());

            if let Err(source) = spawned {
                // Workers already running drain nothing and exit.
                core.input.close_and_clear();
                let missing = parallelism - index;
                if core.active_workers.fetch_sub(missing, Ordering::AcqRel) == missing {
                    core.finish();
                }
                return Err(DataflowError::WorkerSpawn {
                    block: core.name.clone(),
                    source,
                });
            }
        }

        if let Some(token) = &options.cancellation {
            let weak = Arc::downgrade(&core);
            token.on_cancel(Box::new(move || {
                if let Some(core) = weak.upgrade() {
                    core.fault(BlockError::Cancelled { block: core.id });
                }
            }));
        }

        tracing::debug!(
            "Started block {} '{}' (parallelism: {}, capacity: {:?}, on context: {})",
            core.id,
            core.name,
            parallelism,
            options.bounded_capacity,
            core.context.is_some()
        );
        Ok(core)
    }

    fn run_worker(self: Arc<Self>) {
        while let Some(item) = self.input.dequeue() {
            if self.completion.is_faulting() {
                break;
            }
            match self.invoke(item) {
                Ok(output) => self.offer(output),
                Err(error) => {
                    self.fault(error);
                    break;
                }
            }
        }

        if self.active_workers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.finish();
        }
    }

    fn invoke(&self, item: I) -> std::result::Result<O, BlockError> {
        let Some(context) = &self.context else {
            return call(self.id, &*self.transform, item);
        };

        let (tx, rx) = crossbeam_channel::bounded(1);
        let transform = Arc::clone(&self.transform);
        let id = self.id;
        context.dispatch(Box::new(move || {
            // The worker blocks on `rx` until this reply arrives.
            tx.send(call(id, &*transform, item)).ok();
        }));
        rx.recv().unwrap_or_else(|_| {
            Err(BlockError::transform(
                id,
                anyhow::anyhow!("execution context dropped the job"),
            ))
        })
    }

    /// Deliver `output` to every matching link in registration order. The
    /// last target receives the original value, the rest receive clones.
    fn offer(&self, output: O) {
        let mut targets = self.links.matching(&output);
        let Some(last) = targets.pop() else {
            tracing::trace!("No link of '{}' accepted the item; dropped", self.name);
            return;
        };
        for target in &targets {
            if self.completion.is_faulting() {
                return;
            }
            self.deliver(target.as_ref(), output.clone());
        }
        if !self.completion.is_faulting() {
            self.deliver(last.as_ref(), output);
        }
    }

    fn deliver(&self, target: &dyn TargetBlock<O>, item: O) {
        if !target.send(item) {
            tracing::warn!(
                "'{}' declined an item from '{}'; the item is lost",
                target.name(),
                self.name
            );
        }
    }

    /// Last worker out: settle the outcome and notify propagating links.
    fn finish(&self) {
        let outcome = self.completion.resolve();
        match &outcome {
            Ok(()) => tracing::debug!("Block '{}' succeeded", self.name),
            Err(error) => tracing::debug!("Block '{}' faulted: {}", self.name, error),
        }
        for target in self.links.seal(outcome.clone()) {
            link::propagate_outcome(&target, &outcome);
        }
    }

    pub(crate) fn complete(&self) {
        if self.completion.is_faulting() {
            return;
        }
        self.completion.begin_completing();
        if self.input.close() {
            tracing::debug!(
                "Completion requested for '{}' with {} items queued",
                self.name,
                self.input.len()
            );
        }
    }

    pub(crate) fn fault(&self, error: BlockError) {
        let message = error.to_string();
        if self.completion.record_fault(error) {
            let discarded = self.input.close_and_clear();
            tracing::warn!(
                "Block '{}' faulted, discarding {} queued items: {}",
                self.name,
                discarded,
                message
            );
        }
    }

    pub(crate) fn completion(&self) -> Completion {
        self.completion.clone()
    }

    pub(crate) fn try_post(&self, item: I) -> std::result::Result<(), PostError<I>> {
        self.input.try_enqueue(item)
    }

    pub(crate) fn send(&self, item: I) -> bool {
        self.input.enqueue(item).is_ok()
    }

    pub(crate) fn send_async(&self, item: I) -> SendFuture<I> {
        self.input.enqueue_async(item)
    }

    pub(crate) fn upstream(&self) -> &UpstreamTracker {
        &self.upstream
    }

    pub(crate) fn link(
        &self,
        target: Arc<dyn TargetBlock<O>>,
        options: LinkOptions<O>,
    ) -> LinkHandle {
        self.links.add(target, options)
    }

    pub(crate) fn link_count(&self) -> usize {
        self.links.len()
    }

    pub(crate) fn input_count(&self) -> usize {
        self.input.len()
    }

    pub(crate) fn peak_input_count(&self) -> usize {
        self.input.peak_len()
    }

    pub(crate) fn capacity(&self) -> Option<usize> {
        self.input.capacity()
    }
}

fn call<I, O>(
    block: BlockId,
    transform: &TransformFn<I, O>,
    item: I,
) -> std::result::Result<O, BlockError> {
    match panic::catch_unwind(AssertUnwindSafe(|| transform(item))) {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(error)) => Err(BlockError::transform(block, error)),
        Err(payload) => Err(BlockError::from_panic(block, payload)),
    }
}
