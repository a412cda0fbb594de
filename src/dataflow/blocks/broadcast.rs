//! BroadcastBlock: explicit fan-out stage.

use crate::config::BlockOptions;
use crate::dataflow::block::{BlockCore, DataflowBlock, SourceBlock, TargetBlock};
use crate::dataflow::channel::SendFuture;
use crate::dataflow::completion::{Completion, UpstreamTracker};
use crate::dataflow::error::{BlockError, PostError};
use crate::dataflow::id::BlockId;
use crate::dataflow::link::{LinkHandle, LinkOptions};
use crate::error::Result;
use std::sync::Arc;

/// Passes every item, through a cloning function, to all of its links.
///
/// Always runs a single worker so every target sees items in input order.
pub struct BroadcastBlock<T> {
    core: Arc<BlockCore<T, T>>,
}

impl<T> Clone for BroadcastBlock<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Clone + Send + 'static> BroadcastBlock<T> {
    /// Broadcast `T::clone` copies.
    pub fn new() -> Result<Self> {
        Self::with_cloning(T::clone, BlockOptions::default())
    }

    pub fn with_options(options: BlockOptions) -> Result<Self> {
        Self::with_cloning(T::clone, options)
    }

    /// Broadcast whatever `clone_fn` makes of each item.
    pub fn with_cloning<F>(clone_fn: F, options: BlockOptions) -> Result<Self>
    where
        F: Fn(&T) -> T + Send + Sync + 'static,
    {
        if options.parallelism > 1 {
            tracing::debug!(
                "Broadcast block runs a single worker ({} requested)",
                options.parallelism
            );
        }
        let options = options.with_parallelism(1);
        let core = BlockCore::spawn("broadcast", Arc::new(move |item: T| Ok(clone_fn(&item))), options)?;
        Ok(Self { core })
    }

    pub fn input_count(&self) -> usize {
        self.core.input_count()
    }
}

impl<T: Clone + Send + 'static> DataflowBlock for BroadcastBlock<T> {
    fn id(&self) -> BlockId {
        self.core.id()
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    fn complete(&self) {
        self.core.complete();
    }

    fn fault(&self, error: BlockError) {
        self.core.fault(error);
    }

    fn completion(&self) -> Completion {
        self.core.completion()
    }
}

impl<T: Clone + Send + 'static> TargetBlock<T> for BroadcastBlock<T> {
    fn try_post(&self, item: T) -> std::result::Result<(), PostError<T>> {
        self.core.try_post(item)
    }

    fn send(&self, item: T) -> bool {
        self.core.send(item)
    }

    fn send_async(&self, item: T) -> SendFuture<T> {
        self.core.send_async(item)
    }

    fn upstream(&self) -> &UpstreamTracker {
        self.core.upstream()
    }
}

impl<T: Clone + Send + 'static> SourceBlock<T> for BroadcastBlock<T> {
    fn link_to_target(
        &self,
        target: Arc<dyn TargetBlock<T>>,
        options: LinkOptions<T>,
    ) -> LinkHandle {
        self.core.link(target, options)
    }

    fn link_count(&self) -> usize {
        self.core.link_count()
    }
}

impl<T> std::fmt::Debug for BroadcastBlock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastBlock")
            .field("id", &self.core.id())
            .field("name", &self.core.name())
            .finish()
    }
}
