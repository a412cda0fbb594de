//! TransformBlock: `I -> O` with linked outputs.

use crate::config::BlockOptions;
use crate::dataflow::block::{BlockCore, DataflowBlock, SourceBlock, TargetBlock};
use crate::dataflow::channel::SendFuture;
use crate::dataflow::completion::{Completion, UpstreamTracker};
use crate::dataflow::error::{BlockError, PostError};
use crate::dataflow::id::BlockId;
use crate::dataflow::link::{LinkHandle, LinkOptions};
use crate::error::Result;
use std::sync::Arc;

/// Applies a function to every input item and offers each result to its
/// links.
///
/// With `parallelism > 1` results may leave out of input order.
pub struct TransformBlock<I, O> {
    core: Arc<BlockCore<I, O>>,
}

impl<I, O> Clone for TransformBlock<I, O> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<I, O> TransformBlock<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    pub fn new<F>(f: F) -> Result<Self>
    where
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        Self::with_options(f, BlockOptions::default())
    }

    pub fn with_options<F>(f: F, options: BlockOptions) -> Result<Self>
    where
        F: Fn(I) -> O + Send + Sync + 'static,
    {
        Self::try_with_options(move |item| Ok(f(item)), options)
    }

    /// Fallible function: an `Err` faults the block.
    pub fn try_new<F>(f: F) -> Result<Self>
    where
        F: Fn(I) -> anyhow::Result<O> + Send + Sync + 'static,
    {
        Self::try_with_options(f, BlockOptions::default())
    }

    pub fn try_with_options<F>(f: F, options: BlockOptions) -> Result<Self>
    where
        F: Fn(I) -> anyhow::Result<O> + Send + Sync + 'static,
    {
        let core = BlockCore::spawn("transform", Arc::new(f), options)?;
        Ok(Self { core })
    }

    /// Items waiting in the input.
    pub fn input_count(&self) -> usize {
        self.core.input_count()
    }

    /// Highest input length observed so far.
    pub fn peak_input_count(&self) -> usize {
        self.core.peak_input_count()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.core.capacity()
    }
}

impl<I, O> DataflowBlock for TransformBlock<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
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

impl<I, O> TargetBlock<I> for TransformBlock<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    fn try_post(&self, item: I) -> std::result::Result<(), PostError<I>> {
        self.core.try_post(item)
    }

    fn send(&self, item: I) -> bool {
        self.core.send(item)
    }

    fn send_async(&self, item: I) -> SendFuture<I> {
        self.core.send_async(item)
    }

    fn upstream(&self) -> &UpstreamTracker {
        self.core.upstream()
    }
}

impl<I, O> SourceBlock<O> for TransformBlock<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    fn link_to_target(
        &self,
        target: Arc<dyn TargetBlock<O>>,
        options: LinkOptions<O>,
    ) -> LinkHandle {
        self.core.link(target, options)
    }

    fn link_count(&self) -> usize {
        self.core.link_count()
    }
}

impl<I, O> std::fmt::Debug for TransformBlock<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformBlock")
            .field("id", &self.core.id())
            .field("name", &self.core.name())
            .finish()
    }
}
