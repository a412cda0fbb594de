//! Composite blocks.
//!
//! [`encapsulate`] hides an internal sub-graph behind one entry and one exit
//! block. Input, `complete` and `fault` go to the entry; output links,
//! `completion` and `state` come from the exit. The caller is responsible
//! for wiring entry to exit (usually with propagating links) so that
//! completion travels through the sub-graph.

use crate::dataflow::block::{DataflowBlock, SourceBlock, TargetBlock};
use crate::dataflow::channel::SendFuture;
use crate::dataflow::completion::{Completion, UpstreamTracker};
use crate::dataflow::error::{BlockError, PostError};
use crate::dataflow::id::BlockId;
use crate::dataflow::link::{LinkHandle, LinkOptions};
use std::sync::Arc;

/// A sub-graph that behaves like a single `I -> O` block.
pub struct CompositeBlock<I, O> {
    id: BlockId,
    name: String,
    entry: Arc<dyn TargetBlock<I>>,
    exit: Arc<dyn SourceBlock<O>>,
}

impl<I, O> Clone for CompositeBlock<I, O> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            entry: Arc::clone(&self.entry),
            exit: Arc::clone(&self.exit),
        }
    }
}

/// Wrap `entry` and `exit` into one block.
pub fn encapsulate<I, O, E, X>(entry: &E, exit: &X) -> CompositeBlock<I, O>
where
    E: TargetBlock<I> + Clone + 'static,
    X: SourceBlock<O> + Clone + 'static,
{
    let id = BlockId::next();
    let name = format!("{}..{}", entry.name(), exit.name());
    tracing::debug!("Created composite block {} '{}'", id, name);
    CompositeBlock {
        id,
        name,
        entry: Arc::new(entry.clone()),
        exit: Arc::new(exit.clone()),
    }
}

impl<I, O> CompositeBlock<I, O> {
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn entry_id(&self) -> BlockId {
        self.entry.id()
    }

    pub fn exit_id(&self) -> BlockId {
        self.exit.id()
    }
}

impl<I, O> DataflowBlock for CompositeBlock<I, O> {
    fn id(&self) -> BlockId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn complete(&self) {
        self.entry.complete();
    }

    fn fault(&self, error: BlockError) {
        self.entry.fault(error);
    }

    fn completion(&self) -> Completion {
        self.exit.completion()
    }
}

impl<I, O> TargetBlock<I> for CompositeBlock<I, O> {
    fn try_post(&self, item: I) -> Result<(), PostError<I>> {
        self.entry.try_post(item)
    }

    fn post(&self, item: I) -> bool {
        self.entry.post(item)
    }

    fn send(&self, item: I) -> bool {
        self.entry.send(item)
    }

    fn send_async(&self, item: I) -> SendFuture<I> {
        self.entry.send_async(item)
    }

    fn upstream(&self) -> &UpstreamTracker {
        self.entry.upstream()
    }
}

impl<I, O> SourceBlock<O> for CompositeBlock<I, O> {
    fn link_to_target(
        &self,
        target: Arc<dyn TargetBlock<O>>,
        options: LinkOptions<O>,
    ) -> LinkHandle {
        self.exit.link_to_target(target, options)
    }

    fn link_count(&self) -> usize {
        self.exit.link_count()
    }
}

impl<I, O> std::fmt::Debug for CompositeBlock<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeBlock")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("entry", &self.entry.id())
            .field("exit", &self.exit.id())
            .finish()
    }
}
