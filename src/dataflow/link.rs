//! Links between a source's output and a target's input.
//!
//! Each source owns a [`LinkTable`]: an arena of link records indexed by
//! [`LinkId`]. Removing a link tombstones its slot, so ids are never reused
//! and unlinking is O(1). Items are offered in slot order, which is the
//! order links were registered.

use crate::dataflow::block::TargetBlock;
use crate::dataflow::error::BlockError;
use crate::dataflow::id::{BlockId, LinkId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Filter applied to every item before it is offered through a link.
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Terminal outcome of a source, replayed to late links.
pub(crate) type Outcome = Result<(), BlockError>;

/// Options for a single link.
pub struct LinkOptions<T> {
    predicate: Option<Predicate<T>>,
    propagate_completion: bool,
}

impl<T> LinkOptions<T> {
    /// Unfiltered link without completion propagation.
    pub fn new() -> Self {
        Self {
            predicate: None,
            propagate_completion: false,
        }
    }

    /// Unfiltered link that propagates completion and faults.
    pub fn propagate() -> Self {
        Self::new().propagate_completion(true)
    }

    pub fn propagate_completion(mut self, propagate: bool) -> Self {
        self.propagate_completion = propagate;
        self
    }

    /// Only items for which `predicate` returns `true` are offered.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn is_propagating(&self) -> bool {
        self.propagate_completion
    }

    pub fn has_predicate(&self) -> bool {
        self.predicate.is_some()
    }
}

impl<T> Default for LinkOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for LinkOptions<T> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            propagate_completion: self.propagate_completion,
        }
    }
}

impl<T> std::fmt::Debug for LinkOptions<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkOptions")
            .field("predicate", &self.predicate.is_some())
            .field("propagate_completion", &self.propagate_completion)
            .finish()
    }
}

struct LinkRecord<T> {
    target: Arc<dyn TargetBlock<T>>,
    predicate: Option<Predicate<T>>,
    propagate: bool,
}

struct Table<T> {
    slots: Vec<Option<LinkRecord<T>>>,
    live: usize,
    terminal: Option<Outcome>,
}

/// Per-source registry of outgoing links.
pub(crate) struct LinkTable<T> {
    source: BlockId,
    table: Mutex<Table<T>>,
}

impl<T: Send + 'static> LinkTable<T> {
    pub(crate) fn new(source: BlockId) -> Arc<Self> {
        Arc::new(Self {
            source,
            table: Mutex::new(Table {
                slots: Vec::new(),
                live: 0,
                terminal: None,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Table<T>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a link. If the source already finished, a propagating link
    /// receives the outcome right away.
    pub(crate) fn add(
        self: &Arc<Self>,
        target: Arc<dyn TargetBlock<T>>,
        options: LinkOptions<T>,
    ) -> LinkHandle {
        let propagate = options.propagate_completion;
        if propagate {
            target.upstream().register();
        }

        let mut table = self.lock();
        let id = LinkId(table.slots.len() as u32);
        let terminal = table.terminal.clone();
        table.slots.push(Some(LinkRecord {
            target: Arc::clone(&target),
            predicate: options.predicate,
            propagate,
        }));
        table.live += 1;
        drop(table);

        tracing::trace!(
            "Added link {:?}: {} -> {} (propagate: {})",
            id,
            self.source,
            target.id(),
            propagate
        );

        if let (true, Some(outcome)) = (propagate, terminal) {
            propagate_outcome(&target, &outcome);
        }

        let registry: Weak<dyn Unlink> = Arc::downgrade(self) as Weak<dyn Unlink>;
        LinkHandle {
            id,
            source: self.source,
            registry,
        }
    }

    /// Targets that accept `item`, in registration order.
    ///
    /// The table lock is released before predicates run.
    pub(crate) fn matching(&self, item: &T) -> Vec<Arc<dyn TargetBlock<T>>> {
        let candidates: Vec<_> = self
            .lock()
            .slots
            .iter()
            .flatten()
            .map(|r| (Arc::clone(&r.target), r.predicate.clone()))
            .collect();

        candidates
            .into_iter()
            .filter(|(_, predicate)| predicate.as_ref().map_or(true, |p| p(item)))
            .map(|(target, _)| target)
            .collect()
    }

    /// Record the source's terminal outcome and return the propagating
    /// targets that must be notified.
    pub(crate) fn seal(&self, outcome: Outcome) -> Vec<Arc<dyn TargetBlock<T>>> {
        let mut table = self.lock();
        if table.terminal.is_some() {
            return Vec::new();
        }
        table.terminal = Some(outcome);
        table
            .slots
            .iter()
            .flatten()
            .filter(|r| r.propagate)
            .map(|r| Arc::clone(&r.target))
            .collect()
    }

    /// Number of live links.
    pub(crate) fn len(&self) -> usize {
        self.lock().live
    }
}

/// Deliver a source outcome to one propagating target.
pub(crate) fn propagate_outcome<T>(target: &Arc<dyn TargetBlock<T>>, outcome: &Outcome) {
    match outcome {
        Ok(()) => {
            if target.upstream().source_succeeded() {
                target.complete();
            }
        }
        Err(error) => {
            target.upstream().source_faulted();
            target.fault(error.forwarded());
        }
    }
}

/// Type-erased access to a link table, held weakly by [`LinkHandle`].
trait Unlink: Send + Sync {
    fn unlink(&self, id: LinkId) -> bool;
    fn is_linked(&self, id: LinkId) -> bool;
}

impl<T: Send + 'static> Unlink for LinkTable<T> {
    fn unlink(&self, id: LinkId) -> bool {
        let mut table = self.lock();
        let Some(record) = table.slots.get_mut(id.index()).and_then(Option::take) else {
            return false;
        };
        table.live -= 1;
        let sealed = table.terminal.is_some();
        drop(table);

        tracing::trace!(
            "Removed link {:?}: {} -> {}",
            id,
            self.source,
            record.target.id()
        );

        if record.propagate && !sealed {
            record.target.upstream().withdraw();
        }
        true
    }

    fn is_linked(&self, id: LinkId) -> bool {
        matches!(self.lock().slots.get(id.index()), Some(Some(_)))
    }
}

/// Revocation handle for one link.
///
/// Dropping the handle leaves the link in place; call [`LinkHandle::unlink`]
/// to remove it.
#[derive(Clone)]
pub struct LinkHandle {
    id: LinkId,
    source: BlockId,
    registry: Weak<dyn Unlink>,
}

impl LinkHandle {
    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn source(&self) -> BlockId {
        self.source
    }

    /// Stop routing new items through this link. Items already accepted by
    /// the target are unaffected, and the target keeps accepting input from
    /// elsewhere. Returns whether the link was still active.
    ///
    /// A target whose last propagating source is unlinked is not completed;
    /// call `complete` on it once it should stop.
    pub fn unlink(&self) -> bool {
        self.registry
            .upgrade()
            .map_or(false, |registry| registry.unlink(self.id))
    }

    pub fn is_linked(&self) -> bool {
        self.registry
            .upgrade()
            .map_or(false, |registry| registry.is_linked(self.id))
    }
}

impl std::fmt::Debug for LinkHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkHandle")
            .field("id", &self.id)
            .field("source", &self.source)
            .finish()
    }
}
