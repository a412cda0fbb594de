//! Pipeline registry.
//!
//! A `Pipeline` does not run anything itself: blocks own their workers.
//! It records which blocks belong together and how they are linked, so a
//! whole graph can be validated while wiring, completed from its sources,
//! waited on, and inspected as a [`TopologySnapshot`].

use crate::dataflow::block::{DataflowBlock, SourceBlock, TargetBlock};
use crate::dataflow::completion::{when_all, Completion, CompletionState};
use crate::dataflow::error::BlockError;
use crate::dataflow::id::{BlockId, EdgeId};
use crate::dataflow::link::{LinkHandle, LinkOptions};
use crate::dataflow::snapshot::{EdgeSnapshot, NodeSnapshot, TopologySnapshot};
use crate::error::{DataflowError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// A link registered through the pipeline.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub from: BlockId,
    pub to: BlockId,
    pub propagate_completion: bool,
    pub filtered: bool,
    handle: LinkHandle,
}

/// A registered block.
pub struct NodeSlot {
    pub id: BlockId,
    pub name: String,
    block: Arc<dyn DataflowBlock>,
}

/// Registry of blocks and the links between them.
pub struct Pipeline {
    name: String,
    nodes: Vec<NodeSlot>,
    index: HashMap<BlockId, usize>,
    /// Removed edges leave `None` so edge ids stay stable.
    edges: Vec<Option<Edge>>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Graph building ──

    /// Register a block. Registering the same block twice is a no-op.
    pub fn add_block<B>(&mut self, block: &B) -> BlockId
    where
        B: DataflowBlock + Clone + 'static,
    {
        let id = block.id();
        if self.index.contains_key(&id) {
            return id;
        }
        self.index.insert(id, self.nodes.len());
        self.nodes.push(NodeSlot {
            id,
            name: block.name().to_string(),
            block: Arc::new(block.clone()),
        });
        tracing::info!("Added block {} '{}' to pipeline '{}'", id, block.name(), self.name);
        id
    }

    /// Link two registered blocks.
    ///
    /// Fails for unregistered blocks, self-links and links that would close
    /// a cycle.
    pub fn link<T, S, D>(&mut self, source: &S, target: &D, options: LinkOptions<T>) -> Result<EdgeId>
    where
        S: SourceBlock<T>,
        D: TargetBlock<T> + Clone + 'static,
    {
        let from = source.id();
        let to = target.id();
        if !self.index.contains_key(&from) {
            return Err(DataflowError::UnknownBlock(from));
        }
        if !self.index.contains_key(&to) {
            return Err(DataflowError::UnknownBlock(to));
        }
        if from == to {
            return Err(DataflowError::SelfLink(from));
        }
        if self.would_create_cycle(from, to) {
            return Err(DataflowError::CycleDetected { from, to });
        }

        let propagate_completion = options.is_propagating();
        let filtered = options.has_predicate();
        let handle = source.link_to_target(Arc::new(target.clone()), options);

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Some(Edge {
            id,
            from,
            to,
            propagate_completion,
            filtered,
            handle,
        }));
        tracing::info!(
            "Added edge {:?}: {} -> {} (propagate: {}, filtered: {})",
            id,
            from,
            to,
            propagate_completion,
            filtered
        );
        Ok(id)
    }

    /// Remove an edge and its underlying link. Returns whether the link was
    /// still active.
    pub fn unlink(&mut self, edge: EdgeId) -> Result<bool> {
        let removed = self
            .edges
            .get_mut(edge.index())
            .and_then(Option::take)
            .ok_or(DataflowError::UnknownEdge(edge))?;
        let was_linked = removed.handle.unlink();
        tracing::info!("Removed edge {:?}: {} -> {}", edge, removed.from, removed.to);
        Ok(was_linked)
    }

    // ── Driving ──

    /// Call `complete()` on every block without an inbound edge. Returns how
    /// many blocks were completed.
    pub fn complete_sources(&self) -> usize {
        let sources: Vec<&NodeSlot> = self
            .nodes
            .iter()
            .filter(|slot| !self.live_edges().any(|e| e.to == slot.id))
            .collect();
        for slot in &sources {
            tracing::debug!("Completing source block {} '{}'", slot.id, slot.name);
            slot.block.complete();
        }
        sources.len()
    }

    /// Fault every registered block with `error`.
    pub fn fault_all(&self, error: BlockError) {
        for slot in &self.nodes {
            slot.block.fault(error.clone());
        }
    }

    pub fn completions(&self) -> Vec<Completion> {
        self.nodes.iter().map(|slot| slot.block.completion()).collect()
    }

    /// Wait for every registered block; the first fault in topological
    /// order is returned.
    pub fn wait_all(&self) -> std::result::Result<(), BlockError> {
        let ordered: Vec<Completion> = self
            .execution_order()
            .into_iter()
            .filter_map(|id| self.block(id).map(|b| b.completion()))
            .collect();
        when_all(&ordered)
    }

    // ── Inspection ──

    pub fn block(&self, id: BlockId) -> Option<&Arc<dyn DataflowBlock>> {
        self.index.get(&id).map(|&i| &self.nodes[i].block)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index()).and_then(Option::as_ref)
    }

    pub fn block_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.live_edges().count()
    }

    fn live_edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().flatten()
    }

    /// Blocks in topological order (Kahn's algorithm). Ties keep
    /// registration order.
    pub fn execution_order(&self) -> Vec<BlockId> {
        let n = self.nodes.len();
        let mut in_degree = vec![0u32; n];
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];

        for edge in self.live_edges() {
            if let (Some(&from), Some(&to)) = (self.index.get(&edge.from), self.index.get(&edge.to)) {
                adj[from].push(to);
                in_degree[to] += 1;
            }
        }

        let mut queue: std::collections::VecDeque<usize> =
            (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(node) = queue.pop_front() {
            order.push(self.nodes[node].id);
            for &next in &adj[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        if order.len() != n {
            tracing::warn!(
                "Pipeline graph has a cycle! Only {} of {} blocks ordered.",
                order.len(),
                n
            );
        }
        order
    }

    pub fn topology(&self) -> TopologySnapshot {
        let nodes = self
            .execution_order()
            .into_iter()
            .filter_map(|id| self.index.get(&id).map(|&i| &self.nodes[i]))
            .map(|slot| {
                let completion = slot.block.completion();
                let state = completion.state();
                let error = match &state {
                    CompletionState::Faulted(error) => Some(error.to_string()),
                    _ => None,
                };
                NodeSnapshot {
                    id: slot.id,
                    name: slot.name.clone(),
                    state: state.label(),
                    error,
                    suppressed: completion.suppressed().len(),
                }
            })
            .collect();

        let edges = self
            .live_edges()
            .map(|e| EdgeSnapshot {
                id: e.id,
                from: e.from,
                to: e.to,
                propagate_completion: e.propagate_completion,
                filtered: e.filtered,
            })
            .collect();

        TopologySnapshot {
            pipeline: self.name.clone(),
            nodes,
            edges,
        }
    }

    /// Check if adding an edge from `from` to `to` would create a cycle.
    fn would_create_cycle(&self, from: BlockId, to: BlockId) -> bool {
        // If `to` can already reach `from`, adding from->to closes a loop.
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![to];

        while let Some(current) = stack.pop() {
            if current == from {
                return true;
            }
            let Some(&idx) = self.index.get(&current) else {
                continue;
            };
            if visited[idx] {
                continue;
            }
            visited[idx] = true;

            for edge in self.live_edges() {
                if edge.from == current {
                    stack.push(edge.to);
                }
            }
        }
        false
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("blocks", &self.nodes.len())
            .field("edges", &self.edge_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::blocks::{ActionBlock, TransformBlock};

    fn relay() -> TransformBlock<i32, i32> {
        TransformBlock::new(|x: i32| x).unwrap()
    }

    #[test]
    fn test_topological_order_linear() {
        let mut pipeline = Pipeline::new("linear");
        let a = relay();
        let b = relay();
        let c = relay();
        // Register out of order on purpose.
        pipeline.add_block(&c);
        pipeline.add_block(&b);
        pipeline.add_block(&a);
        pipeline.link(&a, &b, LinkOptions::propagate()).unwrap();
        pipeline.link(&b, &c, LinkOptions::propagate()).unwrap();

        assert_eq!(pipeline.execution_order(), vec![a.id(), b.id(), c.id()]);
    }

    #[test]
    fn test_topological_order_diamond() {
        let mut pipeline = Pipeline::new("diamond");
        let blocks: Vec<_> = (0..4).map(|_| relay()).collect();
        for b in &blocks {
            pipeline.add_block(b);
        }
        let (a, b, c, d) = (&blocks[0], &blocks[1], &blocks[2], &blocks[3]);
        pipeline.link(a, b, LinkOptions::new()).unwrap();
        pipeline.link(a, c, LinkOptions::new()).unwrap();
        pipeline.link(b, d, LinkOptions::new()).unwrap();
        pipeline.link(c, d, LinkOptions::new()).unwrap();

        let order = pipeline.execution_order();
        let pos = |id: BlockId| order.iter().position(|&x| x == id).unwrap();
        assert!(pos(a.id()) < pos(b.id()));
        assert!(pos(a.id()) < pos(c.id()));
        assert!(pos(b.id()) < pos(d.id()));
        assert!(pos(c.id()) < pos(d.id()));
    }

    #[test]
    fn test_rejects_bad_links() {
        let mut pipeline = Pipeline::new("checks");
        let a = relay();
        let b = relay();
        let stranger = relay();
        pipeline.add_block(&a);
        pipeline.add_block(&b);

        assert!(matches!(
            pipeline.link(&a, &a, LinkOptions::new()),
            Err(DataflowError::SelfLink(_))
        ));
        assert!(matches!(
            pipeline.link(&a, &stranger, LinkOptions::new()),
            Err(DataflowError::UnknownBlock(id)) if id == stranger.id()
        ));

        pipeline.link(&a, &b, LinkOptions::new()).unwrap();
        assert!(matches!(
            pipeline.link(&b, &a, LinkOptions::new()),
            Err(DataflowError::CycleDetected { .. })
        ));
        assert_eq!(a.link_count(), 1);
        assert_eq!(b.link_count(), 0);
    }

    #[test]
    fn test_unlink_edge() {
        let mut pipeline = Pipeline::new("unlink");
        let a = relay();
        let b = relay();
        pipeline.add_block(&a);
        pipeline.add_block(&b);
        let edge = pipeline.link(&a, &b, LinkOptions::new()).unwrap();

        assert!(pipeline.unlink(edge).unwrap());
        assert_eq!(pipeline.edge_count(), 0);
        assert_eq!(a.link_count(), 0);
        assert!(matches!(pipeline.unlink(edge), Err(DataflowError::UnknownEdge(_))));
        // Reverse direction is fine once the edge is gone.
        pipeline.link(&b, &a, LinkOptions::new()).unwrap();
    }

    #[test]
    fn test_complete_sources_and_wait_all() {
        let mut pipeline = Pipeline::new("drain");
        let a = relay();
        let b = TransformBlock::new(|x: i32| x * 10).unwrap();
        let sink = ActionBlock::new(|_: i32| {}).unwrap();
        pipeline.add_block(&a);
        pipeline.add_block(&b);
        pipeline.add_block(&sink);
        pipeline.link(&a, &b, LinkOptions::propagate()).unwrap();
        pipeline.link(&b, &sink, LinkOptions::propagate()).unwrap();

        a.post(1);
        assert_eq!(pipeline.complete_sources(), 1);
        pipeline.wait_all().unwrap();

        let topology = pipeline.topology();
        assert_eq!(topology.nodes.len(), 3);
        assert!(topology.nodes.iter().all(|n| n.state == "succeeded"));
        assert_eq!(topology.nodes[0].id, a.id());
        assert_eq!(topology.edges.len(), 2);
    }

    #[test]
    fn test_topology_reports_faults() {
        let mut pipeline = Pipeline::new("faulty");
        let a = TransformBlock::try_new(|x: i32| {
            anyhow::ensure!(x != 2, "Error at {}", x);
            Ok(x)
        })
        .unwrap();
        let sink = ActionBlock::new(|_: i32| {}).unwrap();
        pipeline.add_block(&a);
        pipeline.add_block(&sink);
        pipeline.link(&a, &sink, LinkOptions::propagate()).unwrap();

        a.post(1);
        a.post(2);
        let err = pipeline.wait_all().unwrap_err();
        assert_eq!(err.block(), a.id());

        let topology = pipeline.topology();
        let node = topology.node(sink.id()).unwrap();
        assert_eq!(node.state, "faulted");
        assert!(node.error.as_deref().unwrap().contains("Error at 2"));

        let json = topology.to_json().unwrap();
        assert!(json.contains("\"pipeline\": \"faulty\""));
        assert!(topology.render().contains("propagate"));
    }

    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_execution_order_respects_every_edge(
            edges in prop::collection::vec((0usize..6, 0usize..6), 0..15)
        ) {
            let mut pipeline = Pipeline::new("random");
            let blocks: Vec<_> = (0..6).map(|_| relay()).collect();
            for b in &blocks {
                pipeline.add_block(b);
            }

            let mut linked = Vec::new();
            for (from, to) in edges {
                // Lower index to higher index keeps the graph acyclic.
                if from < to && pipeline.link(&blocks[from], &blocks[to], LinkOptions::new()).is_ok() {
                    linked.push((from, to));
                }
            }

            let order = pipeline.execution_order();
            prop_assert_eq!(order.len(), blocks.len());
            let pos = |id: BlockId| order.iter().position(|&x| x == id).unwrap();
            for (from, to) in &linked {
                prop_assert!(pos(blocks[*from].id()) < pos(blocks[*to].id()));
            }

            // Any backward edge along an existing path must be refused.
            for (from, to) in &linked {
                let result = pipeline.link(&blocks[*to], &blocks[*from], LinkOptions::new());
                prop_assert!(
                    matches!(result, Err(DataflowError::CycleDetected { .. })),
                    "back edge {} -> {} accepted",
                    to,
                    from
                );
            }
        }
    }
}
