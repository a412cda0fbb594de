//! Serializable views of a pipeline's topology and block states.

use crate::dataflow::id::{BlockId, EdgeId};
use crate::error::{DataflowError, Result};
use serde::Serialize;
use std::fmt::Write as _;

/// Snapshot of a single registered block.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub id: BlockId,
    pub name: String,
    /// Lifecycle label: running, completing, faulted or succeeded.
    pub state: &'static str,
    /// The winning fault, if the block faulted.
    pub error: Option<String>,
    /// Faults observed after the first one.
    pub suppressed: usize,
}

/// Snapshot of a single edge.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeSnapshot {
    pub id: EdgeId,
    pub from: BlockId,
    pub to: BlockId,
    pub propagate_completion: bool,
    pub filtered: bool,
}

/// Pipeline topology with nodes in topological order.
#[derive(Debug, Clone, Serialize)]
pub struct TopologySnapshot {
    pub pipeline: String,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

impl TopologySnapshot {
    pub fn node(&self, id: BlockId) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| DataflowError::Serialization(e.to_string()))
    }

    /// Human-readable multi-line rendering.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "pipeline '{}'", self.pipeline);
        for node in &self.nodes {
            let _ = write!(out, "  {} {} [{}]", node.id, node.name, node.state);
            if let Some(error) = &node.error {
                let _ = write!(out, " {}", error);
            }
            out.push('\n');
        }
        for edge in &self.edges {
            let mut flags = Vec::new();
            if edge.propagate_completion {
                flags.push("propagate");
            }
            if edge.filtered {
                flags.push("filtered");
            }
            let _ = writeln!(
                out,
                "  {} -> {} ({})",
                edge.from,
                edge.to,
                if flags.is_empty() {
                    "plain".to_string()
                } else {
                    flags.join(", ")
                }
            );
        }
        out
    }
}
