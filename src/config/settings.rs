//! Block, link and scenario settings
//!
//! These are the serializable knobs that `DataflowConfig` is made of. Some
//! `BlockOptions` fields only make sense at runtime (an execution context, a
//! cancellation token); they are skipped by serde and set in code.
//!
//! # Main Types
//!
//! - [`BlockOptions`] - Name, parallelism and input capacity of one block
//! - [`LinkDefaults`] - Defaults applied to links created from config
//! - [`ScenarioSettings`] - Knobs for the bundled demonstration scenarios

use crate::dataflow::cancel::CancellationToken;
use crate::dataflow::context::ExecutionContext;
use crate::dataflow::link::LinkOptions;
use crate::error::{DataflowError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default number of workers per block
pub const DEFAULT_PARALLELISM: usize = 1;

/// Construction options for a block
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockOptions {
    /// Name used in logs, thread names and topology snapshots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Number of worker threads competing on the input
    pub parallelism: usize,

    /// Maximum queued input items; `None` is unbounded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounded_capacity: Option<usize>,

    /// Cancelling this token faults the block
    #[serde(skip)]
    pub cancellation: Option<CancellationToken>,

    /// Run the block function on this context instead of the worker thread
    #[serde(skip)]
    pub context: Option<Arc<dyn ExecutionContext>>,
}

impl Default for BlockOptions {
    fn default() -> Self {
        Self {
            name: None,
            parallelism: DEFAULT_PARALLELISM,
            bounded_capacity: None,
            cancellation: None,
            context: None,
        }
    }
}

impl BlockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// One worker per available CPU.
    pub fn with_max_parallelism(self) -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(DEFAULT_PARALLELISM);
        self.with_parallelism(cpus)
    }

    pub fn with_bounded_capacity(mut self, capacity: usize) -> Self {
        self.bounded_capacity = Some(capacity);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.bounded_capacity = None;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_context(mut self, context: Arc<dyn ExecutionContext>) -> Self {
        self.context = Some(context);
        self
    }

    /// Check the numeric limits.
    pub fn validate(&self) -> Result<()> {
        if self.parallelism == 0 {
            return Err(DataflowError::InvalidOptions(
                "parallelism must be at least 1".to_string(),
            ));
        }
        if self.bounded_capacity == Some(0) {
            return Err(DataflowError::InvalidOptions(
                "bounded capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for BlockOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockOptions")
            .field("name", &self.name)
            .field("parallelism", &self.parallelism)
            .field("bounded_capacity", &self.bounded_capacity)
            .field("cancellation", &self.cancellation)
            .field("context", &self.context.is_some())
            .finish()
    }
}

/// Defaults for links created from configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkDefaults {
    /// Whether completion and faults travel along links
    pub propagate_completion: bool,
}

impl Default for LinkDefaults {
    fn default() -> Self {
        Self {
            propagate_completion: true,
        }
    }
}

impl LinkDefaults {
    /// Unfiltered link options carrying these defaults.
    pub fn options<T>(&self) -> LinkOptions<T> {
        LinkOptions::new().propagate_completion(self.propagate_completion)
    }
}

/// Settings for the bundled scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSettings {
    /// Simulated work per item in the throttling scenario, in milliseconds
    pub work_delay_ms: u64,

    /// Input capacity of the throttled block
    pub throttle_capacity: usize,

    /// Numbers used when none are given on the command line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_input: Option<String>,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            work_delay_ms: 100,
            throttle_capacity: 2,
            default_input: None,
        }
    }
}

impl ScenarioSettings {
    pub fn work_delay(&self) -> Duration {
        Duration::from_millis(self.work_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::context::InlineContext;

    #[test]
    fn test_block_options_builder() {
        let options = BlockOptions::new()
            .named("square")
            .with_parallelism(4)
            .with_bounded_capacity(8)
            .with_context(Arc::new(InlineContext));
        assert_eq!(options.name.as_deref(), Some("square"));
        assert_eq!(options.parallelism, 4);
        assert_eq!(options.bounded_capacity, Some(8));
        assert!(options.context.is_some());
        assert!(options.validate().is_ok());
        assert!(options.unbounded().bounded_capacity.is_none());
    }

    #[test]
    fn test_validate_limits() {
        assert!(BlockOptions::new().with_parallelism(0).validate().is_err());
        assert!(BlockOptions::new().with_bounded_capacity(0).validate().is_err());
        assert!(BlockOptions::new().with_max_parallelism().parallelism >= 1);
    }

    #[test]
    fn test_runtime_fields_are_not_serialized() {
        let options = BlockOptions::new()
            .with_bounded_capacity(2)
            .with_cancellation(CancellationToken::new());
        let text = toml::to_string(&options).unwrap();
        assert!(text.contains("bounded_capacity = 2"));
        assert!(!text.contains("cancellation"));

        let parsed: BlockOptions = toml::from_str(&text).unwrap();
        assert!(parsed.cancellation.is_none());
        assert_eq!(parsed.bounded_capacity, Some(2));
    }

    #[test]
    fn test_link_defaults() {
        let defaults = LinkDefaults::default();
        assert!(defaults.options::<i32>().is_propagating());
        let plain = LinkDefaults {
            propagate_completion: false,
        };
        assert!(!plain.options::<i32>().is_propagating());
    }
}
