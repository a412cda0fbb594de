//! # blockflow: dataflow blocks for Rust
//!
//! Blocks own an input channel and a pool of worker threads. They are wired
//! together with revocable, optionally filtered links that fan out every
//! result, apply backpressure through bounded inputs, and carry completion
//! and faults downstream.
//!
//! ## Architecture
//!
//! - **Dataflow**: channels, blocks, links, completion tracking, composite
//!   blocks and the pipeline registry (`dataflow`)
//! - **Config**: TOML-backed block options and scenario settings (`config`)
//! - **Scenarios**: runnable demonstrations of the engine (`scenarios`)
//! - **Communication**: `Mutex` + `Condvar` block inputs, crossbeam channels
//!   for execution-context dispatch
//!
//! ## Configuration
//!
//! The default config file is stored in the platform-appropriate config
//! directory under `dev.hxyulin.blockflow`:
//!
//! - **Linux**: `~/.config/dev.hxyulin.blockflow/blockflow.toml`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.blockflow/blockflow.toml`
//! - **Windows**: `%APPDATA%\dev.hxyulin.blockflow\blockflow.toml`
//!
//! ## Example
//!
//! ```no_run
//! use blockflow::dataflow::{
//!     ActionBlock, DataflowBlock, LinkOptions, SourceBlock, TargetBlock, TransformBlock,
//! };
//!
//! fn main() -> blockflow::Result<()> {
//!     let double = TransformBlock::new(|x: i32| x * 2)?;
//!     let print = ActionBlock::new(|x: i32| println!("{}", x))?;
//!     double.link_to(&print, LinkOptions::propagate());
//!
//!     for i in 1..=3 {
//!         double.post(i);
//!     }
//!     double.complete();
//!     print.completion().wait()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dataflow;
pub mod error;
pub mod scenarios;

// Re-export commonly used types
pub use config::{BlockOptions, DataflowConfig, LinkDefaults, ScenarioSettings};
pub use dataflow::{
    encapsulate, ActionBlock, BlockError, BroadcastBlock, CancellationToken, Completion,
    CompletionState, CompositeBlock, DataflowBlock, LinkHandle, LinkOptions, Pipeline, PostError,
    SourceBlock, TargetBlock, TransformBlock,
};
pub use error::{DataflowError, Result, ResultExt};
pub use scenarios::{Console, Scenario};
