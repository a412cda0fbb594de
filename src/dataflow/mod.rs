//! Dataflow blocks connected by revocable links.
//!
//! Items enter a block through its input channel, are processed by the
//! block's worker threads, and are offered to every linked target whose
//! predicate accepts them. Completion and faults travel along links that
//! were created with completion propagation enabled.
//!
//! # Architecture
//!
//! ```text
//! producer ─post/send─► [TransformBlock] ──► [TransformBlock] ──► [ActionBlock]
//!                                       └─(predicate)─► [ActionBlock]
//! ```
//!
//! # Design
//!
//! - **One channel per block**: N workers compete on a single
//!   `Mutex` + `Condvar` queue; each item goes to exactly one worker.
//! - **Backpressure**: bounded inputs make blocking `send` wait, and links
//!   deliver with `send`, so a slow consumer slows its producers.
//! - **Link arena**: per-source `Vec<Option<_>>` with tombstones; link ids
//!   are never reused.
//! - **Upstream counter**: a target completes once every
//!   propagation-enabled source has succeeded; the first upstream fault
//!   faults it immediately.
//! - **Context port**: blocks can run their function on a designated
//!   thread through [`ExecutionContext`].

pub mod block;
pub mod blocks;
pub mod cancel;
pub mod channel;
pub mod completion;
pub mod context;
pub mod encapsulate;
pub mod error;
pub mod id;
pub mod link;
pub mod pipeline;
pub mod snapshot;

pub use block::{DataflowBlock, SourceBlock, TargetBlock};
pub use blocks::{ActionBlock, BroadcastBlock, TransformBlock};
pub use cancel::CancellationToken;
pub use channel::{Channel, ChannelStatus, SendFuture};
pub use completion::{when_all, Completion, CompletionState, UpstreamTracker};
pub use context::{dispatch_queue, DispatchPump, DispatchQueue, ExecutionContext, InlineContext, Job};
pub use encapsulate::{encapsulate, CompositeBlock};
pub use error::{BlockError, PostError, SharedError};
pub use id::{BlockId, EdgeId, LinkId};
pub use link::{LinkHandle, LinkOptions, Predicate};
pub use pipeline::{Edge, NodeSlot, Pipeline};
pub use snapshot::{EdgeSnapshot, NodeSnapshot, TopologySnapshot};
