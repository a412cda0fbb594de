//! Block-level error types.
//!
//! `BlockError` is what a block's `Completion` resolves with when it faults.
//! It is `Clone` because a single fault is observed by every holder of the
//! completion handle and forwarded to every propagation-enabled target.
//!
//! `PostError` is not a fault: it is the normal signal that a non-blocking
//! post was refused, and it hands the item back to the caller.

use crate::dataflow::id::BlockId;
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Shared, type-erased user error.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// Reasons a block reaches the Faulted state.
#[derive(Error, Debug, Clone)]
pub enum BlockError {
    /// The block's own function failed (returned an error or panicked).
    #[error("block {block} transform failed: {source}")]
    Transform {
        block: BlockId,
        #[source]
        source: SharedError,
    },

    /// Cooperative cancellation was observed.
    #[error("block {block} was cancelled")]
    Cancelled { block: BlockId },

    /// A propagation-enabled upstream block faulted.
    ///
    /// `cause` is always the original fault; it is never re-wrapped while
    /// travelling down a chain.
    #[error("upstream block {origin} faulted: {cause}")]
    UpstreamFaulted {
        origin: BlockId,
        #[source]
        cause: Arc<BlockError>,
    },
}

impl BlockError {
    /// Wrap a user error raised by `block`'s function.
    pub fn transform(block: BlockId, error: anyhow::Error) -> Self {
        let boxed: Box<dyn StdError + Send + Sync> = error.into();
        BlockError::Transform {
            block,
            source: Arc::from(boxed),
        }
    }

    /// Convert a caught panic payload into a transform error.
    pub fn from_panic(block: BlockId, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::transform(block, anyhow::anyhow!("panicked: {}", message))
    }

    /// The form this error takes when forwarded to a downstream target.
    pub fn forwarded(&self) -> BlockError {
        match self {
            BlockError::UpstreamFaulted { .. } => self.clone(),
            other => BlockError::UpstreamFaulted {
                origin: other.block(),
                cause: Arc::new(other.clone()),
            },
        }
    }

    /// The block where the fault originated.
    pub fn block(&self) -> BlockId {
        match self {
            BlockError::Transform { block, .. } | BlockError::Cancelled { block } => *block,
            BlockError::UpstreamFaulted { origin, .. } => *origin,
        }
    }

    /// The original fault, unwrapping one level of upstream forwarding.
    pub fn root_cause(&self) -> &BlockError {
        match self {
            BlockError::UpstreamFaulted { cause, .. } => cause.as_ref(),
            other => other,
        }
    }

    /// The user error behind a transform fault, if any.
    pub fn user_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self.root_cause() {
            BlockError::Transform { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, BlockError::UpstreamFaulted { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), BlockError::Cancelled { .. })
    }
}

/// Refusal of a non-blocking post. The item is handed back.
pub enum PostError<T> {
    /// The input is bounded and currently full (or blocked senders are
    /// queued ahead of this post).
    CapacityExceeded(T),
    /// The input no longer accepts items (completed, faulted or cancelled).
    Declined(T),
}

impl<T> PostError<T> {
    /// Recover the refused item.
    pub fn into_inner(self) -> T {
        match self {
            PostError::CapacityExceeded(item) | PostError::Declined(item) => item,
        }
    }

    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, PostError::CapacityExceeded(_))
    }

    pub fn is_declined(&self) -> bool {
        matches!(self, PostError::Declined(_))
    }
}

impl<T> fmt::Debug for PostError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostError::CapacityExceeded(_) => write!(f, "CapacityExceeded(..)"),
            PostError::Declined(_) => write!(f, "Declined(..)"),
        }
    }
}

impl<T> fmt::Display for PostError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostError::CapacityExceeded(_) => write!(f, "block input is at capacity"),
            PostError::Declined(_) => write!(f, "block input is closed"),
        }
    }
}

impl<T> StdError for PostError<T> {}
