//! Error handling for blockflow
//!
//! This module defines the crate-level error type and a Result alias for
//! construction, wiring and configuration. Faults that happen while blocks
//! run are [`BlockError`]s and surface through `Completion`.

use crate::dataflow::error::BlockError;
use crate::dataflow::id::{BlockId, EdgeId};
use thiserror::Error;

/// Main error type for blockflow operations
#[derive(Error, Debug)]
pub enum DataflowError {
    /// A block reached the Faulted state
    #[error("Block error: {0}")]
    Block(#[from] BlockError),

    /// Block options failed validation
    #[error("Invalid block options: {0}")]
    InvalidOptions(String),

    /// A worker thread could not be started
    #[error("Failed to spawn worker for block '{block}': {source}")]
    WorkerSpawn {
        block: String,
        #[source]
        source: std::io::Error,
    },

    /// The block is not registered with the pipeline
    #[error("Unknown block: {0}")]
    UnknownBlock(BlockId),

    /// The edge does not exist or was already removed
    #[error("Unknown edge: {0:?}")]
    UnknownEdge(EdgeId),

    /// A block cannot be linked to itself
    #[error("Cannot link block {0} to itself")]
    SelfLink(BlockId),

    /// The link would close a loop in the pipeline
    #[error("Linking {from} -> {to} would create a cycle")]
    CycleDetected { from: BlockId, to: BlockId },

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed user input
    #[error("Invalid input: {0}")]
    Input(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<DataflowError>,
    },
}

impl DataflowError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        DataflowError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The block fault behind this error, looking through context layers.
    pub fn block_error(&self) -> Option<&BlockError> {
        match self {
            DataflowError::Block(error) => Some(error),
            DataflowError::WithContext { source, .. } => source.block_error(),
            _ => None,
        }
    }
}

/// Result type alias for blockflow operations
pub type Result<T> = std::result::Result<T, DataflowError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, BlockError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| DataflowError::Block(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| DataflowError::Block(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DataflowError::InvalidOptions("parallelism must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid block options: parallelism must be at least 1"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = DataflowError::SelfLink(BlockId(4));
        let with_ctx = err.with_context("Failed to wire pipeline");
        assert!(with_ctx.to_string().contains("Failed to wire pipeline"));
        assert!(with_ctx.to_string().contains("#4"));
    }

    #[test]
    fn test_block_error_through_context() {
        let fault: std::result::Result<(), BlockError> =
            Err(BlockError::Cancelled { block: BlockId(7) });
        let err = fault.context("waiting for sink").unwrap_err();
        assert!(err.to_string().starts_with("waiting for sink: "));
        assert!(err.block_error().unwrap().is_cancelled());
    }
}
