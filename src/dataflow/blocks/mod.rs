//! Built-in block implementations.

pub mod action;
pub mod broadcast;
pub mod transform;

pub use action::ActionBlock;
pub use broadcast::BroadcastBlock;
pub use transform::TransformBlock;
