//! Test block builders

use blockflow::{
    ActionBlock, BlockOptions, DataflowBlock, LinkOptions, SourceBlock, TransformBlock,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An action block that records everything it receives
pub struct Collector<T> {
    pub block: ActionBlock<T>,
    seen: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone + Send + 'static> Collector<T> {
    pub fn new() -> Self {
        CollectorBuilder::new().build()
    }

    pub fn items(&self) -> Vec<T> {
        self.seen.lock().unwrap().clone()
    }
}

/// Builder for [`Collector`]
pub struct CollectorBuilder {
    delay: Option<Duration>,
    options: BlockOptions,
}

impl CollectorBuilder {
    pub fn new() -> Self {
        Self {
            delay: None,
            options: BlockOptions::default(),
        }
    }

    /// Sleep this long per item
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.options = self.options.with_bounded_capacity(capacity);
        self
    }

    pub fn build<T: Clone + Send + 'static>(self) -> Collector<T> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let delay = self.delay;
        let block = ActionBlock::with_options(
            move |item: T| {
                if let Some(delay) = delay {
                    std::thread::sleep(delay);
                }
                sink.lock().unwrap().push(item);
            },
            self.options,
        )
        .unwrap();
        Collector { block, seen }
    }
}

/// Build `len` single-worker `x + 1` blocks linked with completion
/// propagation. Returns the head and the tail.
pub fn increment_chain(len: usize) -> (TransformBlock<i64, i64>, TransformBlock<i64, i64>) {
    assert!(len >= 1);
    let head = TransformBlock::new(|x: i64| x + 1).unwrap();
    let mut tail = head.clone();
    for _ in 1..len {
        let next = TransformBlock::new(|x: i64| x + 1).unwrap();
        tail.link_to(&next, LinkOptions::propagate());
        tail = next;
    }
    (head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_builder() {
        let (head, tail) = increment_chain(3);
        assert_ne!(head.id(), tail.id());
        assert_eq!(head.link_count(), 1);
        assert_eq!(tail.link_count(), 0);
    }
}
