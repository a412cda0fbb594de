//! ActionBlock: terminal consumer with no outputs.

use crate::config::BlockOptions;
use crate::dataflow::block::{BlockCore, DataflowBlock, TargetBlock};
use crate::dataflow::channel::SendFuture;
use crate::dataflow::completion::{Completion, UpstreamTracker};
use crate::dataflow::error::{BlockError, PostError};
use crate::dataflow::id::BlockId;
use crate::error::Result;
use std::sync::Arc;

/// Runs a side effect for every input item.
///
/// Shares the transform block lifecycle; there is simply nothing to link
/// its output to.
pub struct ActionBlock<T> {
    core: Arc<BlockCore<T, ()>>,
}

impl<T> Clone for ActionBlock<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Send + 'static> ActionBlock<T> {
    pub fn new<F>(f: F) -> Result<Self>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::with_options(f, BlockOptions::default())
    }

    pub fn with_options<F>(f: F, options: BlockOptions) -> Result<Self>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::try_with_options(
            move |item| {
                f(item);
                Ok(())
            },
            options,
        )
    }

    pub fn try_new<F>(f: F) -> Result<Self>
    where
        F: Fn(T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::try_with_options(f, BlockOptions::default())
    }

    pub fn try_with_options<F>(f: F, options: BlockOptions) -> Result<Self>
    where
        F: Fn(T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let core = BlockCore::spawn("action", Arc::new(f), options)?;
        Ok(Self { core })
    }

    pub fn input_count(&self) -> usize {
        self.core.input_count()
    }

    pub fn peak_input_count(&self) -> usize {
        self.core.peak_input_count()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.core.capacity()
    }
}

impl<T: Send + 'static> DataflowBlock for ActionBlock<T> {
    fn id(&self) -> BlockId {
        self.core.id()
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    fn complete(&self) {
        self.core.complete();
    }

    fn fault(&self, error: BlockError) {
        self.core.fault(error);
    }

    fn completion(&self) -> Completion {
        self.core.completion()
    }
}

impl<T: Send + 'static> TargetBlock<T> for ActionBlock<T> {
    fn try_post(&self, item: T) -> std::result::Result<(), PostError<T>> {
        self.core.try_post(item)
    }

    fn send(&self, item: T) -> bool {
        self.core.send(item)
    }

    fn send_async(&self, item: T) -> SendFuture<T> {
        self.core.send_async(item)
    }

    fn upstream(&self) -> &UpstreamTracker {
        self.core.upstream()
    }
}

impl<T> std::fmt::Debug for ActionBlock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionBlock")
            .field("id", &self.core.id())
            .field("name", &self.core.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::cancel::CancellationToken;
    use crate::dataflow::completion::CompletionState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_runs_side_effect_per_item() {
        let total = Arc::new(AtomicUsize::new(0));
        let t = Arc::clone(&total);
        let action = ActionBlock::new(move |x: usize| {
            t.fetch_add(x, Ordering::SeqCst);
        })
        .unwrap();

        for i in 1..=4 {
            action.post(i);
        }
        action.complete();
        action.completion().wait().unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 10);
        assert!(matches!(action.state(), CompletionState::Succeeded));
    }

    #[test]
    fn test_named_block() {
        let action =
            ActionBlock::with_options(|_: i32| {}, BlockOptions::default().named("printer"))
                .unwrap();
        assert_eq!(action.name(), "printer");

        let unnamed = ActionBlock::new(|_: i32| {}).unwrap();
        assert!(unnamed.name().starts_with("action#"));
    }

    #[test]
    fn test_explicit_fault_discards_queue() {
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded::<()>();
        let processed = Arc::new(AtomicUsize::new(0));
        let p = Arc::clone(&processed);
        let action = ActionBlock::new(move |_: i32| {
            let _ = gate_rx.recv();
            p.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        for i in 0..5 {
            action.post(i);
        }
        action.fault(BlockError::Cancelled { block: action.id() });
        drop(gate_tx);

        let err = action.completion().wait().unwrap_err();
        assert!(err.is_cancelled());
        assert!(processed.load(Ordering::SeqCst) <= 1);
        assert!(!action.post(9));
    }

    #[test]
    fn test_cancellation_token_faults_block() {
        let token = CancellationToken::new();
        let action = ActionBlock::with_options(
            |_: i32| thread::sleep(Duration::from_millis(5)),
            BlockOptions::default().with_cancellation(token.clone()),
        )
        .unwrap();

        for i in 0..100 {
            action.post(i);
        }
        token.cancel();
        let err = action.completion().wait().unwrap_err();
        assert!(matches!(err, BlockError::Cancelled { block } if block == action.id()));
        assert_eq!(action.input_count(), 0);
    }

    #[test]
    fn test_second_fault_is_suppressed() {
        let action = ActionBlock::try_new(|x: i32| {
            anyhow::ensure!(x > 0, "bad {}", x);
            Ok(())
        })
        .unwrap();
        action.post(-1);
        action.completion().wait().unwrap_err();
        action.fault(BlockError::Cancelled { block: action.id() });
        assert_eq!(action.completion().suppressed().len(), 1);
        assert!(action.completion().wait().unwrap_err().user_error().is_some());
    }
}
