//! Broadcast to two actions and unlink the second one halfway through.

use super::Console;
use crate::config::DataflowConfig;
use crate::dataflow::{
    when_all, ActionBlock, BroadcastBlock, DataflowBlock, SourceBlock, TargetBlock,
};
use crate::error::Result;

pub fn run(data: &[i32], console: &Console, config: &DataflowConfig) -> Result<()> {
    let broadcast = BroadcastBlock::with_options(config.block_options("broadcast"))?;
    let out = console.clone();
    let first = ActionBlock::with_options(
        move |i: i32| out.line(format!("Block 1: {}", i)),
        config.block_options("block1"),
    )?;
    let out = console.clone();
    let second = ActionBlock::with_options(
        move |i: i32| out.line(format!("Block 2: {}", i)),
        config.block_options("block2"),
    )?;

    broadcast.link_to(&first, config.links.options());
    let to_second = broadcast.link_to(&second, config.links.options());

    let half = data.len() / 2;
    for (index, &item) in data.iter().enumerate() {
        if index == half {
            tracing::debug!("Unlinking block 2 before item {}", index);
            to_second.unlink();
        }
        broadcast.post(item);
    }
    broadcast.complete();

    // Unlinking leaves the second action open, and without propagation
    // neither action hears about the broadcast finishing.
    broadcast.completion().wait()?;
    if !config.links.propagate_completion {
        first.complete();
    }
    second.complete();
    when_all(&[first.completion(), second.completion()])?;
    Ok(())
}
