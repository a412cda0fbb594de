//! Bounded input in front of two slow actions.
//!
//! `send` blocks while the throttled block's input is full, so the producer
//! runs at the pace of the slowest consumer.

use super::Console;
use crate::config::DataflowConfig;
use crate::dataflow::{when_all, ActionBlock, DataflowBlock, SourceBlock, TargetBlock, TransformBlock};
use crate::error::Result;
use std::thread;

pub fn run(data: &[i32], console: &Console, config: &DataflowConfig) -> Result<()> {
    let delay = config.scenarios.work_delay();

    let mut options = config.block_options("throttled");
    if options.bounded_capacity.is_none() {
        options = options.with_bounded_capacity(config.scenarios.throttle_capacity);
    }
    let throttled = TransformBlock::with_options(|i: i32| i * 2, options)?;

    let out = console.clone();
    let first = ActionBlock::with_options(
        move |i: i32| {
            out.line(format!("Processed by action 1: {}", i));
            thread::sleep(delay);
        },
        config.block_options("action1"),
    )?;
    let out = console.clone();
    let second = ActionBlock::with_options(
        move |i: i32| {
            out.line(format!("Processed by action 2: {}", i));
            thread::sleep(delay);
        },
        config.block_options("action2"),
    )?;

    throttled.link_to(&first, config.links.options());
    throttled.link_to(&second, config.links.options());

    for &item in data {
        throttled.send(item);
    }
    throttled.complete();
    if !config.links.propagate_completion {
        throttled.completion().wait()?;
        first.complete();
        second.complete();
    }
    when_all(&[first.completion(), second.completion()])?;

    tracing::debug!(
        "Throttled input peaked at {} items (capacity: {:?})",
        throttled.peak_input_count(),
        throttled.capacity()
    );
    Ok(())
}
