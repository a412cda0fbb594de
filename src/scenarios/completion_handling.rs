//! Three-stage chain completed from its head.

use super::Console;
use crate::config::DataflowConfig;
use crate::dataflow::{ActionBlock, DataflowBlock, LinkOptions, SourceBlock, TargetBlock, TransformBlock};
use crate::error::Result;

pub fn run(data: &[i32], console: &Console, config: &DataflowConfig) -> Result<()> {
    let double = TransformBlock::with_options(|i: i32| i * 2, config.block_options("block1"))?;
    let increment = TransformBlock::with_options(|i: i32| i + 1, config.block_options("block2"))?;
    let out = console.clone();
    let last = ActionBlock::with_options(
        move |i: i32| out.line(i.to_string()),
        config.block_options("final"),
    )?;

    double.link_to(&increment, LinkOptions::propagate());
    increment.link_to(&last, LinkOptions::propagate());

    for &item in data {
        double.post(item);
    }
    double.complete();
    last.completion().wait()?;
    Ok(())
}
