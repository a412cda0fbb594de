//! Transform and action running one worker per CPU.

use super::{thread_label, Console};
use crate::config::DataflowConfig;
use crate::dataflow::{ActionBlock, DataflowBlock, SourceBlock, TargetBlock, TransformBlock};
use crate::error::Result;

pub fn run(data: &[i32], console: &Console, config: &DataflowConfig) -> Result<()> {
    let parallel_options = |name: &str| {
        if config.blocks.contains_key(name) {
            config.block_options(name)
        } else {
            config.block_options(name).with_max_parallelism()
        }
    };

    let out = console.clone();
    let doubler = TransformBlock::with_options(
        move |i: i32| {
            out.line(format!("Processing {} on thread {}", i, thread_label()));
            i * 2
        },
        parallel_options("parallel"),
    )?;
    let out = console.clone();
    let printer = ActionBlock::with_options(
        move |i: i32| out.line(format!("Result: {} on thread {}", i, thread_label())),
        parallel_options("results"),
    )?;

    doubler.link_to(&printer, config.links.options());

    for &item in data {
        doubler.post(item);
    }
    doubler.complete();
    if !config.links.propagate_completion {
        doubler.completion().wait()?;
        printer.complete();
    }
    printer.completion().wait()?;
    Ok(())
}
