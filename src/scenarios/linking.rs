//! Transform numbers to text and print them through a linked action.

use super::Console;
use crate::config::DataflowConfig;
use crate::dataflow::{ActionBlock, DataflowBlock, SourceBlock, TargetBlock, TransformBlock};
use crate::error::Result;

pub fn run(data: &[i32], console: &Console, config: &DataflowConfig) -> Result<()> {
    let formatter = TransformBlock::with_options(
        |i: i32| format!("Number: {}", i),
        config.block_options("formatter"),
    )?;
    let out = console.clone();
    let printer =
        ActionBlock::with_options(move |s: String| out.line(s), config.block_options("printer"))?;

    formatter.link_to(&printer, config.links.options());

    for &item in data {
        formatter.send(item);
    }
    formatter.complete();
    if !config.links.propagate_completion {
        formatter.completion().wait()?;
        printer.complete();
    }
    printer.completion().wait()?;
    Ok(())
}
