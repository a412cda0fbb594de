//! A transform that fails at 3; the fault travels to the linked action.

use super::Console;
use crate::config::DataflowConfig;
use crate::dataflow::{ActionBlock, DataflowBlock, LinkOptions, SourceBlock, TargetBlock, TransformBlock};
use crate::error::Result;

pub fn run(data: &[i32], console: &Console, config: &DataflowConfig) -> Result<()> {
    let doubler = TransformBlock::try_with_options(
        |i: i32| {
            if i == 3 {
                anyhow::bail!("Error at 3");
            }
            Ok(i * 2)
        },
        config.block_options("doubler"),
    )?;
    let out = console.clone();
    let printer = ActionBlock::with_options(
        move |i: i32| out.line(i.to_string()),
        config.block_options("printer"),
    )?;

    // The point of this scenario is propagation, whatever the link defaults say.
    doubler.link_to(&printer, LinkOptions::propagate());

    for &item in data {
        doubler.post(item);
    }
    doubler.complete();

    if let Err(error) = printer.completion().wait() {
        let message = error
            .user_error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| error.root_cause().to_string());
        console.line(format!("Caught error: {}", message));
    }
    Ok(())
}
