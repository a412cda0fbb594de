//! Compute on workers, render on a designated thread.
//!
//! The renderer's function is dispatched to a queue pumped by the calling
//! thread, the way UI updates are marshalled onto a UI thread.

use super::{thread_label, Console};
use crate::config::DataflowConfig;
use crate::dataflow::{
    dispatch_queue, ActionBlock, DataflowBlock, LinkOptions, SourceBlock, TargetBlock,
    TransformBlock,
};
use crate::error::Result;
use std::sync::Arc;

pub fn run(data: &[i32], console: &Console, config: &DataflowConfig) -> Result<()> {
    let (queue, pump) = dispatch_queue("render");

    let square = TransformBlock::with_options(
        |i: i32| i64::from(i) * i64::from(i),
        config.block_options("square"),
    )?;
    let out = console.clone();
    let render = ActionBlock::with_options(
        move |v: i64| out.line(format!("Rendering {} on {}", v, thread_label())),
        config
            .block_options("render")
            .with_context(Arc::new(queue)),
    )?;

    square.link_to(&render, LinkOptions::propagate());

    for &item in data {
        square.post(item);
    }
    square.complete();
    pump.run_until(&render.completion())?;
    Ok(())
}
