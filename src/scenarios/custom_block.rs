//! Filter even numbers, double them and keep a running sum, all behind a
//! single composite block.

use super::Console;
use crate::config::DataflowConfig;
use crate::dataflow::{
    encapsulate, ActionBlock, CompositeBlock, DataflowBlock, LinkOptions, SourceBlock,
    TargetBlock, TransformBlock,
};
use crate::error::Result;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Build the `i32 -> running sum` composite.
///
/// Odd numbers are dropped by the filter's outgoing link predicate. The sum
/// stage always runs a single worker so the running total is emitted in
/// order.
pub fn even_double_sum(
    console: &Console,
    config: &DataflowConfig,
) -> Result<CompositeBlock<i32, i64>> {
    let out = console.clone();
    let filter = TransformBlock::with_options(
        move |item: i32| {
            if item % 2 == 0 {
                out.line(format!("Filtering: {} is even.", item));
            }
            item
        },
        config.block_options("filter"),
    )?;

    let out = console.clone();
    let double = TransformBlock::with_options(
        move |item: i32| {
            let doubled = i64::from(item) * 2;
            out.line(format!("Transforming: {} to {}", item, doubled));
            doubled
        },
        config.block_options("double"),
    )?;

    let sum = Arc::new(AtomicI64::new(0));
    let out = console.clone();
    let aggregate = TransformBlock::with_options(
        move |item: i64| {
            let total = sum.fetch_add(item, Ordering::SeqCst) + item;
            out.line(format!("Aggregating: Current sum = {}", total));
            total
        },
        config.block_options("aggregate").with_parallelism(1),
    )?;

    filter.link_to(
        &double,
        LinkOptions::propagate().with_predicate(|item: &i32| item % 2 == 0),
    );
    double.link_to(&aggregate, LinkOptions::propagate());

    Ok(encapsulate(&filter, &aggregate).named("even-double-sum"))
}

pub fn run(data: &[i32], console: &Console, config: &DataflowConfig) -> Result<()> {
    let custom = even_double_sum(console, config)?;
    let out = console.clone();
    let report = ActionBlock::with_options(
        move |sum: i64| out.line(format!("Sum of even numbers: {}", sum)),
        config.block_options("report"),
    )?;

    custom.link_to(&report, LinkOptions::propagate());

    for &item in data {
        custom.post(item);
    }
    custom.complete();
    report.completion().wait()?;
    Ok(())
}
