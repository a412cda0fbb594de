//! Property-based checks over whole block chains

mod common;

use blockflow::{BlockOptions, DataflowBlock, LinkOptions, SourceBlock, TargetBlock, TransformBlock};
use common::builders::{increment_chain, CollectorBuilder};
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_chain_preserves_order(
        stages in 1usize..5,
        input in prop::collection::vec(any::<i32>(), 0..200)
    ) {
        let (head, tail) = increment_chain(stages);
        let sink = CollectorBuilder::new().build::<i64>();
        tail.link_to(&sink.block, LinkOptions::propagate());

        for &x in &input {
            prop_assert!(head.post(i64::from(x)));
        }
        head.complete();
        common::wait_ok(&sink.block.completion());

        let expected: Vec<i64> = input.iter().map(|&x| i64::from(x) + stages as i64).collect();
        prop_assert_eq!(sink.items(), expected);
    }

    #[test]
    fn test_bounded_inputs_never_exceed_capacity(
        capacity in 1usize..6,
        count in 1usize..60
    ) {
        let options = BlockOptions::default().with_bounded_capacity(capacity);
        let stage = TransformBlock::with_options(|x: usize| x, options).unwrap();
        let sink = CollectorBuilder::new()
            .capacity(capacity)
            .delay(Duration::from_micros(200))
            .build::<usize>();
        stage.link_to(&sink.block, LinkOptions::propagate());

        for x in 0..count {
            prop_assert!(stage.send(x));
        }
        stage.complete();
        common::wait_ok(&sink.block.completion());

        prop_assert!(stage.peak_input_count() <= capacity);
        prop_assert!(sink.block.peak_input_count() <= capacity);
        prop_assert_eq!(sink.items(), (0..count).collect::<Vec<_>>());
    }
}
