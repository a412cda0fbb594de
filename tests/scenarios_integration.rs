//! Every bundled scenario runs to completion with captured output

mod common;

use blockflow::{Console, DataflowConfig, Scenario};

fn fast_config() -> DataflowConfig {
    let mut config = DataflowConfig::default();
    config.scenarios.work_delay_ms = 1;
    config
}

fn run(scenario: Scenario, data: &[i32]) -> Vec<String> {
    let console = Console::captured();
    scenario
        .run(data, &console, &fast_config())
        .unwrap_or_else(|e| panic!("scenario {} failed: {}", scenario, e));
    console.lines()
}

#[test]
fn test_linking_prints_in_order() {
    let lines = run(Scenario::Linking, &[3, 1, 2]);
    assert_eq!(lines, vec!["Number: 3", "Number: 1", "Number: 2"]);
}

#[test]
fn test_propagating_errors_reports_caught_error() {
    let lines = run(Scenario::PropagatingErrors, &[1, 2, 3, 4, 5]);
    assert_eq!(lines.last().map(String::as_str), Some("Caught error: Error at 3"));
    for line in &lines[..lines.len() - 1] {
        assert!(line == "2" || line == "4", "unexpected line {}", line);
    }
}

#[test]
fn test_propagating_errors_without_three_succeeds() {
    let lines = run(Scenario::PropagatingErrors, &[1, 2]);
    assert_eq!(lines, vec!["2", "4"]);
}

#[test]
fn test_unlinking_stops_second_block() {
    let data: Vec<i32> = (1..=8).collect();
    let lines = run(Scenario::Unlinking, &data);
    let first: Vec<_> = lines.iter().filter(|l| l.starts_with("Block 1")).collect();
    let second: Vec<_> = lines.iter().filter(|l| l.starts_with("Block 2")).collect();
    assert_eq!(first.len(), 8);
    assert!(second.len() <= 4);
}

#[test]
fn test_throttling_feeds_both_actions() {
    let lines = run(Scenario::Throttling, &[1, 2, 3]);
    for action in 1..=2 {
        let got: Vec<_> = lines
            .iter()
            .filter(|l| l.starts_with(&format!("Processed by action {}:", action)))
            .cloned()
            .collect();
        assert_eq!(
            got,
            vec![
                format!("Processed by action {}: 2", action),
                format!("Processed by action {}: 4", action),
                format!("Processed by action {}: 6", action),
            ]
        );
    }
}

#[test]
fn test_parallel_processes_every_item() {
    let lines = run(Scenario::Parallel, &[1, 2, 3, 4]);
    assert_eq!(lines.iter().filter(|l| l.starts_with("Processing ")).count(), 4);
    let mut results: Vec<_> = lines
        .iter()
        .filter_map(|l| l.strip_prefix("Result: "))
        .filter_map(|l| l.split(' ').next())
        .map(|n| n.parse::<i32>().unwrap())
        .collect();
    results.sort_unstable();
    assert_eq!(results, vec![2, 4, 6, 8]);
}

#[test]
fn test_custom_block_sums_even_numbers() {
    let lines = run(Scenario::CustomBlock, &[1, 2, 3, 4, 5, 6]);
    let sums: Vec<_> = lines
        .iter()
        .filter(|l| l.starts_with("Sum of even numbers"))
        .cloned()
        .collect();
    assert_eq!(
        sums,
        vec![
            "Sum of even numbers: 4",
            "Sum of even numbers: 12",
            "Sum of even numbers: 24"
        ]
    );
    assert!(lines.contains(&"Aggregating: Current sum = 24".to_string()));
}

#[test]
fn test_completion_handling_chain() {
    let lines = run(Scenario::CompletionHandling, &[1, 2, 3]);
    assert_eq!(lines, vec!["3", "5", "7"]);
}

#[test]
fn test_marshaling_renders_on_calling_thread() {
    let here = std::thread::current()
        .name()
        .map(str::to_string)
        .unwrap_or_default();
    let lines = run(Scenario::Marshaling, &[2, 3]);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Rendering 4 on "));
    assert!(lines[1].starts_with("Rendering 9 on "));
    if !here.is_empty() {
        assert!(lines.iter().all(|l| l.ends_with(&here)));
    }
}

fn count(lines: &[String], prefix: &str) -> usize {
    lines.iter().filter(|l| l.starts_with(prefix)).count()
}

fn run_without_propagation(scenario: Scenario, data: &[i32]) -> Vec<String> {
    let mut config = fast_config();
    config.links.propagate_completion = false;
    let console = Console::captured();
    scenario
        .run(data, &console, &config)
        .unwrap_or_else(|e| panic!("scenario {} failed: {}", scenario, e));
    console.lines()
}

#[test]
fn test_unlinking_delivers_everything_to_kept_block() {
    let data: Vec<i32> = (1..=2000).collect();
    for _ in 0..5 {
        let lines = run(Scenario::Unlinking, &data);
        assert_eq!(count(&lines, "Block 1: "), 2000);
        assert!(count(&lines, "Block 2: ") <= 1000);
    }
}

#[test]
fn test_non_propagating_linking_prints_everything() {
    let data: Vec<i32> = (0..1000).collect();
    let lines = run_without_propagation(Scenario::Linking, &data);
    let expected: Vec<String> = data.iter().map(|i| format!("Number: {}", i)).collect();
    assert_eq!(lines, expected);
}

#[test]
fn test_non_propagating_unlinking_keeps_every_item() {
    let data: Vec<i32> = (1..=2000).collect();
    for _ in 0..5 {
        let lines = run_without_propagation(Scenario::Unlinking, &data);
        assert_eq!(count(&lines, "Block 1: "), 2000);
        assert!(count(&lines, "Block 2: ") <= 1000);
    }

    let lines = run_without_propagation(Scenario::Unlinking, &[1, 2]);
    assert_eq!(count(&lines, "Block 1: "), 2);
    assert!(count(&lines, "Block 2: ") <= 1);
}

#[test]
fn test_non_propagating_throttling_feeds_both_actions() {
    let data: Vec<i32> = (1..=50).collect();
    let lines = run_without_propagation(Scenario::Throttling, &data);
    assert_eq!(count(&lines, "Processed by action 1: "), 50);
    assert_eq!(count(&lines, "Processed by action 2: "), 50);
}

#[test]
fn test_non_propagating_parallel_processes_everything() {
    let data: Vec<i32> = (1..=1000).collect();
    let lines = run_without_propagation(Scenario::Parallel, &data);
    assert_eq!(count(&lines, "Processing "), 1000);
    assert_eq!(count(&lines, "Result: "), 1000);
}
