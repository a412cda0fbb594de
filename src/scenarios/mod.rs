//! Runnable demonstration scenarios.
//!
//! Each scenario wires a small graph of blocks, feeds it the user's numbers
//! and waits for the terminal block. Output goes through a [`Console`] so
//! tests can capture it.

pub mod completion_handling;
pub mod custom_block;
pub mod linking;
pub mod marshaling;
pub mod parallel;
pub mod propagating_errors;
pub mod throttling;
pub mod unlinking;

use crate::config::DataflowConfig;
use crate::error::{DataflowError, Result};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Line-oriented output sink shared by the blocks of a scenario.
#[derive(Clone, Default)]
pub struct Console {
    lines: Arc<Mutex<Vec<String>>>,
    echo: bool,
}

impl Console {
    /// Print lines to stdout as well as recording them.
    pub fn stdout() -> Self {
        Self {
            lines: Arc::default(),
            echo: true,
        }
    }

    /// Record lines without printing.
    pub fn captured() -> Self {
        Self::default()
    }

    pub fn line(&self, message: impl Into<String>) {
        let message = message.into();
        if self.echo {
            println!("{}", message);
        }
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// The bundled scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// Transform to text, print with a linked action
    Linking,
    /// A transform fails at 3; the fault reaches the action
    PropagatingErrors,
    /// Broadcast to two actions, unlink one halfway
    Unlinking,
    /// Bounded input feeding two slow actions
    Throttling,
    /// Transform and action on every CPU
    Parallel,
    /// Even-filter, double and running sum behind one composite block
    CustomBlock,
    /// Three-stage chain completed from its head
    CompletionHandling,
    /// Results rendered on a designated thread
    Marshaling,
}

impl Scenario {
    pub const ALL: [Scenario; 8] = [
        Scenario::Linking,
        Scenario::PropagatingErrors,
        Scenario::Unlinking,
        Scenario::Throttling,
        Scenario::Parallel,
        Scenario::CustomBlock,
        Scenario::CompletionHandling,
        Scenario::Marshaling,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::Linking => "linking",
            Scenario::PropagatingErrors => "propagating-errors",
            Scenario::Unlinking => "unlinking",
            Scenario::Throttling => "throttling",
            Scenario::Parallel => "parallel",
            Scenario::CustomBlock => "custom-block",
            Scenario::CompletionHandling => "completion-handling",
            Scenario::Marshaling => "marshaling",
        }
    }

    /// Run the scenario to completion.
    pub fn run(self, data: &[i32], console: &Console, config: &DataflowConfig) -> Result<()> {
        tracing::info!("Running scenario '{}' with {} items", self.name(), data.len());
        match self {
            Scenario::Linking => linking::run(data, console, config),
            Scenario::PropagatingErrors => propagating_errors::run(data, console, config),
            Scenario::Unlinking => unlinking::run(data, console, config),
            Scenario::Throttling => throttling::run(data, console, config),
            Scenario::Parallel => parallel::run(data, console, config),
            Scenario::CustomBlock => custom_block::run(data, console, config),
            Scenario::CompletionHandling => completion_handling::run(data, console, config),
            Scenario::Marshaling => marshaling::run(data, console, config),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse "1, 2,3" into numbers.
pub fn parse_input(text: &str) -> Result<Vec<i32>> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DataflowError::Input("no numbers given".to_string()));
    }
    text.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<i32>()
                .map_err(|_| DataflowError::Input(format!("'{}' is not a number", part)))
        })
        .collect()
}

/// Name of the current thread for scenario output.
pub(crate) fn thread_label() -> String {
    let current = std::thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}
