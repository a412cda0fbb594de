//! blockflow - Main Entry Point
//!
//! Runs one of the bundled dataflow scenarios over a list of numbers given
//! on the command line or typed at the prompt.

use anyhow::Context;
use blockflow::{
    config::{self, DataflowConfig},
    scenarios::{parse_input, Console, Scenario},
};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "blockflow", version, about = "Dataflow block scenarios")]
struct Cli {
    /// Scenario to run
    #[arg(short, long, value_enum, default_value_t = Scenario::CustomBlock)]
    scenario: Scenario,

    /// Comma-separated numbers; prompts on stdin when omitted
    #[arg(short, long)]
    input: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the config in use and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let (file_layer, _guard) = match &cli.log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let file_name = path
                .file_name()
                .context("--log-file must name a file")?;
            let appender =
                tracing_appender::rolling::never(dir.unwrap_or_else(|| ".".as_ref()), file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                ),
                Some(guard),
            )
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,blockflow=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    let config = match &cli.config {
        Some(path) => DataflowConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => config::default_path()
            .map(DataflowConfig::load_or_default)
            .unwrap_or_default(),
    };

    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let text = match cli.input.or_else(|| config.scenarios.default_input.clone()) {
        Some(text) => text,
        None => prompt_for_input()?,
    };
    let data = parse_input(&text)?;

    tracing::info!("Starting scenario '{}'", cli.scenario);
    cli.scenario
        .run(&data, &Console::stdout(), &config)
        .with_context(|| format!("scenario '{}' failed", cli.scenario))?;
    tracing::info!("Scenario '{}' finished", cli.scenario);
    Ok(())
}

fn prompt_for_input() -> anyhow::Result<String> {
    println!("Enter numbers separated by commas:");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}
