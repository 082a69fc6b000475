//! fstree CLI Binary
//!
//! Command-line interface for viewing and editing a directory tree.

use anyhow::Context;
use clap::Parser;
use fstree::logging::init_logging;
use fstree::tooling::cli::{load_config, Cli, CliContext};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli).context("Failed to load configuration")?;
    let logging = cli.logging_config(&config.logging);
    init_logging(Some(&logging)).context("Failed to initialize logging")?;

    let context = CliContext::new(cli.root.clone(), &config)
        .with_context(|| format!("Failed to open tree at {}", cli.root.display()))?;
    let output = context.execute(&cli.command)?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
