//! QueryGate - guardrails and safe execution for LLM-generated SQL
//!
//! This is the main entry point for the `qgate` binary.

use anyhow::Result;
use clap::Parser;
use qg_cli::Cli;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    cli.run()?;

    Ok(())
}
