//! `qg_cli` - CLI commands for querygate
//!
//! This crate provides:
//! - clap-based command definitions
//! - Validation, cleanup, and batch-execution subcommands
//! - JSON and text output formatting

use clap::{Parser, Subcommand, ValueEnum};
use qg_config::QgConfig;
use qg_exec::BatchExecutor;
use qg_extract::clean_sql;
use qg_guard::SqlGuardrails;
use qg_store::AnalyticsStore;
use std::io::Read;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// CLI errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Config error: {0}")]
    ConfigError(#[from] qg_config::ConfigError),

    #[error("Store error: {0}")]
    StoreError(#[from] qg_store::StoreError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

/// Main CLI application
#[derive(Parser, Debug)]
#[command(name = "qgate")]
#[command(
    author,
    version,
    about = "Guardrails and safe execution for LLM-generated SQL"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for commands
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate one SQL statement against the guardrails
    Check {
        /// SQL text, or "-" to read from stdin
        sql: String,
    },

    /// Print the full guardrail report for one statement as JSON
    Report {
        /// SQL text, or "-" to read from stdin
        sql: String,
    },

    /// Strip LLM markdown artifacts from SQL text
    Clean {
        /// Raw text, or "-" to read from stdin
        text: String,
    },

    /// Extract, validate, and execute every statement in an LLM response
    Run {
        /// Path to a file with the LLM response, or "-" for stdin
        input: String,
    },

    /// List the tables the guardrails will allow
    Tables,
}

impl Cli {
    /// Execute the selected command.
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] on config/store failures, or
    /// [`CliError::CommandFailed`] when a checked statement is blocked.
    pub fn run(&self) -> Result<(), CliError> {
        let config = QgConfig::load(self.config.as_deref())?;
        debug!(db_path = %config.global.db_path.display(), "configuration loaded");

        match &self.command {
            Commands::Check { sql } => self.cmd_check(&config, &read_arg(sql)?),
            Commands::Report { sql } => self.cmd_report(&config, &read_arg(sql)?),
            Commands::Clean { text } => {
                println!("{}", clean_sql(&read_arg(text)?));
                Ok(())
            }
            Commands::Run { input } => self.cmd_run(&config, &read_arg(input)?),
            Commands::Tables => {
                for table in config.guardrail_config().known_tables {
                    println!("{table}");
                }
                Ok(())
            }
        }
    }

    fn cmd_check(&self, config: &QgConfig, sql: &str) -> Result<(), CliError> {
        let guardrails = SqlGuardrails::new(config.guardrail_config());
        let result = guardrails.validate(sql);

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
            OutputFormat::Text => {
                if result.is_safe {
                    println!("SAFE");
                } else {
                    println!("BLOCKED");
                    for v in &result.violations {
                        println!("  {}: {}", v.risk_level.as_str().to_uppercase(), v.message);
                    }
                }
                for w in &result.warnings {
                    println!("  warning: {}", w.message);
                }
            }
        }

        if result.is_safe {
            Ok(())
        } else {
            let messages: Vec<&str> = result
                .violations
                .iter()
                .map(|v| v.message.as_str())
                .collect();
            Err(CliError::CommandFailed(messages.join("; ")))
        }
    }

    fn cmd_report(&self, config: &QgConfig, sql: &str) -> Result<(), CliError> {
        let guardrails = SqlGuardrails::new(config.guardrail_config());
        println!("{}", serde_json::to_string_pretty(&guardrails.report(sql))?);
        Ok(())
    }

    fn cmd_run(&self, config: &QgConfig, llm_text: &str) -> Result<(), CliError> {
        let store = AnalyticsStore::open(&config.global.db_path)?;
        let executor = BatchExecutor::with_config(store, config.guardrail_config());
        let records = executor.execute_batch(llm_text);

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
            OutputFormat::Text => {
                for (idx, record) in records.iter().enumerate() {
                    println!("-- statement #{} [{}]", idx + 1, record.status.as_str());
                    if let Some(rows) = record.row_count {
                        println!(
                            "   {} rows, {} columns",
                            rows,
                            record.column_count.unwrap_or_default()
                        );
                    } else {
                        println!("   {}", record.result);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Resolve a CLI value argument: literal text, a readable file path for
/// `run`, or "-" for stdin.
fn read_arg(value: &str) -> Result<String, CliError> {
    if value == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer);
    }
    let path = std::path::Path::new(value);
    if path.is_file() {
        return Ok(std::fs::read_to_string(path)?);
    }
    Ok(value.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check_command() {
        let cli = Cli::parse_from(["qgate", "check", "SELECT 1"]);
        assert!(matches!(cli.command, Commands::Check { .. }));
    }

    #[test]
    fn test_parse_run_with_format() {
        let cli = Cli::parse_from(["qgate", "--format", "json", "run", "input.md"]);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Run { .. }));
    }

    #[test]
    fn test_read_arg_literal() {
        assert_eq!(read_arg("SELECT 1").unwrap(), "SELECT 1");
    }

    #[test]
    fn test_check_safe_statement_succeeds() {
        let cli = Cli::parse_from([
            "qgate",
            "check",
            "SELECT TOP 5 age FROM customer_information WHERE age > 0",
        ]);
        assert!(cli.run().is_ok());
    }

    #[test]
    fn test_check_blocked_statement_fails() {
        let cli = Cli::parse_from(["qgate", "check", "DROP TABLE customer_information"]);
        let err = cli.run().unwrap_err();
        assert!(matches!(err, CliError::CommandFailed(_)));
        assert!(err.to_string().contains("DROP operation"));
    }

    #[test]
    fn test_report_command_succeeds() {
        let cli = Cli::parse_from(["qgate", "report", "SELECT * FROM customer_information"]);
        assert!(cli.run().is_ok());
    }

    #[test]
    fn test_clean_command_succeeds() {
        let cli = Cli::parse_from(["qgate", "clean", "## Q\nSELECT 1;"]);
        assert!(cli.run().is_ok());
    }

    #[test]
    fn test_tables_command_succeeds() {
        let cli = Cli::parse_from(["qgate", "tables"]);
        assert!(cli.run().is_ok());
    }
}
