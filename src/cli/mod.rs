//! Command-line parsing for the plate-reader analysis pipeline.
//!
//! Parsing lives here; dispatch lives in `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "wellplate",
    version,
    about = "Microplate reader analysis: OD normalization and fluorescein (MEFL) calibration"
)]
pub struct Cli {
    /// Increase log verbosity (default info, -v debug, -vv trace). `RUST_LOG` wins if set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full pipeline described by a YAML config and print a summary.
    Run(ConfigArgs),
    /// Parse and validate a YAML config without reading any data.
    Validate(ConfigArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    /// Pipeline configuration (YAML).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

impl Cli {
    /// Default `tracing` filter for the requested verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_verbosity() {
        let cli = Cli::parse_from(["wellplate", "-vv", "run", "plate.yaml"]);
        assert_eq!(cli.log_filter(), "trace");
        match cli.command {
            Command::Run(args) => assert_eq!(args.config, PathBuf::from("plate.yaml")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn progress_is_logged_by_default() {
        let cli = Cli::parse_from(["wellplate", "run", "plate.yaml"]);
        assert_eq!(cli.log_filter(), "info");
    }

    #[test]
    fn verbosity_is_accepted_after_the_subcommand() {
        let cli = Cli::parse_from(["wellplate", "validate", "plate.yaml", "-v"]);
        assert_eq!(cli.log_filter(), "debug");
        assert!(matches!(cli.command, Command::Validate(_)));
    }
}
