//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - initialises logging
//! - loads and validates the YAML config
//! - runs the pipeline and prints the summary

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, ConfigArgs};
use crate::config::PipelineConfig;
use crate::error::AppError;

pub mod pipeline;
pub mod progress;

/// Entry point for the `wellplate` binary.
pub fn run() -> Result<(), AppError> {
    // `wellplate plate.yaml` is shorthand for `wellplate run plate.yaml`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    init_logging(cli.log_filter());

    match cli.command {
        Command::Run(args) => handle_run(&args),
        Command::Validate(args) => handle_validate(&args),
    }
}

/// `RUST_LOG` (also read from `.env`) takes precedence over `-v`.
fn init_logging(default_filter: &str) {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle_run(args: &ConfigArgs) -> Result<(), AppError> {
    let config = PipelineConfig::from_yaml_file(&args.config)?;
    let output = pipeline::run_pipeline(&config, &progress::TracingProgress)?;
    println!("{}", crate::report::format_run_summary(&output, &config));
    Ok(())
}

fn handle_validate(args: &ConfigArgs) -> Result<(), AppError> {
    let config = PipelineConfig::from_yaml_file(&args.config)?;
    println!("{}", crate::report::format_validation(&config));
    Ok(())
}

/// Rewrite argv so a bare config path runs the pipeline.
///
/// Rules:
/// - `wellplate plate.yaml ...`     -> `wellplate run plate.yaml ...`
/// - `wellplate -v plate.yaml`      -> `wellplate -v run plate.yaml`
/// - subcommands, `--help`, `--version` and an empty argv are left alone
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(pos) = argv.iter().skip(1).position(|a| !is_verbosity_flag(a)).map(|p| p + 1) else {
        return argv;
    };

    let arg = argv[pos].as_str();
    let is_subcommand = matches!(arg, "run" | "validate" | "help");
    if is_subcommand || arg.starts_with('-') {
        return argv;
    }

    argv.insert(pos, "run".to_string());
    argv
}

fn is_verbosity_flag(arg: &str) -> bool {
    arg == "--verbose" || (arg.len() > 1 && arg.starts_with('-') && arg[1..].chars().all(|c| c == 'v'))
}
