//! PAD CLI
//!
//! Publishes usage profiles under k-anonymity.
//!
//! # Commands
//!
//! - `publish`: sanitize a dataset JSON file, print the report and the sanitized data
//! - `describe`: print what the published data preserves
//! - `check-config`: validate a configuration file
//!
//! Exit codes: 0 success, 1 input or configuration error, 2 anonymity could
//! not be guaranteed. Logs go to stderr.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod error;

use error::{exit_code_for_error, CliExitCode};

/// PAD - k-anonymous publication of usage profiles
#[derive(Parser)]
#[command(name = "pad")]
#[command(version)]
#[command(about = "Publish usage profiles under k-anonymity while preserving chosen statistics")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sanitize a dataset
    Publish(commands::publish::PublishArgs),
    /// Describe the data a configuration publishes
    Describe(commands::describe::DescribeArgs),
    /// Validate a configuration
    CheckConfig(commands::describe::CheckConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Publish(args) => commands::publish::publish_command(args),
        Commands::Describe(args) => commands::describe::describe_command(args),
        Commands::CheckConfig(args) => commands::describe::check_config_command(args),
    };

    match result {
        Ok(()) => CliExitCode::Success.into(),
        Err(err) => {
            let code = exit_code_for_error(&err);
            error!(exit_code = code as u8, "{:#}", err);
            code.into()
        }
    }
}
