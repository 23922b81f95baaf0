//! Forecast CLI - Command Line Operations for the Monte Carlo Engine
//!
//! # Commands
//!
//! - `forecast run --input <file>` - Simulate variables and summarise each period
//! - `forecast event --input <file>` - Estimate event probabilities
//! - `forecast check --input <file>` - Validate a request without simulating
//!
//! Requests are JSON documents (see [`request`]). Settings come from
//! `forecast.toml` and `FORECAST_*` environment variables (see [`config`]).

use std::path::Path;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;
mod output;
mod request;

pub use error::{CliError, Result};

use crate::config::CliSettings;

/// Monte Carlo forecasting CLI
#[derive(Parser)]
#[command(name = "forecast")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "forecast.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate variables and report per-period statistics
    Run {
        /// Path to the request file (JSON)
        #[arg(short, long)]
        input: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Re-run with one changed modelling choice (milstein, euler_maruyama, none, cholesky, copula)
        #[arg(long)]
        compare: Option<String>,
    },

    /// Estimate the probability of one or more events
    Event {
        /// Path to the request file (JSON)
        #[arg(short, long)]
        input: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Output format (json, table)
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Re-run with one changed modelling choice (milstein, euler_maruyama, none, cholesky, copula)
        #[arg(long)]
        compare: Option<String>,
    },

    /// Validate a request and report warnings without simulating
    Check {
        /// Path to the request file (JSON)
        #[arg(short, long)]
        input: String,

        /// Treat the request as an event request
        #[arg(short, long)]
        event: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = CliSettings::load(Path::new(&cli.config))?;

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        settings.log_level.to_string()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Run {
            input,
            output,
            format,
            compare,
        } => commands::run::run(&input, output.as_deref(), &format, compare.as_deref(), &settings)?,
        Commands::Event {
            input,
            output,
            format,
            compare,
        } => commands::event::run(&input, output.as_deref(), &format, compare.as_deref(), &settings)?,
        Commands::Check { input, event } => commands::check::run(&input, event, &settings)?,
    }
    Ok(())
}
