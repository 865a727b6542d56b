//! Guardsmith CLI — the main entry point.
//!
//! Commands:
//! - `build`   — Generate guards and tests for every policied tool
//! - `inspect` — Summarize a previous run's manifest

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "guardsmith",
    about = "Guardsmith — policy-conformance guard generation",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate guards and tests for every tool with policy items
    Build {
        /// Directory holding domain.json plus the types and API modules
        #[arg(long, default_value = "domain")]
        domain: PathBuf,

        /// Directory of per-tool policy JSON files
        #[arg(long, default_value = "policies")]
        policies: PathBuf,

        /// Override the configured output directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Validate config, inputs, and the Python toolchain, then exit
        #[arg(long)]
        check_env: bool,
    },

    /// Summarize the manifest of a previous build
    Inspect {
        /// Output directory of the run to inspect
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Build {
            domain,
            policies,
            out,
            check_env,
        } => commands::build::run(domain, policies, out, check_env).await?,
        Commands::Inspect { out } => commands::inspect::run(out).await?,
    }

    Ok(())
}
