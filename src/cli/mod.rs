//! CLI command handlers
//!
//! Each subcommand has its own module with handler functions.

pub mod address;
pub mod config;
pub mod locate;
pub mod nearby;
pub mod serve;

use crate::error::{Error, Result};
use crate::format::{get_formatter, OutputFormatter};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Guest location detection and nearby branch lookup
#[derive(Parser)]
#[command(name = "branch-locator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect the current location and list nearby branches
    Locate(locate::LocateArgs),

    /// List branches around a coordinate
    Nearby(nearby::NearbyArgs),

    /// Reverse geocode a coordinate into a short address
    Address(address::AddressArgs),

    /// Start web server (foreground)
    Serve(serve::ServeArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

/// Run the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Locate(args) => locate::run(args).await,
        Commands::Nearby(args) => nearby::run(args).await,
        Commands::Address(args) => address::run(args).await,
        Commands::Serve(args) => serve::run(args).await,
        Commands::Config(args) => config::run(args),
    }
}

/// Initialize logging to stderr, honouring RUST_LOG when set
pub(crate) fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

/// Resolve an output formatter by name
pub(crate) fn formatter(name: &str) -> Result<Box<dyn OutputFormatter>> {
    get_formatter(name).ok_or_else(|| Error::Config(format!("Unknown format: {}", name)))
}
