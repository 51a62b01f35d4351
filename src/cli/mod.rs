//! CLI interface for parity-arb
//!
//! Provides subcommands for:
//! - `run`: Run the engine in paper mode over a JSON-lines quote stream
//! - `config`: Show the effective configuration

mod run;

pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "parity-arb")]
#[command(about = "Pair-cost arbitrage engine for binary YES/NO markets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the engine
    Run(RunArgs),
    /// Show the effective configuration
    Config,
}
