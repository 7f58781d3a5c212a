//! Command-line interface definition.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// hashward: hash-based malware scanner with quarantine
#[derive(Parser, Debug)]
#[command(name = "hashward")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Configuration file (defaults to the per-user config path)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine processing
    Json,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a directory and quarantine suspicious files
    Scan {
        /// Directory to scan
        directory: Option<PathBuf>,

        /// Keep watching the directory after the initial scan
        #[arg(long)]
        realtime: bool,
    },

    /// Manage quarantined items
    Quarantine {
        #[command(subcommand)]
        action: QuarantineAction,
    },

    /// Show loaded signatures
    Signatures,
}

/// Quarantine subcommands.
#[derive(Subcommand, Debug)]
pub enum QuarantineAction {
    /// List quarantined items
    List {
        /// Quarantine directory (overrides configuration)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
