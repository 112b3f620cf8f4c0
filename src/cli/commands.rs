//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// apiscout CLI
#[derive(Parser, Debug)]
#[command(name = "apiscout")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a window of records through a persisted source
    Replay {
        /// Source file (JSON)
        source: PathBuf,

        /// Number of records to fetch
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Records to skip from the start of the dataset
        #[arg(short, long, default_value = "0")]
        offset: i64,

        /// Dynamic parameter override, `key=value` (repeatable)
        #[arg(short = 'p', long = "param")]
        params: Vec<String>,
    },

    /// Inspect a persisted source
    Show {
        /// Source file (JSON)
        source: PathBuf,
    },

    /// Parse a source file and re-check its invariants
    Validate {
        /// Source file (JSON)
        source: PathBuf,
    },
}
