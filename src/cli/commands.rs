//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - list: show persisted lists
//! - show: details of one list
//! - prune: remove expired lists
//! - evict: remove one list

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fluxlist - inspect and maintain persisted paginated lists
#[derive(Parser, Debug)]
#[command(name = "fluxlist")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List persisted lists
    List {
        /// Only show lists of this site
        #[arg(short, long)]
        site: Option<i64>,

        /// Only show lists that contain this remote id
        #[arg(short, long)]
        item: Option<i64>,
    },

    /// Show one persisted list
    Show {
        /// List key, as printed by `list`
        key: String,

        /// Print every remote id
        #[arg(short, long)]
        ids: bool,
    },

    /// Remove lists that were not fetched recently
    Prune {
        /// Maximum age in seconds; defaults to the configured expiry
        #[arg(short, long)]
        max_age_secs: Option<u64>,
    },

    /// Remove one list
    Evict {
        /// List key, as printed by `list`
        key: String,
    },
}
