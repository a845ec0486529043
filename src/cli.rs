//! Command-line definition.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Snapshot, prune and restore the inventory database.
#[derive(Debug, Parser)]
#[command(name = "stockpile", version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (toml, yaml or json)
    #[arg(short, long, global = true, env = "STOCKPILE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Back up the database now
    Backup,
    /// Best-effort backup for application startup; never fails
    Startup,
    /// List available backups, newest first
    List {
        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Replace the database with a backup
    Restore {
        /// File name of the backup, as shown by `list`
        file_name: String,
    },
}

impl Cli {
    /// Default log filter for the requested verbosity; `RUST_LOG` wins.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
