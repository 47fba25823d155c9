use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Background watcher for a wipman directory.
///
/// wipman-daemon observes the directory tree, waits for each burst of editor
/// activity to settle, and forwards one change per touched path.
#[derive(Parser, Debug)]
#[command(
    name = "wipman-daemon",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log every raw event and watch registration (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the directory until interrupted, forwarding one reduced batch per burst.
    ///
    /// Timing is read from `wipman-daemon.toml` at the directory root when present.
    Watch {
        /// Root of the wipman directory.
        #[arg(env = "WIPMAN_DIR")]
        path: PathBuf,

        /// Write each batch to stdout as a JSON line instead of logging it.
        #[arg(long)]
        json: bool,
    },

    /// Scan the directory and report how many directories would be watched.
    Scan {
        /// Root of the wipman directory.
        #[arg(env = "WIPMAN_DIR")]
        path: PathBuf,

        /// Output results as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },
}
