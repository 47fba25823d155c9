mod cli;
mod output;

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use output::{ScanSummary, print_summary};
use wipman_daemon::config::WatchConfig;
use wipman_daemon::inventory::PathInventory;
use wipman_daemon::watcher;
use wipman_daemon::watcher::forward::{JsonLinesForwarder, LogForwarder};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Scan { path, json } => {
            let start = Instant::now();
            let inventory = PathInventory::scan(&path)
                .with_context(|| format!("cannot scan {}", path.display()))?;
            print_summary(
                &ScanSummary {
                    root: path,
                    directories: inventory.len(),
                    elapsed_secs: start.elapsed().as_secs_f64(),
                },
                json,
            );
        }
        Commands::Watch { path, json } => {
            let config = WatchConfig::load(&path);
            // One thread: the intake, detector and flush tasks interleave
            // cooperatively.
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;

            let result = if json {
                let forwarder = JsonLinesForwarder::new(std::io::stdout());
                runtime.block_on(watcher::start(&path, &config, forwarder))
            } else {
                runtime.block_on(watcher::start(&path, &config, LogForwarder))
            };
            result.with_context(|| format!("cannot watch {}", path.display()))?;
        }
    }

    Ok(())
}

/// Logs go to stderr so `watch --json` keeps stdout for batches.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "wipman_daemon=debug"
    } else {
        "wipman_daemon=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
