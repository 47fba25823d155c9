use std::path::PathBuf;

use serde::Serialize;

/// Result of a `scan` run.
#[derive(Debug, Serialize)]
pub struct ScanSummary {
    pub root: PathBuf,
    /// Directories that would carry a watch, the root included.
    pub directories: usize,
    /// Wall-clock time for the scan in seconds.
    pub elapsed_secs: f64,
}

/// Print a summary of the scan.
///
/// - `json = true`: emit a pretty-printed JSON object to stdout.
/// - `json = false`: emit a one-line human-readable summary to stdout.
pub fn print_summary(summary: &ScanSummary, json: bool) {
    if json {
        match serde_json::to_string_pretty(summary) {
            Ok(s) => println!("{}", s),
            Err(e) => tracing::error!("error serialising scan summary: {}", e),
        }
        return;
    }

    println!(
        "Scanned {} in {:.2}s",
        summary.root.display(),
        summary.elapsed_secs
    );
    println!("  {} directories to watch", summary.directories);
}
