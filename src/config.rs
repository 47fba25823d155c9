use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// File name looked up at the watch root.
pub const CONFIG_FILE: &str = "wipman-daemon.toml";

const DEFAULT_QUIET_MS: u64 = 1_000;
const DEFAULT_POLL_MS: u64 = 200;
const DEFAULT_FORWARD_QUEUE: usize = 16;

/// Raw contents of `wipman-daemon.toml`. Every field is optional.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    /// Milliseconds without any event before a burst is considered complete.
    quiet_ms: Option<u64>,
    /// Milliseconds between two checks of the burst deadline.
    poll_ms: Option<u64>,
    /// Number of reduced batches that may wait for the forwarder.
    forward_queue: Option<usize>,
}

/// Timing and queueing knobs for the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    pub quiet: Duration,
    pub poll: Duration,
    pub forward_queue: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            quiet: Duration::from_millis(DEFAULT_QUIET_MS),
            poll: Duration::from_millis(DEFAULT_POLL_MS),
            forward_queue: DEFAULT_FORWARD_QUEUE,
        }
    }
}

impl WatchConfig {
    /// Load configuration from `wipman-daemon.toml` in the given root directory.
    ///
    /// Returns the defaults if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(file) => Self::from_file(file),
                Err(err) => {
                    tracing::warn!("failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!("failed to read {CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }

    fn from_file(file: ConfigFile) -> Self {
        let quiet_ms = file.quiet_ms.unwrap_or(DEFAULT_QUIET_MS).max(1);
        let mut poll_ms = file.poll_ms.unwrap_or(DEFAULT_POLL_MS).max(1);
        // The detector must tick at least once inside a quiet period.
        if poll_ms >= quiet_ms {
            let clamped = (quiet_ms / 2).max(1);
            tracing::warn!(
                "poll_ms ({poll_ms}) must be below quiet_ms ({quiet_ms}), using {clamped}"
            );
            poll_ms = clamped;
        }

        Self {
            quiet: Duration::from_millis(quiet_ms),
            poll: Duration::from_millis(poll_ms),
            forward_queue: file.forward_queue.unwrap_or(DEFAULT_FORWARD_QUEUE).max(1),
        }
    }
}
