use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::time::Instant;

/// Directory name whose own events are dropped outright; editors and the
/// synchronizer touch it constantly.
pub const NOISY_DIR_NAME: &str = "wipman";

/// Relevance of an operation kind. Higher wins when events on one path collide.
pub type Relevance = u8;

/// Closed vocabulary of filesystem operations the watcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    /// Read or open without any change.
    Access,
    /// Closed after a read-only open.
    CloseNoWrite,
    /// The kernel dropped its watch on the path.
    Ignored,
    /// Metadata (permissions, timestamps, ...) changed.
    Attrib,
    /// Closed after a writable open.
    CloseWrite,
    /// The watched path itself disappeared.
    DeleteSelf,
    Create,
    Modify,
    Delete,
}

impl OperationKind {
    /// Static relevance table. The directory flag never affects the rank.
    pub const fn relevance(self) -> Relevance {
        match self {
            Self::Access | Self::CloseNoWrite | Self::Ignored => 0,
            Self::Attrib | Self::CloseWrite => 1,
            Self::DeleteSelf => 2,
            Self::Create | Self::Modify | Self::Delete => 3,
        }
    }
}

/// One filesystem notification, stamped when the watcher received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub timestamp: Instant,
    pub kind: OperationKind,
    pub path: PathBuf,
    pub is_dir: bool,
}

impl RawEvent {
    pub fn new(timestamp: Instant, kind: OperationKind, path: impl Into<PathBuf>) -> Self {
        Self {
            timestamp,
            kind,
            path: path.into(),
            is_dir: false,
        }
    }

    pub fn dir(mut self) -> Self {
        self.is_dir = true;
        self
    }

    pub fn relevance(&self) -> Relevance {
        self.kind.relevance()
    }

    /// True for a creation of a directory, which must be expanded before the
    /// next event is handled.
    pub fn is_dir_creation(&self) -> bool {
        self.kind == OperationKind::Create && self.is_dir
    }
}

/// Serializable view of an event handed to the downstream synchronizer.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    pub kind: OperationKind,
    pub path: &'a Path,
    pub is_dir: bool,
}

impl<'a> From<&'a RawEvent> for EventRecord<'a> {
    fn from(event: &'a RawEvent) -> Self {
        Self {
            kind: event.kind,
            path: &event.path,
            is_dir: event.is_dir,
        }
    }
}

/// Returns true if events on `path` are noise that must never reach a burst.
pub fn is_noise(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == NOISY_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OperationKind; 9] = [
        OperationKind::Access,
        OperationKind::CloseNoWrite,
        OperationKind::Ignored,
        OperationKind::Attrib,
        OperationKind::CloseWrite,
        OperationKind::DeleteSelf,
        OperationKind::Create,
        OperationKind::Modify,
        OperationKind::Delete,
    ];

    #[test]
    fn test_relevance_table_tiers() {
        let ranks: Vec<Relevance> = ALL.iter().map(|k| k.relevance()).collect();
        assert_eq!(ranks, vec![0, 0, 0, 1, 1, 2, 3, 3, 3]);
    }

    #[test]
    fn test_directory_flag_keeps_rank() {
        let now = Instant::now();
        for kind in ALL {
            let file = RawEvent::new(now, kind, "/aa");
            let dir = file.clone().dir();
            assert_eq!(file.relevance(), dir.relevance(), "{kind:?}");
        }
    }

    #[test]
    fn test_noise_matches_final_component_only() {
        assert!(is_noise(Path::new("/home/me/wipman")));
        assert!(!is_noise(Path::new("/home/me/wipman/aa/task.md")));
        assert!(!is_noise(Path::new("/home/me/wipman-old")));
    }

    #[test]
    fn test_record_serializes_kind_in_upper_snake_case() {
        let event = RawEvent::new(Instant::now(), OperationKind::CloseWrite, "/aa/bb").dir();
        let json = serde_json::to_value(EventRecord::from(&event)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "CLOSE_WRITE", "path": "/aa/bb", "is_dir": true})
        );
    }
}
