use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::WatchError;

/// An entry found under a freshly created directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// The set of directories under the watch root that carry a watch.
///
/// Only the event intake mutates it, so it needs no locking of its own.
#[derive(Debug)]
pub struct PathInventory {
    paths: BTreeSet<PathBuf>,
}

impl PathInventory {
    /// Scan `root` recursively and collect every directory, `root` included.
    ///
    /// Hidden and gitignored directories are included: anything under the
    /// root may hold records, so nothing is filtered here.
    pub fn scan(root: &Path) -> Result<Self, WatchError> {
        let metadata = match std::fs::metadata(root) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(WatchError::RootNotFound(root.to_path_buf()));
            }
            Err(err) => return Err(WatchError::io(root, err)),
        };
        if !metadata.is_dir() {
            return Err(WatchError::RootNotADirectory(root.to_path_buf()));
        }

        let start = Instant::now();
        let mut paths = BTreeSet::new();
        paths.insert(root.to_path_buf());
        for entry in walk(root, None) {
            if entry.is_dir {
                paths.insert(entry.path);
            }
        }

        tracing::info!(
            root = %root.display(),
            directories = paths.len(),
            "scanned watch root in {:.2}s",
            start.elapsed().as_secs_f64()
        );

        Ok(Self { paths })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Add one directory. Returns `false` if it was already tracked.
    pub fn register(&mut self, path: &Path) -> bool {
        let added = self.paths.insert(path.to_path_buf());
        if added {
            tracing::debug!(path = %path.display(), "registered directory");
        }
        added
    }

    /// Remove `path` and every tracked directory beneath it.
    ///
    /// Returns the removed directories, deepest first.
    pub fn prune(&mut self, path: &Path) -> Vec<PathBuf> {
        let removed: Vec<PathBuf> = self
            .paths
            .range(path.to_path_buf()..)
            .take_while(|p| p.starts_with(path))
            .cloned()
            .collect();
        for p in &removed {
            self.paths.remove(p);
        }
        if !removed.is_empty() {
            tracing::debug!(path = %path.display(), pruned = removed.len(), "pruned directories");
        }
        removed.into_iter().rev().collect()
    }

    /// Forget a single directory whose watch could not be installed.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.paths.remove(path)
    }

    /// List the files and directories directly inside `dir`.
    ///
    /// One level only: callers install the watch on each subdirectory before
    /// listing it, so nothing created in between goes unseen.
    pub fn discover(dir: &Path) -> Vec<DiscoveredEntry> {
        walk(dir, Some(1))
    }
}

/// Walk `dir` without any ignore rules, skipping `dir` itself.
fn walk(dir: &Path, max_depth: Option<usize>) -> Vec<DiscoveredEntry> {
    let walker = ignore::WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .max_depth(max_depth)
        .build();

    let mut entries = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                // Entries vanishing mid-walk are expected while editors churn.
                tracing::warn!("{err}");
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }
        let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
        entries.push(DiscoveredEntry {
            path: entry.into_path(),
            is_dir,
        });
    }
    entries
}
