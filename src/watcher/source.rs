use std::path::{Path, PathBuf};

use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::event::{OperationKind, RawEvent};
use crate::error::WatchError;

/// What the OS backend delivers for every notification.
pub type Notification = notify::Result<notify::Event>;

/// Per-directory watch registration.
pub trait WatchSet {
    fn watch(&mut self, path: &Path) -> Result<(), WatchError>;
    fn unwatch(&mut self, path: &Path);
}

/// Watch set backed by the platform's native notification mechanism, with
/// one non-recursive watch per directory.
pub struct NotifyWatchSet {
    watcher: RecommendedWatcher,
}

impl NotifyWatchSet {
    /// Create the backend and the channel its notifications arrive on.
    ///
    /// The backend thread blocks when the channel is full rather than dropping
    /// notifications.
    pub fn new(capacity: usize) -> Result<(Self, mpsc::Receiver<Notification>), WatchError> {
        let (tx, rx) = mpsc::channel::<Notification>(capacity);
        let watcher = notify::recommended_watcher(move |res| {
            // Fails only once the receiver is dropped during shutdown.
            let _ = tx.blocking_send(res);
        })
        .map_err(WatchError::Backend)?;
        Ok((Self { watcher }, rx))
    }
}

impl WatchSet for NotifyWatchSet {
    fn watch(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Watch {
                path: path.to_path_buf(),
                source,
            })
    }

    fn unwatch(&mut self, path: &Path) {
        // The kernel usually drops the watch of a deleted directory on its own.
        if let Err(err) = self.watcher.unwatch(path) {
            tracing::debug!(path = %path.display(), "unwatch: {err}");
        }
    }
}

/// Translate one backend notification into raw events stamped with `now`.
///
/// `is_watched` tells whether a path is a directory that carries its own
/// watch, which is how a self-deletion is told apart from a plain removal.
/// Kinds outside the vocabulary yield an `UnknownOperationKind` error per path.
pub fn classify(
    event: &notify::Event,
    now: Instant,
    is_watched: impl Fn(&Path) -> bool,
) -> Vec<Result<RawEvent, WatchError>> {
    let unknown = |path: &PathBuf| -> Result<RawEvent, WatchError> {
        Err(WatchError::UnknownOperationKind {
            kind: format!("{:?}", event.kind),
            path: path.clone(),
        })
    };
    let raw = |kind: OperationKind, path: &PathBuf, is_dir: bool| -> Result<RawEvent, WatchError> {
        Ok(RawEvent {
            timestamp: now,
            kind,
            path: path.clone(),
            is_dir,
        })
    };

    // Renames carrying both ends are split into a deletion and a creation.
    // The object now lives at `to`, so that is where its type is read.
    if let EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = event.kind {
        return match event.paths.as_slice() {
            [from, to] => {
                let is_dir = to.is_dir() || is_watched(from.as_path());
                vec![
                    raw(OperationKind::Delete, from, is_dir),
                    raw(OperationKind::Create, to, is_dir),
                ]
            }
            paths => paths.iter().map(unknown).collect(),
        };
    }

    event
        .paths
        .iter()
        .map(|path| {
            let (kind, is_dir) = match event.kind {
                EventKind::Access(access) => match access {
                    AccessKind::Any | AccessKind::Read | AccessKind::Open(_) => {
                        (OperationKind::Access, path.is_dir())
                    }
                    AccessKind::Close(AccessMode::Write) => (OperationKind::CloseWrite, false),
                    AccessKind::Close(_) => (OperationKind::CloseNoWrite, path.is_dir()),
                    AccessKind::Other => return unknown(path),
                },
                EventKind::Create(create) => match create {
                    CreateKind::Folder => (OperationKind::Create, true),
                    CreateKind::File => (OperationKind::Create, false),
                    CreateKind::Any | CreateKind::Other => (OperationKind::Create, path.is_dir()),
                },
                EventKind::Modify(modify) => match modify {
                    ModifyKind::Any | ModifyKind::Data(_) => (OperationKind::Modify, path.is_dir()),
                    ModifyKind::Metadata(_) => (OperationKind::Attrib, path.is_dir()),
                    ModifyKind::Name(RenameMode::From) => (OperationKind::Delete, is_watched(path.as_path())),
                    ModifyKind::Name(RenameMode::To) => (OperationKind::Create, path.is_dir()),
                    ModifyKind::Name(_) | ModifyKind::Other => return unknown(path),
                },
                EventKind::Remove(remove) => {
                    let watched = is_watched(path.as_path());
                    let kind = if watched {
                        OperationKind::DeleteSelf
                    } else {
                        OperationKind::Delete
                    };
                    let is_dir = match remove {
                        RemoveKind::Folder => true,
                        RemoveKind::File => false,
                        RemoveKind::Any | RemoveKind::Other => watched,
                    };
                    (kind, is_dir)
                }
                EventKind::Any | EventKind::Other => return unknown(path),
            };
            raw(kind, path, is_dir)
        })
        .collect()
}
