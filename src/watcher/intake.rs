use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use super::burst::SharedBurst;
use super::event::{OperationKind, RawEvent, is_noise};
use super::source::{Notification, WatchSet, classify};
use crate::inventory::PathInventory;

/// Turns backend notifications into raw events while keeping the inventory
/// and the installed watches in step with the tree.
///
/// Sole writer of the inventory.
pub struct Intake<W> {
    inventory: PathInventory,
    watches: W,
    /// Directories pruned while the current burst is open. Late notifications
    /// for them must still be flagged as directories.
    departed: HashSet<PathBuf>,
}

impl<W: WatchSet> Intake<W> {
    /// Install a watch for every scanned directory.
    ///
    /// A directory whose watch cannot be installed (typically because it
    /// vanished since the scan) is logged and left out.
    pub fn install(mut inventory: PathInventory, mut watches: W) -> Self {
        let failed: Vec<PathBuf> = inventory
            .iter()
            .filter_map(|path| match watches.watch(path) {
                Ok(()) => None,
                Err(err) => {
                    tracing::warn!("{err}, skipping");
                    Some(path.to_path_buf())
                }
            })
            .collect();
        for path in &failed {
            inventory.remove(path);
        }

        tracing::info!(watched = inventory.len(), "watches installed");
        Self {
            inventory,
            watches,
            departed: HashSet::new(),
        }
    }

    pub fn inventory(&self) -> &PathInventory {
        &self.inventory
    }

    /// Handle one notification and return the raw events it stands for.
    ///
    /// A directory creation is fully expanded, with watches installed and
    /// creations synthesized for everything already inside it, before this
    /// returns. A removed directory is pruned from the inventory.
    pub fn ingest(&mut self, notification: &notify::Event, now: Instant) -> Vec<RawEvent> {
        let classified = classify(notification, now, |path| self.inventory.contains(path));

        let mut events = Vec::new();
        for result in classified {
            let mut event = match result {
                Ok(event) => event,
                Err(err) => {
                    tracing::error!("{err}, dropping event");
                    continue;
                }
            };
            if is_noise(&event.path) {
                if matches!(event.kind, OperationKind::Delete | OperationKind::DeleteSelf) {
                    self.forget(&event.path);
                }
                continue;
            }

            match event.kind {
                _ if event.is_dir_creation() => {
                    let (dir, timestamp) = (event.path.clone(), event.timestamp);
                    self.departed.remove(&dir);
                    events.push(event);
                    self.expand(&dir, timestamp, &mut events);
                }
                OperationKind::Delete | OperationKind::DeleteSelf => {
                    if self.departed.contains(&event.path) {
                        event.is_dir = true;
                    }
                    self.forget(&event.path);
                    events.push(event);
                }
                _ => events.push(event),
            }
        }
        events
    }

    /// Prune `path` and its subtree, dropping their watches.
    fn forget(&mut self, path: &Path) {
        for dir in self.inventory.prune(path) {
            self.watches.unwatch(&dir);
            self.departed.insert(dir);
        }
    }

    /// True once every watched directory, the root included, is gone.
    pub fn is_exhausted(&self) -> bool {
        self.inventory.is_empty()
    }

    /// Drop the record of pruned directories once their burst was flushed.
    pub fn forget_departed(&mut self) {
        self.departed.clear();
    }

    /// Watch `dir`, then list it and recurse into its subdirectories.
    fn expand(&mut self, dir: &Path, timestamp: Instant, events: &mut Vec<RawEvent>) {
        if self.inventory.contains(dir) {
            return;
        }
        if let Err(err) = self.watches.watch(dir) {
            tracing::warn!("{err}, skipping");
            return;
        }
        self.inventory.register(dir);

        for child in PathInventory::discover(dir) {
            if is_noise(&child.path) {
                continue;
            }
            let mut created = RawEvent::new(timestamp, OperationKind::Create, child.path.clone());
            created.is_dir = child.is_dir;
            events.push(created);
            if child.is_dir {
                self.expand(&child.path, timestamp, events);
            }
        }
    }
}

/// Event-consumption task: feed every notification through the intake and
/// into the open burst. Returns when the backend channel closes.
pub async fn consume<W: WatchSet>(
    mut intake: Intake<W>,
    mut notifications: mpsc::Receiver<Notification>,
    burst: SharedBurst,
    quiet: Duration,
) {
    while let Some(notification) = notifications.recv().await {
        let event = match notification {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!("watcher error: {err}");
                continue;
            }
        };

        let idle = burst.lock().is_empty();
        if idle {
            intake.forget_departed();
        }

        let events = intake.ingest(&event, Instant::now());
        if !events.is_empty() {
            for event in &events {
                tracing::debug!(kind = ?event.kind, dir = event.is_dir, "<-- {}", event.path.display());
            }
            burst.extend(events, quiet);
        }

        if intake.is_exhausted() {
            tracing::error!("watch root is gone, no directories left to watch");
            return;
        }
    }
    tracing::debug!("notification channel closed");
}
