pub mod burst;
pub mod event;
pub mod forward;
pub mod intake;
pub mod reduce;
pub mod source;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Notify, mpsc};
use tokio::task::{JoinError, JoinHandle};

use crate::config::WatchConfig;
use crate::error::WatchError;
use crate::inventory::PathInventory;
use burst::SharedBurst;
use forward::Forward;
use intake::Intake;
use source::NotifyWatchSet;

/// Capacity of the channel between the OS backend thread and the intake.
const NOTIFICATION_CAPACITY: usize = 256;

/// Handle to a running watcher. Dropping it detaches the tasks; call
/// [`WatcherHandle::shutdown`] to stop them.
pub struct WatcherHandle<F> {
    burst: SharedBurst,
    intake: JoinHandle<()>,
    detector: JoinHandle<()>,
    flusher: JoinHandle<()>,
    forwarder: JoinHandle<F>,
}

/// Scan `root`, install its watches and start the watcher tasks.
///
/// Must be called from within a tokio runtime. Watches are installed for the
/// whole scanned tree before the intake starts consuming, so nothing that
/// happens after the scan is missed.
pub fn spawn<F: Forward>(
    root: &Path,
    config: &WatchConfig,
    forwarder: F,
) -> Result<WatcherHandle<F>, WatchError> {
    let inventory = PathInventory::scan(root)?;
    let (watches, notifications) = NotifyWatchSet::new(NOTIFICATION_CAPACITY)?;
    let intake = Intake::install(inventory, watches);

    let burst = SharedBurst::new();
    let completed = Arc::new(Notify::new());
    let (batch_tx, batch_rx) = mpsc::channel(config.forward_queue);

    let forwarder = tokio::spawn(forward::forward_batches(forwarder, batch_rx));
    let flusher = tokio::spawn(burst::flush_bursts(
        burst.clone(),
        completed.clone(),
        batch_tx,
    ));
    let detector = tokio::spawn(burst::detect_quiet(
        burst.clone(),
        completed,
        config.poll,
    ));
    let consumer = tokio::spawn(intake::consume(
        intake,
        notifications,
        burst.clone(),
        config.quiet,
    ));

    Ok(WatcherHandle {
        burst,
        intake: consumer,
        detector,
        flusher,
        forwarder,
    })
}

impl<F: Forward> WatcherHandle<F> {
    /// Stop watching and give the forwarder back.
    ///
    /// The open burst is discarded; batches that were already reduced are
    /// still handed to the forwarder first.
    pub async fn shutdown(self) -> Result<F, JoinError> {
        self.intake.abort();
        self.detector.abort();
        self.flusher.abort();

        // Cancelled tasks report a JoinError; all that matters is that they
        // have released the backend and the batch sender.
        let _ = self.intake.await;
        let _ = self.detector.await;
        let _ = self.flusher.await;

        let discarded = self.burst.lock().len();
        if discarded > 0 {
            tracing::info!(discarded, "dropped events of the unfinished burst");
        }

        self.forwarder.await
    }
}

/// Watch `root` until the process is interrupted.
pub async fn start<F: Forward>(
    root: &Path,
    config: &WatchConfig,
    forwarder: F,
) -> Result<(), WatchError> {
    let handle = spawn(root, config, forwarder)?;
    tracing::info!(
        root = %root.display(),
        quiet_ms = config.quiet.as_millis() as u64,
        poll_ms = config.poll.as_millis() as u64,
        "watching"
    );

    let interrupted = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
    if let Err(err) = handle.shutdown().await {
        tracing::error!("forwarder task failed: {err}");
    }
    interrupted.map_err(WatchError::Signal)
}
