use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio::time::{Instant, MissedTickBehavior};

use super::event::RawEvent;
use super::reduce::keep_most_relevant;

/// Events observed since the last flush plus the instant the burst closes.
///
/// `IDLE` is an empty buffer with no deadline; any append moves it to
/// `ACCUMULATING` until a flush drains it.
#[derive(Debug, Default)]
pub struct Burst {
    events: Vec<RawEvent>,
    deadline: Option<Instant>,
}

impl Burst {
    /// Buffer `event` and restart the countdown from its timestamp.
    pub fn append(&mut self, event: RawEvent, quiet: Duration) {
        self.deadline = Some(event.timestamp + quiet);
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True once the quiet period after the last event has fully elapsed.
    pub fn is_due(&self, now: Instant) -> bool {
        !self.events.is_empty() && self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Drain the burst if it is due, leaving it idle. Returns nothing otherwise.
    pub fn take_if_due(&mut self, now: Instant) -> Option<Vec<RawEvent>> {
        if !self.is_due(now) {
            return None;
        }
        self.deadline = None;
        Some(std::mem::take(&mut self.events))
    }
}

/// The burst shared by the intake, the detector and the flush task.
///
/// The lock is held across a single append or a single drain, never across
/// an await point.
#[derive(Debug, Clone, Default)]
pub struct SharedBurst(Arc<Mutex<Burst>>);

impl SharedBurst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, Burst> {
        // A panic while holding the guard leaves a Vec and an Option behind,
        // both still valid.
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    pub fn append(&self, event: RawEvent, quiet: Duration) {
        self.lock().append(event, quiet);
    }

    /// Append several events under one lock so a flush sees all or none.
    pub fn extend(&self, events: Vec<RawEvent>, quiet: Duration) {
        let mut burst = self.lock();
        for event in events {
            burst.append(event, quiet);
        }
    }
}

/// Poll the burst deadline and raise `completed` once it has passed.
pub async fn detect_quiet(burst: SharedBurst, completed: Arc<Notify>, poll: Duration) {
    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let due = burst.lock().is_due(Instant::now());
        if due {
            completed.notify_one();
        }
    }
}

/// Wait for completed bursts, reduce them and queue the result for the
/// forwarder. Returns when the forwarder side is gone.
pub async fn flush_bursts(
    burst: SharedBurst,
    completed: Arc<Notify>,
    batches: mpsc::Sender<Vec<RawEvent>>,
) {
    loop {
        completed.notified().await;

        // An event may have landed between the signal and this point, pushing
        // the deadline forward; the burst then stays open.
        let drained = burst.lock().take_if_due(Instant::now());
        let Some(events) = drained else {
            continue;
        };

        let received = events.len();
        let reduced = keep_most_relevant(events);
        tracing::info!(received, reduced = reduced.len(), "burst complete");

        if batches.send(reduced).await.is_err() {
            tracing::debug!("forwarder gone, stopping flush task");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::event::OperationKind;

    const QUIET: Duration = Duration::from_millis(1_000);
    const POLL: Duration = Duration::from_millis(200);

    fn event(kind: OperationKind, path: &str) -> RawEvent {
        RawEvent::new(Instant::now(), kind, path)
    }

    fn spawn_pipeline(burst: &SharedBurst) -> mpsc::Receiver<Vec<RawEvent>> {
        let completed = Arc::new(Notify::new());
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(detect_quiet(burst.clone(), completed.clone(), POLL));
        tokio::spawn(flush_bursts(burst.clone(), completed, tx));
        rx
    }

    #[tokio::test(start_paused = true)]
    async fn test_append_overwrites_deadline() {
        let mut burst = Burst::default();
        let first = event(OperationKind::Create, "/aa");
        let t0 = first.timestamp;
        burst.append(first, QUIET);
        assert_eq!(burst.deadline(), Some(t0 + QUIET));

        tokio::time::advance(Duration::from_millis(300)).await;
        let second = event(OperationKind::Modify, "/aa");
        let t1 = second.timestamp;
        burst.append(second, QUIET);
        assert_eq!(burst.deadline(), Some(t1 + QUIET));
        assert_eq!(burst.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_if_due_respects_deadline() {
        let mut burst = Burst::default();
        let now = Instant::now();
        assert!(!burst.is_due(now), "an idle burst is never due");

        burst.append(event(OperationKind::Create, "/aa"), QUIET);
        assert!(burst.take_if_due(now + QUIET - Duration::from_millis(1)).is_none());

        let drained = burst.take_if_due(now + QUIET).expect("burst is due");
        assert_eq!(drained.len(), 1);
        assert!(burst.is_empty());
        assert_eq!(burst.deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_waits_for_quiet_period() {
        let burst = SharedBurst::new();
        let mut rx = spawn_pipeline(&burst);

        let last = event(OperationKind::Create, "/aa");
        let t = last.timestamp;
        burst.append(last, QUIET);

        let batch = rx.recv().await.expect("batch");
        let elapsed = Instant::now() - t;
        assert!(elapsed >= QUIET, "flushed after {elapsed:?}");
        assert!(elapsed <= QUIET + POLL, "flushed after {elapsed:?}");
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_event_restarts_countdown() {
        let burst = SharedBurst::new();
        let mut rx = spawn_pipeline(&burst);

        burst.append(event(OperationKind::Create, "/aa"), QUIET);
        tokio::time::sleep(Duration::from_millis(700)).await;
        let last = event(OperationKind::CloseWrite, "/aa");
        let t = last.timestamp;
        burst.append(last, QUIET);

        let batch = rx.recv().await.expect("batch");
        let elapsed = Instant::now() - t;
        assert!(elapsed >= QUIET, "flushed {elapsed:?} after the last event");
        assert!(elapsed <= QUIET + POLL, "flushed {elapsed:?} after the last event");
        assert_eq!(batch.len(), 1, "both events collapse into one");
        assert_eq!(batch[0].kind, OperationKind::Create);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_are_flushed_separately() {
        let burst = SharedBurst::new();
        let mut rx = spawn_pipeline(&burst);

        burst.append(event(OperationKind::Create, "/aa"), QUIET);
        let first = rx.recv().await.expect("first batch");

        burst.append(event(OperationKind::Delete, "/aa"), QUIET);
        let second = rx.recv().await.expect("second batch");

        assert_eq!(first[0].kind, OperationKind::Create);
        assert_eq!(second[0].kind, OperationKind::Delete);
        assert!(burst.lock().is_empty());
    }
}
