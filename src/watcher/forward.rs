use std::io::Write;

use serde::Serialize;
use tokio::sync::mpsc;

use super::event::{EventRecord, RawEvent};

/// Downstream synchronizer receiving one reduced batch per completed burst.
///
/// Retries and error reporting are up to the implementation.
pub trait Forward: Send + 'static {
    fn forward(&mut self, batch: &[RawEvent]);
}

/// Logs every reduced event.
#[derive(Debug, Default)]
pub struct LogForwarder;

impl Forward for LogForwarder {
    fn forward(&mut self, batch: &[RawEvent]) {
        for event in batch {
            let kind = format!("{:?}", event.kind);
            tracing::info!(dir = event.is_dir, ">>> {kind:<15} {}", event.path.display());
        }
    }
}

#[derive(Serialize)]
struct BatchRecord<'a> {
    events: Vec<EventRecord<'a>>,
}

/// Writes each batch as one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesForwarder<W> {
    out: W,
}

impl<W: Write> JsonLinesForwarder<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_batch(&mut self, batch: &[RawEvent]) -> std::io::Result<()> {
        let record = BatchRecord {
            events: batch.iter().map(EventRecord::from).collect(),
        };
        serde_json::to_writer(&mut self.out, &record)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

impl<W: Write + Send + 'static> Forward for JsonLinesForwarder<W> {
    fn forward(&mut self, batch: &[RawEvent]) {
        if let Err(err) = self.write_batch(batch) {
            tracing::error!("failed to write batch of {} events: {err}", batch.len());
        }
    }
}

/// Forwarding task: hand queued batches to `forwarder` in order until every
/// sender is gone.
pub async fn forward_batches<F: Forward>(
    mut forwarder: F,
    mut batches: mpsc::Receiver<Vec<RawEvent>>,
) -> F {
    while let Some(batch) = batches.recv().await {
        forwarder.forward(&batch);
    }
    forwarder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::event::OperationKind;
    use tokio::time::Instant;

    #[test]
    fn test_json_lines_one_object_per_batch() {
        let now = Instant::now();
        let mut forwarder = JsonLinesForwarder::new(Vec::new());

        forwarder.forward(&[
            RawEvent::new(now, OperationKind::Delete, "/w/aa").dir(),
            RawEvent::new(now, OperationKind::Create, "/w/bb/task.md"),
        ]);
        forwarder.forward(&[]);

        let out = String::from_utf8(forwarder.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).expect("valid JSON line"))
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            serde_json::json!({"events": [
                {"kind": "DELETE", "path": "/w/aa", "is_dir": true},
                {"kind": "CREATE", "path": "/w/bb/task.md", "is_dir": false},
            ]})
        );
        assert_eq!(lines[1], serde_json::json!({"events": []}));
    }

    #[derive(Default)]
    struct Recorder(Vec<usize>);

    impl Forward for Recorder {
        fn forward(&mut self, batch: &[RawEvent]) {
            self.0.push(batch.len());
        }
    }

    #[tokio::test]
    async fn test_forward_batches_drains_queue_in_order() {
        let now = Instant::now();
        let (tx, rx) = mpsc::channel(4);
        tx.send(vec![RawEvent::new(now, OperationKind::Modify, "/w/a")])
            .await
            .unwrap();
        tx.send(Vec::new()).await.unwrap();
        tx.send(vec![
            RawEvent::new(now, OperationKind::Create, "/w/b"),
            RawEvent::new(now, OperationKind::Create, "/w/c"),
        ])
        .await
        .unwrap();
        drop(tx);

        let recorder = forward_batches(Recorder::default(), rx).await;
        assert_eq!(recorder.0, vec![1, 0, 2]);
    }
}
