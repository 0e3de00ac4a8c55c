use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::watch;

use crate::types::QueueEntryView;

/// Receives the complete entry list of a queue after every change.
///
/// Called at least once per progress event and once per settlement, from
/// whichever task produced the change. Implementations must be cheap or do
/// their own coalescing; [`SnapshotSender`] does that for free.
///
/// Deliveries are serialized across the whole queue: while one call runs,
/// the progress callbacks of every other transfer wait for it, so a slow
/// observer stalls all transfers rather than only the one that reported.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, snapshot: &[QueueEntryView]);
}

impl<F> ProgressObserver for F
where
    F: Fn(&[QueueEntryView]) + Send + Sync,
{
    fn on_progress(&self, snapshot: &[QueueEntryView]) {
        self(snapshot)
    }
}

/// Observer that publishes each snapshot into a `watch` channel.
///
/// Receivers only ever see the latest snapshot, which makes this the
/// natural fit for a UI that redraws on its own tick.
#[derive(Debug)]
pub struct SnapshotSender(watch::Sender<Vec<QueueEntryView>>);

impl ProgressObserver for SnapshotSender {
    fn on_progress(&self, snapshot: &[QueueEntryView]) {
        // send_replace keeps working after every receiver is gone.
        self.0.send_replace(snapshot.to_vec());
    }
}

/// Creates a snapshot channel starting from an empty entry list.
pub fn snapshot_channel() -> (SnapshotSender, watch::Receiver<Vec<QueueEntryView>>) {
    let (tx, rx) = watch::channel(Vec::new());
    (SnapshotSender(tx), rx)
}

/// Serializes observer calls and drops snapshots older than the last one
/// delivered, so the final delivery always reflects the final state.
pub(crate) struct Notifier {
    observer: Option<Arc<dyn ProgressObserver>>,
    delivered: Mutex<u64>,
}

impl Notifier {
    pub(crate) fn new(observer: Option<Arc<dyn ProgressObserver>>) -> Self {
        Self {
            observer,
            delivered: Mutex::new(0),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.observer.is_some()
    }

    /// Delivers `snapshot` tagged with sequence number `seq`.
    ///
    /// Returns `false` if the snapshot was stale and skipped.
    pub(crate) fn deliver(&self, seq: u64, snapshot: &[QueueEntryView]) -> bool {
        let Some(observer) = &self.observer else {
            return false;
        };
        let mut last = self.delivered.lock().unwrap_or_else(PoisonError::into_inner);
        if seq <= *last {
            return false;
        }
        *last = seq;
        observer.on_progress(snapshot);
        true
    }
}

/// Aggregate progress over every entry of a queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub files: usize,
    pub finished: usize,
    pub failed: usize,
    pub bytes_loaded: u64,
    pub bytes_total: u64,
}

impl ProgressSummary {
    pub fn from_entries(entries: &[QueueEntryView]) -> Self {
        entries.iter().fold(Self::default(), |mut acc, e| {
            acc.files += 1;
            acc.finished += usize::from(e.finished);
            acc.failed += usize::from(e.failed);
            acc.bytes_loaded += e.bytes_loaded;
            acc.bytes_total += e.bytes_total;
            acc
        })
    }

    /// Returns the overall progress as a percentage (0-100).
    pub fn percentage(&self) -> f64 {
        if self.bytes_total == 0 {
            return if self.files > 0 && self.is_settled() {
                100.0
            } else {
                0.0
            };
        }
        self.bytes_loaded as f64 / self.bytes_total as f64 * 100.0
    }

    /// True when every entry has settled.
    pub fn is_settled(&self) -> bool {
        self.finished == self.files
    }

    pub fn succeeded(&self) -> usize {
        self.finished - self.failed
    }
}
