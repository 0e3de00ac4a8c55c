//! Upload queue: one concurrent transfer per file, full-snapshot progress.
//!
//! Entries live in a name-keyed map behind a lock that is never held across
//! an `.await`. Every mutation bumps a sequence number and produces an owned
//! snapshot, which is delivered to the observer after the lock is released.

use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::TransferError;
use crate::client::{ProgressFn, TransferClient};
use crate::progress::{Notifier, ProgressObserver, ProgressSummary};
use crate::types::{DestinationLayout, FileHandle, QueueEntry, QueueEntryView, TransferReceipt};
use crate::validation::validate_item_name;

/// Batch-level failure of [`UploadQueue::add_files`].
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// At least one file failed. Every sibling still ran to completion;
    /// `name`/`source` describe the first failure in submission order.
    #[error("{failed} of {total} uploads failed; first failure: {name}: {source}")]
    Batch {
        name: String,
        source: TransferError,
        failed: usize,
        total: usize,
    },
}

impl QueueError {
    /// Name of the first failed file.
    pub fn first_failed(&self) -> &str {
        match self {
            Self::Batch { name, .. } => name,
        }
    }
}

/// Outcome of one successful file upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub name: String,
    pub destination: String,
    pub receipt: TransferReceipt,
}

struct Slot {
    entry: QueueEntry,
    /// Cancels the entry's in-flight transfer; cleared on settlement.
    cancel: Option<CancellationToken>,
}

#[derive(Default)]
struct QueueState {
    entries: BTreeMap<String, Slot>,
    next_generation: u64,
    seq: u64,
}

impl QueueState {
    fn views(&self) -> Vec<QueueEntryView> {
        self.entries.values().map(|slot| slot.entry.view()).collect()
    }

    /// Returns the live entry for `name` if it still belongs to `generation`.
    fn current(&mut self, name: &str, generation: u64) -> Option<&mut Slot> {
        self.entries
            .get_mut(name)
            .filter(|slot| slot.entry.generation() == generation)
    }
}

/// State shared between the queue handle and its transfer tasks.
struct Shared {
    state: RwLock<QueueState>,
    notifier: Notifier,
}

impl Shared {
    /// Applies `f` under the write lock. If it reports a change, bumps the
    /// sequence number and delivers a fresh snapshot once the lock is gone.
    fn mutate<R>(&self, f: impl FnOnce(&mut QueueState) -> Option<R>) -> Option<R> {
        let (result, pending) = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let result = f(&mut state)?;
            state.seq += 1;
            let pending = self
                .notifier
                .is_active()
                .then(|| (state.seq, state.views()));
            (result, pending)
        };

        if let Some((seq, snapshot)) = pending {
            self.notifier.deliver(seq, &snapshot);
        }
        Some(result)
    }

    fn read<R>(&self, f: impl FnOnce(&QueueState) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn record_progress(&self, name: &str, generation: u64, loaded: u64, total: Option<u64>) {
        let body_sent = self.mutate(|state| {
            let slot = state.current(name, generation)?;
            let before = slot.entry.bytes_loaded();
            slot.entry.record_progress(loaded, total).then(|| {
                let entry = &slot.entry;
                entry.bytes_total() > 0
                    && before < entry.bytes_total()
                    && entry.bytes_loaded() == entry.bytes_total()
            })
        });

        if body_sent == Some(true) {
            debug!(file = %name, bytes = loaded, "upload body sent, awaiting server");
        }
    }

    fn settle(&self, name: &str, generation: u64, outcome: Result<(), &TransferError>) {
        let applied = self.mutate(|state| {
            let slot = state.current(name, generation)?;
            slot.cancel = None;
            let changed = match outcome {
                Ok(()) => slot.entry.succeed(),
                Err(e) => slot.entry.fail(e.user_message()),
            };
            changed.then_some(slot.entry.bytes_total())
        });

        match (applied, outcome) {
            (Some(bytes), Ok(())) => info!(file = %name, bytes, "upload completed"),
            (Some(_), Err(e)) => warn!(file = %name, error = %e, "upload failed"),
            (None, _) => debug!(file = %name, generation, "ignoring settlement of replaced entry"),
        }
    }
}

/// A transfer registered by `add_files` and about to be spawned.
struct Launch {
    file: FileHandle,
    destination: String,
    generation: u64,
    cancel: CancellationToken,
}

/// Settles the launches of a batch whose `add_files` future was dropped
/// before every transfer finished.
///
/// Dropping the future aborts its `JoinSet`; the aborted tasks never reach
/// their own settlement.
struct BatchGuard {
    shared: Arc<Shared>,
    launches: Vec<(String, u64, CancellationToken)>,
    armed: bool,
}

impl BatchGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let cancelled = TransferError::Cancelled;
        for (name, generation, cancel) in &self.launches {
            cancel.cancel();
            let pending = self.shared.read(|state| {
                state.entries.get(name).is_some_and(|slot| {
                    slot.entry.generation() == *generation && !slot.entry.finished()
                })
            });
            if pending {
                self.shared.settle(name, *generation, Err(&cancelled));
            }
        }
        warn!(files = self.launches.len(), "upload batch dropped before settling");
    }
}

/// Coordinates concurrent uploads of a batch of files into one destination.
///
/// Cheap to create: a UI typically builds one per destination and upload
/// session. The transfer client is injected and may be shared freely.
pub struct UploadQueue {
    prefix: String,
    layout: DestinationLayout,
    client: Arc<dyn TransferClient>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl UploadQueue {
    /// Creates a queue uploading into `prefix` (e.g. `/shares/holiday`).
    ///
    /// `observer`, when set, receives the complete entry list after every
    /// change.
    pub fn new(
        client: Arc<dyn TransferClient>,
        prefix: impl Into<String>,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            layout: DestinationLayout::default(),
            client,
            shared: Arc::new(Shared {
                state: RwLock::new(QueueState::default()),
                notifier: Notifier::new(observer),
            }),
            cancel: CancellationToken::new(),
        }
    }

    /// Sets how item names are appended to the prefix.
    pub fn with_layout(mut self, layout: DestinationLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Derives the queue's cancellation from `parent`.
    pub fn with_parent_cancel(mut self, parent: &CancellationToken) -> Self {
        self.cancel = parent.child_token();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn layout(&self) -> DestinationLayout {
        self.layout
    }

    /// Destination path a file named `name` is uploaded to.
    pub fn destination_for(&self, name: &str) -> String {
        self.layout.resolve(&self.prefix, name)
    }

    /// Returns a token that cancels every in-flight transfer of this queue.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels the in-flight transfer of `name`.
    ///
    /// Returns `false` if no such transfer is running. The entry settles as
    /// failed with an "upload cancelled" message.
    pub fn cancel(&self, name: &str) -> bool {
        self.shared.read(|state| {
            match state.entries.get(name).and_then(|slot| slot.cancel.as_ref()) {
                Some(token) => {
                    token.cancel();
                    true
                }
                None => false,
            }
        })
    }

    /// Uploads a single file. See [`add_files`](Self::add_files).
    pub async fn add_file(&self, file: FileHandle) -> Result<UploadReceipt, QueueError> {
        let mut receipts = self.add_files([file]).await?;
        Ok(receipts.remove(0))
    }

    /// Adds `files` to the queue and uploads them concurrently.
    ///
    /// Each file gets a fresh pending entry, replacing any entry with the
    /// same name. Only the entries created by this call are launched; a
    /// replaced transfer that is still running is not cancelled, but its
    /// later callbacks no longer touch the map.
    ///
    /// Resolves once every transfer launched here has settled: `Ok` with one
    /// receipt per file in submission order, or [`QueueError::Batch`] if any
    /// failed. An empty input resolves immediately with no receipts.
    ///
    /// Dropping the returned future before it resolves cancels the transfers
    /// still running and settles their entries as failed with
    /// [`TransferError::Cancelled`].
    pub async fn add_files<I>(&self, files: I) -> Result<Vec<UploadReceipt>, QueueError>
    where
        I: IntoIterator<Item = FileHandle>,
    {
        let mut batch: Vec<FileHandle> = Vec::new();
        for file in files {
            // Last handle wins for duplicate names within one call.
            match batch.iter_mut().find(|f| f.name() == file.name()) {
                Some(existing) => *existing = file,
                None => batch.push(file),
            }
        }
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let launches = self.register(batch);
        let total = launches.len();
        let names: Vec<(String, u64)> = launches
            .iter()
            .map(|l| (l.file.name().to_string(), l.generation))
            .collect();

        debug!(prefix = %self.prefix, files = total, "starting upload batch");

        // Declared before the JoinSet so the tasks are aborted first on drop.
        let mut guard = BatchGuard {
            shared: Arc::clone(&self.shared),
            launches: launches
                .iter()
                .map(|l| (l.file.name().to_string(), l.generation, l.cancel.clone()))
                .collect(),
            armed: true,
        };

        let mut tasks = JoinSet::new();
        for (index, launch) in launches.into_iter().enumerate() {
            let shared = Arc::clone(&self.shared);
            let client = Arc::clone(&self.client);
            tasks.spawn(async move {
                let destination = launch.destination.clone();
                let outcome = run_transfer(shared, client, launch).await;
                (index, destination, outcome)
            });
        }

        let mut outcomes: Vec<Option<(String, Result<TransferReceipt, TransferError>)>> =
            (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, destination, outcome)) => outcomes[index] = Some((destination, outcome)),
                Err(e) => error!(error = %e, "upload task did not complete"),
            }
        }
        guard.disarm();

        let mut receipts = Vec::with_capacity(total);
        let mut first_failure: Option<(String, TransferError)> = None;
        let mut failed = 0;

        for ((name, generation), outcome) in names.into_iter().zip(outcomes) {
            let (destination, result) = match outcome {
                Some(done) => done,
                None => {
                    let err = TransferError::Aborted("upload task did not complete".into());
                    self.shared.settle(&name, generation, Err(&err));
                    (self.destination_for(&name), Err(err))
                }
            };

            match result {
                Ok(receipt) => receipts.push(UploadReceipt {
                    name,
                    destination,
                    receipt,
                }),
                Err(e) => {
                    failed += 1;
                    if first_failure.is_none() {
                        first_failure = Some((name, e));
                    }
                }
            }
        }

        match first_failure {
            None => {
                info!(prefix = %self.prefix, files = total, "upload batch completed");
                Ok(receipts)
            }
            Some((name, source)) => {
                error!(prefix = %self.prefix, failed, total, "upload batch failed");
                Err(QueueError::Batch {
                    name,
                    source,
                    failed,
                    total,
                })
            }
        }
    }

    /// Inserts one pending entry per file and prepares their launches.
    fn register(&self, files: Vec<FileHandle>) -> Vec<Launch> {
        self.shared
            .mutate(|state| {
                let mut launches = Vec::with_capacity(files.len());
                for file in files {
                    state.next_generation += 1;
                    let generation = state.next_generation;
                    let cancel = self.cancel.child_token();
                    let name = file.name().to_string();

                    let replaced = state.entries.insert(
                        name.clone(),
                        Slot {
                            entry: QueueEntry::new(file.clone(), generation),
                            cancel: Some(cancel.clone()),
                        },
                    );
                    if let Some(old) = replaced
                        && !old.entry.finished()
                    {
                        warn!(file = %name, "replacing an in-flight entry; its transfer keeps running");
                    }

                    launches.push(Launch {
                        destination: self.destination_for(&name),
                        file,
                        generation,
                        cancel,
                    });
                }
                Some(launches)
            })
            .unwrap_or_default()
    }

    /// Complete list of entries, ordered by name.
    pub fn snapshot(&self) -> Vec<QueueEntryView> {
        self.shared.read(QueueState::views)
    }

    /// Current view of one entry.
    pub fn get(&self, name: &str) -> Option<QueueEntryView> {
        self.shared
            .read(|state| state.entries.get(name).map(|slot| slot.entry.view()))
    }

    /// Aggregate progress across every entry.
    pub fn progress_summary(&self) -> ProgressSummary {
        ProgressSummary::from_entries(&self.snapshot())
    }

    pub fn len(&self) -> usize {
        self.shared.read(|state| state.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops the successfully uploaded entries whose names appear in
    /// `committed`, the item names the server reported for the share, and
    /// returns them.
    ///
    /// Failed entries and entries missing from `committed` stay visible.
    /// Like [`remove_finished`](Self::remove_finished), this does not notify.
    pub fn remove_committed<'n>(
        &self,
        committed: impl IntoIterator<Item = &'n str>,
    ) -> Vec<QueueEntryView> {
        let committed: HashSet<&str> = committed.into_iter().collect();
        let mut state = self.shared.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = Vec::new();
        state.entries.retain(|name, slot| {
            let entry = &slot.entry;
            if entry.finished() && !entry.failed() && committed.contains(name.as_str()) {
                removed.push(entry.view());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Drops every settled entry and returns them.
    ///
    /// Meant for reconciliation once the caller has re-fetched the
    /// authoritative item list. Does not notify the observer, so it is safe
    /// to call from inside one.
    pub fn remove_finished(&self) -> Vec<QueueEntryView> {
        let mut state = self.shared.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut removed = Vec::new();
        state.entries.retain(|_, slot| {
            if slot.entry.finished() {
                removed.push(slot.entry.view());
                false
            } else {
                true
            }
        });
        removed
    }
}

/// Runs one transfer to settlement and records the outcome in its entry.
async fn run_transfer(
    shared: Arc<Shared>,
    client: Arc<dyn TransferClient>,
    launch: Launch,
) -> Result<TransferReceipt, TransferError> {
    let Launch {
        file,
        destination,
        generation,
        cancel,
    } = launch;
    let name = file.name().to_string();

    let outcome = match validate_item_name(&name) {
        Err(e) => Err(e),
        Ok(()) if cancel.is_cancelled() => Err(TransferError::Cancelled),
        Ok(()) => {
            debug!(file = %name, %destination, bytes = file.size(), "upload started");

            let on_progress: ProgressFn = {
                let shared = Arc::clone(&shared);
                let name = name.clone();
                Arc::new(move |loaded: u64, total: Option<u64>| {
                    shared.record_progress(&name, generation, loaded, total);
                })
            };

            let upload =
                AssertUnwindSafe(client.upload(&destination, &file, on_progress, cancel.clone()))
                    .catch_unwind();

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(TransferError::Cancelled),
                result = upload => result.unwrap_or_else(|payload| {
                    Err(TransferError::Aborted(panic_message(payload.as_ref())))
                }),
            }
        }
    };

    shared.settle(&name, generation, outcome.as_ref().map(|_| ()));
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "transfer panicked".into()
    }
}
