//! Concurrent upload queue with per-file progress snapshots.
//!
//! An [`UploadQueue`] owns one [`QueueEntry`] per file name, launches one
//! transfer per new entry through an injected [`TransferClient`], and hands
//! the complete entry list to a [`ProgressObserver`] after every change.
//! A failed file never cancels its siblings; the batch result is only
//! reported once every launched transfer has settled.

mod client;
mod progress;
mod queue;
mod types;
mod validation;

pub use client::{ProgressFn, TransferClient, UploadFuture};
pub use progress::{ProgressObserver, ProgressSummary, SnapshotSender, snapshot_channel};
pub use queue::{QueueError, UploadQueue, UploadReceipt};
pub use types::{
    DestinationLayout, EntryState, FileHandle, FileSource, QueueEntry, QueueEntryView,
    TransferReceipt,
};
pub use validation::{validate_item_name, validate_share_name};

/// Errors produced by a single file transfer.
///
/// Transport implementations map every failure into one of these variants
/// at the boundary, so the queue never has to inspect raw response bodies.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("HTTP error {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("upload cancelled")]
    Cancelled,

    #[error("upload task aborted: {0}")]
    Aborted(String),

    #[error("invalid name: {0}")]
    InvalidName(String),
}

impl TransferError {
    /// Message suitable for showing next to the failed file.
    ///
    /// Prefers the server-provided message, then the HTTP reason phrase,
    /// then the error's own description.
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { message, .. } => message.clone(),
            Self::Http { reason, .. } if !reason.is_empty() => reason.clone(),
            Self::Http { status, .. } => format!("HTTP error {status}"),
            other => other.to_string(),
        }
    }

    /// Returns the HTTP status code, if the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
