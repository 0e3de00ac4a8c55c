use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

/// Where the bytes of a [`FileHandle`] come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A file on local disk, opened lazily when the transfer starts.
    Path(PathBuf),
    /// An in-memory buffer.
    Bytes(Arc<[u8]>),
}

/// Read-only reference to a local file scheduled for upload.
#[derive(Debug, Clone)]
pub struct FileHandle {
    name: String,
    size: u64,
    source: FileSource,
}

impl FileHandle {
    /// Builds a handle for a file on disk, using its file name and current size.
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("path has no file name: {}", path.display()),
                )
            })?;

        Ok(Self {
            name,
            size: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Builds a handle over an in-memory buffer.
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            size: data.len() as u64,
            source: FileSource::Bytes(data),
        }
    }

    /// Uploads the same content under a different name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    /// Opens an async reader over the file content.
    pub async fn open(&self) -> io::Result<Box<dyn AsyncRead + Send + Sync + Unpin>> {
        match &self.source {
            FileSource::Path(path) => {
                let file = tokio::fs::File::open(path).await?;
                Ok(Box::new(file))
            }
            FileSource::Bytes(data) => Ok(Box::new(io::Cursor::new(Arc::clone(data)))),
        }
    }
}

/// Lifecycle state of one queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl EntryState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Transfer state of one file inside an upload queue.
///
/// Mutated only by the queue, under its map lock. Terminal states are
/// absorbing: once `finished` is set, every further update is ignored.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    file: FileHandle,
    bytes_loaded: u64,
    bytes_total: u64,
    started: bool,
    finished: bool,
    failed: bool,
    error_message: String,
    /// Launch generation; callbacks carrying another value belong to a
    /// transfer whose entry has since been replaced.
    generation: u64,
}

impl QueueEntry {
    pub(crate) fn new(file: FileHandle, generation: u64) -> Self {
        let bytes_total = file.size();
        Self {
            file,
            bytes_loaded: 0,
            bytes_total,
            started: false,
            finished: false,
            failed: false,
            error_message: String::new(),
            generation,
        }
    }

    pub fn name(&self) -> &str {
        self.file.name()
    }

    pub fn file(&self) -> &FileHandle {
        &self.file
    }

    pub fn bytes_loaded(&self) -> u64 {
        self.bytes_loaded
    }

    pub fn bytes_total(&self) -> u64 {
        self.bytes_total
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> EntryState {
        match (self.finished, self.failed, self.started) {
            (true, true, _) => EntryState::Failed,
            (true, false, _) => EntryState::Succeeded,
            (false, _, true) => EntryState::InProgress,
            (false, _, false) => EntryState::Pending,
        }
    }

    /// Merges a transport progress event. Returns `false` if ignored.
    pub(crate) fn record_progress(&mut self, loaded: u64, total: Option<u64>) -> bool {
        if self.finished {
            return false;
        }
        if let Some(total) = total {
            // Never shrink below what was already reported as sent.
            self.bytes_total = total.max(self.bytes_loaded);
        }
        self.bytes_loaded = loaded.max(self.bytes_loaded).min(self.bytes_total);
        self.started = true;
        true
    }

    pub(crate) fn succeed(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.started = true;
        self.finished = true;
        self.bytes_loaded = self.bytes_total;
        true
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) -> bool {
        if self.finished {
            return false;
        }
        self.finished = true;
        self.failed = true;
        self.error_message = message.into();
        true
    }

    pub fn view(&self) -> QueueEntryView {
        QueueEntryView {
            name: self.name().to_string(),
            bytes_loaded: self.bytes_loaded,
            bytes_total: self.bytes_total,
            finished: self.finished,
            failed: self.failed,
            error_message: self.error_message.clone(),
            state: self.state(),
        }
    }
}

/// Owned copy of an entry, as delivered to progress observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryView {
    pub name: String,
    pub bytes_loaded: u64,
    pub bytes_total: u64,
    pub finished: bool,
    pub failed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_message: String,
    pub state: EntryState,
}

impl QueueEntryView {
    /// Returns the transfer progress as a percentage (0-100).
    pub fn percentage(&self) -> f64 {
        if self.bytes_total == 0 {
            return if self.finished { 100.0 } else { 0.0 };
        }
        self.bytes_loaded as f64 / self.bytes_total as f64 * 100.0
    }
}

/// How an item name is appended to the queue's destination prefix.
///
/// The remote API has used both conventions, so this is configuration
/// rather than a constant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationLayout {
    /// `<prefix>/items/<name>`
    #[default]
    Items,
    /// `<prefix>/<name>`
    Root,
}

impl DestinationLayout {
    /// Builds the destination path for `name` under `prefix`.
    pub fn resolve(self, prefix: &str, name: &str) -> String {
        let prefix = prefix.trim_end_matches('/');
        match self {
            Self::Items => format!("{prefix}/items/{name}"),
            Self::Root => format!("{prefix}/{name}"),
        }
    }
}

impl fmt::Display for DestinationLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Items => f.write_str("items"),
            Self::Root => f.write_str("root"),
        }
    }
}

impl FromStr for DestinationLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "items" => Ok(Self::Items),
            "root" => Ok(Self::Root),
            other => Err(format!("unknown destination layout: {other}")),
        }
    }
}

/// What a transport reports for one successful upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Path of the stored item as reported by the server, if any.
    pub remote_path: Option<String>,
    /// Size the server recorded, if reported.
    pub stored_size: Option<u64>,
}
