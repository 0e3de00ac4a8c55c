//! Transport seam used by the upload queue.
//!
//! `TransferClient` is implemented by the HTTP client crate. Keeping it a
//! trait keeps the queue decoupled from the transport and testable with mocks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::TransferError;
use crate::types::{FileHandle, TransferReceipt};

/// Progress callback: `(bytes_sent, declared_total)`.
///
/// May be invoked zero or more times before the transfer settles.
pub type ProgressFn = Arc<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Future returned by [`TransferClient::upload`].
pub type UploadFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TransferReceipt, TransferError>> + Send + 'a>>;

/// Uploads a single file to a single destination path.
///
/// Implementations must be stateless per call so one client can be shared
/// by any number of queues. A fired `cancel` token must settle the future
/// with [`TransferError::Cancelled`].
pub trait TransferClient: Send + Sync {
    fn upload<'a>(
        &'a self,
        destination: &'a str,
        file: &'a FileHandle,
        on_progress: ProgressFn,
        cancel: CancellationToken,
    ) -> UploadFuture<'a>;
}

impl<T: TransferClient + ?Sized> TransferClient for Arc<T> {
    fn upload<'a>(
        &'a self,
        destination: &'a str,
        file: &'a FileHandle,
        on_progress: ProgressFn,
        cancel: CancellationToken,
    ) -> UploadFuture<'a> {
        (**self).upload(destination, file, on_progress, cancel)
    }
}
