//! Error types for share API calls other than uploads.
//!
//! Uploads report [`hupload_transfer::TransferError`] so the queue can
//! record them per file.

use hupload_transfer::TransferError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid base URL: {0}")]
    InvalidUrl(String),

    #[error(transparent)]
    InvalidName(#[from] TransferError),
}
