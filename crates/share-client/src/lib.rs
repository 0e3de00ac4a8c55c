//! HTTP client for a hupload share server.
//!
//! [`Client`] implements [`hupload_transfer::TransferClient`], so it plugs
//! straight into an [`hupload_transfer::UploadQueue`].

mod client;
mod error;

pub use client::{Client, ClientConfig, share_path};
pub use error::ClientError;

use std::time::Duration;

/// Default server address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Default whole-request timeout. Uploads of large files need room.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Read size for streamed upload bodies.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
