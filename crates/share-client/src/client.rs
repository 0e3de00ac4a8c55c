//! Share server client.
//!
//! Async HTTP client using `reqwest` with optional Basic authentication.
//! Upload bodies are streamed from the file handle and report progress as
//! each chunk is handed to the transport.

use std::error::Error as _;
use std::time::Duration;

use futures_util::StreamExt;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, RequestBuilder, StatusCode, Url};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use hupload_protocol::{API_PREFIX, FILE_PART_NAME, FILE_SIZE_HEADER, Item, decode_error_message};
use hupload_transfer::{
    FileHandle, ProgressFn, TransferClient, TransferError, TransferReceipt, UploadFuture,
    validate_share_name,
};

use crate::error::ClientError;
use crate::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, UPLOAD_CHUNK_SIZE};

/// Characters left unescaped in a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Connection settings for [`Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: None,
            password: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Returns the queue prefix for uploads into `share`.
pub fn share_path(share: &str) -> Result<String, ClientError> {
    validate_share_name(share)?;
    Ok(format!("/shares/{share}"))
}

/// Share server API client. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<(String, Option<String>)>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url,
            credentials: config.username.map(|user| (user, config.password)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the full URL of an API path, percent-encoding every segment.
    fn endpoint(&self, path: &str) -> String {
        let encoded = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}{API_PREFIX}/{encoded}", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((user, password)) => request.basic_auth(user, password.as_ref()),
            None => request,
        }
    }

    /// Lists the committed items of `share`, newest first as the server
    /// orders them.
    pub async fn list_items(&self, share: &str) -> Result<Vec<Item>, ClientError> {
        let url = self.endpoint(&format!("{}/items", share_path(share)?));
        let resp = self.authorize(self.http.get(&url)).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.bytes().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: decode_error_message(&body).unwrap_or_else(|| reason(status)),
            });
        }

        Ok(resp.json().await?)
    }

    async fn send_upload(
        &self,
        destination: &str,
        file: &FileHandle,
        on_progress: ProgressFn,
    ) -> Result<TransferReceipt, TransferError> {
        let url = self.endpoint(destination);
        let size = file.size();

        let mut sent = 0u64;
        let stream = ReaderStream::with_capacity(file.open().await?, UPLOAD_CHUNK_SIZE).map(
            move |chunk| {
                if let Ok(bytes) = &chunk {
                    sent += bytes.len() as u64;
                    on_progress(sent, Some(size));
                }
                chunk
            },
        );

        let part = Part::stream_with_length(Body::wrap_stream(stream), size)
            .file_name(file.name().to_string());
        let form = Form::new().part(FILE_PART_NAME, part);

        debug!(%url, bytes = size, "sending upload request");

        let resp = self
            .authorize(self.http.post(&url))
            .header(FILE_SIZE_HEADER, size)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(match decode_error_message(&body) {
                Some(message) => TransferError::Server {
                    status: status.as_u16(),
                    message,
                },
                None => TransferError::Http {
                    status: status.as_u16(),
                    reason: reason(status),
                },
            });
        }

        match serde_json::from_slice::<Item>(&body) {
            Ok(item) => Ok(TransferReceipt {
                remote_path: Some(item.path),
                stored_size: Some(item.info.size),
            }),
            Err(e) => {
                // The item is stored; only the description is unusable.
                warn!(%url, error = %e, "unexpected upload response body");
                Ok(TransferReceipt::default())
            }
        }
    }
}

impl TransferClient for Client {
    fn upload<'a>(
        &'a self,
        destination: &'a str,
        file: &'a FileHandle,
        on_progress: ProgressFn,
        cancel: CancellationToken,
    ) -> UploadFuture<'a> {
        Box::pin(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(TransferError::Cancelled),
                result = self.send_upload(destination, file, on_progress) => result,
            }
        })
    }
}

fn reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or_default().to_string()
}

/// Maps a request-level failure, keeping the underlying cause in the message.
fn transport_error(err: reqwest::Error) -> TransferError {
    if err.is_timeout() {
        return TransferError::Timeout;
    }
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    TransferError::Network(message)
}
