use serde::{Deserialize, Serialize};

/// Outcome tag of an [`ApiResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Success,
    Error,
}

/// Status body returned by the server for errors and message-only replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResult {
    pub status: ApiStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ApiResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ApiStatus::Error,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ApiStatus::Success,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == ApiStatus::Error
    }
}

/// Extracts the human-readable message from an error response body.
///
/// Lenient on purpose: any JSON object with a non-empty string `message`
/// qualifies, whatever its `status`. Returns `None` for bodies that are not
/// JSON (proxy error pages, empty bodies).
pub fn decode_error_message(body: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct Partial {
        #[serde(default)]
        message: Option<String>,
    }

    let partial: Partial = serde_json::from_slice(body).ok()?;
    partial
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}
