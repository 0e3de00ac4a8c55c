use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An item stored in a share, as returned by the upload and listing endpoints.
///
/// Field names follow the server's Go struct names verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// `<share>/<item>`.
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "ItemInfo", default)]
    pub info: ItemInfo,
}

impl Item {
    /// Item name without the share prefix.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn size(&self) -> u64 {
        self.info.size
    }
}

/// Missing fields default to zero size and the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemInfo {
    #[serde(rename = "Size", default)]
    pub size: u64,
    #[serde(rename = "DateModified", default)]
    pub date_modified: DateTime<Utc>,
}
