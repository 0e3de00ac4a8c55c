pub mod api_result;
pub mod types;

pub use api_result::{ApiResult, ApiStatus, decode_error_message};
pub use types::{Item, ItemInfo};

/// Path prefix of every REST endpoint.
pub const API_PREFIX: &str = "/api/v1";

/// Request header carrying the declared size of an uploaded item.
pub const FILE_SIZE_HEADER: &str = "FileSize";

/// Name of the multipart part holding the item content.
pub const FILE_PART_NAME: &str = "file";
