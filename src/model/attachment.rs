//! Extracted attachments.

use crate::error::Result;
use crate::parser::decode;

/// Filename used when a part declares none.
pub const DEFAULT_FILENAME: &str = "attachment";

/// Content type used when a part declares none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// An attachment pulled out of a multipart body.
///
/// The payload is carried as base64 text whatever the part's original
/// transfer-encoding was; [`Attachment::decoded`] yields the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Declared filename, or [`DEFAULT_FILENAME`].
    pub filename: String,

    /// MIME type without parameters (e.g. `"application/pdf"`).
    pub content_type: String,

    /// Size in bytes of the decoded content.
    pub size: u64,

    /// Base64-encoded content, without line breaks.
    pub content: String,
}

impl Attachment {
    /// Decode the base64 payload back to raw bytes.
    pub fn decoded(&self) -> Result<Vec<u8>> {
        decode::decode_base64(&self.content)
    }
}
