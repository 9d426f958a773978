//! Centralized error types for emlview.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the emlview library.
///
/// Only [`EmlError::NestingTooDeep`] is fatal to a parse. `MalformedInput` and
/// `DecodeFailure` are produced internally and recovered from by the parser,
/// which degrades to defaulted fields instead.
#[derive(Error, Debug)]
pub enum EmlError {
    /// A multipart section declared no usable boundary.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A transfer-encoded payload could not be decoded.
    #[error("Decoding error: {0}")]
    DecodeFailure(String),

    /// Multipart sections are nested deeper than the configured limit.
    #[error("Multipart nesting exceeds the maximum depth of {max_depth}")]
    NestingTooDeep { max_depth: usize },

    /// No stored message exists under the given identifier.
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// The message exists but has no attachment at the given index.
    #[error("Attachment {index} not found in message {id}")]
    AttachmentNotFound { id: String, index: usize },

    /// The request carried a missing or wrong bearer token.
    #[error("Unauthorized")]
    Unauthorized,

    /// The uploaded file was rejected before parsing.
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias for `Result<T, EmlError>`.
pub type Result<T> = std::result::Result<T, EmlError>;

impl EmlError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// `true` for errors the parser degrades from rather than surfacing.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedInput(_) | Self::DecodeFailure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(EmlError::MalformedInput("no boundary".into()).is_recoverable());
        assert!(EmlError::DecodeFailure("bad base64".into()).is_recoverable());
        assert!(!EmlError::NestingTooDeep { max_depth: 10 }.is_recoverable());
        assert!(!EmlError::Unauthorized.is_recoverable());
    }

    #[test]
    fn test_io_display_names_path() {
        let err = EmlError::io(
            "/tmp/missing.eml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "I/O error on '/tmp/missing.eml': gone");
    }
}
