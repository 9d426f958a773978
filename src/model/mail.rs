//! The structured result of parsing one message.

use chrono::{DateTime, Utc};

use super::attachment::Attachment;

/// Sender used when the `From:` header yields no address.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Subject used when the `Subject:` header is absent.
pub const NO_SUBJECT: &str = "No Subject";

/// A fully parsed message.
///
/// Created fresh by each parse call and never mutated by the library afterwards.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParsedMessage {
    /// First sender mailbox, or [`UNKNOWN_SENDER`].
    pub from: String,

    /// Recipient mailboxes from `To:`, in header order.
    pub to: Vec<String>,

    /// Raw subject, or [`NO_SUBJECT`].
    pub subject: String,

    /// Parsed `Date:` header, or the parse time when absent or unparsable.
    pub date: DateTime<Utc>,

    /// First plain-text body found (may be empty).
    pub text: String,

    /// First HTML body found (may be empty).
    pub html: String,

    /// Attachments in document order.
    pub attachments: Vec<Attachment>,
}

impl ParsedMessage {
    /// Total decoded size of all attachments.
    pub fn attachments_size(&self) -> u64 {
        self.attachments.iter().map(|a| a.size).sum()
    }

    pub fn has_html(&self) -> bool {
        !self.html.is_empty()
    }
}
