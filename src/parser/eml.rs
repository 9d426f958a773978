//! Parser for individual `.eml` messages: the entry point of the library.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{EmlError, Result};
use crate::model::address;
use crate::model::mail::{ParsedMessage, NO_SUBJECT, UNKNOWN_SENDER};
use crate::parser::decode::TransferEncoding;
use crate::parser::header::{self, HeaderMap};
use crate::parser::mime::{self, DecomposedBody, DEFAULT_MAX_DEPTH};

/// Source of the current time, used when a message has no usable `Date:`.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parses message text into a [`ParsedMessage`].
///
/// Parsing is synchronous and holds no state between calls, so one parser
/// can serve any number of threads.
#[derive(Debug, Clone)]
pub struct EmlParser<C = SystemClock> {
    clock: C,
    max_depth: usize,
}

impl EmlParser<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for EmlParser<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> EmlParser<C> {
    /// A parser that takes "now" from `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the maximum multipart nesting depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse a complete message (headers + body).
    ///
    /// Malformed input degrades to defaulted fields. The only error is
    /// [`EmlError::NestingTooDeep`], in which case nothing is returned.
    pub fn parse(&self, text: &str) -> Result<ParsedMessage> {
        let (headers, body) = header::split_headers(text);
        if headers.is_empty() {
            debug!("No headers found, using defaults");
        }

        let parts = self.body_parts(&headers, &body)?;

        let from = address::first_address(headers.get_or_empty("from"))
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string());
        let to = address::extract_addresses(headers.get_or_empty("to"));
        let subject = headers
            .get("subject")
            .map(str::to_string)
            .unwrap_or_else(|| NO_SUBJECT.to_string());
        let date = headers
            .get("date")
            .and_then(header::parse_date)
            .unwrap_or_else(|| self.clock.now());

        Ok(ParsedMessage {
            from,
            to,
            subject,
            date,
            text: parts.text,
            html: parts.html,
            attachments: parts.attachments,
        })
    }

    /// Produce text, HTML, and attachments for the top-level body.
    fn body_parts(&self, headers: &HeaderMap, body: &str) -> Result<DecomposedBody> {
        let content_type = headers.get_or_empty("content-type");
        let lowered = content_type.to_lowercase();

        if lowered.contains("multipart") {
            return match header::boundary_param(content_type) {
                Some(boundary) => {
                    let delimiter = mime::top_level_delimiter(&boundary, body);
                    mime::decompose(body, &delimiter, self.max_depth)
                }
                None => {
                    let err = EmlError::MalformedInput(format!(
                        "multipart message without boundary: {content_type}"
                    ));
                    warn!(error = %err, "Returning empty body");
                    Ok(DecomposedBody::default())
                }
            };
        }

        let encoding =
            TransferEncoding::from_header(headers.get_or_empty("content-transfer-encoding"));
        let decoded = encoding.decode(body);

        let mut single = DecomposedBody::default();
        if lowered.contains("text/html") {
            single.html = decoded;
        } else {
            single.text = decoded;
        }
        Ok(single)
    }
}

/// Parse message text with the default parser.
pub fn parse(text: &str) -> Result<ParsedMessage> {
    EmlParser::new().parse(text)
}

/// Decode raw message bytes to text.
///
/// Tries UTF-8 first (after stripping a BOM), then falls back to
/// Windows-1252, which accepts every byte.
pub fn decode_message_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Read an `.eml` file from disk as text.
pub fn read_eml(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| EmlError::io(path, e))?;
    Ok(decode_message_bytes(&data))
}
