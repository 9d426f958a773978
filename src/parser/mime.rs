//! Multipart decomposition: boundary splitting, part classification, attachment extraction.
//!
//! Parts are found by splitting the body text on the delimiter string. A
//! delimiter that happens to occur inside a part's content splits that part
//! too; no attempt is made to anchor delimiters to line starts.

use tracing::{debug, warn};

use crate::error::{EmlError, Result};
use crate::model::attachment::{Attachment, DEFAULT_CONTENT_TYPE, DEFAULT_FILENAME};
use crate::parser::decode::{self, TransferEncoding};
use crate::parser::header::{self, HeaderMap};

/// Default maximum multipart nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Text, HTML, and attachments collected from a multipart body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecomposedBody {
    pub text: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

impl DecomposedBody {
    /// Keep the first non-empty text in document order.
    fn offer_text(&mut self, text: String) {
        if self.text.is_empty() {
            self.text = text;
        }
    }

    /// Keep the first non-empty HTML in document order.
    fn offer_html(&mut self, html: String) {
        if self.html.is_empty() {
            self.html = html;
        }
    }

    /// Fold a nested multipart result into this one.
    ///
    /// Bodies follow the same first-non-empty rule as sibling parts;
    /// attachments are appended where the nested part was encountered.
    fn merge(&mut self, nested: DecomposedBody) {
        self.offer_text(nested.text);
        self.offer_html(nested.html);
        self.attachments.extend(nested.attachments);
    }
}

/// How a part contributes to the decomposed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Multipart,
    PlainText,
    Html,
    Attachment,
    Ignored,
}

/// One part of a multipart body, before classification.
#[derive(Debug, Clone)]
pub struct MimePart {
    pub headers: HeaderMap,
    /// Body text as it appears in the message, still transfer-encoded.
    pub body: String,
    /// `Content-Type` value including parameters; empty if absent.
    pub content_type: String,
    pub encoding: TransferEncoding,
}

impl MimePart {
    /// Tokenize one boundary-delimited segment.
    pub fn parse(segment: &str) -> Self {
        let (headers, body) = header::split_headers(strip_delimiter_newline(segment));
        let content_type = headers.get_or_empty("content-type").to_string();
        let encoding =
            TransferEncoding::from_header(headers.get_or_empty("content-transfer-encoding"));
        Self {
            headers,
            body,
            content_type,
            encoding,
        }
    }

    /// Classify by declared type, in priority order.
    pub fn kind(&self) -> PartKind {
        let ct = self.content_type.to_lowercase();
        if ct.contains("multipart") {
            PartKind::Multipart
        } else if ct.contains("text/plain") {
            PartKind::PlainText
        } else if ct.contains("text/html") {
            PartKind::Html
        } else if self.is_attachment_disposition()
            || ["application/", "image/", "video/", "audio/"]
                .iter()
                .any(|prefix| ct.contains(prefix))
        {
            PartKind::Attachment
        } else {
            PartKind::Ignored
        }
    }

    /// The body with its transfer-encoding removed.
    pub fn decoded_body(&self) -> String {
        self.encoding.decode(&self.body)
    }

    fn is_attachment_disposition(&self) -> bool {
        self.headers
            .get_or_empty("content-disposition")
            .to_lowercase()
            .contains("attachment")
    }

    /// Build the attachment record for this part.
    ///
    /// Base64 parts keep their encoded text as the payload; other parts are
    /// decoded and re-encoded. The size is always the decoded byte count.
    pub fn to_attachment(&self) -> Attachment {
        let filename = header::filename_param(self.headers.get_or_empty("content-disposition"))
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());

        let content_type = match header::strip_params(&self.content_type) {
            "" => DEFAULT_CONTENT_TYPE.to_string(),
            ct => ct.to_lowercase(),
        };

        let (size, content) = match self.encoding {
            TransferEncoding::Base64 => match decode::decode_base64(&self.body) {
                Ok(bytes) => (bytes.len(), decode::compact_base64(&self.body)),
                Err(e) => {
                    warn!(
                        filename = %filename,
                        error = %e,
                        "Attachment is not valid base64, keeping raw text"
                    );
                    (self.body.len(), decode::encode_base64(self.body.as_bytes()))
                }
            },
            _ => {
                let decoded = self.decoded_body();
                (decoded.len(), decode::encode_base64(decoded.as_bytes()))
            }
        };

        Attachment {
            filename,
            content_type,
            size: size as u64,
            content,
        }
    }
}

/// Delimiter for the boundary declared in the message headers.
///
/// Normally `--` followed by the boundary. A boundary that already starts
/// with `--` is used bare when only the bare form occurs in `body`.
pub fn top_level_delimiter(boundary: &str, body: &str) -> String {
    let delimiter = nested_delimiter(boundary);
    if boundary.starts_with("--") && !body.contains(&delimiter) {
        boundary.to_string()
    } else {
        delimiter
    }
}

/// Delimiter for a boundary declared on a nested multipart part.
pub fn nested_delimiter(boundary: &str) -> String {
    format!("--{boundary}")
}

/// Decompose a multipart body split by `delimiter`.
///
/// Fails only with [`EmlError::NestingTooDeep`] when multipart parts nest
/// more than `max_depth` levels (this body counts as the first level).
pub fn decompose(body: &str, delimiter: &str, max_depth: usize) -> Result<DecomposedBody> {
    decompose_at(body, delimiter, 1, max_depth)
}

fn decompose_at(
    body: &str,
    delimiter: &str,
    depth: usize,
    max_depth: usize,
) -> Result<DecomposedBody> {
    if depth > max_depth {
        warn!(depth, max_depth, "Multipart nesting too deep, aborting parse");
        return Err(EmlError::NestingTooDeep { max_depth });
    }

    let mut result = DecomposedBody::default();
    if delimiter.is_empty() {
        return Ok(result);
    }

    for segment in body.split(delimiter) {
        let trimmed = segment.trim();
        if trimmed.is_empty() || trimmed == "--" {
            continue;
        }

        let part = MimePart::parse(segment);
        let kind = part.kind();
        debug!(depth, content_type = %part.content_type, ?kind, "Classified part");

        match kind {
            PartKind::Multipart => match header::boundary_param(&part.content_type) {
                Some(boundary) => {
                    let nested = decompose_at(
                        &part.body,
                        &nested_delimiter(&boundary),
                        depth + 1,
                        max_depth,
                    )?;
                    result.merge(nested);
                }
                None => {
                    let err = EmlError::MalformedInput(format!(
                        "nested multipart without boundary: {}",
                        part.content_type
                    ));
                    warn!(depth, error = %err, "Skipping part");
                }
            },
            PartKind::PlainText => result.offer_text(part.decoded_body()),
            PartKind::Html => result.offer_html(part.decoded_body()),
            PartKind::Attachment => result.attachments.push(part.to_attachment()),
            PartKind::Ignored => {}
        }
    }

    Ok(result)
}

/// Drop the line break that precedes the next delimiter; it belongs to the delimiter.
fn strip_delimiter_newline(segment: &str) -> &str {
    segment
        .strip_suffix("\r\n")
        .or_else(|| segment.strip_suffix('\n'))
        .unwrap_or(segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nest(levels: usize) -> String {
        let mut body = "--leaf\r\nContent-Type: text/plain\r\n\r\ndeep\r\n--leaf--\r\n".to_string();
        let mut inner = "leaf".to_string();
        for level in 0..levels {
            let outer = format!("b{level}");
            body = format!(
                "--{outer}\r\nContent-Type: multipart/mixed; boundary=\"{inner}\"\r\n\r\n{body}--{outer}--\r\n"
            );
            inner = outer;
        }
        body
    }

    #[test]
    fn test_two_parts() {
        let body = "--B\r\nContent-Type: text/plain\r\n\r\nHello\r\n--B\r\n\
                    Content-Type: text/html\r\n\r\n<p>Hi</p>\r\n--B--\r\n";
        let result = decompose(body, "--B", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(result.text, "Hello");
        assert_eq!(result.html, "<p>Hi</p>");
        assert!(result.attachments.is_empty());
    }

    #[test]
    fn test_first_text_part_wins() {
        let body = "--B\nContent-Type: text/plain\n\nfirst\n--B\n\
                    Content-Type: text/plain\n\nsecond\n--B--\n";
        let result = decompose(body, "--B", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(result.text, "first");
    }

    #[test]
    fn test_outer_text_kept_over_nested() {
        let body = "--O\nContent-Type: text/plain\n\nouter\n--O\n\
                    Content-Type: multipart/alternative; boundary=\"I\"\n\n\
                    --I\nContent-Type: text/plain\n\ninner\n--I\n\
                    Content-Type: text/html\n\n<p>inner</p>\n--I--\n--O--\n";
        let result = decompose(body, "--O", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(result.text, "outer");
        // No outer HTML, so the nested one fills the gap.
        assert_eq!(result.html, "<p>inner</p>");
    }

    #[test]
    fn test_outer_html_kept_over_nested() {
        let body = "--O\nContent-Type: text/html\n\n<p>outer</p>\n--O\n\
                    Content-Type: multipart/alternative; boundary=\"I\"\n\n\
                    --I\nContent-Type: text/html\n\n<p>inner</p>\n--I--\n--O--\n";
        let result = decompose(body, "--O", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(result.html, "<p>outer</p>");
        assert_eq!(result.text, "");
    }

    #[test]
    fn test_nested_text_kept_over_later_outer() {
        let body = "--O\nContent-Type: multipart/alternative; boundary=\"I\"\n\n\
                    --I\nContent-Type: text/plain\n\ninner\n--I--\n--O\n\
                    Content-Type: text/plain\n\nouter\n--O--\n";
        let result = decompose(body, "--O", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(result.text, "inner");
    }

    #[test]
    fn test_unknown_part_dropped() {
        let body = "--B\nContent-Type: message/delivery-status\n\nReporting\n--B--\n";
        let result = decompose(body, "--B", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(result, DecomposedBody::default());
    }

    #[test]
    fn test_untyped_part_dropped() {
        let body = "--B\n\nno headers here\n--B--\n";
        let result = decompose(body, "--B", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(result, DecomposedBody::default());
    }

    #[test]
    fn test_quoted_printable_part() {
        let body = "--B\nContent-Type: text/plain\nContent-Transfer-Encoding: quoted-printable\n\n\
                    soft=\nbreak =C2=A9\n--B--\n";
        let result = decompose(body, "--B", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(result.text, "softbreak \u{00A9}");
    }

    #[test]
    fn test_base64_attachment_keeps_encoding() {
        let body = "--B\r\nContent-Type: application/pdf; name=\"doc.pdf\"\r\n\
                    Content-Disposition: attachment; filename=\"doc.pdf\"\r\n\
                    Content-Transfer-Encoding: base64\r\n\r\nJVBE\r\nRi0x\r\n--B--\r\n";
        let result = decompose(body, "--B", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(result.attachments.len(), 1);
        let att = &result.attachments[0];
        assert_eq!(att.filename, "doc.pdf");
        assert_eq!(att.content_type, "application/pdf");
        assert_eq!(att.content, "JVBERi0x");
        assert_eq!(att.size, 6);
        assert_eq!(att.decoded().unwrap(), b"%PDF-1");
    }

    #[test]
    fn test_identity_attachment_reencoded() {
        let body = "--B\nContent-Type: text/csv\nContent-Disposition: attachment; filename=data.csv\n\n\
                    a,b\n--B--\n";
        let result = decompose(body, "--B", DEFAULT_MAX_DEPTH).unwrap();
        let att = &result.attachments[0];
        assert_eq!(att.filename, "data.csv");
        assert_eq!(att.content_type, "text/csv");
        assert_eq!(att.size, 3);
        assert_eq!(att.decoded().unwrap(), b"a,b");
    }

    #[test]
    fn test_attachment_defaults() {
        let body = "--B\nContent-Disposition: attachment\n\nxyz\n--B--\n";
        let result = decompose(body, "--B", DEFAULT_MAX_DEPTH).unwrap();
        let att = &result.attachments[0];
        assert_eq!(att.filename, DEFAULT_FILENAME);
        assert_eq!(att.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_invalid_base64_attachment() {
        let body = "--B\nContent-Type: image/png\nContent-Transfer-Encoding: base64\n\n\
                    ***broken***\n--B--\n";
        let result = decompose(body, "--B", DEFAULT_MAX_DEPTH).unwrap();
        let att = &result.attachments[0];
        assert_eq!(att.size, 12);
        assert_eq!(att.decoded().unwrap(), b"***broken***");
    }

    #[test]
    fn test_nested_within_limit() {
        let result = decompose(&nest(3), "--b2", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(result.text, "deep");
    }

    #[test]
    fn test_nesting_too_deep() {
        let err = decompose(&nest(12), "--b11", DEFAULT_MAX_DEPTH).unwrap_err();
        assert!(matches!(err, EmlError::NestingTooDeep { max_depth: 10 }));
    }

    #[test]
    fn test_depth_limit_is_inclusive() {
        // nest(2) has three multipart levels: b1, b0, leaf.
        assert!(decompose(&nest(2), "--b1", 3).is_ok());
        assert!(decompose(&nest(2), "--b1", 2).is_err());
    }

    #[test]
    fn test_nested_without_boundary_skipped() {
        let body = "--B\nContent-Type: multipart/alternative\n\nwhatever\n--B\n\
                    Content-Type: text/plain\n\nkept\n--B--\n";
        let result = decompose(body, "--B", DEFAULT_MAX_DEPTH).unwrap();
        assert_eq!(result.text, "kept");
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(top_level_delimiter("abc", ""), "--abc");
        assert_eq!(top_level_delimiter("--abc", "----abc\n"), "----abc");
        assert_eq!(top_level_delimiter("--abc", "--abc\n"), "--abc");
        assert_eq!(nested_delimiter("----=_Part_1"), "------=_Part_1");
        assert_eq!(nested_delimiter("alt"), "--alt");
    }
}
