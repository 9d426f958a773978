//! Content-transfer-encoding decoding: quoted-printable, base64, identity.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use tracing::debug;

use crate::error::{EmlError, Result};

/// Standard alphabet, tolerant of missing or superfluous padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Two-byte UTF-8 escapes that are substituted with their literal symbol
/// before the generic `=XX` pass runs.
static QP_SYMBOLS: &[(&str, char)] = &[
    ("=C2=A0", '\u{00A0}'), // no-break space
    ("=C2=A9", '\u{00A9}'), // copyright
    ("=C2=AE", '\u{00AE}'), // registered
    ("=C2=B0", '\u{00B0}'), // degree
    ("=C2=A2", '\u{00A2}'), // cent
    ("=C2=A3", '\u{00A3}'), // pound
    ("=C2=A5", '\u{00A5}'), // yen
    ("=C2=A7", '\u{00A7}'), // section
    ("=C2=B1", '\u{00B1}'), // plus-minus
    ("=C2=B6", '\u{00B6}'), // pilcrow
    ("=C2=B7", '\u{00B7}'), // middle dot
    ("=C2=BB", '\u{00BB}'), // right guillemet
    ("=C2=AB", '\u{00AB}'), // left guillemet
];

/// Lead bytes of two-byte UTF-8 sequences in the Latin-1 supplement.
/// The generic escape pass drops these instead of emitting them.
const DROPPED_LEAD_BYTES: [u8; 2] = [0xC2, 0xC3];

/// A declared `Content-Transfer-Encoding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    QuotedPrintable,
    Base64,
    /// `7bit`, `8bit`, `binary`, absent or anything unrecognized.
    Identity,
}

impl TransferEncoding {
    /// Classify a header value, case-insensitively.
    pub fn from_header(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "quoted-printable" => Self::QuotedPrintable,
            "base64" => Self::Base64,
            _ => Self::Identity,
        }
    }

    /// Decode `raw` into text. Never fails: base64 errors fall back to `raw`.
    pub fn decode(self, raw: &str) -> String {
        match self {
            Self::QuotedPrintable => decode_quoted_printable(raw),
            Self::Base64 => match decode_base64(raw) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    debug!(error = %e, "Passing base64 body through undecoded");
                    raw.to_string()
                }
            },
            Self::Identity => raw.to_string(),
        }
    }
}

/// Decode `raw` according to the encoding named in `encoding`.
pub fn decode_transfer(raw: &str, encoding: &str) -> String {
    TransferEncoding::from_header(encoding).decode(raw)
}

/// Decode quoted-printable text.
///
/// Escapes map to single code points (`=E9` becomes U+00E9), so multi-byte
/// UTF-8 sequences outside [`QP_SYMBOLS`] are not reassembled; their `=C2`
/// or `=C3` lead byte is lost. Only upper-case hex escapes are recognized.
pub fn decode_quoted_printable(raw: &str) -> String {
    let unwrapped = raw.replace("=\r\n", "").replace("=\n", "");

    let mut text = unwrapped;
    for (escape, symbol) in QP_SYMBOLS {
        if text.contains(escape) {
            text = text.replace(escape, &symbol.to_string());
        }
    }

    decode_byte_escapes(&text)
}

/// Replace every remaining `=XX` escape with the code point U+00XX.
fn decode_byte_escapes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('=') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        match hex_byte(after) {
            Some(byte) => {
                if !DROPPED_LEAD_BYTES.contains(&byte) {
                    result.push(char::from(byte));
                }
                rest = &after[2..];
            }
            None => {
                result.push('=');
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

/// Parse two leading upper-case hex digits.
fn hex_byte(s: &str) -> Option<u8> {
    let digits = s.as_bytes().get(..2)?;
    if !digits
        .iter()
        .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(b))
    {
        return None;
    }
    // Both bytes are ASCII, so the slice is on a char boundary.
    u8::from_str_radix(&s[..2], 16).ok()
}

/// Decode base64 text to raw bytes, ignoring line breaks and other whitespace.
pub fn decode_base64(raw: &str) -> Result<Vec<u8>> {
    let compact = compact_base64(raw);
    LENIENT_BASE64
        .decode(compact.as_bytes())
        .map_err(|e| EmlError::DecodeFailure(e.to_string()))
}

/// Encode raw bytes as single-line standard base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Strip all ASCII whitespace from base64 text.
pub fn compact_base64(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_line_break_removed() {
        assert_eq!(decode_quoted_printable("text=\r\npart2"), "textpart2");
        assert_eq!(decode_quoted_printable("text=\npart2"), "textpart2");
    }

    #[test]
    fn test_symbol_table() {
        assert_eq!(decode_quoted_printable("=C2=A9 2024"), "\u{00A9} 2024");
        assert_eq!(decode_quoted_printable("=C2=ABquote=C2=BB"), "«quote»");
        assert_eq!(decode_quoted_printable("25=C2=B0C"), "25°C");
    }

    #[test]
    fn test_generic_escape() {
        assert_eq!(decode_quoted_printable("=41"), "A");
        assert_eq!(decode_quoted_printable("a=3Db"), "a=b");
    }

    #[test]
    fn test_lead_bytes_dropped() {
        // é is =C3=A9 in UTF-8; the lead byte is lost and A9 maps to U+00A9.
        assert_eq!(decode_quoted_printable("caf=C3=A9"), "caf\u{00A9}");
        assert_eq!(decode_quoted_printable("=C2"), "");
    }

    #[test]
    fn test_lowercase_and_incomplete_escapes_kept() {
        assert_eq!(decode_quoted_printable("=3d"), "=3d");
        assert_eq!(decode_quoted_printable("1+1=2"), "1+1=2");
        assert_eq!(decode_quoted_printable("end="), "end=");
    }

    #[test]
    fn test_base64_multiline() {
        let decoded = decode_base64("SGVs\r\nbG8=\r\n").unwrap();
        assert_eq!(decoded, b"Hello");
    }

    #[test]
    fn test_base64_missing_padding() {
        assert_eq!(decode_base64("SGVsbG8").unwrap(), b"Hello");
    }

    #[test]
    fn test_base64_failure_passes_through() {
        let raw = "not base64 at all!";
        assert!(decode_base64(raw).is_err());
        assert_eq!(TransferEncoding::Base64.decode(raw), raw);
    }

    #[test]
    fn test_encoding_names_case_insensitive() {
        assert_eq!(
            TransferEncoding::from_header(" Quoted-Printable "),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::from_header("BASE64"), TransferEncoding::Base64);
        assert_eq!(TransferEncoding::from_header("7bit"), TransferEncoding::Identity);
        assert_eq!(decode_transfer("=41", "8bit"), "=41");
    }
}
