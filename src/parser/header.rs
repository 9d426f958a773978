//! Header tokenizing, header parameters, and date parsing.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use tracing::debug;

/// Ordered header map keyed by lower-cased name.
///
/// A repeated header replaces the earlier value but keeps its original
/// position, so iteration order is the order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header. The name is lower-cased; the last value for a name wins.
    pub fn insert(&mut self, name: &str, value: &str) {
        let key = name.trim().to_lowercase();
        let value = value.trim().to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Look up a header by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        let key = name.to_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a header, returning `""` when it is absent.
    pub fn get_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Append a folded continuation line to the header named `key`.
    fn append_to(&mut self, key: &str, continuation: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            if !entry.1.is_empty() {
                entry.1.push(' ');
            }
            entry.1.push_str(continuation.trim());
        }
    }
}

/// Split a block of text into its headers and its body.
///
/// Accepts `\n` and `\r\n` line endings. Blank lines before the first header
/// are skipped; the first blank line after it ends the header section. Lines
/// without a colon (or starting with one) are ignored. A line starting with
/// whitespace continues the previous header. Without a blank line the whole
/// block is headers and the body is empty. Body lines are re-joined with `\n`.
pub fn split_headers(block: &str) -> (HeaderMap, String) {
    let lines: Vec<&str> = block
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let mut headers = HeaderMap::new();
    let mut last_key: Option<String> = None;

    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            if headers.is_empty() {
                continue;
            }
            return (headers, lines[i + 1..].join("\n"));
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(key) = &last_key {
                headers.append_to(key, line);
                continue;
            }
        }

        match line.find(':') {
            Some(colon) if colon > 0 => {
                let key = line[..colon].trim().to_lowercase();
                headers.insert(&key, &line[colon + 1..]);
                last_key = Some(key);
            }
            // Malformed lines contribute nothing
            _ => {}
        }
    }

    (headers, String::new())
}

static BOUNDARY_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)boundary=(?:"([^"]+)"|([^;\s]+))"#).expect("valid boundary regex")
});

static FILENAME_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename=(?:"([^"]+)"|([^;\s]+))"#).expect("valid filename regex")
});

/// Extract the `boundary=` parameter (quoted or bare) from a `Content-Type` value.
pub fn boundary_param(content_type: &str) -> Option<String> {
    capture_param(&BOUNDARY_PARAM, content_type)
}

/// Extract the `filename=` parameter (quoted or bare) from a `Content-Disposition` value.
pub fn filename_param(disposition: &str) -> Option<String> {
    capture_param(&FILENAME_PARAM, disposition)
}

fn capture_param(re: &Regex, value: &str) -> Option<String> {
    let caps = re.captures(value)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Strip any `;`-separated parameters from a header value.
pub fn strip_params(value: &str) -> &str {
    value.split(';').next().unwrap_or("").trim()
}

/// Formats tried after RFC 2822 and RFC 3339, on the value without its weekday.
const DATE_FORMATS: [&str; 10] = [
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S",
    "%b %d %H:%M:%S %Y",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const NAMED_ZONES: [(&str, &str); 13] = [
    ("CEST", "+0200"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
    ("GMT", "+0000"),
    ("UTC", "+0000"),
    ("CET", "+0100"),
    ("JST", "+0900"),
];

/// Parse a `Date:` header value in RFC 2822, RFC 3339, or a common broken variant.
///
/// Returns `None` when nothing matches; the caller decides the fallback.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = strip_trailing_comment(value.trim());
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let bare = strip_weekday(trimmed);
    let zoned = replace_named_zone(bare);

    for candidate in [bare, zoned.as_str()] {
        for fmt in DATE_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(candidate, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(candidate, fmt) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }
    }

    debug!(date = trimmed, "Unparsable date header");
    None
}

/// Drop a trailing `(comment)` such as `+0000 (UTC)`.
fn strip_trailing_comment(s: &str) -> &str {
    if s.ends_with(')') {
        if let Some(open) = s.rfind('(') {
            return s[..open].trim_end();
        }
    }
    s
}

/// Drop a leading weekday such as `Thu, ` or `Thu `.
fn strip_weekday(s: &str) -> &str {
    const DAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
    for day in DAYS {
        if let Some(rest) = s.strip_prefix(day) {
            let rest = rest.strip_prefix(',').unwrap_or(rest);
            if rest.starts_with(' ') {
                return rest.trim_start();
            }
        }
    }
    s
}

/// Replace a trailing zone abbreviation with its numeric offset.
fn replace_named_zone(s: &str) -> String {
    for (name, offset) in NAMED_ZONES {
        if let Some(head) = s.strip_suffix(name) {
            return format!("{head}{offset}");
        }
    }
    s.to_string()
}
