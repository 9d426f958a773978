//! Mailbox extraction from address-list header values.

use std::sync::LazyLock;

use regex::Regex;

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^>]+)>").expect("valid bracket regex"));

static BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^<\s]+@[^>\s]+)").expect("valid address regex"));

/// Parse a comma-separated address list into bare mailbox strings.
///
/// Each token yields its `<...>` address if present, else the first
/// `local@domain` substring, else the trimmed token itself. Every token
/// yields one entry, so blank tokens yield `""`. An empty value yields an
/// empty list.
///
/// Commas are not quote-aware: `"Doe, Jane" <j@x.org>` yields two entries.
///
/// # Examples
/// - `"Jane Doe <jane@example.com>, bob@example.org"` → `["jane@example.com", "bob@example.org"]`
pub fn extract_addresses(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(extract_mailbox).collect()
}

/// Extract the mailbox from a single address token.
pub fn extract_mailbox(token: &str) -> String {
    if let Some(caps) = BRACKETED.captures(token) {
        return caps[1].trim().to_string();
    }
    if let Some(caps) = BARE.captures(token) {
        return caps[1].trim().to_string();
    }
    token.trim().to_string()
}

/// The first mailbox of an address list. A blank first entry counts as absent.
pub fn first_address(raw: &str) -> Option<String> {
    extract_addresses(raw)
        .into_iter()
        .next()
        .filter(|address| !address.is_empty())
}
