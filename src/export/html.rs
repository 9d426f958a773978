//! HTML viewer page and HTML-to-text conversion.

use std::fmt::Write;

use humansize::{format_size, BINARY};

use crate::model::mail::ParsedMessage;

/// Render the browser viewer page for a stored message.
///
/// Every header value is escaped. An HTML body is shown inside a sandboxed
/// `iframe` via `srcdoc`, so its scripts and styles cannot reach the page;
/// otherwise the plain-text body is shown in a `<pre>`. Attachments link to
/// `/download/<id>/<index>`.
pub fn viewer_page(id: &str, message: &ParsedMessage) -> String {
    let mut page = String::with_capacity(message.html.len() + message.text.len() + 2048);

    let _ = write!(
        page,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
         <style>body{{font-family:sans-serif;margin:2em}}dt{{font-weight:bold}}\
         iframe{{width:100%;min-height:60vh;border:1px solid #ccc}}</style>\n</head>\n<body>\n",
        escape(&message.subject)
    );

    let to = message.to.join(", ");
    let _ = write!(
        page,
        "<h1>{}</h1>\n<dl>\n<dt>From</dt><dd>{}</dd>\n<dt>To</dt><dd>{}</dd>\n\
         <dt>Date</dt><dd>{}</dd>\n</dl>\n",
        escape(&message.subject),
        escape(&message.from),
        escape(&to),
        message.date.format("%a, %d %b %Y %H:%M:%S %z")
    );

    if message.has_html() {
        let _ = writeln!(
            page,
            "<iframe sandbox=\"\" srcdoc=\"{}\"></iframe>",
            escape(&message.html)
        );
    } else {
        let _ = writeln!(page, "<pre>{}</pre>", escape(&message.text));
    }

    if !message.attachments.is_empty() {
        let _ = writeln!(
            page,
            "<h2>Attachments ({})</h2>\n<ul>",
            message.attachments.len()
        );
        for (index, att) in message.attachments.iter().enumerate() {
            let _ = writeln!(
                page,
                "<li><a href=\"/download/{}/{}\">{}</a> ({}, {})</li>",
                escape(id),
                index,
                escape(&att.filename),
                escape(&att.content_type),
                format_size(att.size, BINARY)
            );
        }
        page.push_str("</ul>\n");
    }

    page.push_str("</body>\n</html>\n");
    page
}

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Convert HTML to plain text for terminal display.
///
/// - Preserves line breaks from `<br>`, `<p>`, `<div>`
/// - Removes scripts and styles
/// - Decodes common HTML entities
pub fn html_to_text(html: &str) -> String {
    let mut text = remove_tag_block(html, "script");
    text = remove_tag_block(&text, "style");

    for tag in ["br", "br/", "br /"] {
        text = text.replace(&format!("<{tag}>"), "\n");
        text = text.replace(&format!("<{}>", tag.to_uppercase()), "\n");
    }
    for tag in ["p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6"] {
        let upper = tag.to_uppercase();
        text = text.replace(&format!("<{tag}>"), "\n");
        text = text.replace(&format!("<{tag} "), "\n<");
        text = text.replace(&format!("<{upper}>"), "\n");
        text = text.replace(&format!("</{tag}>"), "\n");
        text = text.replace(&format!("</{upper}>"), "\n");
    }

    let mut stripped = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => stripped.push(ch),
            _ => {}
        }
    }

    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    // Collapse runs of blank lines into one
    let mut prev_was_blank = false;
    let mut cleaned = String::with_capacity(decoded.len());
    for line in decoded.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }

    cleaned.trim().to_string()
}

/// Remove an entire tag block (e.g. `<script>…</script>`), case-insensitively.
fn remove_tag_block(html: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    // ASCII lower-casing keeps byte offsets aligned with `html`.
    let lower = html.to_ascii_lowercase();

    let mut result = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some(start) = lower[pos..].find(&open) {
        let start = pos + start;
        result.push_str(&html[pos..start]);
        match lower[start..].find(&close) {
            Some(end) => pos = start + end + close.len(),
            None => {
                pos = html.len();
                break;
            }
        }
    }
    result.push_str(&html[pos..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attachment::Attachment;
    use chrono::{TimeZone, Utc};

    fn message(text: &str, html: &str) -> ParsedMessage {
        ParsedMessage {
            from: "ann@example.com".to_string(),
            to: vec!["bob@example.com".to_string(), "cy@example.com".to_string()],
            subject: "Report <Q1> & more".to_string(),
            date: Utc.with_ymd_and_hms(2024, 1, 4, 10, 0, 0).unwrap(),
            text: text.to_string(),
            html: html.to_string(),
            attachments: vec![Attachment {
                filename: "q1.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                size: 2048,
                content: String::new(),
            }],
        }
    }

    #[test]
    fn test_viewer_page_escapes_headers() {
        let page = viewer_page("abc", &message("body", ""));
        assert!(page.contains("<title>Report &lt;Q1&gt; &amp; more</title>"));
        assert!(page.contains("bob@example.com, cy@example.com"));
        assert!(page.contains("<pre>body</pre>"));
        assert!(page.contains("Thu, 04 Jan 2024 10:00:00 +0000"));
    }

    #[test]
    fn test_viewer_page_sandboxes_html() {
        let page = viewer_page("abc", &message("", "<p class=\"x\">Hi</p>"));
        assert!(page.contains("<iframe sandbox=\"\" srcdoc=\"&lt;p class=&quot;x&quot;&gt;Hi&lt;/p&gt;\">"));
        assert!(!page.contains("<pre>"));
    }

    #[test]
    fn test_viewer_page_lists_attachments() {
        let page = viewer_page("abc", &message("x", ""));
        assert!(page.contains("<a href=\"/download/abc/0\">q1.pdf</a> (application/pdf, 2 KiB)"));
    }

    #[test]
    fn test_html_to_text_basic() {
        let text = html_to_text("<p>Hello <b>world</b></p><p>Second paragraph</p>");
        assert!(text.contains("Hello world"));
        assert!(text.contains("Second paragraph"));
    }

    #[test]
    fn test_html_to_text_entities() {
        assert_eq!(html_to_text("Tom &amp; Jerry &lt;3&gt;"), "Tom & Jerry <3>");
        assert_eq!(html_to_text("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_html_to_text_removes_scripts() {
        assert_eq!(html_to_text("Before<SCRIPT>alert('x')</script>After"), "BeforeAfter");
        assert_eq!(html_to_text("a<style>p{}</style>b"), "ab");
    }
}
