//! Write decoded attachments to disk.

use std::path::{Path, PathBuf};

use crate::error::{EmlError, Result};
use crate::model::attachment::Attachment;
use crate::model::mail::ParsedMessage;

/// Decode a single attachment and write it into `output_dir`.
///
/// The filename is sanitized and made unique within the directory.
pub fn export_attachment(attachment: &Attachment, output_dir: &Path) -> Result<PathBuf> {
    let data = attachment.decoded()?;
    let filename = sanitize_filename_part(&attachment.filename, 150);
    let path = unique_path(&output_dir.join(&filename));
    std::fs::write(&path, &data).map_err(|e| EmlError::io(&path, e))?;
    Ok(path)
}

/// Extract every attachment of a message.
///
/// An attachment that fails to decode is logged and skipped.
pub fn export_attachments(message: &ParsedMessage, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir).map_err(|e| EmlError::io(output_dir, e))?;
    let mut paths = Vec::with_capacity(message.attachments.len());

    for attachment in &message.attachments {
        match export_attachment(attachment, output_dir) {
            Ok(path) => paths.push(path),
            Err(e @ EmlError::DecodeFailure(_)) => {
                tracing::warn!(
                    filename = %attachment.filename,
                    error = %e,
                    "Failed to export attachment"
                );
            }
            Err(e) => return Err(e),
        }
    }

    Ok(paths)
}

/// Sanitize a string for use in filenames.
///
/// Replaces invalid characters with `_` and truncates to `max_len`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "attachment".to_string()
    } else {
        sanitized
    }
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    for i in 1..1000 {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
    }

    parent.join(format!("{stem}_dup.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn attachment(filename: &str, content: &str) -> Attachment {
        Attachment {
            filename: filename.to_string(),
            content_type: "application/octet-stream".to_string(),
            size: 0,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename_part("hello world.pdf", 20), "hello_world.pdf");
        assert_eq!(sanitize_filename_part("../../etc/passwd", 30), ".._.._etc_passwd");
        assert_eq!(sanitize_filename_part("a/b\\c:d*e", 20), "a_b_c_d_e");
        assert_eq!(sanitize_filename_part("", 20), "attachment");
        assert_eq!(sanitize_filename_part("..", 20), "attachment");
    }

    #[test]
    fn test_export_dedupes_names() {
        let tmp = tempfile::tempdir().unwrap();
        let message = ParsedMessage {
            from: "a@b.c".to_string(),
            to: vec![],
            subject: "s".to_string(),
            date: Utc::now(),
            text: String::new(),
            html: String::new(),
            attachments: vec![attachment("a.txt", "SGk="), attachment("a.txt", "SG8=")],
        };

        let paths = export_attachments(&message, tmp.path()).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].file_name().unwrap(), "a.txt");
        assert_eq!(paths[1].file_name().unwrap(), "a_1.txt");
        assert_eq!(std::fs::read(&paths[0]).unwrap(), b"Hi");
        assert_eq!(std::fs::read(&paths[1]).unwrap(), b"Ho");
    }

    #[test]
    fn test_export_skips_undecodable() {
        let tmp = tempfile::tempdir().unwrap();
        let message = ParsedMessage {
            from: "a@b.c".to_string(),
            to: vec![],
            subject: "s".to_string(),
            date: Utc::now(),
            text: String::new(),
            html: String::new(),
            attachments: vec![attachment("bad.bin", "!!!"), attachment("ok.bin", "AAE=")],
        };

        let paths = export_attachments(&message, tmp.path()).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(std::fs::read(&paths[0]).unwrap(), vec![0u8, 1]);
    }
}
