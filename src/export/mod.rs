//! Export functionality: attachments to disk and the HTML viewer page.

pub mod attachment;
pub mod html;
