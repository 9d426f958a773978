//! Storage of parsed messages for the viewer service.

pub mod memory;

pub use memory::{AttachmentDownload, MessageStore};
