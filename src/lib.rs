//! `emlview`: parse `.eml` messages into a structured, viewable form.
//!
//! The core is [`parser::parse`]: it tokenizes headers, walks nested
//! multipart bodies, undoes quoted-printable and base64 transfer encodings,
//! and extracts sender, recipients, subject, date, text and HTML bodies, and
//! attachments. The remaining modules wrap it into an upload-and-view
//! service: a bounded message store, bearer-token auth, and an HTML viewer.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod service;
pub mod store;

pub use error::{EmlError, Result};
pub use model::mail::ParsedMessage;
pub use parser::parse;
