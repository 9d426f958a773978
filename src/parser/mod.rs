//! Email parsing: header tokenizing, transfer decoding, multipart decomposition.

pub mod decode;
pub mod eml;
pub mod header;
pub mod mime;

pub use eml::{parse, Clock, EmlParser, FixedClock, SystemClock};
