//! Core data model types: parsed messages, addresses, and attachments.

pub mod address;
pub mod attachment;
pub mod mail;
