//! In-memory store of parsed messages with FIFO eviction.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{EmlError, Result};
use crate::model::mail::ParsedMessage;

/// Default number of messages kept before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 100;

/// Decoded attachment bytes ready to be served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDownload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AttachmentDownload {
    /// Value for a `Content-Disposition` response header.
    pub fn content_disposition(&self) -> String {
        format!(
            "attachment; filename=\"{}\"",
            self.filename.replace(['"', '\\', '\r', '\n'], "_")
        )
    }
}

#[derive(Default)]
struct Entries {
    by_id: HashMap<String, Arc<ParsedMessage>>,
    order: VecDeque<String>,
    sequence: u64,
}

/// Parsed messages keyed by opaque identifiers.
///
/// Once more than `capacity` messages are held, inserting evicts the oldest
/// insertion. A single mutex guards insert, evict, and lookup.
pub struct MessageStore {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl MessageStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a message and return its new identifier.
    pub fn insert(&self, message: ParsedMessage) -> String {
        let mut entries = self.lock();
        entries.sequence += 1;
        let id = message_id(entries.sequence, &message);

        entries.by_id.insert(id.clone(), Arc::new(message));
        entries.order.push_back(id.clone());

        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.by_id.remove(&oldest);
                debug!(id = %oldest, "Evicted oldest message");
            }
        }

        id
    }

    pub fn get(&self, id: &str) -> Option<Arc<ParsedMessage>> {
        self.lock().by_id.get(id).cloned()
    }

    /// Decode attachment `index` of message `id`.
    pub fn attachment(&self, id: &str, index: usize) -> Result<AttachmentDownload> {
        let message = self
            .get(id)
            .ok_or_else(|| EmlError::MessageNotFound(id.to_string()))?;
        let attachment =
            message
                .attachments
                .get(index)
                .ok_or_else(|| EmlError::AttachmentNotFound {
                    id: id.to_string(),
                    index,
                })?;

        Ok(AttachmentDownload {
            filename: attachment.filename.clone(),
            content_type: attachment.content_type.clone(),
            bytes: attachment.decoded()?,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // The map stays consistent even if a holder panicked.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Opaque identifier: SHA-256 over the insertion sequence and message identity.
fn message_id(sequence: u64, message: &ParsedMessage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    hasher.update(message.from.as_bytes());
    hasher.update(message.subject.as_bytes());
    hasher.update(message.date.to_rfc3339().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}
