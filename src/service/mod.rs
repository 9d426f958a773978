//! Transport-agnostic viewer service: upload, store, render, and download.
//!
//! Each operation corresponds to one endpoint of an upload-and-view web
//! service. Only [`ViewerService::health`] and [`ViewerService::viewer_page`]
//! are open; everything else requires the bearer token.

pub mod auth;

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{EmlError, Result};
use crate::export::html;
use crate::model::mail::ParsedMessage;
use crate::parser::eml::{decode_message_bytes, EmlParser};
use crate::store::{AttachmentDownload, MessageStore};

use auth::BearerAuth;

/// Accepted upload extension.
const EML_EXTENSION: &str = "eml";

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Health {
    pub status: &'static str,
    pub stored_messages: usize,
}

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub id: String,
    pub message: Arc<ParsedMessage>,
    pub page: String,
}

pub struct ViewerService {
    parser: EmlParser,
    store: MessageStore,
    auth: BearerAuth,
    max_message_size: usize,
}

impl ViewerService {
    pub fn new(config: &Config) -> Self {
        if config.service.api_token.is_none() {
            warn!("No API token configured, authenticated operations will be refused");
        }
        Self {
            parser: EmlParser::new().max_depth(config.parser.max_depth),
            store: MessageStore::new(config.service.store_capacity),
            auth: BearerAuth::new(config.service.api_token.clone()),
            max_message_size: config.service.max_message_size,
        }
    }

    pub fn health(&self) -> Health {
        Health {
            status: "ok",
            stored_messages: self.store.len(),
        }
    }

    /// Validate, parse, and store an uploaded `.eml` file.
    pub fn upload(
        &self,
        authorization: Option<&str>,
        filename: &str,
        bytes: &[u8],
    ) -> Result<Upload> {
        self.auth.check(authorization)?;

        let is_eml = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(EML_EXTENSION));
        if !is_eml {
            return Err(EmlError::InvalidUpload(format!(
                "only .eml files are accepted, got '{filename}'"
            )));
        }
        if bytes.len() > self.max_message_size {
            return Err(EmlError::InvalidUpload(format!(
                "{} bytes exceeds the {} byte limit",
                bytes.len(),
                self.max_message_size
            )));
        }

        let message = self.parser.parse(&decode_message_bytes(bytes))?;
        let id = self.store.insert(message);
        let message = self
            .store
            .get(&id)
            .ok_or_else(|| EmlError::MessageNotFound(id.clone()))?;
        let page = html::viewer_page(&id, &message);

        info!(
            id = %id,
            filename,
            attachments = message.attachments.len(),
            "Stored uploaded message"
        );
        Ok(Upload { id, message, page })
    }

    pub fn message(&self, authorization: Option<&str>, id: &str) -> Result<Arc<ParsedMessage>> {
        self.auth.check(authorization)?;
        self.store
            .get(id)
            .ok_or_else(|| EmlError::MessageNotFound(id.to_string()))
    }

    pub fn attachment(
        &self,
        authorization: Option<&str>,
        id: &str,
        index: usize,
    ) -> Result<AttachmentDownload> {
        self.auth.check(authorization)?;
        self.store.attachment(id, index)
    }

    /// Render the viewer page of a stored message.
    pub fn viewer_page(&self, id: &str) -> Result<String> {
        let message = self
            .store
            .get(id)
            .ok_or_else(|| EmlError::MessageNotFound(id.to_string()))?;
        Ok(html::viewer_page(id, &message))
    }
}
