//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$EMLVIEW_CONFIG` (environment variable)
//! 2. `~/.config/emlview/config.toml` (Linux/macOS)
//!    `%APPDATA%\emlview\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! `$EMLVIEW_API_TOKEN` overrides `service.api_token` wherever the file came from.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::parser::mime::DEFAULT_MAX_DEPTH;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "EMLVIEW_CONFIG";

/// Environment variable carrying the service's shared bearer secret.
pub const API_TOKEN_ENV: &str = "EMLVIEW_API_TOKEN";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Message parser limits.
    pub parser: ParserConfig,
    /// Viewer service settings.
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum multipart nesting depth before a parse is rejected.
    pub max_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Number of parsed messages kept before the oldest is evicted.
    pub store_capacity: usize,
    /// Largest accepted upload in bytes (default: 26214400 = 25 MB).
    pub max_message_size: usize,
    /// Shared bearer secret. Uploads and reads are refused while unset.
    pub api_token: Option<String>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_capacity: 100,
            max_message_size: 25 * 1024 * 1024, // 25 MB
            api_token: None,
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    let mut config = read_config_file().unwrap_or_default();
    if let Ok(token) = std::env::var(API_TOKEN_ENV) {
        if !token.trim().is_empty() {
            config.service.api_token = Some(token.trim().to_string());
        }
    }
    config
}

fn read_config_file() -> Option<Config> {
    let path = config_file_path()?;
    if !path.exists() {
        return None;
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str::<Config>(&contents) {
            Ok(cfg) => {
                tracing::info!(path = %path.display(), "Loaded config");
                Some(cfg)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse config, using defaults"
                );
                None
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            None
        }
    }
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("emlview").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("emlview")
}
