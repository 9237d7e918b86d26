//! Configuration loading for tenant-search.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/tenant-search/config.{toml,json,yaml}.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CoreError;

/// Main settings for the indexing engine and its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Search backend endpoint (Elasticsearch-compatible HTTP API)
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Basic-auth user for the backend
    #[serde(default)]
    pub username: Option<String>,

    /// Basic-auth password (prefer SEARCH_PASSWORD over the config file)
    #[serde(default)]
    pub password: Option<String>,

    /// Per-request timeout enforced by the backend transport
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Byte budget for document payloads held in one bulk group
    #[serde(default = "default_memory_limit_bytes")]
    pub memory_limit_bytes: u64,

    /// Ingest pipeline that extracts text from document payloads
    #[serde(default = "default_attachment_pipeline")]
    pub attachment_pipeline: String,

    /// Smallest id-range page requested during a reindex pass
    #[serde(default = "default_reindex_page_floor")]
    pub reindex_page_floor: i64,

    /// Path to the RocksDB watermark store
    #[serde(default = "default_watermark_db_path")]
    pub watermark_db_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_backend_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_memory_limit_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_attachment_pipeline() -> String {
    "attachments".to_string()
}

fn default_reindex_page_floor() -> i64 {
    1000
}

fn default_watermark_db_path() -> String {
    ProjectDirs::from("", "", "tenant-search")
        .map(|p| p.data_local_dir().join("watermarks"))
        .unwrap_or_else(|| PathBuf::from("./watermarks"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            username: None,
            password: None,
            request_timeout_secs: default_request_timeout_secs(),
            memory_limit_bytes: default_memory_limit_bytes(),
            attachment_pipeline: default_attachment_pipeline(),
            reindex_page_floor: default_reindex_page_floor(),
            watermark_db_path: default_watermark_db_path(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/tenant-search/config.*)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (SEARCH_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, CoreError> {
        let config_dir = ProjectDirs::from("", "", "tenant-search")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("backend_url", default_backend_url())
            .map_err(|e| CoreError::Config(e.to_string()))?
            .set_default("request_timeout_secs", default_request_timeout_secs() as i64)
            .map_err(|e| CoreError::Config(e.to_string()))?
            .set_default("memory_limit_bytes", default_memory_limit_bytes() as i64)
            .map_err(|e| CoreError::Config(e.to_string()))?
            .set_default("attachment_pipeline", default_attachment_pipeline())
            .map_err(|e| CoreError::Config(e.to_string()))?
            .set_default("reindex_page_floor", default_reindex_page_floor())
            .map_err(|e| CoreError::Config(e.to_string()))?
            .set_default("watermark_db_path", default_watermark_db_path())
            .map_err(|e| CoreError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| CoreError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // SEARCH_BACKEND_URL, SEARCH_MEMORY_LIMIT_BYTES, ...
        builder = builder.add_source(Environment::with_prefix("SEARCH").try_parsing(true));

        let config = builder
            .build()
            .map_err(|e| CoreError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| CoreError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.memory_limit_bytes == 0 {
            return Err(CoreError::Config(
                "memory_limit_bytes must be > 0".to_string(),
            ));
        }
        if self.reindex_page_floor <= 0 {
            return Err(CoreError::Config(format!(
                "reindex_page_floor must be > 0, got {}",
                self.reindex_page_floor
            )));
        }
        if self.attachment_pipeline.trim().is_empty() {
            return Err(CoreError::Config(
                "attachment_pipeline must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Expand ~ in the watermark path to the home directory.
    pub fn expanded_watermark_db_path(&self) -> PathBuf {
        if let Some(rest) = self.watermark_db_path.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                return PathBuf::from(home).join(rest);
            }
        }
        PathBuf::from(&self.watermark_db_path)
    }
}
