//! Command implementations for search-admin.
//!
//! Handles:
//! - status: effective configuration and stored watermarks
//! - exists / flush / refresh: direct index operations on the backend
//! - clear: drop an index and its watermark
//! - watermark: get, set, delete and list reindex watermarks

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use search_backend::{ElasticBackend, ElasticConfig, SearchBackend};
use search_engine::EngineConfig;
use search_storage::Storage;
use search_types::{IndexWatermark, Settings};

use crate::cli::{Cli, Commands, WatermarkCommands};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    Ok(apply_overrides(settings, cli))
}

fn apply_overrides(mut settings: Settings, cli: &Cli) -> Settings {
    if let Some(url) = &cli.backend_url {
        settings.backend_url = url.clone();
    }
    if let Some(path) = &cli.db_path {
        settings.watermark_db_path = path.clone();
    }
    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }
    settings
}

/// Initialize tracing; `RUST_LOG` wins over the configured level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Open the watermark store, creating parent directories if needed.
pub fn open_storage(settings: &Settings) -> Result<Storage> {
    let db_path = settings.expanded_watermark_db_path();
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("Failed to create watermark directory")?;
    }
    info!("Opening watermark storage at {:?}", db_path);
    Storage::open(&db_path).context("Failed to open watermark storage")
}

fn connect_backend(settings: &Settings) -> Result<Arc<dyn SearchBackend>> {
    let backend = ElasticBackend::new(ElasticConfig::from_settings(settings))
        .context("Failed to create backend client")?;
    Ok(Arc::new(backend))
}

/// Dispatch a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    init_logging(&settings.log_level)?;

    match cli.command {
        Commands::Status => {
            let storage = open_storage(&settings)?;
            show_status(&settings, &storage)
        }
        Commands::Exists { index } => {
            let backend = connect_backend(&settings)?;
            let exists = check_exists(backend.as_ref(), &index).await?;
            println!("{}: {}", index, if exists { "exists" } else { "missing" });
            Ok(())
        }
        Commands::Flush { index } => {
            let backend = connect_backend(&settings)?;
            backend
                .flush(&index)
                .await
                .with_context(|| format!("Failed to flush {}", index))?;
            println!("Flushed {}", index);
            Ok(())
        }
        Commands::Refresh { index } => {
            let backend = connect_backend(&settings)?;
            backend
                .refresh(&index)
                .await
                .with_context(|| format!("Failed to refresh {}", index))?;
            println!("Refreshed {}", index);
            Ok(())
        }
        Commands::Clear { index, keep_index } => {
            let backend = connect_backend(&settings)?;
            let storage = open_storage(&settings)?;
            clear_index(backend.as_ref(), &storage, &index, keep_index).await?;
            println!("Cleared {}", index);
            Ok(())
        }
        Commands::Watermark { command } => {
            let storage = open_storage(&settings)?;
            handle_watermark(&storage, command)
        }
    }
}

/// Print the effective configuration and every stored watermark.
pub fn show_status(settings: &Settings, storage: &Storage) -> Result<()> {
    let engine = EngineConfig::from_settings(settings);
    println!("Backend:           {}", settings.backend_url);
    println!("Request timeout:   {}s", settings.request_timeout_secs);
    println!("Memory limit:      {} bytes", engine.memory_limit_bytes);
    println!("Attachment pipeline: {}", engine.attachment_pipeline);
    println!("Reindex page floor: {}", engine.reindex_page_floor);
    println!("Watermark store:   {:?}", settings.expanded_watermark_db_path());

    let watermarks = storage.list_watermarks().context("Failed to list watermarks")?;
    println!();
    println!("Watermarks: {}", watermarks.len());
    for watermark in watermarks {
        println!("  {}", format_watermark(&watermark));
    }
    Ok(())
}

/// Probe the backend directly; unlike the engine, errors are reported.
pub async fn check_exists(backend: &dyn SearchBackend, index: &str) -> Result<bool> {
    backend
        .index_exists(index)
        .await
        .with_context(|| format!("Failed to probe {}", index))
}

/// Forget the watermark and (unless `keep_index`) delete the backend index.
///
/// This process holds no existence cache. Running engines keep their cached
/// entry until a `ClearIndexAction` for the index reaches their bus; until
/// then their writes recreate the index without its declared mapping.
pub async fn clear_index(
    backend: &dyn SearchBackend,
    storage: &Storage,
    index: &str,
    keep_index: bool,
) -> Result<()> {
    storage
        .delete_watermark(index)
        .with_context(|| format!("Failed to delete watermark of {}", index))?;
    if !keep_index {
        backend
            .delete_index(index)
            .await
            .with_context(|| format!("Failed to delete index {}", index))?;
    }
    info!(index, keep_index, "Index cleared");
    Ok(())
}

/// Run a watermark subcommand against the store.
pub fn handle_watermark(storage: &Storage, command: WatermarkCommands) -> Result<()> {
    match command {
        WatermarkCommands::Get { index } => {
            match storage.get_watermark(&index).context("Failed to read watermark")? {
                Some(watermark) => println!("{}", format_watermark(&watermark)),
                None => println!("{}: no watermark (next reindex starts from scratch)", index),
            }
        }
        WatermarkCommands::Set { index, at } => {
            let last_modified = match at {
                Some(ts) => parse_timestamp(&ts)?,
                None => Utc::now(),
            };
            let watermark = IndexWatermark::new(&index, last_modified);
            storage
                .put_watermark(&watermark)
                .context("Failed to store watermark")?;
            println!("{}", format_watermark(&watermark));
        }
        WatermarkCommands::Delete { index } => {
            storage
                .delete_watermark(&index)
                .context("Failed to delete watermark")?;
            println!("Deleted watermark of {}", index);
        }
        WatermarkCommands::List => {
            for watermark in storage.list_watermarks().context("Failed to list watermarks")? {
                println!("{}", format_watermark(&watermark));
            }
        }
    }
    Ok(())
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp (expected RFC 3339): {}", value))
}

fn format_watermark(watermark: &IndexWatermark) -> String {
    format!(
        "{}\t{}",
        watermark.index_name,
        watermark.last_modified.to_rfc3339()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use search_backend::{IndexDefinition, MemoryBackend};
    use search_types::IndexMapping;
    use tempfile::TempDir;

    fn storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::parse_from([
            "search-admin",
            "--backend-url",
            "http://es:9200",
            "--db-path",
            "/var/lib/wm",
            "status",
        ]);
        let settings = apply_overrides(Settings::default(), &cli);
        assert_eq!(settings.backend_url, "http://es:9200");
        assert_eq!(settings.watermark_db_path, "/var/lib/wm");
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2024-01-29T17:00:00+02:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-29T15:00:00+00:00");
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_watermark_set_get_delete() {
        let (storage, _temp) = storage();
        handle_watermark(
            &storage,
            WatermarkCommands::Set {
                index: "files".to_string(),
                at: Some("2024-01-29T15:00:00Z".to_string()),
            },
        )
        .unwrap();
        let stored = storage.get_watermark("files").unwrap().unwrap();
        assert_eq!(stored.last_modified, parse_timestamp("2024-01-29T15:00:00Z").unwrap());

        handle_watermark(&storage, WatermarkCommands::List).unwrap();
        handle_watermark(
            &storage,
            WatermarkCommands::Delete {
                index: "files".to_string(),
            },
        )
        .unwrap();
        assert!(storage.get_watermark("files").unwrap().is_none());
    }

    #[test]
    fn test_watermark_set_rejects_bad_timestamp() {
        let (storage, _temp) = storage();
        let result = handle_watermark(
            &storage,
            WatermarkCommands::Set {
                index: "files".to_string(),
                at: Some("not a time".to_string()),
            },
        );
        assert!(result.is_err());
        assert!(storage.get_watermark("files").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_index() {
        let (storage, _temp) = storage();
        let backend = MemoryBackend::new();
        backend
            .create_index(&IndexDefinition::new("files", IndexMapping::new()))
            .await
            .unwrap();
        storage
            .put_watermark(&IndexWatermark::now("files"))
            .unwrap();

        clear_index(&backend, &storage, "files", false).await.unwrap();

        assert!(!check_exists(&backend, "files").await.unwrap());
        assert!(storage.get_watermark("files").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_keep_index() {
        let (storage, _temp) = storage();
        let backend = MemoryBackend::new();
        backend
            .create_index(&IndexDefinition::new("files", IndexMapping::new()))
            .await
            .unwrap();
        storage.put_watermark(&IndexWatermark::now("files")).unwrap();

        clear_index(&backend, &storage, "files", true).await.unwrap();
        assert!(check_exists(&backend, "files").await.unwrap());
        assert!(storage.get_watermark("files").unwrap().is_none());
    }

    #[test]
    fn test_show_status() {
        let (storage, _temp) = storage();
        storage.put_watermark(&IndexWatermark::now("mail")).unwrap();
        assert!(show_status(&Settings::default(), &storage).is_ok());
    }
}
