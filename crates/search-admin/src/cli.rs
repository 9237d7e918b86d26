//! CLI argument parsing for search-admin.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// tenant-search administration
///
/// Inspect and maintain search indexes and their reindex watermarks.
#[derive(Parser, Debug)]
#[command(name = "search-admin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/tenant-search/config.*)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the search backend URL
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Override the watermark database path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show effective configuration and stored watermarks
    Status,

    /// Check whether an index exists on the backend
    Exists {
        /// Index name
        index: String,
    },

    /// Persist buffered writes of an index
    Flush {
        /// Index name
        index: String,
    },

    /// Make all writes of an index visible to search
    Refresh {
        /// Index name
        index: String,
    },

    /// Delete an index and its watermark so the next run reindexes from scratch
    Clear {
        /// Index name
        index: String,

        /// Skip deleting the backend index, only forget the watermark
        #[arg(long)]
        keep_index: bool,
    },

    /// Reindex watermark management
    Watermark {
        #[command(subcommand)]
        command: WatermarkCommands,
    },
}

/// Watermark subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum WatermarkCommands {
    /// Show the watermark of an index
    Get {
        /// Index name
        index: String,
    },

    /// Set the watermark of an index
    Set {
        /// Index name
        index: String,

        /// RFC 3339 timestamp (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Delete the watermark of an index
    Delete {
        /// Index name
        index: String,
    },

    /// List every stored watermark
    List,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
