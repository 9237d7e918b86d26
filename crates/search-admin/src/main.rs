//! search-admin
//!
//! Operational CLI for tenant-search indexes and reindex watermarks.
//!
//! # Usage
//!
//! ```bash
//! search-admin status
//! search-admin exists files
//! search-admin clear files [--keep-index]
//! search-admin watermark get files
//! search-admin watermark set files --at 2024-01-29T15:00:00Z
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/tenant-search/config.*)
//! 3. `--config` file
//! 4. Environment variables (SEARCH_*)
//! 5. CLI flags

use anyhow::Result;

use search_admin::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse_args()).await
}
