//! search-admin library exports.
//!
//! This crate provides the operational CLI for tenant-search.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (status, exists, clear, watermark, ...)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, WatermarkCommands};
pub use commands::{
    check_exists, clear_index, handle_watermark, init_logging, load_settings, open_storage,
    parse_timestamp, run, show_status,
};
