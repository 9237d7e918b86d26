//! Column family definitions for RocksDB.
//!
//! - watermarks: last completed reindex pass per index (point lookups)

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for reindex watermarks
pub const CF_WATERMARKS: &str = "watermarks";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_WATERMARKS];

/// Watermarks are tiny and read by exact key
fn watermarks_options() -> Options {
    let mut opts = Options::default();
    opts.optimize_for_point_lookup(8);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![ColumnFamilyDescriptor::new(
        CF_WATERMARKS,
        watermarks_options(),
    )]
}
