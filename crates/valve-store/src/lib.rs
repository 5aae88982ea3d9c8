//! SQLite storage for validated tables
//!
//! This crate handles:
//! - Deriving main/conflict tables and union views from table schemas
//! - Encoding each cell's validation outcome in its `_meta` audit column
//! - Chunked, conflict-aware loading (validate, partition, commit)
//! - Round-trip export back to delimited files plus `message.tsv`
//! - Reading control tables back out of a store

pub mod ddl;
pub mod error;
pub mod exporter;
pub mod loader;
pub mod meta;
pub mod source;
pub mod store;

pub use error::StoreError;
pub use exporter::{export_path, ExportSummary, Exporter, TableReader};
pub use loader::{load_path, Loader};
pub use meta::CellMeta;
pub use source::StoreSource;
pub use store::SqliteStore;
