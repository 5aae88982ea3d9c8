//! Store errors

use std::path::PathBuf;
use valve_core::ValveError;
use valve_engine::LookupError;

/// Errors that can occur loading into or exporting from a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Valve(#[from] ValveError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to open store '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Store '{}' does not exist", .0.display())]
    MissingStore(PathBuf),

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("'{path}' line {line}: record has {found} fields, header has {expected}")]
    ExtraFields {
        path: String,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed audit value in {table}.{column}: {source}")]
    Meta {
        table: String,
        column: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
