//! Control tables read back out of a store
//!
//! The control tables are loaded like any other table, so an export can
//! recompile the configuration without the original files. Values come back
//! as originally written, audit values included.

use crate::exporter::read_table;
use crate::store::SqliteStore;
use valve_core::ConfigError;
use valve_schema::{ControlSource, ControlTable};

/// Reads control tables from a loaded store
pub struct StoreSource<'s> {
    store: &'s SqliteStore,
}

impl<'s> StoreSource<'s> {
    pub fn new(store: &'s SqliteStore) -> Self {
        Self { store }
    }
}

impl ControlSource for StoreSource<'_> {
    fn read(&self, name: &str, _path: &str) -> Result<ControlTable, ConfigError> {
        let read_error = |message: String| ConfigError::Read {
            path: name.to_string(),
            message,
        };

        let exists = self.store.has_table(name).map_err(|e| read_error(e.to_string()))?;
        if !exists {
            return Err(read_error(format!("no table '{name}' in store")));
        }

        let table = read_table(self.store, name).map_err(|e| read_error(e.to_string()))?;
        if table.rows.is_empty() {
            return Err(ConfigError::Empty {
                path: name.to_string(),
            });
        }

        let rows = table
            .rows
            .into_iter()
            .map(|values| table.header.iter().cloned().zip(values).collect())
            .collect();

        Ok(ControlTable {
            source: name.to_string(),
            columns: table.header,
            rows,
        })
    }

    /// Paths in a store are the ones loaded from, not the store itself
    fn checks_table_path(&self) -> bool {
        false
    }
}
