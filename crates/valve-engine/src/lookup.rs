//! Lookups against already-persisted rows
//!
//! Uniqueness and foreign-key checks need to see what earlier batches and
//! earlier tables committed. The validator only sees this trait; the store
//! implements it over SQLite and tests use `MemoryLookup`.

use std::collections::{HashMap, HashSet};

/// Errors that can occur when querying persisted rows
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Query failed: {0}")]
    QueryError(String),
}

/// Read access to persisted rows
pub trait ConstraintLookup {
    /// Whether `value` appears in `column` of the main table `table`
    fn value_exists(&self, table: &str, column: &str, value: &str) -> Result<bool, LookupError>;
}

/// In-memory rows, keyed by table and column
#[derive(Debug, Clone, Default)]
pub struct MemoryLookup {
    values: HashMap<(String, String), HashSet<String>>,
}

impl MemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` as persisted in `table.column`
    pub fn insert(&mut self, table: impl Into<String>, column: impl Into<String>, value: impl Into<String>) {
        self.values
            .entry((table.into(), column.into()))
            .or_default()
            .insert(value.into());
    }

    pub fn with(mut self, table: &str, column: &str, values: &[&str]) -> Self {
        for value in values {
            self.insert(table, column, *value);
        }
        self
    }
}

impl ConstraintLookup for MemoryLookup {
    fn value_exists(&self, table: &str, column: &str, value: &str) -> Result<bool, LookupError> {
        Ok(self
            .values
            .get(&(table.to_string(), column.to_string()))
            .is_some_and(|values| values.contains(value)))
    }
}
