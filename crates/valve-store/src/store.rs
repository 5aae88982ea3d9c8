//! SQLite store

use crate::ddl;
use crate::error::StoreError;
use rusqlite::types::Value;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::debug;
use valve_core::TableSchema;
use valve_engine::{ConstraintLookup, LookupError};

/// SQLite's default bound-parameter limit
const MAX_PARAMETERS: usize = 32766;

/// A relational store holding loaded tables
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open a store for loading, creating it if needed
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an existing store
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::MissingStore(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
            .map_err(|source| StoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    /// File backing the store, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Drop and recreate the main table, conflict table, and view
    pub fn create_tables(&self, schema: &TableSchema) -> Result<(), StoreError> {
        for sql in ddl::table_script(schema) {
            debug!("{sql}");
            self.conn.execute_batch(&sql)?;
        }
        Ok(())
    }

    /// Insert rows into `table` inside one transaction
    ///
    /// Each row holds one value per entry of `columns`. Rows are split
    /// across statements only to stay under the parameter limit.
    pub fn insert_batch(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Option<String>>],
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        insert_rows(&tx, table, columns, rows)?;
        tx.commit()?;
        Ok(())
    }

    /// Insert into two tables, committing both together
    pub fn insert_partitioned(
        &mut self,
        columns: &[String],
        partitions: [(&str, &[Vec<Option<String>>]); 2],
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        for (table, rows) in partitions {
            insert_rows(&tx, table, columns, rows)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Whether a table or view named `name` exists
    pub fn has_table(&self, name: &str) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
                [name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Column names of `table` in storage order
    pub fn columns(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} LIMIT 0", ddl::quote(table)))?;
        Ok(stmt.column_names().into_iter().map(str::to_string).collect())
    }

    /// Pass every row of `table` to `f` in storage order, one at a time
    pub fn for_each_row<F>(&self, table: &str, mut f: F) -> Result<(), StoreError>
    where
        F: FnMut(&[Value]) -> Result<(), StoreError>,
    {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", ddl::quote(table)))?;
        let width = stmt.column_count();
        let rows = stmt.query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<Value>>>()
        })?;
        for values in rows {
            f(&values?)?;
        }
        Ok(())
    }
}

fn insert_rows(
    conn: &Connection,
    table: &str,
    columns: &[String],
    rows: &[Vec<Option<String>>],
) -> Result<(), StoreError> {
    if rows.is_empty() || columns.is_empty() {
        return Ok(());
    }

    let per_statement = (MAX_PARAMETERS / columns.len()).max(1);
    for group in rows.chunks(per_statement) {
        let sql = ddl::insert(table, columns, group.len());
        debug!("{sql}");
        conn.execute(&sql, rusqlite::params_from_iter(group.iter().flatten()))?;
    }
    Ok(())
}

impl ConstraintLookup for SqliteStore {
    fn value_exists(&self, table: &str, column: &str, value: &str) -> Result<bool, LookupError> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} = ?1 LIMIT 1",
            ddl::quote(table),
            ddl::quote(column)
        );
        self.conn
            .query_row(&sql, [value], |_| Ok(()))
            .optional()
            .map(|found| found.is_some())
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(_, Some(ref message)) if message.starts_with("no such table") => {
                    LookupError::TableNotFound(table.to_string())
                }
                other => LookupError::QueryError(other.to_string()),
            })
    }
}

/// Text form of a stored value, as written to exported files
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(n) => n.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use valve_core::{ColumnSchema, Constraints, StorageAffinity};

    fn schema() -> TableSchema {
        let column = |name: &str, affinity| ColumnSchema {
            name: name.into(),
            datatype: "text".into(),
            affinity,
            nulltype: None,
            checks: Vec::new(),
            primary: false,
            unique: name == "id",
        };
        TableSchema {
            name: "things".into(),
            path: "things.tsv".into(),
            columns: vec![column("id", StorageAffinity::Integer), column("name", StorageAffinity::Text)],
            constraints: Constraints {
                unique: vec!["id".into()],
                ..Constraints::default()
            },
        }
    }

    fn columns() -> Vec<String> {
        ddl::storage_columns(&schema())
    }

    fn all_rows(store: &SqliteStore, table: &str) -> Vec<Vec<Value>> {
        let mut rows = Vec::new();
        store
            .for_each_row(table, |values| {
                rows.push(values.to_vec());
                Ok(())
            })
            .unwrap();
        rows
    }

    #[test]
    fn create_insert_and_read_back() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.create_tables(&schema()).unwrap();
        assert!(store.has_table("things").unwrap());
        assert!(store.has_table("things_conflict").unwrap());
        assert!(store.has_table("things_view").unwrap());
        assert_eq!(store.columns("things").unwrap(), columns());

        let row = |id: &str, name: Option<&str>| {
            vec![Some(id.to_string()), None, name.map(Into::into), None]
        };
        let main = vec![row("1", Some("a")), row("2", None)];
        let conflict = vec![row("2", Some("c"))];
        store
            .insert_partitioned(
                &columns(),
                [("things", main.as_slice()), ("things_conflict", conflict.as_slice())],
            )
            .unwrap();

        let rows = all_rows(&store, "things");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], Value::Integer(1));
        assert_eq!(rows[1][2], Value::Null);
        assert_eq!(all_rows(&store, "things_view").len(), 3);
    }

    #[test]
    fn lookup_uses_column_affinity() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.create_tables(&schema()).unwrap();
        store
            .insert_batch("things", &columns(), &[vec![Some("7".into()), None, None, None]])
            .unwrap();

        assert!(store.value_exists("things", "id", "7").unwrap());
        assert!(!store.value_exists("things", "id", "8").unwrap());
        assert!(!store.value_exists("things", "name", "7").unwrap());
        assert!(matches!(
            store.value_exists("nowhere", "id", "7"),
            Err(LookupError::TableNotFound(_))
        ));
    }

    #[test]
    fn large_batches_are_split() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.create_tables(&schema()).unwrap();
        let rows: Vec<Vec<Option<String>>> = (0..10_000)
            .map(|i| vec![Some(i.to_string()), None, Some(format!("n{i}")), None])
            .collect();
        store.insert_batch("things", &columns(), &rows).unwrap();
        assert_eq!(all_rows(&store, "things").len(), 10_000);
    }

    #[test]
    fn row_callback_errors_stop_the_scan() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.create_tables(&schema()).unwrap();
        let rows: Vec<Vec<Option<String>>> = (0..5)
            .map(|i| vec![Some(i.to_string()), None, None, None])
            .collect();
        store.insert_batch("things", &columns(), &rows).unwrap();

        let mut seen = 0;
        let result = store.for_each_row("things", |_| {
            seen += 1;
            if seen == 2 {
                return Err(StoreError::MissingStore("stop".into()));
            }
            Ok(())
        });
        assert!(matches!(result, Err(StoreError::MissingStore(_))));
        assert_eq!(seen, 2);
    }

    #[test]
    fn opening_a_missing_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        assert!(matches!(SqliteStore::open(&path), Err(StoreError::MissingStore(_))));
    }

    #[test]
    fn stored_value_text() {
        assert_eq!(value_text(&Value::Null), "");
        assert_eq!(value_text(&Value::Integer(12)), "12");
        assert_eq!(value_text(&Value::Real(1.5)), "1.5");
        assert_eq!(value_text(&Value::Text("x".into())), "x");
    }
}
