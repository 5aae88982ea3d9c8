//! Control tables
//!
//! The table-of-tables, table-of-columns, and table-of-datatypes can be read
//! from delimited files (load) or back out of a store (export). Both go
//! through `ControlSource` so the compiler never knows which.

use crate::tsv;
use std::collections::HashMap;
use std::path::Path;
use valve_core::ConfigError;

/// One record of a control table: column name -> raw text
pub type Record = HashMap<String, String>;

/// A control table read into memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlTable {
    /// Where the rows came from (file path or store table), used in errors
    pub source: String,

    /// Column names in header order
    pub columns: Vec<String>,

    pub rows: Vec<Record>,
}

impl ControlTable {
    /// Fail unless every named column is present in the header
    pub fn require_columns(&self, columns: &[&str]) -> Result<(), ConfigError> {
        for column in columns {
            if !self.columns.iter().any(|c| c == column) {
                return Err(ConfigError::MissingColumn {
                    column: column.to_string(),
                    path: self.source.clone(),
                });
            }
        }
        Ok(())
    }

    /// A required, non-blank value
    pub fn required<'a>(&self, row: &'a Record, column: &str) -> Result<&'a str, ConfigError> {
        match row.get(column) {
            Some(value) if !value.trim().is_empty() => Ok(value.as_str()),
            _ => Err(ConfigError::MissingValue {
                column: column.to_string(),
                path: self.source.clone(),
            }),
        }
    }

    /// An optional value; blank counts as absent
    pub fn optional<'a>(row: &'a Record, column: &str) -> Option<&'a str> {
        row.get(column)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Somewhere control tables can be read from
pub trait ControlSource {
    /// Read a control table given its name and configured path
    ///
    /// Must fail with `ConfigError::Empty` when the table has no rows.
    fn read(&self, name: &str, path: &str) -> Result<ControlTable, ConfigError>;

    /// Whether the `table` row must point back at the path compilation began from
    fn checks_table_path(&self) -> bool {
        true
    }
}

/// Reads control tables from delimited files
#[derive(Debug, Clone, Copy)]
pub struct TsvSource {
    delimiter: u8,
}

impl TsvSource {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Default for TsvSource {
    fn default() -> Self {
        Self::new(b'\t')
    }
}

impl ControlSource for TsvSource {
    fn read(&self, _name: &str, path: &str) -> Result<ControlTable, ConfigError> {
        let read_error = |e: csv::Error| ConfigError::Read {
            path: path.to_string(),
            message: e.to_string(),
        };

        let mut rdr = tsv::reader(Path::new(path), self.delimiter).map_err(read_error)?;
        let columns: Vec<String> = rdr
            .headers()
            .map_err(read_error)?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(read_error)?;
            rows.push(
                columns
                    .iter()
                    .cloned()
                    .zip(record.iter().map(str::to_string))
                    .collect(),
            );
        }

        if rows.is_empty() {
            return Err(ConfigError::Empty {
                path: path.to_string(),
            });
        }

        Ok(ControlTable {
            source: path.to_string(),
            columns,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_tsv_control_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datatype.tsv");
        std::fs::write(&path, "datatype\tparent\ncontrol\ttext\ntext\t\n").unwrap();
        let path = path.to_string_lossy().into_owned();

        let table = TsvSource::default().read("datatype", &path).unwrap();
        assert_eq!(table.columns, vec!["datatype", "parent"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["parent"], "text");
        assert_eq!(ControlTable::optional(&table.rows[1], "parent"), None);
        assert!(table.require_columns(&["datatype", "parent"]).is_ok());
        assert!(matches!(
            table.require_columns(&["condition"]),
            Err(ConfigError::MissingColumn { .. })
        ));
    }

    #[test]
    fn header_only_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("column.tsv");
        std::fs::write(&path, "table\tcolumn\n").unwrap();
        let path = path.to_string_lossy().into_owned();

        assert!(matches!(
            TsvSource::default().read("column", &path),
            Err(ConfigError::Empty { .. })
        ));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = TsvSource::default().read("table", "/nonexistent/table.tsv").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/table.tsv"));
    }

    #[test]
    fn blank_required_value() {
        let table = ControlTable {
            source: "table.tsv".into(),
            columns: vec!["table".into()],
            rows: vec![Record::from([("table".to_string(), "  ".to_string())])],
        };
        assert!(matches!(
            table.required(&table.rows[0], "table"),
            Err(ConfigError::MissingValue { .. })
        ));
    }
}
