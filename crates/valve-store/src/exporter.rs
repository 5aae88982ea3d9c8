//! Round-trip exporter
//!
//! Writes each loaded table back to a delimited file, restoring original
//! values from audit columns, and collects every audit message into one
//! message table with spreadsheet cell coordinates. Rows are streamed from
//! the store to the files one at a time.

use crate::error::StoreError;
use crate::meta::CellMeta;
use crate::source::StoreSource;
use crate::store::{value_text, SqliteStore};
use rusqlite::types::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;
use valve_core::{CellRef, MessageRecord, Settings, TableConfig, CONFLICT_SUFFIX, META_SUFFIX};
use valve_schema::{tsv, Catalog};

/// Header of the message table
pub const MESSAGE_COLUMNS: [&str; 5] = ["table", "cell", "rule", "level", "message"];

/// What an export wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// (table, file written, data rows)
    pub tables: Vec<(String, PathBuf, usize)>,

    pub message_path: PathBuf,
    pub messages: usize,
}

/// A data column and the position of its audit column, if it has one
#[derive(Debug)]
struct StoredColumn {
    name: String,
    index: usize,
    meta: Option<usize>,
}

/// A delimited output file whose failures carry its path
struct Output {
    path: PathBuf,
    writer: csv::Writer<File>,

    /// Records written after the header
    records: usize,
}

impl Output {
    fn create(path: &Path, delimiter: u8, header: &[impl AsRef<[u8]>]) -> Result<Self, StoreError> {
        let writer = tsv::writer(path, delimiter).map_err(|source| write_error(path, source))?;
        let mut output = Self {
            path: path.to_path_buf(),
            writer,
            records: 0,
        };
        output
            .writer
            .write_record(header)
            .map_err(|source| write_error(path, source))?;
        Ok(output)
    }

    fn record<I, T>(&mut self, record: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(record)
            .map_err(|source| write_error(&self.path, source))?;
        self.records += 1;
        Ok(())
    }

    fn message(&mut self, m: &MessageRecord) -> Result<(), StoreError> {
        self.record([&m.table, &m.cell, &m.rule, &m.level, &m.message])
    }

    fn finish(mut self) -> Result<usize, StoreError> {
        self.writer
            .flush()
            .map_err(|source| write_error(&self.path, source.into()))?;
        Ok(self.records)
    }
}

fn write_error(path: &Path, source: csv::Error) -> StoreError {
    StoreError::Write {
        path: path.display().to_string(),
        source,
    }
}

/// Exports a store's tables to a directory
pub struct Exporter<'s> {
    store: &'s SqliteStore,
    output_dir: PathBuf,
    delimiter: u8,
    message_file: String,
}

impl<'s> Exporter<'s> {
    pub fn new(store: &'s SqliteStore, output_dir: impl Into<PathBuf>, settings: &Settings) -> Self {
        Self {
            store,
            output_dir: output_dir.into(),
            delimiter: settings.delimiter_byte(),
            message_file: settings.message_file.clone(),
        }
    }

    /// Export every table in the catalog, writing messages as they are found
    pub fn export_all(&self, catalog: &Catalog) -> Result<ExportSummary, StoreError> {
        let message_path = self.output_dir.join(&self.message_file);
        let mut messages = Output::create(&message_path, self.delimiter, &MESSAGE_COLUMNS)?;

        let mut summary = ExportSummary::default();
        for table in &catalog.tables {
            let (path, rows) = self.export_table(table, &mut messages)?;
            summary.tables.push((table.name.clone(), path, rows));
        }

        summary.messages = messages.finish()?;
        summary.message_path = message_path;

        info!(
            "Exported {} tables and {} messages to '{}'",
            summary.tables.len(),
            summary.messages,
            self.output_dir.display()
        );
        Ok(summary)
    }

    /// Write one table to the file name of its configured path
    ///
    /// Returns the file written and the number of data rows.
    fn export_table(&self, table: &TableConfig, messages: &mut Output) -> Result<(PathBuf, usize), StoreError> {
        let file_name = Path::new(&table.path)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{}.tsv", table.name)));
        let path = self.output_dir.join(file_name);

        let reader = TableReader::new(self.store, &table.name)?;
        let header = reader.header();
        let mut output = Output::create(&path, self.delimiter, header.as_slice())?;
        reader.for_each_row(|row, row_messages| {
            output.record(&row)?;
            row_messages.iter().try_for_each(|m| messages.message(m))
        })?;
        let rows = output.finish()?;

        info!("Exported {} ({} rows) to '{}'", table.name, rows, path.display());
        Ok((path, rows))
    }
}

/// Recompile the configuration stored in `store_path` and export every table
///
/// Files go to `output_dir`, or next to the store when it is `None`.
pub fn export_path(
    store_path: &Path,
    output_dir: Option<&Path>,
    settings: &Settings,
) -> Result<ExportSummary, StoreError> {
    let store = SqliteStore::open(store_path)?;
    let catalog = Catalog::compile(&StoreSource::new(&store), &settings.table_table, "")?;

    let output_dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => store_path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    Exporter::new(&store, output_dir, settings).export_all(&catalog)
}

/// Reads a table's stored rows back as their original text
pub struct TableReader<'s> {
    store: &'s SqliteStore,
    table: String,
    columns: Vec<StoredColumn>,
}

impl<'s> TableReader<'s> {
    pub fn new(store: &'s SqliteStore, table: &str) -> Result<Self, StoreError> {
        Ok(Self {
            store,
            table: table.to_string(),
            columns: stored_columns(&store.columns(table)?),
        })
    }

    /// Data column names, audit columns left out
    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Pass main rows, then conflict rows, to `f` one at a time, each with
    /// original values restored and its cell messages located
    ///
    /// Returns the number of rows read.
    pub fn for_each_row<F>(&self, mut f: F) -> Result<usize, StoreError>
    where
        F: FnMut(Vec<String>, Vec<MessageRecord>) -> Result<(), StoreError>,
    {
        let conflict = format!("{}{CONFLICT_SUFFIX}", self.table);
        let mut sources = vec![self.table.as_str()];
        if self.store.has_table(&conflict)? {
            sources.push(conflict.as_str());
        }

        let mut index = 0;
        for source in sources {
            self.store.for_each_row(source, |values| {
                let (row, messages) = self.decode(values, index)?;
                index += 1;
                f(row, messages)
            })?;
        }
        Ok(index)
    }

    fn decode(&self, values: &[Value], index: usize) -> Result<(Vec<String>, Vec<MessageRecord>), StoreError> {
        let mut row = Vec::with_capacity(self.columns.len());
        let mut messages = Vec::new();

        for (ordinal, column) in self.columns.iter().enumerate() {
            let mut text = value_text(&values[column.index]);

            let meta = match column.meta.map(|i| &values[i]) {
                Some(Value::Text(json)) if !json.is_empty() => {
                    Some(CellMeta::from_json(json).map_err(|source| StoreError::Meta {
                        table: self.table.clone(),
                        column: column.name.clone(),
                        source,
                    })?)
                }
                _ => None,
            };

            if let Some(meta) = meta {
                if let Some(value) = meta.value {
                    text = value;
                }
                let cell = CellRef::data_cell(ordinal, index);
                messages.extend(meta.messages.iter().map(|m| MessageRecord::new(&self.table, cell, m)));
            }
            row.push(text);
        }
        Ok((row, messages))
    }
}

/// A whole table read back out of the store
#[derive(Debug)]
pub struct ExportedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Collect every row of a table, for control tables small enough to hold
pub fn read_table(store: &SqliteStore, table: &str) -> Result<ExportedTable, StoreError> {
    let reader = TableReader::new(store, table)?;
    let mut rows = Vec::new();
    reader.for_each_row(|row, _| {
        rows.push(row);
        Ok(())
    })?;
    Ok(ExportedTable {
        header: reader.header(),
        rows,
    })
}

/// Pair each data column with the audit column that follows it
fn stored_columns(names: &[String]) -> Vec<StoredColumn> {
    let mut columns = Vec::with_capacity(names.len() / 2);
    let mut i = 0;
    while i < names.len() {
        let meta_name = format!("{}{}", names[i], META_SUFFIX);
        let meta = names.get(i + 1).filter(|n| **n == meta_name).map(|_| i + 1);
        columns.push(StoredColumn {
            name: names[i].clone(),
            index: i,
            meta,
        });
        i += if meta.is_some() { 2 } else { 1 };
    }
    columns
}
