//! Conflict-aware loader
//!
//! Tables are created first, then filled in load order. Each table's rows
//! are read in chunks; every chunk is validated, split into main and
//! conflict rows, and committed before the next chunk is read, so later
//! chunks see earlier ones through the store.

use crate::ddl;
use crate::error::StoreError;
use crate::meta::CellMeta;
use crate::store::SqliteStore;
use std::path::Path;
use tracing::{debug, info};
use valve_core::{LoadReport, Settings, TableReport, TableSchema};
use valve_engine::{RowValidator, ValidatedRow};
use valve_schema::{tsv, Catalog, CompiledSchema, TsvSource};

/// One storage row: data and audit values in `ddl::storage_columns` order
type StorageRow = Vec<Option<String>>;

/// Loads data files into a store
pub struct Loader<'s> {
    store: &'s mut SqliteStore,
    chunk_size: usize,
    delimiter: u8,
}

impl<'s> Loader<'s> {
    pub fn new(store: &'s mut SqliteStore, settings: &Settings) -> Self {
        Self {
            store,
            chunk_size: settings.chunk_size.max(1),
            delimiter: settings.delimiter_byte(),
        }
    }

    /// Rows validated and committed together
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Create every table, then load them in dependency order
    pub fn load_all(&mut self, compiled: &CompiledSchema) -> Result<LoadReport, StoreError> {
        for schema in &compiled.tables {
            self.store.create_tables(schema)?;
        }

        let mut report = LoadReport::new(compiled.load_order());
        for schema in &compiled.tables {
            report.add_table(self.load_table(schema)?);
        }
        Ok(report)
    }

    /// Load one table's data file into its (already created) tables
    pub fn load_table(&mut self, schema: &TableSchema) -> Result<TableReport, StoreError> {
        let read_error = |source: csv::Error| StoreError::Read {
            path: schema.path.clone(),
            source,
        };

        let mut reader = tsv::reader(Path::new(&schema.path), self.delimiter).map_err(read_error)?;
        let mut records = reader.records();

        let mut validator = RowValidator::new(schema);
        let mut report = TableReport::new(&schema.name);
        let columns = ddl::storage_columns(schema);
        let conflict = schema.conflict_name();

        loop {
            let mut chunk = Vec::with_capacity(self.chunk_size);
            for record in records.by_ref().take(self.chunk_size) {
                let record = record.map_err(read_error)?;
                if record.len() > schema.columns.len() {
                    return Err(StoreError::ExtraFields {
                        path: schema.path.clone(),
                        line: record.position().map_or(0, |p| p.line()),
                        expected: schema.columns.len(),
                        found: record.len(),
                    });
                }
                chunk.push(record.iter().map(str::to_string).collect::<Vec<String>>());
            }
            if chunk.is_empty() {
                break;
            }

            let mut main_rows: Vec<StorageRow> = Vec::new();
            let mut conflict_rows: Vec<StorageRow> = Vec::new();
            for values in &chunk {
                let row = validator.validate_row(values, &*self.store)?;
                report.invalid_cells += row.invalid_cells();
                report.messages += row.message_count();

                let encoded = encode_row(schema, &row)?;
                if row.duplicate {
                    conflict_rows.push(encoded);
                } else {
                    main_rows.push(encoded);
                }
            }

            self.store.insert_partitioned(
                &columns,
                [
                    (schema.name.as_str(), main_rows.as_slice()),
                    (conflict.as_str(), conflict_rows.as_slice()),
                ],
            )?;

            debug!(
                "{}: chunk {} committed ({} main, {} conflict)",
                schema.name,
                report.chunks + 1,
                main_rows.len(),
                conflict_rows.len()
            );
            report.rows += chunk.len();
            report.main_rows += main_rows.len();
            report.conflict_rows += conflict_rows.len();
            report.chunks += 1;
        }

        info!(
            "Loaded {}: {} rows ({} main, {} conflict, {} invalid cells)",
            schema.name, report.rows, report.main_rows, report.conflict_rows, report.invalid_cells
        );
        Ok(report)
    }
}

/// Compile the configuration rooted at `table_path` and load every table
/// into the store at `store_path`
///
/// Configuration errors abort before the store is opened.
pub fn load_path(store_path: &Path, table_path: &str, settings: &Settings) -> Result<LoadReport, StoreError> {
    let delimiter = settings.delimiter_byte();
    let catalog = Catalog::compile(&TsvSource::new(delimiter), &settings.table_table, table_path)?;
    let compiled = CompiledSchema::from_files(catalog, delimiter)?;

    let mut store = SqliteStore::create(store_path)?;
    Loader::new(&mut store, settings).load_all(&compiled)
}

/// Encode a validated row as data and audit values
fn encode_row(schema: &TableSchema, row: &ValidatedRow) -> Result<StorageRow, StoreError> {
    let mut values = Vec::with_capacity(row.cells.len() * 2);
    for (column, cell) in schema.columns.iter().zip(&row.cells) {
        let (data, meta) = CellMeta::encode(cell, column.affinity);
        let meta = meta
            .map(|m| m.to_json())
            .transpose()
            .map_err(|source| StoreError::Meta {
                table: schema.name.clone(),
                column: column.name.clone(),
                source,
            })?;
        values.push(data);
        values.push(meta);
    }
    Ok(values)
}
