//! Schema derivation
//!
//! Second phase of the build: combine the catalog with each data file's
//! header into frozen `TableSchema`s, then order them by foreign key.

use crate::catalog::Catalog;
use crate::dag::DependencyGraph;
use crate::tsv;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};
use valve_core::{
    ColumnConfig, ColumnSchema, ConfigError, Constraints, ForeignKey, SchemaError, Structure,
    TableConfig, TableSchema, ValveError,
};

/// A catalog plus every table's resolved schema, in load order
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    pub catalog: Catalog,

    /// Table schemas, referenced tables first
    pub tables: Vec<TableSchema>,
}

impl CompiledSchema {
    /// Derive every table's schema, taking column names from `header`
    pub fn build<F>(catalog: Catalog, mut header: F) -> Result<Self, ValveError>
    where
        F: FnMut(&TableConfig) -> Result<Vec<String>, ValveError>,
    {
        let mut tables = Vec::with_capacity(catalog.tables.len());
        for config in &catalog.tables {
            let columns = header(config)?;
            tables.push(derive_table(&catalog, config, &columns)?);
        }

        check_foreign_columns(&tables)?;

        let order = DependencyGraph::from_schemas(&tables).topological_sort()?;
        debug!("Load order: {}", order.join(", "));

        let mut ordered = Vec::with_capacity(tables.len());
        for name in &order {
            if let Some(pos) = tables.iter().position(|t| &t.name == name) {
                ordered.push(tables.swap_remove(pos));
            }
        }

        Ok(Self {
            catalog,
            tables: ordered,
        })
    }

    /// Derive schemas from the header rows of each table's data file
    pub fn from_files(catalog: Catalog, delimiter: u8) -> Result<Self, ValveError> {
        Self::build(catalog, |config| file_header(&config.path, delimiter))
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Table names in load order
    pub fn load_order(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }
}

/// Column names from the first row of a delimited file
pub fn file_header(path: &str, delimiter: u8) -> Result<Vec<String>, ValveError> {
    let header = tsv::read_header(Path::new(path), delimiter)
        .map_err(|e| ConfigError::Read {
            path: path.to_string(),
            message: e.to_string(),
        })?
        .ok_or_else(|| SchemaError::MissingHeader {
            path: path.to_string(),
        })?;

    let mut seen = HashSet::new();
    for column in &header {
        if !seen.insert(column.as_str()) {
            return Err(SchemaError::DuplicateColumn {
                column: column.clone(),
                path: path.to_string(),
            }
            .into());
        }
    }

    Ok(header)
}

/// Resolve one table against its header
///
/// Header order defines column order. Header columns the table-of-columns
/// omits get the default `text`/`empty` configuration; configured columns
/// absent from the header are dropped with a warning.
pub fn derive_table(
    catalog: &Catalog,
    config: &TableConfig,
    header: &[String],
) -> Result<TableSchema, ValveError> {
    for configured in &config.columns {
        if !header.contains(&configured.column) {
            warn!(
                "Column '{}' of table '{}' is configured but not in '{}'",
                configured.column, config.name, config.path
            );
        }
    }

    let mut columns = Vec::with_capacity(header.len());
    let mut constraints = Constraints::default();

    for name in header {
        let column = config
            .find_column(name)
            .cloned()
            .unwrap_or_else(|| ColumnConfig::default_for(&config.name, name));

        for structure in &column.structure {
            match structure {
                Structure::Primary => constraints.primary.push(column.column.clone()),
                Structure::Unique => constraints.unique.push(column.column.clone()),
                Structure::From { table, column: fcolumn } => constraints.foreign.push(ForeignKey {
                    column: column.column.clone(),
                    ftable: table.clone(),
                    fcolumn: fcolumn.clone(),
                }),
            }
        }

        columns.push(resolve_column(catalog, config, &column)?);
    }

    Ok(TableSchema {
        name: config.name.clone(),
        path: config.path.clone(),
        columns,
        constraints,
    })
}

fn resolve_column(
    catalog: &Catalog,
    table: &TableConfig,
    column: &ColumnConfig,
) -> Result<ColumnSchema, ValveError> {
    let datatypes = &catalog.datatypes;

    if !datatypes.contains(&column.datatype) {
        return Err(ConfigError::UndefinedDatatype {
            datatype: column.datatype.clone(),
            path: table.path.clone(),
        }
        .into());
    }

    let nulltype = match &column.nulltype {
        Some(name) if !datatypes.contains(name) => {
            return Err(ConfigError::UndefinedNulltype {
                nulltype: name.clone(),
                path: table.path.clone(),
            }
            .into())
        }
        Some(name) => Some(datatypes.null_check(name)?),
        None => None,
    };

    Ok(ColumnSchema {
        name: column.column.clone(),
        datatype: column.datatype.clone(),
        affinity: datatypes.storage_affinity(&column.datatype)?,
        nulltype,
        checks: datatypes.conditions_of(&column.datatype)?,
        primary: column.structure.contains(&Structure::Primary),
        unique: column.structure.contains(&Structure::Unique),
    })
}

fn check_foreign_columns(tables: &[TableSchema]) -> Result<(), SchemaError> {
    for table in tables {
        for fk in &table.constraints.foreign {
            let found = tables
                .iter()
                .find(|t| t.name == fk.ftable)
                .is_some_and(|t| t.find_column(&fk.fcolumn).is_some());
            if !found {
                return Err(SchemaError::UnknownForeignColumn {
                    table: table.name.clone(),
                    column: fk.column.clone(),
                    ftable: fk.ftable.clone(),
                    fcolumn: fk.fcolumn.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::TsvSource;
    use pretty_assertions::assert_eq;
    use std::fs;
    use valve_core::{CycleError, StorageAffinity};

    /// Write a config directory with customers and orders tables
    fn setup(dir: &Path, columns: &str) -> String {
        let path = |name: &str| dir.join(name).to_string_lossy().into_owned();

        fs::write(
            dir.join("table.tsv"),
            format!(
                "table\tpath\ttype\n\
                 table\t{}\ttable\n\
                 column\t{}\tcolumn\n\
                 datatype\t{}\tdatatype\n\
                 orders\t{}\t\n\
                 customers\t{}\t\n",
                path("table.tsv"),
                path("column.tsv"),
                path("datatype.tsv"),
                path("orders.tsv"),
                path("customers.tsv"),
            ),
        )
        .unwrap();
        fs::write(
            dir.join("datatype.tsv"),
            "datatype\tparent\tcondition\tSQL type\tdescription\n\
             text\t\t\ttext\t\n\
             empty\ttext\tequals('')\t\t\n\
             word\ttext\texclude(/\\s/)\t\ta word\n\
             natural_number\tword\tmatch(/\\d+/)\tinteger\ta natural number\n",
        )
        .unwrap();
        fs::write(dir.join("column.tsv"), columns).unwrap();
        fs::write(dir.join("customers.tsv"), "id\tname\n1\tAda\n").unwrap();
        fs::write(dir.join("orders.tsv"), "order_id\tcustomer_id\tnote\n1\t1\t\n").unwrap();

        path("table.tsv")
    }

    fn build(dir: &Path, columns: &str) -> Result<CompiledSchema, ValveError> {
        let table_path = setup(dir, columns);
        let catalog = Catalog::compile(&TsvSource::default(), "table", &table_path)?;
        CompiledSchema::from_files(catalog, b'\t')
    }

    const COLUMNS: &str = "table\tcolumn\tnulltype\tdatatype\tstructure\n\
        customers\tid\t\tnatural_number\tprimary\n\
        orders\torder_id\t\tnatural_number\tunique\n\
        orders\tcustomer_id\tempty\tnatural_number\tfrom(customers.id)\n\
        orders\tshipped\tempty\tword\t\n";

    #[test]
    fn derive_from_headers() {
        let dir = tempfile::tempdir().unwrap();
        let schema = build(dir.path(), COLUMNS).unwrap();

        let orders = schema.table("orders").unwrap();
        assert_eq!(orders.column_names(), vec!["order_id", "customer_id", "note"]);
        assert_eq!(orders.constraints.unique, vec!["order_id"]);
        assert_eq!(orders.constraints.foreign.len(), 1);

        let customer_id = orders.find_column("customer_id").unwrap();
        assert_eq!(customer_id.affinity, StorageAffinity::Integer);
        assert_eq!(customer_id.nulltype.as_ref().unwrap().nulltype, "empty");
        assert_eq!(customer_id.checks.len(), 2);
        assert_eq!(customer_id.checks[0].datatype, "word");

        // Unconfigured column gets the defaults
        let note = orders.find_column("note").unwrap();
        assert_eq!(note.datatype, "text");
        assert_eq!(note.affinity, StorageAffinity::Text);
        assert!(note.checks.is_empty());

        let customers = schema.table("customers").unwrap();
        assert!(customers.find_column("id").unwrap().primary);
        assert_eq!(customers.constraints.primary, vec!["id"]);
    }

    #[test]
    fn load_order_puts_referenced_tables_first() {
        let dir = tempfile::tempdir().unwrap();
        let order = build(dir.path(), COLUMNS).unwrap().load_order();

        let pos = |t: &str| order.iter().position(|n| n == t).unwrap();
        assert_eq!(order.len(), 5);
        assert!(pos("customers") < pos("orders"));
    }

    #[test]
    fn unknown_foreign_column() {
        let dir = tempfile::tempdir().unwrap();
        let columns = "table\tcolumn\tnulltype\tdatatype\tstructure\n\
            orders\tcustomer_id\t\ttext\tfrom(customers.code)\n";
        assert!(matches!(
            build(dir.path(), columns),
            Err(ValveError::Schema(SchemaError::UnknownForeignColumn { .. }))
        ));
    }

    #[test]
    fn cyclic_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let columns = "table\tcolumn\tnulltype\tdatatype\tstructure\n\
            orders\tcustomer_id\t\ttext\tfrom(customers.id)\n\
            customers\tname\t\ttext\tfrom(orders.note)\n";

        let Err(ValveError::Cycle(CycleError { cycle, message })) = build(dir.path(), columns) else {
            panic!("expected a cycle error");
        };
        assert_eq!(cycle.len(), 3);
        assert!(message.contains("orders.customer_id depends on customers.id"));
        assert!(message.contains("customers.name depends on orders.note"));
    }

    #[test]
    fn missing_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let table_path = setup(dir.path(), COLUMNS);
        fs::remove_file(dir.path().join("orders.tsv")).unwrap();

        let catalog = Catalog::compile(&TsvSource::default(), "table", &table_path).unwrap();
        let err = CompiledSchema::from_files(catalog, b'\t').unwrap_err();
        assert!(err.to_string().contains("orders.tsv"));
    }

    #[test]
    fn header_problems() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.tsv");
        fs::write(&empty, "").unwrap();
        let dup = dir.path().join("dup.tsv");
        fs::write(&dup, "a\tb\ta\n").unwrap();

        assert!(matches!(
            file_header(&empty.to_string_lossy(), b'\t'),
            Err(ValveError::Schema(SchemaError::MissingHeader { .. }))
        ));
        assert!(matches!(
            file_header(&dup.to_string_lossy(), b'\t'),
            Err(ValveError::Schema(SchemaError::DuplicateColumn { .. }))
        ));
    }
}
