//! Storage schema derivation
//!
//! Each table gets a main table, a constraint-free `_conflict` table of the
//! same shape, and a `_view` over both. Every data column is followed by its
//! `_meta` audit column.

use valve_core::{ColumnSchema, StorageAffinity, TableSchema};

/// Quote an SQL identifier
pub fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Column names in storage order: each data column, then its audit column
pub fn storage_columns(schema: &TableSchema) -> Vec<String> {
    schema
        .columns
        .iter()
        .flat_map(|c| [c.name.clone(), c.meta_name()])
        .collect()
}

fn column_lines(schema: &TableSchema, constrained: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(schema.columns.len() * 2);
    for column in &schema.columns {
        lines.push(format!("  {}", column_definition(column, constrained)));
        lines.push(format!("  {} TEXT", quote(&column.meta_name())));
    }

    if constrained {
        for fk in &schema.constraints.foreign {
            lines.push(format!(
                "  FOREIGN KEY ({}) REFERENCES {}({})",
                quote(&fk.column),
                quote(&fk.ftable),
                quote(&fk.fcolumn)
            ));
        }
    }
    lines
}

fn column_definition(column: &ColumnSchema, constrained: bool) -> String {
    // Not `INTEGER PRIMARY KEY`: a rowid alias replaces NULL keys with generated ones
    let sql_type = match column.affinity {
        StorageAffinity::Integer if constrained && column.primary => "INT",
        affinity => affinity.sql(),
    };
    let mut line = format!("{} {}", quote(&column.name), sql_type);
    if constrained {
        if column.primary {
            line.push_str(" PRIMARY KEY");
        }
        if column.unique {
            line.push_str(" UNIQUE");
        }
    }
    line
}

fn create_table(name: &str, lines: &[String]) -> String {
    format!(
        "DROP TABLE IF EXISTS {name};\nCREATE TABLE {name} (\n{}\n);",
        lines.join(",\n"),
        name = quote(name)
    )
}

/// `CREATE TABLE` for the main table
pub fn main_table(schema: &TableSchema) -> String {
    create_table(&schema.name, &column_lines(schema, true))
}

/// `CREATE TABLE` for the conflict table
pub fn conflict_table(schema: &TableSchema) -> String {
    create_table(&schema.conflict_name(), &column_lines(schema, false))
}

/// `CREATE VIEW` over the main and conflict tables
pub fn view(schema: &TableSchema) -> String {
    format!(
        "DROP VIEW IF EXISTS {view};\nCREATE VIEW {view} AS SELECT * FROM {table} UNION ALL SELECT * FROM {conflict};",
        view = quote(&schema.view_name()),
        table = quote(&schema.name),
        conflict = quote(&schema.conflict_name()),
    )
}

/// All statements for one table, view dropped first
pub fn table_script(schema: &TableSchema) -> Vec<String> {
    vec![
        format!("DROP VIEW IF EXISTS {};", quote(&schema.view_name())),
        main_table(schema),
        conflict_table(schema),
        view(schema),
    ]
}

/// Multi-row `INSERT` with `rows` rows of positional parameters
pub fn insert(table: &str, columns: &[String], rows: usize) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote(c)).collect();
    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    format!(
        "INSERT INTO {} ({}) VALUES\n{};",
        quote(table),
        names.join(", "),
        vec![placeholders; rows].join(",\n")
    )
}
