//! End-to-end load and export scenarios
//!
//! Each test writes control tables and data files into a temporary
//! directory, loads them into a store there, and inspects the store or the
//! exported files.

use pretty_assertions::assert_eq;
use rusqlite::types::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use valve_core::{ConfigError, CycleError, Settings, ValveError};
use valve_store::{export_path, load_path, SqliteStore, StoreError};

const DATATYPES: &str = "datatype\tparent\tcondition\tSQL type\tdescription\n\
    text\t\t\ttext\ttext\n\
    empty\ttext\tequals('')\t\tthe empty string\n\
    line\ttext\texclude(/\\n/)\t\ta line of text\n\
    word\tline\texclude(/\\s/)\t\ta single word\n\
    integer-like\tword\tmatch(/\\d+/)\tinteger\ta positive integer\n";

/// A configuration directory with a table-of-tables listing `tables`
struct Project {
    dir: TempDir,
}

impl Project {
    fn new(columns: &str, tables: &[(&str, &str)]) -> Self {
        let project = Self {
            dir: tempfile::tempdir().unwrap(),
        };

        let mut table_tsv = String::from("table\tpath\ttype\n");
        for (name, role) in [("table", "table"), ("column", "column"), ("datatype", "datatype")] {
            table_tsv.push_str(&format!("{name}\t{}\t{role}\n", project.path(&format!("{name}.tsv"))));
        }
        for (name, data) in tables {
            let file = format!("{name}.tsv");
            table_tsv.push_str(&format!("{name}\t{}\t\n", project.path(&file)));
            project.write(&file, data);
        }

        project.write("table.tsv", &table_tsv);
        project.write("column.tsv", columns);
        project.write("datatype.tsv", DATATYPES);
        project
    }

    fn path(&self, file: &str) -> String {
        self.dir.path().join(file).to_string_lossy().into_owned()
    }

    fn write(&self, file: &str, contents: &str) {
        fs::write(self.dir.path().join(file), contents).unwrap();
    }

    fn read(&self, file: &str) -> String {
        fs::read_to_string(self.dir.path().join(file)).unwrap()
    }

    fn store_path(&self) -> PathBuf {
        self.dir.path().join("valve.db")
    }

    fn load(&self, chunk_size: usize) -> Result<valve_core::LoadReport, StoreError> {
        let settings = Settings {
            chunk_size,
            ..Settings::default()
        };
        load_path(&self.store_path(), &self.path("table.tsv"), &settings)
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::open(&self.store_path()).unwrap()
    }
}

/// Rows of a stored table as text, audit columns dropped
fn data_rows(store: &SqliteStore, table: &str) -> Vec<Vec<String>> {
    let columns = store.columns(table).unwrap();
    let mut rows = Vec::new();
    store
        .for_each_row(table, |row| {
            rows.push(
                row.iter()
                    .zip(&columns)
                    .filter(|(_, name)| !name.ends_with("_meta"))
                    .map(|(value, _)| match value {
                        Value::Null => "NULL".to_string(),
                        Value::Integer(n) => n.to_string(),
                        Value::Text(s) => s.clone(),
                        other => format!("{other:?}"),
                    })
                    .collect(),
            );
            Ok(())
        })
        .unwrap();
    rows
}

fn rows(list: &[&[&str]]) -> Vec<Vec<String>> {
    list.iter().map(|r| r.iter().map(|v| v.to_string()).collect()).collect()
}

fn meta(store: &SqliteStore, table: &str, column: &str) -> Vec<Option<String>> {
    let sql = format!("SELECT \"{column}_meta\" FROM \"{table}\"");
    let mut stmt = store.connection().prepare(&sql).unwrap();
    stmt.query_map([], |row| row.get::<_, Option<String>>(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

const THINGS_COLUMNS: &str = "table\tcolumn\tnulltype\tdatatype\tstructure\n\
    things\tid\t\tinteger-like\tunique\n\
    things\tname\t\ttext\t\n";

#[test]
fn duplicate_rows_go_to_the_conflict_table() {
    for chunk_size in [1, 2, 10] {
        let project = Project::new(THINGS_COLUMNS, &[("things", "id\tname\n1\ta\n2\tb\n2\tc\n")]);
        let report = project.load(chunk_size).unwrap();
        let store = project.store();

        assert_eq!(data_rows(&store, "things"), rows(&[&["1", "a"], &["2", "b"]]), "chunk size {chunk_size}");
        // The duplicate id is kept in the audit column, not the data column
        assert_eq!(data_rows(&store, "things_conflict"), rows(&[&["NULL", "c"]]));
        assert_eq!(data_rows(&store, "things_view").len(), 3);

        let conflict_meta = meta(&store, "things_conflict", "id");
        let audit = conflict_meta[0].as_deref().unwrap();
        assert!(audit.contains("\"rule\":\"unique or primary key\""), "{audit}");
        assert!(audit.contains("\"value\":\"2\""), "{audit}");
        assert_eq!(meta(&store, "things", "id"), vec![None, None]);

        let things = report.tables.iter().find(|t| t.table == "things").unwrap();
        assert_eq!((things.rows, things.main_rows, things.conflict_rows), (3, 2, 1));
        assert_eq!(things.chunks, 3_usize.div_ceil(chunk_size));
        assert!(report.has_conflicts());
    }
}

#[test]
fn invalid_integer_key_does_not_claim_a_fresh_one() {
    let columns = "table\tcolumn\tnulltype\tdatatype\tstructure\n\
        things\tid\t\tinteger-like\tprimary\n";
    for chunk_size in [1, 10] {
        let project = Project::new(columns, &[("things", "id\tname\nx\ta\n1\tb\n")]);
        let report = project.load(chunk_size).unwrap();
        let store = project.store();

        assert_eq!(
            data_rows(&store, "things"),
            rows(&[&["NULL", "a"], &["1", "b"]]),
            "chunk size {chunk_size}"
        );
        assert!(data_rows(&store, "things_conflict").is_empty());
        assert!(!report.has_conflicts());
    }
}

#[test]
fn numeric_spellings_of_one_key_conflict_at_any_chunk_size() {
    for chunk_size in [1, 10] {
        let project = Project::new(THINGS_COLUMNS, &[("things", "id\tname\n7\ta\n007\tb\n")]);
        let report = project.load(chunk_size).unwrap();
        let store = project.store();

        assert_eq!(data_rows(&store, "things"), rows(&[&["7", "a"]]), "chunk size {chunk_size}");
        assert_eq!(data_rows(&store, "things_conflict"), rows(&[&["NULL", "b"]]));
        let audit = meta(&store, "things_conflict", "id");
        assert!(audit[0].as_deref().unwrap().contains("\"value\":\"007\""));

        let things = report.tables.iter().find(|t| t.table == "things").unwrap();
        assert_eq!((things.main_rows, things.conflict_rows), (1, 1));
    }
}

#[test]
fn records_wider_than_the_header_abort_the_load() {
    let project = Project::new(THINGS_COLUMNS, &[("things", "id\tname\n1\ta\n2\tb\tEXTRA\n")]);

    let err = project.load(10).unwrap_err();
    match &err {
        StoreError::ExtraFields {
            path,
            line,
            expected,
            found,
        } => {
            assert!(path.ends_with("things.tsv"), "{path}");
            assert_eq!((*line, *expected, *found), (3, 2, 3));
        }
        other => panic!("expected extra fields, got {other}"),
    }
    assert!(err.to_string().contains("line 3"));
}

#[test]
fn nulltype_applies_before_datatype() {
    let columns = "table\tcolumn\tnulltype\tdatatype\tstructure\n\
        counts\tn\tempty\tinteger-like\t\n";
    let project = Project::new(columns, &[("counts", "n\n\"\"\n12x\n12\n")]);
    project.load(2).unwrap();
    let store = project.store();

    assert_eq!(data_rows(&store, "counts"), rows(&[&["NULL"], &["NULL"], &["12"]]));
    assert!(data_rows(&store, "counts_conflict").is_empty());

    let audit = meta(&store, "counts", "n");
    assert_eq!(audit[0].as_deref(), Some(r#"{"valid":true,"value":"","nulltype":"empty"}"#));
    assert_eq!(
        audit[1].as_deref(),
        Some(
            r#"{"valid":false,"value":"12x","messages":[{"rule":"datatype:integer-like","level":"error","message":"n should be a positive integer"}]}"#
        )
    );
    assert_eq!(audit[2], None);
}

#[test]
fn foreign_key_failures_stay_in_the_main_table() {
    let columns = "table\tcolumn\tnulltype\tdatatype\tstructure\n\
        customers\tid\t\tinteger-like\tprimary\n\
        orders\torder_id\t\tinteger-like\tprimary\n\
        orders\tcustomer_id\t\tinteger-like\tfrom(customers.id)\n";
    // Orders are listed first; the dependency order still loads customers first
    let project = Project::new(
        columns,
        &[
            ("orders", "order_id\tcustomer_id\n1\t1\n2\t9\n"),
            ("customers", "id\tname\n1\tAda\n"),
        ],
    );
    let report = project.load(2).unwrap();

    let pos = |t: &str| report.load_order.iter().position(|n| n == t).unwrap();
    assert!(pos("customers") < pos("orders"));

    let store = project.store();
    assert_eq!(data_rows(&store, "orders"), rows(&[&["1", "1"], &["2", "NULL"]]));
    assert!(data_rows(&store, "orders_conflict").is_empty());

    let audit = meta(&store, "orders", "customer_id");
    assert_eq!(audit[0], None);
    let failure = audit[1].as_deref().unwrap();
    assert!(failure.contains("\"rule\":\"foreign key\""));
    assert!(failure.contains("Value 9 of column customer_id is not in customers.id"));
}

#[test]
fn cyclic_foreign_keys_abort_the_load() {
    let columns = "table\tcolumn\tnulltype\tdatatype\tstructure\n\
        a\tb_id\t\ttext\tfrom(b.id)\n\
        b\ta_id\t\ttext\tfrom(a.id)\n";
    let project = Project::new(
        columns,
        &[("a", "id\tb_id\n1\t1\n"), ("b", "id\ta_id\n1\t1\n")],
    );

    let err = project.load(2).unwrap_err();
    let StoreError::Valve(ValveError::Cycle(CycleError { cycle, message })) = err else {
        panic!("expected a cycle error");
    };
    assert_eq!(cycle, vec!["a", "b", "a"]);
    assert_eq!(
        message,
        "Cyclic dependency between tables a, b, a: a.b_id depends on b.id and b.a_id depends on a.id"
    );
    assert!(!project.store_path().exists());
}

#[test]
fn missing_role_aborts_the_load() {
    let project = Project::new(THINGS_COLUMNS, &[("things", "id\tname\n1\ta\n")]);
    let table_tsv = project.read("table.tsv");
    let without_datatype: String = table_tsv
        .lines()
        .filter(|l| !l.starts_with("datatype\t"))
        .map(|l| format!("{l}\n"))
        .collect();
    project.write("table.tsv", &without_datatype);

    let err = project.load(2).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Valve(ValveError::Config(ConfigError::MissingRole { .. }))
    ));
    assert!(err.to_string().contains("'datatype'"));
}

#[test]
fn missing_data_file_names_the_path() {
    let project = Project::new(THINGS_COLUMNS, &[("things", "id\tname\n")]);
    fs::remove_file(project.dir.path().join("things.tsv")).unwrap();

    let err = project.load(2).unwrap_err();
    assert!(err.to_string().contains("things.tsv"), "{err}");
}

#[test]
fn export_restores_values_and_messages() {
    let columns = "table\tcolumn\tnulltype\tdatatype\tstructure\n\
        things\tid\t\tinteger-like\tunique\n\
        things\tcode\tempty\tword\t\n";
    let data = "id\tcode\tnote\n1\tab\tfirst\n1x\t\tsecond\n1\ta b\tthird\n";
    let project = Project::new(columns, &[("things", data)]);
    project.load(2).unwrap();

    let out = tempfile::tempdir().unwrap();
    let summary = export_path(&project.store_path(), Some(out.path()), &Settings::default()).unwrap();

    // Main rows first, then the quarantined duplicate
    assert_eq!(
        fs::read_to_string(out.path().join("things.tsv")).unwrap(),
        "id\tcode\tnote\n1\tab\tfirst\n1x\t\tsecond\n1\ta b\tthird\n"
    );
    assert_eq!(
        fs::read_to_string(&summary.message_path).unwrap(),
        "table\tcell\trule\tlevel\tmessage\n\
         things\tA3\tdatatype:integer-like\terror\tid should be a positive integer\n\
         things\tA4\tunique or primary key\terror\tValues of id must be unique\n\
         things\tB4\tdatatype:word\terror\tcode should be a single word\n"
    );
    assert_eq!(summary.messages, 3);
    assert_eq!(summary.tables.len(), 4);
    assert!(out.path().join("table.tsv").exists());
    assert!(out.path().join("datatype.tsv").exists());
}

#[test]
fn round_trip_is_idempotent() {
    let columns = "table\tcolumn\tnulltype\tdatatype\tstructure\n\
        customers\tid\t\tinteger-like\tprimary\n\
        customers\tname\tempty\tword\t\n\
        orders\tcustomer_id\t\tinteger-like\tfrom(customers.id)\n";
    let project = Project::new(
        columns,
        &[
            ("customers", "id\tname\n1\tAda\n2\t\n2\tGrace Hopper\n007\tBond\n"),
            ("orders", "order\tcustomer_id\nA\t1\nB\t3\nC\tx\n"),
        ],
    );

    let first = project.load(2).unwrap();
    // Export next to the store, replacing the original files
    export_path(&project.store_path(), None, &Settings::default()).unwrap();
    let first_export: Vec<String> = ["customers.tsv", "orders.tsv", "message.tsv", "table.tsv"]
        .iter()
        .map(|f| project.read(f))
        .collect();

    let second = project.load(2).unwrap();
    export_path(&project.store_path(), None, &Settings::default()).unwrap();
    let second_export: Vec<String> = ["customers.tsv", "orders.tsv", "message.tsv", "table.tsv"]
        .iter()
        .map(|f| project.read(f))
        .collect();

    assert_eq!(first.summary, second.summary);
    assert_eq!(first_export, second_export);
    assert!(first_export[2].contains("customers\tA5\tunique or primary key"));
    assert!(first_export[2].contains("orders\tB3\tforeign key"));
    assert!(first_export[0].contains("007\tBond"));
}

#[test]
fn export_of_a_missing_store_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = export_path(&dir.path().join("none.db"), None, &Settings::default()).unwrap_err();
    assert!(matches!(err, StoreError::MissingStore(_)));
}

#[test]
fn export_needs_the_control_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path: &Path = &dir.path().join("bare.db");
    SqliteStore::create(path)
        .unwrap()
        .connection()
        .execute_batch("CREATE TABLE \"other\" (\"a\" TEXT, \"a_meta\" TEXT);")
        .unwrap();

    let err = export_path(path, None, &Settings::default()).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Valve(ValveError::Config(ConfigError::Read { .. }))
    ));
}
