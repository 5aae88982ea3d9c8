//! Config compiler
//!
//! Reads the table-of-tables, then the table-of-datatypes and
//! table-of-columns it points at, into an immutable `Catalog`.

use crate::control::{ControlSource, ControlTable};
use crate::datatype::DatatypeRegistry;
use crate::structure::parse_structure;
use std::collections::{HashMap, HashSet};
use valve_core::{ColumnConfig, ConfigError, Role, Structure, TableConfig, ValveError};

/// Columns the table-of-tables must have
pub const TABLE_COLUMNS: [&str; 3] = ["table", "path", "type"];

/// Columns the table-of-columns must have
pub const COLUMN_COLUMNS: [&str; 4] = ["table", "column", "nulltype", "datatype"];

/// Compiled configuration
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Tables in table-of-tables order
    pub tables: Vec<TableConfig>,

    pub datatypes: DatatypeRegistry,

    /// Role -> name of the table declaring it
    roles: HashMap<Role, String>,
}

impl Catalog {
    /// Compile the configuration rooted at the table-of-tables `name` found at `path`
    pub fn compile(source: &dyn ControlSource, name: &str, path: &str) -> Result<Self, ValveError> {
        let table_table = source.read(name, path)?;
        let (mut tables, roles) = read_tables(&table_table)?;

        for role in Role::REQUIRED {
            if !roles.contains_key(&role) {
                return Err(ConfigError::MissingRole {
                    role: role.to_string(),
                    path: table_table.source.clone(),
                }
                .into());
            }
        }

        let special = |role: Role| -> Result<&TableConfig, ConfigError> {
            roles
                .get(&role)
                .and_then(|name| tables.iter().find(|t| &t.name == name))
                .ok_or_else(|| ConfigError::MissingRole {
                    role: role.to_string(),
                    path: table_table.source.clone(),
                })
        };

        let declared = special(Role::Table)?;
        if source.checks_table_path() && declared.path != path {
            return Err(ConfigError::TablePathMismatch {
                declared: declared.path.clone(),
                path: path.to_string(),
            }
            .into());
        }

        let datatype_config = special(Role::Datatype)?;
        let datatypes = DatatypeRegistry::from_control(
            &source.read(&datatype_config.name, &datatype_config.path)?,
        )?;

        let column_config = special(Role::Column)?;
        let column_table = source.read(&column_config.name, &column_config.path)?;
        read_columns(&column_table, &mut tables, &datatypes)?;

        Ok(Self {
            tables,
            datatypes,
            roles,
        })
    }

    pub fn table(&self, name: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// The table declaring `role`, if any
    pub fn special(&self, role: Role) -> Option<&TableConfig> {
        self.roles.get(&role).and_then(|name| self.table(name))
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }
}

fn read_tables(table: &ControlTable) -> Result<(Vec<TableConfig>, HashMap<Role, String>), ConfigError> {
    table.require_columns(&TABLE_COLUMNS)?;

    let mut tables: Vec<TableConfig> = Vec::with_capacity(table.rows.len());
    let mut roles = HashMap::new();

    for row in &table.rows {
        let name = table.required(row, "table")?;
        let path = table.required(row, "path")?;

        let role = match ControlTable::optional(row, "type") {
            Some(text) => Some(Role::parse(text.trim()).ok_or_else(|| ConfigError::UnknownRole {
                role: text.to_string(),
                path: table.source.clone(),
            })?),
            None => None,
        };

        if tables.iter().any(|t| t.name == name) {
            return Err(ConfigError::Duplicate {
                kind: "table",
                name: name.to_string(),
                path: table.source.clone(),
            });
        }

        if let Some(role) = role {
            if roles.insert(role, name.to_string()).is_some() {
                return Err(ConfigError::DuplicateRole {
                    role: role.to_string(),
                    path: table.source.clone(),
                });
            }
        }

        tables.push(TableConfig {
            name: name.to_string(),
            path: path.to_string(),
            role,
            columns: Vec::new(),
        });
    }

    Ok((tables, roles))
}

fn read_columns(
    table: &ControlTable,
    tables: &mut [TableConfig],
    datatypes: &DatatypeRegistry,
) -> Result<(), ValveError> {
    table.require_columns(&COLUMN_COLUMNS)?;

    let known: HashSet<String> = tables.iter().map(|t| t.name.clone()).collect();
    let path = || table.source.clone();

    for row in &table.rows {
        let owner = table.required(row, "table")?;
        let column = table.required(row, "column")?;
        let datatype = table.required(row, "datatype")?;
        let nulltype = ControlTable::optional(row, "nulltype");

        let Some(config) = tables.iter_mut().find(|t| t.name == owner) else {
            return Err(ConfigError::UndefinedTable {
                table: owner.to_string(),
                path: path(),
            }
            .into());
        };

        if !datatypes.contains(datatype) {
            return Err(ConfigError::UndefinedDatatype {
                datatype: datatype.to_string(),
                path: path(),
            }
            .into());
        }

        if let Some(nulltype) = nulltype {
            if !datatypes.contains(nulltype) {
                return Err(ConfigError::UndefinedNulltype {
                    nulltype: nulltype.to_string(),
                    path: path(),
                }
                .into());
            }
            datatypes.null_check(nulltype)?;
        }

        let structure = parse_structure(
            owner,
            column,
            ControlTable::optional(row, "structure").unwrap_or_default(),
        )?;
        for s in &structure {
            if let Structure::From { table: ftable, .. } = s {
                if !known.contains(ftable) {
                    return Err(ConfigError::UndefinedForeignTable {
                        table: owner.to_string(),
                        column: column.to_string(),
                        ftable: ftable.clone(),
                    }
                    .into());
                }
            }
        }

        if config.find_column(column).is_some() {
            return Err(ConfigError::Duplicate {
                kind: "column",
                name: format!("{owner}.{column}"),
                path: path(),
            }
            .into());
        }

        config.columns.push(ColumnConfig {
            table: owner.to_string(),
            column: column.to_string(),
            nulltype: nulltype.map(str::to_string),
            datatype: datatype.to_string(),
            structure,
        });
    }

    Ok(())
}
