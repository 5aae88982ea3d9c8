//! Table, column, and datatype model
//!
//! `TableConfig`/`ColumnConfig`/`Datatype` are what the control tables say.
//! `TableSchema`/`ColumnSchema` are the frozen, fully resolved form consumed
//! by the validator and the loader.

use crate::condition::Condition;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Suffix of the audit column paired with each data column
pub const META_SUFFIX: &str = "_meta";

/// Suffix of the quarantine table paired with each table
pub const CONFLICT_SUFFIX: &str = "_conflict";

/// Suffix of the union view over a table and its quarantine table
pub const VIEW_SUFFIX: &str = "_view";

/// Special role of a table in the table-of-tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The table-of-tables itself
    Table,

    /// The table-of-columns
    Column,

    /// The table-of-datatypes
    Datatype,

    /// CURIE prefixes
    Prefix,

    /// External references
    Reference,
}

impl Role {
    /// Roles that must be declared exactly once
    pub const REQUIRED: [Role; 3] = [Role::Table, Role::Column, Role::Datatype];

    /// All recognized roles
    pub const ALL: [Role; 5] = [
        Role::Table,
        Role::Column,
        Role::Datatype,
        Role::Prefix,
        Role::Reference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Column => "column",
            Self::Datatype => "datatype",
            Self::Prefix => "prefix",
            Self::Reference => "reference",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == s)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Physical storage category of a datatype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageAffinity {
    Text,
    Integer,
    Real,
    Blob,
}

impl StorageAffinity {
    /// Parse an `SQL type` value (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "integer" => Some(Self::Integer),
            "real" => Some(Self::Real),
            "blob" => Some(Self::Blob),
            _ => None,
        }
    }

    /// SQL spelling used in generated DDL
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
        }
    }

    /// Text a value reads back as once stored in a column of this affinity
    ///
    /// INTEGER and REAL columns convert numeric-looking text, so `007` and
    /// `7.0` both come back from an INTEGER column as `7`. Two values collide
    /// under a `UNIQUE` constraint exactly when their stored forms are equal.
    pub fn stored_form(self, text: &str) -> Cow<'_, str> {
        if matches!(self, Self::Text | Self::Blob) {
            return Cow::Borrowed(text);
        }

        let trimmed = text.trim();
        if !trimmed.bytes().any(|b| b.is_ascii_digit()) {
            return Cow::Borrowed(text);
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return match self {
                Self::Integer => Cow::Owned(n.to_string()),
                _ => Cow::Owned((n as f64).to_string()),
            };
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => {
                if self == Self::Integer && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    Cow::Owned((f as i64).to_string())
                } else {
                    Cow::Owned(f.to_string())
                }
            }
            _ => Cow::Borrowed(text),
        }
    }
}

impl std::fmt::Display for StorageAffinity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql())
    }
}

/// One row of the table-of-datatypes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datatype {
    pub name: String,
    pub parent: Option<String>,
    pub condition: Option<Condition>,

    /// Declared `SQL type`, checked when the affinity is resolved
    pub sql_type: Option<String>,

    pub description: Option<String>,
}

impl Datatype {
    /// Text used after "should be" in failure messages
    pub fn describe(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }
}

/// One token of a column's `structure` annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Structure {
    Primary,
    Unique,
    From { table: String, column: String },
}

/// One row of the table-of-columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnConfig {
    pub table: String,
    pub column: String,
    pub nulltype: Option<String>,
    pub datatype: String,
    pub structure: Vec<Structure>,
}

impl ColumnConfig {
    /// Configuration used for data-file columns the table-of-columns omits
    pub fn default_for(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            nulltype: Some("empty".to_string()),
            datatype: "text".to_string(),
            structure: Vec::new(),
        }
    }
}

/// One row of the table-of-tables, plus its configured columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub name: String,
    pub path: String,
    pub role: Option<Role>,

    /// Configured columns in table-of-columns order
    pub columns: Vec<ColumnConfig>,
}

impl TableConfig {
    pub fn find_column(&self, name: &str) -> Option<&ColumnConfig> {
        self.columns.iter().find(|c| c.column == name)
    }
}

/// A single-column foreign key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKey {
    pub column: String,
    pub ftable: String,
    pub fcolumn: String,
}

/// Table-level constraint sets derived from structure annotations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints {
    pub primary: Vec<String>,
    pub unique: Vec<String>,
    pub foreign: Vec<ForeignKey>,
}

impl Constraints {
    /// True when the column is in the primary or unique set
    pub fn is_unique(&self, column: &str) -> bool {
        self.primary.iter().chain(&self.unique).any(|c| c == column)
    }

    /// Foreign keys whose local column is `column`
    pub fn foreign_keys_for<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a ForeignKey> + 'a {
        self.foreign.iter().filter(move |fk| fk.column == column)
    }
}

/// A resolved nulltype: name plus the condition that defines "empty"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullCheck {
    pub nulltype: String,
    pub condition: Condition,
}

/// One condition of a datatype chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatatypeCheck {
    pub datatype: String,
    pub description: String,
    pub condition: Condition,
}

/// A fully resolved column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub datatype: String,
    pub affinity: StorageAffinity,
    pub nulltype: Option<NullCheck>,

    /// Datatype conditions, root-most ancestor first
    pub checks: Vec<DatatypeCheck>,

    pub primary: bool,
    pub unique: bool,
}

impl ColumnSchema {
    /// Name of the paired audit column
    pub fn meta_name(&self) -> String {
        format!("{}{}", self.name, META_SUFFIX)
    }
}

/// A fully resolved table, frozen before any row is validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub path: String,

    /// Columns in data-file header order
    pub columns: Vec<ColumnSchema>,

    pub constraints: Constraints,
}

impl TableSchema {
    pub fn find_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn conflict_name(&self) -> String {
        format!("{}{}", self.name, CONFLICT_SUFFIX)
    }

    pub fn view_name(&self) -> String {
        format!("{}{}", self.name, VIEW_SUFFIX)
    }
}
