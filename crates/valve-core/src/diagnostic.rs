//! Validation messages and cell coordinates
//!
//! Rule names are persisted inside audit columns and written to message.tsv.
//! NEVER rename them - stores produced by earlier runs depend on them.

use serde::{Deserialize, Serialize};

/// Rule that produced a validation message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Rule {
    /// Value repeats a value of a `primary` or `unique` column
    UniqueOrPrimaryKey,

    /// Value is missing from the referenced table/column
    ForeignKey,

    /// Value fails the condition of the named datatype
    Datatype(String),

    /// Rule name read back from a store that this build does not know
    Other(String),
}

impl Rule {
    const UNIQUE: &'static str = "unique or primary key";
    const FOREIGN: &'static str = "foreign key";
    const DATATYPE_PREFIX: &'static str = "datatype:";

    /// Get the rule as its persisted string identifier
    pub fn as_string(&self) -> String {
        match self {
            Self::UniqueOrPrimaryKey => Self::UNIQUE.to_string(),
            Self::ForeignKey => Self::FOREIGN.to_string(),
            Self::Datatype(name) => format!("{}{}", Self::DATATYPE_PREFIX, name),
            Self::Other(name) => name.clone(),
        }
    }

    /// Parse a persisted rule identifier
    pub fn parse(s: &str) -> Self {
        match s {
            Self::UNIQUE => Self::UniqueOrPrimaryKey,
            Self::FOREIGN => Self::ForeignKey,
            _ => match s.strip_prefix(Self::DATATYPE_PREFIX) {
                Some(name) => Self::Datatype(name.to_string()),
                None => Self::Other(s.to_string()),
            },
        }
    }
}

impl From<Rule> for String {
    fn from(rule: Rule) -> Self {
        rule.as_string()
    }
}

impl From<String> for Rule {
    fn from(s: String) -> Self {
        Rule::parse(&s)
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_string())
    }
}

/// Message severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - value kept, worth reviewing
    Warn,

    /// Error - the cell is invalid
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A validation message attached to one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Rule that fired
    pub rule: Rule,

    /// Severity level
    pub level: Severity,

    /// Human-readable text
    pub message: String,
}

impl Message {
    /// Create an error-level message
    pub fn error(rule: Rule, message: impl Into<String>) -> Self {
        Self {
            rule,
            level: Severity::Error,
            message: message.into(),
        }
    }
}

/// Spreadsheet-style cell coordinate (`A2`, `AB17`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    /// Zero-based column ordinal
    pub column: usize,

    /// Spreadsheet row number (the header is row 1)
    pub row: usize,
}

impl CellRef {
    /// Coordinate of the `index`-th data row (zero-based), header excluded
    pub fn data_cell(column: usize, index: usize) -> Self {
        Self {
            column,
            row: index + 2,
        }
    }

    /// Bijective base-26 column letters
    pub fn column_letters(column: usize) -> String {
        let mut n = column + 1;
        let mut letters = Vec::new();
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(b'A' + rem as u8);
            n = (n - 1) / 26;
        }
        letters.reverse();
        String::from_utf8_lossy(&letters).into_owned()
    }
}

impl std::fmt::Display for CellRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", Self::column_letters(self.column), self.row)
    }
}

/// A message located in an exported table (one row of message.tsv)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub table: String,
    pub cell: String,
    pub rule: String,
    pub level: String,
    pub message: String,
}

impl MessageRecord {
    /// Locate a cell message in a table
    pub fn new(table: impl Into<String>, cell: CellRef, message: &Message) -> Self {
        Self {
            table: table.into(),
            cell: cell.to_string(),
            rule: message.rule.as_string(),
            level: message.level.to_string(),
            message: message.message.clone(),
        }
    }
}
