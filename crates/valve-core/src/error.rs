//! Error kinds
//!
//! Invalid cells and duplicate rows are NOT errors - they are recorded in the
//! store. Everything here aborts the run.

/// Control tables are missing, malformed, or inconsistent
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read '{path}': {message}")]
    Read { path: String, message: String },

    #[error("No rows in '{path}'")]
    Empty { path: String },

    #[error("Missing required column '{column}' reading '{path}'")]
    MissingColumn { column: String, path: String },

    #[error("Missing required value for '{column}' reading '{path}'")]
    MissingValue { column: String, path: String },

    #[error("Unrecognized table type '{role}' in '{path}'")]
    UnknownRole { role: String, path: String },

    #[error("Multiple tables with type '{role}' declared in '{path}'")]
    DuplicateRole { role: String, path: String },

    #[error("Missing required '{role}' table in '{path}'")]
    MissingRole { role: String, path: String },

    #[error("Special 'table' path '{declared}' does not match this path '{path}'")]
    TablePathMismatch { declared: String, path: String },

    #[error("Duplicate {kind} '{name}' reading '{path}'")]
    Duplicate { kind: &'static str, name: String, path: String },

    #[error("Undefined table '{table}' reading '{path}'")]
    UndefinedTable { table: String, path: String },

    #[error("Undefined nulltype '{nulltype}' reading '{path}'")]
    UndefinedNulltype { nulltype: String, path: String },

    #[error("Undefined datatype '{datatype}' reading '{path}'")]
    UndefinedDatatype { datatype: String, path: String },

    #[error("Undefined parent '{parent}' of datatype '{datatype}'")]
    UndefinedParent { datatype: String, parent: String },

    #[error("Datatype parent chain does not terminate: {}", chain.join(" -> "))]
    ParentCycle { chain: Vec<String> },

    #[error("Nulltype '{nulltype}' has no condition")]
    NulltypeWithoutCondition { nulltype: String },

    #[error("Column {table}.{column} references undefined table '{ftable}'")]
    UndefinedForeignTable { table: String, column: String, ftable: String },
}

/// A table's storage schema cannot be derived
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing SQL type for {datatype}")]
    MissingAffinity { datatype: String },

    #[error("Unrecognized SQL type '{affinity}' for {datatype}")]
    UnrecognizedAffinity { datatype: String, affinity: String },

    #[error("Unrecognized structure '{token}' for {table}.{column}")]
    MalformedStructure { table: String, column: String, token: String },

    #[error("Invalid foreign key: {structure} for: {table}")]
    InvalidForeignKey { table: String, structure: String },

    #[error("Foreign key {table}.{column} references unknown column {ftable}.{fcolumn}")]
    UnknownForeignColumn {
        table: String,
        column: String,
        ftable: String,
        fcolumn: String,
    },

    #[error("No header row in '{path}'")]
    MissingHeader { path: String },

    #[error("Duplicate column '{column}' in '{path}'")]
    DuplicateColumn { column: String, path: String },
}

/// A datatype declares a condition outside the supported set
#[derive(Debug, thiserror::Error)]
#[error("Unhandled condition '{condition}' for datatype '{datatype}'")]
pub struct ConditionError {
    pub datatype: String,
    pub condition: String,
}

/// Foreign keys form a cycle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CycleError {
    /// Tables on the cycle; the first table is repeated at the end
    pub cycle: Vec<String>,

    /// Human-readable chain naming each offending column pair
    pub message: String,
}

/// Any fatal error raised while compiling or applying the configuration
#[derive(Debug, thiserror::Error)]
pub enum ValveError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error(transparent)]
    Cycle(#[from] CycleError),
}
