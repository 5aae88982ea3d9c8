//! VALVE Core
//!
//! Domain model shared by the compiler, validator, and store.
//! Rule names are persisted in stores - never rename them.

pub mod condition;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod report;
pub mod schema;

pub use condition::{Condition, Exclusion, Pattern};
pub use config::{Settings, SettingsError};
pub use diagnostic::{CellRef, Message, MessageRecord, Rule, Severity};
pub use error::{ConditionError, ConfigError, CycleError, SchemaError, ValveError};
pub use report::{LoadReport, ReportSummary, ReportVersion, TableReport};
pub use schema::{
    ColumnConfig, ColumnSchema, Constraints, Datatype, DatatypeCheck, ForeignKey, NullCheck, Role,
    StorageAffinity, Structure, TableConfig, TableSchema, CONFLICT_SUFFIX, META_SUFFIX,
    VIEW_SUFFIX,
};
