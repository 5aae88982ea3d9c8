//! VALVE engine - row and cell validation
//!
//! This crate implements:
//! - Per-cell checks: nulltype, uniqueness, foreign key, datatype chain
//! - Per-row duplicate detection across a whole load run
//! - The `ConstraintLookup` seam to already-persisted data

pub mod lookup;
pub mod validator;

pub use lookup::{ConstraintLookup, LookupError, MemoryLookup};
pub use validator::{Cell, RowValidator, ValidatedRow};
