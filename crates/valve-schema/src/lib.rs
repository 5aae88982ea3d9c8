//! Config compiler, datatype resolver, and dependency resolver
//!
//! This crate handles:
//! - Reading the control tables (from delimited files or a store)
//! - Resolving the datatype hierarchy
//! - Deriving frozen per-table schemas from data-file headers
//! - Ordering tables by foreign key (DAG)

pub mod catalog;
pub mod control;
pub mod dag;
pub mod datatype;
pub mod derive;
pub mod structure;
pub mod tsv;

pub use catalog::Catalog;
pub use control::{ControlSource, ControlTable, Record, TsvSource};
pub use dag::{DependencyGraph, NodeId};
pub use datatype::DatatypeRegistry;
pub use derive::{derive_table, file_header, CompiledSchema};
pub use structure::parse_structure;
