//! Datatype hierarchy
//!
//! Datatypes form a forest through their `parent` links. The registry stores
//! them by name and answers two questions: the storage affinity of a
//! datatype, and the conditions a value of that datatype must satisfy.

use crate::control::ControlTable;
use std::collections::{HashMap, HashSet};
use valve_core::{
    Condition, ConditionError, ConfigError, Datatype, DatatypeCheck, NullCheck, SchemaError,
    StorageAffinity, ValveError,
};

/// Columns the table-of-datatypes must have
pub const REQUIRED_COLUMNS: [&str; 4] = ["datatype", "parent", "condition", "SQL type"];

/// Datatypes indexed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatatypeRegistry {
    datatypes: HashMap<String, Datatype>,
}

impl DatatypeRegistry {
    /// Build and check a registry from datatypes
    ///
    /// Every parent must exist and every parent chain must terminate.
    pub fn new(datatypes: impl IntoIterator<Item = Datatype>) -> Result<Self, ConfigError> {
        let registry = Self {
            datatypes: datatypes.into_iter().map(|d| (d.name.clone(), d)).collect(),
        };

        for datatype in registry.datatypes.values() {
            if let Some(parent) = &datatype.parent {
                if !registry.datatypes.contains_key(parent) {
                    return Err(ConfigError::UndefinedParent {
                        datatype: datatype.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        for name in registry.datatypes.keys() {
            registry.ancestry(name)?;
        }

        Ok(registry)
    }

    /// Compile the table-of-datatypes
    pub fn from_control(table: &ControlTable) -> Result<Self, ValveError> {
        table.require_columns(&REQUIRED_COLUMNS)?;

        let mut datatypes = Vec::with_capacity(table.rows.len());
        let mut seen = HashSet::new();
        for row in &table.rows {
            let name = table.required(row, "datatype")?.to_string();
            if !seen.insert(name.clone()) {
                return Err(ConfigError::Duplicate {
                    kind: "datatype",
                    name,
                    path: table.source.clone(),
                }
                .into());
            }

            let condition = match ControlTable::optional(row, "condition") {
                Some(text) => Some(Condition::parse(text).ok_or_else(|| ConditionError {
                    datatype: name.clone(),
                    condition: text.to_string(),
                })?),
                None => None,
            };

            datatypes.push(Datatype {
                parent: ControlTable::optional(row, "parent").map(str::to_string),
                sql_type: ControlTable::optional(row, "SQL type").map(str::to_string),
                description: ControlTable::optional(row, "description").map(str::to_string),
                condition,
                name,
            });
        }

        Ok(Self::new(datatypes)?)
    }

    pub fn get(&self, name: &str) -> Option<&Datatype> {
        self.datatypes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.datatypes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.datatypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datatypes.is_empty()
    }

    /// The datatype followed by its ancestors, most specific first
    fn ancestry<'a>(&'a self, name: &str) -> Result<Vec<&'a Datatype>, ConfigError> {
        let mut chain: Vec<&Datatype> = Vec::new();
        let mut current = Some(name);

        while let Some(n) = current {
            let datatype = self.datatypes.get(n).ok_or_else(|| ConfigError::UndefinedParent {
                datatype: chain.last().map(|d| d.name.clone()).unwrap_or_default(),
                parent: n.to_string(),
            })?;

            if chain.iter().any(|d| d.name == datatype.name) {
                let mut names: Vec<String> = chain.iter().map(|d| d.name.clone()).collect();
                names.push(datatype.name.clone());
                return Err(ConfigError::ParentCycle { chain: names });
            }

            chain.push(datatype);
            current = datatype.parent.as_deref();
        }

        Ok(chain)
    }

    /// Storage affinity: the first `SQL type` found walking up from `name`
    pub fn storage_affinity(&self, name: &str) -> Result<StorageAffinity, ValveError> {
        for datatype in self.ancestry(name)? {
            if let Some(sql_type) = &datatype.sql_type {
                return StorageAffinity::parse(sql_type).ok_or_else(|| {
                    SchemaError::UnrecognizedAffinity {
                        datatype: name.to_string(),
                        affinity: sql_type.clone(),
                    }
                    .into()
                });
            }
        }

        Err(SchemaError::MissingAffinity {
            datatype: name.to_string(),
        }
        .into())
    }

    /// Conditions to evaluate for `name`, root-most ancestor first
    ///
    /// Ancestors without a condition are skipped.
    pub fn conditions_of(&self, name: &str) -> Result<Vec<DatatypeCheck>, ConfigError> {
        let mut checks: Vec<DatatypeCheck> = self
            .ancestry(name)?
            .into_iter()
            .filter_map(|d| {
                d.condition.as_ref().map(|condition| DatatypeCheck {
                    datatype: d.name.clone(),
                    description: d.describe().to_string(),
                    condition: condition.clone(),
                })
            })
            .collect();
        checks.reverse();
        Ok(checks)
    }

    /// The condition that makes a value an instance of nulltype `name`
    pub fn null_check(&self, name: &str) -> Result<NullCheck, ConfigError> {
        let datatype = self.get(name).ok_or_else(|| ConfigError::UndefinedNulltype {
            nulltype: name.to_string(),
            path: String::new(),
        })?;

        let condition = datatype
            .condition
            .clone()
            .ok_or_else(|| ConfigError::NulltypeWithoutCondition {
                nulltype: name.to_string(),
            })?;

        Ok(NullCheck {
            nulltype: name.to_string(),
            condition,
        })
    }
}
