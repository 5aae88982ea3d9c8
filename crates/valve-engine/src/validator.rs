//! Row/cell validator
//!
//! Validates one row at a time against a frozen `TableSchema`. Invalid cells
//! and duplicate rows are results, not errors: the only failure is a lookup
//! against the store going wrong.

use crate::lookup::{ConstraintLookup, LookupError};
use std::collections::{HashMap, HashSet};
use tracing::trace;
use valve_core::{ColumnSchema, Message, Rule, TableSchema};

/// Validation result for one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Raw text as read from the source
    pub value: String,

    pub valid: bool,

    /// Nulltype the value matched, if any
    pub nulltype: Option<String>,

    pub messages: Vec<Message>,
}

impl Cell {
    fn new(value: String) -> Self {
        Self {
            value,
            valid: true,
            nulltype: None,
            messages: Vec::new(),
        }
    }

    fn fail(&mut self, message: Message) {
        self.valid = false;
        self.messages.push(message);
    }
}

/// Validation result for one row, cells in schema column order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRow {
    pub cells: Vec<Cell>,

    /// Set when any cell violates a primary or unique constraint
    pub duplicate: bool,
}

impl ValidatedRow {
    pub fn invalid_cells(&self) -> usize {
        self.cells.iter().filter(|c| !c.valid).count()
    }

    pub fn message_count(&self) -> usize {
        self.cells.iter().map(|c| c.messages.len()).sum()
    }
}

/// Validates the rows of one table load, in source order
///
/// Remembers the valid values of every primary/unique column so later rows
/// in the same run see earlier ones, whichever table they were routed to.
/// Values are remembered in their stored form, so two spellings the store
/// treats as one key (`7` and `007` in an INTEGER column) collide here too.
#[derive(Debug)]
pub struct RowValidator<'a> {
    schema: &'a TableSchema,
    seen: HashMap<&'a str, HashSet<String>>,
}

impl<'a> RowValidator<'a> {
    pub fn new(schema: &'a TableSchema) -> Self {
        Self {
            schema,
            seen: HashMap::new(),
        }
    }

    pub fn schema(&self) -> &'a TableSchema {
        self.schema
    }

    /// Validate one row of raw values aligned with the schema's columns
    ///
    /// Missing trailing values are treated as empty.
    pub fn validate_row<L>(&mut self, values: &[String], lookup: &L) -> Result<ValidatedRow, LookupError>
    where
        L: ConstraintLookup + ?Sized,
    {
        let mut cells = Vec::with_capacity(self.schema.columns.len());
        let mut duplicate = false;

        for (i, column) in self.schema.columns.iter().enumerate() {
            let value = values.get(i).cloned().unwrap_or_default();
            let (cell, is_duplicate) = self.validate_cell(column, value, lookup)?;
            duplicate |= is_duplicate;
            cells.push(cell);
        }
        if duplicate {
            trace!("{}: duplicate key in {:?}", self.schema.name, values);
        }

        // Remember this row's valid unique values for later rows
        for (column, cell) in self.schema.columns.iter().zip(&cells) {
            if cell.valid && cell.nulltype.is_none() && self.schema.constraints.is_unique(&column.name) {
                self.seen
                    .entry(column.name.as_str())
                    .or_default()
                    .insert(column.affinity.stored_form(&cell.value).into_owned());
            }
        }

        Ok(ValidatedRow { cells, duplicate })
    }

    fn validate_cell<L>(
        &self,
        column: &ColumnSchema,
        value: String,
        lookup: &L,
    ) -> Result<(Cell, bool), LookupError>
    where
        L: ConstraintLookup + ?Sized,
    {
        let mut cell = Cell::new(value);
        let table = &self.schema.name;

        if let Some(null) = &column.nulltype {
            if null.condition.holds(&cell.value) {
                cell.nulltype = Some(null.nulltype.clone());
                return Ok((cell, false));
            }
        }

        let mut duplicate = false;
        if self.schema.constraints.is_unique(&column.name) {
            let seen = self.seen.get(column.name.as_str()).is_some_and(|values| {
                values.contains(&*column.affinity.stored_form(&cell.value))
            });
            if seen || lookup.value_exists(table, &column.name, &cell.value)? {
                duplicate = true;
                cell.fail(Message::error(
                    Rule::UniqueOrPrimaryKey,
                    format!("Values of {} must be unique", column.name),
                ));
            }
        }

        for fk in self.schema.constraints.foreign_keys_for(&column.name) {
            if !lookup.value_exists(&fk.ftable, &fk.fcolumn, &cell.value)? {
                cell.fail(Message::error(
                    Rule::ForeignKey,
                    format!(
                        "Value {} of column {} is not in {}.{}",
                        cell.value, column.name, fk.ftable, fk.fcolumn
                    ),
                ));
            }
        }

        for check in &column.checks {
            if !check.condition.holds(&cell.value) {
                cell.fail(Message::error(
                    Rule::Datatype(check.datatype.clone()),
                    format!("{} should be {}", column.name, check.description),
                ));
            }
        }

        Ok((cell, duplicate))
    }
}
