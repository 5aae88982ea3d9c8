//! Structure annotation parsing
//!
//! A column's `structure` cell holds whitespace-separated tokens:
//! `primary`, `unique`, and `from(table.column)`.

use valve_core::{SchemaError, Structure};

/// Parse a `structure` cell
pub fn parse_structure(table: &str, column: &str, text: &str) -> Result<Vec<Structure>, SchemaError> {
    let mut result = Vec::new();

    for token in text.split_whitespace() {
        let lower = token.to_lowercase();
        let structure = match lower.as_str() {
            "primary" => Structure::Primary,
            "unique" => Structure::Unique,
            _ if lower.starts_with("from(") && lower.ends_with(')') => {
                // Keywords are case-insensitive; referenced names are not
                let target = &token["from(".len()..token.len() - 1];
                parse_foreign_target(table, text, target)?
            }
            _ => {
                return Err(SchemaError::MalformedStructure {
                    table: table.to_string(),
                    column: column.to_string(),
                    token: token.to_string(),
                })
            }
        };

        if !result.contains(&structure) {
            result.push(structure);
        }
    }

    Ok(result)
}

fn parse_foreign_target(table: &str, structure: &str, target: &str) -> Result<Structure, SchemaError> {
    let invalid = || SchemaError::InvalidForeignKey {
        table: table.to_string(),
        structure: structure.to_string(),
    };

    let (ftable, fcolumn) = target.split_once('.').ok_or_else(invalid)?;
    if ftable.is_empty() || fcolumn.is_empty() {
        return Err(invalid());
    }

    Ok(Structure::From {
        table: ftable.to_string(),
        column: fcolumn.to_string(),
    })
}
