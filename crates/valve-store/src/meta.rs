//! Audit column encoding
//!
//! Every data column `c` has a `c_meta` column holding a JSON object:
//!
//! ```json
//! {"valid": false, "value": "12x", "messages": [{"rule": "datatype:integer", "level": "error", "message": "n should be an integer"}]}
//! ```
//!
//! `value` is present whenever the data column does not hold the raw text.
//! A valid cell whose data column holds its raw text stores SQL `NULL`.

use serde::{Deserialize, Serialize};
use valve_core::{Message, StorageAffinity};
use valve_engine::Cell;

/// Decoded audit value of one cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellMeta {
    pub valid: bool,

    /// Original text, when the data column does not hold it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nulltype: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

impl CellMeta {
    /// Encode a validated cell
    ///
    /// Returns the value for the data column and the audit record, if any.
    pub fn encode(cell: &Cell, affinity: StorageAffinity) -> (Option<String>, Option<CellMeta>) {
        if !cell.valid || cell.nulltype.is_some() {
            let meta = CellMeta {
                valid: cell.valid,
                value: Some(cell.value.clone()),
                nulltype: cell.nulltype.clone(),
                messages: cell.messages.clone(),
            };
            return (None, Some(meta));
        }

        if survives_affinity(affinity, &cell.value) {
            (Some(cell.value.clone()), None)
        } else {
            let meta = CellMeta {
                valid: true,
                value: Some(cell.value.clone()),
                nulltype: None,
                messages: Vec::new(),
            };
            (Some(cell.value.clone()), Some(meta))
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Whether text stored in a column of `affinity` reads back unchanged
pub fn survives_affinity(affinity: StorageAffinity, text: &str) -> bool {
    affinity.stored_form(text) == text
}
