//! Run settings (valve.toml)

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Rows validated and committed together
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Field delimiter of control tables, data files, and exports
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// File name of the exported message table
    #[serde(default = "default_message_file")]
    pub message_file: String,

    /// Name of the table-of-tables inside a store (export bootstrap)
    #[serde(default = "default_table_table")]
    pub table_table: String,
}

fn default_chunk_size() -> usize {
    2
}

fn default_delimiter() -> String {
    "\t".to_string()
}

fn default_message_file() -> String {
    "message.tsv".to_string()
}

fn default_table_table() -> String {
    "table".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            delimiter: default_delimiter(),
            message_file: default_message_file(),
            table_table: default_table_table(),
        }
    }
}

impl Settings {
    /// Load settings from TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("{}: {}", path.display(), e)))?;

        Self::from_toml(&contents)
    }

    /// Load settings from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, SettingsError> {
        let settings: Settings =
            toml::from_str(toml).map_err(|e| SettingsError::ParseError(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| SettingsError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| SettingsError::IoError(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Check values serde cannot check
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.chunk_size == 0 {
            return Err(SettingsError::Invalid("chunk_size must be positive".into()));
        }
        if self.delimiter.len() != 1 {
            return Err(SettingsError::Invalid(format!(
                "delimiter must be a single byte, got {:?}",
                self.delimiter
            )));
        }
        Ok(())
    }

    /// Delimiter as the byte the csv reader expects
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b'\t')
    }
}

/// Settings error types
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}
