//! Load report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Outcome of loading one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,

    /// Rows read from the data file
    pub rows: usize,

    /// Rows written to the main table
    pub main_rows: usize,

    /// Rows quarantined in the conflict table
    pub conflict_rows: usize,

    /// Cells marked invalid
    pub invalid_cells: usize,

    /// Messages recorded in audit columns
    pub messages: usize,

    /// Batches committed
    pub chunks: usize,
}

impl TableReport {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }
}

/// Totals across all tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub tables: usize,
    pub rows: usize,
    pub main_rows: usize,
    pub conflict_rows: usize,
    pub invalid_cells: usize,
    pub messages: usize,
}

/// Load report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Tables in load order
    pub load_order: Vec<String>,

    /// Summary statistics
    pub summary: ReportSummary,

    /// Per-table outcomes in load order
    pub tables: Vec<TableReport>,
}

impl LoadReport {
    /// Create a new empty report
    pub fn new(load_order: Vec<String>) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            load_order,
            summary: ReportSummary::default(),
            tables: Vec::new(),
        }
    }

    /// Add a table outcome to the report
    pub fn add_table(&mut self, table: TableReport) {
        self.summary.tables += 1;
        self.summary.rows += table.rows;
        self.summary.main_rows += table.main_rows;
        self.summary.conflict_rows += table.conflict_rows;
        self.summary.invalid_cells += table.invalid_cells;
        self.summary.messages += table.messages;
        self.tables.push(table);
    }

    /// Check if any row was quarantined
    pub fn has_conflicts(&self) -> bool {
        self.summary.conflict_rows > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}
