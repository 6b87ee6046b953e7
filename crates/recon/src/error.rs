use thiserror::Error;

use crate::model::Lineage;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty label, duplicate suffix, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Required column absent from a raw input. Aborts the run.
    #[error("{lineage} report: missing column '{column}'")]
    MissingColumn { lineage: Lineage, column: String },
    /// Delimited text could not be read (ragged row, bad UTF-8, ...).
    #[error("{lineage} report: {message}")]
    Csv { lineage: Lineage, message: String },
    /// Writing an export failed.
    #[error("export error: {0}")]
    Export(String),
}

impl ReconError {
    /// True for the schema-violation category: the input lacks a column the
    /// engine cannot run without.
    pub fn is_schema_violation(&self) -> bool {
        matches!(self, Self::MissingColumn { .. })
    }
}

// Writer side only; reader errors carry their lineage and are mapped by hand.
impl From<csv::Error> for ReconError {
    fn from(e: csv::Error) -> Self {
        Self::Export(e.to_string())
    }
}

impl From<std::io::Error> for ReconError {
    fn from(e: std::io::Error) -> Self {
        Self::Export(e.to_string())
    }
}
