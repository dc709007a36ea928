use std::io;
use std::path::PathBuf;

/// Result type for loading and deriving the orders table.
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Errors that abort the pipeline before any aggregate is produced.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("cannot read {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("required column '{0}' is missing")]
    MissingColumn(String),

    #[error("row {row}: column '{column}' has unparsable timestamp '{value}'")]
    InvalidTimestamp {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: column '{column}' has unparsable number '{value}'")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
