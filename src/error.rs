use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The four input sources a report run depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Ledger,
    Accounts,
    Entities,
    Index,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Ledger => "balance ledger",
            SourceKind::Accounts => "chart of accounts",
            SourceKind::Entities => "entity roster",
            SourceKind::Index => "price index",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum AdjustmentReportError {
    #[error("Source not found: {source_kind} ({})", path.display())]
    SourceNotFound {
        source_kind: SourceKind,
        path: PathBuf,
    },

    #[error("No data for these filters: {desde} to {hasta}")]
    NoData { desde: String, hasta: String },

    #[error("Invalid period: {0}. Expected YYYY-MM")]
    InvalidPeriod(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AdjustmentReportError>;
