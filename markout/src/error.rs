use thiserror::Error;

/// Configuration errors that reject a batch before any work is done.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarkoutError {
    #[error("at least one horizon is required")]
    NoHorizons,

    #[error("invalid horizon {0:?}: expected whole seconds")]
    InvalidHorizon(String),

    #[error("trade #{index} is malformed: {reason}")]
    InvalidTrade { index: usize, reason: String },

    #[error("batch cancelled after {completed} of {total} trades")]
    Cancelled { completed: usize, total: usize },
}

/// Errors reading trade tables or writing reports.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("trade table is missing required column {0:?}")]
    MissingColumn(&'static str),

    #[error("invalid {column} at line {line}: {value:?}")]
    InvalidField {
        column: &'static str,
        line: u64,
        value: String,
    },

    #[error("result set has {rows} rows but the trade table has {trades}")]
    ShapeMismatch { trades: usize, rows: usize },
}
