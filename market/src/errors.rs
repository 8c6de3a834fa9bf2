use std::path::PathBuf;

use thiserror::Error;

/// Errors building market reference data.
#[derive(Error, Debug)]
pub enum MarketError {
    #[error("snapshot times must be non-decreasing: {prev} followed by {next}")]
    UnorderedSnapshots { prev: i64, next: i64 },

    #[error("failed to read instrument list {path}: {source}")]
    CatalogIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors reading a materialised snapshot table.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing column: {0}")]
    MissingColumn(&'static str),

    #[error("invalid {column} at line {line}: {value:?}")]
    InvalidValue {
        column: &'static str,
        line: u64,
        value: String,
    },

    #[error(transparent)]
    Series(#[from] MarketError),
}

/// Failure raised by a series provider (as opposed to a clean "not available").
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("io error probing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}
