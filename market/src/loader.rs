//! Reader for materialised top-of-book snapshot tables.
//!
//! Accepts either a plain `timestamp,best_bid,best_ask` layout or the Tardis
//! `book_snapshot_5` export (`timestamp`, `bids[0].price`, `asks[0].price`,
//! plus depth columns that are ignored). Timestamps are integer microseconds.

use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, instrument};

use crate::errors::LoaderError;
use crate::series::ReferenceSeries;
use crate::types::BookSnapshot;

pub const TIMESTAMP_COLUMN: &str = "timestamp";
const BID_COLUMNS: &[&str] = &["best_bid", "bids[0].price"];
const ASK_COLUMNS: &[&str] = &["best_ask", "asks[0].price"];

#[derive(Debug, Clone, Copy)]
struct Columns {
    timestamp: usize,
    bid: usize,
    ask: usize,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, LoaderError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        Ok(Self {
            timestamp: find(&[TIMESTAMP_COLUMN])
                .ok_or(LoaderError::MissingColumn(TIMESTAMP_COLUMN))?,
            bid: find(BID_COLUMNS).ok_or(LoaderError::MissingColumn("best_bid"))?,
            ask: find(ASK_COLUMNS).ok_or(LoaderError::MissingColumn("best_ask"))?,
        })
    }
}

/// Load a snapshot table from a CSV file.
#[instrument(skip_all, fields(path = %path.as_ref().display()), level = "debug")]
pub fn load_series(path: impl AsRef<Path>) -> Result<ReferenceSeries, LoaderError> {
    let file = std::fs::File::open(path.as_ref())?;
    read_series(file)
}

/// Parse a snapshot table from any reader.
///
/// Rows with an empty bid or ask (one-sided book) are skipped. Any other
/// unparseable value fails the whole table.
pub fn read_series<R: Read>(input: R) -> Result<ReferenceSeries, LoaderError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let columns = Columns::locate(reader.headers()?)?;

    let mut snapshots = Vec::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let raw_bid = record.get(columns.bid).unwrap_or_default().trim();
        let raw_ask = record.get(columns.ask).unwrap_or_default().trim();
        if raw_bid.is_empty() || raw_ask.is_empty() {
            skipped += 1;
            continue;
        }

        let ts_us = parse_field::<i64>(&record, columns.timestamp, TIMESTAMP_COLUMN, line)?;
        let best_bid = parse_field::<f64>(&record, columns.bid, "best_bid", line)?;
        let best_ask = parse_field::<f64>(&record, columns.ask, "best_ask", line)?;

        snapshots.push(BookSnapshot::new(ts_us, best_bid, best_ask));
    }

    debug!(rows = snapshots.len(), skipped, "snapshot table parsed");

    Ok(ReferenceSeries::new(snapshots)?)
}

fn parse_field<T: std::str::FromStr>(
    record: &StringRecord,
    idx: usize,
    column: &'static str,
    line: u64,
) -> Result<T, LoaderError> {
    let raw = record.get(idx).unwrap_or_default().trim();
    raw.parse::<T>().map_err(|_| LoaderError::InvalidValue {
        column,
        line,
        value: raw.to_string(),
    })
}
