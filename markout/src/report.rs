//! CSV boundary: trade tables in, augmented trade tables and summaries out.
//!
//! Input columns `asset_in, asset_out, timestamp, amount_in, amount_out` may
//! appear in any order among other columns; every input column is copied to
//! the output unchanged, followed by one `markout_{h}` column per horizon.

use std::collections::{BTreeSet, HashSet};
use std::io::{Read, Write};
use std::path::Path;

use csv::StringRecord;
use tracing::{info, instrument, warn};

use crate::error::ReportError;
use crate::summary::SummaryTable;
use crate::types::{MarkoutResultSet, MarkoutValue, Trade};

/// Marker written for unavailable values.
pub const MISSING: &str = "NA";

pub const SUMMARY_HEADERS: [&str; 7] = [
    "horizon",
    "mean_bps",
    "median_bps",
    "std_dev_bps",
    "min_bps",
    "max_bps",
    "count",
];

#[derive(Debug, Clone, Copy)]
struct TradeColumns {
    asset_in: usize,
    asset_out: usize,
    timestamp: usize,
    amount_in: usize,
    amount_out: usize,
}

impl TradeColumns {
    fn locate(headers: &StringRecord) -> Result<Self, ReportError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or(ReportError::MissingColumn(name))
        };

        Ok(Self {
            asset_in: find("asset_in")?,
            asset_out: find("asset_out")?,
            timestamp: find("timestamp")?,
            amount_in: find("amount_in")?,
            amount_out: find("amount_out")?,
        })
    }
}

/// A parsed trade table that remembers its original columns.
#[derive(Debug, Clone)]
pub struct TradeTable {
    headers: StringRecord,
    records: Vec<StringRecord>,
    trades: Vec<Trade>,
}

impl TradeTable {
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_trades_path(path: impl AsRef<Path>) -> Result<TradeTable, ReportError> {
    let file = std::fs::File::open(path.as_ref())?;
    let table = read_trades(file)?;
    info!(trades = table.len(), "trade table loaded");
    Ok(table)
}

/// Parse a trade table. A missing required column or an unparseable numeric
/// field rejects the whole table.
pub fn read_trades<R: Read>(input: R) -> Result<TradeTable, ReportError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(input);

    let headers = reader.headers()?.clone();
    let cols = TradeColumns::locate(&headers)?;

    let mut records = Vec::new();
    let mut trades = Vec::new();

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let number = |idx: usize, column: &'static str| -> Result<f64, ReportError> {
            let raw = record.get(idx).unwrap_or_default().trim();
            raw.parse::<f64>().map_err(|_| ReportError::InvalidField {
                column,
                line,
                value: raw.to_string(),
            })
        };

        let trade = Trade::new(
            record.get(cols.asset_in).unwrap_or_default().trim(),
            record.get(cols.asset_out).unwrap_or_default().trim(),
            number(cols.timestamp, "timestamp")?,
            number(cols.amount_in, "amount_in")?,
            number(cols.amount_out, "amount_out")?,
        );

        trades.push(trade);
        records.push(record);
    }

    Ok(TradeTable {
        headers,
        records,
        trades,
    })
}

fn format_value(value: &MarkoutValue) -> String {
    match value.bps() {
        Some(bps) => bps.to_string(),
        None => MISSING.to_string(),
    }
}

fn format_opt(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

/// Repeated names are still written; readers keyed by name will see only one.
fn warn_on_repeated_headers(headers: &StringRecord) {
    let mut seen = HashSet::new();
    let repeated: BTreeSet<&str> = headers.iter().filter(|h| !seen.insert(*h)).collect();

    if !repeated.is_empty() {
        warn!(columns = ?repeated, "duplicate output column names");
    }
}

/// Write the input table augmented with one markout column per horizon.
pub fn write_markouts<W: Write>(
    table: &TradeTable,
    result: &MarkoutResultSet,
    out: W,
) -> Result<(), ReportError> {
    if table.len() != result.len() {
        return Err(ReportError::ShapeMismatch {
            trades: table.len(),
            rows: result.len(),
        });
    }

    let mut writer = csv::Writer::from_writer(out);

    let mut headers = table.headers.clone();
    for horizon in &result.horizons {
        headers.push_field(&horizon.column_name());
    }
    warn_on_repeated_headers(&headers);
    writer.write_record(&headers)?;

    for (record, row) in table.records.iter().zip(&result.rows) {
        let mut out_record = record.clone();
        for cell in &row.cells {
            out_record.push_field(&format_value(&cell.value));
        }
        writer.write_record(&out_record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the summary table, one row per horizon.
pub fn write_summary<W: Write>(summary: &SummaryTable, out: W) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(SUMMARY_HEADERS)?;

    for row in &summary.rows {
        writer.write_record([
            row.horizon.seconds().to_string(),
            format_opt(row.mean),
            format_opt(row.median),
            format_opt(row.std_dev),
            format_opt(row.min),
            format_opt(row.max),
            row.count.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
