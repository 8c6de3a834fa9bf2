use std::path::PathBuf;

use clap::Parser;

/// Compute post-trade markouts against local order-book snapshots.
#[derive(Debug, Parser)]
#[command(name = "markouts", version)]
pub struct Cli {
    /// Trade table (CSV) with asset_in, asset_out, timestamp, amount_in, amount_out
    #[arg(long, env = "MARKOUT_TRADES")]
    pub trades: PathBuf,

    /// Where to write the trade table augmented with markout columns (stdout if omitted)
    #[arg(long, env = "MARKOUT_OUT")]
    pub out: Option<PathBuf>,

    /// Where to write the per-horizon summary (logged if omitted)
    #[arg(long, env = "MARKOUT_SUMMARY_OUT")]
    pub summary_out: Option<PathBuf>,

    /// Write the summary as JSON instead of CSV
    #[arg(long)]
    pub json_summary: bool,

    /// Directory holding materialised snapshot day files
    #[arg(long, env = "MARKOUT_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Instrument list, one symbol per line
    #[arg(long, env = "MARKOUT_INSTRUMENTS")]
    pub instruments: PathBuf,

    /// Horizons in seconds (comma-separated)
    #[arg(long, env = "MARKOUT_HORIZONS", default_value = "60,300,900,3600,86400")]
    pub horizons: String,

    /// Exchange prefix of the snapshot file names
    #[arg(long, env = "MARKOUT_EXCHANGE", default_value = "binance")]
    pub exchange: String,

    /// Data type segment of the snapshot file names
    #[arg(long, env = "MARKOUT_DATA_TYPE", default_value = "book_snapshot_5")]
    pub data_type: String,

    /// Days searched back from a query day with no eligible snapshot
    #[arg(long, env = "MARKOUT_LOOKBACK_DAYS", default_value_t = market::DEFAULT_LOOKBACK_DAYS)]
    pub lookback_days: u32,

    /// Worker threads for the batch (0 = one per core)
    #[arg(long, env = "MARKOUT_THREADS", default_value_t = 0)]
    pub threads: usize,
}
