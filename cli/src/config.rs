use std::path::PathBuf;

use anyhow::Context;
use markout::Horizons;

use crate::cli::Cli;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub trades_path: PathBuf,

    /// `None` writes the augmented table to stdout.
    pub markouts_out: Option<PathBuf>,

    /// `None` logs the summary instead of writing it.
    pub summary_out: Option<PathBuf>,
    pub json_summary: bool,

    // =========================
    // Reference data
    // =========================
    pub data_dir: PathBuf,
    pub instruments_path: PathBuf,
    pub exchange: String,
    pub data_type: String,
    pub lookback_days: u32,

    // =========================
    // Computation
    // =========================
    /// Validated, non-empty, in request order.
    pub horizons: Horizons,

    /// Size of the rayon pool. Zero keeps rayon's default (one per core).
    pub threads: usize,

    /// JSON log lines instead of pretty output.
    pub json_logs: bool,
}

impl AppConfig {
    /// Validate parsed arguments. `APP_ENV=production` switches logs to JSON.
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        let app_env = std::env::var("APP_ENV").unwrap_or_default();
        Self::build(cli, app_env == "production")
    }

    fn build(cli: Cli, json_logs: bool) -> anyhow::Result<Self> {
        let horizons: Horizons = cli
            .horizons
            .parse()
            .with_context(|| format!("invalid --horizons {:?}", cli.horizons))?;

        Ok(Self {
            trades_path: cli.trades,
            markouts_out: cli.out,
            summary_out: cli.summary_out,
            json_summary: cli.json_summary,
            data_dir: cli.data_dir,
            instruments_path: cli.instruments,
            exchange: cli.exchange,
            data_type: cli.data_type,
            lookback_days: cli.lookback_days,
            horizons,
            threads: cli.threads,
            json_logs,
        })
    }
}
