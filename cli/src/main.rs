pub mod cli;
pub mod config;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::task::JoinHandle;

use common::logger::init_tracing;
use market::{LocalDirProvider, ReferencePriceResolver, StaticCatalog};
use markout::{
    CancelToken, Horizons, MarkoutEngine, MarkoutError, MarkoutResultSet, SummaryTable, Trade,
    report::{TradeTable, read_trades_path, write_markouts, write_summary},
    summarize,
};

use crate::cli::Cli;
use crate::config::AppConfig;

type Engine = MarkoutEngine<StaticCatalog, LocalDirProvider>;

/// Runs the batch on the blocking pool. Ctrl-C raises the cancel flag and
/// waits for in-flight trades to finish.
async fn run_batch(
    engine: Engine,
    trades: Vec<Trade>,
    horizons: Horizons,
) -> anyhow::Result<MarkoutResultSet> {
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();

    let handle = tokio::task::spawn_blocking(move || {
        engine.compute_markouts_with_cancel(&trades, &horizons, &worker_cancel)
    });

    await_batch(handle, &cancel, tokio::signal::ctrl_c()).await
}

/// Wait for the worker, cancelling it when `shutdown` fires. A shutdown
/// future that fails (no signal handler) leaves the batch running.
async fn await_batch<T, S>(
    mut handle: JoinHandle<Result<T, MarkoutError>>,
    cancel: &CancelToken,
    shutdown: S,
) -> anyhow::Result<T>
where
    S: Future<Output = io::Result<()>>,
{
    tokio::select! {
        joined = &mut handle => Ok(joined.context("markout worker panicked")??),
        signal = shutdown => {
            match signal {
                Ok(()) => {
                    tracing::warn!("Shutdown signal received, cancelling batch");
                    cancel.cancel();
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "ctrl-c handler unavailable; batch runs to completion"
                    );
                }
            }
            Ok(handle.await.context("markout worker panicked")??)
        }
    }
}

fn emit_markouts(
    cfg: &AppConfig,
    table: &TradeTable,
    result: &MarkoutResultSet,
) -> anyhow::Result<()> {
    match &cfg.markouts_out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_markouts(table, result, BufWriter::new(file))?;
            tracing::info!(path = %path.display(), rows = result.len(), "markouts written");
        }
        None => {
            let stdout = io::stdout();
            write_markouts(table, result, stdout.lock())?;
        }
    }
    Ok(())
}

fn emit_summary(cfg: &AppConfig, summary: &SummaryTable) -> anyhow::Result<()> {
    let Some(path) = &cfg.summary_out else {
        for row in &summary.rows {
            tracing::info!(
                horizon = %row.horizon,
                count = row.count,
                unavailable = row.unavailable_total(),
                mean_bps = ?row.mean,
                median_bps = ?row.median,
                std_dev_bps = ?row.std_dev,
                "markout summary"
            );
        }
        return Ok(());
    };

    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);

    if cfg.json_summary {
        serde_json::to_writer_pretty(&mut out, summary).context("failed to encode summary")?;
        out.flush()?;
    } else {
        write_summary(summary, out)?;
    }

    tracing::info!(path = %path.display(), "summary written");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_cli(Cli::parse())?;
    init_tracing("markouts", cfg.json_logs);

    tracing::info!("Starting markout batch...");

    if cfg.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.threads)
            .build_global()
            .context("failed to size the worker pool")?;
    }

    let catalog = StaticCatalog::from_file(&cfg.instruments_path).with_context(|| {
        format!(
            "failed to load instruments from {}",
            cfg.instruments_path.display()
        )
    })?;
    let provider = LocalDirProvider::new(&cfg.data_dir)
        .with_exchange(cfg.exchange.clone())
        .with_data_type(cfg.data_type.clone());

    let table = read_trades_path(&cfg.trades_path)
        .with_context(|| format!("failed to read trades from {}", cfg.trades_path.display()))?;

    tracing::info!(
        trades = table.len(),
        instruments = catalog.len(),
        horizons = cfg.horizons.len(),
        data_dir = %cfg.data_dir.display(),
        "inputs loaded"
    );

    let resolver = ReferencePriceResolver::new(provider).with_lookback_days(cfg.lookback_days);
    let engine = MarkoutEngine::with_resolver(Arc::new(catalog), Arc::new(resolver));
    let result = run_batch(engine, table.trades().to_vec(), cfg.horizons.clone()).await?;

    emit_markouts(&cfg, &table, &result)?;
    emit_summary(&cfg, &summarize(&result))?;

    Ok(())
}
