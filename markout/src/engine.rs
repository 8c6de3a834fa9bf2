//! The markout engine.
//!
//! For each trade it:
//!   1. Resolves the traded pair to a known instrument (direct or reversed).
//!   2. Converts the trade time to microseconds.
//!   3. Resolves the reference mid at `trade_time + h` for every horizon.
//!   4. Expresses the mid in the trade's orientation and computes bps.
//!
//! Trades are independent, so a batch is a parallel map over trades. Horizons
//! within a trade run sequentially in request order.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use common::logger::{TraceId, root_span};
use market::time::seconds_to_micros;
use market::{InstrumentCatalog, ReferencePriceResolver, SeriesProvider, Unavailable};
use rayon::prelude::*;
use tracing::{Span, debug, info, warn};

use crate::error::MarkoutError;
use crate::types::{Horizons, MarkoutCell, MarkoutResultSet, MarkoutRow, MarkoutValue, Trade};

const BPS: f64 = 10_000.0;

/// Markout of `reference` against `execution`, in basis points:
/// `(reference - execution) / execution * 10_000`.
///
/// `None` when the execution price is zero, negative or non-finite.
pub fn markout_bps(reference: f64, execution: f64) -> Option<f64> {
    if !execution.is_finite() || execution <= 0.0 {
        return None;
    }
    Some((reference - execution) / execution * BPS)
}

/// Cooperative cancellation flag, checked between trades.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct MarkoutEngine<C, P> {
    catalog: Arc<C>,
    resolver: Arc<ReferencePriceResolver<P>>,
}

impl<C, P> MarkoutEngine<C, P>
where
    C: InstrumentCatalog,
    P: SeriesProvider,
{
    /// Build an engine with its own resolver cache.
    pub fn new(catalog: C, provider: P) -> Self {
        Self {
            catalog: Arc::new(catalog),
            resolver: Arc::new(ReferencePriceResolver::new(provider)),
        }
    }

    /// Build an engine over a shared catalog and resolver, so several engines
    /// (or repeated batches) reuse already materialised series.
    pub fn with_resolver(catalog: Arc<C>, resolver: Arc<ReferencePriceResolver<P>>) -> Self {
        Self { catalog, resolver }
    }

    pub fn resolver(&self) -> &ReferencePriceResolver<P> {
        &self.resolver
    }

    pub fn compute_markouts(
        &self,
        trades: &[Trade],
        horizons: &Horizons,
    ) -> Result<MarkoutResultSet, MarkoutError> {
        self.compute_markouts_with_cancel(trades, horizons, &CancelToken::new())
    }

    /// Compute markouts for a batch.
    ///
    /// Every trade is validated before any lookup runs; one malformed trade
    /// rejects the batch. After that, no per-trade failure can abort the
    /// batch: misses become `Unavailable` cells. Raising `cancel` stops the
    /// batch between trades with [`MarkoutError::Cancelled`].
    pub fn compute_markouts_with_cancel(
        &self,
        trades: &[Trade],
        horizons: &Horizons,
        cancel: &CancelToken,
    ) -> Result<MarkoutResultSet, MarkoutError> {
        for (index, trade) in trades.iter().enumerate() {
            trade.validate(index)?;
        }

        let trace_id = TraceId::new();
        let span = root_span("compute_markouts", &trace_id);
        span.record("trades", trades.len());
        span.record("horizons", horizons.len());
        let _guard = span.enter();

        let completed = AtomicUsize::new(0);
        let parent = Span::current();

        let rows = trades
            .par_iter()
            .map(|trade| {
                if cancel.is_cancelled() {
                    return None;
                }
                let row = parent.in_scope(|| self.markout_trade(trade, horizons));
                completed.fetch_add(1, Ordering::Relaxed);
                Some(row)
            })
            .collect::<Option<Vec<_>>>();

        let Some(rows) = rows else {
            let completed = completed.load(Ordering::Relaxed);
            warn!(completed, total = trades.len(), "markout batch cancelled");
            return Err(MarkoutError::Cancelled {
                completed,
                total: trades.len(),
            });
        };

        let result = MarkoutResultSet {
            horizons: horizons.clone(),
            rows,
        };

        report_unknown_pairs(&result);

        info!(
            trades = result.len(),
            horizons = horizons.len(),
            unknown_instrument = result.unknown_instrument_trades(),
            "markout batch complete"
        );

        Ok(result)
    }

    /// Markouts for a single trade. Pure apart from the resolver's read cache.
    pub fn markout_trade(&self, trade: &Trade, horizons: &Horizons) -> MarkoutRow {
        let execution_price = trade.execution_price();

        let Some((instrument, orientation)) =
            self.catalog.resolve_pair(&trade.asset_in, &trade.asset_out)
        else {
            debug!(
                asset_in = %trade.asset_in,
                asset_out = %trade.asset_out,
                "no instrument for pair; markouts unavailable"
            );
            return MarkoutRow {
                trade: trade.clone(),
                instrument: None,
                orientation: None,
                execution_price,
                cells: horizons
                    .iter()
                    .map(|&horizon| MarkoutCell {
                        horizon,
                        reference_price: None,
                        value: MarkoutValue::Unavailable(Unavailable::UnknownInstrument),
                    })
                    .collect(),
            };
        };

        // validate() guarantees a finite timestamp, so this only fails on
        // values beyond the i64 microsecond range.
        let trade_us = seconds_to_micros(trade.timestamp);

        let cells = horizons
            .iter()
            .map(|&horizon| {
                let reference = trade_us
                    .ok_or(Unavailable::NoSnapshotBefore)
                    .and_then(|t| {
                        self.resolver
                            .resolve(&instrument, t.saturating_add(horizon.as_micros()))
                    })
                    .and_then(|mid| {
                        let oriented = orientation.orient(mid);
                        if oriented.is_finite() && oriented > 0.0 {
                            Ok(oriented)
                        } else {
                            Err(Unavailable::DegenerateReference)
                        }
                    });

                let value = match (reference, execution_price) {
                    (Err(reason), _) => MarkoutValue::Unavailable(reason),
                    (Ok(_), None) => MarkoutValue::Unavailable(Unavailable::DegeneratePrice),
                    (Ok(m), Some(p)) => match markout_bps(m, p) {
                        Some(bps) if bps.is_finite() => MarkoutValue::Bps(bps),
                        Some(_) => MarkoutValue::Unavailable(Unavailable::DegenerateReference),
                        None => MarkoutValue::Unavailable(Unavailable::DegeneratePrice),
                    },
                };

                MarkoutCell {
                    horizon,
                    reference_price: reference.ok(),
                    value,
                }
            })
            .collect();

        MarkoutRow {
            trade: trade.clone(),
            instrument: Some(instrument),
            orientation: Some(orientation),
            execution_price,
            cells,
        }
    }
}

fn report_unknown_pairs(result: &MarkoutResultSet) {
    let pairs: BTreeSet<String> = result
        .rows
        .iter()
        .filter(|r| r.instrument.is_none())
        .map(|r| format!("{}/{}", r.trade.asset_in, r.trade.asset_out))
        .collect();

    if !pairs.is_empty() {
        warn!(
            trades = result.unknown_instrument_trades(),
            pairs = ?pairs,
            "trades skipped: no known instrument for either asset ordering"
        );
    }
}
