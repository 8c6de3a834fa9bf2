use std::fmt;
use std::str::FromStr;

use market::time::horizon_to_micros;
use market::{Instrument, Orientation, Unavailable};
use serde::{Deserialize, Serialize};

use crate::error::MarkoutError;

/// One executed swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub asset_in: String,
    pub asset_out: String,

    /// Execution time, seconds since epoch.
    pub timestamp: f64,

    pub amount_in: f64,
    pub amount_out: f64,
}

impl Trade {
    pub fn new(
        asset_in: impl Into<String>,
        asset_out: impl Into<String>,
        timestamp: f64,
        amount_in: f64,
        amount_out: f64,
    ) -> Self {
        Self {
            asset_in: asset_in.into(),
            asset_out: asset_out.into(),
            timestamp,
            amount_in,
            amount_out,
        }
    }

    /// Structural checks. Amounts are not checked here: a zero or non-finite
    /// amount only makes the trade's markouts unavailable.
    pub fn validate(&self, index: usize) -> Result<(), MarkoutError> {
        let invalid = |reason: &str| MarkoutError::InvalidTrade {
            index,
            reason: reason.to_string(),
        };

        if self.asset_in.trim().is_empty() {
            return Err(invalid("asset_in is empty"));
        }
        if self.asset_out.trim().is_empty() {
            return Err(invalid("asset_out is empty"));
        }
        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            return Err(invalid("timestamp must be a finite, non-negative number"));
        }

        Ok(())
    }

    /// Price of `asset_in` in units of `asset_out`: `amount_out / amount_in`.
    ///
    /// `None` unless both amounts are strictly positive and finite.
    pub fn execution_price(&self) -> Option<f64> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.amount_in) || !positive(self.amount_out) {
            return None;
        }

        let price = self.amount_out / self.amount_in;
        positive(price).then_some(price)
    }
}

/// Seconds offset after a trade at which the reference price is sampled.
///
/// Zero and negative offsets are allowed and look up at or before the trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Horizon(pub i64);

impl Horizon {
    pub fn seconds(&self) -> i64 {
        self.0
    }

    pub fn as_micros(&self) -> i64 {
        horizon_to_micros(self.0)
    }

    /// Output column holding this horizon's markouts, e.g. `markout_60`.
    pub fn column_name(&self) -> String {
        format!("markout_{}", self.0)
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Non-empty list of horizons in request order. Duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Horizons(Vec<Horizon>);

impl Horizons {
    pub fn new(seconds: impl IntoIterator<Item = i64>) -> Result<Self, MarkoutError> {
        let horizons: Vec<Horizon> = seconds.into_iter().map(Horizon).collect();
        if horizons.is_empty() {
            return Err(MarkoutError::NoHorizons);
        }
        Ok(Self(horizons))
    }

    pub fn as_slice(&self) -> &[Horizon] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Horizon> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parses a comma-separated list of whole seconds, e.g. `"60,300,900"`.
impl FromStr for Horizons {
    type Err = MarkoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let seconds = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<i64>()
                    .map_err(|_| MarkoutError::InvalidHorizon(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(seconds)
    }
}

impl<'a> IntoIterator for &'a Horizons {
    type Item = &'a Horizon;
    type IntoIter = std::slice::Iter<'a, Horizon>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A markout in basis points, or the reason it could not be computed.
///
/// `Unavailable` is never folded into `0.0` or NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkoutValue {
    Bps(f64),
    Unavailable(Unavailable),
}

impl MarkoutValue {
    pub fn bps(&self) -> Option<f64> {
        match self {
            MarkoutValue::Bps(v) => Some(*v),
            MarkoutValue::Unavailable(_) => None,
        }
    }

    pub fn unavailable(&self) -> Option<Unavailable> {
        match self {
            MarkoutValue::Bps(_) => None,
            MarkoutValue::Unavailable(reason) => Some(*reason),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, MarkoutValue::Bps(_))
    }
}

impl From<Result<f64, Unavailable>> for MarkoutValue {
    fn from(r: Result<f64, Unavailable>) -> Self {
        match r {
            Ok(v) => MarkoutValue::Bps(v),
            Err(reason) => MarkoutValue::Unavailable(reason),
        }
    }
}

/// One `(trade, horizon)` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkoutCell {
    pub horizon: Horizon,

    /// Reference mid expressed as `asset_out per asset_in`, when resolved.
    pub reference_price: Option<f64>,

    pub value: MarkoutValue,
}

/// A trade plus one cell per requested horizon, in request order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkoutRow {
    pub trade: Trade,
    pub instrument: Option<Instrument>,
    pub orientation: Option<Orientation>,
    pub execution_price: Option<f64>,
    pub cells: Vec<MarkoutCell>,
}

impl MarkoutRow {
    pub fn value(&self, horizon_idx: usize) -> Option<&MarkoutValue> {
        self.cells.get(horizon_idx).map(|c| &c.value)
    }
}

/// Output of one batch: exactly one row per input trade, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkoutResultSet {
    pub horizons: Horizons,
    pub rows: Vec<MarkoutRow>,
}

impl MarkoutResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values for the `horizon_idx`-th requested horizon across all trades.
    pub fn column(&self, horizon_idx: usize) -> impl Iterator<Item = &MarkoutValue> + '_ {
        self.rows
            .iter()
            .filter_map(move |row| row.value(horizon_idx))
    }

    /// Trades skipped because neither asset ordering is a known instrument.
    pub fn unknown_instrument_trades(&self) -> usize {
        self.rows.iter().filter(|r| r.instrument.is_none()).count()
    }
}
