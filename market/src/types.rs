use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Canonical tradable pair used to locate a reference series.
///
/// `ETH`/`USDC` has symbol `ETHUSDC`; its mid is the price of ETH in USDC.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct Instrument {
    pub base: String,
    pub quote: String,
}

impl Instrument {
    /// Asset identifiers are upper-cased so `eth`/`usdc` and `ETH`/`USDC` map
    /// to the same instrument.
    pub fn new(base: impl AsRef<str>, quote: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().trim().to_ascii_uppercase(),
            quote: quote.as_ref().trim().to_ascii_uppercase(),
        }
    }

    pub fn symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }

    pub fn reversed(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.quote)
    }
}

/// How a trade's `asset_in -> asset_out` direction lines up with the
/// instrument it resolved to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum Orientation {
    /// `asset_in` is the instrument base: the mid is already the price of
    /// `asset_in` in `asset_out`.
    Direct,

    /// `asset_in` is the instrument quote: the mid must be inverted.
    Reversed,
}

impl Orientation {
    /// Express an instrument mid in the trade's `asset_out per asset_in` units.
    pub fn orient(self, mid: f64) -> f64 {
        match self {
            Orientation::Direct => mid,
            Orientation::Reversed => 1.0 / mid,
        }
    }
}

/// Top-of-book state at one instant.
///
/// `best_bid <= best_ask` is expected but never enforced; crossed books are
/// passed through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BookSnapshot {
    /// Snapshot time in microseconds since epoch.
    pub ts_us: i64,
    pub best_bid: f64,
    pub best_ask: f64,
}

impl BookSnapshot {
    pub fn new(ts_us: i64, best_bid: f64, best_ask: f64) -> Self {
        Self {
            ts_us,
            best_bid,
            best_ask,
        }
    }

    pub fn mid(&self) -> f64 {
        (self.best_bid + self.best_ask) / 2.0
    }
}

/// Why a markout cell has no value.
///
/// Every per-cell failure is downgraded to one of these; none of them abort a
/// batch.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum Unavailable {
    /// Neither ordering of the asset pair is a known instrument.
    #[error("unknown instrument")]
    UnknownInstrument,

    /// The provider has no series for the instrument on that day.
    #[error("no reference series")]
    NoSeries,

    /// A series exists but could not be read or parsed.
    #[error("reference series unreadable")]
    SeriesUnreadable,

    /// The provider itself failed.
    #[error("series provider failure")]
    ProviderFailure,

    /// The series has no snapshot at or before the requested time.
    #[error("no snapshot at or before requested time")]
    NoSnapshotBefore,

    /// Execution price is zero, negative or non-finite.
    #[error("degenerate execution price")]
    DegeneratePrice,

    /// Reference mid could not be expressed in the trade's orientation
    /// (zero or non-finite after inversion).
    #[error("degenerate reference price")]
    DegenerateReference,
}

impl Unavailable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unavailable::UnknownInstrument => "unknown_instrument",
            Unavailable::NoSeries => "no_series",
            Unavailable::SeriesUnreadable => "series_unreadable",
            Unavailable::ProviderFailure => "provider_failure",
            Unavailable::NoSnapshotBefore => "no_snapshot_before",
            Unavailable::DegeneratePrice => "degenerate_price",
            Unavailable::DegenerateReference => "degenerate_reference",
        }
    }
}

/// Outcome of one resolver query: a mid price or the reason there is none.
pub type Resolution = Result<f64, Unavailable>;
