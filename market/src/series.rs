use crate::errors::MarketError;
use crate::types::BookSnapshot;

/// Time-ordered top-of-book snapshots for one instrument.
///
/// Immutable once built; lookups are binary searches over `ts_us`.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSeries {
    snapshots: Vec<BookSnapshot>,
}

impl ReferenceSeries {
    /// Build a series from snapshots already in time order.
    ///
    /// Equal timestamps are allowed; a decreasing timestamp is rejected.
    pub fn new(snapshots: Vec<BookSnapshot>) -> Result<Self, MarketError> {
        if let Some(w) = snapshots.windows(2).find(|w| w[1].ts_us < w[0].ts_us) {
            return Err(MarketError::UnorderedSnapshots {
                prev: w[0].ts_us,
                next: w[1].ts_us,
            });
        }

        Ok(Self { snapshots })
    }

    /// Most recent snapshot with `ts_us <= as_of_us`.
    ///
    /// Among snapshots sharing the greatest eligible timestamp, the last one
    /// in feed order wins.
    pub fn latest_at_or_before(&self, as_of_us: i64) -> Option<&BookSnapshot> {
        let idx = self.snapshots.partition_point(|s| s.ts_us <= as_of_us);
        idx.checked_sub(1).map(|i| &self.snapshots[i])
    }

    pub fn first(&self) -> Option<&BookSnapshot> {
        self.snapshots.first()
    }

    pub fn last(&self) -> Option<&BookSnapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[BookSnapshot] {
        &self.snapshots
    }
}
