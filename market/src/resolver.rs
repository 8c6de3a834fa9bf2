use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::{debug, instrument, warn};

use crate::loader::load_series;
use crate::provider::{SeriesHandle, SeriesProvider};
use crate::series::ReferenceSeries;
use crate::time::utc_date;
use crate::types::{BookSnapshot, Instrument, Resolution, Unavailable};

type SeriesKey = (String, NaiveDate);

/// Cached outcome of materialising one day of one instrument.
#[derive(Debug, Clone)]
enum SeriesSlot {
    Loaded(Arc<ReferenceSeries>),
    Missing(Unavailable),
}

impl SeriesSlot {
    fn to_result(&self) -> Result<Arc<ReferenceSeries>, Unavailable> {
        match self {
            SeriesSlot::Loaded(series) => Ok(Arc::clone(series)),
            SeriesSlot::Missing(reason) => Err(*reason),
        }
    }
}

/// Point-in-time mid price lookups over day-partitioned snapshot series.
///
/// Series are materialised lazily through the provider on first use and kept
/// for the resolver's lifetime, including misses, so a broken table is read
/// and reported once. The cache lock is never held across provider or file
/// I/O; two threads racing on the same key may both load it, the first insert
/// wins.
pub struct ReferencePriceResolver<P> {
    provider: P,
    lookback_days: u32,
    cache: RwLock<HashMap<SeriesKey, SeriesSlot>>,
}

/// Days searched before the query day when it has no eligible snapshot.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

impl<P: SeriesProvider> ReferencePriceResolver<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Bound the walk back through earlier days. Zero searches the query day only.
    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Number of `(instrument, day)` entries materialised so far.
    pub fn cached_entries(&self) -> usize {
        self.cache.read().len()
    }

    /// Mid price of the latest snapshot at or before `as_of_us`.
    pub fn resolve(&self, instrument: &Instrument, as_of_us: i64) -> Resolution {
        self.resolve_snapshot(instrument, as_of_us)
            .map(|snapshot| snapshot.mid())
    }

    /// Latest snapshot at or before `as_of_us`.
    ///
    /// The day containing `as_of_us` is searched first, then earlier days one
    /// at a time while they are absent or hold nothing eligible, up to
    /// `lookback_days`. A day that is unreadable or whose provider failed
    /// stops the walk with that reason: the snapshot it hides may be the
    /// latest one. When the walk runs out, the query day's reason is
    /// reported.
    ///
    /// Lookups are monotonic in time as long as every day between two
    /// queries is readable and the gap between snapshots stays within the
    /// lookback bound.
    #[instrument(skip(self), fields(instrument = %instrument), level = "trace")]
    pub fn resolve_snapshot(
        &self,
        instrument: &Instrument,
        as_of_us: i64,
    ) -> Result<BookSnapshot, Unavailable> {
        let query_date = utc_date(as_of_us).ok_or(Unavailable::NoSnapshotBefore)?;

        let mut first_miss = None;
        let mut date = Some(query_date);

        for _ in 0..=self.lookback_days {
            let Some(day) = date else { break };

            let miss = match self.series_for(instrument, day) {
                Ok(series) => match series.latest_at_or_before(as_of_us) {
                    Some(snapshot) => return Ok(*snapshot),
                    None => Unavailable::NoSnapshotBefore,
                },
                Err(reason @ (Unavailable::NoSeries | Unavailable::NoSnapshotBefore)) => reason,
                Err(reason) => {
                    debug!(as_of_us, %day, reason = reason.as_str(), "reference lookup blocked");
                    return Err(reason);
                }
            };

            first_miss.get_or_insert(miss);
            date = day.pred_opt();
        }

        let miss = first_miss.unwrap_or(Unavailable::NoSnapshotBefore);
        debug!(as_of_us, reason = miss.as_str(), "reference lookup missed");
        Err(miss)
    }

    fn series_for(
        &self,
        instrument: &Instrument,
        date: NaiveDate,
    ) -> Result<Arc<ReferenceSeries>, Unavailable> {
        let key = (instrument.symbol(), date);

        if let Some(slot) = self.cache.read().get(&key) {
            return slot.to_result();
        }

        let slot = self.materialize(instrument, date);

        self.cache
            .write()
            .entry(key)
            .or_insert(slot)
            .to_result()
    }

    fn materialize(&self, instrument: &Instrument, date: NaiveDate) -> SeriesSlot {
        match self.provider.locate(instrument, date) {
            Ok(Some(SeriesHandle::InMemory(series))) => SeriesSlot::Loaded(series),

            Ok(Some(SeriesHandle::Path(path))) => match load_series(&path) {
                Ok(series) => {
                    debug!(
                        instrument = %instrument,
                        %date,
                        snapshots = series.len(),
                        "reference series loaded"
                    );
                    SeriesSlot::Loaded(Arc::new(series))
                }
                Err(e) => {
                    warn!(
                        instrument = %instrument,
                        %date,
                        path = %path.display(),
                        error = %e,
                        "reference series unreadable; lookups on it are unavailable"
                    );
                    SeriesSlot::Missing(Unavailable::SeriesUnreadable)
                }
            },

            Ok(None) => {
                debug!(instrument = %instrument, %date, "no reference series for day");
                SeriesSlot::Missing(Unavailable::NoSeries)
            }

            Err(e) => {
                warn!(
                    instrument = %instrument,
                    %date,
                    error = %e,
                    "series provider failed; treating as unavailable"
                );
                SeriesSlot::Missing(Unavailable::ProviderFailure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::provider::InMemoryProvider;
    use crate::time::MICROS_PER_SECOND;
    use proptest::prelude::*;
    use tracing_test::traced_test;

    const DAY_US: i64 = 86_400 * MICROS_PER_SECOND;

    fn day(n: i64) -> NaiveDate {
        utc_date(n * DAY_US).unwrap()
    }

    fn series(points: &[(i64, f64)]) -> ReferenceSeries {
        ReferenceSeries::new(
            points
                .iter()
                .map(|&(ts, mid)| BookSnapshot::new(ts, mid, mid))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn resolves_within_the_query_day() {
        let eth = Instrument::new("ETH", "USDC");
        let provider = InMemoryProvider::new().with_series(
            &eth,
            day(0),
            series(&[(10, 2000.0), (20, 2010.0)]),
        );
        let resolver = ReferencePriceResolver::new(provider);

        assert_eq!(resolver.resolve(&eth, 15), Ok(2000.0));
        assert_eq!(resolver.resolve(&eth, 25), Ok(2010.0));
        assert_eq!(resolver.resolve(&eth, 5), Err(Unavailable::NoSnapshotBefore));
    }

    #[test]
    fn carries_previous_day_forward_across_midnight() {
        let eth = Instrument::new("ETH", "USDC");
        let provider = InMemoryProvider::new()
            .with_series(&eth, day(1), series(&[(DAY_US - 5, 1990.0)]))
            .with_series(&eth, day(2), series(&[(2 * DAY_US + 100, 2000.0)]));
        let resolver = ReferencePriceResolver::new(provider);

        assert_eq!(resolver.resolve(&eth, 2 * DAY_US + 50), Ok(1990.0));
        assert_eq!(resolver.resolve(&eth, 2 * DAY_US + 150), Ok(2000.0));
    }

    #[test]
    fn missing_day_reports_no_series() {
        let eth = Instrument::new("ETH", "USDC");
        let resolver = ReferencePriceResolver::new(InMemoryProvider::new()).with_lookback_days(1);

        assert_eq!(resolver.resolve(&eth, 10 * DAY_US), Err(Unavailable::NoSeries));
        // query day and lookback day are both cached
        assert_eq!(resolver.cached_entries(), 2);
    }

    #[test]
    fn walks_back_over_missing_days() {
        let eth = Instrument::new("ETH", "USDC");
        let provider = InMemoryProvider::new().with_series(&eth, day(0), series(&[(10, 2000.0)]));
        let resolver = ReferencePriceResolver::new(provider);

        assert_eq!(resolver.resolve(&eth, DAY_US + 10), Ok(2000.0));
        assert_eq!(resolver.resolve(&eth, 3 * DAY_US + 10), Ok(2000.0));
    }

    #[test]
    fn lookback_stops_at_the_configured_bound() {
        let eth = Instrument::new("ETH", "USDC");
        let provider = InMemoryProvider::new().with_series(&eth, day(0), series(&[(10, 2000.0)]));
        let resolver = ReferencePriceResolver::new(provider).with_lookback_days(1);

        assert_eq!(resolver.resolve(&eth, DAY_US + 10), Ok(2000.0));
        assert_eq!(resolver.resolve(&eth, 2 * DAY_US + 10), Err(Unavailable::NoSeries));
    }

    #[test]
    fn zero_lookback_searches_the_query_day_only() {
        let eth = Instrument::new("ETH", "USDC");
        let provider = InMemoryProvider::new()
            .with_series(&eth, day(0), series(&[(10, 2000.0)]))
            .with_series(&eth, day(1), series(&[(DAY_US + 100, 2010.0)]));
        let resolver = ReferencePriceResolver::new(provider).with_lookback_days(0);

        assert_eq!(resolver.resolve(&eth, DAY_US + 50), Err(Unavailable::NoSnapshotBefore));
        assert_eq!(resolver.resolve(&eth, DAY_US + 150), Ok(2010.0));
    }

    struct FailingDayProvider {
        inner: InMemoryProvider,
        failing: NaiveDate,
    }

    impl SeriesProvider for FailingDayProvider {
        fn locate(
            &self,
            instrument: &Instrument,
            date: NaiveDate,
        ) -> Result<Option<SeriesHandle>, ProviderError> {
            if date == self.failing {
                return Err(ProviderError::Unavailable("archive offline".into()));
            }
            self.inner.locate(instrument, date)
        }
    }

    #[test]
    fn failed_day_is_not_bridged_by_older_data() {
        let eth = Instrument::new("ETH", "USDC");
        let resolver = ReferencePriceResolver::new(FailingDayProvider {
            inner: InMemoryProvider::new().with_series(&eth, day(0), series(&[(10, 2000.0)])),
            failing: day(1),
        });

        assert_eq!(
            resolver.resolve(&eth, DAY_US + 10),
            Err(Unavailable::ProviderFailure)
        );
        // a later empty day still stops at the failed one
        assert_eq!(
            resolver.resolve(&eth, 2 * DAY_US + 10),
            Err(Unavailable::ProviderFailure)
        );
    }

    proptest! {
        #[test]
        fn lookups_stay_monotonic_across_day_gaps(
            present in proptest::collection::vec(any::<bool>(), 6),
            offsets in proptest::collection::vec(0..DAY_US, 6),
            a in 0..6 * DAY_US,
            b in 0..6 * DAY_US,
        ) {
            let eth = Instrument::new("ETH", "USDC");
            let mut provider = InMemoryProvider::new();
            for (n, (&keep, &offset)) in present.iter().zip(&offsets).enumerate() {
                if keep {
                    let ts = n as i64 * DAY_US + offset;
                    provider.insert(&eth, day(n as i64), series(&[(ts, 1000.0 + n as f64)]));
                }
            }
            let resolver = ReferencePriceResolver::new(provider);
            let (t1, t2) = (a.min(b), a.max(b));

            if let Ok(s) = resolver.resolve_snapshot(&eth, t1) {
                let later = resolver.resolve_snapshot(&eth, t2);
                prop_assert!(later.is_ok());
                prop_assert!(later.unwrap().ts_us >= s.ts_us);
            }
        }
    }

    #[test]
    fn repeated_queries_reuse_the_cache() {
        let eth = Instrument::new("ETH", "USDC");
        let provider = InMemoryProvider::new().with_series(&eth, day(0), series(&[(10, 2000.0)]));
        let resolver = ReferencePriceResolver::new(provider);

        for t in 10..100 {
            assert_eq!(resolver.resolve(&eth, t), Ok(2000.0));
        }
        assert_eq!(resolver.cached_entries(), 1);
    }

    struct FailingProvider;

    impl SeriesProvider for FailingProvider {
        fn locate(
            &self,
            _instrument: &Instrument,
            _date: NaiveDate,
        ) -> Result<Option<SeriesHandle>, ProviderError> {
            Err(ProviderError::Unavailable("archive offline".into()))
        }
    }

    #[test]
    #[traced_test]
    fn provider_failure_is_downgraded_and_logged() {
        let resolver = ReferencePriceResolver::new(FailingProvider);
        let eth = Instrument::new("ETH", "USDC");

        assert_eq!(resolver.resolve(&eth, 10), Err(Unavailable::ProviderFailure));
        assert!(logs_contain("series provider failed"));
    }
}
