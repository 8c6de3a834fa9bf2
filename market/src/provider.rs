use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::errors::ProviderError;
use crate::series::ReferenceSeries;
use crate::types::Instrument;

/// Where a materialised series for one `(instrument, date)` lives.
#[derive(Debug, Clone)]
pub enum SeriesHandle {
    /// Snapshot table on local disk, read with [`crate::loader::load_series`].
    Path(PathBuf),

    /// Series already held in memory.
    InMemory(Arc<ReferenceSeries>),
}

/// Boundary to whatever materialises reference data locally.
///
/// `Ok(None)` means "no data for that day" and is not an error. `Err` is a
/// failure of the provider itself; callers downgrade both to unavailable
/// lookups.
pub trait SeriesProvider: Send + Sync {
    fn locate(
        &self,
        instrument: &Instrument,
        date: NaiveDate,
    ) -> Result<Option<SeriesHandle>, ProviderError>;
}

/// Finds day files produced by the market data downloader in one directory.
///
/// Files are named `{exchange}_{data_type}_{YYYY-MM-DD}_{SYMBOL}.csv`, e.g.
/// `binance_book_snapshot_5_2024-08-12_ETHUSDC.csv`. Nothing is downloaded.
#[derive(Debug, Clone)]
pub struct LocalDirProvider {
    root: PathBuf,
    exchange: String,
    data_type: String,
}

impl LocalDirProvider {
    pub const DEFAULT_EXCHANGE: &'static str = "binance";
    pub const DEFAULT_DATA_TYPE: &'static str = "book_snapshot_5";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exchange: Self::DEFAULT_EXCHANGE.to_string(),
            data_type: Self::DEFAULT_DATA_TYPE.to_string(),
        }
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_name(&self, instrument: &Instrument, date: NaiveDate) -> String {
        format!(
            "{}_{}_{}_{}.csv",
            self.exchange,
            self.data_type,
            date.format("%Y-%m-%d"),
            instrument.symbol()
        )
    }
}

impl SeriesProvider for LocalDirProvider {
    #[instrument(skip(self), fields(instrument = %instrument), level = "debug")]
    fn locate(
        &self,
        instrument: &Instrument,
        date: NaiveDate,
    ) -> Result<Option<SeriesHandle>, ProviderError> {
        let path = self.root.join(self.file_name(instrument, date));

        match path.try_exists() {
            Ok(true) => Ok(Some(SeriesHandle::Path(path))),
            Ok(false) => {
                debug!(path = %path.display(), "no local series file");
                Ok(None)
            }
            Err(source) => Err(ProviderError::Io { path, source }),
        }
    }
}

/// Provider over series registered up front.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    series: HashMap<(String, NaiveDate), Arc<ReferenceSeries>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, instrument: &Instrument, date: NaiveDate, series: ReferenceSeries) {
        self.series
            .insert((instrument.symbol(), date), Arc::new(series));
    }

    pub fn with_series(
        mut self,
        instrument: &Instrument,
        date: NaiveDate,
        series: ReferenceSeries,
    ) -> Self {
        self.insert(instrument, date, series);
        self
    }
}

impl SeriesProvider for InMemoryProvider {
    fn locate(
        &self,
        instrument: &Instrument,
        date: NaiveDate,
    ) -> Result<Option<SeriesHandle>, ProviderError> {
        Ok(self
            .series
            .get(&(instrument.symbol(), date))
            .cloned()
            .map(SeriesHandle::InMemory))
    }
}
