pub mod catalog;
pub mod errors;
pub mod loader;
pub mod provider;
pub mod resolver;
pub mod series;
pub mod time;
pub mod types;

pub use catalog::{InstrumentCatalog, StaticCatalog};
pub use errors::{LoaderError, MarketError, ProviderError};
pub use provider::{InMemoryProvider, LocalDirProvider, SeriesHandle, SeriesProvider};
pub use resolver::{DEFAULT_LOOKBACK_DAYS, ReferencePriceResolver};
pub use series::ReferenceSeries;
pub use types::{BookSnapshot, Instrument, Orientation, Resolution, Unavailable};
