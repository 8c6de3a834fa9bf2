use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::errors::MarketError;
use crate::types::{Instrument, Orientation};

/// Validity check for candidate instrument symbols.
pub trait InstrumentCatalog: Send + Sync {
    fn contains(&self, symbol: &str) -> bool;

    /// Map a traded `asset_in -> asset_out` pair onto a known instrument.
    ///
    /// `asset_in + asset_out` is tried first, then the reversed ordering.
    fn resolve_pair(&self, asset_in: &str, asset_out: &str) -> Option<(Instrument, Orientation)> {
        let direct = Instrument::new(asset_in, asset_out);
        if self.contains(&direct.symbol()) {
            return Some((direct, Orientation::Direct));
        }

        let reversed = direct.reversed();
        if self.contains(&reversed.symbol()) {
            return Some((reversed, Orientation::Reversed));
        }

        None
    }
}

/// Fixed set of upper-case instrument symbols, loaded once per process.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    symbols: HashSet<String>,
}

impl StaticCatalog {
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            symbols: symbols
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Load a catalog from a text file: one symbol per line, `#` starts a
    /// comment, blank lines are skipped.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MarketError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| MarketError::CatalogIo {
            path: path.to_path_buf(),
            source,
        })?;

        let catalog = Self::from_symbols(
            raw.lines()
                .map(|line| line.split('#').next().unwrap_or_default()),
        );

        info!(symbols = catalog.len(), "instrument catalog loaded");
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl InstrumentCatalog for StaticCatalog {
    fn contains(&self, symbol: &str) -> bool {
        let hit = self.symbols.contains(symbol);
        if !hit {
            debug!(symbol, "symbol not in catalog");
        }
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolves_direct_then_reversed() {
        let catalog = StaticCatalog::from_symbols(["ETHUSDC"]);

        let (inst, orientation) = catalog.resolve_pair("ETH", "USDC").unwrap();
        assert_eq!(inst.symbol(), "ETHUSDC");
        assert_eq!(orientation, Orientation::Direct);

        let (inst, orientation) = catalog.resolve_pair("usdc", "eth").unwrap();
        assert_eq!(inst.symbol(), "ETHUSDC");
        assert_eq!(orientation, Orientation::Reversed);

        assert!(catalog.resolve_pair("BTC", "USDC").is_none());
    }

    #[test]
    fn direct_ordering_wins_when_both_are_listed() {
        let catalog = StaticCatalog::from_symbols(["ETHUSDC", "USDCETH"]);
        let (inst, orientation) = catalog.resolve_pair("USDC", "ETH").unwrap();

        assert_eq!(inst.symbol(), "USDCETH");
        assert_eq!(orientation, Orientation::Direct);
    }

    #[test]
    fn loads_symbols_from_file_skipping_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# binance spot").unwrap();
        writeln!(file, "ethusdc").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "BTCUSDT  # majors").unwrap();

        let catalog = StaticCatalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("ETHUSDC"));
        assert!(catalog.contains("BTCUSDT"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = StaticCatalog::from_file("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, MarketError::CatalogIo { .. }));
    }
}
