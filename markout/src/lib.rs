//! Post-trade markout computation.
//!
//! For every trade and every horizon, the reference mid at `trade_time + h`
//! is compared with the trade's execution price and expressed in basis
//! points. Results keep one row per input trade; cells that cannot be
//! computed carry an explicit [`market::Unavailable`] reason.

pub mod engine;
pub mod error;
pub mod report;
pub mod summary;
pub mod types;

pub use engine::{CancelToken, MarkoutEngine, markout_bps};
pub use error::{MarkoutError, ReportError};
pub use summary::{SummaryRow, SummaryTable, summarize};
pub use types::{
    Horizon, Horizons, MarkoutCell, MarkoutResultSet, MarkoutRow, MarkoutValue, Trade,
};
