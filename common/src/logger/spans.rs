use tracing::{Span, field};

use super::TraceId;

/// Root span for one markout batch.
///
/// `trades` and `horizons` start empty and are recorded once the input is known.
pub fn root_span(name: &'static str, trace_id: &TraceId) -> Span {
    tracing::info_span!(
        "root",
        name = %name,
        trace_id = %trace_id,
        trades = field::Empty,
        horizons = field::Empty
    )
}

