use std::collections::BTreeMap;

use market::Unavailable;
use serde::Serialize;
use statrs::statistics::{Data, Median, Statistics};

use crate::types::{Horizon, MarkoutResultSet};

/// Aggregate markout statistics for one horizon.
///
/// Statistics cover available values only. `std_dev` is the sample standard
/// deviation (n - 1) and needs at least two values. When `count` is zero every
/// statistic is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub horizon: Horizon,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub count: usize,

    /// Cells excluded from the statistics, by reason.
    pub unavailable: BTreeMap<Unavailable, usize>,
}

impl SummaryRow {
    fn from_values(
        horizon: Horizon,
        values: &[f64],
        unavailable: BTreeMap<Unavailable, usize>,
    ) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                horizon,
                mean: None,
                median: None,
                std_dev: None,
                min: None,
                max: None,
                count,
                unavailable,
            };
        }

        Self {
            horizon,
            mean: Some(values.iter().mean()),
            median: Some(Median::median(&Data::new(values.to_vec()))),
            std_dev: (count >= 2).then(|| values.iter().std_dev()),
            min: Some(Statistics::min(values.iter())),
            max: Some(Statistics::max(values.iter())),
            count,
            unavailable,
        }
    }

    pub fn unavailable_total(&self) -> usize {
        self.unavailable.values().sum()
    }
}

/// One row per requested horizon, in request order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SummaryTable {
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Summarise a result set, each horizon independently.
pub fn summarize(result: &MarkoutResultSet) -> SummaryTable {
    let rows = result
        .horizons
        .iter()
        .enumerate()
        .map(|(idx, &horizon)| {
            let mut values = Vec::with_capacity(result.len());
            let mut unavailable = BTreeMap::new();

            for value in result.column(idx) {
                match value.bps() {
                    Some(bps) => values.push(bps),
                    None => {
                        if let Some(reason) = value.unavailable() {
                            *unavailable.entry(reason).or_insert(0) += 1;
                        }
                    }
                }
            }

            SummaryRow::from_values(horizon, &values, unavailable)
        })
        .collect();

    SummaryTable { rows }
}
