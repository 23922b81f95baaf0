//! Per-variable, per-period distribution summaries.
//!
//! [`ForecastAggregator`] observes scenario paths one at a time and keeps, for
//! every (variable, period) cell, streaming moments ([`RunningStats`]) and a
//! percentile store ([`QuantileStore`]). Partial aggregators built on
//! different workers are merged associatively; finalisation happens once,
//! after the last scenario.

mod quantile;
mod stats;

use serde::{Deserialize, Serialize};

use crate::config::PercentileMode;
use crate::runner::PathObserver;
use crate::variable::CompiledVariable;
use crate::workspace::ScenarioPath;

pub use quantile::{interpolate_sorted, QuantileSketch, QuantileStore};
pub use stats::RunningStats;

/// Percentile levels reported for every cell.
pub const PERCENTILE_LEVELS: [f64; 9] = [0.01, 0.05, 0.10, 0.25, 0.50, 0.75, 0.90, 0.95, 0.99];

/// Reported percentiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    /// 1st percentile.
    pub p01: f64,
    /// 5th percentile.
    pub p05: f64,
    /// 10th percentile.
    pub p10: f64,
    /// 25th percentile.
    pub p25: f64,
    /// Median.
    pub p50: f64,
    /// 75th percentile.
    pub p75: f64,
    /// 90th percentile.
    pub p90: f64,
    /// 95th percentile.
    pub p95: f64,
    /// 99th percentile.
    pub p99: f64,
}

impl Percentiles {
    fn from_store(store: &QuantileStore) -> Self {
        let [p01, p05, p10, p25, p50, p75, p90, p95, p99] =
            PERCENTILE_LEVELS.map(|p| store.quantile(p));
        Self {
            p01,
            p05,
            p10,
            p25,
            p50,
            p75,
            p90,
            p95,
            p99,
        }
    }

    /// Values in ascending level order.
    pub fn as_array(&self) -> [f64; 9] {
        [
            self.p01, self.p05, self.p10, self.p25, self.p50, self.p75, self.p90, self.p95,
            self.p99,
        ]
    }

    /// True when the values are non-decreasing in level.
    pub fn is_monotone(&self) -> bool {
        self.as_array().windows(2).all(|w| w[0] <= w[1])
    }
}

/// Distribution summary of one variable at one period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStatistics {
    /// Variable identifier.
    pub variable_id: String,
    /// Variable code.
    pub variable_code: String,
    /// Period index (0 = initial value).
    pub period: usize,
    /// Sample mean.
    pub mean: f64,
    /// Median (equal to `percentiles.p50`).
    pub median: f64,
    /// Sample standard deviation.
    pub std: f64,
    /// Percentile ladder.
    pub percentiles: Percentiles,
    /// Smallest simulated value.
    pub min: f64,
    /// Largest simulated value.
    pub max: f64,
    /// Fraction of scenarios with a value below zero.
    pub prob_negative: f64,
}

#[derive(Clone, Debug)]
struct Cell {
    stats: RunningStats,
    quantiles: QuantileStore,
}

/// Streaming aggregator over scenario paths.
#[derive(Clone, Debug)]
pub struct ForecastAggregator {
    cells: Vec<Cell>,
    n_variables: usize,
    n_periods: usize,
}

impl ForecastAggregator {
    /// Empty aggregator for `n_variables` over `horizon` periods.
    ///
    /// `expected` sizes the exact percentile buffers of each cell.
    pub fn new(n_variables: usize, horizon: usize, mode: PercentileMode, expected: usize) -> Self {
        let n_periods = horizon + 1;
        let cell = Cell {
            stats: RunningStats::new(),
            quantiles: QuantileStore::new(mode, expected),
        };
        Self {
            cells: vec![cell; n_variables * n_periods],
            n_variables,
            n_periods,
        }
    }

    /// Number of scenarios observed.
    pub fn count(&self) -> u64 {
        self.cells.first().map_or(0, |c| c.stats.count())
    }

    /// Finalises every cell into statistics, ordered by variable then period.
    pub fn finalize(mut self, variables: &[CompiledVariable]) -> Vec<PeriodStatistics> {
        let n_periods = self.n_periods;
        self.cells
            .iter_mut()
            .enumerate()
            .map(|(index, cell)| {
                let variable = &variables[index / n_periods];
                cell.quantiles.finalize();
                let percentiles = Percentiles::from_store(&cell.quantiles);
                PeriodStatistics {
                    variable_id: variable.id.clone(),
                    variable_code: variable.code.clone(),
                    period: index % n_periods,
                    mean: cell.stats.mean(),
                    median: percentiles.p50,
                    std: cell.stats.std_dev(),
                    percentiles,
                    min: cell.stats.min(),
                    max: cell.stats.max(),
                    prob_negative: cell.stats.negative_fraction(),
                }
            })
            .collect()
    }
}

impl PathObserver for ForecastAggregator {
    #[inline]
    fn observe(&mut self, path: &ScenarioPath<'_>) {
        debug_assert_eq!(path.n_variables(), self.n_variables);
        for (variable, cells) in self.cells.chunks_mut(self.n_periods).enumerate() {
            for (cell, &value) in cells.iter_mut().zip(path.series(variable)) {
                cell.stats.push(value);
                cell.quantiles.push(value);
            }
        }
    }

    fn merge(&mut self, other: Self) {
        for (cell, other) in self.cells.iter_mut().zip(&other.cells) {
            cell.stats.merge(&other.stats);
            cell.quantiles.merge(&other.quantiles);
        }
    }
}
