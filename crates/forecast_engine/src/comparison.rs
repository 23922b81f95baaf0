//! Model comparison.
//!
//! The comparator re-runs an arbitrary simulation closure under a second
//! configuration that differs from the baseline along one [`ComparisonAxis`],
//! with the master seed pinned so both runs draw the same random numbers.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::PeriodStatistics;
use crate::config::{ComparisonAxis, SimulationConfig};
use crate::error::SimulationResult;
use crate::events::EventCounts;
use crate::rng::draw_master_seed;

/// Baseline magnitudes below this are skipped when computing relative deviations.
const RELATIVE_FLOOR: f64 = 1e-12;

/// Runs `run` under the baseline and the alternate configuration.
///
/// The baseline is `config` with its seed fixed (drawn once when absent) and
/// its comparison axis cleared; the alternate is `axis` applied to it.
pub fn compare_with<R, F>(
    config: &SimulationConfig,
    axis: ComparisonAxis,
    run: F,
) -> SimulationResult<(R, R)>
where
    F: Fn(&SimulationConfig) -> SimulationResult<R>,
{
    let baseline = pinned_baseline(config);
    let alternate = axis.apply(&baseline);
    debug!(axis = %axis.describe(), seed = ?baseline.seed, "running model comparison");
    let a = run(&baseline)?;
    let b = run(&alternate)?;
    Ok((a, b))
}

/// `config` with a fixed seed and no comparison axis.
pub fn pinned_baseline(config: &SimulationConfig) -> SimulationConfig {
    SimulationConfig {
        seed: Some(config.seed.unwrap_or_else(draw_master_seed)),
        model_comparison: None,
        ..config.clone()
    }
}

/// Event probability under baseline and alternate models.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventComparison {
    /// Axis that was changed.
    pub axis: ComparisonAxis,
    /// Human-readable description of the alternate model.
    pub description: String,
    /// Baseline probability.
    pub baseline: f64,
    /// Alternate probability.
    pub alternate: f64,
    /// `alternate - baseline`.
    pub delta: f64,
    /// Standard error of the delta.
    pub standard_error: f64,
    /// True when `|delta|` exceeds two standard errors.
    pub sensitive: bool,
}

impl EventComparison {
    /// Compares two tallies of the same event.
    ///
    /// The standard error treats the two estimates as independent, which
    /// overstates it when both runs share a seed.
    pub fn between(axis: ComparisonAxis, baseline: &EventCounts, alternate: &EventCounts) -> Self {
        let (p0, p1) = (baseline.probability(), alternate.probability());
        let delta = p1 - p0;
        let standard_error = baseline.standard_error().hypot(alternate.standard_error());
        Self {
            axis,
            description: axis.describe(),
            baseline: p0,
            alternate: p1,
            delta,
            standard_error,
            sensitive: delta.abs() > 2.0 * standard_error,
        }
    }
}

/// Change of one (variable, period) cell between models.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticDelta {
    /// Variable identifier.
    pub variable_id: String,
    /// Period index.
    pub period: usize,
    /// Alternate minus baseline mean.
    pub mean_delta: f64,
    /// Alternate minus baseline median.
    pub median_delta: f64,
}

/// Forecast statistics under baseline and alternate models.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastComparison {
    /// Axis that was changed.
    pub axis: ComparisonAxis,
    /// Human-readable description of the alternate model.
    pub description: String,
    /// Per-cell deltas, ordered as the baseline statistics.
    pub deltas: Vec<StatisticDelta>,
    /// Largest `|mean_delta| / |baseline mean|` over all cells.
    pub max_relative_mean_deviation: f64,
}

impl ForecastComparison {
    /// Compares two sets of statistics produced from the same variables.
    pub fn between(axis: ComparisonAxis, baseline: &[PeriodStatistics], alternate: &[PeriodStatistics]) -> Self {
        let mut max_relative = 0.0_f64;
        let deltas = baseline
            .iter()
            .zip(alternate)
            .map(|(b, a)| {
                let mean_delta = a.mean - b.mean;
                if b.mean.abs() > RELATIVE_FLOOR {
                    max_relative = max_relative.max(mean_delta.abs() / b.mean.abs());
                }
                StatisticDelta {
                    variable_id: b.variable_id.clone(),
                    period: b.period,
                    mean_delta,
                    median_delta: a.median - b.median,
                }
            })
            .collect();
        Self {
            axis,
            description: axis.describe(),
            deltas,
            max_relative_mean_deviation: max_relative,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Percentiles;
    use crate::config::CorrelationMethod;
    use forecast_models::Discretisation;
    use std::cell::RefCell;

    fn config() -> SimulationConfig {
        SimulationConfig::builder()
            .n_simulations(1_000)
            .horizon_periods(3)
            .correlation_method(CorrelationMethod::Cholesky)
            .build()
            .unwrap()
    }

    #[test]
    fn test_compare_with_pins_seed_and_changes_one_axis() {
        let seen = RefCell::new(Vec::new());
        let axis = ComparisonAxis::CorrelationMethod(CorrelationMethod::None);
        let (a, b) = compare_with(&config(), axis, |cfg| {
            seen.borrow_mut().push(cfg.clone());
            Ok(cfg.correlation_method)
        })
        .unwrap();

        assert_eq!((a, b), (CorrelationMethod::Cholesky, CorrelationMethod::None));
        let seen = seen.into_inner();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].seed.is_some());
        assert_eq!(seen[0].seed, seen[1].seed);
        assert!(seen.iter().all(|c| c.model_comparison.is_none()));
        assert_eq!(seen[0].n_simulations, seen[1].n_simulations);
    }

    #[test]
    fn test_event_comparison_flags_sensitivity() {
        let axis = ComparisonAxis::Discretisation(Discretisation::Milstein);
        let base = EventCounts {
            true_count: 1_000,
            evaluated: 10_000,
            observed: 10_000,
        };
        let same = EventComparison::between(axis, &base, &base);
        assert_eq!(same.delta, 0.0);
        assert!(!same.sensitive);

        let shifted = EventCounts {
            true_count: 2_000,
            ..base
        };
        let moved = EventComparison::between(axis, &base, &shifted);
        assert!((moved.delta - 0.1).abs() < 1e-12);
        assert!(moved.sensitive);
    }

    fn stats(mean: f64, median: f64) -> PeriodStatistics {
        PeriodStatistics {
            variable_id: "x".to_string(),
            variable_code: "X".to_string(),
            period: 1,
            mean,
            median,
            std: 0.0,
            percentiles: Percentiles::default(),
            min: mean,
            max: mean,
            prob_negative: 0.0,
        }
    }

    #[test]
    fn test_forecast_comparison_deltas() {
        let axis = ComparisonAxis::Discretisation(Discretisation::Milstein);
        let cmp = ForecastComparison::between(
            axis,
            &[stats(100.0, 99.0), stats(0.0, 0.0)],
            &[stats(102.0, 98.0), stats(5.0, 5.0)],
        );
        assert_eq!(cmp.deltas.len(), 2);
        assert_eq!(cmp.deltas[0].mean_delta, 2.0);
        assert_eq!(cmp.deltas[0].median_delta, -1.0);
        assert!((cmp.max_relative_mean_deviation - 0.02).abs() < 1e-12);
    }
}
