//! Simulation configuration.
//!
//! [`SimulationConfig`] can be built fluently through
//! [`SimulationConfig::builder`], which validates at build time, or
//! deserialised from camelCase JSON followed by [`SimulationConfig::validate`].
//! Every field except the scenario count and horizon has a default.

use forecast_models::Discretisation;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Minimum number of scenarios per run.
pub const MIN_SCENARIOS: usize = 1_000;

/// Maximum number of scenarios per run.
pub const MAX_SCENARIOS: usize = 100_000;

/// Maximum horizon in periods.
pub const MAX_HORIZON: usize = 1_200;

/// Default number of trials per work unit.
pub const DEFAULT_BATCH_SIZE: usize = 512;

/// Default centroid budget of the approximate percentile sketch.
pub const DEFAULT_SKETCH_CAPACITY: usize = 256;

/// Length of one simulation period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeStep {
    /// 1/365 year.
    Day,
    /// 1/52 year.
    Week,
    /// 1/12 year.
    #[default]
    Month,
    /// 1/4 year.
    Quarter,
    /// One year.
    Year,
}

impl TimeStep {
    /// Periods per year.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            TimeStep::Day => 365.0,
            TimeStep::Week => 52.0,
            TimeStep::Month => 12.0,
            TimeStep::Quarter => 4.0,
            TimeStep::Year => 1.0,
        }
    }

    /// Step size in years.
    #[inline]
    pub fn dt(&self) -> f64 {
        1.0 / self.periods_per_year()
    }
}

/// How per-step shocks are made dependent across variables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    /// Independent shocks.
    #[default]
    None,
    /// Linear correlation via the Cholesky factor.
    Cholesky,
    /// Copula dependence.
    Copula,
}

impl CorrelationMethod {
    /// Configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            CorrelationMethod::None => "none",
            CorrelationMethod::Cholesky => "cholesky",
            CorrelationMethod::Copula => "copula",
        }
    }
}

/// Percentile estimation mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentileMode {
    /// Retain every sample and interpolate exactly.
    #[default]
    Exact,
    /// Bounded-memory mergeable sketch.
    Sketch {
        /// Centroid budget; a cell holds at most twice this many centroids.
        capacity: usize,
    },
}

/// Confidence interval construction for event probabilities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalMethod {
    /// `p ± z·√(p(1−p)/n)`, clipped to [0, 1].
    #[default]
    Normal,
    /// Wilson score interval.
    Wilson,
}

/// One configuration axis varied by the model comparator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonAxis {
    /// Re-run with another discretisation scheme.
    Discretisation(Discretisation),
    /// Re-run with another correlation method.
    CorrelationMethod(CorrelationMethod),
}

impl ComparisonAxis {
    /// Applies the axis to a copy of `config`.
    pub fn apply(&self, config: &SimulationConfig) -> SimulationConfig {
        let mut alternate = config.clone();
        match *self {
            ComparisonAxis::Discretisation(scheme) => alternate.discretisation = scheme,
            ComparisonAxis::CorrelationMethod(method) => alternate.correlation_method = method,
        }
        alternate.model_comparison = None;
        alternate
    }

    /// Short description used in logs and results.
    pub fn describe(&self) -> String {
        match self {
            ComparisonAxis::Discretisation(scheme) => format!("discretisation={:?}", scheme),
            ComparisonAxis::CorrelationMethod(method) => {
                format!("correlationMethod={}", method.name())
            }
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Configuration of one simulation run.
///
/// # Examples
///
/// ```rust
/// use forecast_engine::config::{CorrelationMethod, SimulationConfig, TimeStep};
///
/// let config = SimulationConfig::builder()
///     .n_simulations(10_000)
///     .horizon_periods(24)
///     .time_step(TimeStep::Month)
///     .correlation_method(CorrelationMethod::Cholesky)
///     .seed(42)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.n_simulations, 10_000);
/// assert!((config.dt() - 1.0 / 12.0).abs() < 1e-15);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    /// Number of scenarios in [1,000, 100,000].
    pub n_simulations: usize,
    /// Number of periods simulated after period 0, in [1, 1,200].
    pub horizon_periods: usize,
    /// Period length.
    #[serde(default)]
    pub time_step: TimeStep,
    /// Master seed; drawn from OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Dependence method.
    #[serde(default)]
    pub correlation_method: CorrelationMethod,
    /// Discretisation scheme.
    #[serde(default)]
    pub discretisation: Discretisation,
    /// Percentile estimation mode.
    #[serde(default)]
    pub percentiles: PercentileMode,
    /// Confidence interval method for event probabilities.
    #[serde(default)]
    pub interval_method: IntervalMethod,
    /// Trials per work unit.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Size of a dedicated worker pool; the global pool is used when absent.
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// Optional comparison axis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_comparison: Option<ComparisonAxis>,
}

impl SimulationConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::default()
    }

    /// Step size in years.
    #[inline]
    pub fn dt(&self) -> f64 {
        self.time_step.dt()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if:
    /// - `n_simulations` is outside [1,000, 100,000]
    /// - `horizon_periods` is outside [1, 1,200]
    /// - `batch_size`, `worker_threads` or the sketch capacity is zero
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_SCENARIOS..=MAX_SCENARIOS).contains(&self.n_simulations) {
            return Err(ValidationError::ScenarioCount(self.n_simulations));
        }
        if self.horizon_periods == 0 || self.horizon_periods > MAX_HORIZON {
            return Err(ValidationError::Horizon(self.horizon_periods));
        }
        if self.batch_size == 0 {
            return Err(ValidationError::InvalidParameter {
                name: "batchSize",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.worker_threads == Some(0) {
            return Err(ValidationError::InvalidParameter {
                name: "workerThreads",
                reason: "must be at least 1 when set".to_string(),
            });
        }
        if let PercentileMode::Sketch { capacity } = self.percentiles {
            if capacity < 2 {
                return Err(ValidationError::InvalidParameter {
                    name: "percentiles.sketch.capacity",
                    reason: format!("must be at least 2, got {}", capacity),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`SimulationConfig`].
#[derive(Clone, Debug, Default)]
pub struct SimulationConfigBuilder {
    n_simulations: Option<usize>,
    horizon_periods: Option<usize>,
    time_step: TimeStep,
    seed: Option<u64>,
    correlation_method: CorrelationMethod,
    discretisation: Discretisation,
    percentiles: PercentileMode,
    interval_method: IntervalMethod,
    batch_size: Option<usize>,
    worker_threads: Option<usize>,
    model_comparison: Option<ComparisonAxis>,
}

impl SimulationConfigBuilder {
    /// Sets the number of scenarios.
    #[inline]
    pub fn n_simulations(mut self, n: usize) -> Self {
        self.n_simulations = Some(n);
        self
    }

    /// Sets the horizon in periods.
    #[inline]
    pub fn horizon_periods(mut self, periods: usize) -> Self {
        self.horizon_periods = Some(periods);
        self
    }

    /// Sets the period length.
    #[inline]
    pub fn time_step(mut self, time_step: TimeStep) -> Self {
        self.time_step = time_step;
        self
    }

    /// Sets the master seed.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the correlation method.
    #[inline]
    pub fn correlation_method(mut self, method: CorrelationMethod) -> Self {
        self.correlation_method = method;
        self
    }

    /// Sets the discretisation scheme.
    #[inline]
    pub fn discretisation(mut self, scheme: Discretisation) -> Self {
        self.discretisation = scheme;
        self
    }

    /// Sets the percentile mode.
    #[inline]
    pub fn percentiles(mut self, mode: PercentileMode) -> Self {
        self.percentiles = mode;
        self
    }

    /// Sets the confidence interval method.
    #[inline]
    pub fn interval_method(mut self, method: IntervalMethod) -> Self {
        self.interval_method = method;
        self
    }

    /// Sets the number of trials per work unit.
    #[inline]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Runs on a dedicated pool of `threads` workers.
    #[inline]
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Enables model comparison along `axis`.
    #[inline]
    pub fn model_comparison(mut self, axis: ComparisonAxis) -> Self {
        self.model_comparison = Some(axis);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the scenario count or horizon is missing
    /// or any field is out of range.
    pub fn build(self) -> Result<SimulationConfig, ValidationError> {
        let n_simulations = self.n_simulations.ok_or(ValidationError::InvalidParameter {
            name: "nSimulations",
            reason: "must be specified".to_string(),
        })?;
        let horizon_periods = self.horizon_periods.ok_or(ValidationError::InvalidParameter {
            name: "horizonPeriods",
            reason: "must be specified".to_string(),
        })?;

        let config = SimulationConfig {
            n_simulations,
            horizon_periods,
            time_step: self.time_step,
            seed: self.seed,
            correlation_method: self.correlation_method,
            discretisation: self.discretisation,
            percentiles: self.percentiles,
            interval_method: self.interval_method,
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            worker_threads: self.worker_threads,
            model_comparison: self.model_comparison,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SimulationConfigBuilder {
        SimulationConfig::builder().n_simulations(1_000).horizon_periods(12)
    }

    #[test]
    fn test_builder_defaults() {
        let config = base().build().unwrap();
        assert_eq!(config.time_step, TimeStep::Month);
        assert_eq!(config.correlation_method, CorrelationMethod::None);
        assert_eq!(config.discretisation, Discretisation::EulerMaruyama);
        assert_eq!(config.percentiles, PercentileMode::Exact);
        assert_eq!(config.interval_method, IntervalMethod::Normal);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.seed, None);
        assert_eq!(config.worker_threads, None);
    }

    #[test]
    fn test_scenario_count_bounds() {
        assert!(matches!(
            SimulationConfig::builder()
                .n_simulations(999)
                .horizon_periods(12)
                .build(),
            Err(ValidationError::ScenarioCount(999))
        ));
        assert!(matches!(
            SimulationConfig::builder()
                .n_simulations(MAX_SCENARIOS + 1)
                .horizon_periods(12)
                .build(),
            Err(ValidationError::ScenarioCount(_))
        ));
        assert!(SimulationConfig::builder()
            .n_simulations(MAX_SCENARIOS)
            .horizon_periods(12)
            .build()
            .is_ok());
    }

    #[test]
    fn test_horizon_bounds() {
        assert!(matches!(
            base().horizon_periods(0).build(),
            Err(ValidationError::Horizon(0))
        ));
        assert!(matches!(
            base().horizon_periods(MAX_HORIZON + 1).build(),
            Err(ValidationError::Horizon(_))
        ));
    }

    #[test]
    fn test_missing_scenario_count() {
        let result = SimulationConfig::builder().horizon_periods(12).build();
        assert!(matches!(
            result,
            Err(ValidationError::InvalidParameter {
                name: "nSimulations",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_batch_and_threads_rejected() {
        assert!(base().batch_size(0).build().is_err());
        assert!(base().worker_threads(0).build().is_err());
        assert!(base()
            .percentiles(PercentileMode::Sketch { capacity: 1 })
            .build()
            .is_err());
    }

    #[test]
    fn test_time_step_dt() {
        assert_eq!(TimeStep::Year.dt(), 1.0);
        assert_eq!(TimeStep::Quarter.dt(), 0.25);
        assert_eq!(TimeStep::Week.periods_per_year(), 52.0);
    }

    #[test]
    fn test_deserialise_minimal_json() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"nSimulations": 5000, "horizonPeriods": 24}"#).unwrap();
        assert_eq!(config.n_simulations, 5000);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialise_full_json() {
        let json = r#"{
            "nSimulations": 2000,
            "horizonPeriods": 8,
            "timeStep": "quarter",
            "seed": 7,
            "correlationMethod": "copula",
            "discretisation": "milstein",
            "percentiles": {"sketch": {"capacity": 64}},
            "intervalMethod": "wilson",
            "modelComparison": {"correlationMethod": "none"}
        }"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.time_step, TimeStep::Quarter);
        assert_eq!(config.correlation_method, CorrelationMethod::Copula);
        assert_eq!(config.discretisation, Discretisation::Milstein);
        assert_eq!(config.percentiles, PercentileMode::Sketch { capacity: 64 });
        assert_eq!(config.interval_method, IntervalMethod::Wilson);
        assert_eq!(
            config.model_comparison,
            Some(ComparisonAxis::CorrelationMethod(CorrelationMethod::None))
        );
    }

    #[test]
    fn test_comparison_axis_apply() {
        let config = base()
            .model_comparison(ComparisonAxis::Discretisation(Discretisation::Milstein))
            .build()
            .unwrap();
        let alternate = ComparisonAxis::Discretisation(Discretisation::Milstein).apply(&config);
        assert_eq!(alternate.discretisation, Discretisation::Milstein);
        assert_eq!(alternate.model_comparison, None);
        assert_eq!(alternate.n_simulations, config.n_simulations);
    }
}
