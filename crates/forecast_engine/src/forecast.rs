//! Public entry points.
//!
//! Every entry point validates all inputs (configuration, variables, event
//! trees and dependence) before the first scenario is simulated, then drives
//! the [`ScenarioRunner`] with the matching observer. When the configuration
//! names a comparison axis, the run goes through [`compare_with`] and the
//! result carries the comparison payload.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use crate::aggregate::{ForecastAggregator, PeriodStatistics};
use crate::comparison::{compare_with, EventComparison, ForecastComparison};
use crate::config::{ComparisonAxis, CorrelationMethod, SimulationConfig};
use crate::dependence::{prepare_dependence, Dependence, PreparedDependence};
use crate::error::{ConfigWarning, SimulationResult, ValidationError};
use crate::events::{
    compile_event, CompiledEvent, EventCounts, EventDefinition, EventTally, ProbabilityEstimate,
};
use crate::rng::draw_master_seed;
use crate::runner::{PathObserver, RunControl, ScenarioRunner};
use crate::variable::{compile_variables, CompiledVariable, VariableConfig};

/// Output of [`run_forecast`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    /// Statistics ordered by variable (input order) then period.
    pub period_statistics: Vec<PeriodStatistics>,
    /// Scenarios simulated.
    pub scenario_count: usize,
    /// Wall-clock time of the invocation.
    pub compute_time_ms: u64,
    /// Master seed used; replaying it reproduces the result.
    pub seed: u64,
    /// Data-quality warnings.
    pub warnings: Vec<ConfigWarning>,
    /// Comparison against the configured alternate model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_comparison: Option<ForecastComparison>,
}

impl ForecastResult {
    /// Statistics of one variable (by id or code) at one period.
    pub fn statistics(&self, variable: &str, period: usize) -> Option<&PeriodStatistics> {
        self.period_statistics.iter().find(|s| {
            (s.variable_id == variable || s.variable_code == variable) && s.period == period
        })
    }
}

/// Output of [`run_event_probability`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventProbabilityResult {
    /// Probability and 90% interval.
    pub probability: ProbabilityEstimate,
    /// Scenarios simulated.
    pub scenario_count: usize,
    /// Scenarios in the denominator; fewer than `scenario_count` for conditionals.
    pub evaluated_count: u64,
    /// Wall-clock time of the invocation.
    pub compute_time_ms: u64,
    /// Master seed used.
    pub seed: u64,
    /// Data-quality warnings.
    pub warnings: Vec<ConfigWarning>,
    /// Comparison against the configured alternate model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_comparison: Option<EventComparison>,
}

/// Inputs that passed validation.
struct Validated {
    variables: Vec<CompiledVariable>,
    events: Vec<CompiledEvent>,
    baseline: PreparedDependence,
    alternate: Option<(CorrelationMethod, PreparedDependence)>,
}

impl Validated {
    fn dependence_for(&self, method: CorrelationMethod) -> &PreparedDependence {
        match &self.alternate {
            Some((m, prepared)) if *m == method => prepared,
            _ => &self.baseline,
        }
    }

    fn warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = self.baseline.warnings.clone();
        if let Some((_, alternate)) = &self.alternate {
            for w in &alternate.warnings {
                if !warnings.contains(w) {
                    warnings.push(w.clone());
                }
            }
        }
        warnings
    }
}

fn validate(
    config: &SimulationConfig,
    variables: &[VariableConfig],
    dependence: &Dependence,
    events: &[EventDefinition],
) -> SimulationResult<Validated> {
    config.validate()?;
    let variables = compile_variables(variables)?;
    let events = events
        .iter()
        .map(|e| compile_event(e, &variables, config.horizon_periods))
        .collect::<Result<Vec<_>, _>>()?;
    let baseline = prepare_dependence(config.correlation_method, dependence, variables.len())?;

    let alternate = match config.model_comparison {
        Some(ComparisonAxis::CorrelationMethod(method)) if method != config.correlation_method => {
            Some((method, prepare_dependence(method, dependence, variables.len())?))
        }
        _ => None,
    };

    Ok(Validated {
        variables,
        events,
        baseline,
        alternate,
    })
}

/// Runs every scenario of `config` through a fresh observer per batch.
fn simulate<O, F>(
    config: &SimulationConfig,
    variables: &[CompiledVariable],
    dependence: &PreparedDependence,
    control: &RunControl,
    make_observer: F,
) -> SimulationResult<(O, u64)>
where
    O: PathObserver,
    F: Fn() -> O + Sync,
{
    let seed = config.seed.unwrap_or_else(draw_master_seed);
    let runner = ScenarioRunner::new(config, variables, &dependence.generator, seed);
    let output = runner.run(make_observer, control)?;
    Ok((output, seed))
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Checks a forecast request without simulating.
///
/// Returns the warnings a run would report.
///
/// # Errors
///
/// Any `ValidationError` (wrapped in `SimulationError::Validation`).
pub fn check_forecast(
    config: &SimulationConfig,
    variables: &[VariableConfig],
    dependence: &Dependence,
) -> SimulationResult<Vec<ConfigWarning>> {
    Ok(validate(config, variables, dependence, &[])?.warnings())
}

/// Checks an event probability request without simulating.
///
/// # Errors
///
/// Any `ValidationError`, including event tree errors.
pub fn check_event_probability(
    event: &EventDefinition,
    variables: &[VariableConfig],
    config: &SimulationConfig,
    dependence: &Dependence,
) -> SimulationResult<Vec<ConfigWarning>> {
    Ok(validate(config, variables, dependence, std::slice::from_ref(event))?.warnings())
}

/// Simulates every variable and summarises each (variable, period) cell.
///
/// # Examples
///
/// ```rust
/// use forecast_engine::{run_forecast, Dependence, SimulationConfig, VariableConfig};
/// use forecast_models::processes::GbmParams;
/// use forecast_models::ProcessConfig;
///
/// let config = SimulationConfig::builder()
///     .n_simulations(1_000)
///     .horizon_periods(12)
///     .seed(42)
///     .build()
///     .unwrap();
/// let variables = [VariableConfig::new(
///     "rev",
///     "REVENUE",
///     ProcessConfig::Gbm(GbmParams { drift: 0.08, volatility: 0.25, initial_value: 1.0e6 }),
/// )];
///
/// let result = run_forecast(&config, &variables, &Dependence::none()).unwrap();
/// assert_eq!(result.period_statistics.len(), 13);
/// assert_eq!(result.seed, 42);
/// ```
///
/// # Errors
///
/// - `Validation` for any invalid input
/// - `UnsupportedProcess`, `NumericalInstability` as raised by the run
pub fn run_forecast(
    config: &SimulationConfig,
    variables: &[VariableConfig],
    dependence: &Dependence,
) -> SimulationResult<ForecastResult> {
    run_forecast_with(config, variables, dependence, &RunControl::new())
}

/// [`run_forecast`] with cancellation and progress reporting.
///
/// # Errors
///
/// As [`run_forecast`], plus `Cancelled` when the control's token fires.
pub fn run_forecast_with(
    config: &SimulationConfig,
    variables: &[VariableConfig],
    dependence: &Dependence,
    control: &RunControl,
) -> SimulationResult<ForecastResult> {
    let span = info_span!(
        "run_forecast",
        scenarios = config.n_simulations,
        variables = variables.len(),
        horizon = config.horizon_periods
    );
    let _entered = span.enter();
    let started = Instant::now();

    let validated = validate(config, variables, dependence, &[])?;
    let n_variables = validated.variables.len();
    let expected = config.batch_size.min(config.n_simulations);
    let forecast = |cfg: &SimulationConfig| -> SimulationResult<(Vec<PeriodStatistics>, u64)> {
        let (aggregator, seed) = simulate(
            cfg,
            &validated.variables,
            validated.dependence_for(cfg.correlation_method),
            control,
            || ForecastAggregator::new(n_variables, cfg.horizon_periods, cfg.percentiles, expected),
        )?;
        Ok((aggregator.finalize(&validated.variables), seed))
    };

    let (period_statistics, seed, model_comparison) = match config.model_comparison {
        Some(axis) => {
            let ((baseline, seed), (alternate, _)) = compare_with(config, axis, forecast)?;
            let comparison = ForecastComparison::between(axis, &baseline, &alternate);
            info!(
                axis = %comparison.description,
                max_relative_mean_deviation = comparison.max_relative_mean_deviation,
                "model comparison complete"
            );
            (baseline, seed, Some(comparison))
        }
        None => {
            let (statistics, seed) = forecast(config)?;
            (statistics, seed, None)
        }
    };

    let compute_time_ms = elapsed_ms(started);
    info!(seed, compute_time_ms, cells = period_statistics.len(), "forecast complete");
    Ok(ForecastResult {
        period_statistics,
        scenario_count: config.n_simulations,
        compute_time_ms,
        seed,
        warnings: validated.warnings(),
        model_comparison,
    })
}

/// Runs a forecast against the baseline and `axis`, with the seed held fixed.
///
/// # Errors
///
/// As [`run_forecast_with`], for either run.
pub fn compare_forecast(
    config: &SimulationConfig,
    variables: &[VariableConfig],
    dependence: &Dependence,
    axis: ComparisonAxis,
    control: &RunControl,
) -> SimulationResult<ForecastResult> {
    let config = SimulationConfig {
        model_comparison: Some(axis),
        ..config.clone()
    };
    run_forecast_with(&config, variables, dependence, control)
}

/// Estimates the probability of `event`.
///
/// # Errors
///
/// - `Validation` for any invalid input, including the event tree
/// - `UnsupportedProcess`, `NumericalInstability` as raised by the run
pub fn run_event_probability(
    event: &EventDefinition,
    variables: &[VariableConfig],
    config: &SimulationConfig,
    dependence: &Dependence,
) -> SimulationResult<EventProbabilityResult> {
    run_event_probability_with(event, variables, config, dependence, &RunControl::new())
}

/// [`run_event_probability`] with cancellation and progress reporting.
///
/// # Errors
///
/// As [`run_event_probability`], plus `Cancelled`.
pub fn run_event_probability_with(
    event: &EventDefinition,
    variables: &[VariableConfig],
    config: &SimulationConfig,
    dependence: &Dependence,
    control: &RunControl,
) -> SimulationResult<EventProbabilityResult> {
    let mut results =
        run_event_probabilities(std::slice::from_ref(event), variables, config, dependence, control)?;
    results.pop().ok_or_else(|| {
        ValidationError::MalformedEvent("no event definition supplied".to_string()).into()
    })
}

/// Estimates several events over one shared scenario ensemble.
///
/// Results are in definition order and share seed, scenario count and
/// compute time.
///
/// # Errors
///
/// As [`run_event_probability`]; an empty definition list is a
/// `MalformedEvent` validation error.
pub fn run_event_probabilities(
    events: &[EventDefinition],
    variables: &[VariableConfig],
    config: &SimulationConfig,
    dependence: &Dependence,
    control: &RunControl,
) -> SimulationResult<Vec<EventProbabilityResult>> {
    let span = info_span!(
        "run_event_probability",
        events = events.len(),
        scenarios = config.n_simulations,
        variables = variables.len(),
        horizon = config.horizon_periods
    );
    let _entered = span.enter();
    let started = Instant::now();

    if events.is_empty() {
        return Err(ValidationError::MalformedEvent(
            "at least one event definition is required".to_string(),
        )
        .into());
    }
    let validated = validate(config, variables, dependence, events)?;
    let tally = |cfg: &SimulationConfig| -> SimulationResult<(Vec<EventCounts>, u64)> {
        let (tally, seed) = simulate(
            cfg,
            &validated.variables,
            validated.dependence_for(cfg.correlation_method),
            control,
            || EventTally::new(&validated.events),
        )?;
        Ok((tally.into_counts(), seed))
    };

    let (counts, seed, comparisons): (Vec<EventCounts>, u64, Vec<Option<EventComparison>>) =
        match config.model_comparison {
            Some(axis) => {
                let ((baseline, seed), (alternate, _)) = compare_with(config, axis, tally)?;
                let comparisons = baseline
                    .iter()
                    .zip(&alternate)
                    .map(|(b, a)| Some(EventComparison::between(axis, b, a)))
                    .collect();
                (baseline, seed, comparisons)
            }
            None => {
                let (counts, seed) = tally(config)?;
                let n = counts.len();
                (counts, seed, vec![None; n])
            }
        };

    let compute_time_ms = elapsed_ms(started);
    let shared_warnings = validated.warnings();
    let results = validated
        .events
        .iter()
        .zip(counts)
        .zip(comparisons)
        .map(|((event, counts), model_comparison)| {
            let mut warnings = shared_warnings.clone();
            if event.is_conditional() && counts.evaluated == 0 {
                warn!(definition = event.label(), "conditional antecedent never held");
                warnings.push(ConfigWarning::ConditionNeverMet {
                    definition: event.label().to_string(),
                });
            }
            let probability = counts.estimate(config.interval_method);
            info!(
                definition = event.label(),
                probability = probability.mean,
                evaluated = counts.evaluated,
                "event probability estimated"
            );
            EventProbabilityResult {
                probability,
                scenario_count: config.n_simulations,
                evaluated_count: counts.evaluated,
                compute_time_ms,
                seed,
                warnings,
                model_comparison,
            }
        })
        .collect();

    info!(seed, compute_time_ms, "event run complete");
    Ok(results)
}

/// Estimates `event` against the baseline and `axis`, with the seed held fixed.
///
/// # Errors
///
/// As [`run_event_probability_with`], for either run.
pub fn compare_event_probability(
    event: &EventDefinition,
    variables: &[VariableConfig],
    config: &SimulationConfig,
    dependence: &Dependence,
    axis: ComparisonAxis,
    control: &RunControl,
) -> SimulationResult<EventProbabilityResult> {
    let config = SimulationConfig {
        model_comparison: Some(axis),
        ..config.clone()
    };
    run_event_probability_with(event, variables, &config, dependence, control)
}
