//! # Forecast Engine (Layer 2: Scenario Execution)
//!
//! ## Layer 2 Role
//!
//! forecast_engine turns variable definitions into probabilistic forecasts:
//! - Simulation configuration with a validating builder
//! - Per-scenario seeded random streams and reusable trial workspaces
//! - A batch-parallel scenario runner on rayon with deterministic merging
//! - Streaming per-(variable, period) statistics with exact or sketched percentiles
//! - Event trees evaluated per path into probabilities with confidence intervals
//! - A model comparator that re-runs under one changed modelling choice
//!
//! ## Entry Points
//!
//! | Function | Output |
//! |----------|--------|
//! | [`run_forecast`] / [`run_forecast_with`] | [`ForecastResult`] |
//! | [`run_event_probability`] / [`run_event_probability_with`] | [`EventProbabilityResult`] |
//! | [`run_event_probabilities`] | one result per definition, shared ensemble |
//! | [`compare_forecast`] / [`compare_event_probability`] | result with `modelComparison` |
//! | [`check_forecast`] / [`check_event_probability`] | warnings, no simulation |
//!
//! ## Usage Example
//!
//! ```rust
//! use forecast_engine::events::{Comparator, EventDefinition, ThresholdBreach};
//! use forecast_engine::{run_event_probability, Dependence, SimulationConfig, VariableConfig};
//! use forecast_models::processes::GbmParams;
//! use forecast_models::ProcessConfig;
//!
//! let config = SimulationConfig::builder()
//!     .n_simulations(2_000)
//!     .horizon_periods(12)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//! let variables = [VariableConfig::new(
//!     "rev",
//!     "REVENUE",
//!     ProcessConfig::Gbm(GbmParams { drift: 0.08, volatility: 0.25, initial_value: 1.0e6 }),
//! )];
//! let event = EventDefinition::threshold(ThresholdBreach::at(
//!     "REVENUE",
//!     Comparator::GreaterOrEqual,
//!     1.5e6,
//!     12,
//! ));
//!
//! let result = run_event_probability(&event, &variables, &config, &Dependence::none()).unwrap();
//! let [low, high] = result.probability.ci90;
//! assert!(low <= result.probability.mean && result.probability.mean <= high);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod aggregate;
pub mod comparison;
pub mod config;
pub mod dependence;
pub mod error;
pub mod events;
pub mod forecast;
pub mod rng;
pub mod runner;
pub mod variable;
pub mod workspace;

pub use aggregate::{PeriodStatistics, Percentiles};
pub use comparison::{EventComparison, ForecastComparison};
pub use config::{
    ComparisonAxis, CorrelationMethod, IntervalMethod, PercentileMode, SimulationConfig,
    SimulationConfigBuilder, TimeStep,
};
pub use dependence::Dependence;
pub use error::{ConfigWarning, SimulationError, SimulationResult, ValidationError};
pub use events::{EventDefinition, ProbabilityEstimate};
pub use forecast::{
    check_event_probability, check_forecast, compare_event_probability, compare_forecast,
    run_event_probabilities, run_event_probability, run_event_probability_with, run_forecast,
    run_forecast_with, EventProbabilityResult, ForecastResult,
};
pub use runner::{CancellationToken, Progress, RunControl};
pub use variable::{parse_variables, VariableConfig};
