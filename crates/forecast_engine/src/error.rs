//! Error and warning types for the scenario engine.
//!
//! This module provides:
//! - `ValidationError`: bad input detected before any simulation work
//! - `SimulationError`: everything a run can fail with
//! - `ConfigWarning`: non-fatal data-quality findings returned with results

use forecast_models::{CopulaError, CorrelationError, ProcessError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input validation errors.
///
/// Raised while configuration, variables, dependence and events are checked,
/// always before the first scenario is simulated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// Scenario count outside [1,000, 100,000].
    #[error("Invalid scenario count {0}: must be in range [1000, 100000]")]
    ScenarioCount(usize),

    /// Horizon outside [1, 1,200] periods.
    #[error("Invalid horizon {0}: must be in range [1, 1200] periods")]
    Horizon(usize),

    /// Any other out-of-range configuration field.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Field name
        name: &'static str,
        /// Description of the violation
        reason: String,
    },

    /// No variables were supplied.
    #[error("At least one variable is required")]
    NoVariables,

    /// Two variables share an id or code.
    #[error("Duplicate variable identifier '{0}'")]
    DuplicateVariable(String),

    /// A variable could not be parsed.
    #[error("Malformed variable at index {index}: {reason}")]
    MalformedVariable {
        /// Position in the variable list
        index: usize,
        /// Parser message
        reason: String,
    },

    /// A process parameter failed validation.
    #[error("Variable '{variable}': {source}")]
    Process {
        /// Variable id
        variable: String,
        /// Underlying process error
        #[source]
        source: ProcessError,
    },

    /// Correlation matrix is malformed or the wrong size.
    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    /// Copula family is invalid.
    #[error(transparent)]
    Copula(#[from] CopulaError),

    /// The correlation method needs a matrix and none was supplied.
    #[error("Correlation method '{method}' requires a correlation matrix")]
    MissingCorrelation {
        /// Method or copula family name
        method: &'static str,
    },

    /// An event references a variable that does not exist.
    #[error("Event references unknown variable '{0}'")]
    UnknownVariable(String),

    /// Event tree is structurally invalid.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Sequence children must have strictly increasing period bounds.
    #[error("Sequence bounds must be strictly increasing: period {next} follows period {previous}")]
    NonIncreasingSequence {
        /// Bound of the earlier child
        previous: usize,
        /// Bound of the later child
        next: usize,
    },

    /// An event period is outside `[1, horizon]`.
    #[error("Event period {period} is outside the horizon [1, {horizon}]")]
    PeriodOutOfRange {
        /// Offending period
        period: usize,
        /// Simulation horizon
        horizon: usize,
    },
}

/// Errors that abort a simulation run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    /// Input rejected before simulation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A step produced NaN or an infinite value.
    #[error(
        "Numerical instability: variable '{variable}' produced {value} in scenario {scenario} at period {period}"
    )]
    NumericalInstability {
        /// Variable id
        variable: String,
        /// Scenario (trial) index
        scenario: u64,
        /// Period index
        period: usize,
        /// Offending value
        value: f64,
    },

    /// Process `type` tag is not recognised.
    #[error("Unsupported process type '{tag}'")]
    UnsupportedProcess {
        /// The unrecognised tag
        tag: String,
    },

    /// The run was cancelled through its cancellation token.
    #[error("Run cancelled after {completed} of {total} scenarios")]
    Cancelled {
        /// Scenarios completed before cancellation was observed
        completed: usize,
        /// Scenarios requested
        total: usize,
    },

    /// The dedicated worker pool could not be built.
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

impl From<CorrelationError> for SimulationError {
    fn from(err: CorrelationError) -> Self {
        SimulationError::Validation(err.into())
    }
}

impl From<CopulaError> for SimulationError {
    fn from(err: CopulaError) -> Self {
        SimulationError::Validation(err.into())
    }
}

/// Result alias used throughout the engine.
pub type SimulationResult<T> = Result<T, SimulationError>;

/// Non-fatal data-quality warning attached to a result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigWarning {
    /// The correlation matrix was not PSD and was projected before factoring.
    CorrelationProjected {
        /// Smallest eigenvalue before projection
        #[serde(rename = "minEigenvalue")]
        min_eigenvalue: f64,
        /// Largest absolute entry change
        #[serde(rename = "maxAdjustment")]
        max_adjustment: f64,
    },
    /// A conditional event's antecedent never held, so no scenario was evaluated.
    ConditionNeverMet {
        /// Event label
        definition: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::CorrelationProjected {
                min_eigenvalue,
                max_adjustment,
            } => write!(
                f,
                "correlation matrix was not positive semi-definite (min eigenvalue {:.3e}); \
                 projected with max entry change {:.3e}",
                min_eigenvalue, max_adjustment
            ),
            ConfigWarning::ConditionNeverMet { definition } => write!(
                f,
                "antecedent of '{}' never held; probability is undefined",
                definition
            ),
        }
    }
}
