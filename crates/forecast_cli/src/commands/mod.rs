//! CLI command implementations
//!
//! Each submodule implements a specific CLI command.

pub mod check;
pub mod event;
pub mod run;

use forecast_engine::{ComparisonAxis, CorrelationMethod, RunControl};
use forecast_models::Discretisation;
use tracing::debug;

use crate::{CliError, Result};

/// Parses a `--compare` value into the configuration axis it changes.
///
/// Scheme names (`euler_maruyama`, `milstein`) vary the discretisation;
/// method names (`none`, `cholesky`, `copula`) vary the correlation method.
pub fn parse_axis(value: &str) -> Result<ComparisonAxis> {
    match value {
        "euler_maruyama" | "euler" => Ok(ComparisonAxis::Discretisation(Discretisation::EulerMaruyama)),
        "milstein" => Ok(ComparisonAxis::Discretisation(Discretisation::Milstein)),
        "none" => Ok(ComparisonAxis::CorrelationMethod(CorrelationMethod::None)),
        "cholesky" => Ok(ComparisonAxis::CorrelationMethod(CorrelationMethod::Cholesky)),
        "copula" => Ok(ComparisonAxis::CorrelationMethod(CorrelationMethod::Copula)),
        other => Err(CliError::InvalidArgument(format!(
            "Unknown comparison axis: {}. Supported: euler_maruyama, milstein, none, cholesky, copula",
            other
        ))),
    }
}

/// Run control that logs wave progress at debug level.
pub fn progress_control() -> RunControl {
    RunControl::new().with_progress(|p| {
        debug!(
            completed = p.completed,
            total = p.total,
            "{:.0}% of scenarios simulated",
            p.fraction() * 100.0
        );
    })
}
