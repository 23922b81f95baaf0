//! Run command implementation
//!
//! Simulates a forecast request and prints per-period statistics.

use forecast_engine::{compare_forecast, run_forecast_with};
use tracing::info;

use super::{parse_axis, progress_control};
use crate::config::CliSettings;
use crate::output::{self, OutputFormat};
use crate::request::ForecastRequest;
use crate::Result;

/// Run the forecast command
pub fn run(
    input: &str,
    output: Option<&str>,
    format: &str,
    compare: Option<&str>,
    settings: &CliSettings,
) -> Result<()> {
    let format: OutputFormat = format.parse()?;
    let axis = compare.map(parse_axis).transpose()?;

    let mut request = ForecastRequest::load(input)?;
    settings.apply_to(&mut request.config);
    info!(
        "Forecasting {} variables over {} periods ({} scenarios)",
        request.variables.len(),
        request.config.horizon_periods,
        request.config.n_simulations
    );

    let control = progress_control();
    let result = match axis {
        Some(axis) => compare_forecast(
            &request.config,
            &request.variables,
            &request.dependence,
            axis,
            &control,
        )?,
        None => run_forecast_with(&request.config, &request.variables, &request.dependence, &control)?,
    };
    info!("Forecast complete in {} ms (seed {})", result.compute_time_ms, result.seed);

    let rendered = match format {
        OutputFormat::Json => output::to_json(&result, settings.pretty)?,
        OutputFormat::Table => output::forecast_table(&result),
    };
    output::emit(&rendered, output)
}
