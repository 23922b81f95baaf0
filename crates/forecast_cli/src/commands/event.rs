//! Event command implementation
//!
//! Estimates the probability of one or more event definitions. All
//! definitions are evaluated on one simulated ensemble, including under
//! `--compare`.

use forecast_engine::{
    run_event_probabilities, ComparisonAxis, EventProbabilityResult, RunControl,
};
use tracing::info;

use super::{parse_axis, progress_control};
use crate::config::CliSettings;
use crate::output::{self, OutputFormat};
use crate::request::EventRequest;
use crate::Result;

/// Run the event command
pub fn run(
    input: &str,
    output: Option<&str>,
    format: &str,
    compare: Option<&str>,
    settings: &CliSettings,
) -> Result<()> {
    let format: OutputFormat = format.parse()?;
    let axis = compare.map(parse_axis).transpose()?;

    let mut request = EventRequest::load(input)?;
    settings.apply_to(&mut request.forecast.config);
    info!("Evaluating {} event definitions", request.events.len());

    let results = evaluate(&mut request, axis, &progress_control())?;
    for (event, r) in request.events.iter().zip(&results) {
        info!("P({}) = {:.4}", event, r.probability.mean);
    }

    let rendered = match format {
        OutputFormat::Json if results.len() == 1 => output::to_json(&results[0], settings.pretty)?,
        OutputFormat::Json => output::to_json(&results, settings.pretty)?,
        OutputFormat::Table => output::event_table(&request.events, &results),
    };
    output::emit(&rendered, output)
}

/// Evaluates every definition of `request` on one ensemble, attaching a
/// comparison against `axis` when given.
fn evaluate(
    request: &mut EventRequest,
    axis: Option<ComparisonAxis>,
    control: &RunControl,
) -> Result<Vec<EventProbabilityResult>> {
    if axis.is_some() {
        request.forecast.config.model_comparison = axis;
    }
    let forecast = &request.forecast;
    Ok(run_event_probabilities(
        &request.events,
        &forecast.variables,
        &forecast.config,
        &forecast.dependence,
        control,
    )?)
}
