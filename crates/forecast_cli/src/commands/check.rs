//! Check command implementation
//!
//! Validates a request without simulating and reports data-quality warnings.

use forecast_engine::{check_event_probability, check_forecast};
use tracing::{info, warn};

use crate::config::CliSettings;
use crate::request::{EventRequest, ForecastRequest};
use crate::Result;

/// Run the check command
pub fn run(input: &str, event: bool, settings: &CliSettings) -> Result<()> {
    info!("Checking {}", input);
    info!("  Available CPUs: {}", num_cpus::get());
    info!(
        "  Worker threads: {}",
        settings
            .worker_threads
            .map_or_else(|| "all".to_string(), |n| n.to_string())
    );

    let warnings = if event {
        let request = EventRequest::load(input)?;
        let forecast = &request.forecast;
        let mut warnings = Vec::new();
        for definition in &request.events {
            for w in check_event_probability(definition, &forecast.variables, &forecast.config, &forecast.dependence)? {
                if !warnings.contains(&w) {
                    warnings.push(w);
                }
            }
        }
        warnings
    } else {
        let request = ForecastRequest::load(input)?;
        check_forecast(&request.config, &request.variables, &request.dependence)?
    };

    for w in &warnings {
        warn!("{}", w);
    }
    println!(
        "{}: valid{}",
        input,
        if warnings.is_empty() {
            String::new()
        } else {
            format!(" with {} warning(s)", warnings.len())
        }
    );
    Ok(())
}
