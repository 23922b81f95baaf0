//! Request files.
//!
//! A forecast request is a JSON document:
//!
//! ```json
//! {
//!   "config": { "nSimulations": 10000, "horizonPeriods": 12, "seed": 42 },
//!   "variables": [
//!     { "id": "rev", "code": "REVENUE",
//!       "process": { "type": "gbm", "drift": 0.08, "volatility": 0.25, "initialValue": 1000000 } }
//!   ],
//!   "dependence": { "matrix": [[1.0]] }
//! }
//! ```
//!
//! An event request adds an `event` field holding one definition, or an
//! `events` array evaluated on one shared ensemble.

use std::path::Path;

use forecast_engine::{parse_variables, Dependence, EventDefinition, SimulationConfig, VariableConfig};
use serde::Deserialize;
use serde_json::Value;

use crate::{CliError, Result};

#[derive(Debug, Deserialize)]
struct RawRequest {
    config: SimulationConfig,
    variables: Value,
    #[serde(default)]
    dependence: Dependence,
    #[serde(default)]
    event: Option<EventDefinition>,
    #[serde(default)]
    events: Vec<EventDefinition>,
}

/// A parsed forecast request.
#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub config: SimulationConfig,
    pub variables: Vec<VariableConfig>,
    pub dependence: Dependence,
}

/// A parsed event probability request.
#[derive(Debug, Clone)]
pub struct EventRequest {
    pub forecast: ForecastRequest,
    pub events: Vec<EventDefinition>,
}

fn read(path: &str) -> Result<RawRequest> {
    if !Path::new(path).exists() {
        return Err(CliError::FileNotFound(path.to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn into_forecast(raw: &RawRequest) -> Result<ForecastRequest> {
    Ok(ForecastRequest {
        config: raw.config.clone(),
        variables: parse_variables(&raw.variables)?,
        dependence: raw.dependence.clone(),
    })
}

impl ForecastRequest {
    /// Loads a forecast request; any `event` fields are ignored.
    pub fn load(path: &str) -> Result<Self> {
        into_forecast(&read(path)?)
    }
}

impl EventRequest {
    /// Loads an event request. `event` and `events` are combined, single
    /// definition first.
    pub fn load(path: &str) -> Result<Self> {
        let raw = read(path)?;
        let forecast = into_forecast(&raw)?;
        let events: Vec<EventDefinition> = raw.event.into_iter().chain(raw.events).collect();
        if events.is_empty() {
            return Err(CliError::InvalidArgument(format!(
                "{}: an event request needs `event` or `events`",
                path
            )));
        }
        Ok(Self { forecast, events })
    }
}
