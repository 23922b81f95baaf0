//! Variable inputs.
//!
//! A variable pairs a stable identifier and a human code with a tagged
//! [`ProcessConfig`]. Variables arriving as untyped JSON go through
//! [`parse_variables`], which checks the `type` tag before deserialising so
//! an unknown family surfaces as `UnsupportedProcess` rather than a generic
//! parse failure.

use std::collections::HashMap;

use forecast_models::{Process, ProcessConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SimulationError, ValidationError};

/// One simulated variable.
///
/// # Examples
///
/// ```rust
/// use forecast_engine::variable::VariableConfig;
/// use forecast_models::processes::GbmParams;
/// use forecast_models::ProcessConfig;
///
/// let revenue = VariableConfig::new(
///     "rev-1",
///     "REVENUE",
///     ProcessConfig::Gbm(GbmParams { drift: 0.08, volatility: 0.25, initial_value: 1.0e6 }),
/// );
/// assert_eq!(revenue.code, "REVENUE");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableConfig {
    /// Stable identifier.
    pub id: String,
    /// Human-readable code.
    pub code: String,
    /// Process family and parameters.
    pub process: ProcessConfig,
}

impl VariableConfig {
    /// Creates a variable.
    pub fn new(id: impl Into<String>, code: impl Into<String>, process: ProcessConfig) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            process,
        }
    }
}

/// Parses a JSON array of variables.
///
/// # Errors
///
/// - `UnsupportedProcess` when a `process.type` tag is not recognised
/// - `Validation(MalformedVariable)` for any other shape or missing parameter
pub fn parse_variables(value: &Value) -> Result<Vec<VariableConfig>, SimulationError> {
    let items = value.as_array().ok_or(ValidationError::MalformedVariable {
        index: 0,
        reason: "expected an array of variables".to_string(),
    })?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_variable(index, item))
        .collect()
}

fn parse_variable(index: usize, item: &Value) -> Result<VariableConfig, SimulationError> {
    let malformed = |reason: String| ValidationError::MalformedVariable { index, reason };

    let tag = item
        .get("process")
        .and_then(|p| p.get("type"))
        .and_then(Value::as_str)
        .ok_or_else(|| malformed("missing process.type".to_string()))?;

    if !ProcessConfig::TAGS.contains(&tag) {
        return Err(SimulationError::UnsupportedProcess {
            tag: tag.to_string(),
        });
    }

    serde_json::from_value(item.clone()).map_err(|e| malformed(e.to_string()).into())
}

/// Validated variable ready for simulation.
#[derive(Clone, Debug)]
pub struct CompiledVariable {
    /// Stable identifier.
    pub id: String,
    /// Human-readable code.
    pub code: String,
    /// Runtime process.
    pub process: Process,
}

/// Validates every variable and compiles its process.
///
/// Ids and codes must be unique across all variables, since events may
/// reference either. A variable may use the same string for both.
pub fn compile_variables(
    variables: &[VariableConfig],
) -> Result<Vec<CompiledVariable>, ValidationError> {
    if variables.is_empty() {
        return Err(ValidationError::NoVariables);
    }

    // Every id and code names exactly one variable.
    let mut names: HashMap<&str, usize> = HashMap::new();
    variables
        .iter()
        .enumerate()
        .map(|(index, v)| {
            for name in [v.id.as_str(), v.code.as_str()] {
                match names.insert(name, index) {
                    Some(owner) if owner != index => {
                        return Err(ValidationError::DuplicateVariable(name.to_string()));
                    }
                    _ => {}
                }
            }
            let process = v.process.compile().map_err(|source| ValidationError::Process {
                variable: v.id.clone(),
                source,
            })?;
            Ok(CompiledVariable {
                id: v.id.clone(),
                code: v.code.clone(),
                process,
            })
        })
        .collect()
}
