//! Deterministic inputs.
//!
//! Used for best-estimate inputs where no stochastic model is specified. The
//! step ignores every shock. With a `schedule`, period `p ≥ 1` takes
//! `schedule[p - 1]`; periods past the end of the schedule hold its last entry.

use serde::{Deserialize, Serialize};

use super::require_finite;
use crate::error::ProcessError;

const PROCESS: &str = "deterministic";

/// Deterministic parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeterministicParams {
    /// Value at period 0, and at every period when no schedule is given.
    pub value: f64,
    /// Optional per-period values starting at period 1.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schedule: Vec<f64>,
}

impl DeterministicParams {
    /// Constant input.
    pub fn constant(value: f64) -> Self {
        Self {
            value,
            schedule: Vec::new(),
        }
    }

    /// Checks that every value is finite.
    pub fn validate(&self) -> Result<(), ProcessError> {
        require_finite(PROCESS, "value", self.value)?;
        for &v in &self.schedule {
            require_finite(PROCESS, "schedule", v)?;
        }
        Ok(())
    }

    /// Value at `period`.
    #[inline]
    pub fn value_at(&self, period: usize) -> f64 {
        match (period, self.schedule.last()) {
            (0, _) | (_, None) => self.value,
            (p, Some(&last)) => self.schedule.get(p - 1).copied().unwrap_or(last),
        }
    }
}
