//! Beta-PERT best-estimate inputs.
//!
//! A three-point estimate (min, most likely, max) is turned into a scaled Beta
//! distribution:
//! ```text
//! α = 1 + λ (mode - min) / (max - min)
//! β = 1 + λ (max - mode) / (max - min)
//! X = min + (max - min) * BetaInv(Φ(Z); α, β)
//! ```
//!
//! Sampling through `Φ(Z)` keeps the variable's injected shock as the only
//! source of randomness, so PERT inputs take part in cross-variable
//! correlation like any diffusion. Each period is an independent draw.

use serde::{Deserialize, Serialize};
use statrs::distribution::{Beta, ContinuousCDF};

use super::{require_finite, require_positive};
use crate::distributions::norm_cdf;
use crate::error::ProcessError;

const PROCESS: &str = "pert";

fn default_lambda() -> f64 {
    4.0
}

/// Beta-PERT parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PertParams {
    /// Lower bound.
    pub min: f64,
    /// Mode.
    pub most_likely: f64,
    /// Upper bound.
    pub max: f64,
    /// Shape weight on the mode (classic PERT uses 4).
    #[serde(default = "default_lambda")]
    pub lambda: f64,
}

impl PertParams {
    /// Checks `min ≤ most_likely ≤ max`, `min < max` and `lambda > 0`.
    pub fn validate(&self) -> Result<(), ProcessError> {
        require_finite(PROCESS, "min", self.min)?;
        require_finite(PROCESS, "mostLikely", self.most_likely)?;
        require_finite(PROCESS, "max", self.max)?;
        require_positive(PROCESS, "lambda", self.lambda)?;
        if self.min >= self.max {
            return Err(ProcessError::InvalidParameter {
                process: PROCESS,
                name: "max",
                reason: format!("must exceed min ({}), got {}", self.min, self.max),
            });
        }
        if self.most_likely < self.min || self.most_likely > self.max {
            return Err(ProcessError::InvalidParameter {
                process: PROCESS,
                name: "mostLikely",
                reason: format!(
                    "must lie in [{}, {}], got {}",
                    self.min, self.max, self.most_likely
                ),
            });
        }
        Ok(())
    }

    /// Beta shape parameters `(α, β)`.
    pub fn shapes(&self) -> (f64, f64) {
        let range = self.max - self.min;
        (
            1.0 + self.lambda * (self.most_likely - self.min) / range,
            1.0 + self.lambda * (self.max - self.most_likely) / range,
        )
    }

    /// PERT mean `(min + λ·mode + max) / (λ + 2)`.
    pub fn mean(&self) -> f64 {
        (self.min + self.lambda * self.most_likely + self.max) / (self.lambda + 2.0)
    }
}

/// Validated PERT parameters with their Beta distribution.
#[derive(Clone, Debug)]
pub struct PertSampler {
    params: PertParams,
    beta: Beta,
}

impl PertSampler {
    /// Validates the parameters and builds the Beta distribution.
    pub fn new(params: PertParams) -> Result<Self, ProcessError> {
        params.validate()?;
        let (alpha, beta) = params.shapes();
        let beta = Beta::new(alpha, beta).map_err(|e| ProcessError::Distribution {
            process: PROCESS,
            reason: e.to_string(),
        })?;
        Ok(Self { params, beta })
    }

    /// Underlying parameters.
    pub fn params(&self) -> &PertParams {
        &self.params
    }

    /// Maps a standard normal shock to a PERT draw.
    #[inline]
    pub fn sample(&self, z: f64) -> f64 {
        let u = norm_cdf(z).clamp(0.0, 1.0);
        let x = self.beta.inverse_cdf(u).clamp(0.0, 1.0);
        self.params.min + (self.params.max - self.params.min) * x
    }
}
