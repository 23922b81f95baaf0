//! Geometric Brownian Motion (GBM).
//!
//! ```text
//! dS = μ S dt + σ S dW
//! ```
//!
//! ## Log-space formulation
//!
//! The Euler-Maruyama scheme uses the exact solution, which carries no
//! discretisation error:
//! ```text
//! S(t+dt) = S(t) * exp((μ - 0.5σ²)dt + σ√dt Z)
//! ```
//!
//! The Milstein scheme steps in level space:
//! ```text
//! S(t+dt) = S(t) * (1 + μ dt + σ√dt Z + 0.5σ² dt (Z² - 1))
//! ```

use serde::{Deserialize, Serialize};

use super::{require_finite, require_non_negative, require_positive, Discretisation, StepContext};
use crate::error::ProcessError;

const PROCESS: &str = "gbm";

/// GBM parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GbmParams {
    /// Annualised drift μ.
    pub drift: f64,
    /// Annualised volatility σ.
    pub volatility: f64,
    /// Value at period 0 (must be positive).
    pub initial_value: f64,
}

impl GbmParams {
    /// Creates validated GBM parameters.
    pub fn new(drift: f64, volatility: f64, initial_value: f64) -> Result<Self, ProcessError> {
        let params = Self {
            drift,
            volatility,
            initial_value,
        };
        params.validate()?;
        Ok(params)
    }

    /// Checks parameter ranges.
    pub fn validate(&self) -> Result<(), ProcessError> {
        require_finite(PROCESS, "drift", self.drift)?;
        require_non_negative(PROCESS, "volatility", self.volatility)?;
        require_positive(PROCESS, "initialValue", self.initial_value)
    }
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            drift: 0.05,
            volatility: 0.2,
            initial_value: 100.0,
        }
    }
}

/// Advances a GBM level by one step.
#[inline]
pub(crate) fn step(level: f64, ctx: &StepContext, z: f64, params: &GbmParams) -> f64 {
    let mu = params.drift;
    let sigma = params.volatility;
    match ctx.scheme {
        Discretisation::EulerMaruyama => {
            let drift = (mu - 0.5 * sigma * sigma) * ctx.dt;
            let diffusion = sigma * ctx.sqrt_dt * z;
            level * (drift + diffusion).exp()
        }
        Discretisation::Milstein => {
            let correction = 0.5 * sigma * sigma * ctx.dt * (z * z - 1.0);
            level * (1.0 + mu * ctx.dt + sigma * ctx.sqrt_dt * z + correction)
        }
    }
}
