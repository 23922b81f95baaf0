//! Ornstein-Uhlenbeck mean-reverting process.
//!
//! ```text
//! dx = θ (μ - x) dt + σ dW
//! ```
//!
//! Euler-Maruyama step:
//! ```text
//! x(t+dt) = x(t) + θ (μ - x(t)) dt + σ √dt Z
//! ```
//!
//! The diffusion coefficient does not depend on the state, so the Milstein
//! correction vanishes and both schemes produce the same step.

use serde::{Deserialize, Serialize};

use super::{require_finite, require_non_negative, StepContext};
use crate::error::ProcessError;

const PROCESS: &str = "ornstein_uhlenbeck";

/// Ornstein-Uhlenbeck parameters.
///
/// A negative `theta` is accepted and produces an explosive process; runaway
/// paths are caught by the engine's finiteness check.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrnsteinUhlenbeckParams {
    /// Mean-reversion speed θ.
    pub theta: f64,
    /// Long-run mean μ.
    pub mu: f64,
    /// Diffusion σ.
    pub sigma: f64,
    /// Value at period 0.
    pub initial_value: f64,
}

impl OrnsteinUhlenbeckParams {
    /// Creates validated parameters.
    pub fn new(theta: f64, mu: f64, sigma: f64, initial_value: f64) -> Result<Self, ProcessError> {
        let params = Self {
            theta,
            mu,
            sigma,
            initial_value,
        };
        params.validate()?;
        Ok(params)
    }

    /// Checks parameter ranges.
    pub fn validate(&self) -> Result<(), ProcessError> {
        require_finite(PROCESS, "theta", self.theta)?;
        require_finite(PROCESS, "mu", self.mu)?;
        require_non_negative(PROCESS, "sigma", self.sigma)?;
        require_finite(PROCESS, "initialValue", self.initial_value)
    }

    /// Stationary standard deviation `σ / sqrt(2θ)`, if the process is stationary.
    pub fn stationary_std(&self) -> Option<f64> {
        (self.theta > 0.0).then(|| self.sigma / (2.0 * self.theta).sqrt())
    }
}

#[inline]
pub(crate) fn step(x: f64, ctx: &StepContext, z: f64, params: &OrnsteinUhlenbeckParams) -> f64 {
    x + params.theta * (params.mu - x) * ctx.dt + params.sigma * ctx.sqrt_dt * z
}
