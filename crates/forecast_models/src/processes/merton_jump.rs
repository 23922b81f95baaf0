//! Merton jump-diffusion.
//!
//! A GBM diffusion step followed by a multiplicative jump:
//! ```text
//! S(t+dt) = GBM(S(t)) * J,   J = exp(m + s Z_J)  with probability min(1, λ dt), else 1
//! ```
//!
//! The drift is not compensated for the expected jump size, so `drift` is the
//! growth rate of the diffusive part only.

use serde::{Deserialize, Serialize};

use super::{gbm, require_finite, require_non_negative, require_positive, StepContext, StepShock};
use crate::error::ProcessError;

const PROCESS: &str = "merton_jump";

/// Merton jump-diffusion parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MertonJumpParams {
    /// Level at period 0 (must be positive).
    pub initial_value: f64,
    /// Annualised drift of the diffusion.
    pub drift: f64,
    /// Annualised diffusion volatility.
    pub volatility: f64,
    /// Jump arrival rate λ per year.
    pub jump_intensity: f64,
    /// Mean of the log jump size.
    pub jump_mean: f64,
    /// Standard deviation of the log jump size.
    pub jump_volatility: f64,
}

impl MertonJumpParams {
    /// Checks parameter ranges.
    pub fn validate(&self) -> Result<(), ProcessError> {
        require_positive(PROCESS, "initialValue", self.initial_value)?;
        require_finite(PROCESS, "drift", self.drift)?;
        require_non_negative(PROCESS, "volatility", self.volatility)?;
        require_non_negative(PROCESS, "jumpIntensity", self.jump_intensity)?;
        require_finite(PROCESS, "jumpMean", self.jump_mean)?;
        require_non_negative(PROCESS, "jumpVolatility", self.jump_volatility)
    }

    /// Per-step jump probability `min(1, λ dt)`.
    #[inline]
    pub fn jump_probability(&self, dt: f64) -> f64 {
        (self.jump_intensity * dt).min(1.0)
    }

    fn diffusion(&self) -> gbm::GbmParams {
        gbm::GbmParams {
            drift: self.drift,
            volatility: self.volatility,
            initial_value: self.initial_value,
        }
    }
}

impl Default for MertonJumpParams {
    fn default() -> Self {
        Self {
            initial_value: 100.0,
            drift: 0.05,
            volatility: 0.2,
            jump_intensity: 0.5,
            jump_mean: -0.1,
            jump_volatility: 0.15,
        }
    }
}

#[inline]
pub(crate) fn step(
    level: f64,
    ctx: &StepContext,
    shock: &StepShock,
    params: &MertonJumpParams,
) -> f64 {
    let diffused = gbm::step(level, ctx, shock.diffusion, &params.diffusion());
    if shock.jump_uniform < params.jump_probability(ctx.dt) {
        diffused * (params.jump_mean + params.jump_volatility * shock.jump_size).exp()
    } else {
        diffused
    }
}
