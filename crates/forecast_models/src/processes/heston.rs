//! Heston stochastic volatility process.
//!
//! ```text
//! dS = μ S dt + √v S dW_S
//! dv = κ (θ - v) dt + ξ √v dW_v,    d<W_S, W_v> = ρ dt
//! ```
//!
//! ## Variance policy: full truncation
//!
//! The stored variance may go negative between steps. Wherever the variance
//! enters a drift, a diffusion coefficient or a square root, its positive part
//! `v⁺ = max(v, 0)` is used instead (Lord, Koekkoek & van Dijk, 2010). This
//! policy is the only one the engine uses.
//!
//! ```text
//! v(t+dt) = v + κ (θ - v⁺) dt + ξ √(v⁺ dt) Z_v   [+ ¼ ξ² dt (Z_v² - 1) under Milstein]
//! S(t+dt) = S exp((μ - ½ v⁺) dt + √(v⁺ dt) Z_S)
//! Z_v     = ρ Z_S + √(1 - ρ²) Z_aux
//! ```
//!
//! `Z_S` is the variable's injected (possibly cross-correlated) shock and
//! `Z_aux` an independent normal from the scenario stream.

use serde::{Deserialize, Serialize};

use super::{
    require_finite, require_non_negative, require_positive, Discretisation, ProcessState,
    StepContext,
};
use crate::error::ProcessError;

const PROCESS: &str = "heston";

/// Heston parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HestonParams {
    /// Level at period 0 (must be positive).
    pub initial_value: f64,
    /// Annualised drift μ of the level.
    pub drift: f64,
    /// Variance at period 0.
    pub initial_variance: f64,
    /// Mean-reversion speed κ of the variance.
    pub kappa: f64,
    /// Long-run variance θ.
    pub theta: f64,
    /// Volatility of variance ξ.
    pub vol_of_vol: f64,
    /// Correlation ρ between level and variance drivers.
    pub rho: f64,
}

impl HestonParams {
    /// Checks parameter ranges.
    pub fn validate(&self) -> Result<(), ProcessError> {
        require_positive(PROCESS, "initialValue", self.initial_value)?;
        require_finite(PROCESS, "drift", self.drift)?;
        require_non_negative(PROCESS, "initialVariance", self.initial_variance)?;
        require_positive(PROCESS, "kappa", self.kappa)?;
        require_non_negative(PROCESS, "theta", self.theta)?;
        require_non_negative(PROCESS, "volOfVol", self.vol_of_vol)?;
        require_finite(PROCESS, "rho", self.rho)?;
        if !(-1.0..=1.0).contains(&self.rho) {
            return Err(ProcessError::InvalidParameter {
                process: PROCESS,
                name: "rho",
                reason: format!("must be in [-1, 1], got {}", self.rho),
            });
        }
        Ok(())
    }

    /// Feller condition `2κθ ≥ ξ²`; when it holds the continuous variance stays positive.
    pub fn satisfies_feller(&self) -> bool {
        2.0 * self.kappa * self.theta >= self.vol_of_vol * self.vol_of_vol
    }
}

impl Default for HestonParams {
    fn default() -> Self {
        Self {
            initial_value: 100.0,
            drift: 0.05,
            initial_variance: 0.04,
            kappa: 2.0,
            theta: 0.04,
            vol_of_vol: 0.3,
            rho: -0.7,
        }
    }
}

#[inline]
pub(crate) fn step(
    state: ProcessState,
    ctx: &StepContext,
    z_level: f64,
    z_aux: f64,
    params: &HestonParams,
) -> ProcessState {
    let dt = ctx.dt;
    let v_pos = state.variance.max(0.0);
    let sqrt_v_dt = (v_pos * dt).sqrt();

    let z_var = params.rho * z_level + (1.0 - params.rho * params.rho).sqrt() * z_aux;

    let mut variance =
        state.variance + params.kappa * (params.theta - v_pos) * dt + params.vol_of_vol * sqrt_v_dt * z_var;
    if ctx.scheme == Discretisation::Milstein {
        variance += 0.25 * params.vol_of_vol * params.vol_of_vol * dt * (z_var * z_var - 1.0);
    }

    let level = state.level * ((params.drift - 0.5 * v_pos) * dt + sqrt_v_dt * z_level).exp();

    ProcessState { level, variance }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ctx(scheme: Discretisation) -> StepContext {
        StepContext::new(1.0 / 12.0, 1, scheme)
    }

    fn initial(p: &HestonParams) -> ProcessState {
        ProcessState {
            level: p.initial_value,
            variance: p.initial_variance,
        }
    }

    #[test]
    fn test_heston_default_is_valid() {
        let p = HestonParams::default();
        assert!(p.validate().is_ok());
        assert!(p.satisfies_feller());
    }

    #[test]
    fn test_heston_rejects_rho_out_of_range() {
        let p = HestonParams {
            rho: 1.5,
            ..HestonParams::default()
        };
        assert!(matches!(
            p.validate(),
            Err(ProcessError::InvalidParameter { name: "rho", .. })
        ));
    }

    #[test]
    fn test_heston_rejects_zero_kappa() {
        let p = HestonParams {
            kappa: 0.0,
            ..HestonParams::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_heston_zero_shock_drifts_variance_to_theta() {
        let p = HestonParams {
            initial_variance: 0.09,
            ..HestonParams::default()
        };
        let next = step(initial(&p), &ctx(Discretisation::EulerMaruyama), 0.0, 0.0, &p);
        let expected_v = 0.09 + 2.0 * (0.04 - 0.09) / 12.0;
        assert_relative_eq!(next.variance, expected_v, epsilon = 1e-15);
        let expected_s = 100.0 * ((0.05 - 0.5 * 0.09) / 12.0_f64).exp();
        assert_relative_eq!(next.level, expected_s, epsilon = 1e-12);
    }

    #[test]
    fn test_heston_full_truncation_uses_positive_part() {
        let p = HestonParams::default();
        let state = ProcessState {
            level: 100.0,
            variance: -0.01,
        };
        let next = step(state, &ctx(Discretisation::EulerMaruyama), 2.0, -3.0, &p);
        // With v⁺ = 0 the level only sees drift and the variance only mean reversion.
        assert_relative_eq!(next.level, 100.0 * (0.05_f64 / 12.0).exp(), epsilon = 1e-12);
        assert_relative_eq!(next.variance, -0.01 + 2.0 * 0.04 / 12.0, epsilon = 1e-15);
        assert!(next.is_finite());
    }

    #[test]
    fn test_heston_large_negative_shock_stays_finite() {
        let p = HestonParams {
            vol_of_vol: 2.0,
            ..HestonParams::default()
        };
        let mut state = initial(&p);
        for period in 1..=120 {
            let c = ctx(Discretisation::EulerMaruyama).at_period(period);
            state = step(state, &c, -4.0, -4.0, &p);
            assert!(state.is_finite());
        }
    }

    #[test]
    fn test_heston_milstein_adds_variance_correction() {
        let p = HestonParams::default();
        let euler = step(initial(&p), &ctx(Discretisation::EulerMaruyama), 1.0, 1.0, &p);
        let milstein = step(initial(&p), &ctx(Discretisation::Milstein), 1.0, 1.0, &p);
        let z_var = -0.7 + (1.0_f64 - 0.49).sqrt();
        let correction = 0.25 * 0.09 / 12.0 * (z_var * z_var - 1.0);
        assert_relative_eq!(milstein.variance - euler.variance, correction, epsilon = 1e-15);
        assert_eq!(euler.level, milstein.level);
    }
}
