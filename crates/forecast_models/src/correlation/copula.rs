//! Copula samplers producing dependent uniforms.
//!
//! Each family yields a vector `u ∈ (0,1)^n` per step; the shock generator
//! maps it back to standard normal shocks with `Φ⁻¹`. Marginals are therefore
//! untouched and only the dependence structure differs between families.
//!
//! | Family    | Construction                                               |
//! |-----------|------------------------------------------------------------|
//! | Gaussian  | `u = Φ(L ε)`                                                |
//! | Student-t | `u = T_ν(L ε / √(χ²_ν / ν))`                                |
//! | Clayton   | `V ~ Gamma(1/θ, 1)`, `u = (1 + E/V)^(-1/θ)`                 |
//! | Gumbel    | `V ~ PositiveStable(1/θ)`, `u = exp(-(E/V)^(1/θ))`          |
//!
//! `E` are independent unit exponentials. The Archimedean families use the
//! Marshall-Olkin frailty construction and are exchangeable, so they ignore
//! any correlation matrix.

use std::f64::consts::PI;

use rand::Rng;
use rand_distr::{ChiSquared, Distribution, Exp1, Gamma, StandardNormal};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use super::CholeskyFactor;
use crate::distributions::norm_cdf;
use crate::error::{CopulaError, CorrelationError};

/// Copula family selected by the caller.
///
/// # Examples
///
/// ```
/// use forecast_models::CopulaFamily;
///
/// let family: CopulaFamily =
///     serde_json::from_str(r#"{"family": "student_t", "degreesOfFreedom": 5.0}"#).unwrap();
/// assert_eq!(family.name(), "student_t");
/// assert!(family.requires_matrix());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum CopulaFamily {
    /// Gaussian copula (no tail dependence).
    #[default]
    Gaussian,
    /// Student-t copula (symmetric tail dependence).
    StudentT {
        /// Degrees of freedom ν > 0.
        #[serde(rename = "degreesOfFreedom")]
        degrees_of_freedom: f64,
    },
    /// Clayton copula (lower tail dependence).
    Clayton {
        /// Dependence parameter θ > 0.
        theta: f64,
    },
    /// Gumbel copula (upper tail dependence).
    Gumbel {
        /// Dependence parameter θ ≥ 1.
        theta: f64,
    },
}

impl CopulaFamily {
    /// Family name as used in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            CopulaFamily::Gaussian => "gaussian",
            CopulaFamily::StudentT { .. } => "student_t",
            CopulaFamily::Clayton { .. } => "clayton",
            CopulaFamily::Gumbel { .. } => "gumbel",
        }
    }

    /// True for the elliptical families, which are parameterised by a matrix.
    pub fn requires_matrix(&self) -> bool {
        matches!(self, CopulaFamily::Gaussian | CopulaFamily::StudentT { .. })
    }

    /// Checks the family parameter.
    pub fn validate(&self) -> Result<(), CopulaError> {
        let invalid = |reason: String| CopulaError::InvalidParameter {
            family: self.name(),
            reason,
        };
        match *self {
            CopulaFamily::Gaussian => Ok(()),
            CopulaFamily::StudentT { degrees_of_freedom } => {
                if degrees_of_freedom.is_finite() && degrees_of_freedom > 0.0 {
                    Ok(())
                } else {
                    Err(invalid(format!(
                        "degrees of freedom must be positive, got {}",
                        degrees_of_freedom
                    )))
                }
            }
            CopulaFamily::Clayton { theta } => {
                if theta.is_finite() && theta > 0.0 {
                    Ok(())
                } else {
                    Err(invalid(format!("theta must be positive, got {}", theta)))
                }
            }
            CopulaFamily::Gumbel { theta } => {
                if theta.is_finite() && theta >= 1.0 {
                    Ok(())
                } else {
                    Err(invalid(format!("theta must be at least 1, got {}", theta)))
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
enum SamplerKind {
    Gaussian {
        factor: CholeskyFactor,
    },
    StudentT {
        factor: CholeskyFactor,
        dof: f64,
        chi_squared: ChiSquared<f64>,
        marginal: StudentsT,
    },
    Clayton {
        inv_theta: f64,
        frailty: Gamma<f64>,
    },
    Gumbel {
        alpha: f64,
    },
}

/// Validated copula ready to draw dependent uniforms.
#[derive(Clone, Debug)]
pub struct CopulaSampler {
    family: CopulaFamily,
    dim: usize,
    kind: SamplerKind,
}

impl CopulaSampler {
    /// Builds a sampler for `dim` variables.
    ///
    /// `factor` is the Cholesky factor of the correlation matrix; it is
    /// required by the Gaussian and Student-t families and ignored by the
    /// Archimedean ones.
    ///
    /// # Errors
    ///
    /// - `CopulaError::InvalidParameter` for an out-of-range family parameter
    /// - `CopulaError::MissingMatrix` when an elliptical family has no factor
    /// - `CopulaError::Correlation` when the factor dimension differs from `dim`
    pub fn new(
        family: CopulaFamily,
        factor: Option<CholeskyFactor>,
        dim: usize,
    ) -> Result<Self, CopulaError> {
        family.validate()?;

        let elliptical_factor = |factor: Option<CholeskyFactor>| -> Result<CholeskyFactor, CopulaError> {
            let factor = factor.ok_or(CopulaError::MissingMatrix {
                family: family.name(),
            })?;
            if factor.dim() != dim {
                return Err(CopulaError::Correlation(CorrelationError::SizeMismatch {
                    expected: dim,
                    got: factor.dim(),
                }));
            }
            Ok(factor)
        };
        let distribution_error = |e: String| CopulaError::InvalidParameter {
            family: family.name(),
            reason: e,
        };

        let kind = match family {
            CopulaFamily::Gaussian => SamplerKind::Gaussian {
                factor: elliptical_factor(factor)?,
            },
            CopulaFamily::StudentT { degrees_of_freedom } => SamplerKind::StudentT {
                factor: elliptical_factor(factor)?,
                dof: degrees_of_freedom,
                chi_squared: ChiSquared::new(degrees_of_freedom)
                    .map_err(|e| distribution_error(e.to_string()))?,
                marginal: StudentsT::new(0.0, 1.0, degrees_of_freedom)
                    .map_err(|e| distribution_error(e.to_string()))?,
            },
            CopulaFamily::Clayton { theta } => SamplerKind::Clayton {
                inv_theta: 1.0 / theta,
                frailty: Gamma::new(1.0 / theta, 1.0)
                    .map_err(|e| distribution_error(e.to_string()))?,
            },
            CopulaFamily::Gumbel { theta } => SamplerKind::Gumbel { alpha: 1.0 / theta },
        };

        Ok(Self { family, dim, kind })
    }

    /// Copula family.
    pub fn family(&self) -> CopulaFamily {
        self.family
    }

    /// Number of variables.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Draws one vector of dependent uniforms into `out`.
    ///
    /// `scratch` receives the independent normals used by the elliptical
    /// families. Both slices must hold at least `dim` entries.
    pub fn sample_uniforms<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        scratch: &mut [f64],
        out: &mut [f64],
    ) {
        let n = self.dim;
        match &self.kind {
            SamplerKind::Gaussian { factor } => {
                fill_standard_normal(rng, &mut scratch[..n]);
                factor.correlate(scratch, out);
                for u in &mut out[..n] {
                    *u = norm_cdf(*u);
                }
            }
            SamplerKind::StudentT {
                factor,
                dof,
                chi_squared,
                marginal,
            } => {
                fill_standard_normal(rng, &mut scratch[..n]);
                factor.correlate(scratch, out);
                let mixing = (chi_squared.sample(rng) / dof).sqrt();
                for u in &mut out[..n] {
                    *u = marginal.cdf(*u / mixing);
                }
            }
            SamplerKind::Clayton { inv_theta, frailty } => {
                let v: f64 = frailty.sample(rng);
                for u in &mut out[..n] {
                    let e: f64 = Exp1.sample(rng);
                    *u = (1.0 + e / v).powf(-inv_theta);
                }
            }
            SamplerKind::Gumbel { alpha } => {
                let v = positive_stable(rng, *alpha);
                for u in &mut out[..n] {
                    let e: f64 = Exp1.sample(rng);
                    *u = (-(e / v).powf(*alpha)).exp();
                }
            }
        }
    }
}

#[inline]
fn fill_standard_normal<R: Rng + ?Sized>(rng: &mut R, buffer: &mut [f64]) {
    for z in buffer.iter_mut() {
        *z = StandardNormal.sample(rng);
    }
}

/// Positive stable variable with Laplace transform `exp(-s^α)`, `α ∈ (0, 1]`.
///
/// Kanter's representation:
/// ```text
/// V = sin(αU) / sin(U)^(1/α) * (sin((1-α)U) / W)^((1-α)/α),   U ~ U(0, π), W ~ Exp(1)
/// ```
fn positive_stable<R: Rng + ?Sized>(rng: &mut R, alpha: f64) -> f64 {
    if alpha >= 1.0 {
        return 1.0;
    }
    let u = rng.gen_range(f64::MIN_POSITIVE..PI);
    let w: f64 = Exp1.sample(rng);
    let left = (alpha * u).sin() / u.sin().powf(1.0 / alpha);
    let right = (((1.0 - alpha) * u).sin() / w).powf((1.0 - alpha) / alpha);
    left * right
}
