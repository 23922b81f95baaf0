//! Correlated shock generation.
//!
//! [`ShockGenerator`] turns a scenario's random stream into one vector of
//! standard normal diffusion shocks per period, one entry per variable, with
//! the requested dependence structure.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use super::{CholeskyFactor, CopulaSampler};
use crate::distributions::norm_inv_cdf;

/// Source of per-period diffusion shocks.
///
/// Every variant produces N(0,1) marginals. `Cholesky` draws `W = L Z`;
/// `Copula` draws dependent uniforms and maps each back through `Φ⁻¹`.
#[derive(Clone, Debug)]
pub enum ShockGenerator {
    /// Independent shocks.
    Independent {
        /// Number of variables.
        dim: usize,
    },
    /// Linear correlation through a Cholesky factor.
    Cholesky(CholeskyFactor),
    /// Copula dependence.
    Copula(CopulaSampler),
}

impl ShockGenerator {
    /// Number of variables served.
    pub fn dim(&self) -> usize {
        match self {
            ShockGenerator::Independent { dim } => *dim,
            ShockGenerator::Cholesky(factor) => factor.dim(),
            ShockGenerator::Copula(sampler) => sampler.dim(),
        }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ShockGenerator::Independent { .. } => "independent",
            ShockGenerator::Cholesky(_) => "cholesky",
            ShockGenerator::Copula(sampler) => sampler.family().name(),
        }
    }

    /// Fills `shocks` with one period of diffusion shocks.
    ///
    /// `scratch` is working space of the same length; both must hold at
    /// least `dim()` entries.
    #[inline]
    pub fn fill<R: Rng + ?Sized>(&self, rng: &mut R, scratch: &mut [f64], shocks: &mut [f64]) {
        match self {
            ShockGenerator::Independent { dim } => {
                for z in &mut shocks[..*dim] {
                    *z = StandardNormal.sample(rng);
                }
            }
            ShockGenerator::Cholesky(factor) => {
                for z in &mut scratch[..factor.dim()] {
                    *z = StandardNormal.sample(rng);
                }
                factor.correlate(scratch, shocks);
            }
            ShockGenerator::Copula(sampler) => {
                sampler.sample_uniforms(rng, scratch, shocks);
                for z in &mut shocks[..sampler.dim()] {
                    *z = norm_inv_cdf(*z);
                }
            }
        }
    }
}
