//! Per-scenario random streams.
//!
//! Each scenario owns a [`ScenarioRng`] seeded from `master_seed XOR trial_index`.
//! The stream depends only on those two numbers, never on which worker runs
//! the scenario or in what order, which is what makes a seeded run
//! bit-identical across thread counts.

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

/// Seed of one scenario's stream.
#[inline]
pub fn trial_seed(master_seed: u64, trial: u64) -> u64 {
    master_seed ^ trial
}

/// Draws a fresh master seed from OS entropy.
pub fn draw_master_seed() -> u64 {
    OsRng.next_u64()
}

/// Seeded random stream of one scenario.
///
/// Implements [`RngCore`] so it can be handed straight to `rand_distr`
/// distributions and to the shock generator.
///
/// # Examples
///
/// ```rust
/// use forecast_engine::rng::ScenarioRng;
///
/// let mut a = ScenarioRng::for_trial(42, 7);
/// let mut b = ScenarioRng::for_trial(42, 7);
/// assert_eq!(a.gen_normal(), b.gen_normal());
/// assert_eq!(a.trial(), 7);
/// ```
#[derive(Clone, Debug)]
pub struct ScenarioRng {
    inner: StdRng,
    trial: u64,
}

impl ScenarioRng {
    /// Stream for scenario `trial` under `master_seed`.
    #[inline]
    pub fn for_trial(master_seed: u64, trial: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(trial_seed(master_seed, trial)),
            trial,
        }
    }

    /// Scenario index this stream belongs to.
    #[inline]
    pub fn trial(&self) -> u64 {
        self.trial
    }

    /// Uniform value in [0, 1).
    #[inline]
    pub fn gen_uniform(&mut self) -> f64 {
        self.inner.gen()
    }

    /// Standard normal variate (Ziggurat via `rand_distr::StandardNormal`).
    #[inline]
    pub fn gen_normal(&mut self) -> f64 {
        StandardNormal.sample(&mut self.inner)
    }
}

impl RngCore for ScenarioRng {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    #[inline]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    #[inline]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}
