//! Stochastic process simulators.
//!
//! Every supported model family is a variant of the closed sum type
//! [`ProcessConfig`]. A configuration is validated once by
//! [`ProcessConfig::compile`], which yields the runtime [`Process`]; the
//! runtime value exposes a single exhaustively matched [`Process::step`].
//!
//! ## Design Philosophy
//!
//! - **Static dispatch only**: enum-based dispatch, no `Box<dyn Trait>`
//! - **Pure transitions**: `step` reads the current state, the step context and
//!   the pre-drawn shocks; it never touches a random number generator
//! - **Fixed variance policy**: Heston uses full truncation everywhere
//!
//! ## Shock Layout
//!
//! ```text
//! StepShock
//! ├── diffusion     correlated N(0,1), supplied by the shock generator
//! ├── variance      independent N(0,1), Heston variance driver
//! ├── jump_uniform  U(0,1), Merton jump arrival
//! └── jump_size     independent N(0,1), Merton log jump size
//! ```

mod deterministic;
mod gbm;
mod heston;
mod merton_jump;
mod ornstein_uhlenbeck;
mod pert;

use serde::{Deserialize, Serialize};

use crate::error::ProcessError;

pub use deterministic::DeterministicParams;
pub use gbm::GbmParams;
pub use heston::HestonParams;
pub use merton_jump::MertonJumpParams;
pub use ornstein_uhlenbeck::OrnsteinUhlenbeckParams;
pub use pert::{PertParams, PertSampler};

/// Time discretisation scheme.
///
/// `EulerMaruyama` uses the exact lognormal step for GBM-type dynamics and
/// Euler-Maruyama elsewhere. `Milstein` adds the Itô correction
/// `0.5 * σ(x) * σ'(x) * dt * (Z² - 1)` wherever the diffusion is
/// state-dependent (GBM level, Heston variance).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discretisation {
    /// Euler-Maruyama (exact log step for GBM).
    #[default]
    EulerMaruyama,
    /// Milstein scheme.
    Milstein,
}

/// Per-step context shared by every variable of a scenario.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepContext {
    /// Step size in years.
    pub dt: f64,
    /// Precomputed `sqrt(dt)`.
    pub sqrt_dt: f64,
    /// Index of the period being produced (1-based; period 0 is the initial state).
    pub period: usize,
    /// Discretisation scheme.
    pub scheme: Discretisation,
}

impl StepContext {
    /// Creates a step context.
    #[inline]
    pub fn new(dt: f64, period: usize, scheme: Discretisation) -> Self {
        Self {
            dt,
            sqrt_dt: dt.sqrt(),
            period,
            scheme,
        }
    }

    /// Returns the same context advanced to another period.
    #[inline]
    pub fn at_period(mut self, period: usize) -> Self {
        self.period = period;
        self
    }
}

/// Random inputs consumed by one variable for one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepShock {
    /// Correlated standard normal diffusion shock.
    pub diffusion: f64,
    /// Independent standard normal driving the Heston variance.
    pub variance: f64,
    /// Uniform draw deciding whether a Merton jump arrives.
    pub jump_uniform: f64,
    /// Standard normal driving the Merton log jump size.
    pub jump_size: f64,
}

impl StepShock {
    /// Shock with only a diffusion component; no jump can arrive.
    #[inline]
    pub fn diffusion(z: f64) -> Self {
        Self {
            diffusion: z,
            variance: 0.0,
            jump_uniform: 1.0,
            jump_size: 0.0,
        }
    }
}

impl Default for StepShock {
    fn default() -> Self {
        Self::diffusion(0.0)
    }
}

/// Simulated state of one variable.
///
/// `variance` is only meaningful for Heston; other processes carry zero.
/// Under full truncation the stored variance may be negative; only its
/// positive part enters drift and diffusion terms.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProcessState {
    /// Observable level of the variable.
    pub level: f64,
    /// Instantaneous variance (Heston).
    pub variance: f64,
}

impl ProcessState {
    /// Single-factor state.
    #[inline]
    pub fn single(level: f64) -> Self {
        Self {
            level,
            variance: 0.0,
        }
    }

    /// True when every component is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.level.is_finite() && self.variance.is_finite()
    }
}

/// Which auxiliary random numbers a process consumes each step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuxiliaryDraws {
    /// Needs an independent normal for its variance factor.
    pub variance_normal: bool,
    /// Needs a jump arrival uniform and a jump size normal.
    pub jump: bool,
}

/// Tagged process configuration as supplied by callers.
///
/// # Examples
///
/// ```
/// use forecast_models::ProcessConfig;
///
/// let json = r#"{"type": "ornstein_uhlenbeck", "theta": 1.5, "mu": 0.02, "sigma": 0.01, "initialValue": 0.03}"#;
/// let config: ProcessConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.tag(), "ornstein_uhlenbeck");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessConfig {
    /// Geometric Brownian motion.
    Gbm(GbmParams),
    /// Mean-reverting Ornstein-Uhlenbeck diffusion.
    OrnsteinUhlenbeck(OrnsteinUhlenbeckParams),
    /// Heston stochastic volatility.
    Heston(HestonParams),
    /// Merton jump-diffusion.
    MertonJump(MertonJumpParams),
    /// Fixed or scheduled value.
    Deterministic(DeterministicParams),
    /// Beta-PERT best-estimate input.
    Pert(PertParams),
}

impl ProcessConfig {
    /// All recognised `type` tags.
    pub const TAGS: [&'static str; 6] = [
        "gbm",
        "ornstein_uhlenbeck",
        "heston",
        "merton_jump",
        "deterministic",
        "pert",
    ];

    /// Returns the `type` tag of the active variant.
    pub fn tag(&self) -> &'static str {
        match self {
            ProcessConfig::Gbm(_) => "gbm",
            ProcessConfig::OrnsteinUhlenbeck(_) => "ornstein_uhlenbeck",
            ProcessConfig::Heston(_) => "heston",
            ProcessConfig::MertonJump(_) => "merton_jump",
            ProcessConfig::Deterministic(_) => "deterministic",
            ProcessConfig::Pert(_) => "pert",
        }
    }

    /// Validates the parameters and builds the runtime process.
    ///
    /// # Errors
    ///
    /// Returns `ProcessError` when a parameter is not finite or outside its
    /// admissible range.
    pub fn compile(&self) -> Result<Process, ProcessError> {
        match self {
            ProcessConfig::Gbm(p) => p.validate().map(|_| Process::Gbm(*p)),
            ProcessConfig::OrnsteinUhlenbeck(p) => {
                p.validate().map(|_| Process::OrnsteinUhlenbeck(*p))
            }
            ProcessConfig::Heston(p) => p.validate().map(|_| Process::Heston(*p)),
            ProcessConfig::MertonJump(p) => p.validate().map(|_| Process::MertonJump(*p)),
            ProcessConfig::Deterministic(p) => {
                p.validate().map(|_| Process::Deterministic(p.clone()))
            }
            ProcessConfig::Pert(p) => PertSampler::new(*p).map(Process::Pert),
        }
    }
}

/// Validated runtime process.
#[derive(Clone, Debug)]
pub enum Process {
    /// Geometric Brownian motion.
    Gbm(GbmParams),
    /// Ornstein-Uhlenbeck.
    OrnsteinUhlenbeck(OrnsteinUhlenbeckParams),
    /// Heston stochastic volatility.
    Heston(HestonParams),
    /// Merton jump-diffusion.
    MertonJump(MertonJumpParams),
    /// Deterministic value.
    Deterministic(DeterministicParams),
    /// Beta-PERT sampler.
    Pert(PertSampler),
}

impl Process {
    /// Returns the family name.
    pub fn name(&self) -> &'static str {
        match self {
            Process::Gbm(_) => "gbm",
            Process::OrnsteinUhlenbeck(_) => "ornstein_uhlenbeck",
            Process::Heston(_) => "heston",
            Process::MertonJump(_) => "merton_jump",
            Process::Deterministic(_) => "deterministic",
            Process::Pert(_) => "pert",
        }
    }

    /// State at period 0.
    pub fn initial_state(&self) -> ProcessState {
        match self {
            Process::Gbm(p) => ProcessState::single(p.initial_value),
            Process::OrnsteinUhlenbeck(p) => ProcessState::single(p.initial_value),
            Process::Heston(p) => ProcessState {
                level: p.initial_value,
                variance: p.initial_variance,
            },
            Process::MertonJump(p) => ProcessState::single(p.initial_value),
            Process::Deterministic(p) => ProcessState::single(p.value_at(0)),
            Process::Pert(s) => ProcessState::single(s.params().mean()),
        }
    }

    /// Auxiliary random numbers consumed per step.
    pub fn auxiliary_draws(&self) -> AuxiliaryDraws {
        match self {
            Process::Heston(_) => AuxiliaryDraws {
                variance_normal: true,
                jump: false,
            },
            Process::MertonJump(_) => AuxiliaryDraws {
                variance_normal: false,
                jump: true,
            },
            Process::Gbm(_)
            | Process::OrnsteinUhlenbeck(_)
            | Process::Deterministic(_)
            | Process::Pert(_) => AuxiliaryDraws::default(),
        }
    }

    /// Advances the state by one period.
    #[inline]
    pub fn step(&self, state: ProcessState, ctx: &StepContext, shock: &StepShock) -> ProcessState {
        match self {
            Process::Gbm(p) => ProcessState::single(gbm::step(state.level, ctx, shock.diffusion, p)),
            Process::OrnsteinUhlenbeck(p) => {
                ProcessState::single(ornstein_uhlenbeck::step(state.level, ctx, shock.diffusion, p))
            }
            Process::Heston(p) => heston::step(state, ctx, shock.diffusion, shock.variance, p),
            Process::MertonJump(p) => ProcessState::single(merton_jump::step(
                state.level,
                ctx,
                shock,
                p,
            )),
            Process::Deterministic(p) => ProcessState::single(p.value_at(ctx.period)),
            Process::Pert(s) => ProcessState::single(s.sample(shock.diffusion)),
        }
    }
}

pub(crate) fn require_finite(
    process: &'static str,
    name: &'static str,
    value: f64,
) -> Result<(), ProcessError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ProcessError::InvalidParameter {
            process,
            name,
            reason: format!("must be finite, got {}", value),
        })
    }
}

pub(crate) fn require_non_negative(
    process: &'static str,
    name: &'static str,
    value: f64,
) -> Result<(), ProcessError> {
    require_finite(process, name, value)?;
    if value < 0.0 {
        return Err(ProcessError::InvalidParameter {
            process,
            name,
            reason: format!("must be non-negative, got {}", value),
        });
    }
    Ok(())
}

pub(crate) fn require_positive(
    process: &'static str,
    name: &'static str,
    value: f64,
) -> Result<(), ProcessError> {
    require_finite(process, name, value)?;
    if value <= 0.0 {
        return Err(ProcessError::InvalidParameter {
            process,
            name,
            reason: format!("must be positive, got {}", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> StepContext {
        StepContext::new(1.0 / 12.0, 1, Discretisation::EulerMaruyama)
    }

    #[test]
    fn test_process_config_round_trip_tags() {
        let configs = vec![
            ProcessConfig::Gbm(GbmParams {
                drift: 0.05,
                volatility: 0.2,
                initial_value: 100.0,
            }),
            ProcessConfig::Deterministic(DeterministicParams {
                value: 3.0,
                schedule: Vec::new(),
            }),
        ];
        for config in configs {
            let json = serde_json::to_string(&config).unwrap();
            assert!(json.contains(&format!("\"type\":\"{}\"", config.tag())));
            let back: ProcessConfig = serde_json::from_str(&json).unwrap();
            assert_eq!(back, config);
        }
    }

    #[test]
    fn test_unknown_tag_fails_to_parse() {
        let json = r#"{"type": "cir", "kappa": 1.0}"#;
        assert!(serde_json::from_str::<ProcessConfig>(json).is_err());
    }

    #[test]
    fn test_missing_parameter_fails_to_parse() {
        let json = r#"{"type": "gbm", "drift": 0.05, "initialValue": 1.0}"#;
        let err = serde_json::from_str::<ProcessConfig>(json).unwrap_err();
        assert!(err.to_string().contains("volatility"));
    }

    #[test]
    fn test_tags_cover_every_variant() {
        for tag in ProcessConfig::TAGS {
            assert!(!tag.is_empty());
        }
        assert_eq!(ProcessConfig::TAGS.len(), 6);
    }

    #[test]
    fn test_compile_rejects_invalid_parameters() {
        let config = ProcessConfig::Gbm(GbmParams {
            drift: 0.05,
            volatility: -0.2,
            initial_value: 100.0,
        });
        assert!(matches!(
            config.compile(),
            Err(ProcessError::InvalidParameter {
                name: "volatility",
                ..
            })
        ));
    }

    #[test]
    fn test_auxiliary_draws_per_family() {
        let heston = ProcessConfig::Heston(HestonParams::default()).compile().unwrap();
        assert!(heston.auxiliary_draws().variance_normal);
        assert!(!heston.auxiliary_draws().jump);

        let merton = ProcessConfig::MertonJump(MertonJumpParams::default())
            .compile()
            .unwrap();
        assert!(merton.auxiliary_draws().jump);

        let gbm = ProcessConfig::Gbm(GbmParams::default()).compile().unwrap();
        assert_eq!(gbm.auxiliary_draws(), AuxiliaryDraws::default());
    }

    #[test]
    fn test_deterministic_ignores_shock() {
        let process = ProcessConfig::Deterministic(DeterministicParams {
            value: 7.5,
            schedule: Vec::new(),
        })
        .compile()
        .unwrap();
        let state = process.initial_state();
        let a = process.step(state, &ctx(), &StepShock::diffusion(3.0));
        let b = process.step(state, &ctx(), &StepShock::diffusion(-3.0));
        assert_eq!(a.level, 7.5);
        assert_eq!(a, b);
    }

    #[test]
    fn test_step_context_at_period() {
        let c = ctx().at_period(5);
        assert_eq!(c.period, 5);
        assert_eq!(c.dt, 1.0 / 12.0);
    }
}
