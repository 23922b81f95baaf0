//! # Forecast Models (Layer 1: Process Simulators and Dependence)
//!
//! ## Layer 1 Role
//!
//! forecast_models holds the pure, allocation-free building blocks of the
//! scenario engine:
//! - Stochastic process parameter sets and their one-step transition functions
//!   (GBM, Ornstein-Uhlenbeck, Heston, Merton jump-diffusion, deterministic, PERT)
//! - Correlation matrix validation, nearest-PSD repair and Cholesky factorisation
//! - Copula samplers (Gaussian, Student-t, Clayton, Gumbel)
//! - The [`ShockGenerator`](correlation::ShockGenerator) that turns a random
//!   stream into one dependent shock per variable per step
//!
//! Nothing in this crate owns a scenario loop; the engine layer
//! (`forecast_engine`) drives these functions.
//!
//! ## Usage Example
//!
//! ```rust
//! use forecast_models::processes::{Discretisation, GbmParams, ProcessConfig, StepContext, StepShock};
//!
//! let config = ProcessConfig::Gbm(GbmParams {
//!     drift: 0.08,
//!     volatility: 0.25,
//!     initial_value: 100.0,
//! });
//! let process = config.compile().unwrap();
//!
//! let ctx = StepContext::new(1.0 / 12.0, 1, Discretisation::EulerMaruyama);
//! let state = process.initial_state();
//! let next = process.step(state, &ctx, &StepShock::diffusion(0.0));
//! assert!(next.level > 0.0);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod correlation;
pub mod distributions;
pub mod error;
pub mod processes;

pub use correlation::{
    CholeskyFactor, CopulaFamily, CopulaSampler, CorrelationMatrix, ProjectionReport,
    ShockGenerator,
};
pub use error::{CopulaError, CorrelationError, ProcessError};
pub use processes::{
    Discretisation, Process, ProcessConfig, ProcessState, StepContext, StepShock,
};
