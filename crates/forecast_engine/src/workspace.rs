//! Reusable per-batch buffers.
//!
//! A [`TrialWorkspace`] is allocated once per batch and reused for every
//! scenario in it, so the inner simulation loop performs no heap allocation.
//!
//! # Memory Layout
//!
//! - `values`: n_variables × (horizon + 1), row-major, row = variable
//! - `states`: n_variables current process states
//! - `shocks`, `scratch`: n_variables, one period of diffusion shocks

use forecast_models::ProcessState;

/// Pre-allocated buffers for one scenario at a time.
#[derive(Clone, Debug)]
pub struct TrialWorkspace {
    values: Vec<f64>,
    states: Vec<ProcessState>,
    shocks: Vec<f64>,
    scratch: Vec<f64>,
    n_variables: usize,
    n_periods: usize,
}

impl TrialWorkspace {
    /// Allocates buffers for `n_variables` over `horizon` periods.
    pub fn new(n_variables: usize, horizon: usize) -> Self {
        let n_periods = horizon + 1;
        Self {
            values: vec![0.0; n_variables * n_periods],
            states: vec![ProcessState::default(); n_variables],
            shocks: vec![0.0; n_variables],
            scratch: vec![0.0; n_variables],
            n_variables,
            n_periods,
        }
    }

    /// Number of variables.
    #[inline]
    pub fn n_variables(&self) -> usize {
        self.n_variables
    }

    /// Number of stored periods (horizon + 1).
    #[inline]
    pub fn n_periods(&self) -> usize {
        self.n_periods
    }

    /// Records the level of `variable` at `period`.
    #[inline]
    pub fn record(&mut self, variable: usize, period: usize, value: f64) {
        self.values[variable * self.n_periods + period] = value;
    }

    /// Splits the workspace into the pieces the step loop needs at once.
    #[inline]
    pub fn split_mut(&mut self) -> StepBuffers<'_> {
        StepBuffers {
            states: &mut self.states,
            shocks: &mut self.shocks,
            scratch: &mut self.scratch,
            values: &mut self.values,
            n_periods: self.n_periods,
        }
    }

    /// Read-only view of the completed path.
    #[inline]
    pub fn path(&self, trial: u64) -> ScenarioPath<'_> {
        ScenarioPath {
            trial,
            values: &self.values,
            n_variables: self.n_variables,
            n_periods: self.n_periods,
        }
    }

    /// Bytes held by the buffers.
    pub fn memory_usage(&self) -> usize {
        (self.values.capacity() + self.shocks.capacity() + self.scratch.capacity())
            * std::mem::size_of::<f64>()
            + self.states.capacity() * std::mem::size_of::<ProcessState>()
    }
}

/// Mutable borrows of the per-step buffers.
pub struct StepBuffers<'a> {
    /// Current process states.
    pub states: &'a mut [ProcessState],
    /// Diffusion shocks for the current period.
    pub shocks: &'a mut [f64],
    /// Working space for the shock generator.
    pub scratch: &'a mut [f64],
    values: &'a mut [f64],
    n_periods: usize,
}

impl StepBuffers<'_> {
    /// Records the level of `variable` at `period`.
    #[inline]
    pub fn record(&mut self, variable: usize, period: usize, value: f64) {
        self.values[variable * self.n_periods + period] = value;
    }
}

/// Complete path of one scenario: variable × period levels.
///
/// Borrowed from the workspace; observers must copy anything they keep.
#[derive(Clone, Copy, Debug)]
pub struct ScenarioPath<'a> {
    trial: u64,
    values: &'a [f64],
    n_variables: usize,
    n_periods: usize,
}

impl<'a> ScenarioPath<'a> {
    /// Scenario index.
    #[inline]
    pub fn trial(&self) -> u64 {
        self.trial
    }

    /// Number of variables.
    #[inline]
    pub fn n_variables(&self) -> usize {
        self.n_variables
    }

    /// Number of periods including period 0.
    #[inline]
    pub fn n_periods(&self) -> usize {
        self.n_periods
    }

    /// Level of `variable` at `period`.
    #[inline]
    pub fn value(&self, variable: usize, period: usize) -> f64 {
        self.values[variable * self.n_periods + period]
    }

    /// Levels of `variable` for periods 0..=horizon.
    #[inline]
    pub fn series(&self, variable: usize) -> &'a [f64] {
        let start = variable * self.n_periods;
        &self.values[start..start + self.n_periods]
    }
}
