//! Parallel scenario runner.
//!
//! ## Execution model
//!
//! ```text
//! trials 0..N ──► batches of `batch_size` ──► waves of batches
//!                                               │
//!                      rayon par_iter over one wave, each batch owning
//!                      one TrialWorkspace and one partial observer
//!                                               │
//!                      partials merged in batch order ──► accumulator
//! ```
//!
//! Every scenario draws from its own stream seeded by
//! `master_seed XOR trial_index`, and partial observers are merged in batch
//! order rather than completion order. A seeded run is therefore
//! bit-identical whatever the thread count. Cancellation is checked and
//! progress reported between waves.

mod control;

use std::ops::Range;

use forecast_models::processes::AuxiliaryDraws;
use forecast_models::{ShockGenerator, StepContext, StepShock};
use rayon::prelude::*;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::error::{SimulationError, SimulationResult};
use crate::rng::ScenarioRng;
use crate::variable::CompiledVariable;
use crate::workspace::{ScenarioPath, TrialWorkspace};

pub use control::{CancellationToken, Progress, ProgressCallback, RunControl};

/// Batches scheduled per worker thread in each wave.
pub const BATCHES_PER_THREAD: usize = 2;

/// Consumer of completed scenario paths.
///
/// One observer is created per batch and fed that batch's paths in trial
/// order; partial observers are then folded together with [`merge`](Self::merge)
/// in batch order. `merge` must be associative for results to be independent
/// of how trials are batched.
pub trait PathObserver: Send {
    /// Consumes one completed path.
    fn observe(&mut self, path: &ScenarioPath<'_>);

    /// Folds a later partial observer into this one.
    fn merge(&mut self, other: Self)
    where
        Self: Sized;
}

/// Drives all variables of every scenario through the horizon.
#[derive(Debug)]
pub struct ScenarioRunner<'a> {
    config: &'a SimulationConfig,
    variables: &'a [CompiledVariable],
    auxiliary: Vec<AuxiliaryDraws>,
    generator: &'a ShockGenerator,
    master_seed: u64,
}

impl<'a> ScenarioRunner<'a> {
    /// Creates a runner.
    ///
    /// `generator` must serve exactly `variables.len()` variables.
    pub fn new(
        config: &'a SimulationConfig,
        variables: &'a [CompiledVariable],
        generator: &'a ShockGenerator,
        master_seed: u64,
    ) -> Self {
        debug_assert_eq!(generator.dim(), variables.len());
        Self {
            config,
            variables,
            auxiliary: variables.iter().map(|v| v.process.auxiliary_draws()).collect(),
            generator,
            master_seed,
        }
    }

    /// Master seed of the run.
    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Simulates scenario `trial` into `workspace`.
    ///
    /// Per period the shock generator fills one dependent diffusion shock per
    /// variable; auxiliary draws (Heston variance, Merton jumps) then follow
    /// in variable order from the same stream.
    ///
    /// # Errors
    ///
    /// `NumericalInstability` when a step yields NaN or an infinite value.
    pub fn simulate_trial(&self, trial: u64, workspace: &mut TrialWorkspace) -> SimulationResult<()> {
        let mut rng = ScenarioRng::for_trial(self.master_seed, trial);
        let mut buffers = workspace.split_mut();

        for (index, variable) in self.variables.iter().enumerate() {
            let state = variable.process.initial_state();
            buffers.states[index] = state;
            buffers.record(index, 0, state.level);
        }

        let base = StepContext::new(self.config.dt(), 1, self.config.discretisation);
        for period in 1..=self.config.horizon_periods {
            let ctx = base.at_period(period);
            self.generator.fill(&mut rng, buffers.scratch, buffers.shocks);

            for (index, (variable, aux)) in self.variables.iter().zip(&self.auxiliary).enumerate() {
                let shock = StepShock {
                    diffusion: buffers.shocks[index],
                    variance: if aux.variance_normal { rng.gen_normal() } else { 0.0 },
                    jump_uniform: if aux.jump { rng.gen_uniform() } else { 1.0 },
                    jump_size: if aux.jump { rng.gen_normal() } else { 0.0 },
                };

                let next = variable.process.step(buffers.states[index], &ctx, &shock);
                if !next.is_finite() {
                    return Err(SimulationError::NumericalInstability {
                        variable: variable.id.clone(),
                        scenario: trial,
                        period,
                        value: if next.level.is_finite() { next.variance } else { next.level },
                    });
                }
                buffers.states[index] = next;
                buffers.record(index, period, next.level);
            }
        }
        Ok(())
    }

    /// Runs every scenario and returns the merged observer.
    ///
    /// `make_observer` creates an empty observer; it is called once for the
    /// accumulator and once per batch.
    ///
    /// # Errors
    ///
    /// - `NumericalInstability` from the earliest failing batch
    /// - `Cancelled` when the control's token is observed between waves
    /// - `WorkerPool` when a dedicated pool cannot be built
    pub fn run<O, F>(&self, make_observer: F, control: &RunControl) -> SimulationResult<O>
    where
        O: PathObserver,
        F: Fn() -> O + Sync,
    {
        match self.config.worker_threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("forecast-worker-{}", i))
                    .build()
                    .map_err(|e| SimulationError::WorkerPool(e.to_string()))?;
                pool.install(|| self.run_waves(&make_observer, control))
            }
            None => self.run_waves(&make_observer, control),
        }
    }

    fn run_waves<O, F>(&self, make_observer: &F, control: &RunControl) -> SimulationResult<O>
    where
        O: PathObserver,
        F: Fn() -> O + Sync,
    {
        let total = self.config.n_simulations;
        let batches = batch_ranges(total, self.config.batch_size);
        let wave_len = (rayon::current_num_threads() * BATCHES_PER_THREAD).max(1);

        debug!(
            batches = batches.len(),
            wave_len,
            threads = rayon::current_num_threads(),
            "scheduling scenarios"
        );

        let mut accumulator = make_observer();
        let mut completed = 0;
        for (wave, ranges) in batches.chunks(wave_len).enumerate() {
            if control.is_cancelled() {
                debug!(completed, total, "cancellation observed");
                return Err(SimulationError::Cancelled { completed, total });
            }

            let partials: Vec<SimulationResult<O>> = ranges
                .par_iter()
                .map(|range| self.run_batch(range.clone(), make_observer))
                .collect();
            for partial in partials {
                accumulator.merge(partial?);
            }

            completed += ranges.iter().map(|r| r.len()).sum::<usize>();
            debug!(wave, completed, total, "wave complete");
            control.report(Progress { completed, total });
        }
        Ok(accumulator)
    }

    fn run_batch<O, F>(&self, trials: Range<usize>, make_observer: &F) -> SimulationResult<O>
    where
        O: PathObserver,
        F: Fn() -> O + Sync,
    {
        let mut observer = make_observer();
        let mut workspace = TrialWorkspace::new(self.variables.len(), self.config.horizon_periods);
        for trial in trials {
            let trial = trial as u64;
            self.simulate_trial(trial, &mut workspace)?;
            observer.observe(&workspace.path(trial));
        }
        Ok(observer)
    }
}

/// Splits `0..total` into consecutive ranges of at most `batch_size` trials.
pub fn batch_ranges(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..total)
        .step_by(batch_size)
        .map(|start| start..(start + batch_size).min(total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::{compile_variables, VariableConfig};
    use forecast_models::processes::GbmParams;
    use forecast_models::ProcessConfig;

    /// Collects terminal values in trial order.
    #[derive(Debug)]
    struct Terminal(Vec<(u64, f64)>);

    impl PathObserver for Terminal {
        fn observe(&mut self, path: &ScenarioPath<'_>) {
            self.0.push((path.trial(), path.value(0, path.n_periods() - 1)));
        }

        fn merge(&mut self, other: Self) {
            self.0.extend(other.0);
        }
    }

    fn config(batch_size: usize, threads: Option<usize>) -> SimulationConfig {
        let mut builder = SimulationConfig::builder()
            .n_simulations(1_000)
            .horizon_periods(6)
            .batch_size(batch_size)
            .seed(9);
        if let Some(t) = threads {
            builder = builder.worker_threads(t);
        }
        builder.build().unwrap()
    }

    fn gbm(volatility: f64) -> Vec<CompiledVariable> {
        compile_variables(&[VariableConfig::new(
            "v",
            "V",
            ProcessConfig::Gbm(GbmParams {
                drift: 0.1,
                volatility,
                initial_value: 50.0,
            }),
        )])
        .unwrap()
    }

    #[test]
    fn test_batch_ranges_cover_all_trials() {
        let ranges = batch_ranges(1_050, 512);
        assert_eq!(ranges, vec![0..512, 512..1024, 1024..1050]);
        assert_eq!(batch_ranges(10, 0).len(), 10);
    }

    #[test]
    fn test_trials_arrive_in_order_and_are_reproducible() {
        let vars = gbm(0.3);
        let generator = ShockGenerator::Independent { dim: 1 };
        let cfg = config(64, None);
        let runner = ScenarioRunner::new(&cfg, &vars, &generator, 9);

        let a = runner.run(|| Terminal(Vec::new()), &RunControl::new()).unwrap();
        let b = runner.run(|| Terminal(Vec::new()), &RunControl::new()).unwrap();
        assert_eq!(a.0.len(), 1_000);
        assert!(a.0.iter().enumerate().all(|(i, (t, _))| *t == i as u64));
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn test_result_independent_of_batching_and_threads() {
        let vars = gbm(0.3);
        let generator = ShockGenerator::Independent { dim: 1 };
        let cfg_a = config(7, Some(1));
        let cfg_b = config(500, Some(4));
        let a = ScenarioRunner::new(&cfg_a, &vars, &generator, 9)
            .run(|| Terminal(Vec::new()), &RunControl::new())
            .unwrap();
        let b = ScenarioRunner::new(&cfg_b, &vars, &generator, 9)
            .run(|| Terminal(Vec::new()), &RunControl::new())
            .unwrap();
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn test_zero_volatility_is_deterministic_growth() {
        let vars = gbm(0.0);
        let generator = ShockGenerator::Independent { dim: 1 };
        let cfg = config(128, None);
        let result = ScenarioRunner::new(&cfg, &vars, &generator, 1)
            .run(|| Terminal(Vec::new()), &RunControl::new())
            .unwrap();
        let expected = 50.0 * (0.1_f64 * 6.0 / 12.0).exp();
        for (_, v) in result.0 {
            assert!((v - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_cancellation_before_start() {
        let vars = gbm(0.3);
        let generator = ShockGenerator::Independent { dim: 1 };
        let cfg = config(64, None);
        let token = CancellationToken::new();
        token.cancel();
        let control = RunControl::new().with_cancellation(token);
        let result = ScenarioRunner::new(&cfg, &vars, &generator, 1).run(|| Terminal(Vec::new()), &control);
        assert_eq!(
            result.err(),
            Some(SimulationError::Cancelled {
                completed: 0,
                total: 1_000
            })
        );
    }

    #[test]
    fn test_progress_reaches_total() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let vars = gbm(0.3);
        let generator = ShockGenerator::Independent { dim: 1 };
        let cfg = config(100, Some(2));
        let last = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&last);
        let control = RunControl::new().with_progress(move |p| seen.store(p.completed, Ordering::SeqCst));
        ScenarioRunner::new(&cfg, &vars, &generator, 1)
            .run(|| Terminal(Vec::new()), &control)
            .unwrap();
        assert_eq!(last.load(Ordering::SeqCst), 1_000);
    }

    #[test]
    fn test_non_finite_step_is_reported() {
        let vars = compile_variables(&[VariableConfig::new(
            "rev",
            "REV",
            ProcessConfig::Gbm(GbmParams {
                drift: 1.0e6,
                volatility: 0.0,
                initial_value: 1.0,
            }),
        )])
        .unwrap();
        let generator = ShockGenerator::Independent { dim: 1 };
        let cfg = config(64, None);
        let err = ScenarioRunner::new(&cfg, &vars, &generator, 1)
            .run(|| Terminal(Vec::new()), &RunControl::new())
            .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::NumericalInstability { ref variable, scenario: 0, period: 1, .. } if variable == "rev"
        ));
    }
}
