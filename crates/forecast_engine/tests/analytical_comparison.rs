//! Analytical comparison tests for the scenario engine.
//!
//! Monte Carlo estimates are checked against closed forms where they exist.
//!
//! # Test Categories
//!
//! 1. **GBM**: terminal exceedance probability vs the lognormal CDF
//! 2. **Degenerate processes**: zero volatility reproduces deterministic growth
//! 3. **Convergence**: interval width scales as `1/sqrt(n)`
//! 4. **Mean reversion**: OU towards a negative mean raises `probNegative`

use approx::assert_relative_eq;
use forecast_engine::events::{Comparator, EventDefinition, ThresholdBreach};
use forecast_engine::{
    run_event_probability, run_forecast, Dependence, SimulationConfig, TimeStep, VariableConfig,
};
use forecast_models::distributions::norm_cdf;
use forecast_models::processes::{GbmParams, OrnsteinUhlenbeckParams};
use forecast_models::ProcessConfig;

fn revenue(drift: f64, volatility: f64, initial_value: f64) -> VariableConfig {
    VariableConfig::new(
        "rev-1",
        "REVENUE",
        ProcessConfig::Gbm(GbmParams {
            drift,
            volatility,
            initial_value,
        }),
    )
}

fn monthly(n_simulations: usize, horizon: usize, seed: u64) -> SimulationConfig {
    SimulationConfig::builder()
        .n_simulations(n_simulations)
        .horizon_periods(horizon)
        .time_step(TimeStep::Month)
        .seed(seed)
        .build()
        .unwrap()
}

/// `P(V_T >= k)` for a GBM started at `v0`.
fn lognormal_exceedance(v0: f64, k: f64, drift: f64, vol: f64, t: f64) -> f64 {
    let d = ((v0 / k).ln() + (drift - 0.5 * vol * vol) * t) / (vol * t.sqrt());
    norm_cdf(d)
}

// ============================================================================
// GBM
// ============================================================================

#[test]
fn test_gbm_terminal_exceedance_vs_lognormal() {
    let (drift, vol, v0, bound) = (0.08, 0.25, 1_000_000.0, 1_500_000.0);
    let analytic = lognormal_exceedance(v0, bound, drift, vol, 1.0);
    assert_relative_eq!(analytic, 0.0768, epsilon = 5e-4);

    let event = EventDefinition::threshold(ThresholdBreach::at(
        "REVENUE",
        Comparator::GreaterOrEqual,
        bound,
        12,
    ));
    let result = run_event_probability(
        &event,
        &[revenue(drift, vol, v0)],
        &monthly(50_000, 12, 42),
        &Dependence::none(),
    )
    .unwrap();

    let p = result.probability.mean;
    let se = (analytic * (1.0 - analytic) / 50_000.0).sqrt();
    assert!(
        (p - analytic).abs() < 2.0 * se,
        "MC={:.5}, analytic={:.5}, 2SE={:.5}",
        p,
        analytic,
        2.0 * se
    );
    let [low, high] = result.probability.ci90;
    assert!(low < p && p < high);
    assert_eq!(result.scenario_count, 50_000);
    assert_eq!(result.evaluated_count, 50_000);
    assert_eq!(result.seed, 42);
}

#[test]
fn test_gbm_mean_and_median_vs_lognormal() {
    let (drift, vol, v0) = (0.08, 0.25, 100.0);
    let result = run_forecast(&monthly(50_000, 12, 7), &[revenue(drift, vol, v0)], &Dependence::none()).unwrap();
    let terminal = result.statistics("rev-1", 12).unwrap();

    let mean = v0 * drift.exp();
    let std = mean * ((vol * vol).exp() - 1.0).sqrt();
    let median = v0 * (drift - 0.5 * vol * vol).exp();

    assert!((terminal.mean - mean).abs() < 4.0 * std / (50_000f64).sqrt());
    assert_relative_eq!(terminal.std, std, max_relative = 0.03);
    assert_relative_eq!(terminal.median, median, max_relative = 0.01);
    assert_eq!(terminal.prob_negative, 0.0);
    assert!(terminal.percentiles.is_monotone());
}

// ============================================================================
// Degenerate processes
// ============================================================================

#[test]
fn test_zero_volatility_is_deterministic() {
    let (drift, v0) = (0.06, 250.0);
    let result = run_forecast(&monthly(1_000, 24, 1), &[revenue(drift, 0.0, v0)], &Dependence::none()).unwrap();

    for stats in &result.period_statistics {
        let expected = v0 * (drift * stats.period as f64 / 12.0).exp();
        assert_relative_eq!(stats.mean, expected, max_relative = 1e-12);
        assert_relative_eq!(stats.min, expected, max_relative = 1e-12);
        assert_relative_eq!(stats.max, expected, max_relative = 1e-12);
        assert!(stats.std < 1e-9 * expected);
    }
}

// ============================================================================
// Convergence
// ============================================================================

#[test]
fn test_interval_width_halves_with_four_times_scenarios() {
    let event = EventDefinition::threshold(ThresholdBreach::at("REVENUE", Comparator::Greater, 100.0, 6));
    let vars = [revenue(0.0, 0.3, 100.0)];
    let width = |n| {
        let r = run_event_probability(&event, &vars, &monthly(n, 6, 11), &Dependence::none()).unwrap();
        r.probability.ci90[1] - r.probability.ci90[0]
    };
    let ratio = width(5_000) / width(20_000);
    assert!((1.8..2.2).contains(&ratio), "width ratio {}", ratio);
}

// ============================================================================
// Mean reversion
// ============================================================================

#[test]
fn test_ou_towards_negative_mean_raises_prob_negative() {
    let rate = VariableConfig::new(
        "rate",
        "RATE",
        ProcessConfig::OrnsteinUhlenbeck(OrnsteinUhlenbeckParams {
            theta: 1.0,
            mu: -1.0,
            sigma: 0.5,
            initial_value: 0.5,
        }),
    );
    let result = run_forecast(&monthly(5_000, 36, 5), &[rate], &Dependence::none()).unwrap();

    let start = result.statistics("RATE", 0).unwrap();
    let late = result.statistics("RATE", 36).unwrap();
    assert_eq!(start.prob_negative, 0.0);
    assert!(late.prob_negative > 0.5);
    assert!(late.mean < start.mean);
}
