//! Reproducibility, parallel scheduling and run control.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use forecast_engine::{
    run_forecast, run_forecast_with, CancellationToken, CorrelationMethod, Dependence,
    PercentileMode, RunControl, SimulationConfig, SimulationError, VariableConfig,
};
use forecast_models::processes::{GbmParams, HestonParams, MertonJumpParams, OrnsteinUhlenbeckParams};
use forecast_models::{CorrelationMatrix, ProcessConfig};

fn variables() -> Vec<VariableConfig> {
    vec![
        VariableConfig::new("rev", "REVENUE", ProcessConfig::Gbm(GbmParams::default())),
        VariableConfig::new(
            "rate",
            "RATE",
            ProcessConfig::OrnsteinUhlenbeck(OrnsteinUhlenbeckParams {
                theta: 2.0,
                mu: 0.03,
                sigma: 0.01,
                initial_value: 0.02,
            }),
        ),
        VariableConfig::new("eq", "EQUITY", ProcessConfig::Heston(HestonParams::default())),
        VariableConfig::new("cmd", "COMMODITY", ProcessConfig::MertonJump(MertonJumpParams::default())),
    ]
}

fn correlation() -> Dependence {
    Dependence::matrix(
        CorrelationMatrix::from_rows(&[
            vec![1.0, 0.3, 0.5, 0.2],
            vec![0.3, 1.0, 0.1, 0.0],
            vec![0.5, 0.1, 1.0, 0.4],
            vec![0.2, 0.0, 0.4, 1.0],
        ])
        .unwrap(),
    )
}

fn config(seed: u64) -> SimulationConfig {
    SimulationConfig::builder()
        .n_simulations(2_000)
        .horizon_periods(12)
        .correlation_method(CorrelationMethod::Cholesky)
        .seed(seed)
        .build()
        .unwrap()
}

#[test]
fn test_same_seed_is_bit_identical() {
    let a = run_forecast(&config(42), &variables(), &correlation()).unwrap();
    let b = run_forecast(&config(42), &variables(), &correlation()).unwrap();
    assert_eq!(a.period_statistics, b.period_statistics);
    assert_eq!(a.seed, b.seed);
}

#[test]
fn test_different_seed_differs() {
    let a = run_forecast(&config(1), &variables(), &correlation()).unwrap();
    let b = run_forecast(&config(2), &variables(), &correlation()).unwrap();
    assert_ne!(a.period_statistics, b.period_statistics);
}

#[test]
fn test_thread_count_and_batch_size_do_not_change_results() {
    let single = SimulationConfig {
        worker_threads: Some(1),
        batch_size: 64,
        ..config(42)
    };
    let many = SimulationConfig {
        worker_threads: Some(4),
        batch_size: 64,
        ..config(42)
    };
    let a = run_forecast(&single, &variables(), &correlation()).unwrap();
    let b = run_forecast(&many, &variables(), &correlation()).unwrap();
    assert_eq!(a.period_statistics, b.period_statistics);

    // Moments are merged in a different grouping when batches change size, but
    // exact percentiles and extrema depend only on the sample set.
    let coarse = SimulationConfig {
        batch_size: 1_000,
        ..config(42)
    };
    let c = run_forecast(&coarse, &variables(), &correlation()).unwrap();
    for (x, y) in a.period_statistics.iter().zip(&c.period_statistics) {
        assert_eq!(x.percentiles, y.percentiles);
        assert_eq!((x.min, x.max), (y.min, y.max));
        assert!((x.mean - y.mean).abs() <= 1e-9 * x.mean.abs().max(1.0));
    }
}

#[test]
fn test_missing_seed_is_drawn_and_replayable() {
    let unseeded = SimulationConfig {
        seed: None,
        ..config(0)
    };
    let first = run_forecast(&unseeded, &variables(), &correlation()).unwrap();
    let replay = run_forecast(&config(first.seed), &variables(), &correlation()).unwrap();
    assert_eq!(first.period_statistics, replay.period_statistics);
}

#[test]
fn test_identity_cholesky_matches_independent() {
    let identity = Dependence::matrix(CorrelationMatrix::identity(4));
    let cholesky = run_forecast(&config(9), &variables(), &identity).unwrap();
    let independent = run_forecast(
        &SimulationConfig {
            correlation_method: CorrelationMethod::None,
            ..config(9)
        },
        &variables(),
        &Dependence::none(),
    )
    .unwrap();
    assert_eq!(cholesky.period_statistics, independent.period_statistics);
}

#[test]
fn test_sketch_percentiles_stay_close_to_exact() {
    let exact = run_forecast(&config(3), &variables(), &correlation()).unwrap();
    let sketched = run_forecast(
        &SimulationConfig {
            percentiles: PercentileMode::Sketch { capacity: 200 },
            ..config(3)
        },
        &variables(),
        &correlation(),
    )
    .unwrap();

    for (e, s) in exact.period_statistics.iter().zip(&sketched.period_statistics) {
        assert_eq!(e.mean, s.mean);
        assert!(s.percentiles.is_monotone());
        let spread = (e.percentiles.p99 - e.percentiles.p01).max(1e-12);
        assert!((e.median - s.median).abs() <= 0.05 * spread);
    }
}

#[test]
fn test_cancellation_between_waves() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let reports = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&reports);
    let control = RunControl::new()
        .with_cancellation(token)
        .with_progress(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            trigger.cancel();
        });

    let cfg = SimulationConfig {
        n_simulations: 20_000,
        batch_size: 100,
        worker_threads: Some(1),
        ..config(5)
    };
    let err = run_forecast_with(&cfg, &variables(), &correlation(), &control).unwrap_err();
    match err {
        SimulationError::Cancelled { completed, total } => {
            assert_eq!(total, 20_000);
            assert!(completed > 0 && completed < total);
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(reports.load(Ordering::SeqCst), 1);
}

#[test]
fn test_progress_is_monotone_and_complete() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let control = RunControl::new().with_progress(move |p| {
        if let Ok(mut v) = sink.lock() {
            v.push(p.completed);
        }
    });
    let cfg = SimulationConfig {
        batch_size: 50,
        worker_threads: Some(2),
        ..config(6)
    };
    run_forecast_with(&cfg, &variables(), &correlation(), &control).unwrap();

    let seen = seen.lock().unwrap();
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(seen.last(), Some(&2_000));
}
