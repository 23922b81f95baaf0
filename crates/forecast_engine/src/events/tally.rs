//! Streaming event counts.

use serde::{Deserialize, Serialize};

use super::compile::CompiledEvent;
use super::interval::{confidence_interval, standard_error};
use crate::config::IntervalMethod;
use crate::runner::PathObserver;
use crate::workspace::ScenarioPath;

/// Probability with its 90% confidence interval.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbabilityEstimate {
    /// Point estimate.
    pub mean: f64,
    /// `[low, high]`, clipped to [0, 1].
    pub ci90: [f64; 2],
}

/// Counts for one event definition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventCounts {
    /// Scenarios where the event held.
    pub true_count: u64,
    /// Scenarios in the denominator.
    pub evaluated: u64,
    /// Scenarios observed, including excluded ones.
    pub observed: u64,
}

impl EventCounts {
    /// `true_count / evaluated`, or 0 when nothing was evaluated.
    pub fn probability(&self) -> f64 {
        if self.evaluated == 0 {
            0.0
        } else {
            self.true_count as f64 / self.evaluated as f64
        }
    }

    /// Binomial standard error of [`probability`](Self::probability).
    pub fn standard_error(&self) -> f64 {
        standard_error(self.probability(), self.evaluated)
    }

    /// Point estimate and interval.
    pub fn estimate(&self, method: IntervalMethod) -> ProbabilityEstimate {
        let mean = self.probability();
        ProbabilityEstimate {
            mean,
            ci90: confidence_interval(mean, self.evaluated, method),
        }
    }

    fn merge(&mut self, other: &EventCounts) {
        self.true_count += other.true_count;
        self.evaluated += other.evaluated;
        self.observed += other.observed;
    }
}

/// Observer tallying several event definitions over the same paths.
#[derive(Clone, Debug)]
pub struct EventTally<'a> {
    events: &'a [CompiledEvent],
    counts: Vec<EventCounts>,
}

impl<'a> EventTally<'a> {
    /// Empty tally for `events`.
    pub fn new(events: &'a [CompiledEvent]) -> Self {
        Self {
            events,
            counts: vec![EventCounts::default(); events.len()],
        }
    }

    /// Counts in definition order.
    pub fn counts(&self) -> &[EventCounts] {
        &self.counts
    }

    /// Consumes the tally, returning counts in definition order.
    pub fn into_counts(self) -> Vec<EventCounts> {
        self.counts
    }
}

impl PathObserver for EventTally<'_> {
    #[inline]
    fn observe(&mut self, path: &ScenarioPath<'_>) {
        for (event, counts) in self.events.iter().zip(self.counts.iter_mut()) {
            counts.observed += 1;
            if let Some(outcome) = event.evaluate(path) {
                counts.evaluated += 1;
                counts.true_count += u64::from(outcome);
            }
        }
    }

    fn merge(&mut self, other: Self) {
        for (counts, other) in self.counts.iter_mut().zip(&other.counts) {
            counts.merge(other);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{compile_event, Comparator, EventDefinition, ThresholdBreach};
    use crate::variable::CompiledVariable;
    use crate::workspace::TrialWorkspace;
    use forecast_models::processes::DeterministicParams;
    use forecast_models::ProcessConfig;

    fn variable() -> Vec<CompiledVariable> {
        vec![CompiledVariable {
            id: "x".to_string(),
            code: "X".to_string(),
            process: ProcessConfig::Deterministic(DeterministicParams::constant(0.0))
                .compile()
                .unwrap(),
        }]
    }

    fn observe(tally: &mut EventTally<'_>, values: &[f64]) {
        let mut ws = TrialWorkspace::new(1, 1);
        for &v in values {
            ws.record(0, 1, v);
            tally.observe(&ws.path(0));
        }
    }

    #[test]
    fn test_counts_and_merge() {
        let vars = variable();
        let events = vec![
            compile_event(
                &EventDefinition::threshold(ThresholdBreach::at("x", Comparator::Greater, 0.0, 1)),
                &vars,
                1,
            )
            .unwrap(),
            compile_event(
                &EventDefinition::conditional(
                    EventDefinition::threshold(ThresholdBreach::at("x", Comparator::Greater, 1.0, 1)),
                    EventDefinition::threshold(ThresholdBreach::at("x", Comparator::Greater, 2.0, 1)),
                ),
                &vars,
                1,
            )
            .unwrap(),
        ];

        let mut left = EventTally::new(&events);
        let mut right = EventTally::new(&events);
        observe(&mut left, &[-1.0, 0.5, 1.5]);
        observe(&mut right, &[2.5, 3.0]);
        left.merge(right);

        let counts = left.into_counts();
        assert_eq!(
            counts[0],
            EventCounts {
                true_count: 4,
                evaluated: 5,
                observed: 5
            }
        );
        assert_eq!(
            counts[1],
            EventCounts {
                true_count: 2,
                evaluated: 3,
                observed: 5
            }
        );
        assert_eq!(counts[0].probability(), 0.8);
    }

    #[test]
    fn test_nothing_evaluated() {
        let counts = EventCounts {
            true_count: 0,
            evaluated: 0,
            observed: 1_000,
        };
        let estimate = counts.estimate(IntervalMethod::Normal);
        assert_eq!(estimate.mean, 0.0);
        assert_eq!(estimate.ci90, [0.0, 1.0]);
        assert_eq!(counts.standard_error(), 0.0);
    }

    #[test]
    fn test_estimate_serialises() {
        let estimate = EventCounts {
            true_count: 250,
            evaluated: 1_000,
            observed: 1_000,
        }
        .estimate(IntervalMethod::Normal);
        let json = serde_json::to_value(estimate).unwrap();
        assert_eq!(json["mean"], 0.25);
        assert!(json["ci90"].as_array().is_some_and(|a| a.len() == 2));
    }
}
