//! Validation and per-path evaluation of event trees.

use super::{Comparator, EventDefinition, LogicalOperator, ThresholdBreach, Window};
use crate::error::ValidationError;
use crate::variable::CompiledVariable;
use crate::workspace::ScenarioPath;

/// Validated event node with variables resolved to indices.
#[derive(Clone, Debug, PartialEq)]
pub enum EventNode {
    /// Threshold on variable `variable` over periods `from..=by`.
    Threshold {
        /// Variable index.
        variable: usize,
        /// Comparison.
        comparator: Comparator,
        /// Threshold.
        bound: f64,
        /// First inspected period.
        from: usize,
        /// Last inspected period.
        by: usize,
        /// Window kind.
        window: Window,
    },
    /// Every child holds.
    All(Vec<EventNode>),
    /// Some child holds.
    Any(Vec<EventNode>),
    /// Children trigger in order.
    Sequence(Vec<EventNode>),
    /// At least `k` children hold.
    AtLeast {
        /// Required count.
        k: usize,
        /// Child nodes.
        children: Vec<EventNode>,
    },
}

impl EventNode {
    /// First period at or after `start` at which the node holds.
    ///
    /// AND resolves to the latest child trigger, OR to the earliest,
    /// at-least-k to the k-th earliest; a sequence starts each child at its
    /// predecessor's trigger.
    pub fn first_trigger(&self, path: &ScenarioPath<'_>, start: usize) -> Option<usize> {
        match self {
            EventNode::Threshold {
                variable,
                comparator,
                bound,
                from,
                by,
                window,
            } => match window {
                Window::At => (*by >= start && comparator.holds(path.value(*variable, *by), *bound))
                    .then_some(*by),
                Window::Within => ((*from).max(start)..=*by)
                    .find(|&p| comparator.holds(path.value(*variable, p), *bound)),
            },
            EventNode::All(children) => children
                .iter()
                .try_fold(start, |latest, c| c.first_trigger(path, start).map(|t| t.max(latest))),
            EventNode::Any(children) => children.iter().filter_map(|c| c.first_trigger(path, start)).min(),
            EventNode::Sequence(children) => children
                .iter()
                .try_fold(start, |previous, c| c.first_trigger(path, previous)),
            EventNode::AtLeast { k, children } => {
                let mut triggers: Vec<usize> =
                    children.iter().filter_map(|c| c.first_trigger(path, start)).collect();
                if triggers.len() < *k {
                    return None;
                }
                triggers.sort_unstable();
                Some(triggers[*k - 1])
            }
        }
    }

    /// True when the node holds anywhere in the path.
    #[inline]
    pub fn holds(&self, path: &ScenarioPath<'_>) -> bool {
        self.first_trigger(path, 1).is_some()
    }

    /// Latest period the node can inspect.
    pub fn period_bound(&self) -> usize {
        match self {
            EventNode::Threshold { by, .. } => *by,
            EventNode::All(c) | EventNode::Any(c) | EventNode::Sequence(c) => {
                c.iter().map(EventNode::period_bound).max().unwrap_or(0)
            }
            EventNode::AtLeast { children, .. } => {
                children.iter().map(EventNode::period_bound).max().unwrap_or(0)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Root {
    Plain(EventNode),
    Conditional {
        antecedent: EventNode,
        consequent: EventNode,
    },
}

/// Event ready for evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledEvent {
    label: String,
    root: Root,
}

impl CompiledEvent {
    /// Human-readable rendering of the definition.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// True for a conditional definition.
    pub fn is_conditional(&self) -> bool {
        matches!(self.root, Root::Conditional { .. })
    }

    /// Evaluates one scenario.
    ///
    /// Returns `None` when the scenario is excluded because a conditional's
    /// antecedent did not hold.
    #[inline]
    pub fn evaluate(&self, path: &ScenarioPath<'_>) -> Option<bool> {
        match &self.root {
            Root::Plain(node) => Some(node.holds(path)),
            Root::Conditional {
                antecedent,
                consequent,
            } => antecedent.holds(path).then(|| consequent.holds(path)),
        }
    }
}

/// Validates `definition` against the variables and horizon.
///
/// # Errors
///
/// - `UnknownVariable` when a threshold names neither an id nor a code
/// - `PeriodOutOfRange` when a period lies outside `[1, horizon]`
/// - `NonIncreasingSequence` when sequence children's period bounds do not
///   strictly increase
/// - `MalformedEvent` for empty children, an invalid `k`, a non-finite
///   bound, `fromPeriod > byPeriod` or a nested conditional
pub fn compile_event(
    definition: &EventDefinition,
    variables: &[CompiledVariable],
    horizon: usize,
) -> Result<CompiledEvent, ValidationError> {
    let compiler = Compiler { variables, horizon };
    let root = match definition {
        EventDefinition::Conditional {
            antecedent,
            consequent,
        } => Root::Conditional {
            antecedent: compiler.node(antecedent)?,
            consequent: compiler.node(consequent)?,
        },
        other => Root::Plain(compiler.node(other)?),
    };
    Ok(CompiledEvent {
        label: definition.to_string(),
        root,
    })
}

struct Compiler<'a> {
    variables: &'a [CompiledVariable],
    horizon: usize,
}

impl Compiler<'_> {
    fn node(&self, definition: &EventDefinition) -> Result<EventNode, ValidationError> {
        match definition {
            EventDefinition::ThresholdBreach(t) => self.threshold(t),
            EventDefinition::Compound { operator, children } => {
                let children = self.children("compound", children)?;
                Ok(match operator {
                    LogicalOperator::And => EventNode::All(children),
                    LogicalOperator::Or => EventNode::Any(children),
                })
            }
            EventDefinition::Conditional { .. } => Err(ValidationError::MalformedEvent(
                "conditional events are only allowed at the root".to_string(),
            )),
            EventDefinition::Sequence { children } => {
                let children = self.children("sequence", children)?;
                for pair in children.windows(2) {
                    let (previous, next) = (pair[0].period_bound(), pair[1].period_bound());
                    if next <= previous {
                        return Err(ValidationError::NonIncreasingSequence { previous, next });
                    }
                }
                Ok(EventNode::Sequence(children))
            }
            EventDefinition::AtLeastK { k, children } => {
                let children = self.children("at_least_k", children)?;
                if *k == 0 || *k > children.len() {
                    return Err(ValidationError::MalformedEvent(format!(
                        "at_least_k requires 1 <= k <= {}, got {}",
                        children.len(),
                        k
                    )));
                }
                Ok(EventNode::AtLeast { k: *k, children })
            }
        }
    }

    fn children(&self, kind: &str, children: &[EventDefinition]) -> Result<Vec<EventNode>, ValidationError> {
        if children.is_empty() {
            return Err(ValidationError::MalformedEvent(format!(
                "{} event needs at least one child",
                kind
            )));
        }
        children.iter().map(|c| self.node(c)).collect()
    }

    fn threshold(&self, t: &ThresholdBreach) -> Result<EventNode, ValidationError> {
        let variable = self
            .variables
            .iter()
            .position(|v| v.id == t.variable)
            .or_else(|| self.variables.iter().position(|v| v.code == t.variable))
            .ok_or_else(|| ValidationError::UnknownVariable(t.variable.clone()))?;

        for period in [t.from_period, t.by_period] {
            if period == 0 || period > self.horizon {
                return Err(ValidationError::PeriodOutOfRange {
                    period,
                    horizon: self.horizon,
                });
            }
        }
        if t.from_period > t.by_period {
            return Err(ValidationError::MalformedEvent(format!(
                "fromPeriod {} is after byPeriod {}",
                t.from_period, t.by_period
            )));
        }
        if !t.bound.is_finite() {
            return Err(ValidationError::MalformedEvent(format!(
                "threshold bound must be finite, got {}",
                t.bound
            )));
        }

        Ok(EventNode::Threshold {
            variable,
            comparator: t.comparator,
            bound: t.bound,
            from: t.from_period,
            by: t.by_period,
            window: t.window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::TrialWorkspace;
    use forecast_models::processes::DeterministicParams;
    use forecast_models::ProcessConfig;

    fn variables() -> Vec<CompiledVariable> {
        ["a", "b"]
            .iter()
            .map(|id| CompiledVariable {
                id: id.to_string(),
                code: id.to_uppercase(),
                process: ProcessConfig::Deterministic(DeterministicParams::constant(0.0))
                    .compile()
                    .unwrap(),
            })
            .collect()
    }

    /// a: 0, 1, 2, 3, 4   b: 0, 5, 0, 5, 0
    fn workspace() -> TrialWorkspace {
        let mut ws = TrialWorkspace::new(2, 4);
        for p in 0..=4 {
            ws.record(0, p, p as f64);
            ws.record(1, p, if p % 2 == 1 { 5.0 } else { 0.0 });
        }
        ws
    }

    fn gt(var: &str, bound: f64, by: usize) -> EventDefinition {
        EventDefinition::threshold(ThresholdBreach::within(var, Comparator::Greater, bound, by))
    }

    fn compile(def: &EventDefinition) -> CompiledEvent {
        compile_event(def, &variables(), 4).unwrap()
    }

    #[test]
    fn test_threshold_windows() {
        let ws = workspace();
        let path = ws.path(0);
        let within = compile(&gt("a", 2.5, 4));
        assert_eq!(within.evaluate(&path), Some(true));

        let early = compile(&gt("a", 2.5, 2));
        assert_eq!(early.evaluate(&path), Some(false));

        let at = compile(&EventDefinition::threshold(ThresholdBreach::at("B", Comparator::Greater, 1.0, 2)));
        assert_eq!(at.evaluate(&path), Some(false));

        let late_window = EventDefinition::threshold(ThresholdBreach {
            from_period: 2,
            ..ThresholdBreach::within("b", Comparator::Greater, 1.0, 2)
        });
        assert_eq!(compile(&late_window).evaluate(&path), Some(false));
    }

    #[test]
    fn test_trigger_periods() {
        let ws = workspace();
        let path = ws.path(0);
        let node = |def: &EventDefinition| Compiler { variables: &variables(), horizon: 4 }.node(def).unwrap();

        assert_eq!(node(&gt("a", 1.5, 4)).first_trigger(&path, 1), Some(2));
        assert_eq!(node(&gt("b", 1.0, 4)).first_trigger(&path, 2), Some(3));

        let and = node(&EventDefinition::and(vec![gt("a", 2.5, 4), gt("b", 1.0, 4)]));
        assert_eq!(and.first_trigger(&path, 1), Some(3));
        let or = node(&EventDefinition::or(vec![gt("a", 2.5, 4), gt("b", 1.0, 4)]));
        assert_eq!(or.first_trigger(&path, 1), Some(1));

        let k2 = node(&EventDefinition::at_least_k(
            2,
            vec![gt("a", 0.5, 4), gt("a", 3.5, 4), gt("b", 1.0, 4)],
        ));
        assert_eq!(k2.first_trigger(&path, 1), Some(1));
        let k3 = node(&EventDefinition::at_least_k(
            3,
            vec![gt("a", 0.5, 4), gt("a", 3.5, 4), gt("b", 1.0, 4)],
        ));
        assert_eq!(k3.first_trigger(&path, 1), Some(4));
    }

    #[test]
    fn test_sequence_requires_order() {
        let ws = workspace();
        let path = ws.path(0);
        // b > 1 first at 1, then a > 2.5 first at 3.
        let ordered = compile(&EventDefinition::sequence(vec![gt("b", 1.0, 2), gt("a", 2.5, 4)]));
        assert_eq!(ordered.evaluate(&path), Some(true));

        // a < 2 holds only at period 1, before b > 1 triggers inside 2..=3.
        let reversed = EventDefinition::sequence(vec![
            EventDefinition::threshold(ThresholdBreach {
                from_period: 2,
                ..ThresholdBreach::within("b", Comparator::Greater, 1.0, 3)
            }),
            EventDefinition::threshold(ThresholdBreach::within("a", Comparator::Less, 2.0, 4)),
        ]);
        let compiled = compile(&reversed);
        assert_eq!(compiled.evaluate(&path), Some(false));
    }

    #[test]
    fn test_sequence_bounds_must_increase() {
        let def = EventDefinition::sequence(vec![gt("a", 1.0, 3), gt("b", 1.0, 3)]);
        assert_eq!(
            compile_event(&def, &variables(), 4).unwrap_err(),
            ValidationError::NonIncreasingSequence { previous: 3, next: 3 }
        );
    }

    #[test]
    fn test_conditional_excludes_scenarios() {
        let ws = workspace();
        let path = ws.path(0);
        let admitted = compile(&EventDefinition::conditional(gt("a", 3.0, 4), gt("b", 4.0, 4)));
        assert!(admitted.is_conditional());
        assert_eq!(admitted.evaluate(&path), Some(true));

        let excluded = compile(&EventDefinition::conditional(gt("a", 10.0, 4), gt("b", 4.0, 4)));
        assert_eq!(excluded.evaluate(&path), None);
    }

    #[test]
    fn test_validation_errors() {
        let vars = variables();
        assert_eq!(
            compile_event(&gt("zzz", 1.0, 2), &vars, 4).unwrap_err(),
            ValidationError::UnknownVariable("zzz".to_string())
        );
        assert_eq!(
            compile_event(&gt("a", 1.0, 5), &vars, 4).unwrap_err(),
            ValidationError::PeriodOutOfRange { period: 5, horizon: 4 }
        );
        assert!(matches!(
            compile_event(&EventDefinition::and(vec![]), &vars, 4),
            Err(ValidationError::MalformedEvent(_))
        ));
        assert!(matches!(
            compile_event(&EventDefinition::at_least_k(3, vec![gt("a", 1.0, 2)]), &vars, 4),
            Err(ValidationError::MalformedEvent(_))
        ));
        let nested = EventDefinition::and(vec![EventDefinition::conditional(gt("a", 1.0, 2), gt("b", 1.0, 2))]);
        assert!(matches!(
            compile_event(&nested, &vars, 4),
            Err(ValidationError::MalformedEvent(_))
        ));
        let inverted = EventDefinition::threshold(ThresholdBreach {
            from_period: 3,
            ..ThresholdBreach::within("a", Comparator::Greater, 1.0, 2)
        });
        assert!(matches!(
            compile_event(&inverted, &vars, 4),
            Err(ValidationError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_variable_resolved_by_id_then_code() {
        let def = gt("B", 1.0, 2);
        let compiled = compile_event(&def, &variables(), 4).unwrap();
        let ws = workspace();
        assert_eq!(compiled.evaluate(&ws.path(0)), Some(true));
    }
}
