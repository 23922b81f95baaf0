//! Event definitions and probability estimation.
//!
//! An event is a tree evaluated once per scenario path:
//!
//! - **threshold_breach**: a variable compared with a bound, either at any
//!   period of a window or exactly at its last period
//! - **compound**: AND / OR over children
//! - **conditional**: consequent given antecedent (root only); scenarios
//!   where the antecedent fails leave the denominator
//! - **sequence**: children that must trigger in order
//! - **at_least_k**: at least `k` children hold
//!
//! Definitions are validated and compiled against the variable list before
//! any simulation, then tallied by [`EventTally`] as paths stream past.

mod compile;
mod interval;
mod tally;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use compile::{compile_event, CompiledEvent, EventNode};
pub use interval::{confidence_interval, standard_error, Z_90};
pub use tally::{EventCounts, EventTally, ProbabilityEstimate};

/// Comparison between a simulated value and a bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    /// Strictly greater.
    #[serde(rename = ">")]
    Greater,
    /// Greater or equal.
    #[serde(rename = ">=")]
    GreaterOrEqual,
    /// Strictly less.
    #[serde(rename = "<")]
    Less,
    /// Less or equal.
    #[serde(rename = "<=")]
    LessOrEqual,
}

impl Comparator {
    /// Applies the comparison.
    #[inline]
    pub fn holds(&self, value: f64, bound: f64) -> bool {
        match self {
            Comparator::Greater => value > bound,
            Comparator::GreaterOrEqual => value >= bound,
            Comparator::Less => value < bound,
            Comparator::LessOrEqual => value <= bound,
        }
    }

    /// Operator symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Greater => ">",
            Comparator::GreaterOrEqual => ">=",
            Comparator::Less => "<",
            Comparator::LessOrEqual => "<=",
        }
    }
}

/// Which periods a threshold inspects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Window {
    /// Any period in `[fromPeriod, byPeriod]`.
    #[default]
    Within,
    /// Only `byPeriod`.
    At,
}

/// Boolean operator of a compound event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    /// All children hold.
    And,
    /// Any child holds.
    Or,
}

fn default_from_period() -> usize {
    1
}

/// Threshold breach on one variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdBreach {
    /// Variable id or code.
    pub variable: String,
    /// Comparison applied as `value <comparator> bound`.
    pub comparator: Comparator,
    /// Threshold.
    pub bound: f64,
    /// Last period inspected.
    pub by_period: usize,
    /// First period inspected when the window is `within`.
    #[serde(default = "default_from_period")]
    pub from_period: usize,
    /// Window kind.
    #[serde(default)]
    pub window: Window,
}

impl ThresholdBreach {
    /// `value <comparator> bound` at any period up to `by_period`.
    pub fn within(variable: impl Into<String>, comparator: Comparator, bound: f64, by_period: usize) -> Self {
        Self {
            variable: variable.into(),
            comparator,
            bound,
            by_period,
            from_period: 1,
            window: Window::Within,
        }
    }

    /// `value <comparator> bound` exactly at `period`.
    pub fn at(variable: impl Into<String>, comparator: Comparator, bound: f64, period: usize) -> Self {
        Self {
            window: Window::At,
            ..Self::within(variable, comparator, bound, period)
        }
    }
}

/// Event tree.
///
/// # Examples
///
/// ```rust
/// use forecast_engine::events::EventDefinition;
///
/// let event: EventDefinition = serde_json::from_str(
///     r#"{"type": "threshold_breach", "variable": "REVENUE", "comparator": ">=",
///         "bound": 1500000.0, "byPeriod": 12, "window": "at"}"#,
/// ).unwrap();
/// assert_eq!(event.to_string(), "REVENUE >= 1500000 at 12");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventDefinition {
    /// Single-variable threshold.
    ThresholdBreach(ThresholdBreach),
    /// AND / OR of children.
    Compound {
        /// Boolean operator.
        operator: LogicalOperator,
        /// Child events.
        children: Vec<EventDefinition>,
    },
    /// Consequent given antecedent.
    Conditional {
        /// Condition that admits a scenario into the denominator.
        antecedent: Box<EventDefinition>,
        /// Event counted among admitted scenarios.
        consequent: Box<EventDefinition>,
    },
    /// Children triggering in order.
    Sequence {
        /// Ordered child events.
        children: Vec<EventDefinition>,
    },
    /// At least `k` of `children`.
    AtLeastK {
        /// Required number of true children.
        k: usize,
        /// Child events.
        children: Vec<EventDefinition>,
    },
}

impl EventDefinition {
    /// Threshold leaf.
    pub fn threshold(breach: ThresholdBreach) -> Self {
        EventDefinition::ThresholdBreach(breach)
    }

    /// Conjunction.
    pub fn and(children: Vec<EventDefinition>) -> Self {
        EventDefinition::Compound {
            operator: LogicalOperator::And,
            children,
        }
    }

    /// Disjunction.
    pub fn or(children: Vec<EventDefinition>) -> Self {
        EventDefinition::Compound {
            operator: LogicalOperator::Or,
            children,
        }
    }

    /// `consequent` given `antecedent`.
    pub fn conditional(antecedent: EventDefinition, consequent: EventDefinition) -> Self {
        EventDefinition::Conditional {
            antecedent: Box::new(antecedent),
            consequent: Box::new(consequent),
        }
    }

    /// Ordered sequence.
    pub fn sequence(children: Vec<EventDefinition>) -> Self {
        EventDefinition::Sequence { children }
    }

    /// k-of-n.
    pub fn at_least_k(k: usize, children: Vec<EventDefinition>) -> Self {
        EventDefinition::AtLeastK { k, children }
    }
}

fn write_children(f: &mut fmt::Formatter<'_>, children: &[EventDefinition], sep: &str) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", child)?;
    }
    Ok(())
}

impl fmt::Display for EventDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventDefinition::ThresholdBreach(t) => match t.window {
                Window::At => write!(f, "{} {} {} at {}", t.variable, t.comparator.symbol(), t.bound, t.by_period),
                Window::Within => write!(
                    f,
                    "{} {} {} within {}..={}",
                    t.variable,
                    t.comparator.symbol(),
                    t.bound,
                    t.from_period,
                    t.by_period
                ),
            },
            EventDefinition::Compound { operator, children } => {
                f.write_str("(")?;
                let sep = match operator {
                    LogicalOperator::And => " AND ",
                    LogicalOperator::Or => " OR ",
                };
                write_children(f, children, sep)?;
                f.write_str(")")
            }
            EventDefinition::Conditional {
                antecedent,
                consequent,
            } => write!(f, "({} | {})", consequent, antecedent),
            EventDefinition::Sequence { children } => {
                f.write_str("(")?;
                write_children(f, children, " THEN ")?;
                f.write_str(")")
            }
            EventDefinition::AtLeastK { k, children } => {
                write!(f, "at_least_{}(", k)?;
                write_children(f, children, ", ")?;
                f.write_str(")")
            }
        }
    }
}
