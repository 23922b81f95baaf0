//! Result rendering for the terminal and output files.

use std::fmt::Write as _;
use std::str::FromStr;

use forecast_engine::{EventDefinition, EventProbabilityResult, ForecastResult};
use serde::Serialize;

use crate::{CliError, Result};

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
}

impl FromStr for OutputFormat {
    type Err = CliError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            other => Err(CliError::InvalidArgument(format!(
                "Unknown format: {}. Supported: json, table",
                other
            ))),
        }
    }
}

/// Serialises `value` as JSON.
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

/// Renders per-period statistics as a table.
pub fn forecast_table(result: &ForecastResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:>6} {:>14} {:>14} {:>14} {:>14} {:>8}",
        "Variable", "Period", "Mean", "P05", "P50", "P95", "P(<0)"
    );
    let _ = writeln!(out, "{}", "-".repeat(90));
    for s in &result.period_statistics {
        let _ = writeln!(
            out,
            "{:<12} {:>6} {:>14.4} {:>14.4} {:>14.4} {:>14.4} {:>8.4}",
            s.variable_code, s.period, s.mean, s.percentiles.p05, s.median, s.percentiles.p95, s.prob_negative
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "scenarios: {}  seed: {}  time: {} ms",
        result.scenario_count, result.seed, result.compute_time_ms
    );
    if let Some(comparison) = &result.model_comparison {
        let _ = writeln!(
            out,
            "comparison ({}): max relative mean deviation {:.4}",
            comparison.description, comparison.max_relative_mean_deviation
        );
    }
    write_warnings(&mut out, result.warnings.iter().map(ToString::to_string));
    out
}

/// Renders event probabilities as a table, one row per definition.
pub fn event_table(events: &[EventDefinition], results: &[EventProbabilityResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<48} {:>10} {:>21} {:>10}",
        "Event", "P", "90% CI", "Evaluated"
    );
    let _ = writeln!(out, "{}", "-".repeat(92));
    for (event, r) in events.iter().zip(results) {
        let [low, high] = r.probability.ci90;
        let _ = writeln!(
            out,
            "{:<48} {:>10.4} {:>21} {:>10}",
            truncate(&event.to_string(), 48),
            r.probability.mean,
            format!("[{:.4}, {:.4}]", low, high),
            r.evaluated_count
        );
        if let Some(c) = &r.model_comparison {
            let _ = writeln!(
                out,
                "  {}: {:.4} -> {:.4} (delta {:+.4}, se {:.4}{})",
                c.description,
                c.baseline,
                c.alternate,
                c.delta,
                c.standard_error,
                if c.sensitive { ", sensitive" } else { "" }
            );
        }
    }
    if let Some(first) = results.first() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "scenarios: {}  seed: {}  time: {} ms",
            first.scenario_count, first.seed, first.compute_time_ms
        );
    }
    let mut warnings: Vec<String> = Vec::new();
    for r in results {
        for w in &r.warnings {
            let w = w.to_string();
            if !warnings.contains(&w) {
                warnings.push(w);
            }
        }
    }
    write_warnings(&mut out, warnings.into_iter());
    out
}

fn write_warnings(out: &mut String, warnings: impl Iterator<Item = String>) {
    for w in warnings {
        let _ = writeln!(out, "warning: {}", w);
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(width.saturating_sub(3)).collect();
        t.push_str("...");
        t
    }
}

/// Writes rendered output to `path`, or stdout when no path is given.
pub fn emit(rendered: &str, path: Option<&str>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, rendered)?,
        None => println!("{}", rendered.trim_end()),
    }
    Ok(())
}
