//! Binomial confidence intervals.

use crate::config::IntervalMethod;

/// Two-sided 90% standard normal quantile.
pub const Z_90: f64 = 1.645;

/// Standard error `sqrt(p (1 - p) / n)` of a binomial proportion.
#[inline]
pub fn standard_error(p: f64, n: u64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (p * (1.0 - p) / n as f64).sqrt()
}

/// 90% interval for a proportion `p` estimated from `n` trials, clipped to [0, 1].
///
/// With no trials the interval is the whole of [0, 1].
pub fn confidence_interval(p: f64, n: u64, method: IntervalMethod) -> [f64; 2] {
    if n == 0 {
        return [0.0, 1.0];
    }
    match method {
        IntervalMethod::Normal => {
            let half = Z_90 * standard_error(p, n);
            [(p - half).max(0.0), (p + half).min(1.0)]
        }
        IntervalMethod::Wilson => {
            let n = n as f64;
            let z2 = Z_90 * Z_90;
            let denom = 1.0 + z2 / n;
            let centre = (p + z2 / (2.0 * n)) / denom;
            let half = Z_90 / denom * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt();
            [(centre - half).max(0.0), (centre + half).min(1.0)]
        }
    }
}
