//! Standard normal distribution functions.
//!
//! Thin wrappers over the `statrs` error function family:
//! - `norm_cdf`: cumulative distribution function Φ(x)
//! - `norm_inv_cdf`: quantile function Φ⁻¹(p)
//! - `norm_pdf`: density φ(x)

use statrs::function::erf::{erfc, erfc_inv};

/// 1 / sqrt(2 * pi)
const FRAC_1_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Smallest probability passed to the quantile function.
///
/// Uniforms produced by copulas are clamped to `[UNIFORM_EPSILON, 1 - UNIFORM_EPSILON]`
/// before inversion so that the resulting shocks stay finite.
pub const UNIFORM_EPSILON: f64 = 1.0e-12;

/// Standard normal cumulative distribution function.
///
/// # Mathematical Definition
/// Φ(x) = (1/2) * erfc(-x / sqrt(2))
///
/// # Examples
/// ```
/// use forecast_models::distributions::norm_cdf;
///
/// assert!((norm_cdf(0.0) - 0.5).abs() < 1e-12);
/// assert!(norm_cdf(-3.0) < 0.01);
/// ```
#[inline]
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Standard normal quantile function.
///
/// The argument is clamped to `[UNIFORM_EPSILON, 1 - UNIFORM_EPSILON]`, so the
/// result is always finite.
///
/// # Mathematical Definition
/// Φ⁻¹(p) = -sqrt(2) * erfc⁻¹(2p)
///
/// # Examples
/// ```
/// use forecast_models::distributions::{norm_cdf, norm_inv_cdf};
///
/// let z = norm_inv_cdf(0.975);
/// assert!((z - 1.959_964).abs() < 1e-5);
/// assert!((norm_cdf(z) - 0.975).abs() < 1e-9);
/// ```
#[inline]
pub fn norm_inv_cdf(p: f64) -> f64 {
    let p = p.clamp(UNIFORM_EPSILON, 1.0 - UNIFORM_EPSILON);
    -std::f64::consts::SQRT_2 * erfc_inv(2.0 * p)
}

/// Standard normal probability density function.
#[inline]
pub fn norm_pdf(x: f64) -> f64 {
    FRAC_1_SQRT_2PI * (-0.5 * x * x).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_norm_cdf_reference_values() {
        assert_abs_diff_eq!(norm_cdf(0.0), 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(norm_cdf(1.0), 0.841_344_746_068_543, epsilon = 1e-9);
        assert_abs_diff_eq!(norm_cdf(-1.644_853_626_951_472), 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_norm_cdf_symmetry() {
        for &x in &[0.1, 0.7, 1.3, 2.9, 4.5] {
            assert_abs_diff_eq!(norm_cdf(x) + norm_cdf(-x), 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_norm_inv_cdf_round_trip() {
        for &p in &[0.001, 0.05, 0.3, 0.5, 0.8, 0.99] {
            assert_abs_diff_eq!(norm_cdf(norm_inv_cdf(p)), p, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_norm_inv_cdf_clamps_extremes() {
        assert!(norm_inv_cdf(0.0).is_finite());
        assert!(norm_inv_cdf(1.0).is_finite());
        assert!(norm_inv_cdf(0.0) < -6.0);
        assert!(norm_inv_cdf(1.0) > 6.0);
    }

    #[test]
    fn test_norm_pdf_peak() {
        assert_abs_diff_eq!(norm_pdf(0.0), FRAC_1_SQRT_2PI, epsilon = 1e-15);
        assert!(norm_pdf(2.0) < norm_pdf(1.0));
    }
}
