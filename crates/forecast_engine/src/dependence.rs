//! Dependence input and shock generator construction.
//!
//! | Method     | Matrix                  | Copula family    | Generator      |
//! |------------|-------------------------|------------------|----------------|
//! | `none`     | ignored                 | ignored          | independent    |
//! | `cholesky` | required                | ignored          | `W = L Z`      |
//! | `copula`   | required for elliptical | default Gaussian | copula + `Φ⁻¹` |
//!
//! A matrix that is not positive semi-definite is projected before factoring
//! and reported as [`ConfigWarning::CorrelationProjected`].

use forecast_models::{
    CholeskyFactor, CopulaFamily, CopulaSampler, CorrelationError, CorrelationMatrix,
    ShockGenerator,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CorrelationMethod;
use crate::error::{ConfigWarning, ValidationError};

/// Optional dependence input shared by both entry points.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependence {
    /// Correlation matrix, one row per variable in input order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<CorrelationMatrix>,
    /// Copula family used with the `copula` method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copula: Option<CopulaFamily>,
}

impl Dependence {
    /// No dependence information.
    pub fn none() -> Self {
        Self::default()
    }

    /// Correlation matrix only.
    pub fn matrix(matrix: CorrelationMatrix) -> Self {
        Self {
            matrix: Some(matrix),
            copula: None,
        }
    }

    /// Copula family with an optional matrix.
    pub fn copula(family: CopulaFamily, matrix: Option<CorrelationMatrix>) -> Self {
        Self {
            matrix,
            copula: Some(family),
        }
    }
}

/// Shock generator plus any warnings raised while building it.
#[derive(Clone, Debug)]
pub struct PreparedDependence {
    /// Generator handed to the runner.
    pub generator: ShockGenerator,
    /// Data-quality warnings.
    pub warnings: Vec<ConfigWarning>,
}

/// Builds the shock generator for `n_variables` under `method`.
///
/// # Errors
///
/// - `MissingCorrelation` when the method or copula family needs a matrix
/// - `Correlation(SizeMismatch)` when the matrix size differs from the variable count
/// - `Copula` for an invalid family parameter
pub fn prepare_dependence(
    method: CorrelationMethod,
    dependence: &Dependence,
    n_variables: usize,
) -> Result<PreparedDependence, ValidationError> {
    let mut warnings = Vec::new();

    let generator = match method {
        CorrelationMethod::None => {
            if dependence.matrix.is_some() || dependence.copula.is_some() {
                debug!("correlation method is none; dependence input ignored");
            }
            ShockGenerator::Independent { dim: n_variables }
        }
        CorrelationMethod::Cholesky => {
            let matrix = dependence
                .matrix
                .as_ref()
                .ok_or(ValidationError::MissingCorrelation { method: "cholesky" })?;
            let factor = factorise(matrix, n_variables, &mut warnings)?;
            ShockGenerator::Cholesky(factor)
        }
        CorrelationMethod::Copula => {
            let family = dependence.copula.unwrap_or_default();
            family.validate()?;
            let factor = if family.requires_matrix() {
                let matrix = dependence
                    .matrix
                    .as_ref()
                    .ok_or(ValidationError::MissingCorrelation {
                        method: family.name(),
                    })?;
                Some(factorise(matrix, n_variables, &mut warnings)?)
            } else {
                None
            };
            ShockGenerator::Copula(CopulaSampler::new(family, factor, n_variables)?)
        }
    };

    debug!(kind = generator.kind(), dim = generator.dim(), "shock generator ready");
    Ok(PreparedDependence {
        generator,
        warnings,
    })
}

fn factorise(
    matrix: &CorrelationMatrix,
    n_variables: usize,
    warnings: &mut Vec<ConfigWarning>,
) -> Result<CholeskyFactor, ValidationError> {
    if matrix.dim() != n_variables {
        return Err(CorrelationError::SizeMismatch {
            expected: n_variables,
            got: matrix.dim(),
        }
        .into());
    }
    let (factor, report) = matrix.prepare()?;
    if let Some(report) = report {
        warn!(
            min_eigenvalue = report.min_eigenvalue,
            max_adjustment = report.max_adjustment,
            "correlation matrix not positive semi-definite; projected to nearest PSD matrix"
        );
        warnings.push(ConfigWarning::CorrelationProjected {
            min_eigenvalue: report.min_eigenvalue,
            max_adjustment: report.max_adjustment,
        });
    }
    Ok(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matrix(rho: f64) -> CorrelationMatrix {
        CorrelationMatrix::new(&[1.0, rho, rho, 1.0], 2).unwrap()
    }

    fn non_psd() -> CorrelationMatrix {
        CorrelationMatrix::from_rows(&[
            vec![1.0, 0.9, 0.9],
            vec![0.9, 1.0, -0.9],
            vec![0.9, -0.9, 1.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_none_ignores_matrix() {
        let prepared =
            prepare_dependence(CorrelationMethod::None, &Dependence::matrix(matrix(0.5)), 2).unwrap();
        assert_eq!(prepared.generator.kind(), "independent");
        assert!(prepared.warnings.is_empty());
    }

    #[test]
    fn test_cholesky_requires_matrix() {
        let result = prepare_dependence(CorrelationMethod::Cholesky, &Dependence::none(), 2);
        assert_eq!(
            result.unwrap_err(),
            ValidationError::MissingCorrelation { method: "cholesky" }
        );
    }

    #[test]
    fn test_matrix_size_must_match() {
        let result = prepare_dependence(CorrelationMethod::Cholesky, &Dependence::matrix(matrix(0.2)), 3);
        assert!(matches!(
            result,
            Err(ValidationError::Correlation(CorrelationError::SizeMismatch {
                expected: 3,
                got: 2
            }))
        ));
    }

    #[test]
    fn test_non_psd_projected_with_warning() {
        let prepared =
            prepare_dependence(CorrelationMethod::Cholesky, &Dependence::matrix(non_psd()), 3).unwrap();
        assert_eq!(prepared.warnings.len(), 1);
        assert!(matches!(
            prepared.warnings[0],
            ConfigWarning::CorrelationProjected { min_eigenvalue, .. } if min_eigenvalue < 0.0
        ));
    }

    #[test]
    fn test_copula_defaults_to_gaussian() {
        let prepared =
            prepare_dependence(CorrelationMethod::Copula, &Dependence::matrix(matrix(0.3)), 2).unwrap();
        assert_eq!(prepared.generator.kind(), "gaussian");

        let missing = prepare_dependence(CorrelationMethod::Copula, &Dependence::none(), 2);
        assert_eq!(
            missing.unwrap_err(),
            ValidationError::MissingCorrelation { method: "gaussian" }
        );
    }

    #[test]
    fn test_archimedean_copula_needs_no_matrix() {
        let dep = Dependence::copula(CopulaFamily::Gumbel { theta: 2.0 }, None);
        let prepared = prepare_dependence(CorrelationMethod::Copula, &dep, 4).unwrap();
        assert_eq!(prepared.generator.kind(), "gumbel");
        assert_eq!(prepared.generator.dim(), 4);
    }

    #[test]
    fn test_invalid_copula_parameter() {
        let dep = Dependence::copula(CopulaFamily::Clayton { theta: -1.0 }, None);
        assert!(matches!(
            prepare_dependence(CorrelationMethod::Copula, &dep, 2),
            Err(ValidationError::Copula(_))
        ));
    }

    #[test]
    fn test_dependence_deserialises() {
        let dep: Dependence = serde_json::from_value(json!({
            "matrix": [[1.0, 0.3], [0.3, 1.0]],
            "copula": {"family": "clayton", "theta": 2.0}
        }))
        .unwrap();
        assert_eq!(dep.matrix.as_ref().map(|m| m.dim()), Some(2));
        assert_eq!(dep.copula, Some(CopulaFamily::Clayton { theta: 2.0 }));
        assert_eq!(serde_json::from_value::<Dependence>(json!({})).unwrap(), Dependence::none());
    }
}
