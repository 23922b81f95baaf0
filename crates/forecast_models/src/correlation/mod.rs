//! Cross-variable dependence: correlation matrices, copulas and shock generation.
//!
//! ## Mathematical Background
//!
//! Given `n` independent standard normals `Z`, correlated normals follow from
//! the lower triangular Cholesky factor `L` of the correlation matrix `C`:
//!
//! ```text
//! W = L * Z,    C = L * L^T
//! ```
//!
//! A correlation matrix estimated from data, or assembled by hand, is not
//! always positive semi-definite. [`CorrelationMatrix::prepare`] detects that
//! case through the smallest eigenvalue and repairs the matrix by eigenvalue
//! clipping followed by rescaling to a unit diagonal. The repair is reported
//! back as a [`ProjectionReport`] so the caller can surface it as a
//! data-quality warning.
//!
//! ## Usage
//!
//! ```
//! use forecast_models::correlation::CorrelationMatrix;
//!
//! let corr = CorrelationMatrix::from_rows(&[
//!     vec![1.0, 0.5],
//!     vec![0.5, 1.0],
//! ]).unwrap();
//!
//! let (cholesky, report) = corr.prepare().unwrap();
//! assert!(report.is_none());
//!
//! let mut w = [0.0; 2];
//! cholesky.correlate(&[0.5, 0.8], &mut w);
//! assert_eq!(w[0], 0.5);
//! ```

mod copula;
mod injector;

use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::error::CorrelationError;

pub use copula::{CopulaFamily, CopulaSampler};
pub use injector::ShockGenerator;

/// Tolerance on diagonal, symmetry and eigenvalue checks.
pub const PSD_TOLERANCE: f64 = 1.0e-10;

/// Eigenvalue floor applied when projecting to the nearest PSD matrix.
///
/// Kept strictly positive so the repaired matrix always factorises.
pub const EIGENVALUE_FLOOR: f64 = 1.0e-8;

/// Outcome of a nearest-PSD projection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionReport {
    /// Smallest eigenvalue of the matrix before projection.
    pub min_eigenvalue: f64,
    /// Largest absolute change of any entry.
    pub max_adjustment: f64,
}

/// Correlation matrix with validation and Cholesky decomposition.
///
/// A correlation matrix must satisfy:
/// - Square and symmetric
/// - Diagonal elements equal to 1.0
/// - Off-diagonal elements in [-1, 1]
///
/// Positive semi-definiteness is checked separately by [`prepare`](Self::prepare),
/// which repairs rather than rejects.
///
/// Serialised as a nested array of rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct CorrelationMatrix {
    /// Matrix elements in row-major order
    data: Vec<f64>,
    /// Matrix dimension (n x n)
    dim: usize,
}

impl CorrelationMatrix {
    /// Create a new correlation matrix from a flat row-major array.
    ///
    /// # Validation
    ///
    /// - Must have exactly dim*dim elements
    /// - Diagonal elements must be 1.0
    /// - Must be symmetric
    /// - Off-diagonal elements must be finite and in [-1, 1]
    pub fn new(data: &[f64], dim: usize) -> Result<Self, CorrelationError> {
        if dim == 0 {
            return Err(CorrelationError::Empty);
        }
        if data.len() != dim * dim {
            return Err(CorrelationError::InvalidDimensions {
                row: 0,
                expected: dim * dim,
                got: data.len(),
            });
        }

        for i in 0..dim {
            let diag = data[i * dim + i];
            if !diag.is_finite() || (diag - 1.0).abs() > PSD_TOLERANCE {
                return Err(CorrelationError::InvalidDiagonal {
                    index: i,
                    value: diag,
                });
            }
        }

        for i in 0..dim {
            for j in (i + 1)..dim {
                let val_ij = data[i * dim + j];
                let val_ji = data[j * dim + i];

                if !val_ij.is_finite() || !(-1.0..=1.0).contains(&val_ij) {
                    return Err(CorrelationError::OutOfRange {
                        i,
                        j,
                        value: val_ij,
                    });
                }
                if !val_ji.is_finite() || (val_ij - val_ji).abs() > PSD_TOLERANCE {
                    return Err(CorrelationError::NotSymmetric { i, j });
                }
            }
        }

        Ok(Self {
            data: data.to_vec(),
            dim,
        })
    }

    /// Create a correlation matrix from rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, CorrelationError> {
        let dim = rows.len();
        if dim == 0 {
            return Err(CorrelationError::Empty);
        }
        let mut data = Vec::with_capacity(dim * dim);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != dim {
                return Err(CorrelationError::InvalidDimensions {
                    row,
                    expected: dim,
                    got: values.len(),
                });
            }
            data.extend_from_slice(values);
        }
        Self::new(&data, dim)
    }

    /// Create an identity correlation matrix (no correlation).
    pub fn identity(dim: usize) -> Self {
        let mut data = vec![0.0; dim * dim];
        for i in 0..dim {
            data[i * dim + i] = 1.0;
        }
        Self { data, dim }
    }

    /// Matrix dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Element at (i, j).
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.dim + j]
    }

    /// Rows as nested vectors.
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.dim).map(<[f64]>::to_vec).collect()
    }

    /// True when every off-diagonal entry is zero.
    pub fn is_identity(&self) -> bool {
        (0..self.dim).all(|i| (0..self.dim).all(|j| i == j || self.get(i, j) == 0.0))
    }

    /// Smallest eigenvalue.
    pub fn min_eigenvalue(&self) -> f64 {
        let eig = SymmetricEigen::new(self.to_dmatrix());
        eig.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// True when the smallest eigenvalue is at least `-tolerance`.
    pub fn is_positive_semidefinite(&self, tolerance: f64) -> bool {
        self.min_eigenvalue() >= -tolerance
    }

    /// Nearest PSD correlation matrix by eigenvalue clipping.
    ///
    /// Eigenvalues below [`EIGENVALUE_FLOOR`] are raised to it, the matrix is
    /// rebuilt from the clipped spectrum and rescaled to a unit diagonal.
    pub fn nearest_psd(&self) -> (Self, ProjectionReport) {
        let n = self.dim;
        let eig = SymmetricEigen::new(self.to_dmatrix());
        let min_eigenvalue = eig.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);

        let clipped = eig.eigenvalues.map(|v| v.max(EIGENVALUE_FLOOR));
        let rebuilt = &eig.eigenvectors
            * DMatrix::from_diagonal(&clipped)
            * eig.eigenvectors.transpose();

        let mut data = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                data[i * n + j] = if i == j {
                    1.0
                } else {
                    let scale = (rebuilt[(i, i)] * rebuilt[(j, j)]).sqrt();
                    let upper = rebuilt[(i.min(j), i.max(j))] / scale;
                    upper.clamp(-1.0, 1.0)
                };
            }
        }

        let max_adjustment = data
            .iter()
            .zip(&self.data)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);

        (
            Self { data, dim: n },
            ProjectionReport {
                min_eigenvalue,
                max_adjustment,
            },
        )
    }

    /// Compute the Cholesky factor (lower triangular L where C = L * L^T).
    ///
    /// Singular but PSD matrices are accepted: a pivot within
    /// [`PSD_TOLERANCE`] of zero produces a zero column, so perfectly
    /// correlated variables share a driver.
    ///
    /// # Errors
    ///
    /// `CorrelationError::NotPositiveDefinite` when a pivot is materially negative.
    pub fn cholesky(&self) -> Result<CholeskyFactor, CorrelationError> {
        let n = self.dim;
        let mut lower = vec![0.0; n * n];

        for i in 0..n {
            for j in 0..=i {
                let mut sum = 0.0;

                if j == i {
                    for k in 0..j {
                        let l_jk = lower[j * n + k];
                        sum += l_jk * l_jk;
                    }
                    let diag = self.get(j, j) - sum;
                    if diag < -PSD_TOLERANCE {
                        return Err(CorrelationError::NotPositiveDefinite);
                    }
                    lower[j * n + j] = if diag <= PSD_TOLERANCE { 0.0 } else { diag.sqrt() };
                } else {
                    for k in 0..j {
                        sum += lower[i * n + k] * lower[j * n + k];
                    }
                    let l_jj = lower[j * n + j];
                    lower[i * n + j] = if l_jj > 0.0 {
                        (self.get(i, j) - sum) / l_jj
                    } else {
                        0.0
                    };
                }
            }
        }

        Ok(CholeskyFactor { data: lower, dim: n })
    }

    /// Factorises the matrix, projecting it to the nearest PSD matrix first
    /// when its smallest eigenvalue is below `-PSD_TOLERANCE`.
    ///
    /// # Returns
    ///
    /// The Cholesky factor and, when a projection happened, its report.
    pub fn prepare(&self) -> Result<(CholeskyFactor, Option<ProjectionReport>), CorrelationError> {
        if self.is_positive_semidefinite(PSD_TOLERANCE) {
            if let Ok(factor) = self.cholesky() {
                return Ok((factor, None));
            }
        }
        let (repaired, report) = self.nearest_psd();
        let factor = repaired.cholesky()?;
        Ok((factor, Some(report)))
    }

    fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.dim, self.dim, &self.data)
    }
}

impl TryFrom<Vec<Vec<f64>>> for CorrelationMatrix {
    type Error = CorrelationError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_rows(&rows)
    }
}

impl From<CorrelationMatrix> for Vec<Vec<f64>> {
    fn from(matrix: CorrelationMatrix) -> Self {
        matrix.rows()
    }
}

/// Lower triangular Cholesky factor of a correlation matrix.
///
/// Used to transform independent standard normals into correlated normals.
#[derive(Clone, Debug, PartialEq)]
pub struct CholeskyFactor {
    /// Lower triangular matrix elements (row-major)
    data: Vec<f64>,
    /// Matrix dimension
    dim: usize,
}

impl CholeskyFactor {
    /// Identity factor (independent shocks).
    pub fn identity(dim: usize) -> Self {
        let mut data = vec![0.0; dim * dim];
        for i in 0..dim {
            data[i * dim + i] = 1.0;
        }
        Self { data, dim }
    }

    /// Matrix dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Element at (i, j); zero above the diagonal.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        if j > i {
            0.0
        } else {
            self.data[i * self.dim + j]
        }
    }

    /// Computes `out = L * z` without allocating.
    ///
    /// # Panics
    ///
    /// Panics if `z` or `out` is shorter than `self.dim()`.
    #[inline]
    pub fn correlate(&self, z: &[f64], out: &mut [f64]) {
        let n = self.dim;
        assert!(
            z.len() >= n && out.len() >= n,
            "Input length {} / output length {} is less than matrix dimension {}",
            z.len(),
            out.len(),
            n
        );

        for i in 0..n {
            let row = &self.data[i * n..i * n + i + 1];
            out[i] = row.iter().zip(&z[..=i]).map(|(l, x)| l * x).sum();
        }
    }

    /// Reconstructs `L * L^T` entry (i, j).
    pub fn implied_correlation(&self, i: usize, j: usize) -> f64 {
        (0..=i.min(j)).map(|k| self.get(i, k) * self.get(j, k)).sum()
    }
}
