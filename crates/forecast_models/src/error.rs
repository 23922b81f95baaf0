//! Error types for process validation and dependence construction.
//!
//! This module provides:
//! - `ProcessError`: invalid or missing stochastic process parameters
//! - `CorrelationError`: malformed correlation matrices
//! - `CopulaError`: invalid copula family parameters

use thiserror::Error;

/// Process parameter validation errors.
///
/// # Examples
/// ```
/// use forecast_models::ProcessError;
///
/// let err = ProcessError::InvalidParameter {
///     process: "gbm",
///     name: "volatility",
///     reason: "must be non-negative, got -0.1".to_string(),
/// };
/// assert!(err.to_string().contains("volatility"));
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProcessError {
    /// A parameter is outside its admissible range.
    #[error("Invalid {process} parameter '{name}': {reason}")]
    InvalidParameter {
        /// Process family tag
        process: &'static str,
        /// Parameter name
        name: &'static str,
        /// Description of the violation
        reason: String,
    },

    /// A distribution required by the process could not be constructed.
    #[error("Invalid {process} distribution: {reason}")]
    Distribution {
        /// Process family tag
        process: &'static str,
        /// Underlying failure
        reason: String,
    },
}

/// Correlation matrix errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CorrelationError {
    /// Matrix is empty.
    #[error("Correlation matrix is empty")]
    Empty,

    /// A row length does not match the matrix dimension.
    #[error("Correlation matrix row {row} has {got} entries, expected {expected}")]
    InvalidDimensions {
        /// Row index
        row: usize,
        /// Expected row length
        expected: usize,
        /// Actual row length
        got: usize,
    },

    /// Matrix size does not match the number of variables.
    #[error("Correlation matrix is {got}x{got}, expected {expected}x{expected}")]
    SizeMismatch {
        /// Number of variables
        expected: usize,
        /// Matrix dimension
        got: usize,
    },

    /// Diagonal element differs from 1.0.
    #[error("Diagonal element at index {index} is {value}, expected 1.0")]
    InvalidDiagonal {
        /// Diagonal index
        index: usize,
        /// Offending value
        value: f64,
    },

    /// Matrix is not symmetric.
    #[error("Matrix is not symmetric at ({i}, {j})")]
    NotSymmetric {
        /// Row index
        i: usize,
        /// Column index
        j: usize,
    },

    /// Correlation entry outside [-1, 1] or not finite.
    #[error("Correlation at ({i}, {j}) is {value}, must be in [-1, 1]")]
    OutOfRange {
        /// Row index
        i: usize,
        /// Column index
        j: usize,
        /// Offending value
        value: f64,
    },

    /// Cholesky factorisation failed even after projection.
    #[error("Correlation matrix is not positive definite")]
    NotPositiveDefinite,
}

/// Copula family errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CopulaError {
    /// Family parameter outside its admissible range.
    #[error("Invalid {family} copula parameter: {reason}")]
    InvalidParameter {
        /// Copula family name
        family: &'static str,
        /// Description of the violation
        reason: String,
    },

    /// The family needs a correlation matrix and none was supplied.
    #[error("The {family} copula requires a correlation matrix")]
    MissingMatrix {
        /// Copula family name
        family: &'static str,
    },

    /// Underlying correlation failure.
    #[error(transparent)]
    Correlation(#[from] CorrelationError),
}
