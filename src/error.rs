//! Error types for trueno-linalg operations

use thiserror::Error;

/// Result type for trueno-linalg operations
pub type Result<T> = std::result::Result<T, LinalgError>;

/// Errors that can occur during matrix operations
///
/// Failures are raised immediately and never recovered locally. Exact
/// singularity (`MatrixSingular`) and near-singularity (`MatrixCloseToSingular`)
/// are distinct so callers can tell a zero pivot from a tiny one.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinalgError {
    /// Operand shapes are incompatible for the operation
    #[error("Matrix dimensions do not match")]
    MatrixDimensions,

    /// A zero pivot or zero diagonal was encountered
    #[error("Matrix is singular")]
    MatrixSingular,

    /// The smallest LU pivot is below the near-singularity threshold
    #[error("Matrix is close to singular")]
    MatrixCloseToSingular,

    /// The operation requires a square matrix
    #[error("Matrix must be square")]
    MatrixNotSquare,

    /// Cholesky found a non-positive diagonal residue
    #[error("Matrix is not positive definite")]
    MatrixNotPositiveDefinite,

    /// Cholesky, LDLT, PCG and the eigensolvers work on Symmetric storage only
    #[error("Matrix must be symmetric")]
    MatrixMustBeSymmetric,

    /// SVD requires at least as many rows as columns
    #[error("Matrix must have at least as many rows as columns")]
    MatrixNotHigh,

    /// FFT input must have one (real) or two (real, imaginary) rows
    #[error("Matrix must have one or two rows")]
    MatrixOneOrTwoRows,

    /// A dimension exceeds [`crate::config::MAX_SIZE`]
    #[error("Matrix size limit exceeded: {rows}x{cols}")]
    MatrixSizeLimit {
        /// Requested rows
        rows: usize,
        /// Requested columns
        cols: usize,
    },

    /// Index outside the logical shape or the stored pattern
    #[error("Index out of range: {0}")]
    IndexOutOfRange(String),

    /// Units cannot be converted into each other
    #[error("Inconsistent units: \"{left}\" and \"{right}\"")]
    InconsistentUnits {
        /// Left operand units
        left: String,
        /// Right operand units
        right: String,
    },

    /// Remainder is only defined for a dimensionless divisor
    #[error("Cannot evaluate remainder with a divisor that has units")]
    CannotEvaluateRemainder,

    /// Implicit QL iteration cap reached
    #[error("QL algorithm failed to converge")]
    QlAlgorithmFailed,

    /// SVD diagonalization iteration cap reached
    #[error("No convergence in {iterations} SVD iterations")]
    SvdNoConvergence {
        /// Iteration cap that was exceeded
        iterations: usize,
    },

    /// PCG iteration cap reached
    #[error("The PCG solver failed to converge in {iterations} iterations")]
    PcgNoConvergence {
        /// Iteration cap that was exceeded
        iterations: usize,
    },

    /// PCG search-direction curvature collapsed
    #[error("The matrix is ill-conditioned")]
    IllConditioned,

    /// Invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl LinalgError {
    /// Builds an `IndexOutOfRange` from anything displayable
    pub(crate) fn index(index: impl std::fmt::Display) -> Self {
        Self::IndexOutOfRange(index.to_string())
    }
}
