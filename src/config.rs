//! Engine-wide constants and per-algorithm settings
//!
//! Thresholds that appear in several algorithms are kept exactly as the
//! algorithms use them; they are deliberately not unified into one tolerance.
//!
//! # Example
//!
//! ```
//! use trueno_linalg::config::{EigenConfig, PcgConfig};
//!
//! let pcg = PcgConfig { tolerance: 1e-9, ..PcgConfig::default() };
//! assert_eq!(pcg.max_iterations_cap, 1000);
//!
//! let eigen = EigenConfig::default();
//! assert!(eigen.is_direct(150, 3));
//! assert!(!eigen.is_direct(5000, 3));
//! ```

/// Maximum number of rows or columns of any matrix
pub const MAX_SIZE: usize = 1_000_000;

/// Row/column count above which passes fan out over the thread pool
pub const PARALLEL_THRESHOLD: usize = 100;

/// Minimum LU pivot magnitude accepted by LU-based solves
pub const NEAR_SINGULAR_PIVOT: f64 = 1e-15;

/// Magnitude below which a value is logically false
pub const LOGICAL_ZERO: f64 = 1e-12;

/// Iteration cap per eigen/singular value for the implicit QL sweeps
pub const MAX_QL_ITERATIONS: usize = 30;

/// Relative slack used when comparing 1-based fractional indices
pub(crate) const DELTA_PLUS: f64 = 1.0 + 1e-14;
pub(crate) const DELTA_MINUS: f64 = 1.0 - 1e-14;

/// Adjoint switches to cofactor minors below this size when near singular
pub(crate) const ADJOINT_MINORS_LIMIT: usize = 11;

/// Symmetric eigensolver path selection and Lanczos settings
#[derive(Debug, Clone, PartialEq)]
pub struct EigenConfig {
    /// Always solve directly up to this many rows
    pub direct_max_rows: usize,
    /// Solve directly up to this many rows if many eigenpairs are requested
    pub direct_limit_rows: usize,
    /// "Many" means more than `rows / direct_count_divisor`
    pub direct_count_divisor: usize,
    /// Kaniel-Paige relative tolerance
    pub tolerance: f64,
    /// Seed of the Lanczos start vector
    pub seed: u64,
}

impl Default for EigenConfig {
    fn default() -> Self {
        Self {
            direct_max_rows: 200,
            direct_limit_rows: 1000,
            direct_count_divisor: 5,
            tolerance: 1e-12,
            seed: 0,
        }
    }
}

impl EigenConfig {
    /// Whether tridiagonalization + QL is used instead of Lanczos
    pub fn is_direct(&self, rows: usize, count: usize) -> bool {
        rows <= self.direct_max_rows
            || (rows <= self.direct_limit_rows && count > rows / self.direct_count_divisor)
    }

    /// Lanczos Krylov basis size for `count` requested eigenpairs
    pub fn krylov_dimension(&self, rows: usize, count: usize) -> usize {
        rows.min(4 * count + 100)
    }
}

/// Preconditioned conjugate gradient settings
#[derive(Debug, Clone, PartialEq)]
pub struct PcgConfig {
    /// Residual norm tolerance
    pub tolerance: f64,
    /// Upper bound of the `min(2n, cap)` iteration limit
    pub max_iterations_cap: usize,
    /// `|pᵀAp|` below this is treated as curvature collapse
    pub curvature_floor: f64,
}

impl Default for PcgConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations_cap: 1000,
            curvature_floor: 1e-15,
        }
    }
}

impl PcgConfig {
    /// Iteration limit for a system of order `n`
    pub fn max_iterations(&self, n: usize) -> usize {
        (2 * n).min(self.max_iterations_cap)
    }
}

/// Recursive multiply settings
#[derive(Debug, Clone, PartialEq)]
pub struct WinogradConfig {
    /// Block size handled by the register-blocked micro-kernel
    pub kernel_size: usize,
    /// Padded size above which the top level fans out its 7 products
    pub parallel_threshold: usize,
    /// Smallest square product routed through the recursive multiply
    pub min_dimension: usize,
}

impl Default for WinogradConfig {
    fn default() -> Self {
        Self {
            kernel_size: 64,
            parallel_threshold: 256,
            min_dimension: 512,
        }
    }
}
