//! Trueno-linalg: unit-aware dense and structured linear algebra
//!
//! The numerical engine behind a calculation language whose values carry
//! physical units. It provides two matrix families over the same six storage
//! shapes:
//!
//! 1. [`Matrix`] - every element is a [`RealValue`] with its own unit
//! 2. [`HpMatrix`] - raw `f64` storage with one unit for the whole matrix,
//!    used for large or performance-critical data
//!
//! Both families share the decompositions in [`linalg`]: Crout LU with
//! implicit scaling, skyline Cholesky/LDLT, Householder QR, Golub–Reinsch SVD,
//! symmetric eigensolvers (direct QL and Lanczos), Jacobi-preconditioned CG, a
//! recursive Winograd multiply over a 64×64 SIMD micro-kernel, and a radix-2
//! FFT.
//!
//! # Design Principles
//!
//! - **Structure-aware dispatch**: packed kinds stay packed whenever the
//!   operator cannot fill their implicit zeros
//! - **Runtime dispatch**: the best SIMD backend is detected once per process
//! - **Zero unsafe in public API**: `unsafe` is isolated in [`backends`]
//! - **Typed failures**: every fallible operation returns [`Result`]
//!
//! # Quick Start
//!
//! ```rust
//! use trueno_linalg::{Matrix, RealValue};
//!
//! let a = Matrix::from_rows(&[vec![4.0, 1.0], vec![1.0, 3.0]]).unwrap();
//! let b = a.invert().unwrap();
//! let id = a.product(&b).unwrap();
//!
//! assert!((id.get(0, 0).value - 1.0).abs() < 1e-12);
//! assert!(id.get(0, 1).value.abs() < 1e-12);
//! let det: RealValue = a.determinant().unwrap();
//! assert!((det.value - 11.0).abs() < 1e-12);
//! ```

pub mod backends;
pub mod config;
pub mod error;
pub mod hp;
pub mod linalg;
pub mod matrix;
pub mod parallel;
pub mod pool;
pub mod storage;
pub mod unit;
pub mod value;
pub mod vector;
pub mod vectorized;

use std::sync::OnceLock;

pub use error::{LinalgError, Result};
pub use hp::HpMatrix;
pub use matrix::Matrix;
pub use storage::Kind;
pub use unit::Unit;
pub use value::{BinaryOp, RealValue, Relation};
pub use vector::{HpVector, Vector};

/// SIMD instruction set used by the f64 kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Scalar fallback (no SIMD)
    Scalar,
    /// AVX2 (256-bit with FMA)
    AVX2,
    /// AVX-512 (512-bit)
    AVX512,
}

static BEST_BACKEND: OnceLock<Backend> = OnceLock::new();

impl Backend {
    /// Select the best available backend for the current platform
    ///
    /// Detection runs once; later calls return the cached choice.
    ///
    /// # Examples
    ///
    /// ```
    /// use trueno_linalg::Backend;
    ///
    /// let backend = Backend::select_best();
    /// assert_eq!(backend, Backend::select_best());
    /// ```
    pub fn select_best() -> Self {
        *BEST_BACKEND.get_or_init(|| {
            let backend = detect_backend();
            tracing::debug!(backend = backend.description(), "selected SIMD backend");
            backend
        })
    }

    /// Human-readable backend name
    pub fn description(&self) -> &'static str {
        match self {
            Backend::Scalar => "scalar",
            Backend::AVX2 => "AVX2+FMA (256-bit)",
            Backend::AVX512 => "AVX-512F (512-bit)",
        }
    }

    /// Vector width in f64 lanes
    pub fn lanes(&self) -> usize {
        match self {
            Backend::Scalar => 1,
            Backend::AVX2 => 4,
            Backend::AVX512 => 8,
        }
    }
}

/// Detect best SIMD backend for x86_64 platforms
#[cfg(target_arch = "x86_64")]
fn detect_backend() -> Backend {
    if is_x86_feature_detected!("avx512f") {
        return Backend::AVX512;
    }
    if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
        return Backend::AVX2;
    }
    Backend::Scalar
}

#[cfg(not(target_arch = "x86_64"))]
fn detect_backend() -> Backend {
    Backend::Scalar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection_is_deterministic() {
        let backend1 = Backend::select_best();
        let backend2 = Backend::select_best();
        assert_eq!(backend1, backend2);
    }

    #[test]
    fn test_backend_matches_detection() {
        assert_eq!(Backend::select_best(), detect_backend());
    }

    #[test]
    fn test_backend_description_and_lanes() {
        assert_eq!(Backend::Scalar.description(), "scalar");
        assert_eq!(Backend::AVX2.lanes(), 4);
        assert_eq!(Backend::AVX512.lanes(), 8);
    }

    #[cfg(not(target_arch = "x86_64"))]
    #[test]
    fn test_non_x86_is_scalar() {
        assert_eq!(Backend::select_best(), Backend::Scalar);
    }
}
