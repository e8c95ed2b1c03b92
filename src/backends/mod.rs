//! Backend implementations for different SIMD instruction sets
//!
//! This module contains the f64 kernels used by every numerical algorithm in
//! the crate. All backends implement [`KernelBackend`] so the dispatch in
//! [`crate::vectorized`] can pick one at runtime.
//!
//! # Safety
//!
//! All `unsafe` code is isolated within backend implementations. The public API
//! remains 100% safe.
//!
//! # Backends
//!
//! - `scalar`: Portable baseline implementation (no SIMD)
//! - `avx2`: x86_64 256-bit SIMD with FMA
//! - `avx512`: x86_64 512-bit SIMD

pub mod scalar;

#[cfg(target_arch = "x86_64")]
pub mod avx2;

#[cfg(target_arch = "x86_64")]
pub mod avx512;

/// Edge length of the register-blocked matrix micro-kernel
pub const MICRO_KERNEL: usize = 64;

/// Backend trait defining the f64 kernels
///
/// # Safety
///
/// Implementations may use unsafe SIMD intrinsics. Callers must ensure:
/// - the CPU supports the backend's instruction set
/// - paired slices have the same length
pub trait KernelBackend {
    /// Dot product: sum(a[i] * b[i])
    ///
    /// # Safety
    ///
    /// - `a` and `b` must have the same length
    unsafe fn dot(a: &[f64], b: &[f64]) -> f64;

    /// Sum of absolute values
    ///
    /// # Safety
    ///
    /// - CPU must support the backend's instruction set
    unsafe fn sum_abs(a: &[f64]) -> f64;

    /// Sum of squares
    ///
    /// # Safety
    ///
    /// - CPU must support the backend's instruction set
    unsafe fn sum_sq(a: &[f64]) -> f64;

    /// Scales `a` by `inv` in place and returns the sum of squares of the result
    ///
    /// # Safety
    ///
    /// - CPU must support the backend's instruction set
    unsafe fn scale_sum_sq(a: &mut [f64], inv: f64) -> f64;

    /// y += alpha * x
    ///
    /// # Safety
    ///
    /// - `x` and `y` must have the same length
    unsafe fn axpy(x: &[f64], alpha: f64, y: &mut [f64]);

    /// y += x
    ///
    /// # Safety
    ///
    /// - `x` and `y` must have the same length
    unsafe fn add(x: &[f64], y: &mut [f64]);

    /// z = x * y (element-wise)
    ///
    /// # Safety
    ///
    /// - `x`, `y` and `z` must have the same length
    unsafe fn mul(x: &[f64], y: &[f64], z: &mut [f64]);

    /// x *= d
    ///
    /// # Safety
    ///
    /// - CPU must support the backend's instruction set
    unsafe fn scale(x: &mut [f64], d: f64);

    /// C = A · B for 64×64 blocks addressed through row strides
    ///
    /// # Safety
    ///
    /// - `a`, `b` must hold 64 rows of at least 64 values at strides `lda`, `ldb`
    /// - `c` must hold 64 rows of at least 64 values at stride `ldc`
    unsafe fn gemm_64(a: &[f64], lda: usize, b: &[f64], ldb: usize, c: &mut [f64], ldc: usize);
}
