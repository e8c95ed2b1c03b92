//! Safe SIMD primitives over `f64` slices
//!
//! Every function dispatches once per call on [`Backend::select_best`] and
//! falls through to [`ScalarBackend`] on CPUs without AVX2+FMA. Paired slices
//! are truncated to the shorter length, so callers never hand a backend
//! mismatched lengths.

#[cfg(target_arch = "x86_64")]
use crate::backends::{avx2::Avx2Backend, avx512::Avx512Backend};
use crate::backends::{scalar::ScalarBackend, KernelBackend, MICRO_KERNEL};
use crate::Backend;

macro_rules! dispatch {
    ($method:ident($($arg:expr),*)) => {{
        match Backend::select_best() {
            // SAFETY: the backend was selected by runtime feature detection
            #[cfg(target_arch = "x86_64")]
            Backend::AVX512 => unsafe { Avx512Backend::$method($($arg),*) },
            #[cfg(target_arch = "x86_64")]
            Backend::AVX2 => unsafe { Avx2Backend::$method($($arg),*) },
            _ => unsafe { ScalarBackend::$method($($arg),*) },
        }
    }};
}

/// Dot product of the common prefix of `a` and `b`
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    dispatch!(dot(&a[..n], &b[..n]))
}

/// Σ|aᵢ|
pub fn sum_abs(a: &[f64]) -> f64 {
    dispatch!(sum_abs(a))
}

/// Σaᵢ²
pub fn sum_sq(a: &[f64]) -> f64 {
    dispatch!(sum_sq(a))
}

/// Scales `a` by `inv` and returns Σ(aᵢ·inv)²
pub fn scale_sum_sq(a: &mut [f64], inv: f64) -> f64 {
    dispatch!(scale_sum_sq(a, inv))
}

/// Euclidean norm
pub fn norm(a: &[f64]) -> f64 {
    sum_sq(a).sqrt()
}

/// y += alpha·x
pub fn axpy(x: &[f64], alpha: f64, y: &mut [f64]) {
    let n = x.len().min(y.len());
    dispatch!(axpy(&x[..n], alpha, &mut y[..n]))
}

/// y += x
pub fn add(x: &[f64], y: &mut [f64]) {
    let n = x.len().min(y.len());
    dispatch!(add(&x[..n], &mut y[..n]))
}

/// z = x ∘ y
pub fn mul(x: &[f64], y: &[f64], z: &mut [f64]) {
    let n = x.len().min(y.len()).min(z.len());
    dispatch!(mul(&x[..n], &y[..n], &mut z[..n]))
}

/// x *= d
pub fn scale(x: &mut [f64], d: f64) {
    dispatch!(scale(x, d))
}

/// C = A·B for one 64×64 block of strided row-major buffers
///
/// Returns `false` (and leaves `c` untouched) if a buffer is too short for
/// the given strides.
pub fn gemm_64(a: &[f64], lda: usize, b: &[f64], ldb: usize, c: &mut [f64], ldc: usize) -> bool {
    let need = |ld: usize| (MICRO_KERNEL - 1) * ld + MICRO_KERNEL;
    if lda < MICRO_KERNEL
        || ldb < MICRO_KERNEL
        || ldc < MICRO_KERNEL
        || a.len() < need(lda)
        || b.len() < need(ldb)
        || c.len() < need(ldc)
    {
        return false;
    }
    dispatch!(gemm_64(a, lda, b, ldb, c, ldc));
    true
}

/// C = A·B for an n×n block of strided row-major buffers, any n
///
/// Row-axpy order: each row of C accumulates scaled rows of B.
pub fn gemm_small(n: usize, a: &[f64], lda: usize, b: &[f64], ldb: usize, c: &mut [f64], ldc: usize) {
    for i in 0..n {
        let c_row = &mut c[i * ldc..i * ldc + n];
        c_row.fill(0.0);
        for k in 0..n {
            let a_ik = a[i * lda + k];
            if a_ik != 0.0 {
                axpy(&b[k * ldb..k * ldb + n], a_ik, c_row);
            }
        }
    }
}
