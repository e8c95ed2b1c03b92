//! Scalar (non-SIMD) backend implementation
//!
//! This is the portable baseline implementation that works on all platforms.
//! It is also the reference the SIMD backends are tested against.

use super::{KernelBackend, MICRO_KERNEL};

/// Scalar backend (portable, no SIMD)
pub struct ScalarBackend;

impl KernelBackend for ScalarBackend {
    // SAFETY: This function is safe because:
    // 1. All slice accesses are bounds-checked by Rust iterator/indexing
    // 2. No raw pointer arithmetic is performed
    // 3. Marked unsafe only to match KernelBackend trait interface
    unsafe fn dot(a: &[f64], b: &[f64]) -> f64 {
        // Four partial sums keep the dependency chain short
        let mut s = [0.0; 4];
        let chunks = a.len() / 4;
        for c in 0..chunks {
            let i = c * 4;
            s[0] += a[i] * b[i];
            s[1] += a[i + 1] * b[i + 1];
            s[2] += a[i + 2] * b[i + 2];
            s[3] += a[i + 3] * b[i + 3];
        }
        let mut sum = (s[0] + s[1]) + (s[2] + s[3]);
        for i in chunks * 4..a.len() {
            sum += a[i] * b[i];
        }
        sum
    }

    unsafe fn sum_abs(a: &[f64]) -> f64 {
        a.iter().map(|x| x.abs()).sum()
    }

    unsafe fn sum_sq(a: &[f64]) -> f64 {
        a.iter().map(|x| x * x).sum()
    }

    unsafe fn scale_sum_sq(a: &mut [f64], inv: f64) -> f64 {
        let mut sum = 0.0;
        for x in a.iter_mut() {
            *x *= inv;
            sum += *x * *x;
        }
        sum
    }

    unsafe fn axpy(x: &[f64], alpha: f64, y: &mut [f64]) {
        for (yi, xi) in y.iter_mut().zip(x) {
            *yi += alpha * xi;
        }
    }

    unsafe fn add(x: &[f64], y: &mut [f64]) {
        for (yi, xi) in y.iter_mut().zip(x) {
            *yi += xi;
        }
    }

    unsafe fn mul(x: &[f64], y: &[f64], z: &mut [f64]) {
        for ((zi, xi), yi) in z.iter_mut().zip(x).zip(y) {
            *zi = xi * yi;
        }
    }

    unsafe fn scale(x: &mut [f64], d: f64) {
        for xi in x.iter_mut() {
            *xi *= d;
        }
    }

    unsafe fn gemm_64(a: &[f64], lda: usize, b: &[f64], ldb: usize, c: &mut [f64], ldc: usize) {
        for i in 0..MICRO_KERNEL {
            let c_row = &mut c[i * ldc..i * ldc + MICRO_KERNEL];
            c_row.fill(0.0);
            for k in 0..MICRO_KERNEL {
                let a_ik = a[i * lda + k];
                if a_ik == 0.0 {
                    continue;
                }
                let b_row = &b[k * ldb..k * ldb + MICRO_KERNEL];
                for (cj, bj) in c_row.iter_mut().zip(b_row) {
                    *cj += a_ik * bj;
                }
            }
        }
    }
}
