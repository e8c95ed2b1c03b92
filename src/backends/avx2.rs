//! AVX2 backend implementation (x86_64 advanced SIMD)
//!
//! This backend uses AVX2 intrinsics for 256-bit SIMD operations with FMA,
//! four f64 lanes per register. It is selected when AVX-512F is missing but
//! both `avx2` and `fma` are detected.
//!
//! # Safety
//!
//! All AVX2 intrinsics are marked `unsafe` by Rust. This module carefully isolates
//! all unsafe code and verifies correctness through comprehensive testing.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use super::{KernelBackend, MICRO_KERNEL};

/// AVX2 backend (256-bit SIMD for x86_64)
pub struct Avx2Backend;

#[inline]
#[target_feature(enable = "avx2")]
unsafe fn hsum(v: __m256d) -> f64 {
    let lo = _mm256_castpd256_pd128(v);
    let hi = _mm256_extractf128_pd(v, 1);
    let pair = _mm_add_pd(lo, hi);
    let high = _mm_unpackhi_pd(pair, pair);
    _mm_cvtsd_f64(_mm_add_sd(pair, high))
}

impl KernelBackend for Avx2Backend {
    #[target_feature(enable = "avx2,fma")]
    unsafe fn dot(a: &[f64], b: &[f64]) -> f64 {
        let len = a.len();
        let mut i = 0;
        let mut acc0 = _mm256_setzero_pd();
        let mut acc1 = _mm256_setzero_pd();

        // Two accumulators hide the FMA latency
        while i + 8 <= len {
            let va0 = _mm256_loadu_pd(a.as_ptr().add(i));
            let vb0 = _mm256_loadu_pd(b.as_ptr().add(i));
            let va1 = _mm256_loadu_pd(a.as_ptr().add(i + 4));
            let vb1 = _mm256_loadu_pd(b.as_ptr().add(i + 4));
            acc0 = _mm256_fmadd_pd(va0, vb0, acc0);
            acc1 = _mm256_fmadd_pd(va1, vb1, acc1);
            i += 8;
        }
        while i + 4 <= len {
            let va = _mm256_loadu_pd(a.as_ptr().add(i));
            let vb = _mm256_loadu_pd(b.as_ptr().add(i));
            acc0 = _mm256_fmadd_pd(va, vb, acc0);
            i += 4;
        }

        let mut sum = hsum(_mm256_add_pd(acc0, acc1));

        // Handle remaining elements with scalar code
        for j in i..len {
            sum += a[j] * b[j];
        }
        sum
    }

    #[target_feature(enable = "avx2")]
    unsafe fn sum_abs(a: &[f64]) -> f64 {
        let len = a.len();
        let mut i = 0;
        let sign = _mm256_set1_pd(-0.0);
        let mut acc = _mm256_setzero_pd();
        while i + 4 <= len {
            let v = _mm256_loadu_pd(a.as_ptr().add(i));
            acc = _mm256_add_pd(acc, _mm256_andnot_pd(sign, v));
            i += 4;
        }
        let mut sum = hsum(acc);
        for x in &a[i..] {
            sum += x.abs();
        }
        sum
    }

    #[target_feature(enable = "avx2,fma")]
    unsafe fn sum_sq(a: &[f64]) -> f64 {
        let len = a.len();
        let mut i = 0;
        let mut acc = _mm256_setzero_pd();
        while i + 4 <= len {
            let v = _mm256_loadu_pd(a.as_ptr().add(i));
            acc = _mm256_fmadd_pd(v, v, acc);
            i += 4;
        }
        let mut sum = hsum(acc);
        for x in &a[i..] {
            sum += x * x;
        }
        sum
    }

    #[target_feature(enable = "avx2,fma")]
    unsafe fn scale_sum_sq(a: &mut [f64], inv: f64) -> f64 {
        let len = a.len();
        let mut i = 0;
        let vs = _mm256_set1_pd(inv);
        let mut acc = _mm256_setzero_pd();
        while i + 4 <= len {
            let p = a.as_mut_ptr().add(i);
            let v = _mm256_mul_pd(_mm256_loadu_pd(p), vs);
            _mm256_storeu_pd(p, v);
            acc = _mm256_fmadd_pd(v, v, acc);
            i += 4;
        }
        let mut sum = hsum(acc);
        for x in &mut a[i..] {
            *x *= inv;
            sum += *x * *x;
        }
        sum
    }

    #[target_feature(enable = "avx2,fma")]
    unsafe fn axpy(x: &[f64], alpha: f64, y: &mut [f64]) {
        let len = x.len();
        let mut i = 0;
        let va = _mm256_set1_pd(alpha);
        while i + 4 <= len {
            let vx = _mm256_loadu_pd(x.as_ptr().add(i));
            let py = y.as_mut_ptr().add(i);
            _mm256_storeu_pd(py, _mm256_fmadd_pd(va, vx, _mm256_loadu_pd(py)));
            i += 4;
        }
        for j in i..len {
            y[j] += alpha * x[j];
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn add(x: &[f64], y: &mut [f64]) {
        let len = x.len();
        let mut i = 0;
        while i + 4 <= len {
            let vx = _mm256_loadu_pd(x.as_ptr().add(i));
            let py = y.as_mut_ptr().add(i);
            _mm256_storeu_pd(py, _mm256_add_pd(_mm256_loadu_pd(py), vx));
            i += 4;
        }
        for j in i..len {
            y[j] += x[j];
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn mul(x: &[f64], y: &[f64], z: &mut [f64]) {
        let len = x.len();
        let mut i = 0;
        while i + 4 <= len {
            let vx = _mm256_loadu_pd(x.as_ptr().add(i));
            let vy = _mm256_loadu_pd(y.as_ptr().add(i));
            _mm256_storeu_pd(z.as_mut_ptr().add(i), _mm256_mul_pd(vx, vy));
            i += 4;
        }
        for j in i..len {
            z[j] = x[j] * y[j];
        }
    }

    #[target_feature(enable = "avx2")]
    unsafe fn scale(x: &mut [f64], d: f64) {
        let len = x.len();
        let mut i = 0;
        let vd = _mm256_set1_pd(d);
        while i + 4 <= len {
            let p = x.as_mut_ptr().add(i);
            _mm256_storeu_pd(p, _mm256_mul_pd(_mm256_loadu_pd(p), vd));
            i += 4;
        }
        for v in &mut x[i..] {
            *v *= d;
        }
    }

    /// 2 rows × 16 registers of C per step; each B row is loaded once per row pair
    #[target_feature(enable = "avx2,fma")]
    unsafe fn gemm_64(a: &[f64], lda: usize, b: &[f64], ldb: usize, c: &mut [f64], ldc: usize) {
        const LANES: usize = 4;
        const VECS: usize = MICRO_KERNEL / LANES;
        let pa = a.as_ptr();
        let pb = b.as_ptr();
        let pc = c.as_mut_ptr();
        let mut i = 0;
        while i < MICRO_KERNEL {
            let mut c0 = [_mm256_setzero_pd(); VECS];
            let mut c1 = [_mm256_setzero_pd(); VECS];
            for k in 0..MICRO_KERNEL {
                let va0 = _mm256_set1_pd(*pa.add(i * lda + k));
                let va1 = _mm256_set1_pd(*pa.add((i + 1) * lda + k));
                let rb = pb.add(k * ldb);
                for v in 0..VECS {
                    let vb = _mm256_loadu_pd(rb.add(v * LANES));
                    c0[v] = _mm256_fmadd_pd(va0, vb, c0[v]);
                    c1[v] = _mm256_fmadd_pd(va1, vb, c1[v]);
                }
            }
            let rc0 = pc.add(i * ldc);
            let rc1 = pc.add((i + 1) * ldc);
            for v in 0..VECS {
                _mm256_storeu_pd(rc0.add(v * LANES), c0[v]);
                _mm256_storeu_pd(rc1.add(v * LANES), c1[v]);
            }
            i += 2;
        }
    }
}
