//! AVX-512 backend implementation (x86_64 maximum SIMD)
//!
//! 512-bit registers hold eight f64 lanes. The micro-kernel keeps a 2 × 8
//! register tile of C resident across the whole k loop; AVX-512 has 32 vector
//! registers so the tile plus the broadcast operands never spill.
//!
//! # Safety
//!
//! All AVX-512 intrinsics are `unsafe`; callers must verify `avx512f` support.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use super::{KernelBackend, MICRO_KERNEL};

/// AVX-512 backend (512-bit SIMD for x86_64)
pub struct Avx512Backend;

impl KernelBackend for Avx512Backend {
    #[target_feature(enable = "avx512f")]
    unsafe fn dot(a: &[f64], b: &[f64]) -> f64 {
        let len = a.len();
        let mut i = 0;
        let mut acc0 = _mm512_setzero_pd();
        let mut acc1 = _mm512_setzero_pd();
        while i + 16 <= len {
            let va0 = _mm512_loadu_pd(a.as_ptr().add(i));
            let vb0 = _mm512_loadu_pd(b.as_ptr().add(i));
            let va1 = _mm512_loadu_pd(a.as_ptr().add(i + 8));
            let vb1 = _mm512_loadu_pd(b.as_ptr().add(i + 8));
            acc0 = _mm512_fmadd_pd(va0, vb0, acc0);
            acc1 = _mm512_fmadd_pd(va1, vb1, acc1);
            i += 16;
        }
        while i + 8 <= len {
            let va = _mm512_loadu_pd(a.as_ptr().add(i));
            let vb = _mm512_loadu_pd(b.as_ptr().add(i));
            acc0 = _mm512_fmadd_pd(va, vb, acc0);
            i += 8;
        }
        let mut sum = _mm512_reduce_add_pd(_mm512_add_pd(acc0, acc1));
        for j in i..len {
            sum += a[j] * b[j];
        }
        sum
    }

    #[target_feature(enable = "avx512f")]
    unsafe fn sum_abs(a: &[f64]) -> f64 {
        let len = a.len();
        let mut i = 0;
        let mut acc = _mm512_setzero_pd();
        while i + 8 <= len {
            let v = _mm512_loadu_pd(a.as_ptr().add(i));
            acc = _mm512_add_pd(acc, _mm512_abs_pd(v));
            i += 8;
        }
        let mut sum = _mm512_reduce_add_pd(acc);
        for x in &a[i..] {
            sum += x.abs();
        }
        sum
    }

    #[target_feature(enable = "avx512f")]
    unsafe fn sum_sq(a: &[f64]) -> f64 {
        let len = a.len();
        let mut i = 0;
        let mut acc = _mm512_setzero_pd();
        while i + 8 <= len {
            let v = _mm512_loadu_pd(a.as_ptr().add(i));
            acc = _mm512_fmadd_pd(v, v, acc);
            i += 8;
        }
        let mut sum = _mm512_reduce_add_pd(acc);
        for x in &a[i..] {
            sum += x * x;
        }
        sum
    }

    #[target_feature(enable = "avx512f")]
    unsafe fn scale_sum_sq(a: &mut [f64], inv: f64) -> f64 {
        let len = a.len();
        let mut i = 0;
        let vs = _mm512_set1_pd(inv);
        let mut acc = _mm512_setzero_pd();
        while i + 8 <= len {
            let p = a.as_mut_ptr().add(i);
            let v = _mm512_mul_pd(_mm512_loadu_pd(p), vs);
            _mm512_storeu_pd(p, v);
            acc = _mm512_fmadd_pd(v, v, acc);
            i += 8;
        }
        let mut sum = _mm512_reduce_add_pd(acc);
        for x in &mut a[i..] {
            *x *= inv;
            sum += *x * *x;
        }
        sum
    }

    #[target_feature(enable = "avx512f")]
    unsafe fn axpy(x: &[f64], alpha: f64, y: &mut [f64]) {
        let len = x.len();
        let mut i = 0;
        let va = _mm512_set1_pd(alpha);
        while i + 8 <= len {
            let vx = _mm512_loadu_pd(x.as_ptr().add(i));
            let py = y.as_mut_ptr().add(i);
            _mm512_storeu_pd(py, _mm512_fmadd_pd(va, vx, _mm512_loadu_pd(py)));
            i += 8;
        }
        for j in i..len {
            y[j] += alpha * x[j];
        }
    }

    #[target_feature(enable = "avx512f")]
    unsafe fn add(x: &[f64], y: &mut [f64]) {
        let len = x.len();
        let mut i = 0;
        while i + 8 <= len {
            let vx = _mm512_loadu_pd(x.as_ptr().add(i));
            let py = y.as_mut_ptr().add(i);
            _mm512_storeu_pd(py, _mm512_add_pd(_mm512_loadu_pd(py), vx));
            i += 8;
        }
        for j in i..len {
            y[j] += x[j];
        }
    }

    #[target_feature(enable = "avx512f")]
    unsafe fn mul(x: &[f64], y: &[f64], z: &mut [f64]) {
        let len = x.len();
        let mut i = 0;
        while i + 8 <= len {
            let vx = _mm512_loadu_pd(x.as_ptr().add(i));
            let vy = _mm512_loadu_pd(y.as_ptr().add(i));
            _mm512_storeu_pd(z.as_mut_ptr().add(i), _mm512_mul_pd(vx, vy));
            i += 8;
        }
        for j in i..len {
            z[j] = x[j] * y[j];
        }
    }

    #[target_feature(enable = "avx512f")]
    unsafe fn scale(x: &mut [f64], d: f64) {
        let len = x.len();
        let mut i = 0;
        let vd = _mm512_set1_pd(d);
        while i + 8 <= len {
            let p = x.as_mut_ptr().add(i);
            _mm512_storeu_pd(p, _mm512_mul_pd(_mm512_loadu_pd(p), vd));
            i += 8;
        }
        for v in &mut x[i..] {
            *v *= d;
        }
    }

    /// 2 rows × 8 registers of C held across the k loop
    #[target_feature(enable = "avx512f")]
    unsafe fn gemm_64(a: &[f64], lda: usize, b: &[f64], ldb: usize, c: &mut [f64], ldc: usize) {
        const LANES: usize = 8;
        const VECS: usize = MICRO_KERNEL / LANES;
        let pa = a.as_ptr();
        let pb = b.as_ptr();
        let pc = c.as_mut_ptr();
        let mut i = 0;
        while i < MICRO_KERNEL {
            let mut c0 = [_mm512_setzero_pd(); VECS];
            let mut c1 = [_mm512_setzero_pd(); VECS];
            for k in 0..MICRO_KERNEL {
                let va0 = _mm512_set1_pd(*pa.add(i * lda + k));
                let va1 = _mm512_set1_pd(*pa.add((i + 1) * lda + k));
                let rb = pb.add(k * ldb);
                for v in 0..VECS {
                    let vb = _mm512_loadu_pd(rb.add(v * LANES));
                    c0[v] = _mm512_fmadd_pd(va0, vb, c0[v]);
                    c1[v] = _mm512_fmadd_pd(va1, vb, c1[v]);
                }
            }
            let rc0 = pc.add(i * ldc);
            let rc1 = pc.add((i + 1) * ldc);
            for v in 0..VECS {
                _mm512_storeu_pd(rc0.add(v * LANES), c0[v]);
                _mm512_storeu_pd(rc1.add(v * LANES), c1[v]);
            }
            i += 2;
        }
    }
}

#[cfg(all(test, target_arch = "x86_64"))]
mod tests {
    use super::*;
    use crate::backends::scalar::ScalarBackend;

    /// Helper to run AVX-512 test only on CPUs that support it
    fn avx512_test<F>(test_fn: F)
    where
        F: FnOnce(),
    {
        if is_x86_feature_detected!("avx512f") {
            test_fn();
        } else {
            // Skip test on CPUs without AVX-512 support
            println!("Skipping AVX-512 test (CPU does not support avx512f)");
        }
    }

    fn sample(n: usize, shift: f64) -> Vec<f64> {
        (0..n).map(|i| ((i as f64) * 0.61 + shift).cos()).collect()
    }

    #[test]
    fn test_avx512_dot_matches_scalar() {
        avx512_test(|| {
            for n in [0, 5, 8, 15, 16, 33, 257] {
                let a = sample(n, 0.2);
                let b = sample(n, 0.9);
                let simd = unsafe { Avx512Backend::dot(&a, &b) };
                let scalar = unsafe { ScalarBackend::dot(&a, &b) };
                assert!((simd - scalar).abs() < 1e-11, "n = {n}");
            }
        });
    }

    #[test]
    fn test_avx512_scale_sum_sq() {
        avx512_test(|| {
            let mut a: Vec<f64> = (1..=11).map(|i| i as f64).collect();
            let s = unsafe { Avx512Backend::scale_sum_sq(&mut a, 2.0) };
            assert_eq!(a[10], 22.0);
            // 4 · Σ i² for i = 1..=11
            assert_eq!(s, 4.0 * 506.0);
        });
    }

    #[test]
    fn test_avx512_gemm_matches_scalar() {
        avx512_test(|| {
            let n = MICRO_KERNEL;
            let stride = n + 3;
            let a = sample(n * stride, 0.3);
            let b = sample(n * stride, 1.7);
            let mut c_simd = vec![0.0; n * stride];
            let mut c_ref = vec![0.0; n * stride];
            unsafe {
                Avx512Backend::gemm_64(&a, stride, &b, stride, &mut c_simd, stride);
                ScalarBackend::gemm_64(&a, stride, &b, stride, &mut c_ref, stride);
            }
            for i in 0..n {
                for j in 0..n {
                    let k = i * stride + j;
                    assert!((c_simd[k] - c_ref[k]).abs() < 1e-10);
                }
            }
        });
    }
}
