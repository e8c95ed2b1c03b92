//! Recursive 7-multiply (Winograd form) over a zero-padded power-of-two buffer
//!
//! Operands are read through strided [`View`]s, so splitting into quadrants
//! copies nothing. Each level writes its product into a contiguous buffer
//! and every temporary is a [`PooledBuffer`](crate::pool::PooledBuffer).
//! Blocks of exactly the micro-kernel size go to [`vectorized::gemm_64`];
//! smaller blocks use [`vectorized::gemm_small`].

use tracing::{debug, instrument};

use crate::backends::MICRO_KERNEL;
use crate::config::WinogradConfig;
use crate::parallel;
use crate::pool::BufferPool;
use crate::vectorized;

/// Read-only strided window into a row-major buffer
#[derive(Clone, Copy)]
struct View<'a> {
    data: &'a [f64],
    offset: usize,
    stride: usize,
}

impl<'a> View<'a> {
    fn dense(data: &'a [f64], n: usize) -> Self {
        Self {
            data,
            offset: 0,
            stride: n,
        }
    }

    /// Quadrant `(qi, qj)` of half-size `h`
    fn quadrant(self, h: usize, qi: usize, qj: usize) -> Self {
        Self {
            offset: self.offset + qi * h * self.stride + qj * h,
            ..self
        }
    }

    fn row(&self, i: usize, len: usize) -> &'a [f64] {
        let start = self.offset + i * self.stride;
        &self.data[start..start + len]
    }

    fn tail(&self) -> &'a [f64] {
        &self.data[self.offset..]
    }
}

/// `out = a + sign·b` on an `h × h` block
fn combine(out: &mut [f64], h: usize, a: View<'_>, b: View<'_>, sign: f64) {
    for (i, row) in out.chunks_exact_mut(h).take(h).enumerate() {
        row.copy_from_slice(a.row(i, h));
        vectorized::axpy(b.row(i, h), sign, row);
    }
}

/// `out += sign·a` on an `h × h` block
fn accumulate(out: &mut [f64], h: usize, a: View<'_>, sign: f64) {
    for (i, row) in out.chunks_exact_mut(h).take(h).enumerate() {
        vectorized::axpy(a.row(i, h), sign, row);
    }
}

struct Context<'p> {
    pool: &'p BufferPool,
    kernel_size: usize,
    parallel_threshold: usize,
}

/// `c = a·b` for `n × n` blocks; `c` is contiguous with stride `n`
fn recurse(a: View<'_>, b: View<'_>, c: &mut [f64], n: usize, level: usize, ctx: &Context<'_>) {
    if n <= ctx.kernel_size || n < 2 {
        if n == MICRO_KERNEL && vectorized::gemm_64(a.tail(), a.stride, b.tail(), b.stride, c, n) {
            return;
        }
        vectorized::gemm_small(n, a.tail(), a.stride, b.tail(), b.stride, c, n);
        return;
    }

    let h = n / 2;
    let hh = h * h;
    let (a11, a12, a21, a22) = (
        a.quadrant(h, 0, 0),
        a.quadrant(h, 0, 1),
        a.quadrant(h, 1, 0),
        a.quadrant(h, 1, 1),
    );
    let (b11, b12, b21, b22) = (
        b.quadrant(h, 0, 0),
        b.quadrant(h, 0, 1),
        b.quadrant(h, 1, 0),
        b.quadrant(h, 1, 1),
    );

    // S = A12 − A21 + A22, Tb = B12 − B21 + B22
    let mut s = ctx.pool.rent(hh);
    combine(&mut s, h, a12, a21, -1.0);
    accumulate(&mut s, h, a22, 1.0);
    let mut tb = ctx.pool.rent(hh);
    combine(&mut tb, h, b12, b21, -1.0);
    accumulate(&mut tb, h, b22, 1.0);
    let sv = View::dense(&s[..], h);
    let tv = View::dense(&tb[..], h);

    let mut t1 = ctx.pool.rent(hh);
    let mut t2 = ctx.pool.rent(hh);
    let mut t3 = ctx.pool.rent(hh);
    let mut t4 = ctx.pool.rent(hh);
    let mut t5 = ctx.pool.rent(hh);
    let mut t6 = ctx.pool.rent(hh);
    combine(&mut t1, h, a21, sv, 1.0);
    combine(&mut t2, h, sv, a12, -1.0);
    combine(&mut t3, h, sv, a11, -1.0);
    combine(&mut t4, h, tv, b11, -1.0);
    combine(&mut t5, h, b21, tv, 1.0);
    combine(&mut t6, h, tv, b12, -1.0);
    let (t1, t2, t3) = (
        View::dense(&t1[..], h),
        View::dense(&t2[..], h),
        View::dense(&t3[..], h),
    );
    let (t4, t5, t6) = (
        View::dense(&t4[..], h),
        View::dense(&t5[..], h),
        View::dense(&t6[..], h),
    );

    let mut m1 = ctx.pool.rent(hh);
    let mut m2 = ctx.pool.rent(hh);
    let mut m3 = ctx.pool.rent(hh);
    let mut m4 = ctx.pool.rent(hh);
    let mut m5 = ctx.pool.rent(hh);
    let mut m6 = ctx.pool.rent(hh);
    let mut m7 = ctx.pool.rent(hh);

    let fork = level == 0 && n > ctx.parallel_threshold && parallel::should_parallelize(n, 0);
    if fork {
        debug!(n, "winograd fan-out");
    }
    {
        let (p1, p2, p3, p4) = (&mut m1[..], &mut m2[..], &mut m3[..], &mut m4[..]);
        let (p5, p6, p7) = (&mut m5[..], &mut m6[..], &mut m7[..]);
        let next = level + 1;
        parallel::join(
            fork,
            move || {
                parallel::join(
                    fork,
                    move || {
                        parallel::join(
                            fork,
                            move || recurse(a11, b11, p1, h, next, ctx),
                            move || recurse(a12, b21, p2, h, next, ctx),
                        )
                    },
                    move || {
                        parallel::join(
                            fork,
                            move || recurse(a21, t4, p3, h, next, ctx),
                            move || recurse(sv, tv, p4, h, next, ctx),
                        )
                    },
                )
            },
            move || {
                parallel::join(
                    fork,
                    move || {
                        parallel::join(
                            fork,
                            move || recurse(t1, t5, p5, h, next, ctx),
                            move || recurse(t2, t6, p6, h, next, ctx),
                        )
                    },
                    move || recurse(t3, b12, p7, h, next, ctx),
                )
            },
        );
    }

    // C11 = M1 + M2
    // C22 = M5 + M6 − M2 − M4
    // C12 = M5 − M7 − C22
    // C21 = C22 − (M3 + M6)
    for i in 0..h {
        let r = i * h..(i + 1) * h;
        let (upper, lower) = c.split_at_mut((h + i) * n);
        let top = &mut upper[i * n..(i + 1) * n];
        let (c21, c22) = lower[..n].split_at_mut(h);

        c22.copy_from_slice(&m5[r.clone()]);
        vectorized::add(&m6[r.clone()], c22);
        vectorized::axpy(&m2[r.clone()], -1.0, c22);
        vectorized::axpy(&m4[r.clone()], -1.0, c22);

        c21.copy_from_slice(c22);
        vectorized::axpy(&m3[r.clone()], -1.0, c21);
        vectorized::axpy(&m6[r.clone()], -1.0, c21);

        let (c11, c12) = top.split_at_mut(h);
        c12.copy_from_slice(&m5[r.clone()]);
        vectorized::axpy(&m7[r.clone()], -1.0, c12);
        vectorized::axpy(c22, -1.0, c12);

        c11.copy_from_slice(&m1[r.clone()]);
        vectorized::add(&m2[r], c11);
    }
}

/// Copies dense rows into the top-left corner of an `n × n` buffer
fn pad_into(buf: &mut [f64], n: usize, rows: &[Vec<f64>]) {
    for (i, row) in rows.iter().enumerate() {
        let len = row.len().min(n);
        buf[i * n..i * n + len].copy_from_slice(&row[..len]);
    }
}

/// Smallest power of two holding every dimension of `a (m × k) · b (k × p)`
pub fn padded_size(m: usize, k: usize, p: usize) -> usize {
    m.max(k).max(p).max(1).next_power_of_two()
}

/// `scale · a · b` for dense `a (m × k)` and `b (k × p)`
///
/// Rows may be shorter than the logical width; missing entries are zero.
/// `scale` is applied once over the result buffer. The caller guarantees
/// matching inner dimensions.
#[instrument(level = "debug", skip(a, b, config), fields(m = a.len(), k = b.len(), p = cols))]
pub fn multiply(
    a: &[Vec<f64>],
    b: &[Vec<f64>],
    cols: usize,
    scale: f64,
    config: &WinogradConfig,
) -> Vec<Vec<f64>> {
    let m = a.len();
    let n = padded_size(m, b.len(), cols);
    let pool = BufferPool::global();
    let mut pa = pool.rent(n * n);
    let mut pb = pool.rent(n * n);
    pad_into(&mut pa, n, a);
    pad_into(&mut pb, n, b);
    let mut pc = pool.rent(n * n);
    let ctx = Context {
        pool,
        kernel_size: config.kernel_size.max(1),
        parallel_threshold: config.parallel_threshold,
    };
    recurse(View::dense(&pa[..], n), View::dense(&pb[..], n), &mut pc, n, 0, &ctx);
    if scale != 1.0 {
        vectorized::scale(&mut pc, scale);
    }
    pc.chunks_exact(n)
        .take(m)
        .map(|row| row[..cols].to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random(rows: usize, cols: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..rows)
            .map(|_| (0..cols).map(|_| rng.gen::<f64>() * 2.0 - 1.0).collect())
            .collect()
    }

    fn naive(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let p = b[0].len();
        a.iter()
            .map(|row| {
                (0..p)
                    .map(|j| row.iter().zip(b).map(|(x, brow)| x * brow[j]).sum())
                    .collect()
            })
            .collect()
    }

    fn check(m: usize, k: usize, p: usize, config: &WinogradConfig) {
        let a = random(m, k, m as u64);
        let b = random(k, p, 1000 + p as u64);
        let c = multiply(&a, &b, p, 1.0, config);
        let expected = naive(&a, &b);
        assert_eq!(c.len(), m);
        for (row, exp) in c.iter().zip(&expected) {
            assert_eq!(row.len(), p);
            for (x, y) in row.iter().zip(exp) {
                assert_abs_diff_eq!(x, y, epsilon = 1e-9);
            }
        }
    }

    // =====================================================================
    // Sizes around the micro-kernel
    // =====================================================================

    #[test]
    fn test_below_at_and_above_kernel() {
        let cfg = WinogradConfig::default();
        check(17, 17, 17, &cfg);
        check(64, 64, 64, &cfg);
        check(128, 128, 128, &cfg);
        check(100, 100, 100, &cfg);
    }

    #[test]
    fn test_rectangular_operands() {
        check(70, 30, 90, &WinogradConfig::default());
    }

    #[test]
    fn test_deep_recursion_with_small_kernel() {
        let cfg = WinogradConfig {
            kernel_size: 4,
            parallel_threshold: 8,
            ..WinogradConfig::default()
        };
        check(32, 32, 32, &cfg);
        check(5, 9, 3, &cfg);
    }

    #[test]
    fn test_parallel_top_level() {
        let cfg = WinogradConfig {
            parallel_threshold: 64,
            ..WinogradConfig::default()
        };
        check(256, 256, 256, &cfg);
    }

    // =====================================================================
    // Scaling and padding
    // =====================================================================

    #[test]
    fn test_scale_applied_once() {
        let a = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        let b = vec![vec![5.0, 6.0], vec![7.0, 8.0]];
        let c = multiply(&a, &b, 2, 0.5, &WinogradConfig::default());
        assert_eq!(c, vec![vec![9.5, 11.0], vec![21.5, 25.0]]);
    }

    #[test]
    fn test_short_rows_are_zero_padded() {
        // Lower-triangular rows stored without their zero tails
        let a = vec![vec![1.0], vec![2.0, 3.0]];
        let b = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let c = multiply(&a, &b, 2, 1.0, &WinogradConfig::default());
        assert_eq!(c, vec![vec![1.0, 1.0], vec![5.0, 5.0]]);
    }

    #[test]
    fn test_padded_size() {
        assert_eq!(padded_size(100, 100, 100), 128);
        assert_eq!(padded_size(64, 3, 1), 64);
        assert_eq!(padded_size(0, 0, 0), 1);
    }
}
