//! Symmetric eigenproblems
//!
//! Small and mid-size problems go through Householder tridiagonalization and
//! the implicit-shift QL algorithm; large problems asking for a few pairs go
//! through [`super::lanczos`]. [`solve`] picks the path with
//! [`EigenConfig::is_direct`].

use tracing::{debug, instrument};

use crate::config::{EigenConfig, MAX_QL_ITERATIONS};
use crate::error::{LinalgError, Result};
use crate::storage::order_indexes;

/// Relative size below which an off-diagonal element splits the matrix
const SPLIT_TOLERANCE: f64 = 1e-15;

/// Eigenvalues with optional eigenvectors, in matching order
#[derive(Debug, Clone, PartialEq)]
pub struct EigenPairs {
    pub values: Vec<f64>,
    /// `vectors[i]` is the unit eigenvector of `values[i]`
    pub vectors: Option<Vec<Vec<f64>>>,
}

/// Interprets a signed pair count
///
/// Negative asks for the `|count|` largest in descending order; zero or an
/// oversize count means all `n` in ascending order.
pub fn resolve_count(count: i64, n: usize) -> (usize, bool) {
    let reverse = count < 0;
    let c = usize::try_from(count.unsigned_abs()).unwrap_or(usize::MAX);
    if c == 0 || c > n {
        (n, reverse)
    } else {
        (c, reverse)
    }
}

/// Householder reduction of the dense symmetric `a` to tridiagonal form
///
/// Returns `(d, e)` with the diagonal in `d` and the subdiagonal in
/// `e[1..]` (`e[0] = 0`). With `vectors`, `a` is overwritten by the
/// orthogonal transform `Q`.
pub fn tridiagonalize(a: &mut [Vec<f64>], vectors: bool) -> (Vec<f64>, Vec<f64>) {
    let n = a.len();
    let mut d = vec![0.0; n];
    let mut e = vec![0.0; n];
    for i in (1..n).rev() {
        let l = i - 1;
        let mut h = 0.0;
        if l > 0 {
            let scale: f64 = a[i][..=l].iter().map(|x| x.abs()).sum();
            if scale == 0.0 {
                e[i] = a[i][l];
            } else {
                for x in &mut a[i][..=l] {
                    *x /= scale;
                    h += *x * *x;
                }
                let mut f = a[i][l];
                let mut g = if f >= 0.0 { -h.sqrt() } else { h.sqrt() };
                e[i] = scale * g;
                h -= f * g;
                a[i][l] = f - g;
                f = 0.0;
                for j in 0..=l {
                    if vectors {
                        a[j][i] = a[i][j] / h;
                    }
                    g = 0.0;
                    for k in 0..=j {
                        g += a[j][k] * a[i][k];
                    }
                    for k in j + 1..=l {
                        g += a[k][j] * a[i][k];
                    }
                    e[j] = g / h;
                    f += e[j] * a[i][j];
                }
                let hh = f / (h + h);
                let (head, tail) = a.split_at_mut(i);
                let ai = &tail[0];
                for j in 0..=l {
                    let f = ai[j];
                    let g = e[j] - hh * f;
                    e[j] = g;
                    let aj = &mut head[j];
                    for k in 0..=j {
                        aj[k] -= f * e[k] + g * ai[k];
                    }
                }
            }
        } else {
            e[i] = a[i][l];
        }
        d[i] = h;
    }
    if n > 0 {
        d[0] = 0.0;
        e[0] = 0.0;
    }
    for i in 0..n {
        if vectors {
            if d[i] != 0.0 {
                for j in 0..i {
                    let g: f64 = (0..i).map(|k| a[i][k] * a[k][j]).sum();
                    for k in 0..i {
                        let aki = a[k][i];
                        a[k][j] -= g * aki;
                    }
                }
            }
            d[i] = a[i][i];
            a[i][i] = 1.0;
            for j in 0..i {
                a[j][i] = 0.0;
                a[i][j] = 0.0;
            }
        } else {
            d[i] = a[i][i];
        }
    }
    (d, e)
}

/// Implicit-shift QL on a symmetric tridiagonal
///
/// On return `d` holds the eigenvalues. When `q` is given its column `k`
/// becomes the eigenvector of `d[k]` (start from the identity for a bare
/// tridiagonal, or from [`tridiagonalize`]'s transform).
///
/// # Errors
///
/// `QlAlgorithmFailed` when an eigenvalue needs 30 sweeps.
pub fn implicit_ql(d: &mut [f64], e: &mut [f64], mut q: Option<&mut [Vec<f64>]>) -> Result<()> {
    let n = d.len();
    if n == 0 {
        return Ok(());
    }
    e.copy_within(1..n, 0);
    e[n - 1] = 0.0;
    for l in 0..n {
        let mut iter = 0;
        loop {
            let mut m = l;
            while m + 1 < n {
                let dd = d[m].abs() + d[m + 1].abs();
                if e[m].abs() <= SPLIT_TOLERANCE * dd {
                    break;
                }
                m += 1;
            }
            if m == l {
                break;
            }
            iter += 1;
            if iter == MAX_QL_ITERATIONS {
                return Err(LinalgError::QlAlgorithmFailed);
            }
            let mut g = (d[l + 1] - d[l]) / (2.0 * e[l]);
            let mut r = g.hypot(1.0);
            g = d[m] - d[l] + e[l] / (g + r.copysign(g));
            let (mut s, mut c, mut p) = (1.0, 1.0, 0.0);
            let mut underflow = false;
            for i in (l..m).rev() {
                let f = s * e[i];
                let b = c * e[i];
                r = f.hypot(g);
                e[i + 1] = r;
                if r == 0.0 {
                    d[i + 1] -= p;
                    e[m] = 0.0;
                    underflow = true;
                    break;
                }
                s = f / r;
                c = g / r;
                g = d[i + 1] - p;
                r = (d[i] - g) * s + 2.0 * c * b;
                p = s * r;
                d[i + 1] = g + p;
                g = c * r - b;
                if let Some(q) = q.as_deref_mut() {
                    for row in q.iter_mut() {
                        let f = row[i + 1];
                        row[i + 1] = s * row[i] + c * f;
                        row[i] = c * row[i] - s * f;
                    }
                }
            }
            if underflow {
                continue;
            }
            d[l] -= p;
            e[l] = g;
            e[m] = 0.0;
        }
    }
    Ok(())
}

/// Picks `count` pairs out of a full spectrum `d` and the column
/// eigenvectors of `q`
fn select(d: &[f64], q: Option<&[Vec<f64>]>, count: usize, reverse: bool) -> EigenPairs {
    let order = order_indexes(d, reverse, f64::total_cmp);
    let order = &order[..count.min(d.len())];
    EigenPairs {
        values: order.iter().map(|&k| d[k]).collect(),
        vectors: q.map(|q| order.iter().map(|&k| q.iter().map(|row| row[k]).collect()).collect()),
    }
}

/// Tridiagonalization + QL on a packed symmetric matrix
#[instrument(level = "debug", skip(upper), fields(n = upper.len()))]
pub fn solve_direct(upper: &[Vec<f64>], count: usize, reverse: bool, vectors: bool) -> Result<EigenPairs> {
    let mut a = super::expand_symmetric(upper);
    let (mut d, mut e) = tridiagonalize(&mut a, vectors);
    if vectors {
        implicit_ql(&mut d, &mut e, Some(a.as_mut_slice()))?;
        Ok(select(&d, Some(a.as_slice()), count, reverse))
    } else {
        implicit_ql(&mut d, &mut e, None)?;
        Ok(select(&d, None, count, reverse))
    }
}

/// Eigenpairs of a packed symmetric matrix with a signed count
pub fn solve(upper: &[Vec<f64>], count: i64, vectors: bool, config: &EigenConfig) -> Result<EigenPairs> {
    let n = upper.len();
    let (count, reverse) = resolve_count(count, n);
    if config.is_direct(n, count) {
        debug!(n, count, path = "direct", "symmetric eigen");
        solve_direct(upper, count, reverse, vectors)
    } else {
        debug!(n, count, path = "lanczos", "symmetric eigen");
        super::lanczos::solve(upper, count, reverse, vectors, config)
    }
}
