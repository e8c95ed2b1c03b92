//! Golub–Reinsch singular value decomposition
//!
//! Four phases over a working copy `U` of the input:
//! 1. Householder bidiagonalization, leaving the reflectors in `U`
//! 2. accumulation of the right transforms into `Vᵀ`
//! 3. accumulation of the left transforms into `U`
//! 4. implicit-shift QL diagonalization of the bidiagonal
//!
//! `Vᵀ` is kept row-major so that rotations touch two contiguous rows.

use tracing::{debug, instrument};

use crate::config::MAX_QL_ITERATIONS;
use crate::error::{LinalgError, Result};
use crate::storage::order_indexes;
use crate::vectorized;

/// `A = U·diag(σ)·Vᵀ`
#[derive(Debug, Clone, PartialEq)]
pub struct Svd {
    /// Left singular vectors as columns (m × n)
    pub u: Vec<Vec<f64>>,
    /// Singular values
    pub sigma: Vec<f64>,
    /// Right singular vectors as rows (n × n)
    pub vt: Vec<Vec<f64>>,
}

/// Copies column `j` of `u` (rows `from..`) into `col`
fn cache_column(u: &[Vec<f64>], col: &mut [f64], j: usize, from: usize) {
    for (c, row) in col[from..].iter_mut().zip(&u[from..]) {
        *c = row[j];
    }
}

fn restore_column(u: &mut [Vec<f64>], col: &[f64], j: usize, from: usize) {
    for (row, &c) in u[from..].iter_mut().zip(&col[from..]) {
        row[j] = c;
    }
}

/// Phase 1; returns the norm bound used by the convergence tests
fn bidiagonalize(u: &mut [Vec<f64>], sig: &mut [f64], rv1: &mut [f64], col: &mut [f64]) -> f64 {
    let m = u.len();
    let n = sig.len();
    let mut s = vec![0.0; n];
    let (mut g, mut scale, mut anorm) = (0.0_f64, 0.0_f64, 0.0_f64);
    for i in 0..n {
        let l = i + 1;
        rv1[i] = scale * g;
        g = 0.0;
        scale = 0.0;
        if i < m {
            cache_column(u, col, i, i);
            scale = vectorized::sum_abs(&col[i..m]);
            if scale != 0.0 {
                let sum = vectorized::scale_sum_sq(&mut col[i..m], 1.0 / scale);
                let f = col[i];
                g = -sum.sqrt().copysign(f);
                let h = f * g - sum;
                col[i] = f - g;
                if l < n {
                    s[l..].fill(0.0);
                    for k in i..m {
                        vectorized::axpy(&u[k][l..n], col[k], &mut s[l..]);
                    }
                    vectorized::scale(&mut s[l..], 1.0 / h);
                    for k in i..m {
                        vectorized::axpy(&s[l..], col[k], &mut u[k][l..n]);
                    }
                }
                vectorized::scale(&mut col[i..m], scale);
            }
            restore_column(u, col, i, i);
        }
        sig[i] = scale * g;
        g = 0.0;
        scale = 0.0;
        if i < m && l < n {
            let (head, tail) = u.split_at_mut(i + 1);
            let ui = &mut head[i];
            scale = vectorized::sum_abs(&ui[l..n]);
            if scale != 0.0 {
                let sum = vectorized::scale_sum_sq(&mut ui[l..n], 1.0 / scale);
                let f = ui[l];
                g = -sum.sqrt().copysign(f);
                let h = f * g - sum;
                ui[l] = f - g;
                for k in l..n {
                    rv1[k] = ui[k] / h;
                }
                for uj in tail.iter_mut().take(m - l) {
                    let d = vectorized::dot(&uj[l..n], &ui[l..n]);
                    vectorized::axpy(&rv1[l..n], d, &mut uj[l..n]);
                }
                vectorized::scale(&mut ui[l..n], scale);
            }
        }
        anorm = anorm.max(sig[i].abs() + rv1[i].abs());
    }
    anorm
}

/// Phase 2: accumulates the right-hand reflectors into `vt`
fn right_transform(u: &[Vec<f64>], vt: &mut [Vec<f64>], rv1: &[f64]) {
    let n = vt.len();
    let mut g = 0.0;
    let mut l = n;
    for i in (0..n).rev() {
        if i + 1 < n {
            let ui = &u[i];
            if g != 0.0 {
                let (head, tail) = vt.split_at_mut(i + 1);
                let vi = &mut head[i];
                // Double division avoids underflow
                for j in l..n {
                    vi[j] = (ui[j] / ui[l]) / g;
                }
                for vj in tail.iter_mut() {
                    let d = vectorized::dot(&ui[l..n], &vj[l..n]);
                    vectorized::axpy(&vi[l..n], d, &mut vj[l..n]);
                }
            }
            for j in l..n {
                vt[i][j] = 0.0;
                vt[j][i] = 0.0;
            }
        }
        vt[i][i] = 1.0;
        g = rv1[i];
        l = i;
    }
}

/// Phase 3: accumulates the left-hand reflectors into `u`
fn left_transform(u: &mut [Vec<f64>], sig: &[f64], col: &mut [f64]) {
    let m = u.len();
    let n = sig.len();
    let mut s = vec![0.0; n];
    for i in (0..m.min(n)).rev() {
        let l = i + 1;
        u[i][l..n].fill(0.0);
        cache_column(u, col, i, i);
        let g = sig[i];
        if g != 0.0 {
            let g = 1.0 / g;
            if l < n {
                s[l..].fill(0.0);
                for k in l..m {
                    vectorized::axpy(&u[k][l..n], col[k], &mut s[l..]);
                }
                vectorized::scale(&mut s[l..], g / col[i]);
                for k in i..m {
                    vectorized::axpy(&s[l..], col[k], &mut u[k][l..n]);
                }
            }
            vectorized::scale(&mut col[i..m], g);
        } else {
            col[i..m].fill(0.0);
        }
        col[i] += 1.0;
        restore_column(u, col, i, i);
    }
}

/// Rotates columns `a` and `b` of every row
#[inline]
fn rotate_columns(u: &mut [Vec<f64>], a: usize, b: usize, c: f64, s: f64) {
    for row in u.iter_mut() {
        let y = row[a];
        let z = row[b];
        row[a] = y * c + z * s;
        row[b] = z * c - y * s;
    }
}

/// Rotates rows `a < b` of `vt`
#[inline]
fn rotate_rows(vt: &mut [Vec<f64>], a: usize, b: usize, c: f64, s: f64) {
    let (head, tail) = vt.split_at_mut(b);
    for (x, z) in head[a].iter_mut().zip(tail[0].iter_mut()) {
        let (xv, zv) = (*x, *z);
        *x = xv * c + zv * s;
        *z = zv * c - xv * s;
    }
}

/// Phase 4: chases the bidiagonal's superdiagonal to zero
fn diagonalize(
    u: &mut [Vec<f64>],
    sig: &mut [f64],
    vt: &mut [Vec<f64>],
    rv1: &mut [f64],
    anorm: f64,
) -> Result<()> {
    let n = sig.len();
    let negligible = |x: f64| x.abs() + anorm == anorm;
    for k in (0..n).rev() {
        let mut its = 1;
        loop {
            // Split test; rv1[0] is always zero
            let mut l = k;
            let mut cancel = true;
            loop {
                if l == 0 || rv1[l] == 0.0 || negligible(rv1[l]) {
                    cancel = false;
                    break;
                }
                if negligible(sig[l - 1]) {
                    break;
                }
                l -= 1;
            }
            if cancel {
                let nm = l - 1;
                let (mut c, mut s) = (0.0, 1.0);
                for i in l..=k {
                    let f = s * rv1[i];
                    rv1[i] *= c;
                    if negligible(f) {
                        break;
                    }
                    let g = sig[i];
                    let h = f.hypot(g);
                    sig[i] = h;
                    c = g / h;
                    s = -f / h;
                    rotate_columns(u, nm, i, c, s);
                }
            }
            let z = sig[k];
            if l == k {
                if z < 0.0 {
                    sig[k] = -z;
                    vectorized::scale(&mut vt[k], -1.0);
                }
                break;
            }
            if its == MAX_QL_ITERATIONS {
                return Err(LinalgError::SvdNoConvergence {
                    iterations: MAX_QL_ITERATIONS,
                });
            }
            its += 1;

            let mut x = sig[l];
            let nm = k - 1;
            let mut y = sig[nm];
            let mut g = rv1[nm];
            let mut h = rv1[k];
            let mut f = ((y - z) * (y + z) + (g - h) * (g + h)) / (2.0 * h * y);
            g = f.hypot(1.0);
            f = ((x - z) * (x + z) + h * ((y / (f + g.copysign(f))) - h)) / x;
            let (mut c, mut s) = (1.0, 1.0);
            for j in l..=nm {
                let i = j + 1;
                g = rv1[i];
                y = sig[i];
                h = s * g;
                g *= c;
                let mut z = f.hypot(h);
                rv1[j] = z;
                c = f / z;
                s = h / z;
                f = x * c + g * s;
                g = g * c - x * s;
                h = y * s;
                y *= c;
                rotate_rows(vt, j, i, c, s);
                z = f.hypot(h);
                sig[j] = z;
                if z != 0.0 {
                    c = f / z;
                    s = h / z;
                }
                f = c * g + s * y;
                x = c * y - s * g;
                rotate_columns(u, j, i, c, s);
            }
            rv1[l] = 0.0;
            rv1[k] = f;
            sig[k] = x;
        }
    }
    Ok(())
}

/// Decomposes dense `a` (m × n, m ≥ n), σ sorted descending
///
/// # Errors
///
/// - `MatrixNotHigh` when `m < n`
/// - `SvdNoConvergence` when a singular value needs more than 30 sweeps
#[instrument(level = "debug", skip(a), fields(rows = a.len(), cols = a.first().map_or(0, Vec::len)))]
pub fn decompose(a: &[Vec<f64>]) -> Result<Svd> {
    let m = a.len();
    let n = a.first().map_or(0, Vec::len);
    if m < n {
        return Err(LinalgError::MatrixNotHigh);
    }
    let mut u = a.to_vec();
    let mut sig = vec![0.0; n];
    let mut rv1 = vec![0.0; n];
    let mut vt = vec![vec![0.0; n]; n];
    let mut col = vec![0.0; m];

    let anorm = bidiagonalize(&mut u, &mut sig, &mut rv1, &mut col);
    right_transform(&u, &mut vt, &rv1);
    left_transform(&mut u, &sig, &mut col);
    diagonalize(&mut u, &mut sig, &mut vt, &mut rv1, anorm)?;
    debug!(anorm, "svd converged");

    let order = order_indexes(&sig, true, f64::total_cmp);
    if order.iter().enumerate().any(|(i, &k)| i != k) {
        sig = order.iter().map(|&k| sig[k]).collect();
        u = u
            .iter()
            .map(|row| order.iter().map(|&k| row[k]).collect())
            .collect();
        vt = order.iter().map(|&k| vt[k].clone()).collect();
    }
    Ok(Svd { u, sigma: sig, vt })
}

/// Number of singular values above one ulp of the largest
pub fn numerical_rank(sigma: &[f64]) -> usize {
    let max = sigma.iter().fold(0.0_f64, |m, &s| m.max(s.abs()));
    if max == 0.0 || !max.is_finite() {
        return 0;
    }
    let eps = f64::from_bits(max.to_bits() + 1) - max;
    sigma.iter().filter(|s| s.abs() > eps).count()
}
