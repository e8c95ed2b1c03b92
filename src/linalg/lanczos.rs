//! Lanczos iteration for a few extreme eigenpairs of a large symmetric matrix
//!
//! Builds an orthonormal Krylov basis with full Gram–Schmidt
//! reorthogonalization, and stops once the Ritz values of interest stop
//! moving (Kaniel–Paige test) or the basis reaches its cap.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument, trace};

use super::eigen::{implicit_ql, EigenPairs};
use crate::config::EigenConfig;
use crate::error::Result;
use crate::storage::order_indexes;
use crate::vectorized;

/// β below which the Krylov space is exhausted
const BREAKDOWN: f64 = 1e-15;

/// Random unit start vector with entries drawn from `[-0.5, 0.5)`
fn start_vector(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut v: Vec<f64> = (0..n).map(|_| rng.gen::<f64>() - 0.5).collect();
    let norm = vectorized::norm(&v);
    if norm != 0.0 {
        vectorized::scale(&mut v, 1.0 / norm);
    }
    v
}

/// Ritz pairs of the `m`-step tridiagonal `T = tridiag(β, α, β)`
///
/// `basis[j + 1]` is the j-th Lanczos vector; vectors are lifted back to the
/// full space and normalized.
fn ritz_pairs(
    alpha: &[f64],
    beta: &[f64],
    basis: Option<&[Vec<f64>]>,
    m: usize,
    count: usize,
    reverse: bool,
) -> Result<EigenPairs> {
    let count = count.min(m);
    let mut d = alpha[..m].to_vec();
    let mut e = vec![0.0; m];
    e[1..m].copy_from_slice(&beta[1..m]);
    let mut q = basis.map(|_| super::identity(m));
    implicit_ql(&mut d, &mut e, q.as_deref_mut())?;

    let order = order_indexes(&d, reverse, f64::total_cmp);
    let order = &order[..count];
    let values = order.iter().map(|&k| d[k]).collect();
    let vectors = match (basis, q) {
        (Some(basis), Some(q)) => {
            let n = basis[1].len();
            Some(
                order
                    .iter()
                    .map(|&k| {
                        let mut v = vec![0.0; n];
                        for (j, qj) in q.iter().enumerate() {
                            vectorized::axpy(&basis[j + 1], qj[k], &mut v);
                        }
                        let norm = vectorized::norm(&v);
                        if norm != 0.0 {
                            vectorized::scale(&mut v, 1.0 / norm);
                        }
                        v
                    })
                    .collect(),
            )
        }
        _ => None,
    };
    Ok(EigenPairs { values, vectors })
}

/// Kaniel–Paige state carried between checks
struct Convergence {
    previous: Option<Vec<f64>>,
    tolerance: f64,
    count: usize,
    reverse: bool,
}

impl Convergence {
    /// Whether the target Ritz values settled at step `j`
    fn check(&mut self, alpha: &[f64], beta: &[f64], j: usize) -> Result<bool> {
        if j < self.count.max(2) {
            return Ok(false);
        }
        let current = ritz_pairs(alpha, beta, None, j, self.count, self.reverse)?.values;
        let mut converged = false;
        if let Some(previous) = &self.previous {
            if previous.len() == current.len() {
                converged = current
                    .iter()
                    .zip(previous)
                    .all(|(c, p)| (c - p).abs() / (1.0 + c.abs()) <= self.tolerance);
                if converged {
                    let scale = current.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
                    converged = beta[j].abs() <= self.tolerance * scale;
                }
            }
        }
        trace!(step = j, converged, "kaniel-paige check");
        self.previous = Some(current);
        Ok(converged)
    }
}

/// `count` extreme eigenpairs of a packed symmetric matrix
///
/// `reverse` selects the largest eigenvalues (descending), otherwise the
/// smallest (ascending). Fewer pairs come back when the Krylov space is
/// exhausted before `count` steps.
#[instrument(level = "debug", skip(upper, config), fields(n = upper.len()))]
pub fn solve(
    upper: &[Vec<f64>],
    count: usize,
    reverse: bool,
    vectors: bool,
    config: &EigenConfig,
) -> Result<EigenPairs> {
    let n = upper.len();
    let k = config.krylov_dimension(n, count);
    let mut alpha = vec![0.0; k];
    let mut beta = vec![0.0; k + 1];
    let mut basis: Vec<Vec<f64>> = Vec::with_capacity(k + 2);
    basis.push(vec![0.0; n]);
    basis.push(start_vector(n, config.seed));

    let mut w = vec![0.0; n];
    let mut convergence = Convergence {
        previous: None,
        tolerance: config.tolerance,
        count,
        reverse,
    };
    let interval = (count / 8).max(1);
    let mut m = 0;
    for j in 1..=k {
        super::symmetric_mul(upper, &basis[j], &mut w);
        vectorized::axpy(&basis[j - 1], -beta[j - 1], &mut w);
        alpha[j - 1] = vectorized::dot(&w, &basis[j]);
        vectorized::axpy(&basis[j], -alpha[j - 1], &mut w);
        // Full reorthogonalization, modified Gram–Schmidt
        for v in &basis[1..=j] {
            let d = vectorized::dot(&w, v);
            vectorized::axpy(v, -d, &mut w);
        }
        beta[j] = vectorized::norm(&w);
        m = j;
        if beta[j] < BREAKDOWN {
            break;
        }
        let mut next = w.clone();
        vectorized::scale(&mut next, 1.0 / beta[j]);
        basis.push(next);
        if j >= count && (j - count) % interval == 0 && convergence.check(&alpha, &beta, j)? {
            break;
        }
    }
    debug!(steps = m, krylov_cap = k, "lanczos finished");
    ritz_pairs(&alpha, &beta, vectors.then_some(basis.as_slice()), m, count, reverse)
}
