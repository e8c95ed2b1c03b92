//! Jacobi-preconditioned conjugate gradient for packed symmetric systems

use tracing::{debug, instrument};

use crate::config::PcgConfig;
use crate::error::{LinalgError, Result};
use crate::parallel;
use crate::pool::BufferPool;
use crate::vectorized;

/// PCG solver bound to one packed symmetric matrix
#[derive(Debug)]
pub struct PcgSolver<'a> {
    upper: &'a [Vec<f64>],
    inv_diag: Vec<f64>,
    config: PcgConfig,
}

/// Work vectors of one solve
struct Workspace<'s> {
    x: &'s mut [f64],
    r: &'s mut [f64],
    z: &'s mut [f64],
    p: &'s mut [f64],
    ap: &'s mut [f64],
}

impl<'a> PcgSolver<'a> {
    /// Builds the Jacobi preconditioner `M⁻¹ = 1 / diag(A)`
    ///
    /// # Errors
    ///
    /// `MatrixSingular` when a diagonal entry is missing or zero.
    pub fn new(upper: &'a [Vec<f64>], config: PcgConfig) -> Result<Self> {
        let inv_diag = upper
            .iter()
            .map(|row| match row.first() {
                Some(&d) if d != 0.0 => Ok(1.0 / d),
                _ => Err(LinalgError::MatrixSingular),
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(Self {
            upper,
            inv_diag,
            config,
        })
    }

    fn order(&self) -> usize {
        self.upper.len()
    }

    /// Runs PCG from `x = 0` with `ws.r` holding `b`; returns the iterations
    fn iterate(&self, ws: Workspace<'_>) -> Result<usize> {
        let Workspace { x, r, z, p, ap } = ws;
        let max_iterations = self.config.max_iterations(self.order());
        let tol_sq = self.config.tolerance * self.config.tolerance;
        x.fill(0.0);
        vectorized::mul(&self.inv_diag, r, z);
        p.copy_from_slice(z);
        let mut rz_old = vectorized::dot(r, z);
        for iter in 0..max_iterations {
            if vectorized::sum_sq(r) < tol_sq {
                return Ok(iter);
            }
            super::symmetric_mul(self.upper, p, ap);
            let pap = vectorized::dot(p, ap);
            if pap.abs() < self.config.curvature_floor {
                return Err(LinalgError::IllConditioned);
            }
            let alpha = rz_old / pap;
            vectorized::axpy(p, alpha, x);
            vectorized::axpy(ap, -alpha, r);
            vectorized::mul(&self.inv_diag, r, z);
            let rz_new = vectorized::dot(r, z);
            vectorized::scale(p, rz_new / rz_old);
            vectorized::add(z, p);
            rz_old = rz_new;
        }
        Err(LinalgError::PcgNoConvergence {
            iterations: max_iterations,
        })
    }

    /// Solves `A·x = b`
    ///
    /// # Errors
    ///
    /// - `IllConditioned` when `|pᵀAp|` collapses
    /// - `PcgNoConvergence` when the iteration cap is reached
    #[instrument(level = "debug", skip(self, b), fields(n = self.order()))]
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>> {
        let n = self.order();
        let mut x = vec![0.0; n];
        let mut r = b.to_vec();
        let mut z = vec![0.0; n];
        let mut p = vec![0.0; n];
        let mut ap = vec![0.0; n];
        let iterations = self.iterate(Workspace {
            x: &mut x,
            r: &mut r,
            z: &mut z,
            p: &mut p,
            ap: &mut ap,
        })?;
        debug!(iterations, "pcg converged");
        Ok(x)
    }

    /// Solves `A·X = B` for every column of `B` (given as column vectors)
    ///
    /// Columns run in parallel; each task rents its work vectors from the
    /// global pool.
    #[instrument(level = "debug", skip(self, cols), fields(n = self.order(), rhs = cols.len()))]
    pub fn solve_columns(&self, cols: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let n = self.order();
        let pool = BufferPool::global();
        parallel::try_map_range(cols.len(), |j| {
            let mut x = pool.rent(n);
            let mut r = pool.rent(n);
            let mut z = pool.rent(n);
            let mut p = pool.rent(n);
            let mut ap = pool.rent(n);
            r.copy_from_slice(&cols[j][..n]);
            let iterations = self.iterate(Workspace {
                x: &mut x,
                r: &mut r,
                z: &mut z,
                p: &mut p,
                ap: &mut ap,
            })?;
            debug!(column = j, iterations, "pcg converged");
            Ok(x.to_vec())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tridiagonal(n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| if i + 1 < n { vec![4.0, -1.0] } else { vec![4.0] })
            .collect()
    }

    #[test]
    fn test_two_by_two() {
        let upper = vec![vec![4.0, 1.0], vec![3.0]];
        let x = PcgSolver::new(&upper, PcgConfig::default())
            .unwrap()
            .solve(&[1.0, 2.0])
            .unwrap();
        assert_abs_diff_eq!(x[0], 1.0 / 11.0, epsilon = 1e-10);
        assert_abs_diff_eq!(x[1], 7.0 / 11.0, epsilon = 1e-10);
    }

    #[test]
    fn test_multi_rhs_matches_single() {
        let n = 150;
        let upper = tridiagonal(n);
        let solver = PcgSolver::new(&upper, PcgConfig::default()).unwrap();
        let cols: Vec<Vec<f64>> = (0..3)
            .map(|c| (0..n).map(|i| ((i * (c + 1)) % 7) as f64).collect())
            .collect();
        let many = solver.solve_columns(&cols).unwrap();
        for (col, x) in cols.iter().zip(&many) {
            let single = solver.solve(col).unwrap();
            for (a, b) in single.iter().zip(x) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-12);
            }
            let mut ax = vec![0.0; n];
            super::super::symmetric_mul(&upper, x, &mut ax);
            for (a, b) in ax.iter().zip(col) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_zero_diagonal_is_singular() {
        let upper = vec![vec![0.0, 1.0], vec![1.0]];
        assert_eq!(
            PcgSolver::new(&upper, PcgConfig::default()).unwrap_err(),
            LinalgError::MatrixSingular
        );
    }

    #[test]
    fn test_iteration_cap() {
        let upper = tridiagonal(40);
        let config = PcgConfig {
            max_iterations_cap: 1,
            ..PcgConfig::default()
        };
        let b: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let err = PcgSolver::new(&upper, config).unwrap().solve(&b).unwrap_err();
        assert_eq!(err, LinalgError::PcgNoConvergence { iterations: 1 });
    }

    #[test]
    fn test_curvature_collapse() {
        // Indefinite: pᵀAp = 0 on the first step
        let upper = vec![vec![1.0, 0.0], vec![-1.0]];
        let err = PcgSolver::new(&upper, PcgConfig::default())
            .unwrap()
            .solve(&[1.0, 1.0])
            .unwrap_err();
        assert_eq!(err, LinalgError::IllConditioned);
    }

    #[test]
    fn test_zero_rhs_converges_immediately() {
        let upper = tridiagonal(5);
        let x = PcgSolver::new(&upper, PcgConfig::default())
            .unwrap()
            .solve(&[0.0; 5])
            .unwrap();
        assert!(x.iter().all(|&v| v == 0.0));
    }
}
