//! Skyline Cholesky and LDLᵀ for symmetric matrices
//!
//! Input is the packed upper triangle: `upper[i][k]` is `A[i][i + k]`. The
//! factor is kept as jagged lower rows, where row `i` covers the columns
//! `start[i]..=i` and its last element is the diagonal (`√dᵢ` for Cholesky,
//! `dᵢ` itself for LDLᵀ).

use tracing::instrument;

use crate::parallel;
use crate::vectorized;
use crate::Backend;

/// Per-column bandwidth start of a packed symmetric matrix
///
/// `start[j]` is the first row above the diagonal holding a nonzero in
/// column `j`, rounded down to a multiple of `width`.
pub fn rows_start(upper: &[Vec<f64>], width: usize) -> Vec<usize> {
    let width = width.max(1);
    (0..upper.len())
        .map(|j| {
            let i0 = (0..j)
                .find(|&i| upper[i].get(j - i).is_some_and(|&v| v != 0.0))
                .unwrap_or(j);
            i0 - i0 % width
        })
        .collect()
}

fn simd_width() -> usize {
    Backend::select_best().lanes()
}

/// A skyline-banded triangular factor
#[derive(Debug, Clone, PartialEq)]
pub struct Skyline {
    rows: Vec<Vec<f64>>,
    start: Vec<usize>,
    cholesky: bool,
}

/// `A = L·Lᵀ`; `None` on a non-positive diagonal residue
#[instrument(level = "debug", skip(upper), fields(n = upper.len()))]
pub fn cholesky(upper: &[Vec<f64>]) -> Option<Skyline> {
    let n = upper.len();
    let start = rows_start(upper, simd_width());
    let mut l: Vec<Vec<f64>> = Vec::with_capacity(n);
    for i in 0..n {
        let i0 = start[i];
        let mut li = vec![0.0; i - i0 + 1];
        for j in i0..i {
            let lj = &l[j];
            let j0 = start[j];
            let k0 = i0.max(j0);
            let sum = vectorized::dot(&li[k0 - i0..j - i0], &lj[k0 - j0..j - j0]);
            li[j - i0] = (upper[j][i - j] - sum) / lj[j - j0];
        }
        let d = upper[i][0] - vectorized::sum_sq(&li[..i - i0]);
        if d <= 0.0 {
            return None;
        }
        li[i - i0] = d.sqrt();
        l.push(li);
    }
    Some(Skyline {
        rows: l,
        start,
        cholesky: true,
    })
}

/// `A = L·D·Lᵀ` with unit `L`; `None` on a zero pivot
#[instrument(level = "debug", skip(upper), fields(n = upper.len()))]
pub fn ldlt(upper: &[Vec<f64>]) -> Option<Skyline> {
    let n = upper.len();
    let start = rows_start(upper, simd_width());
    let mut l: Vec<Vec<f64>> = Vec::with_capacity(n);
    let mut d = vec![0.0; n];
    let mut scaled = Vec::with_capacity(n);
    for i in 0..n {
        let i0 = start[i];
        let mut li = vec![0.0; i - i0 + 1];
        // lᵢₖ·dₖ for the columns already finished
        scaled.clear();
        scaled.resize(i - i0, 0.0);
        for j in i0..i {
            let lj: &Vec<f64> = &l[j];
            let j0 = start[j];
            let k0 = i0.max(j0);
            let sum = vectorized::dot(&scaled[k0 - i0..j - i0], &lj[k0 - j0..j - j0]);
            let s = upper[j][i - j] - sum;
            scaled[j - i0] = s;
            li[j - i0] = s / d[j];
        }
        let di = upper[i][0] - vectorized::dot(&scaled, &li[..i - i0]);
        if di == 0.0 {
            return None;
        }
        d[i] = di;
        li[i - i0] = di;
        l.push(li);
    }
    Some(Skyline {
        rows: l,
        start,
        cholesky: false,
    })
}

impl Skyline {
    /// Order of the factorized matrix
    pub fn order(&self) -> usize {
        self.rows.len()
    }

    /// Whether this is a Cholesky (rather than LDLᵀ) factor
    pub fn is_cholesky(&self) -> bool {
        self.cholesky
    }

    /// Bandwidth start of every row
    pub fn start(&self) -> &[usize] {
        &self.start
    }

    /// Stored diagonal of row `i`
    #[inline]
    pub fn diagonal(&self, i: usize) -> f64 {
        self.rows[i][i - self.start[i]]
    }

    /// Factor entry `L[i][j]` for `j <= i`; zero outside the band
    pub fn get(&self, i: usize, j: usize) -> f64 {
        let i0 = self.start[i];
        if j < i0 || j > i {
            0.0
        } else {
            self.rows[i][j - i0]
        }
    }

    /// det(A)
    pub fn determinant(&self) -> f64 {
        let det: f64 = (0..self.order()).map(|i| self.diagonal(i)).product();
        if self.cholesky {
            det * det
        } else {
            det
        }
    }

    /// Solves `A·x = b` into `x`
    pub fn substitute(&self, b: &[f64], x: &mut [f64]) {
        let m = self.order();
        let mut s0: Option<usize> = None;
        for i in 0..m {
            let mut sum = b[i];
            let li = &self.rows[i];
            let i0 = self.start[i];
            match s0 {
                Some(s) => {
                    let j1 = s.max(i0);
                    if j1 < i {
                        sum -= vectorized::dot(&li[j1 - i0..i - i0], &x[j1..i]);
                    }
                }
                None if sum != 0.0 => s0 = Some(i),
                None => {}
            }
            x[i] = if self.cholesky { sum / li[i - i0] } else { sum };
        }
        if !self.cholesky {
            for (i, xi) in x.iter_mut().enumerate().take(m) {
                *xi /= self.diagonal(i);
            }
        }
        // Lᵀ·x = y, column-oriented over the rows of L
        for i in (0..m).rev() {
            let li = &self.rows[i];
            let i0 = self.start[i];
            if self.cholesky {
                x[i] /= li[i - i0];
            }
            let xi = x[i];
            if xi != 0.0 && i0 < i {
                vectorized::axpy(&li[..i - i0], -xi, &mut x[i0..i]);
            }
        }
    }

    /// Solves `A·x = b`
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let mut x = vec![0.0; self.order()];
        self.substitute(b, &mut x);
        x
    }

    /// Solves for every column in `cols`
    pub fn solve_columns(&self, cols: &[Vec<f64>]) -> Vec<Vec<f64>> {
        parallel::map_range(cols.len(), |j| self.solve(&cols[j]))
    }

    /// A⁻¹ in packed upper form
    pub fn inverse_upper(&self) -> Vec<Vec<f64>> {
        let n = self.order();
        parallel::map_range(n, |j| {
            let mut e = vec![0.0; n];
            e[j] = 1.0;
            let mut x = self.solve(&e);
            x.drain(..j);
            x
        })
    }

    /// The factor transposed into packed upper rows: `Lᵀ` for Cholesky,
    /// unit `Lᵀ` with `D` on the diagonal for LDLᵀ
    pub fn to_upper(&self) -> Vec<Vec<f64>> {
        let n = self.order();
        (0..n)
            .map(|i| (i..n).map(|j| self.get(j, i)).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dense(upper: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let n = upper.len();
        (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| if j >= i { upper[i][j - i] } else { upper[j][i - j] })
                    .collect()
            })
            .collect()
    }

    fn tridiagonal(n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| {
                let mut row = vec![0.0; n - i];
                row[0] = 4.0;
                if n - i > 1 {
                    row[1] = -1.0;
                }
                row
            })
            .collect()
    }

    // =====================================================================
    // Band starts
    // =====================================================================

    #[test]
    fn test_rows_start_skips_leading_zeros() {
        let upper = tridiagonal(6);
        let s = rows_start(&upper, 1);
        assert_eq!(s, vec![0, 0, 1, 2, 3, 4]);
        let s4 = rows_start(&upper, 4);
        assert_eq!(s4, vec![0, 0, 0, 0, 0, 4]);
    }

    // =====================================================================
    // Factorizations
    // =====================================================================

    #[test]
    fn test_cholesky_2x2() {
        let upper = vec![vec![4.0, 2.0], vec![3.0]];
        let c = cholesky(&upper).unwrap();
        let u = c.to_upper();
        assert_relative_eq!(u[0][0], 2.0);
        assert_relative_eq!(u[0][1], 1.0);
        assert_relative_eq!(u[1][0], 2.0_f64.sqrt(), epsilon = 1e-15);
        assert_relative_eq!(c.determinant(), 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let upper = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(cholesky(&upper).is_none());
        assert!(cholesky(&[vec![-1.0]]).is_none());
    }

    #[test]
    fn test_ldlt_reconstructs() {
        let upper = vec![
            vec![4.0, 1.0, 0.0, 2.0],
            vec![5.0, -1.0, 0.0],
            vec![-3.0, 1.0],
            vec![6.0],
        ];
        let f = ldlt(&upper).unwrap();
        let a = dense(&upper);
        let n = 4;
        for i in 0..n {
            for j in 0..n {
                let mut v = 0.0;
                for k in 0..=i.min(j) {
                    let lik = if k == i { 1.0 } else { f.get(i, k) };
                    let ljk = if k == j { 1.0 } else { f.get(j, k) };
                    v += lik * f.diagonal(k) * ljk;
                }
                assert_relative_eq!(v, a[i][j], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_ldlt_zero_pivot_is_singular() {
        let upper = vec![vec![1.0, 1.0], vec![1.0]];
        assert!(ldlt(&upper).is_none());
    }

    // =====================================================================
    // Substitution
    // =====================================================================

    #[test]
    fn test_banded_solves_agree() {
        let n = 12;
        let upper = tridiagonal(n);
        let a = dense(&upper);
        let b: Vec<f64> = (0..n).map(|i| (i as f64) - 3.0).collect();
        for f in [cholesky(&upper).unwrap(), ldlt(&upper).unwrap()] {
            let x = f.solve(&b);
            for i in 0..n {
                let ax: f64 = (0..n).map(|j| a[i][j] * x[j]).sum();
                assert_relative_eq!(ax, b[i], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_leading_zero_rhs() {
        let upper = tridiagonal(5);
        let f = ldlt(&upper).unwrap();
        let x = f.solve(&[0.0, 0.0, 0.0, 1.0, 0.0]);
        let a = dense(&upper);
        let ax: f64 = (0..5).map(|j| a[3][j] * x[j]).sum();
        assert_relative_eq!(ax, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_upper() {
        let upper = vec![vec![2.0, 1.0], vec![2.0]];
        let inv = ldlt(&upper).unwrap().inverse_upper();
        // [[2,1],[1,2]]⁻¹ = [[2,-1],[-1,2]] / 3
        assert_relative_eq!(inv[0][0], 2.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(inv[0][1], -1.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(inv[1][0], 2.0 / 3.0, epsilon = 1e-15);
    }

    #[test]
    fn test_ldlt_determinant() {
        let upper = vec![vec![2.0, 1.0], vec![2.0]];
        assert_relative_eq!(ldlt(&upper).unwrap().determinant(), 3.0, epsilon = 1e-15);
    }
}
