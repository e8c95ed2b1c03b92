//! Crout LU decomposition with partial pivoting and implicit row scaling
//!
//! The factors are stored combined: the strict lower triangle holds L (unit
//! diagonal implied) and the upper triangle including the diagonal holds U.
//! Row `i` of the factors corresponds to row `indexes[i]` of the input.

use tracing::{instrument, trace};

use crate::config::NEAR_SINGULAR_PIVOT;
use crate::error::{LinalgError, Result};
use crate::parallel;
use crate::vectorized;

/// Combined L\U factors of a square matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Lu {
    /// L below the diagonal, U on and above it
    pub factors: Vec<Vec<f64>>,
    /// Row permutation: factor row `i` is input row `indexes[i]`
    pub indexes: Vec<usize>,
    /// Smallest scaled pivot seen at a row interchange or the last column
    pub min_pivot: f64,
    /// Determinant sign from the row interchanges (±1)
    pub sign: f64,
}

/// First index in `row[..end]` holding a nonzero
#[inline]
fn leading_zeros(row: &[f64], end: usize) -> usize {
    row[..end].iter().position(|&x| x != 0.0).unwrap_or(end)
}

/// Factorizes the dense square matrix `a` (given as rows)
///
/// Returns `None` when a row is entirely zero, when a pivot column reduces to
/// zero, or when the smallest recorded pivot is exactly zero.
#[instrument(level = "debug", skip(a), fields(n = a.len()))]
pub fn factorize(a: &[Vec<f64>]) -> Option<Lu> {
    let n = a.len();
    let mut lu: Vec<Vec<f64>> = a.to_vec();
    let mut vv = vec![0.0; n];
    for (i, row) in lu.iter().enumerate() {
        let big = row.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
        if big == 0.0 {
            trace!(row = i, "zero row");
            return None;
        }
        vv[i] = 1.0 / big;
    }

    let mut indexes: Vec<usize> = (0..n).collect();
    let mut sign = 1.0;
    let mut min_pivot = f64::MAX;
    let mut col = vec![0.0; n];
    for j in 0..n {
        for (c, row) in col.iter_mut().zip(&lu) {
            *c = row[j];
        }
        for i in 0..j {
            let row = &lu[i];
            let k0 = leading_zeros(row, i);
            col[i] -= vectorized::dot(&row[k0..i], &col[k0..i]);
        }
        let mut big = 0.0;
        let mut imax = j;
        for i in j..n {
            let row = &lu[i];
            let k0 = leading_zeros(row, j);
            col[i] -= vectorized::dot(&row[k0..j], &col[k0..j]);
            let dum = vv[i] * col[i].abs();
            if dum > big {
                big = dum;
                imax = i;
            }
        }
        if big == 0.0 {
            trace!(column = j, "pivot column reduced to zero");
            return None;
        }
        if j != imax {
            min_pivot = min_pivot.min(big);
            lu.swap(j, imax);
            col.swap(j, imax);
            vv[imax] = vv[j];
            indexes.swap(j, imax);
            sign = -sign;
        }
        if j != n - 1 {
            let dum = 1.0 / col[j];
            vectorized::scale(&mut col[j + 1..], dum);
        } else {
            min_pivot = min_pivot.min(big);
        }
        for (row, &c) in lu.iter_mut().zip(&col) {
            row[j] = c;
        }
    }
    if min_pivot == 0.0 {
        return None;
    }
    Some(Lu {
        factors: lu,
        indexes,
        min_pivot,
        sign,
    })
}

/// [`factorize`] with the solve-time failure policy applied
///
/// # Errors
///
/// - `MatrixSingular` when the factorization fails
/// - `MatrixCloseToSingular` when the smallest pivot is below
///   [`NEAR_SINGULAR_PIVOT`]
pub fn factorize_checked(a: &[Vec<f64>]) -> Result<Lu> {
    let lu = factorize(a).ok_or(LinalgError::MatrixSingular)?;
    if lu.min_pivot < NEAR_SINGULAR_PIVOT {
        return Err(LinalgError::MatrixCloseToSingular);
    }
    Ok(lu)
}

impl Lu {
    /// Order of the factorized matrix
    pub fn order(&self) -> usize {
        self.factors.len()
    }

    /// Solves `A·x = b` into `x` by forward then back substitution
    pub fn substitute(&self, b: &[f64], x: &mut [f64]) {
        let n = self.order();
        let mut start: Option<usize> = None;
        for i in 0..n {
            let mut sum = b[self.indexes[i]];
            match start {
                Some(s) => sum -= vectorized::dot(&self.factors[i][s..i], &x[s..i]),
                // Leading zeros of b stay zero through L
                None if sum != 0.0 => start = Some(i),
                None => {}
            }
            x[i] = sum;
        }
        for i in (0..n).rev() {
            let row = &self.factors[i];
            let sum = x[i] - vectorized::dot(&row[i + 1..n], &x[i + 1..n]);
            x[i] = sum / row[i];
        }
    }

    /// Solves `A·x = b`
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let mut x = vec![0.0; self.order()];
        self.substitute(b, &mut x);
        x
    }

    /// Solves for every column in `cols`; returns the solution columns
    pub fn solve_columns(&self, cols: &[Vec<f64>]) -> Vec<Vec<f64>> {
        parallel::map_range(cols.len(), |j| self.solve(&cols[j]))
    }

    /// det(A)
    pub fn determinant(&self) -> f64 {
        self.factors
            .iter()
            .enumerate()
            .fold(self.sign, |det, (i, row)| det * row[i])
    }

    /// A⁻¹ as rows, solved column by column
    pub fn inverse(&self) -> Vec<Vec<f64>> {
        let n = self.order();
        let cols = parallel::map_range(n, |j| {
            let mut e = vec![0.0; n];
            e[j] = 1.0;
            self.solve(&e)
        });
        (0..n).map(|i| cols.iter().map(|c| c[i]).collect()).collect()
    }
}

/// Determinant of the minor of `a` selected by `rows × cols`
fn minor_determinant(a: &[Vec<f64>], rows: &[usize], cols: &[usize]) -> f64 {
    let g = |r: usize, c: usize| a[rows[r]][cols[c]];
    match rows.len() {
        0 => 1.0,
        1 => g(0, 0),
        2 => g(0, 0) * g(1, 1) - g(0, 1) * g(1, 0),
        3 => {
            g(0, 0) * (g(1, 1) * g(2, 2) - g(1, 2) * g(2, 1))
                - g(0, 1) * (g(1, 0) * g(2, 2) - g(1, 2) * g(2, 0))
                + g(0, 2) * (g(1, 0) * g(2, 1) - g(1, 1) * g(2, 0))
        }
        n => {
            let sub_rows = &rows[1..];
            let mut sub_cols = Vec::with_capacity(n - 1);
            let mut det = 0.0;
            for j in 0..n {
                let a0j = g(0, j);
                if a0j == 0.0 {
                    continue;
                }
                sub_cols.clear();
                sub_cols.extend(cols.iter().enumerate().filter(|&(k, _)| k != j).map(|(_, &c)| c));
                let s = if j % 2 == 0 { 1.0 } else { -1.0 };
                det += s * a0j * minor_determinant(a, sub_rows, &sub_cols);
            }
            det
        }
    }
}

/// Adjugate by cofactor expansion; exact for singular matrices
pub fn adjugate_by_minors(a: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = a.len();
    let others = |skip: usize| -> Vec<usize> { (0..n).filter(|&k| k != skip).collect() };
    // Column i of the adjugate holds the cofactors of row i
    let cols = parallel::map_range(n, |i| {
        let sub_rows = others(i);
        (0..n)
            .map(|j| {
                let s = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
                s * minor_determinant(a, &sub_rows, &others(j))
            })
            .collect::<Vec<f64>>()
    });
    (0..n).map(|j| cols.iter().map(|c| c[j]).collect()).collect()
}
