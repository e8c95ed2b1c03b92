//! Crout LU over unit-tagged elements
//!
//! Same scheme as [`crate::linalg::lu`], with every update going through the
//! unit-checked [`RealValue`] arithmetic instead of raw `f64`. Entries may
//! carry different dimensions as long as each update is dimensionally
//! consistent, which is the case for any physically meaningful system such as
//! a stiffness block mixing N/m, N and N·m. Pivots are ranked by magnitude in
//! coherent SI units.

use tracing::{instrument, trace};

use crate::config::NEAR_SINGULAR_PIVOT;
use crate::error::{LinalgError, Result};
use crate::parallel;
use crate::storage::Arithmetic;
use crate::value::RealValue;

/// |x| in coherent SI units
#[inline]
pub(crate) fn magnitude(x: &RealValue) -> f64 {
    x.value.abs() * x.units.map_or(1.0, |u| u.factor())
}

#[inline]
fn leading_zeros(row: &[RealValue], end: usize) -> usize {
    row[..end].iter().position(|x| x.value != 0.0).unwrap_or(end)
}

/// Combined L\U factors of a square unit-tagged matrix
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RealLu {
    /// L below the diagonal, U on and above it
    pub factors: Vec<Vec<RealValue>>,
    /// Factor row `i` is input row `indexes[i]`
    pub indexes: Vec<usize>,
    pub min_pivot: f64,
    pub sign: f64,
}

/// Factorizes the dense square matrix `a`
///
/// `Ok(None)` for a zero row, a pivot column that reduces to zero, or an
/// exactly zero smallest pivot.
///
/// # Errors
///
/// `InconsistentUnits` when an update subtracts values of different
/// dimensions.
#[instrument(level = "debug", skip(a), fields(n = a.len()))]
pub(crate) fn factorize(a: &[Vec<RealValue>]) -> Result<Option<RealLu>> {
    let n = a.len();
    let mut lu: Vec<Vec<RealValue>> = a.to_vec();
    let mut vv = vec![0.0; n];
    for (i, row) in lu.iter().enumerate() {
        let big = row.iter().fold(0.0_f64, |m, x| m.max(magnitude(x)));
        if big == 0.0 {
            trace!(row = i, "zero row");
            return Ok(None);
        }
        vv[i] = 1.0 / big;
    }

    let mut indexes: Vec<usize> = (0..n).collect();
    let mut sign = 1.0;
    let mut min_pivot = f64::MAX;
    let mut col = vec![RealValue::ZERO; n];
    for j in 0..n {
        for (c, row) in col.iter_mut().zip(&lu) {
            *c = row[j];
        }
        for i in 0..j {
            let row = &lu[i];
            let k0 = leading_zeros(row, i);
            col[i] = col[i].sub(RealValue::dot(&row[k0..i], &col[k0..i])?)?;
        }
        let mut big = 0.0;
        let mut imax = j;
        for i in j..n {
            let row = &lu[i];
            let k0 = leading_zeros(row, j);
            col[i] = col[i].sub(RealValue::dot(&row[k0..j], &col[k0..j])?)?;
            let dum = vv[i] * magnitude(&col[i]);
            if dum > big {
                big = dum;
                imax = i;
            }
        }
        if big == 0.0 {
            trace!(column = j, "pivot column reduced to zero");
            return Ok(None);
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
            let inv = RealValue::ONE.div(col[j]);
            for c in &mut col[j + 1..] {
                *c = c.try_mul(inv)?;
            }
        } else {
            min_pivot = min_pivot.min(big);
        }
        for (row, &c) in lu.iter_mut().zip(&col) {
            row[j] = c;
        }
    }
    if min_pivot == 0.0 {
        return Ok(None);
    }
    Ok(Some(RealLu {
        factors: lu,
        indexes,
        min_pivot,
        sign,
    }))
}

/// [`factorize`] with the solve-time failure policy applied
pub(crate) fn factorize_checked(a: &[Vec<RealValue>]) -> Result<RealLu> {
    let lu = factorize(a)?.ok_or(LinalgError::MatrixSingular)?;
    if lu.min_pivot < NEAR_SINGULAR_PIVOT {
        return Err(LinalgError::MatrixCloseToSingular);
    }
    Ok(lu)
}

impl RealLu {
    pub fn order(&self) -> usize {
        self.factors.len()
    }

    /// Solves `A·x = b`; `x` comes out in the units of `b / A`
    pub fn solve(&self, b: &[RealValue]) -> Result<Vec<RealValue>> {
        let n = self.order();
        let mut x = vec![RealValue::ZERO; n];
        let mut start: Option<usize> = None;
        for i in 0..n {
            let mut sum = b[self.indexes[i]];
            match start {
                Some(s) => sum = sum.sub(RealValue::dot(&self.factors[i][s..i], &x[s..i])?)?,
                None if sum.value != 0.0 => start = Some(i),
                None => {}
            }
            x[i] = sum;
        }
        for i in (0..n).rev() {
            let row = &self.factors[i];
            let sum = x[i].sub(RealValue::dot(&row[i + 1..n], &x[i + 1..n])?)?;
            x[i] = sum.div(row[i]);
        }
        Ok(x)
    }

    /// Solves for every column in `cols`
    pub fn solve_columns(&self, cols: &[Vec<RealValue>]) -> Result<Vec<Vec<RealValue>>> {
        parallel::try_map_range(cols.len(), |j| self.solve(&cols[j]))
    }

    /// det(A) in the product of the pivot units
    pub fn determinant(&self) -> RealValue {
        self.factors
            .iter()
            .enumerate()
            .fold(RealValue::new(self.sign), |det, (i, row)| det.mul(row[i]))
    }

    /// A⁻¹ as rows
    pub fn inverse(&self) -> Result<Vec<Vec<RealValue>>> {
        let n = self.order();
        let cols = parallel::try_map_range(n, |j| {
            let mut e = vec![RealValue::ZERO; n];
            e[j] = RealValue::ONE;
            self.solve(&e)
        })?;
        Ok((0..n).map(|i| cols.iter().map(|c| c[i]).collect()).collect())
    }
}

fn minor_determinant(a: &[Vec<RealValue>], rows: &[usize], cols: &[usize]) -> Result<RealValue> {
    let g = |r: usize, c: usize| a[rows[r]][cols[c]];
    let cross = |p: RealValue, q: RealValue, r: RealValue, s: RealValue| -> Result<RealValue> {
        p.try_mul(q)?.sub(r.try_mul(s)?)
    };
    match rows.len() {
        0 => Ok(RealValue::ONE),
        1 => Ok(g(0, 0)),
        2 => cross(g(0, 0), g(1, 1), g(0, 1), g(1, 0)),
        n => {
            let sub_rows = &rows[1..];
            let mut sub_cols = Vec::with_capacity(n - 1);
            let mut det = RealValue::ZERO;
            for j in 0..n {
                let a0j = g(0, j);
                if a0j.value == 0.0 {
                    continue;
                }
                sub_cols.clear();
                sub_cols.extend(cols.iter().enumerate().filter(|&(k, _)| k != j).map(|(_, &c)| c));
                let term = a0j.try_mul(minor_determinant(a, sub_rows, &sub_cols)?)?;
                det = if j % 2 == 0 { det.add(term)? } else { det.sub(term)? };
            }
            Ok(det)
        }
    }
}

/// Adjugate by cofactor expansion; exact for singular matrices
pub(crate) fn adjugate_by_minors(a: &[Vec<RealValue>]) -> Result<Vec<Vec<RealValue>>> {
    let n = a.len();
    let others = |skip: usize| -> Vec<usize> { (0..n).filter(|&k| k != skip).collect() };
    // Column i of the adjugate holds the cofactors of row i
    let cols = parallel::try_map_range(n, |i| {
        let sub_rows = others(i);
        (0..n)
            .map(|j| {
                let minor = minor_determinant(a, &sub_rows, &others(j))?;
                Ok(if (i + j) % 2 == 0 { minor } else { minor.neg() })
            })
            .collect::<Result<Vec<RealValue>>>()
    })?;
    Ok((0..n).map(|j| cols.iter().map(|c| c[j]).collect()).collect())
}

/// Maximum column sum of magnitudes
pub(crate) fn norm_1(a: &[Vec<RealValue>]) -> f64 {
    let n = a.first().map_or(0, Vec::len);
    (0..n)
        .map(|j| a.iter().map(|r| magnitude(&r[j])).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Maximum row sum of magnitudes
pub(crate) fn norm_inf(a: &[Vec<RealValue>]) -> f64 {
    a.iter()
        .map(|r| r.iter().map(magnitude).sum::<f64>())
        .fold(0.0, f64::max)
}

pub(crate) fn norm_frob(a: &[Vec<RealValue>]) -> f64 {
    a.iter()
        .flatten()
        .map(|x| magnitude(x).powi(2))
        .sum::<f64>()
        .sqrt()
}
