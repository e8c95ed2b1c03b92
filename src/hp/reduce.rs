//! Reductions and norms
//!
//! Implicit zeros take part in every reduction: a triangular matrix has a
//! minimum of at most zero and a product of zero. Symmetric matrices count
//! their mirrored off-diagonal entries twice.

use super::HpMatrix;
use crate::config::LOGICAL_ZERO;
use crate::error::{LinalgError, Result};
use crate::linalg::{self, svd};
use crate::storage::Kind;
use crate::unit::Unit;
use crate::value::{RealValue, Relation};
use crate::vectorized;

fn as_integer(x: f64) -> Result<u64> {
    let a = x.abs();
    if a > i64::MAX as f64 || a != a.trunc() {
        return Err(LinalgError::InvalidInput(
            "gcd and lcm need integer values".to_string(),
        ));
    }
    Ok(a as u64)
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl HpMatrix {
    /// Number of logical entries
    fn size(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Whether some logical entries are implicit zeros
    fn has_implicit_zeros(&self) -> bool {
        let stored = match self.kind() {
            Kind::Symmetric => self.size(),
            _ => self.storage.stored_len(),
        };
        stored < self.size()
    }

    /// `Σ f(run)` over the stored runs, mirrored runs weighted twice
    fn weighted<F>(&self, f: F) -> f64
    where
        F: Fn(&[f64]) -> f64,
    {
        let rows = self.storage.raw_rows();
        match self.kind() {
            Kind::Symmetric => rows.iter().map(|r| f(&r[..1]) + 2.0 * f(&r[1..])).sum(),
            _ => rows.iter().map(|r| f(r)).sum(),
        }
    }

    /// Number of logical entries for which `pred` holds
    fn logical_count<F>(&self, pred: F) -> usize
    where
        F: Fn(f64) -> bool,
    {
        let stored = self.weighted(|run| run.iter().filter(|&&x| pred(x)).count() as f64) as usize;
        if self.has_implicit_zeros() && pred(0.0) {
            let explicit = match self.kind() {
                Kind::Symmetric => self.size(),
                _ => self.storage.stored_len(),
            };
            stored + self.size() - explicit
        } else {
            stored
        }
    }

    fn tagged(&self, value: f64) -> RealValue {
        RealValue::with_units(value, self.units)
    }

    /// Smallest entry
    pub fn min(&self) -> RealValue {
        let mut m = self.storage.iter_stored().copied().fold(f64::INFINITY, f64::min);
        if self.has_implicit_zeros() {
            m = m.min(0.0);
        }
        self.tagged(m)
    }

    /// Largest entry
    pub fn max(&self) -> RealValue {
        let mut m = self.storage.iter_stored().copied().fold(f64::NEG_INFINITY, f64::max);
        if self.has_implicit_zeros() {
            m = m.max(0.0);
        }
        self.tagged(m)
    }

    pub fn sum(&self) -> RealValue {
        self.tagged(self.weighted(|run| run.iter().sum()))
    }

    /// Σ aᵢⱼ² in squared units
    pub fn sum_sq(&self) -> RealValue {
        RealValue::with_units(self.weighted(vectorized::sum_sq), Unit::pow_opt(self.units, 2.0))
    }

    /// Square root of the sum of squares
    pub fn srss(&self) -> RealValue {
        self.tagged(self.weighted(vectorized::sum_sq).sqrt())
    }

    /// Arithmetic mean over all `m·n` entries
    pub fn average(&self) -> RealValue {
        self.tagged(self.weighted(|run| run.iter().sum()) / self.size() as f64)
    }

    /// Π aᵢⱼ in units raised to `m·n`
    pub fn product_elements(&self) -> RealValue {
        let units = Unit::pow_opt(self.units, self.size() as f32);
        if self.has_implicit_zeros() {
            return RealValue::with_units(0.0, units);
        }
        let rows = self.storage.raw_rows();
        let p = match self.kind() {
            Kind::Symmetric => rows
                .iter()
                .map(|r| {
                    let off: f64 = r[1..].iter().product();
                    r[0] * off * off
                })
                .product(),
            _ => self.storage.iter_stored().product(),
        };
        RealValue::with_units(p, units)
    }

    /// Geometric mean `(Π aᵢⱼ)^(1/(m·n))`
    pub fn mean(&self) -> RealValue {
        let p = self.product_elements().value;
        self.tagged(p.powf(1.0 / self.size() as f64))
    }

    /// 1 when every entry is logically true
    pub fn and(&self) -> RealValue {
        let all = !self.has_implicit_zeros()
            && self.storage.iter_stored().all(|x| x.abs() >= LOGICAL_ZERO);
        if all {
            RealValue::ONE
        } else {
            RealValue::ZERO
        }
    }

    /// 1 when any entry is logically true
    pub fn or(&self) -> RealValue {
        if self.storage.iter_stored().any(|x| x.abs() >= LOGICAL_ZERO) {
            RealValue::ONE
        } else {
            RealValue::ZERO
        }
    }

    /// 1 when an odd number of entries is logically true
    pub fn xor(&self) -> RealValue {
        if self.logical_count(|x| x.abs() >= LOGICAL_ZERO) % 2 == 1 {
            RealValue::ONE
        } else {
            RealValue::ZERO
        }
    }

    /// Greatest common divisor of the stored values
    ///
    /// # Errors
    ///
    /// `InvalidInput` when a value is not an integer.
    pub fn gcd(&self) -> Result<RealValue> {
        let mut a = 0;
        for &x in self.storage.iter_stored() {
            a = gcd(a, as_integer(x)?);
        }
        Ok(RealValue::new(a as f64))
    }

    /// Least common multiple of the stored values
    pub fn lcm(&self) -> Result<RealValue> {
        let mut it = self.storage.iter_stored();
        let mut a = match it.next() {
            Some(&x) => as_integer(x)?,
            None => return Ok(RealValue::ONE),
        };
        for &x in it {
            let b = as_integer(x)?;
            let g = gcd(a, b);
            a = if g == 0 { 0 } else { a / g * b };
        }
        Ok(RealValue::new(a as f64))
    }

    /// Σ aᵢᵢ
    ///
    /// # Errors
    ///
    /// `MatrixNotSquare` for a rectangular matrix.
    pub fn trace(&self) -> Result<RealValue> {
        if !self.is_square() {
            return Err(LinalgError::MatrixNotSquare);
        }
        Ok(self.tagged(self.storage.diagonal().iter().sum()))
    }

    /// Largest absolute column sum
    pub fn l1_norm(&self) -> RealValue {
        if self.kind() == Kind::Diagonal {
            return self.diagonal_vector().inf_norm();
        }
        if self.kind() == Kind::Symmetric {
            return self.inf_norm();
        }
        let mut sums = vec![0.0; self.cols()];
        for i in 0..self.rows() {
            for (s, x) in sums.iter_mut().zip(self.row_view(i).iter()) {
                *s += x.abs();
            }
        }
        self.tagged(sums.into_iter().fold(0.0, f64::max))
    }

    /// Largest absolute row sum
    pub fn inf_norm(&self) -> RealValue {
        if self.kind() == Kind::Diagonal {
            return self.diagonal_vector().inf_norm();
        }
        let m = (0..self.rows())
            .map(|i| vectorized::sum_abs(&self.row_view(i)))
            .fold(0.0, f64::max);
        self.tagged(m)
    }

    /// Frobenius norm
    pub fn frob_norm(&self) -> RealValue {
        self.srss()
    }

    /// Spectral norm: the largest singular value
    pub fn l2_norm(&self) -> Result<RealValue> {
        if self.kind() == Kind::Diagonal {
            return Ok(self.diagonal_vector().inf_norm());
        }
        let mut rows = self.storage.to_full().into_raw();
        if self.rows() < self.cols() {
            rows = linalg::transpose(&rows);
        }
        let sigma = svd::decompose(&rows)?.sigma;
        Ok(self.tagged(sigma.first().copied().unwrap_or(0.0)))
    }

    /// Number of entries equal to `value`; zero for inconsistent units
    pub fn count(&self, value: RealValue) -> usize {
        self.count_where(value, Relation::Equal)
    }

    /// Number of entries `x` for which `x rel value` holds
    pub fn count_where(&self, value: RealValue, rel: Relation) -> usize {
        match self.target(value) {
            Some(t) => self.logical_count(|x| rel.holds(x, t)),
            None => 0,
        }
    }

    /// Magnitude of `value` in the matrix units, `None` when inconsistent
    pub(super) fn target(&self, value: RealValue) -> Option<f64> {
        if value.value == 0.0 && value.units.is_none() {
            return Some(0.0);
        }
        value.value_in(self.units).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn symmetric() -> HpMatrix {
        // [[2, -1, 0], [-1, 3, 4], [0, 4, 5]]
        let mut s = HpMatrix::symmetric(3).unwrap();
        for (i, j, v) in [(0, 0, 2.0), (0, 1, -1.0), (1, 1, 3.0), (1, 2, 4.0), (2, 2, 5.0)] {
            s.set(i, j, v).unwrap();
        }
        s
    }

    // ========================================================================
    // Reductions
    // ========================================================================

    #[test]
    fn test_symmetric_reductions_match_full() {
        let s = symmetric();
        let f = HpMatrix::from_storage(s.storage().to_full(), None);
        assert_eq!(s.sum(), f.sum());
        assert_eq!(s.sum_sq(), f.sum_sq());
        assert_eq!(s.product_elements().value, 0.0);
        assert_eq!(s.count(RealValue::new(4.0)), 2);
        assert_eq!(s.count(RealValue::ZERO), f.count(RealValue::ZERO));
        assert_eq!(s.l1_norm(), f.l1_norm());
        assert_eq!(s.inf_norm(), f.inf_norm());
    }

    #[test]
    fn test_min_max_clamp_towards_zero() {
        let mut u = HpMatrix::upper_triangular(2).unwrap();
        u.fill(5.0);
        assert_eq!(u.min().value, 0.0);
        assert_eq!(u.max().value, 5.0);
        u.fill(-5.0);
        assert_eq!(u.max().value, 0.0);
        let mut d = HpMatrix::diagonal(1).unwrap();
        d.fill(7.0);
        assert_eq!(d.min().value, 7.0);
    }

    #[test]
    fn test_product_and_mean() {
        let a = HpMatrix::from_rows(&[vec![1.0, 2.0], vec![4.0, 8.0]])
            .unwrap()
            .with_units(Some(Unit::meter()));
        let p = a.product_elements();
        assert_eq!(p.value, 64.0);
        assert_eq!(p.units, Some(Unit::meter().pow(4.0)));
        assert_abs_diff_eq!(a.mean().value, 64f64.powf(0.25), epsilon = 1e-12);
        assert_eq!(a.average().value, 3.75);
        assert_eq!(HpMatrix::identity(2).unwrap().product_elements().value, 0.0);
    }

    #[test]
    fn test_logical_reductions() {
        let id = HpMatrix::identity(3).unwrap();
        assert_eq!(id.and(), RealValue::ZERO);
        assert_eq!(id.or(), RealValue::ONE);
        assert_eq!(id.xor(), RealValue::ONE);
        let tiny = HpMatrix::from_rows(&[vec![1e-13, 1.0]]).unwrap();
        assert_eq!(tiny.and(), RealValue::ZERO);
    }

    #[test]
    fn test_gcd_lcm() {
        let a = HpMatrix::from_rows(&[vec![12.0, 18.0], vec![30.0, 6.0]]).unwrap();
        assert_eq!(a.gcd().unwrap().value, 6.0);
        assert_eq!(a.lcm().unwrap().value, 180.0);
        let b = HpMatrix::from_rows(&[vec![1.5]]).unwrap();
        assert!(matches!(b.gcd(), Err(LinalgError::InvalidInput(_))));
    }

    // ========================================================================
    // Norms
    // ========================================================================

    #[test]
    fn test_norms() {
        let a = HpMatrix::from_rows(&[vec![1.0, -2.0], vec![-3.0, 4.0]]).unwrap();
        assert_eq!(a.l1_norm().value, 6.0);
        assert_eq!(a.inf_norm().value, 7.0);
        assert_abs_diff_eq!(a.frob_norm().value, 30f64.sqrt(), epsilon = 1e-12);
        // σ₁ of [[1, -2], [-3, 4]]
        let expected = ((30.0 + (30.0f64 * 30.0 - 4.0 * 4.0).sqrt()) / 2.0).sqrt();
        assert_abs_diff_eq!(a.l2_norm().unwrap().value, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_l2_norm_of_wide_matrix() {
        let a = HpMatrix::from_rows(&[vec![3.0, 0.0, 4.0]]).unwrap();
        assert_abs_diff_eq!(a.l2_norm().unwrap().value, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_trace_requires_square() {
        let a = HpMatrix::new(2, 3).unwrap();
        assert_eq!(a.trace().unwrap_err(), LinalgError::MatrixNotSquare);
        assert_eq!(symmetric().trace().unwrap().value, 10.0);
    }

    #[test]
    fn test_count_inconsistent_units_is_zero() {
        let a = HpMatrix::identity(2).unwrap().with_units(Some(Unit::meter()));
        assert_eq!(a.count(RealValue::with_units(1.0, Some(Unit::second()))), 0);
        assert_eq!(a.count(RealValue::with_units(100.0, Some(Unit::meter().scaled(0.01)))), 2);
        assert_eq!(a.count(RealValue::ZERO), 2);
    }
}
