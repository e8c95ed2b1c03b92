//! Reductions, norms and interpolation
//!
//! Numeric reductions convert into an [`HpMatrix`] first and report in the
//! units of the first unit-bearing element. Logical reductions and `take`
//! look at each element as it is and never fail on mixed units.

use super::Matrix;
use crate::error::Result;
use crate::hp::interpolate::nearest;
use crate::hp::HpMatrix;
use crate::value::RealValue;

impl Matrix {
    /// 0/1 copy of the matrix, same kind
    fn truth(&self) -> HpMatrix {
        let storage = self
            .storage
            .map(|v| if v.is_true() { 1.0 } else { 0.0 });
        HpMatrix::from_storage(storage, None)
    }

    /// Smallest entry, implicit zeros included
    ///
    /// # Errors
    ///
    /// `InconsistentUnits` when the elements do not share a dimension.
    ///
    /// # Example
    ///
    /// ```
    /// use trueno_linalg::{Kind, Matrix, RealValue};
    ///
    /// let u = Matrix::from_fn(Kind::UpperTriangular, 2, 2, |_, _| RealValue::new(3.0)).unwrap();
    /// assert_eq!(u.min().unwrap().value, 0.0);
    /// assert_eq!(u.max().unwrap().value, 3.0);
    /// ```
    pub fn min(&self) -> Result<RealValue> {
        Ok(self.to_hp()?.min())
    }

    pub fn max(&self) -> Result<RealValue> {
        Ok(self.to_hp()?.max())
    }

    pub fn sum(&self) -> Result<RealValue> {
        Ok(self.to_hp()?.sum())
    }

    /// Sum of squares, in units²
    pub fn sum_sq(&self) -> Result<RealValue> {
        Ok(self.to_hp()?.sum_sq())
    }

    /// Square root of the sum of squares
    pub fn srss(&self) -> Result<RealValue> {
        Ok(self.to_hp()?.srss())
    }

    pub fn average(&self) -> Result<RealValue> {
        Ok(self.to_hp()?.average())
    }

    /// Product of all entries; zero whenever the kind has implicit zeros
    pub fn product_elements(&self) -> Result<RealValue> {
        Ok(self.to_hp()?.product_elements())
    }

    /// Geometric mean
    pub fn mean(&self) -> Result<RealValue> {
        Ok(self.to_hp()?.mean())
    }

    /// 1 when every entry is logically true
    pub fn and(&self) -> RealValue {
        self.truth().and()
    }

    pub fn or(&self) -> RealValue {
        self.truth().or()
    }

    /// 1 when an odd number of entries is logically true
    pub fn xor(&self) -> RealValue {
        self.truth().xor()
    }

    /// Greatest common divisor of the entries
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a non-integer entry.
    pub fn gcd(&self) -> Result<RealValue> {
        self.to_hp()?.gcd()
    }

    pub fn lcm(&self) -> Result<RealValue> {
        self.to_hp()?.lcm()
    }

    /// Sum of the diagonal
    pub fn trace(&self) -> Result<RealValue> {
        self.to_hp()?.trace()
    }

    /// Maximum absolute column sum
    pub fn l1_norm(&self) -> Result<RealValue> {
        Ok(self.to_hp()?.l1_norm())
    }

    /// Maximum absolute row sum
    pub fn inf_norm(&self) -> Result<RealValue> {
        Ok(self.to_hp()?.inf_norm())
    }

    pub fn frob_norm(&self) -> Result<RealValue> {
        Ok(self.to_hp()?.frob_norm())
    }

    /// Largest singular value
    pub fn l2_norm(&self) -> Result<RealValue> {
        self.to_hp()?.l2_norm()
    }

    /// Element nearest to the 1-based coordinates `(x, y)`, NaN outside
    pub fn take(&self, x: f64, y: f64) -> RealValue {
        match nearest(x, y, self.rows(), self.cols()) {
            Some((i, j)) => self.get(i, j),
            None => RealValue::NAN,
        }
    }

    /// Bilinear interpolation; `x` runs along the columns
    pub fn line(&self, x: f64, y: f64) -> Result<RealValue> {
        Ok(self.to_hp()?.line(x, y))
    }

    /// Hermite spline interpolation, first along the rows then across
    pub fn spline(&self, x: f64, y: f64) -> Result<RealValue> {
        Ok(self.to_hp()?.spline(x, y))
    }
}
