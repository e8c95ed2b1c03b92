//! Element-wise operators and products with per-element unit handling

use super::Matrix;
use crate::error::Result;
use crate::storage::dispatch;
use crate::value::{BinaryOp, RealValue};
use crate::vector::Vector;

/// Whether `f(0)` is exactly zero, so a packed kind can stay packed
fn keeps_zero<F>(f: F) -> bool
where
    F: Fn(RealValue) -> Result<RealValue>,
{
    f(RealValue::ZERO).map(|r| r.is_zero()).unwrap_or(false)
}

impl Matrix {
    /// `self op other`, element by element
    ///
    /// [`BinaryOp::Mul`] between two matrices is the matrix product; use
    /// [`Matrix::hadamard`] for the element-wise one.
    ///
    /// # Errors
    ///
    /// - `MatrixDimensions` on a shape mismatch
    /// - `InconsistentUnits` when `+ -` or a comparison mixes dimensions
    /// - `CannotEvaluateRemainder` when a divisor carries units
    ///
    /// # Example
    ///
    /// ```
    /// use trueno_linalg::{BinaryOp, Kind, Matrix, RealValue};
    ///
    /// let u = Matrix::from_fn(Kind::UpperTriangular, 2, 2, |_, _| RealValue::ONE).unwrap();
    /// let sum = u.apply(BinaryOp::Add, &u).unwrap();
    /// assert_eq!(sum.kind(), Kind::UpperTriangular);
    /// assert_eq!(sum.get(0, 1).value, 2.0);
    /// ```
    pub fn apply(&self, op: BinaryOp, other: &Matrix) -> Result<Matrix> {
        if op == BinaryOp::Mul {
            return self.product(other);
        }
        let storage = dispatch::zip(
            &self.storage,
            &other.storage,
            op.is_zero_preserving(),
            |a, b| op.apply(a, b),
        )?;
        Ok(Matrix::from_storage(storage))
    }

    /// `self op b` for a scalar `b`; the kind survives whenever `0 op b == 0`
    pub fn apply_scalar(&self, op: BinaryOp, b: RealValue) -> Result<Matrix> {
        let f = |a: RealValue| op.apply(a, b);
        let storage = dispatch::map(&self.storage, keeps_zero(f), f)?;
        Ok(Matrix::from_storage(storage))
    }

    /// `a op self` for a scalar `a`
    pub fn scalar_apply(a: RealValue, op: BinaryOp, m: &Matrix) -> Result<Matrix> {
        let f = |x: RealValue| op.apply(a, x);
        let storage = dispatch::map(&m.storage, keeps_zero(f), f)?;
        Ok(Matrix::from_storage(storage))
    }

    /// `-self`, same kind
    pub fn neg(&self) -> Matrix {
        Matrix::from_storage(self.storage.map(RealValue::neg))
    }

    /// Matrix product `self · other`, dispatched on the kind pair
    ///
    /// Units are folded per term, so mixed-unit rows sum correctly as long
    /// as each dot product is dimensionally consistent.
    pub fn product(&self, other: &Matrix) -> Result<Matrix> {
        Ok(Matrix::from_storage(dispatch::product(
            &self.storage,
            &other.storage,
        )?))
    }

    /// `self · v` as a vector
    pub fn product_vector(&self, v: &Vector) -> Result<Vector> {
        let c = self.product(&Matrix::from_vector(v)?)?;
        Ok(Vector::from(c.storage.col(0)))
    }

    /// Element-wise product
    pub fn hadamard(&self, other: &Matrix) -> Result<Matrix> {
        Ok(Matrix::from_storage(dispatch::hadamard(
            &self.storage,
            &other.storage,
        )?))
    }

    /// Kronecker product `self ⊗ other`
    pub fn kronecker(&self, other: &Matrix) -> Result<Matrix> {
        Ok(Matrix::from_storage(dispatch::kronecker(
            &self.storage,
            &other.storage,
        )?))
    }

    /// Frobenius inner product `Σ aᵢⱼ·bᵢⱼ`
    pub fn frobenius(&self, other: &Matrix) -> Result<RealValue> {
        dispatch::frobenius(&self.storage, &other.storage)
    }
}
