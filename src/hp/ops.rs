//! Element-wise operators with one unit conversion per call

use super::HpMatrix;
use crate::error::{LinalgError, Result};
use crate::storage::dispatch;
use crate::unit::Unit;
use crate::value::{BinaryOp, RealValue};

/// How the magnitudes of one operation are combined
///
/// The right operand is multiplied by `right` before the raw operator runs,
/// and the raw result by `result`.
#[derive(Debug, Clone, Copy)]
struct Plan {
    units: Option<Unit>,
    right: f64,
    result: f64,
}

impl Plan {
    /// `exponent` is the scalar exponent of `^`, when there is a single one
    fn new(op: BinaryOp, left: Option<Unit>, right: Option<Unit>, exponent: Option<f64>) -> Result<Self> {
        let plain = |units| Plan {
            units,
            right: 1.0,
            result: 1.0,
        };
        Ok(match op {
            BinaryOp::Add | BinaryOp::Sub => Plan {
                right: Unit::convert(left, right)?,
                ..plain(left)
            },
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => Plan {
                right: Unit::convert(left, right)?,
                ..plain(None)
            },
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => plain(None),
            BinaryOp::Mul => {
                let (units, d) = Unit::multiply(left, right);
                Plan {
                    result: d,
                    ..plain(units)
                }
            }
            BinaryOp::Div => {
                let (units, d) = Unit::divide(left, right);
                Plan {
                    result: d,
                    ..plain(units)
                }
            }
            BinaryOp::Rem => {
                if right.is_some() {
                    return Err(LinalgError::CannotEvaluateRemainder);
                }
                plain(left)
            }
            BinaryOp::Pow => {
                if right.is_some() {
                    return Err(LinalgError::InvalidInput(
                        "exponent must be dimensionless".to_string(),
                    ));
                }
                match (left, exponent) {
                    (None, _) => plain(None),
                    (Some(_), Some(p)) => plain(Unit::pow_opt(left, p as f32)),
                    (Some(_), None) => {
                        return Err(LinalgError::InvalidInput(
                            "element-wise exponents need a dimensionless base".to_string(),
                        ))
                    }
                }
            }
        })
    }

    #[inline]
    fn eval(&self, op: BinaryOp, a: f64, b: f64) -> f64 {
        let r = op.apply_raw(a, b * self.right);
        if self.result == 1.0 {
            r
        } else {
            r * self.result
        }
    }
}

/// A unit-less zero operand of `+ -` or a comparison takes the matrix units
fn zero_fits(op: BinaryOp, v: RealValue) -> bool {
    v.value == 0.0
        && v.units.is_none()
        && (matches!(op, BinaryOp::Add | BinaryOp::Sub) || op.is_relational())
}

impl HpMatrix {
    /// `self op other`, element by element
    ///
    /// [`BinaryOp::Mul`] between two matrices is the matrix product; use
    /// [`HpMatrix::hadamard`] for the element-wise one. Comparison and
    /// logical operators return a unit-less 0/1 matrix.
    ///
    /// # Errors
    ///
    /// - `MatrixDimensions` on a shape mismatch
    /// - `InconsistentUnits` when `+ -` or a comparison mixes dimensions
    /// - `CannotEvaluateRemainder` when the divisor of `%` carries units
    ///
    /// # Example
    ///
    /// ```
    /// use trueno_linalg::{BinaryOp, HpMatrix, Kind};
    ///
    /// let d = HpMatrix::identity(3).unwrap();
    /// let sum = d.apply(BinaryOp::Add, &d).unwrap();
    /// assert_eq!(sum.kind(), Kind::Diagonal);
    /// let eq = d.apply(BinaryOp::Eq, &d).unwrap();
    /// assert_eq!(eq.kind(), Kind::Full);
    /// assert_eq!(eq.get(0, 1), 1.0);
    /// ```
    pub fn apply(&self, op: BinaryOp, other: &HpMatrix) -> Result<HpMatrix> {
        if op == BinaryOp::Mul {
            return self.product(other);
        }
        let plan = Plan::new(op, self.units, other.units, None)?;
        let storage = dispatch::zip(
            &self.storage,
            &other.storage,
            op.is_zero_preserving(),
            |a, b| Ok(plan.eval(op, a, b)),
        )?;
        Ok(HpMatrix::from_storage(storage, plan.units))
    }

    /// `self op b` for a scalar `b`
    ///
    /// The result keeps the kind whenever `0 op b == 0`, so scaling a
    /// triangular matrix stays triangular while adding a constant to it
    /// materializes a `Full` matrix.
    pub fn apply_scalar(&self, op: BinaryOp, b: RealValue) -> Result<HpMatrix> {
        let b_units = if zero_fits(op, b) { self.units } else { b.units };
        let plan = Plan::new(op, self.units, b_units, Some(b.value))?;
        let bv = b.value;
        let preserves_zero = plan.eval(op, 0.0, bv) == 0.0;
        let storage = dispatch::map(&self.storage, preserves_zero, |a| Ok(plan.eval(op, a, bv)))?;
        Ok(HpMatrix::from_storage(storage, plan.units))
    }

    /// `a op self` for a scalar `a`
    pub fn scalar_apply(a: RealValue, op: BinaryOp, m: &HpMatrix) -> Result<HpMatrix> {
        let a_units = if zero_fits(op, a) { m.units } else { a.units };
        if op == BinaryOp::Pow && m.units.is_some() {
            return Err(LinalgError::InvalidInput(
                "exponent must be dimensionless".to_string(),
            ));
        }
        let plan = Plan::new(op, a_units, m.units, None)?;
        let av = a.value;
        let preserves_zero = plan.eval(op, av, 0.0) == 0.0;
        let storage = dispatch::map(&m.storage, preserves_zero, |x| Ok(plan.eval(op, av, x)))?;
        Ok(HpMatrix::from_storage(storage, plan.units))
    }

    /// `-self`, same kind
    pub fn neg(&self) -> HpMatrix {
        self.derived(self.storage.map(|x| -x))
    }

    /// Multiplies every stored value by `d` in place
    pub fn scale(&mut self, d: f64) {
        crate::parallel::for_each_mut(self.storage.raw_rows_mut(), |_, row| {
            crate::vectorized::scale(row, d)
        });
    }

    /// Element-wise product with multiplied units
    pub fn hadamard(&self, other: &HpMatrix) -> Result<HpMatrix> {
        let (units, d) = Unit::multiply(self.units, other.units);
        let mut r = HpMatrix::from_storage(dispatch::hadamard(&self.storage, &other.storage)?, units);
        if d != 1.0 {
            r.scale(d);
        }
        Ok(r)
    }

    /// Kronecker product `self ⊗ other`
    pub fn kronecker(&self, other: &HpMatrix) -> Result<HpMatrix> {
        let (units, d) = Unit::multiply(self.units, other.units);
        let mut r = HpMatrix::from_storage(dispatch::kronecker(&self.storage, &other.storage)?, units);
        if d != 1.0 {
            r.scale(d);
        }
        Ok(r)
    }

    /// Frobenius inner product `Σ aᵢⱼ·bᵢⱼ`
    pub fn frobenius(&self, other: &HpMatrix) -> Result<RealValue> {
        let (units, d) = Unit::multiply(self.units, other.units);
        let sum = dispatch::frobenius(&self.storage, &other.storage)?;
        Ok(RealValue::with_units(sum * d, units))
    }
}
