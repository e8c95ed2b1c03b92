//! Scalar values and the binary-operator dispatch table
//!
//! [`RealValue`] is the element type of the unit-tagged [`crate::Matrix`]
//! family: a magnitude plus an optional unit. [`BinaryOp`] maps the operator
//! symbols of the calculation language onto value-level arithmetic and knows
//! which operators preserve zero, which is what lets the structured matrix
//! kinds keep their packed storage through an operation.

use std::cmp::Ordering;
use std::fmt;

use crate::config::LOGICAL_ZERO;
use crate::error::{LinalgError, Result};
use crate::unit::Unit;

/// Relative tolerance of [`almost_equals`]
const ALMOST_EQUAL_EPS: f64 = 1e-12;

/// Tolerant float equality used by search and comparison operators
pub fn almost_equals(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    let scale = a.abs().max(b.abs());
    if scale < 1.0 {
        diff <= ALMOST_EQUAL_EPS
    } else {
        diff <= ALMOST_EQUAL_EPS * scale
    }
}

/// A magnitude with an optional physical unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RealValue {
    /// Magnitude in `units`
    pub value: f64,
    /// Unit tag; `None` means dimensionless
    pub units: Option<Unit>,
}

impl Default for RealValue {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<f64> for RealValue {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl RealValue {
    /// Dimensionless zero
    pub const ZERO: RealValue = RealValue {
        value: 0.0,
        units: None,
    };
    /// Dimensionless one
    pub const ONE: RealValue = RealValue {
        value: 1.0,
        units: None,
    };
    /// Dimensionless NaN
    pub const NAN: RealValue = RealValue {
        value: f64::NAN,
        units: None,
    };
    /// Dimensionless +∞
    pub const POSITIVE_INFINITY: RealValue = RealValue {
        value: f64::INFINITY,
        units: None,
    };

    /// Dimensionless value
    pub const fn new(value: f64) -> Self {
        Self { value, units: None }
    }

    /// Value with units
    pub const fn with_units(value: f64, units: Option<Unit>) -> Self {
        Self { value, units }
    }

    /// Zero regardless of units
    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }

    /// Logical truth (magnitude at or above the logical-zero threshold)
    pub fn is_true(&self) -> bool {
        self.value.abs() >= LOGICAL_ZERO
    }

    fn truth(b: bool) -> Self {
        if b {
            Self::ONE
        } else {
            Self::ZERO
        }
    }

    /// Magnitude of `self` expressed in `units`
    pub fn value_in(&self, units: Option<Unit>) -> Result<f64> {
        Ok(self.value * Unit::convert(units, self.units)?)
    }

    /// Tolerant equality after unit conversion; inconsistent units are unequal
    pub fn almost_equals(&self, other: &RealValue) -> bool {
        match Unit::convert(self.units, other.units) {
            Ok(d) => almost_equals(self.value, other.value * d),
            Err(_) => false,
        }
    }

    /// Sum in the left operand's units
    pub fn add(self, other: RealValue) -> Result<RealValue> {
        if other.value == 0.0 && other.units.is_none() {
            return Ok(self);
        }
        if self.value == 0.0 && self.units.is_none() {
            return Ok(other);
        }
        let d = Unit::convert(self.units, other.units)?;
        Ok(Self::with_units(self.value + other.value * d, self.units))
    }

    /// Difference in the left operand's units
    pub fn sub(self, other: RealValue) -> Result<RealValue> {
        if other.value == 0.0 && other.units.is_none() {
            return Ok(self);
        }
        if self.value == 0.0 && self.units.is_none() {
            return Ok(other.neg());
        }
        let d = Unit::convert(self.units, other.units)?;
        Ok(Self::with_units(self.value - other.value * d, self.units))
    }

    /// Product with unit folding
    pub fn mul(self, other: RealValue) -> RealValue {
        let (units, d) = Unit::multiply(self.units, other.units);
        Self::with_units(self.value * other.value * d, units)
    }

    /// Quotient with unit folding
    pub fn div(self, other: RealValue) -> RealValue {
        let (units, d) = Unit::divide(self.units, other.units);
        Self::with_units(self.value / other.value * d, units)
    }

    /// Remainder; the divisor must be dimensionless and `x % 0` is NaN
    pub fn rem(self, other: RealValue) -> Result<RealValue> {
        if other.units.is_some() {
            return Err(LinalgError::CannotEvaluateRemainder);
        }
        if other.value == 0.0 {
            return Ok(Self::with_units(f64::NAN, self.units));
        }
        Ok(Self::with_units(self.value % other.value, self.units))
    }

    /// Power with a dimensionless exponent
    pub fn pow(self, other: RealValue) -> Result<RealValue> {
        if other.units.is_some() {
            return Err(LinalgError::InvalidInput(
                "exponent must be dimensionless".to_string(),
            ));
        }
        let units = Unit::pow_opt(self.units, other.value as f32);
        Ok(Self::with_units(self.value.powf(other.value), units))
    }

    /// Negation
    pub fn neg(self) -> RealValue {
        Self::with_units(-self.value, self.units)
    }

    /// Absolute value
    pub fn abs(self) -> RealValue {
        Self::with_units(self.value.abs(), self.units)
    }

    /// Square root (units^½)
    pub fn sqrt(self) -> RealValue {
        Self::with_units(self.value.sqrt(), Unit::pow_opt(self.units, 0.5))
    }

    /// Orders two values after converting `other` into `self`'s units
    pub fn compare(&self, other: &RealValue) -> Result<Ordering> {
        let b = other.value * self.factor_from(other)?;
        Ok(self.value.partial_cmp(&b).unwrap_or(Ordering::Equal))
    }

    /// Conversion factor from `other`'s units into `self`'s; a unit-less zero
    /// on either side is compatible with anything
    fn factor_from(&self, other: &RealValue) -> Result<f64> {
        let polymorphic = |v: &RealValue| v.value == 0.0 && v.units.is_none();
        if polymorphic(self) || polymorphic(other) {
            return Ok(1.0);
        }
        Unit::convert(self.units, other.units)
    }

    fn relate(self, other: RealValue, rel: Relation) -> Result<RealValue> {
        let b = other.value * self.factor_from(&other)?;
        Ok(Self::truth(rel.holds(self.value, b)))
    }
}

impl fmt::Display for RealValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.units {
            Some(u) => write!(f, "{} {}", self.value, u),
            None => write!(f, "{}", self.value),
        }
    }
}

/// Relation used by comparisons, search and lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// ≡ (tolerant)
    Equal,
    /// ≠ (tolerant)
    NotEqual,
    /// <
    Less,
    /// >
    Greater,
    /// ≤ (tolerant)
    LessOrEqual,
    /// ≥ (tolerant)
    GreaterOrEqual,
}

impl Relation {
    /// Evaluates `a rel b` with tolerant equality
    pub fn holds(self, a: f64, b: f64) -> bool {
        match self {
            Relation::Equal => almost_equals(a, b),
            Relation::NotEqual => !almost_equals(a, b),
            Relation::Less => a < b && !almost_equals(a, b),
            Relation::Greater => a > b && !almost_equals(a, b),
            Relation::LessOrEqual => a <= b || almost_equals(a, b),
            Relation::GreaterOrEqual => a >= b || almost_equals(a, b),
        }
    }
}

/// Binary operators of the calculation language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*` (scalar or element-wise product; matrix × matrix uses the product dispatch)
    Mul,
    /// `/`
    Div,
    /// `⦼`
    Rem,
    /// `^`
    Pow,
    /// `≡`
    Eq,
    /// `≠`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `≤`
    Le,
    /// `≥`
    Ge,
    /// `∧`
    And,
    /// `∨`
    Or,
    /// `⊕`
    Xor,
}

impl BinaryOp {
    /// Operator symbol as written in expressions
    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
            BinaryOp::Rem => '⦼',
            BinaryOp::Pow => '^',
            BinaryOp::Eq => '≡',
            BinaryOp::Ne => '≠',
            BinaryOp::Lt => '<',
            BinaryOp::Gt => '>',
            BinaryOp::Le => '≤',
            BinaryOp::Ge => '≥',
            BinaryOp::And => '∧',
            BinaryOp::Or => '∨',
            BinaryOp::Xor => '⊕',
        }
    }

    /// Looks an operator up by its symbol
    pub fn from_symbol(c: char) -> Option<Self> {
        Some(match c {
            '+' => BinaryOp::Add,
            '-' => BinaryOp::Sub,
            '*' => BinaryOp::Mul,
            '/' => BinaryOp::Div,
            '⦼' | '%' => BinaryOp::Rem,
            '^' => BinaryOp::Pow,
            '≡' => BinaryOp::Eq,
            '≠' => BinaryOp::Ne,
            '<' => BinaryOp::Lt,
            '>' => BinaryOp::Gt,
            '≤' => BinaryOp::Le,
            '≥' => BinaryOp::Ge,
            '∧' => BinaryOp::And,
            '∨' => BinaryOp::Or,
            '⊕' => BinaryOp::Xor,
            _ => return None,
        })
    }

    /// `op(0, 0) == 0`, so two packed operands of the same kind stay packed
    pub fn is_zero_preserving(self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Xor
        )
    }

    /// Comparison and logical operators produce unit-less 0/1 results
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::Le
                | BinaryOp::Ge
                | BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Xor
        )
    }

    pub(crate) fn relation(self) -> Option<Relation> {
        Some(match self {
            BinaryOp::Eq => Relation::Equal,
            BinaryOp::Ne => Relation::NotEqual,
            BinaryOp::Lt => Relation::Less,
            BinaryOp::Gt => Relation::Greater,
            BinaryOp::Le => Relation::LessOrEqual,
            BinaryOp::Ge => Relation::GreaterOrEqual,
            _ => return None,
        })
    }

    /// Applies the operator to two values
    pub fn apply(self, a: RealValue, b: RealValue) -> Result<RealValue> {
        match self {
            BinaryOp::Add => a.add(b),
            BinaryOp::Sub => a.sub(b),
            BinaryOp::Mul => Ok(a.mul(b)),
            BinaryOp::Div => Ok(a.div(b)),
            BinaryOp::Rem => a.rem(b),
            BinaryOp::Pow => a.pow(b),
            BinaryOp::And => Ok(RealValue::truth(a.is_true() && b.is_true())),
            BinaryOp::Or => Ok(RealValue::truth(a.is_true() || b.is_true())),
            BinaryOp::Xor => Ok(RealValue::truth(a.is_true() != b.is_true())),
            rel => match rel.relation() {
                Some(r) => a.relate(b, r),
                None => Err(LinalgError::InvalidInput(format!(
                    "operator {} is not a relation",
                    rel.symbol()
                ))),
            },
        }
    }

    /// Applies the operator to raw magnitudes already in common units
    ///
    /// Used by the HP family after the right operand has been converted.
    pub fn apply_raw(self, a: f64, b: f64) -> f64 {
        let truth = |v: bool| if v { 1.0 } else { 0.0 };
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Rem => {
                if b == 0.0 {
                    f64::NAN
                } else {
                    a % b
                }
            }
            BinaryOp::Pow => a.powf(b),
            BinaryOp::And => truth(a.abs() >= LOGICAL_ZERO && b.abs() >= LOGICAL_ZERO),
            BinaryOp::Or => truth(a.abs() >= LOGICAL_ZERO || b.abs() >= LOGICAL_ZERO),
            BinaryOp::Xor => truth((a.abs() >= LOGICAL_ZERO) != (b.abs() >= LOGICAL_ZERO)),
            BinaryOp::Eq => truth(Relation::Equal.holds(a, b)),
            BinaryOp::Ne => truth(Relation::NotEqual.holds(a, b)),
            BinaryOp::Lt => truth(Relation::Less.holds(a, b)),
            BinaryOp::Gt => truth(Relation::Greater.holds(a, b)),
            BinaryOp::Le => truth(Relation::LessOrEqual.holds(a, b)),
            BinaryOp::Ge => truth(Relation::GreaterOrEqual.holds(a, b)),
        }
    }
}
