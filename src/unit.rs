//! Physical units attached to values and HP matrices
//!
//! A [`Unit`] is a vector of powers over the seven SI base dimensions plus a
//! scale factor to the coherent SI unit. Dimensionless quantities carry no
//! unit at all (`Option<Unit>::None`), so every helper here works on
//! `Option<Unit>`.
//!
//! # Example
//!
//! ```
//! use trueno_linalg::Unit;
//!
//! let m = Some(Unit::meter());
//! let cm = Some(Unit::meter().scaled(0.01));
//!
//! // 1 cm expressed in meters
//! assert!((Unit::convert(m, cm).unwrap() - 0.01).abs() < 1e-15);
//!
//! // m · cm folds into m² with a 0.01 value factor
//! let (product, factor) = Unit::multiply(m, cm);
//! assert_eq!(product, Some(Unit::meter().pow(2.0)));
//! assert!((factor - 0.01).abs() < 1e-15);
//! ```

use std::fmt;

use crate::error::{LinalgError, Result};

const DIMENSIONS: usize = 7;
const SYMBOLS: [&str; DIMENSIONS] = ["m", "kg", "s", "A", "K", "mol", "cd"];

/// A physical unit: base-dimension powers and a scale factor to SI
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    powers: [f32; DIMENSIONS],
    factor: f64,
}

impl Unit {
    /// Creates a unit from base-dimension powers and an SI scale factor
    pub fn new(powers: [f32; DIMENSIONS], factor: f64) -> Self {
        Self { powers, factor }
    }

    fn base(index: usize) -> Self {
        let mut powers = [0.0; DIMENSIONS];
        powers[index] = 1.0;
        Self::new(powers, 1.0)
    }

    /// Meter
    pub fn meter() -> Self {
        Self::base(0)
    }

    /// Kilogram
    pub fn kilogram() -> Self {
        Self::base(1)
    }

    /// Second
    pub fn second() -> Self {
        Self::base(2)
    }

    /// Ampere
    pub fn ampere() -> Self {
        Self::base(3)
    }

    /// Kelvin
    pub fn kelvin() -> Self {
        Self::base(4)
    }

    /// Newton (kg·m/s²)
    pub fn newton() -> Self {
        Self::new([1.0, 1.0, -2.0, 0.0, 0.0, 0.0, 0.0], 1.0)
    }

    /// Same dimensions, scale factor multiplied by `factor`
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.powers, self.factor * factor)
    }

    /// Scale factor to the coherent SI unit
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Base-dimension powers
    pub fn powers(&self) -> &[f32; DIMENSIONS] {
        &self.powers
    }

    /// Raises the unit to a (possibly fractional) power
    pub fn pow(self, p: f32) -> Self {
        let mut powers = self.powers;
        for q in &mut powers {
            *q *= p;
        }
        Self::new(powers, self.factor.powf(f64::from(p)))
    }

    fn is_dimensionless(&self) -> bool {
        self.powers.iter().all(|&p| p == 0.0)
    }

    /// Same dimensions (values convertible by a constant factor)
    pub fn same_dimensions(&self, other: &Unit) -> bool {
        self.powers == other.powers
    }

    /// Whether values in `a` and `b` can be converted into each other
    pub fn is_consistent(a: Option<Unit>, b: Option<Unit>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_dimensions(&b),
            _ => false,
        }
    }

    /// Factor that converts a value in `from` units into `to` units
    ///
    /// # Errors
    ///
    /// `InconsistentUnits` when the dimensions differ or exactly one side is
    /// dimensionless.
    pub fn convert(to: Option<Unit>, from: Option<Unit>) -> Result<f64> {
        match (to, from) {
            (None, None) => Ok(1.0),
            (Some(t), Some(f)) if t.same_dimensions(&f) => {
                if t.factor == f.factor {
                    Ok(1.0)
                } else {
                    Ok(f.factor / t.factor)
                }
            }
            _ => Err(Self::inconsistent(to, from)),
        }
    }

    pub(crate) fn inconsistent(a: Option<Unit>, b: Option<Unit>) -> LinalgError {
        LinalgError::InconsistentUnits {
            left: Self::text(a),
            right: Self::text(b),
        }
    }

    /// Display text of an optional unit (empty when dimensionless)
    pub fn text(u: Option<Unit>) -> String {
        u.map(|u| u.to_string()).unwrap_or_default()
    }

    /// Product units and the value factor to apply to `a·b`
    ///
    /// Consistent operands fold into a power of the left unit (`m·cm → m²`
    /// with factor 0.01); other operands combine dimensions and scales.
    pub fn multiply(a: Option<Unit>, b: Option<Unit>) -> (Option<Unit>, f64) {
        Self::combine(a, b, 1.0)
    }

    /// Quotient units and the value factor to apply to `a/b`
    pub fn divide(a: Option<Unit>, b: Option<Unit>) -> (Option<Unit>, f64) {
        Self::combine(a, b, -1.0)
    }

    fn combine(a: Option<Unit>, b: Option<Unit>, sign: f32) -> (Option<Unit>, f64) {
        match (a, b) {
            (None, None) => (None, 1.0),
            (Some(a), None) => (Some(a), 1.0),
            (None, Some(b)) => (Some(b.pow(sign)), 1.0),
            (Some(a), Some(b)) => {
                let (b, d) = if a.same_dimensions(&b) {
                    let d = b.factor / a.factor;
                    (Unit::new(b.powers, a.factor), if sign > 0.0 { d } else { 1.0 / d })
                } else {
                    (b, 1.0)
                };
                let mut powers = a.powers;
                for (p, q) in powers.iter_mut().zip(b.powers.iter()) {
                    *p += sign * q;
                }
                let factor = if sign > 0.0 {
                    a.factor * b.factor
                } else {
                    a.factor / b.factor
                };
                let unit = Unit::new(powers, factor);
                if unit.is_dimensionless() {
                    (None, d * factor)
                } else {
                    (Some(unit), d)
                }
            }
        }
    }

    /// Optional-unit power helper
    pub fn pow_opt(u: Option<Unit>, p: f32) -> Option<Unit> {
        match u {
            Some(u) if p != 0.0 => Some(u.pow(p)),
            _ => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.factor != 1.0 {
            write!(f, "{}·", self.factor)?;
        }
        let mut first = true;
        for (symbol, &p) in SYMBOLS.iter().zip(self.powers.iter()) {
            if p == 0.0 {
                continue;
            }
            if !first {
                write!(f, "·")?;
            }
            first = false;
            if p == 1.0 {
                write!(f, "{symbol}")?;
            } else {
                write!(f, "{symbol}^{p}")?;
            }
        }
        Ok(())
    }
}
