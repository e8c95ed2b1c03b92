//! One-dimensional vectors used as right-hand sides, rows and spectra
//!
//! [`Vector`] stores a [`RealValue`] per element; [`HpVector`] stores raw
//! `f64` with one unit for the whole vector and runs its reductions through
//! the SIMD kernels in [`crate::vectorized`].

use std::cmp::Ordering;
use std::ops::Index;

use crate::error::{LinalgError, Result};
use crate::storage::{one_based, order_indexes};
use crate::unit::Unit;
use crate::value::{RealValue, Relation};
use crate::vectorized;

/// Unit-tagged vector
///
/// # Examples
///
/// ```
/// use trueno_linalg::Vector;
///
/// let v = Vector::from_slice(&[3.0, 1.0, 2.0]);
/// assert_eq!(v.len(), 3);
/// assert_eq!(v.sum().unwrap().value, 6.0);
/// assert_eq!(v.order(false).unwrap(), vec![1, 2, 0]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vector {
    data: Vec<RealValue>,
}

impl From<Vec<RealValue>> for Vector {
    fn from(data: Vec<RealValue>) -> Self {
        Self { data }
    }
}

impl Index<usize> for Vector {
    type Output = RealValue;

    fn index(&self, i: usize) -> &RealValue {
        &self.data[i]
    }
}

impl Vector {
    /// `len` dimensionless zeros
    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![RealValue::ZERO; len],
        }
    }

    /// Dimensionless values
    pub fn from_slice(values: &[f64]) -> Self {
        Self::with_units(values, None)
    }

    /// Values sharing `units`
    pub fn with_units(values: &[f64], units: Option<Unit>) -> Self {
        Self {
            data: values
                .iter()
                .map(|&v| RealValue::with_units(v, units))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[RealValue] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<RealValue> {
        self.data
    }

    /// Element `i` (0-based), `None` past the end
    pub fn get(&self, i: usize) -> Option<RealValue> {
        self.data.get(i).copied()
    }

    /// Overwrites element `i` (0-based)
    pub fn set(&mut self, i: usize, value: RealValue) -> Result<()> {
        let slot = self.data.get_mut(i).ok_or_else(|| LinalgError::index(i))?;
        *slot = value;
        Ok(())
    }

    pub fn fill(&mut self, value: RealValue) {
        self.data.fill(value);
    }

    /// Truncates or zero-extends to `len`
    pub fn resize(&mut self, len: usize) {
        self.data.resize(len, RealValue::ZERO);
    }

    /// Elements `i1..=i2` (1-based; swapped bounds are normalised)
    pub fn slice(&self, i1: usize, i2: usize) -> Result<Vector> {
        let (i1, i2) = if i2 < i1 { (i2, i1) } else { (i1, i2) };
        let a = one_based(i1, self.len())?;
        let b = one_based(i2, self.len())?;
        Ok(Self {
            data: self.data[a..=b].to_vec(),
        })
    }

    /// Σ vᵢ in the units of the first element
    pub fn sum(&self) -> Result<RealValue> {
        self.data
            .iter()
            .try_fold(RealValue::ZERO, |acc, &v| acc.add(v))
    }

    /// Π vᵢ
    pub fn product(&self) -> RealValue {
        self.data.iter().fold(RealValue::ONE, |acc, &v| acc.mul(v))
    }

    fn extreme(&self, wanted: Ordering) -> Result<RealValue> {
        let mut it = self.data.iter();
        let Some(&first) = it.next() else {
            return Ok(RealValue::NAN);
        };
        it.try_fold(first, |best, &v| {
            Ok(if v.compare(&best)? == wanted { v } else { best })
        })
    }

    /// Smallest element; units must agree
    pub fn min(&self) -> Result<RealValue> {
        self.extreme(Ordering::Less)
    }

    /// Largest element; units must agree
    pub fn max(&self) -> Result<RealValue> {
        self.extreme(Ordering::Greater)
    }

    /// Euclidean norm
    pub fn norm(&self) -> Result<RealValue> {
        self.dot(self).map(RealValue::sqrt)
    }

    /// Σ aᵢ·bᵢ
    pub fn dot(&self, other: &Vector) -> Result<RealValue> {
        if self.len() != other.len() {
            return Err(LinalgError::MatrixDimensions);
        }
        self.data
            .iter()
            .zip(&other.data)
            .try_fold(RealValue::ZERO, |acc, (&a, &b)| acc.add(a.mul(b)))
    }

    /// 0-based permutation that sorts the vector (stable)
    pub fn order(&self, reverse: bool) -> Result<Vec<usize>> {
        if let Some(first) = self.data.first() {
            for v in &self.data[1..] {
                first.compare(v)?;
            }
        }
        Ok(order_indexes(&self.data, reverse, |a, b| {
            a.compare(b).unwrap_or(Ordering::Equal)
        }))
    }

    /// Sorted copy
    pub fn sort(&self, reverse: bool) -> Result<Vector> {
        let order = self.order(reverse)?;
        Ok(Self {
            data: order.iter().map(|&i| self.data[i]).collect(),
        })
    }

    fn relates(v: &RealValue, value: &RealValue, rel: Relation) -> bool {
        match Unit::convert(v.units, value.units) {
            Ok(d) => rel.holds(v.value, value.value * d),
            Err(_) => false,
        }
    }

    /// Number of elements for which `v rel value` holds
    pub fn count(&self, value: RealValue, rel: Relation) -> usize {
        self.data
            .iter()
            .filter(|v| Self::relates(v, &value, rel))
            .count()
    }

    /// First 0-based index at or after `start` where `v rel value` holds
    pub fn search(&self, value: RealValue, start: usize, rel: Relation) -> Option<usize> {
        self.data
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, v)| Self::relates(v, &value, rel))
            .map(|(i, _)| i)
    }
}

/// Raw `f64` vector with a single unit
///
/// # Examples
///
/// ```
/// use trueno_linalg::{HpVector, Unit};
///
/// let v = HpVector::new(vec![3.0, 4.0], Some(Unit::meter()));
/// assert_eq!(v.norm().value, 5.0);
/// assert_eq!(v.get(1).units, Some(Unit::meter()));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HpVector {
    data: Vec<f64>,
    units: Option<Unit>,
}

impl Index<usize> for HpVector {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.data[i]
    }
}

impl TryFrom<&Vector> for HpVector {
    type Error = LinalgError;

    /// Converts every element into the units of the first one
    fn try_from(v: &Vector) -> Result<Self> {
        let units = v.data.first().and_then(|x| x.units);
        let data = v
            .data
            .iter()
            .map(|x| if x.value == 0.0 { Ok(0.0) } else { x.value_in(units) })
            .collect::<Result<Vec<f64>>>()?;
        Ok(Self { data, units })
    }
}

impl HpVector {
    pub fn new(data: Vec<f64>, units: Option<Unit>) -> Self {
        Self { data, units }
    }

    /// `len` zeros in `units`
    pub fn zeros(len: usize, units: Option<Unit>) -> Self {
        Self::new(vec![0.0; len], units)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn units(&self) -> Option<Unit> {
        self.units
    }

    /// Raw values, in [`HpVector::units`]
    pub fn raw(&self) -> &[f64] {
        &self.data
    }

    pub fn raw_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<f64> {
        self.data
    }

    /// Element `i` (0-based) with units
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    pub fn get(&self, i: usize) -> RealValue {
        RealValue::with_units(self.data[i], self.units)
    }

    /// Writes element `i` (0-based), converting into the vector's units
    pub fn set(&mut self, i: usize, value: RealValue) -> Result<()> {
        let d = if value.value == 0.0 {
            0.0
        } else {
            value.value_in(self.units)?
        };
        let slot = self.data.get_mut(i).ok_or_else(|| LinalgError::index(i))?;
        *slot = d;
        Ok(())
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn resize(&mut self, len: usize) {
        self.data.resize(len, 0.0);
    }

    /// Elements `i1..=i2` (1-based)
    pub fn slice(&self, i1: usize, i2: usize) -> Result<HpVector> {
        let (i1, i2) = if i2 < i1 { (i2, i1) } else { (i1, i2) };
        let a = one_based(i1, self.len())?;
        let b = one_based(i2, self.len())?;
        Ok(Self::new(self.data[a..=b].to_vec(), self.units))
    }

    pub fn sum(&self) -> RealValue {
        RealValue::with_units(self.data.iter().sum(), self.units)
    }

    pub fn product(&self) -> RealValue {
        let n = self.data.len() as f32;
        RealValue::with_units(self.data.iter().product(), Unit::pow_opt(self.units, n))
    }

    /// Smallest element; NaN when empty
    pub fn min(&self) -> RealValue {
        let m = self.data.iter().copied().reduce(f64::min).unwrap_or(f64::NAN);
        RealValue::with_units(m, self.units)
    }

    /// Largest element; NaN when empty
    pub fn max(&self) -> RealValue {
        let m = self.data.iter().copied().reduce(f64::max).unwrap_or(f64::NAN);
        RealValue::with_units(m, self.units)
    }

    pub fn norm(&self) -> RealValue {
        RealValue::with_units(vectorized::norm(&self.data), self.units)
    }

    /// Σ|vᵢ|
    pub fn l1_norm(&self) -> RealValue {
        RealValue::with_units(vectorized::sum_abs(&self.data), self.units)
    }

    /// max |vᵢ|
    pub fn inf_norm(&self) -> RealValue {
        let m = self.data.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
        RealValue::with_units(m, self.units)
    }

    /// Σ aᵢ·bᵢ with multiplied units
    pub fn dot(&self, other: &HpVector) -> Result<RealValue> {
        if self.len() != other.len() {
            return Err(LinalgError::MatrixDimensions);
        }
        let (units, d) = Unit::multiply(self.units, other.units);
        Ok(RealValue::with_units(
            vectorized::dot(&self.data, &other.data) * d,
            units,
        ))
    }

    /// Multiplies every element by `d`
    pub fn scale(&mut self, d: f64) {
        vectorized::scale(&mut self.data, d);
    }

    /// 0-based permutation that sorts the vector (stable, NaN last)
    pub fn order(&self, reverse: bool) -> Vec<usize> {
        order_indexes(&self.data, reverse, f64::total_cmp)
    }

    pub fn sort(&self, reverse: bool) -> HpVector {
        let data = self.order(reverse).iter().map(|&i| self.data[i]).collect();
        Self::new(data, self.units)
    }

    fn target(&self, value: RealValue) -> Option<f64> {
        Unit::convert(self.units, value.units)
            .ok()
            .map(|d| value.value * d)
    }

    /// Number of elements for which `v rel value` holds
    pub fn count(&self, value: RealValue, rel: Relation) -> usize {
        match self.target(value) {
            Some(t) => self.data.iter().filter(|&&v| rel.holds(v, t)).count(),
            None => 0,
        }
    }

    /// First 0-based index at or after `start` where `v rel value` holds
    pub fn search(&self, value: RealValue, start: usize, rel: Relation) -> Option<usize> {
        let t = self.target(value)?;
        self.data
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, &v)| rel.holds(v, t))
            .map(|(i, _)| i)
    }

    /// Per-element [`RealValue`] copy
    pub fn to_vector(&self) -> Vector {
        Vector::with_units(&self.data, self.units)
    }
}
