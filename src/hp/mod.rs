//! High-performance matrices: raw `f64` storage with one unit per matrix
//!
//! [`HpMatrix`] mirrors [`crate::Matrix`] over the same six storage kinds, but
//! keeps a single unit tag for the whole matrix instead of one per element.
//! Operands are converted once per operation and the element loops run on
//! plain doubles, so the SIMD kernels and the decompositions in
//! [`crate::linalg`] see the raw rows directly.
//!
//! # Example
//!
//! ```
//! use trueno_linalg::{HpMatrix, Unit};
//!
//! let a = HpMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]])
//!     .unwrap()
//!     .with_units(Some(Unit::meter()));
//! assert_eq!(a.rows(), 2);
//! assert_eq!(a.value(1, 0).value, 3.0);
//! assert_eq!(a.value(1, 0).units, Some(Unit::meter()));
//! ```

mod decompose;
pub(crate) mod interpolate;
mod ops;
mod product;
mod reduce;
mod search;

use std::borrow::Cow;

use crate::error::{LinalgError, Result};
use crate::matrix::Matrix;
use crate::storage::{Kind, Storage};
use crate::unit::Unit;
use crate::value::RealValue;
use crate::vector::HpVector;

pub use decompose::LuDecomposition;

/// Raw-`f64` matrix tagged with a single unit
#[derive(Debug, Clone, PartialEq)]
pub struct HpMatrix {
    storage: Storage<f64>,
    units: Option<Unit>,
}

impl HpMatrix {
    /// Dimensionless zero `Full` matrix
    ///
    /// # Errors
    ///
    /// `MatrixSizeLimit` above [`crate::config::MAX_SIZE`], `MatrixDimensions`
    /// for an empty shape.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        Self::with_kind(Kind::Full, rows, cols)
    }

    /// Dimensionless zero matrix of any kind
    pub fn with_kind(kind: Kind, rows: usize, cols: usize) -> Result<Self> {
        Ok(Self::from_storage(Storage::new(kind, rows, cols)?, None))
    }

    pub fn diagonal(n: usize) -> Result<Self> {
        Self::with_kind(Kind::Diagonal, n, n)
    }

    pub fn column(m: usize) -> Result<Self> {
        Self::with_kind(Kind::Column, m, 1)
    }

    pub fn symmetric(n: usize) -> Result<Self> {
        Self::with_kind(Kind::Symmetric, n, n)
    }

    pub fn upper_triangular(n: usize) -> Result<Self> {
        Self::with_kind(Kind::UpperTriangular, n, n)
    }

    pub fn lower_triangular(n: usize) -> Result<Self> {
        Self::with_kind(Kind::LowerTriangular, n, n)
    }

    /// Diagonal matrix of ones
    pub fn identity(n: usize) -> Result<Self> {
        let mut m = Self::diagonal(n)?;
        m.storage.fill(1.0);
        Ok(m)
    }

    /// `Full` matrix from equally long rows
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        Ok(Self::from_storage(Storage::from_rows(rows.to_vec())?, None))
    }

    /// `Full` matrix whose columns are `cols`
    pub fn from_cols(cols: &[Vec<f64>]) -> Result<Self> {
        Ok(Self::from_storage(Storage::from_cols(cols)?, None))
    }

    /// Matrix of `kind` with its stored slots taken from `f(i, j)`
    pub fn from_fn<F>(kind: Kind, rows: usize, cols: usize, f: F) -> Result<Self>
    where
        F: Fn(usize, usize) -> f64,
    {
        Ok(Self::from_storage(Storage::from_fn(kind, rows, cols, f)?, None))
    }

    /// `Column` matrix holding `v`
    pub fn from_vector(v: &HpVector) -> Result<Self> {
        let mut m = Self::column(v.len())?.with_units(v.units());
        m.storage.raw_rows_mut()[0].copy_from_slice(v.raw());
        Ok(m)
    }

    pub fn from_storage(storage: Storage<f64>, units: Option<Unit>) -> Self {
        Self { storage, units }
    }

    /// Retags the matrix without touching the values
    pub fn with_units(mut self, units: Option<Unit>) -> Self {
        self.units = units;
        self
    }

    pub fn kind(&self) -> Kind {
        self.storage.kind()
    }

    pub fn rows(&self) -> usize {
        self.storage.rows()
    }

    pub fn cols(&self) -> usize {
        self.storage.cols()
    }

    pub fn is_square(&self) -> bool {
        self.storage.is_square()
    }

    pub fn units(&self) -> Option<Unit> {
        self.units
    }

    pub fn storage(&self) -> &Storage<f64> {
        &self.storage
    }

    pub(crate) fn storage_mut(&mut self) -> &mut Storage<f64> {
        &mut self.storage
    }

    pub fn into_storage(self) -> Storage<f64> {
        self.storage
    }

    /// Raw value at `(i, j)` (0-based)
    ///
    /// # Panics
    ///
    /// Panics if the index is out of range; see [`HpMatrix::try_get`].
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.storage.get(i, j)
    }

    pub fn try_get(&self, i: usize, j: usize) -> Result<f64> {
        self.storage.try_get(i, j)
    }

    /// Value at `(i, j)` with the matrix units
    pub fn value(&self, i: usize, j: usize) -> RealValue {
        RealValue::with_units(self.get(i, j), self.units)
    }

    /// Writes a raw value; nonzero values off the stored pattern fail with
    /// `IndexOutOfRange`
    pub fn set(&mut self, i: usize, j: usize, value: f64) -> Result<()> {
        self.storage.set(i, j, value)
    }

    /// Writes `value` converted into the matrix units
    pub fn set_value(&mut self, i: usize, j: usize, value: RealValue) -> Result<()> {
        let v = self.convert_in(value)?;
        self.set(i, j, v)
    }

    /// Magnitude of `value` in the matrix units; a unit-less zero always fits
    fn convert_in(&self, value: RealValue) -> Result<f64> {
        if value.value == 0.0 && value.units.is_none() {
            return Ok(0.0);
        }
        value.value_in(self.units)
    }

    /// Copy of row `k` (1-based)
    pub fn row(&self, k: usize) -> Result<HpVector> {
        let i = crate::storage::one_based(k, self.rows())?;
        Ok(HpVector::new(self.storage.row(i), self.units))
    }

    /// Copy of column `k` (1-based)
    pub fn col(&self, k: usize) -> Result<HpVector> {
        let j = crate::storage::one_based(k, self.cols())?;
        Ok(HpVector::new(self.storage.col(j), self.units))
    }

    /// Row `i` (0-based), borrowed for `Full` matrices
    pub fn row_view(&self, i: usize) -> Cow<'_, [f64]> {
        self.storage.row_view(i)
    }

    /// Main diagonal
    pub fn diagonal_vector(&self) -> HpVector {
        HpVector::new(self.storage.diagonal(), self.units)
    }

    fn derived(&self, storage: Storage<f64>) -> Self {
        Self::from_storage(storage, self.units)
    }

    /// Block `[i1..=i2] × [j1..=j2]` (1-based)
    pub fn submatrix(&self, i1: usize, i2: usize, j1: usize, j2: usize) -> Result<Self> {
        Ok(self.derived(self.storage.submatrix(i1, i2, j1, j2)?))
    }

    /// Rows listed 1-based, repeats allowed
    pub fn extract_rows(&self, indexes: &[usize]) -> Result<Self> {
        Ok(self.derived(self.storage.extract_rows(indexes)?))
    }

    pub fn extract_cols(&self, indexes: &[usize]) -> Result<Self> {
        Ok(self.derived(self.storage.extract_cols(indexes)?))
    }

    /// Parts converted into the units of the first one
    fn aligned(parts: &[&HpMatrix]) -> Result<(Vec<Storage<f64>>, Option<Unit>)> {
        let units = parts.first().and_then(|p| p.units);
        let storages = parts
            .iter()
            .map(|p| {
                let d = Unit::convert(units, p.units)?;
                Ok(if d == 1.0 {
                    p.storage.clone()
                } else {
                    p.storage.map(|x| x * d)
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((storages, units))
    }

    /// Side-by-side concatenation in the units of the first part
    pub fn augment(parts: &[&HpMatrix]) -> Result<Self> {
        let (storages, units) = Self::aligned(parts)?;
        let refs: Vec<&Storage<f64>> = storages.iter().collect();
        Ok(Self::from_storage(Storage::augment(&refs)?, units))
    }

    /// Top-to-bottom concatenation in the units of the first part
    pub fn stack(parts: &[&HpMatrix]) -> Result<Self> {
        let (storages, units) = Self::aligned(parts)?;
        let refs: Vec<&Storage<f64>> = storages.iter().collect();
        Ok(Self::from_storage(Storage::stack(&refs)?, units))
    }

    pub fn fill(&mut self, value: f64) {
        self.storage.fill(value);
    }

    /// Fills the stored slots of row `i` (1-based)
    pub fn fill_row(&mut self, i: usize, value: f64) -> Result<()> {
        self.storage.fill_row(i, value)
    }

    pub fn fill_col(&mut self, j: usize, value: f64) -> Result<()> {
        self.storage.fill_col(j, value)
    }

    /// Resizes in place; see [`Storage::resize`]
    pub fn resize(&mut self, m: usize, n: usize) -> Result<()> {
        self.storage.resize(m, n)
    }

    /// Overwrites row `i` (1-based) from `v`, converting units
    pub fn set_row(&mut self, i: usize, v: &HpVector) -> Result<()> {
        let i = crate::storage::one_based(i, self.rows())?;
        let d = Unit::convert(self.units, v.units())?;
        let values: Vec<f64> = v.raw().iter().map(|x| x * d).collect();
        self.storage.set_row(i, &values)
    }

    /// Overwrites column `j` (1-based) from `v`, converting units
    pub fn set_col(&mut self, j: usize, v: &HpVector) -> Result<()> {
        let j = crate::storage::one_based(j, self.cols())?;
        let d = Unit::convert(self.units, v.units())?;
        let values: Vec<f64> = v.raw().iter().map(|x| x * d).collect();
        self.storage.set_col(j, &values)
    }

    /// Writes `self` into `target` at 1-based `(i, j)` where the target can
    /// store a value
    pub fn copy_to(&self, target: &mut HpMatrix, i: usize, j: usize) -> Result<()> {
        let d = Unit::convert(target.units, self.units)?;
        self.storage.merge_into(&mut target.storage, i, j, |_, v| Ok(v * d))
    }

    /// Adds `self` into `target` at 1-based `(i, j)` where the target can
    /// store a value
    pub fn add_to(&self, target: &mut HpMatrix, i: usize, j: usize) -> Result<()> {
        let d = Unit::convert(target.units, self.units)?;
        self.storage.merge_into(&mut target.storage, i, j, |t, v| Ok(t + v * d))
    }

    pub fn transpose(&self) -> Self {
        self.derived(self.storage.transpose())
    }

    /// Per-element [`RealValue`] copy with the same kind
    pub fn to_matrix(&self) -> Matrix {
        let units = self.units;
        Matrix::from_storage(self.storage.map(|x| RealValue::with_units(x, units)))
    }
}

impl TryFrom<&Matrix> for HpMatrix {
    type Error = LinalgError;

    /// Converts every element into the units of the first unit-bearing one
    ///
    /// # Errors
    ///
    /// `InconsistentUnits` when an element cannot be converted.
    fn try_from(m: &Matrix) -> Result<Self> {
        let units = m.storage().iter_stored().find_map(|v| v.units);
        let storage = m.storage().try_map(|v| {
            if v.value == 0.0 && v.units.is_none() {
                Ok(0.0)
            } else {
                v.value_in(units)
            }
        })?;
        Ok(Self::from_storage(storage, units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meters() -> Option<Unit> {
        Some(Unit::meter())
    }

    // ========================================================================
    // Construction and access
    // ========================================================================

    #[test]
    fn test_constructors_pick_kind() {
        assert_eq!(HpMatrix::diagonal(3).unwrap().kind(), Kind::Diagonal);
        assert_eq!(HpMatrix::column(3).unwrap().cols(), 1);
        assert_eq!(HpMatrix::symmetric(2).unwrap().kind(), Kind::Symmetric);
        let id = HpMatrix::identity(3).unwrap();
        assert_eq!(id.get(2, 2), 1.0);
        assert_eq!(id.get(2, 1), 0.0);
        assert_eq!(
            HpMatrix::new(0, 3).unwrap_err(),
            LinalgError::MatrixDimensions
        );
    }

    #[test]
    fn test_set_value_converts_units() {
        let mut m = HpMatrix::new(2, 2).unwrap().with_units(meters());
        m.set_value(0, 1, RealValue::with_units(25.0, Some(Unit::meter().scaled(0.01))))
            .unwrap();
        assert!((m.get(0, 1) - 0.25).abs() < 1e-15);
        assert!(m
            .set_value(0, 0, RealValue::with_units(1.0, Some(Unit::second())))
            .is_err());
        m.set_value(1, 1, RealValue::ZERO).unwrap();
    }

    #[test]
    fn test_off_pattern_set() {
        let mut d = HpMatrix::diagonal(2).unwrap();
        assert!(d.set(0, 1, 0.0).is_ok());
        assert!(matches!(d.set(0, 1, 2.0), Err(LinalgError::IndexOutOfRange(_))));
    }

    #[test]
    fn test_row_and_col_are_one_based() {
        let m = HpMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.row(2).unwrap().raw(), &[3.0, 4.0]);
        assert_eq!(m.col(1).unwrap().raw(), &[1.0, 3.0]);
        assert!(m.row(0).is_err());
        assert!(m.col(3).is_err());
    }

    // ========================================================================
    // Structure
    // ========================================================================

    #[test]
    fn test_augment_converts_to_first_units() {
        let a = HpMatrix::from_rows(&[vec![1.0]]).unwrap().with_units(meters());
        let b = HpMatrix::from_rows(&[vec![200.0]])
            .unwrap()
            .with_units(Some(Unit::meter().scaled(0.01)));
        let c = HpMatrix::augment(&[&a, &b]).unwrap();
        assert_eq!(c.units(), meters());
        assert!((c.get(0, 1) - 2.0).abs() < 1e-12);
        let s = HpMatrix::from_rows(&[vec![1.0]])
            .unwrap()
            .with_units(Some(Unit::second()));
        assert!(HpMatrix::stack(&[&a, &s]).is_err());
    }

    #[test]
    fn test_copy_and_add_to_respect_target_kind() {
        let src = HpMatrix::from_rows(&[vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let mut target = HpMatrix::lower_triangular(2).unwrap();
        src.copy_to(&mut target, 1, 1).unwrap();
        src.add_to(&mut target, 1, 1).unwrap();
        assert_eq!(target.get(0, 0), 2.0);
        assert_eq!(target.get(0, 1), 0.0);
        assert_eq!(target.get(1, 0), 2.0);
    }

    #[test]
    fn test_set_row_and_col() {
        let mut m = HpMatrix::new(2, 3).unwrap();
        m.set_row(2, &HpVector::new(vec![7.0, 8.0, 9.0], None)).unwrap();
        m.set_col(1, &HpVector::new(vec![1.0, 2.0], None)).unwrap();
        assert_eq!(m.row(2).unwrap().raw(), &[2.0, 8.0, 9.0]);
        assert!(m
            .set_row(1, &HpVector::new(vec![1.0], meters()))
            .is_err());
    }

    #[test]
    fn test_transpose_row_is_column() {
        let r = HpMatrix::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap();
        let c = r.transpose();
        assert_eq!(c.kind(), Kind::Column);
        assert_eq!(c.transpose().kind(), Kind::Full);
    }

    // ========================================================================
    // Family conversions
    // ========================================================================

    #[test]
    fn test_matrix_round_trip() {
        let hp = HpMatrix::from_fn(Kind::UpperTriangular, 3, 3, |i, j| (i + j) as f64)
            .unwrap()
            .with_units(meters());
        let m = hp.to_matrix();
        assert_eq!(m.kind(), Kind::UpperTriangular);
        assert_eq!(m.get(0, 2).units, meters());
        assert_eq!(HpMatrix::try_from(&m).unwrap(), hp);
    }

    #[test]
    fn test_try_from_rejects_mixed_units() {
        let mut m = Matrix::new(1, 2).unwrap();
        m.set(0, 0, RealValue::with_units(1.0, meters())).unwrap();
        m.set(0, 1, RealValue::with_units(1.0, Some(Unit::second())))
            .unwrap();
        assert!(matches!(
            HpMatrix::try_from(&m),
            Err(LinalgError::InconsistentUnits { .. })
        ));
    }
}
