//! Unit-tagged matrices
//!
//! Every element of a [`Matrix`] is a [`RealValue`] with its own unit, so a
//! single matrix may mix meters and centimeters. Structure follows the six
//! storage kinds of [`Kind`]; element-wise operators and products go through
//! the shared kind-pair dispatch in [`crate::storage::dispatch`].
//!
//! The LU family of decompositions works on the elements directly, so a
//! dimensionally consistent system may mix dimensions. Numeric reductions
//! and the other decompositions convert into an [`HpMatrix`] first, which
//! requires all elements to share one dimension.
//!
//! # Example
//!
//! ```
//! use trueno_linalg::{Matrix, RealValue, Unit};
//!
//! let mut m = Matrix::new(2, 2).unwrap();
//! m.set(0, 0, RealValue::with_units(1.0, Some(Unit::meter()))).unwrap();
//! m.set(1, 1, RealValue::with_units(50.0, Some(Unit::meter().scaled(0.01)))).unwrap();
//! assert_eq!(m.sum().unwrap().value, 1.5);
//! ```

mod decompose;
mod lu;
mod ops;
mod reduce;
mod search;

use std::borrow::Cow;

use crate::error::{LinalgError, Result};
use crate::hp::HpMatrix;
use crate::storage::{Kind, Storage};
use crate::unit::Unit;
use crate::value::RealValue;
use crate::vector::Vector;

/// Matrix of unit-tagged values
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    storage: Storage<RealValue>,
}

impl Matrix {
    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    /// Zero-filled `Full` matrix
    ///
    /// # Errors
    ///
    /// `MatrixDimensions` for a zero dimension, `MatrixSizeLimit` above
    /// [`crate::config::MAX_SIZE`].
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        Self::with_kind(Kind::Full, rows, cols)
    }

    /// Zero-filled matrix of the given kind
    pub fn with_kind(kind: Kind, rows: usize, cols: usize) -> Result<Self> {
        Ok(Self::from_storage(Storage::new(kind, rows, cols)?))
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
        m.storage.fill(RealValue::ONE);
        Ok(m)
    }

    /// Dimensionless `Full` matrix from rows of equal length
    ///
    /// # Example
    ///
    /// ```
    /// use trueno_linalg::{Kind, Matrix};
    ///
    /// let m = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    /// assert_eq!(m.kind(), Kind::Full);
    /// assert_eq!(m.get(1, 0).value, 3.0);
    /// ```
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        Self::from_values(
            rows.iter()
                .map(|r| r.iter().map(|&x| RealValue::new(x)).collect())
                .collect(),
        )
    }

    /// `Full` matrix from rows of values
    pub fn from_values(rows: Vec<Vec<RealValue>>) -> Result<Self> {
        Ok(Self::from_storage(Storage::from_rows(rows)?))
    }

    /// Dimensionless `Full` matrix from columns of equal length
    pub fn from_cols(cols: &[Vec<f64>]) -> Result<Self> {
        let cols: Vec<Vec<RealValue>> = cols
            .iter()
            .map(|c| c.iter().map(|&x| RealValue::new(x)).collect())
            .collect();
        Ok(Self::from_storage(Storage::from_cols(&cols)?))
    }

    /// Matrix of `kind` whose stored slots come from `f(i, j)`
    pub fn from_fn<F>(kind: Kind, rows: usize, cols: usize, f: F) -> Result<Self>
    where
        F: Fn(usize, usize) -> RealValue,
    {
        Ok(Self::from_storage(Storage::from_fn(kind, rows, cols, f)?))
    }

    /// Column matrix holding the elements of `v`
    pub fn from_vector(v: &Vector) -> Result<Self> {
        let mut m = Self::column(v.len())?;
        m.storage.set_col(0, v.as_slice())?;
        Ok(m)
    }

    pub fn from_storage(storage: Storage<RealValue>) -> Self {
        Self { storage }
    }

    // ------------------------------------------------------------------------
    // Shape and element access
    // ------------------------------------------------------------------------

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

    pub fn storage(&self) -> &Storage<RealValue> {
        &self.storage
    }

    pub fn into_storage(self) -> Storage<RealValue> {
        self.storage
    }

    /// Element at 0-based `(i, j)`; implicit zeros read as [`RealValue::ZERO`]
    ///
    /// # Panics
    ///
    /// When `(i, j)` is outside the matrix; see [`Matrix::try_get`].
    pub fn get(&self, i: usize, j: usize) -> RealValue {
        self.storage.get(i, j)
    }

    pub fn try_get(&self, i: usize, j: usize) -> Result<RealValue> {
        self.storage.try_get(i, j)
    }

    /// Sets the element at 0-based `(i, j)`
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` outside the matrix, or for a nonzero value off the
    /// stored pattern of the kind. Zero off the pattern is accepted and
    /// ignored.
    pub fn set(&mut self, i: usize, j: usize, value: RealValue) -> Result<()> {
        self.storage.set(i, j, value)
    }

    /// Row `k` (1-based) as an owned vector
    pub fn row(&self, k: usize) -> Result<Vector> {
        let i = crate::storage::one_based(k, self.rows())?;
        Ok(Vector::from(self.storage.row(i)))
    }

    /// Column `k` (1-based) as an owned vector
    pub fn col(&self, k: usize) -> Result<Vector> {
        let j = crate::storage::one_based(k, self.cols())?;
        Ok(Vector::from(self.storage.col(j)))
    }

    /// Row `i` (0-based), borrowed where the kind stores it densely
    pub fn row_view(&self, i: usize) -> Cow<'_, [RealValue]> {
        self.storage.row_view(i)
    }

    pub fn diagonal_vector(&self) -> Vector {
        Vector::from(self.storage.diagonal())
    }

    // ------------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------------

    /// Block `i1..=i2 × j1..=j2` (1-based; swapped bounds are normalised)
    pub fn submatrix(&self, i1: usize, i2: usize, j1: usize, j2: usize) -> Result<Self> {
        Ok(Self::from_storage(self.storage.submatrix(i1, i2, j1, j2)?))
    }

    /// Rows at the 1-based `indexes`, in that order
    pub fn extract_rows(&self, indexes: &[usize]) -> Result<Self> {
        Ok(Self::from_storage(self.storage.extract_rows(indexes)?))
    }

    pub fn extract_cols(&self, indexes: &[usize]) -> Result<Self> {
        Ok(Self::from_storage(self.storage.extract_cols(indexes)?))
    }

    /// Side-by-side concatenation, shorter parts padded with zeros
    pub fn augment(parts: &[&Matrix]) -> Result<Self> {
        let storages: Vec<&Storage<RealValue>> = parts.iter().map(|p| &p.storage).collect();
        Ok(Self::from_storage(Storage::augment(&storages)?))
    }

    /// Top-to-bottom concatenation, narrower parts padded with zeros
    pub fn stack(parts: &[&Matrix]) -> Result<Self> {
        let storages: Vec<&Storage<RealValue>> = parts.iter().map(|p| &p.storage).collect();
        Ok(Self::from_storage(Storage::stack(&storages)?))
    }

    /// Sets every stored slot to `value`
    pub fn fill(&mut self, value: RealValue) {
        self.storage.fill(value);
    }

    /// Fills the stored slots of row `i` (1-based)
    pub fn fill_row(&mut self, i: usize, value: RealValue) -> Result<()> {
        self.storage.fill_row(i, value)
    }

    pub fn fill_col(&mut self, j: usize, value: RealValue) -> Result<()> {
        self.storage.fill_col(j, value)
    }

    pub fn resize(&mut self, m: usize, n: usize) -> Result<()> {
        self.storage.resize(m, n)
    }

    /// Overwrites row `i` (1-based) with `v`
    pub fn set_row(&mut self, i: usize, v: &Vector) -> Result<()> {
        let i0 = crate::storage::one_based(i, self.rows())?;
        self.storage.set_row(i0, v.as_slice())
    }

    /// Overwrites column `j` (1-based) with `v`
    pub fn set_col(&mut self, j: usize, v: &Vector) -> Result<()> {
        let j0 = crate::storage::one_based(j, self.cols())?;
        self.storage.set_col(j0, v.as_slice())
    }

    /// Writes `self` into `target` at 1-based `(i, j)` where the target
    /// kind has a slot
    pub fn copy_to(&self, target: &mut Matrix, i: usize, j: usize) -> Result<()> {
        self.storage.copy_to(&mut target.storage, i, j)
    }

    /// Adds `self` into `target` at 1-based `(i, j)`
    ///
    /// # Errors
    ///
    /// `InconsistentUnits` when an element cannot be added to its target.
    pub fn add_to(&self, target: &mut Matrix, i: usize, j: usize) -> Result<()> {
        self.storage
            .merge_into(&mut target.storage, i, j, |t, v| t.add(v))
    }

    /// Transposed matrix; triangular kinds swap, a single row becomes a
    /// Column and a Column becomes a single row
    pub fn transpose(&self) -> Self {
        Self::from_storage(self.storage.transpose())
    }

    // ------------------------------------------------------------------------
    // Family bridge
    // ------------------------------------------------------------------------

    /// Same kind and shape with every element in one unit
    ///
    /// # Errors
    ///
    /// `InconsistentUnits` when the elements do not share a dimension.
    pub fn to_hp(&self) -> Result<HpMatrix> {
        HpMatrix::try_from(self)
    }

    /// Unit shared by the elements, if any element carries one
    pub(crate) fn units(&self) -> Option<Unit> {
        self.storage.iter_stored().find_map(|v| v.units)
    }
}

impl From<&HpMatrix> for Matrix {
    fn from(m: &HpMatrix) -> Self {
        m.to_matrix()
    }
}

impl TryFrom<Vec<Vec<RealValue>>> for Matrix {
    type Error = LinalgError;

    fn try_from(rows: Vec<Vec<RealValue>>) -> Result<Self> {
        Self::from_values(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(x: f64) -> RealValue {
        RealValue::with_units(x, Some(Unit::meter()))
    }

    fn cm(x: f64) -> RealValue {
        RealValue::with_units(x, Some(Unit::meter().scaled(0.01)))
    }

    // ========================================================================
    // Construction
    // ========================================================================

    #[test]
    fn test_constructors_pick_kind() {
        assert_eq!(Matrix::identity(3).unwrap().kind(), Kind::Diagonal);
        assert_eq!(Matrix::column(3).unwrap().cols(), 1);
        assert_eq!(Matrix::symmetric(2).unwrap().kind(), Kind::Symmetric);
        assert_eq!(
            Matrix::new(0, 2).unwrap_err(),
            LinalgError::MatrixDimensions
        );
        assert!(matches!(
            Matrix::new(crate::config::MAX_SIZE + 1, 1),
            Err(LinalgError::MatrixSizeLimit { .. })
        ));
    }

    #[test]
    fn test_mixed_units_per_element() {
        let mut a = Matrix::new(1, 2).unwrap();
        a.set(0, 0, m(1.0)).unwrap();
        a.set(0, 1, cm(30.0)).unwrap();
        assert_eq!(a.get(0, 1), cm(30.0));
        let hp = a.to_hp().unwrap();
        assert_eq!(hp.units(), Some(Unit::meter()));
        assert!((hp.get(0, 1) - 0.3).abs() < 1e-15);
    }

    #[test]
    fn test_off_pattern_set() {
        let mut d = Matrix::diagonal(2).unwrap();
        assert!(matches!(
            d.set(0, 1, RealValue::ONE),
            Err(LinalgError::IndexOutOfRange(_))
        ));
        d.set(0, 1, RealValue::ZERO).unwrap();
        assert_eq!(d.get(0, 1), RealValue::ZERO);
    }

    // ========================================================================
    // Structure
    // ========================================================================

    #[test]
    fn test_rows_cols_and_vectors() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(a.row(2).unwrap().as_slice(), &[RealValue::new(3.0), RealValue::new(4.0)]);
        assert_eq!(a.col(1).unwrap().as_slice(), &[RealValue::new(1.0), RealValue::new(3.0)]);
        assert!(a.row(3).is_err());
        let c = Matrix::from_vector(&a.col(2).unwrap()).unwrap();
        assert_eq!(c.kind(), Kind::Column);
        assert_eq!(c.get(1, 0).value, 4.0);
    }

    #[test]
    fn test_add_to_converts_per_element() {
        let mut target = Matrix::new(2, 2).unwrap();
        target.fill(m(1.0));
        let mut patch = Matrix::new(1, 1).unwrap();
        patch.set(0, 0, cm(50.0)).unwrap();
        patch.add_to(&mut target, 2, 2).unwrap();
        assert!((target.get(1, 1).value - 1.5).abs() < 1e-15);
        assert_eq!(target.get(1, 1).units, Some(Unit::meter()));
        let mut bad = Matrix::new(1, 1).unwrap();
        bad.set(0, 0, RealValue::with_units(1.0, Some(Unit::second()))).unwrap();
        assert!(matches!(
            bad.add_to(&mut target, 1, 1),
            Err(LinalgError::InconsistentUnits { .. })
        ));
    }

    #[test]
    fn test_augment_and_transpose() {
        let a = Matrix::identity(2).unwrap();
        let b = Matrix::from_rows(&[vec![5.0]]).unwrap();
        let ab = Matrix::augment(&[&a, &b]).unwrap();
        assert_eq!((ab.rows(), ab.cols()), (2, 3));
        assert_eq!(ab.get(1, 2), RealValue::ZERO);
        let row = Matrix::from_rows(&[vec![1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(row.transpose().kind(), Kind::Column);
    }

    #[test]
    fn test_hp_round_trip() {
        let hp = HpMatrix::identity(2).unwrap().with_units(Some(Unit::newton()));
        let m = Matrix::from(&hp);
        assert_eq!(m.kind(), Kind::Diagonal);
        assert_eq!(m.get(1, 1).units, Some(Unit::newton()));
        assert_eq!(m.to_hp().unwrap(), hp);
    }
}
