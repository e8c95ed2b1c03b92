//! Search, lookup and sorting over unit-tagged elements
//!
//! Comparisons convert the searched value into each element's units. An
//! element whose dimension differs from it never matches; a unit-less zero
//! matches a zero in any unit.

use super::Matrix;
use crate::error::{LinalgError, Result};
use crate::storage::one_based;
use crate::unit::Unit;
use crate::value::{RealValue, Relation};
use crate::vector::Vector;

/// Whether `x rel value` holds after converting `value` into `x`'s units
fn relates(x: &RealValue, value: RealValue, rel: Relation) -> bool {
    let polymorphic = |v: &RealValue| v.value == 0.0 && v.units.is_none();
    if polymorphic(x) || polymorphic(&value) {
        return rel.holds(x.value, value.value);
    }
    match Unit::convert(x.units, value.units) {
        Ok(d) => rel.holds(x.value, value.value * d),
        Err(_) => false,
    }
}

impl Matrix {
    /// Number of entries equal to `value`, implicit zeros included
    pub fn count(&self, value: RealValue) -> usize {
        self.count_where(value, Relation::Equal)
    }

    /// Number of entries `x` with `x rel value`
    pub fn count_where(&self, value: RealValue, rel: Relation) -> usize {
        self.storage.find_all(|x| relates(x, value, rel)).len()
    }

    /// First entry equal to `value` at or after 1-based `(i, j)`, row-major
    ///
    /// Returns the 1-based position, or `(0, 0)` when there is none. A start
    /// column past the end continues on the next row.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` when `i` or `j` is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use trueno_linalg::{Matrix, RealValue};
    ///
    /// let d = Matrix::identity(2).unwrap();
    /// assert_eq!(d.search(RealValue::ZERO, 1, 1).unwrap(), (1, 2));
    /// assert_eq!(d.search(RealValue::ONE, 1, 2).unwrap(), (2, 2));
    /// ```
    pub fn search(&self, value: RealValue, i: usize, j: usize) -> Result<(usize, usize)> {
        if i == 0 || j == 0 {
            return Err(LinalgError::index(format!("({i}, {j})")));
        }
        let (i0, j0) = if j > self.cols() { (i, 0) } else { (i - 1, j - 1) };
        Ok(self
            .storage
            .search(i0, j0, |x| relates(x, value, Relation::Equal))
            .map_or((0, 0), |(r, c)| (r + 1, c + 1)))
    }

    /// 2×k matrix of the 1-based `(row; col)` positions where `x rel value`
    ///
    /// Without a hit the result is a 2×1 zero matrix.
    pub fn find_all(&self, value: RealValue, rel: Relation) -> Result<Matrix> {
        let hits = self.storage.find_all(|x| relates(x, value, rel));
        if hits.is_empty() {
            return Matrix::new(2, 1);
        }
        Matrix::from_rows(&[
            hits.iter().map(|&(i, _)| (i + 1) as f64).collect(),
            hits.iter().map(|&(_, j)| (j + 1) as f64).collect(),
        ])
    }

    /// Entries of row `return_row` where row `search_row` satisfies `rel`
    pub fn hlookup(
        &self,
        value: RealValue,
        search_row: usize,
        return_row: usize,
        rel: Relation,
    ) -> Result<Vector> {
        let keys = self.row(search_row)?;
        let values = self.row(return_row)?;
        Ok(lookup(&keys, &values, value, rel))
    }

    /// Entries of column `return_col` where column `search_col` satisfies `rel`
    pub fn vlookup(
        &self,
        value: RealValue,
        search_col: usize,
        return_col: usize,
        rel: Relation,
    ) -> Result<Vector> {
        let keys = self.col(search_col)?;
        let values = self.col(return_col)?;
        Ok(lookup(&keys, &values, value, rel))
    }

    /// Rows reordered by column `j` (1-based), as a `Full` matrix
    ///
    /// # Errors
    ///
    /// `InconsistentUnits` when the keys cannot be compared.
    pub fn sort_rows(&self, j: usize, reverse: bool) -> Result<Matrix> {
        let order = self.col(j)?.order(reverse)?;
        Ok(Matrix::from_storage(self.storage.reorder_rows(&order)))
    }

    /// Columns reordered by row `i` (1-based), as a `Full` matrix
    pub fn sort_cols(&self, i: usize, reverse: bool) -> Result<Matrix> {
        let order = self.row(i)?.order(reverse)?;
        Ok(Matrix::from_storage(self.storage.reorder_cols(&order)))
    }

    /// 1-based row numbers in the order that sorts column `j`
    pub fn order_rows(&self, j: usize, reverse: bool) -> Result<Vector> {
        Ok(positions(&self.col(j)?.order(reverse)?))
    }

    /// 1-based column numbers in the order that sorts row `i`
    pub fn order_cols(&self, i: usize, reverse: bool) -> Result<Vector> {
        Ok(positions(&self.row(i)?.order(reverse)?))
    }

    /// Element at 1-based `(i, j)`
    pub fn at(&self, i: usize, j: usize) -> Result<RealValue> {
        Ok(self.get(one_based(i, self.rows())?, one_based(j, self.cols())?))
    }
}

fn lookup(keys: &Vector, values: &Vector, value: RealValue, rel: Relation) -> Vector {
    keys.as_slice()
        .iter()
        .zip(values.as_slice())
        .filter(|(k, _)| relates(k, value, rel))
        .map(|(_, &v)| v)
        .collect::<Vec<_>>()
        .into()
}

fn positions(order: &[usize]) -> Vector {
    Vector::from(
        order
            .iter()
            .map(|&k| RealValue::new((k + 1) as f64))
            .collect::<Vec<_>>(),
    )
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

    fn table() -> Matrix {
        Matrix::from_values(vec![
            vec![m(3.0), cm(100.0), m(2.0)],
            vec![m(30.0), m(10.0), m(20.0)],
        ])
        .unwrap()
    }

    // ========================================================================
    // Count and search
    // ========================================================================

    #[test]
    fn test_count_converts_searched_value() {
        let a = table();
        assert_eq!(a.count(m(1.0)), 1);
        assert_eq!(a.count(cm(200.0)), 1);
        assert_eq!(a.count_where(m(10.0), Relation::GreaterOrEqual), 3);
        assert_eq!(a.count(RealValue::with_units(1.0, Some(crate::Unit::second()))), 0);
    }

    #[test]
    fn test_count_implicit_zeros() {
        let d = Matrix::identity(3).unwrap();
        assert_eq!(d.count(RealValue::ZERO), 6);
        assert_eq!(d.count(m(0.0)), 6);
    }

    #[test]
    fn test_search_and_find_all() {
        let a = table();
        assert_eq!(a.search(m(1.0), 1, 1).unwrap(), (1, 2));
        assert_eq!(a.search(m(20.0), 1, 4).unwrap(), (2, 3));
        assert_eq!(a.search(m(99.0), 1, 1).unwrap(), (0, 0));
        assert!(a.search(m(1.0), 1, 0).is_err());
        let hits = a.find_all(m(2.5), Relation::Less).unwrap();
        assert_eq!((hits.rows(), hits.cols()), (2, 2));
        assert_eq!(hits.get(1, 0).value, 2.0);
        assert_eq!(hits.get(1, 1).value, 3.0);
    }

    // ========================================================================
    // Lookup and sorting
    // ========================================================================

    #[test]
    fn test_lookup() {
        let a = table();
        let h = a.hlookup(m(2.0), 1, 2, Relation::LessOrEqual).unwrap();
        assert_eq!(h.as_slice(), &[m(10.0), m(20.0)]);
        let v = a.vlookup(m(20.0), 3, 1, Relation::Equal).unwrap();
        assert_eq!(v.as_slice(), &[m(30.0)]);
    }

    #[test]
    fn test_sort_and_order() {
        let a = table();
        let s = a.sort_cols(1, false).unwrap();
        assert_eq!(s.get(0, 0), cm(100.0));
        assert_eq!(s.get(1, 2), m(30.0));
        let o = a.order_cols(1, true).unwrap();
        let idx: Vec<f64> = o.as_slice().iter().map(|v| v.value).collect();
        assert_eq!(idx, vec![1.0, 3.0, 2.0]);
        let r = a.sort_rows(2, true).unwrap();
        assert_eq!(r.get(0, 0), m(30.0));
    }

    #[test]
    fn test_sort_rejects_mixed_dimensions() {
        let a = Matrix::from_values(vec![vec![m(1.0), RealValue::with_units(1.0, Some(Unit::second()))]])
            .unwrap();
        assert!(a.sort_cols(1, false).is_err());
        assert_eq!(a.at(1, 2).unwrap().units, Some(Unit::second()));
    }
}
