//! Search, lookup and sorting
//!
//! Indexes in this module are 1-based, as in the calculation language.

use super::HpMatrix;
use crate::error::{LinalgError, Result};
use crate::storage::order_indexes;
use crate::value::{RealValue, Relation};
use crate::vector::HpVector;

impl HpMatrix {
    /// First entry equal to `value` at or after `(i, j)` in row-major order
    ///
    /// Returns the 1-based position, or `(0, 0)` when there is none.
    ///
    /// # Example
    ///
    /// ```
    /// use trueno_linalg::{HpMatrix, RealValue};
    ///
    /// let a = HpMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 2.0]]).unwrap();
    /// assert_eq!(a.search(RealValue::new(2.0), 1, 1).unwrap(), (1, 2));
    /// assert_eq!(a.search(RealValue::new(2.0), 1, 3).unwrap(), (2, 2));
    /// assert_eq!(a.search(RealValue::new(9.0), 1, 1).unwrap(), (0, 0));
    /// ```
    pub fn search(&self, value: RealValue, i: usize, j: usize) -> Result<(usize, usize)> {
        if i == 0 || j == 0 {
            return Err(LinalgError::index(format!("({i}, {j})")));
        }
        let Some(t) = self.target(value) else {
            return Ok((0, 0));
        };
        // A start column past the end continues on the next row
        let (i0, j0) = if j > self.cols() { (i, 0) } else { (i - 1, j - 1) };
        Ok(self
            .storage
            .search(i0, j0, |&x| Relation::Equal.holds(x, t))
            .map_or((0, 0), |(r, c)| (r + 1, c + 1)))
    }

    /// Positions of every entry `x` with `x rel value`
    ///
    /// Row 0 of the result holds the 1-based row indexes and row 1 the
    /// column indexes. Without a hit the result is a 2×1 zero matrix.
    pub fn find_all(&self, value: RealValue, rel: Relation) -> Result<HpMatrix> {
        let hits = match self.target(value) {
            Some(t) => self.storage.find_all(|&x| rel.holds(x, t)),
            None => Vec::new(),
        };
        if hits.is_empty() {
            return HpMatrix::new(2, 1);
        }
        let rows = vec![
            hits.iter().map(|&(i, _)| (i + 1) as f64).collect(),
            hits.iter().map(|&(_, j)| (j + 1) as f64).collect(),
        ];
        HpMatrix::from_rows(&rows)
    }

    /// Entries of row `return_row` in the columns where row `search_row`
    /// satisfies `x rel value`
    pub fn hlookup(
        &self,
        value: RealValue,
        search_row: usize,
        return_row: usize,
        rel: Relation,
    ) -> Result<HpVector> {
        let keys = self.row(search_row)?;
        let values = self.row(return_row)?;
        Ok(self.lookup(value, keys.raw(), values.raw(), rel))
    }

    /// Entries of column `return_col` in the rows where column `search_col`
    /// satisfies `x rel value`
    pub fn vlookup(
        &self,
        value: RealValue,
        search_col: usize,
        return_col: usize,
        rel: Relation,
    ) -> Result<HpVector> {
        let keys = self.col(search_col)?;
        let values = self.col(return_col)?;
        Ok(self.lookup(value, keys.raw(), values.raw(), rel))
    }

    fn lookup(&self, value: RealValue, keys: &[f64], values: &[f64], rel: Relation) -> HpVector {
        let data = match self.target(value) {
            Some(t) => keys
                .iter()
                .zip(values)
                .filter(|&(&k, _)| rel.holds(k, t))
                .map(|(_, &v)| v)
                .collect(),
            None => Vec::new(),
        };
        HpVector::new(data, self.units)
    }

    /// 0-based row order by the values of column `j`
    fn row_order(&self, j: usize, reverse: bool) -> Result<Vec<usize>> {
        let keys = self.col(j)?;
        Ok(order_indexes(keys.raw(), reverse, f64::total_cmp))
    }

    fn col_order(&self, i: usize, reverse: bool) -> Result<Vec<usize>> {
        let keys = self.row(i)?;
        Ok(order_indexes(keys.raw(), reverse, f64::total_cmp))
    }

    /// Rows reordered by the values in column `j`, as a Full matrix
    pub fn sort_rows(&self, j: usize, reverse: bool) -> Result<HpMatrix> {
        let order = self.row_order(j, reverse)?;
        Ok(self.derived(self.storage.reorder_rows(&order)))
    }

    /// Columns reordered by the values in row `i`
    pub fn sort_cols(&self, i: usize, reverse: bool) -> Result<HpMatrix> {
        let order = self.col_order(i, reverse)?;
        Ok(self.derived(self.storage.reorder_cols(&order)))
    }

    /// 1-based row numbers in the order that sorts column `j`
    pub fn order_rows(&self, j: usize, reverse: bool) -> Result<HpVector> {
        let order = self.row_order(j, reverse)?;
        Ok(positions(&order))
    }

    /// 1-based column numbers in the order that sorts row `i`
    pub fn order_cols(&self, i: usize, reverse: bool) -> Result<HpVector> {
        let order = self.col_order(i, reverse)?;
        Ok(positions(&order))
    }
}

fn positions(order: &[usize]) -> HpVector {
    HpVector::new(order.iter().map(|&k| (k + 1) as f64).collect(), None)
}
