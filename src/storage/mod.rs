//! Packed row storage shared by both matrix families
//!
//! A matrix is a logical `rows × cols` shape plus a [`Kind`] that fixes which
//! slots are physically stored. Storage never allocates more than the kind
//! requires:
//!
//! | Kind | Physical rows |
//! |------|---------------|
//! | `Full` | `rows` vectors of `cols` values |
//! | `Diagonal` | one vector of `n` values |
//! | `Column` | one vector of `rows` values |
//! | `Symmetric`, `UpperTriangular` | row `i` holds columns `i..n` |
//! | `LowerTriangular` | row `i` holds columns `0..=i` |
//!
//! [`Storage::slot`] is the single logical → physical index map; everything
//! else in the crate goes through it or through the raw rows.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use crate::config::MAX_SIZE;
use crate::error::{LinalgError, Result};
use crate::parallel;
use crate::value::RealValue;

pub mod dispatch;

pub use dispatch::Arithmetic;

/// Element stored in a matrix
pub trait Element: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The implicit value of unstored slots
    const ZERO: Self;

    /// Whether the value equals the implicit zero
    fn is_zero(&self) -> bool;
}

impl Element for f64 {
    const ZERO: Self = 0.0;

    fn is_zero(&self) -> bool {
        *self == 0.0
    }
}

impl Element for RealValue {
    const ZERO: Self = RealValue::ZERO;

    fn is_zero(&self) -> bool {
        self.value == 0.0
    }
}

/// Structural storage pattern of a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Dense rows
    Full,
    /// Main diagonal only
    Diagonal,
    /// Single column
    Column,
    /// Upper skyline, mirrored below the diagonal
    Symmetric,
    /// Entries on and above the diagonal
    UpperTriangular,
    /// Entries on and below the diagonal
    LowerTriangular,
}

impl Kind {
    /// Every stored slot can take any value, so the kind is closed under
    /// arbitrary element-wise operators
    pub fn is_structurally_consistent(self) -> bool {
        matches!(self, Kind::Full | Kind::Column | Kind::Symmetric)
    }

    /// Kinds that only exist as `n × n`
    pub fn is_square(self) -> bool {
        matches!(
            self,
            Kind::Diagonal | Kind::Symmetric | Kind::UpperTriangular | Kind::LowerTriangular
        )
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Kind::Full => "full",
            Kind::Diagonal => "diagonal",
            Kind::Column => "column",
            Kind::Symmetric => "symmetric",
            Kind::UpperTriangular => "upper triangular",
            Kind::LowerTriangular => "lower triangular",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validates a requested shape against [`MAX_SIZE`]
pub(crate) fn check_size(rows: usize, cols: usize) -> Result<()> {
    if rows > MAX_SIZE || cols > MAX_SIZE {
        return Err(LinalgError::MatrixSizeLimit { rows, cols });
    }
    if rows == 0 || cols == 0 {
        return Err(LinalgError::MatrixDimensions);
    }
    Ok(())
}

/// Converts a 1-based index into 0-based, checking `1..=len`
pub(crate) fn one_based(index: usize, len: usize) -> Result<usize> {
    if index < 1 || index > len {
        return Err(LinalgError::index(index));
    }
    Ok(index - 1)
}

/// Stable ordering permutation of `values`
pub(crate) fn order_indexes<T, F>(values: &[T], reverse: bool, cmp: F) -> Vec<usize>
where
    F: Fn(&T, &T) -> Ordering,
{
    let mut order: Vec<usize> = (0..values.len()).collect();
    if reverse {
        order.sort_by(|&a, &b| cmp(&values[b], &values[a]));
    } else {
        order.sort_by(|&a, &b| cmp(&values[a], &values[b]));
    }
    order
}

/// Packed row storage for one matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Storage<T> {
    kind: Kind,
    rows: usize,
    cols: usize,
    data: Vec<Vec<T>>,
}

impl<T: Element> Storage<T> {
    /// Zero matrix of the given kind and shape
    ///
    /// # Errors
    ///
    /// - `MatrixSizeLimit` when a dimension exceeds [`MAX_SIZE`]
    /// - `MatrixNotSquare` for a square kind with `rows != cols`
    /// - `MatrixDimensions` for a `Column` with `cols != 1` or an empty shape
    pub fn new(kind: Kind, rows: usize, cols: usize) -> Result<Self> {
        check_size(rows, cols)?;
        if kind.is_square() && rows != cols {
            return Err(LinalgError::MatrixNotSquare);
        }
        if kind == Kind::Column && cols != 1 {
            return Err(LinalgError::MatrixDimensions);
        }
        let data = match kind {
            Kind::Full => vec![vec![T::ZERO; cols]; rows],
            Kind::Diagonal | Kind::Column => vec![vec![T::ZERO; rows]],
            Kind::Symmetric | Kind::UpperTriangular => {
                (0..rows).map(|i| vec![T::ZERO; rows - i]).collect()
            }
            Kind::LowerTriangular => (0..rows).map(|i| vec![T::ZERO; i + 1]).collect(),
        };
        Ok(Self {
            kind,
            rows,
            cols,
            data,
        })
    }

    /// Wraps raw rows that already follow the kind's layout
    pub(crate) fn from_parts(kind: Kind, rows: usize, cols: usize, data: Vec<Vec<T>>) -> Self {
        debug_assert_eq!(
            data.len(),
            match kind {
                Kind::Diagonal | Kind::Column => 1,
                _ => rows,
            }
        );
        Self {
            kind,
            rows,
            cols,
            data,
        }
    }

    /// Full matrix from equally long rows
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let m = rows.len();
        let n = rows.first().map_or(0, Vec::len);
        check_size(m, n)?;
        if rows.iter().any(|r| r.len() != n) {
            return Err(LinalgError::MatrixDimensions);
        }
        Ok(Self::from_parts(Kind::Full, m, n, rows))
    }

    /// Full matrix whose columns are `cols`
    pub fn from_cols(cols: &[Vec<T>]) -> Result<Self> {
        let n = cols.len();
        let m = cols.first().map_or(0, Vec::len);
        check_size(m, n)?;
        if cols.iter().any(|c| c.len() != m) {
            return Err(LinalgError::MatrixDimensions);
        }
        let data = (0..m).map(|i| cols.iter().map(|c| c[i]).collect()).collect();
        Ok(Self::from_parts(Kind::Full, m, n, data))
    }

    /// Matrix of `kind` whose stored slots are filled from `f(i, j)`
    pub fn from_fn<F>(kind: Kind, rows: usize, cols: usize, f: F) -> Result<Self>
    where
        F: Fn(usize, usize) -> T,
    {
        let mut s = Self::new(kind, rows, cols)?;
        s.fill_with(f);
        Ok(s)
    }

    fn fill_with<F>(&mut self, f: F)
    where
        F: Fn(usize, usize) -> T,
    {
        match self.kind {
            Kind::Full | Kind::LowerTriangular => {
                for (i, row) in self.data.iter_mut().enumerate() {
                    for (j, x) in row.iter_mut().enumerate() {
                        *x = f(i, j);
                    }
                }
            }
            Kind::Symmetric | Kind::UpperTriangular => {
                for (i, row) in self.data.iter_mut().enumerate() {
                    for (k, x) in row.iter_mut().enumerate() {
                        *x = f(i, i + k);
                    }
                }
            }
            Kind::Diagonal => {
                for (i, x) in self.data[0].iter_mut().enumerate() {
                    *x = f(i, i);
                }
            }
            Kind::Column => {
                for (i, x) in self.data[0].iter_mut().enumerate() {
                    *x = f(i, 0);
                }
            }
        }
    }

    /// Storage kind
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Logical row count
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Logical column count
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `rows == cols`
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Physical rows, laid out per the kind
    pub fn raw_rows(&self) -> &[Vec<T>] {
        &self.data
    }

    pub(crate) fn raw_rows_mut(&mut self) -> &mut [Vec<T>] {
        &mut self.data
    }

    pub(crate) fn into_raw(self) -> Vec<Vec<T>> {
        self.data
    }

    /// Physical `(row, offset)` of logical `(i, j)`, or `None` when the slot
    /// is out of range or an implicit zero
    pub fn slot(&self, i: usize, j: usize) -> Option<(usize, usize)> {
        if i >= self.rows || j >= self.cols {
            return None;
        }
        match self.kind {
            Kind::Full => Some((i, j)),
            Kind::Diagonal => (i == j).then_some((0, i)),
            Kind::Column => Some((0, i)),
            Kind::Symmetric => Some(if j >= i { (i, j - i) } else { (j, i - j) }),
            Kind::UpperTriangular => (j >= i).then(|| (i, j - i)),
            Kind::LowerTriangular => (j <= i).then_some((i, j)),
        }
    }

    /// Whether `(i, j)` is stored and may hold a nonzero
    pub fn is_target(&self, i: usize, j: usize) -> bool {
        self.slot(i, j).is_some()
    }

    /// Value at logical `(i, j)` (0-based)
    ///
    /// # Panics
    ///
    /// Panics if the index is outside the logical shape.
    pub fn get(&self, i: usize, j: usize) -> T {
        assert!(
            i < self.rows && j < self.cols,
            "index ({i}, {j}) out of range for {}×{} matrix",
            self.rows,
            self.cols
        );
        self.slot(i, j).map_or(T::ZERO, |(r, c)| self.data[r][c])
    }

    /// Checked [`Storage::get`]
    pub fn try_get(&self, i: usize, j: usize) -> Result<T> {
        if i >= self.rows {
            return Err(LinalgError::index(i));
        }
        if j >= self.cols {
            return Err(LinalgError::index(j));
        }
        Ok(self.get(i, j))
    }

    /// Writes logical `(i, j)`; zeros off the stored pattern are accepted
    /// and ignored
    pub fn set(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        if i >= self.rows {
            return Err(LinalgError::index(i));
        }
        if j >= self.cols {
            return Err(LinalgError::index(j));
        }
        match self.slot(i, j) {
            Some((r, c)) => {
                self.data[r][c] = value;
                Ok(())
            }
            None if value.is_zero() => Ok(()),
            None => Err(LinalgError::IndexOutOfRange(format!(
                "({i}, {j}) is not stored in a {} matrix",
                self.kind
            ))),
        }
    }

    /// Logical row `i` as an owned vector
    pub fn row(&self, i: usize) -> Vec<T> {
        match self.kind {
            Kind::Full => self.data[i].clone(),
            Kind::LowerTriangular => {
                let mut row = self.data[i].clone();
                row.resize(self.cols, T::ZERO);
                row
            }
            _ => (0..self.cols).map(|j| self.get(i, j)).collect(),
        }
    }

    /// Logical column `j` as an owned vector
    pub fn col(&self, j: usize) -> Vec<T> {
        match self.kind {
            Kind::Column => self.data[0].clone(),
            Kind::Symmetric => self.row(j),
            _ => (0..self.rows).map(|i| self.get(i, j)).collect(),
        }
    }

    /// Logical row `i`: borrowed when the row is stored densely, owned otherwise
    ///
    /// A borrowed view aliases the matrix; mutate through [`Storage::set_row`]
    /// instead.
    pub fn row_view(&self, i: usize) -> Cow<'_, [T]> {
        match self.kind {
            Kind::Full => Cow::Borrowed(&self.data[i]),
            _ => Cow::Owned(self.row(i)),
        }
    }

    /// Main diagonal
    pub fn diagonal(&self) -> Vec<T> {
        let n = self.rows.min(self.cols);
        match self.kind {
            Kind::Diagonal => self.data[0].clone(),
            Kind::Symmetric | Kind::UpperTriangular => self.data.iter().map(|r| r[0]).collect(),
            Kind::LowerTriangular => self.data.iter().enumerate().map(|(i, r)| r[i]).collect(),
            _ => (0..n).map(|i| self.get(i, i)).collect(),
        }
    }

    /// Number of physically stored values
    pub fn stored_len(&self) -> usize {
        self.data.iter().map(Vec::len).sum()
    }

    /// Iterates the stored values in physical order
    pub fn iter_stored(&self) -> impl Iterator<Item = &T> {
        self.data.iter().flat_map(|r| r.iter())
    }

    /// Same pattern, every stored value mapped
    pub fn map<U, F>(&self, f: F) -> Storage<U>
    where
        U: Element,
        F: Fn(T) -> U + Sync + Send,
    {
        let data = parallel::map_range(self.data.len(), |r| {
            self.data[r].iter().map(|&x| f(x)).collect()
        });
        Storage::from_parts(self.kind, self.rows, self.cols, data)
    }

    /// Fallible [`Storage::map`]
    pub fn try_map<U, F>(&self, f: F) -> Result<Storage<U>>
    where
        U: Element,
        F: Fn(T) -> Result<U> + Sync + Send,
    {
        let data = parallel::try_map_range(self.data.len(), |r| {
            self.data[r].iter().map(|&x| f(x)).collect::<Result<Vec<U>>>()
        })?;
        Ok(Storage::from_parts(self.kind, self.rows, self.cols, data))
    }

    /// Maps every logical entry into a new `Full` matrix (`Column` stays `Column`)
    pub fn try_map_logical<U, F>(&self, f: F) -> Result<Storage<U>>
    where
        U: Element,
        F: Fn(T) -> Result<U> + Sync + Send,
    {
        if self.kind == Kind::Column {
            return self.try_map(f);
        }
        let data = parallel::try_map_range(self.rows, |i| {
            (0..self.cols)
                .map(|j| f(self.get(i, j)))
                .collect::<Result<Vec<U>>>()
        })?;
        Ok(Storage::from_parts(Kind::Full, self.rows, self.cols, data))
    }

    /// Slot-wise combination of two matrices of the same kind and shape
    pub fn try_zip_packed<U, F>(&self, other: &Storage<T>, f: F) -> Result<Storage<U>>
    where
        U: Element,
        F: Fn(T, T) -> Result<U> + Sync + Send,
    {
        if self.kind != other.kind || self.rows != other.rows || self.cols != other.cols {
            return Err(LinalgError::MatrixDimensions);
        }
        let data = parallel::try_map_range(self.data.len(), |r| {
            self.data[r]
                .iter()
                .zip(&other.data[r])
                .map(|(&a, &b)| f(a, b))
                .collect::<Result<Vec<U>>>()
        })?;
        Ok(Storage::from_parts(self.kind, self.rows, self.cols, data))
    }

    /// Entry-wise combination over logical indices into a `Full` matrix
    pub fn try_zip_logical<U, F>(&self, other: &Storage<T>, f: F) -> Result<Storage<U>>
    where
        U: Element,
        F: Fn(T, T) -> Result<U> + Sync + Send,
    {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(LinalgError::MatrixDimensions);
        }
        let data = parallel::try_map_range(self.rows, |i| {
            (0..self.cols)
                .map(|j| f(self.get(i, j), other.get(i, j)))
                .collect::<Result<Vec<U>>>()
        })?;
        Ok(Storage::from_parts(Kind::Full, self.rows, self.cols, data))
    }

    /// Dense copy with the same logical values
    pub fn to_full(&self) -> Storage<T> {
        if self.kind == Kind::Full {
            return self.clone();
        }
        let data = (0..self.rows).map(|i| self.row(i)).collect();
        Storage::from_parts(Kind::Full, self.rows, self.cols, data)
    }

    /// Transpose; `Diagonal` and `Symmetric` are their own transpose and the
    /// triangular kinds swap into each other
    pub fn transpose(&self) -> Storage<T> {
        let n = self.rows;
        match self.kind {
            Kind::Diagonal | Kind::Symmetric => self.clone(),
            Kind::Column => Storage::from_parts(Kind::Full, 1, n, vec![self.data[0].clone()]),
            Kind::Full if n == 1 => Storage::from_parts(Kind::Column, self.cols, 1, self.data.clone()),
            Kind::Full => {
                let data = (0..self.cols).map(|j| self.col(j)).collect();
                Storage::from_parts(Kind::Full, self.cols, n, data)
            }
            Kind::UpperTriangular => {
                let data = (0..n)
                    .map(|i| (0..=i).map(|j| self.data[j][i - j]).collect())
                    .collect();
                Storage::from_parts(Kind::LowerTriangular, n, n, data)
            }
            Kind::LowerTriangular => {
                let data = (0..n)
                    .map(|i| (i..n).map(|j| self.data[j][i]).collect())
                    .collect();
                Storage::from_parts(Kind::UpperTriangular, n, n, data)
            }
        }
    }

    /// Resizes in place, keeping the overlapping entries
    ///
    /// `Full` grows or shrinks each dimension independently. A `Column` keeps
    /// its kind for `n == 1`, square kinds keep theirs for `m == n`; any other
    /// shape change materializes a `Full` matrix.
    pub fn resize(&mut self, m: usize, n: usize) -> Result<()> {
        check_size(m, n)?;
        match self.kind {
            Kind::Full => {
                self.data.resize(m, vec![T::ZERO; n]);
                for row in &mut self.data {
                    row.resize(n, T::ZERO);
                }
            }
            Kind::Column if n == 1 => self.data[0].resize(m, T::ZERO),
            Kind::Diagonal if m == n => self.data[0].resize(n, T::ZERO),
            Kind::Symmetric | Kind::UpperTriangular if m == n => {
                self.data.truncate(n);
                for (i, row) in self.data.iter_mut().enumerate() {
                    row.resize(n - i, T::ZERO);
                }
                for i in self.rows..n {
                    self.data.push(vec![T::ZERO; n - i]);
                }
            }
            Kind::LowerTriangular if m == n => {
                self.data.truncate(n);
                for i in self.rows..n {
                    self.data.push(vec![T::ZERO; i + 1]);
                }
            }
            _ if m == self.rows && n == self.cols => return Ok(()),
            _ => {
                let r = m.min(self.rows);
                let c = n.min(self.cols);
                let mut data = vec![vec![T::ZERO; n]; m];
                for (i, row) in data.iter_mut().enumerate().take(r) {
                    for (j, x) in row.iter_mut().enumerate().take(c) {
                        *x = self.get(i, j);
                    }
                }
                self.kind = Kind::Full;
                self.data = data;
            }
        }
        self.rows = m;
        self.cols = n;
        Ok(())
    }

    /// Full block `[i1..=i2] × [j1..=j2]` (1-based; swapped bounds are normalised)
    pub fn submatrix(&self, i1: usize, i2: usize, j1: usize, j2: usize) -> Result<Storage<T>> {
        let (i1, i2) = if i2 < i1 { (i2, i1) } else { (i1, i2) };
        let (j1, j2) = if j2 < j1 { (j2, j1) } else { (j1, j2) };
        let i0 = one_based(i1, self.rows)?;
        let i2 = one_based(i2, self.rows)?;
        let j0 = one_based(j1, self.cols)?;
        let j2 = one_based(j2, self.cols)?;
        let data = (i0..=i2)
            .map(|i| match self.kind {
                Kind::Full => self.data[i][j0..=j2].to_vec(),
                _ => (j0..=j2).map(|j| self.get(i, j)).collect(),
            })
            .collect();
        Ok(Storage::from_parts(Kind::Full, i2 - i0 + 1, j2 - j0 + 1, data))
    }

    /// Full matrix of the listed rows (1-based, repeats allowed)
    pub fn extract_rows(&self, indexes: &[usize]) -> Result<Storage<T>> {
        check_size(indexes.len(), self.cols)?;
        let data = indexes
            .iter()
            .map(|&k| one_based(k, self.rows).map(|i| self.row(i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Storage::from_parts(Kind::Full, indexes.len(), self.cols, data))
    }

    /// Full matrix of the listed columns (1-based, repeats allowed)
    pub fn extract_cols(&self, indexes: &[usize]) -> Result<Storage<T>> {
        check_size(self.rows, indexes.len())?;
        let cols = indexes
            .iter()
            .map(|&k| one_based(k, self.cols).map(|j| self.col(j)))
            .collect::<Result<Vec<_>>>()?;
        Storage::from_cols(&cols)
    }

    /// Side-by-side concatenation; shorter parts are zero-padded at the bottom
    pub fn augment(parts: &[&Storage<T>]) -> Result<Storage<T>> {
        let m = parts.iter().map(|p| p.rows).max().unwrap_or(0);
        let n = parts.iter().map(|p| p.cols).sum();
        let mut out = Storage::new(Kind::Full, m, n)?;
        let mut c = 0;
        for p in parts {
            for i in 0..p.rows {
                for j in 0..p.cols {
                    out.data[i][c + j] = p.get(i, j);
                }
            }
            c += p.cols;
        }
        Ok(out)
    }

    /// Top-to-bottom concatenation; narrower parts are zero-padded on the right
    pub fn stack(parts: &[&Storage<T>]) -> Result<Storage<T>> {
        let m = parts.iter().map(|p| p.rows).sum();
        let n = parts.iter().map(|p| p.cols).max().unwrap_or(0);
        let mut out = Storage::new(Kind::Full, m, n)?;
        let mut r = 0;
        for p in parts {
            for i in 0..p.rows {
                for j in 0..p.cols {
                    out.data[r + i][j] = p.get(i, j);
                }
            }
            r += p.rows;
        }
        Ok(out)
    }

    /// Sets every stored slot
    pub fn fill(&mut self, value: T) {
        parallel::for_each_mut(&mut self.data, |_, row| row.fill(value));
    }

    /// Sets the stored slots of logical row `i` (1-based)
    pub fn fill_row(&mut self, i: usize, value: T) -> Result<()> {
        let i = one_based(i, self.rows)?;
        for j in 0..self.cols {
            if let Some((r, c)) = self.slot(i, j) {
                self.data[r][c] = value;
            }
        }
        Ok(())
    }

    /// Sets the stored slots of logical column `j` (1-based)
    pub fn fill_col(&mut self, j: usize, value: T) -> Result<()> {
        let j = one_based(j, self.cols)?;
        for i in 0..self.rows {
            if let Some((r, c)) = self.slot(i, j) {
                self.data[r][c] = value;
            }
        }
        Ok(())
    }

    /// Overwrites logical row `i` (0-based) from `values`; extra values are
    /// ignored and missing ones leave the row untouched
    pub fn set_row(&mut self, i: usize, values: &[T]) -> Result<()> {
        if i >= self.rows {
            return Err(LinalgError::index(i));
        }
        for (j, &v) in values.iter().enumerate().take(self.cols) {
            self.set(i, j, v)?;
        }
        Ok(())
    }

    /// Overwrites logical column `j` (0-based) from `values`
    pub fn set_col(&mut self, j: usize, values: &[T]) -> Result<()> {
        if j >= self.cols {
            return Err(LinalgError::index(j));
        }
        for (i, &v) in values.iter().enumerate().take(self.rows) {
            self.set(i, j, v)?;
        }
        Ok(())
    }

    /// Combines `self` into `target` at 1-based offset `(i, j)`, writing only
    /// where the target can store a value
    pub(crate) fn merge_into<F>(&self, target: &mut Storage<T>, i: usize, j: usize, f: F) -> Result<()>
    where
        F: Fn(T, T) -> Result<T>,
    {
        let i0 = one_based(i, target.rows)?;
        let j0 = one_based(j, target.cols)?;
        let m = self.rows.min(target.rows - i0);
        let n = self.cols.min(target.cols - j0);
        for ii in 0..m {
            for jj in 0..n {
                if let Some((r, c)) = target.slot(i0 + ii, j0 + jj) {
                    target.data[r][c] = f(target.data[r][c], self.get(ii, jj))?;
                }
            }
        }
        Ok(())
    }

    /// Copies `self` into `target` at 1-based offset `(i, j)`
    pub fn copy_to(&self, target: &mut Storage<T>, i: usize, j: usize) -> Result<()> {
        self.merge_into(target, i, j, |_, v| Ok(v))
    }

    /// Full matrix whose row `k` is row `order[k]` of `self` (0-based)
    pub fn reorder_rows(&self, order: &[usize]) -> Storage<T> {
        let data = order.iter().map(|&i| self.row(i)).collect();
        Storage::from_parts(Kind::Full, self.rows, self.cols, data)
    }

    /// Full matrix whose column `k` is column `order[k]` of `self` (0-based)
    pub fn reorder_cols(&self, order: &[usize]) -> Storage<T> {
        let data = (0..self.rows)
            .map(|i| order.iter().map(|&j| self.get(i, j)).collect())
            .collect();
        Storage::from_parts(Kind::Full, self.rows, self.cols, data)
    }

    /// First logical `(i, j)` at or after `(i0, j0)` in row-major order where
    /// `pred` holds
    pub fn search<F>(&self, i0: usize, j0: usize, pred: F) -> Option<(usize, usize)>
    where
        F: Fn(&T) -> bool,
    {
        let mut j_start = j0;
        for i in i0..self.rows {
            for j in j_start..self.cols {
                if pred(&self.get(i, j)) {
                    return Some((i, j));
                }
            }
            j_start = 0;
        }
        None
    }

    /// Every logical `(i, j)` in row-major order where `pred` holds
    pub fn find_all<F>(&self, pred: F) -> Vec<(usize, usize)>
    where
        F: Fn(&T) -> bool,
    {
        let mut hits = Vec::new();
        for i in 0..self.rows {
            for j in 0..self.cols {
                if pred(&self.get(i, j)) {
                    hits.push((i, j));
                }
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(kind: Kind, n: usize) -> Storage<f64> {
        Storage::from_fn(kind, n, if kind == Kind::Column { 1 } else { n }, |i, j| {
            (10 * (i + 1) + j + 1) as f64
        })
        .unwrap()
    }

    // ========================================================================
    // Layout
    // ========================================================================

    #[test]
    fn test_allocation_per_kind() {
        let n = 5;
        assert_eq!(Storage::<f64>::new(Kind::Full, n, n).unwrap().stored_len(), 25);
        assert_eq!(Storage::<f64>::new(Kind::Diagonal, n, n).unwrap().stored_len(), 5);
        assert_eq!(Storage::<f64>::new(Kind::Column, n, 1).unwrap().stored_len(), 5);
        assert_eq!(Storage::<f64>::new(Kind::Symmetric, n, n).unwrap().stored_len(), 15);
        assert_eq!(Storage::<f64>::new(Kind::UpperTriangular, n, n).unwrap().stored_len(), 15);
        assert_eq!(Storage::<f64>::new(Kind::LowerTriangular, n, n).unwrap().stored_len(), 15);
    }

    #[test]
    fn test_shape_validation() {
        assert_eq!(
            Storage::<f64>::new(Kind::Diagonal, 2, 3),
            Err(LinalgError::MatrixNotSquare)
        );
        assert_eq!(
            Storage::<f64>::new(Kind::Column, 3, 2),
            Err(LinalgError::MatrixDimensions)
        );
        assert!(matches!(
            Storage::<f64>::new(Kind::Full, MAX_SIZE + 1, 1),
            Err(LinalgError::MatrixSizeLimit { .. })
        ));
    }

    #[test]
    fn test_symmetric_mirrors() {
        let mut s = Storage::<f64>::new(Kind::Symmetric, 3, 3).unwrap();
        s.set(2, 0, 7.0).unwrap();
        assert_eq!(s.get(0, 2), 7.0);
        assert_eq!(s.raw_rows()[0], vec![0.0, 0.0, 7.0]);
    }

    #[test]
    fn test_set_off_pattern() {
        let mut d = Storage::<f64>::new(Kind::Diagonal, 3, 3).unwrap();
        assert!(d.set(0, 1, 0.0).is_ok());
        assert!(matches!(
            d.set(0, 1, 1.0),
            Err(LinalgError::IndexOutOfRange(_))
        ));
        let mut u = Storage::<f64>::new(Kind::UpperTriangular, 3, 3).unwrap();
        assert!(u.set(2, 1, 4.0).is_err());
        assert!(u.set(1, 2, 4.0).is_ok());
        assert_eq!(u.get(1, 2), 4.0);
        assert_eq!(u.get(2, 1), 0.0);
    }

    #[test]
    fn test_row_and_col_views() {
        let l = numbered(Kind::LowerTriangular, 3);
        assert_eq!(l.row(1), vec![21.0, 22.0, 0.0]);
        assert_eq!(l.col(0), vec![11.0, 21.0, 31.0]);
        let f = numbered(Kind::Full, 2);
        assert!(matches!(f.row_view(0), Cow::Borrowed(_)));
        assert!(matches!(l.row_view(0), Cow::Owned(_)));
    }

    // ========================================================================
    // Structure
    // ========================================================================

    #[test]
    fn test_transpose_triangular_swaps_kind() {
        let u = numbered(Kind::UpperTriangular, 3);
        let l = u.transpose();
        assert_eq!(l.kind(), Kind::LowerTriangular);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(l.get(i, j), u.get(j, i));
            }
        }
        assert_eq!(l.transpose(), u);
    }

    #[test]
    fn test_transpose_row_and_column() {
        let row = Storage::from_rows(vec![vec![1.0, 2.0, 3.0]]).unwrap();
        let col = row.transpose();
        assert_eq!(col.kind(), Kind::Column);
        assert_eq!(col.rows(), 3);
        let back = col.transpose();
        assert_eq!(back.kind(), Kind::Full);
        assert_eq!((back.rows(), back.cols()), (1, 3));
    }

    #[test]
    fn test_resize_keeps_kind_or_materializes() {
        let mut s = numbered(Kind::Symmetric, 3);
        s.resize(4, 4).unwrap();
        assert_eq!(s.kind(), Kind::Symmetric);
        assert_eq!(s.get(2, 1), 23.0);
        assert_eq!(s.get(3, 3), 0.0);

        let mut d = numbered(Kind::Diagonal, 3);
        d.resize(2, 4).unwrap();
        assert_eq!(d.kind(), Kind::Full);
        assert_eq!(d.get(1, 1), 22.0);
        assert_eq!(d.get(0, 3), 0.0);

        let mut l = numbered(Kind::LowerTriangular, 3);
        l.resize(2, 2).unwrap();
        assert_eq!(l.raw_rows().len(), 2);
        assert_eq!(l.get(1, 0), 21.0);
    }

    #[test]
    fn test_submatrix_normalises_bounds() {
        let f = numbered(Kind::Full, 4);
        let s = f.submatrix(3, 2, 2, 3).unwrap();
        assert_eq!(s.raw_rows(), &[vec![22.0, 23.0], vec![32.0, 33.0]]);
        assert!(f.submatrix(0, 2, 1, 1).is_err());
        assert!(f.submatrix(1, 5, 1, 1).is_err());
    }

    #[test]
    fn test_augment_and_stack_pad() {
        let a = Storage::from_rows(vec![vec![1.0], vec![2.0]]).unwrap();
        let b = Storage::from_rows(vec![vec![3.0, 4.0]]).unwrap();
        let aug = Storage::augment(&[&a, &b]).unwrap();
        assert_eq!(aug.raw_rows(), &[vec![1.0, 3.0, 4.0], vec![2.0, 0.0, 0.0]]);
        let st = Storage::stack(&[&a, &b]).unwrap();
        assert_eq!(
            st.raw_rows(),
            &[vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 4.0]]
        );
    }

    #[test]
    fn test_copy_to_respects_target_pattern() {
        let src = Storage::from_rows(vec![vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let mut tgt = Storage::<f64>::new(Kind::UpperTriangular, 3, 3).unwrap();
        src.copy_to(&mut tgt, 2, 2).unwrap();
        assert_eq!(tgt.get(1, 1), 1.0);
        assert_eq!(tgt.get(1, 2), 1.0);
        assert_eq!(tgt.get(2, 1), 0.0);
        assert_eq!(tgt.get(2, 2), 1.0);
    }

    #[test]
    fn test_search_wraps_rows() {
        let f = numbered(Kind::Full, 3);
        assert_eq!(f.search(0, 2, |&v| v > 20.0), Some((1, 0)));
        assert_eq!(f.search(2, 2, |&v| v < 0.0), None);
        assert_eq!(f.find_all(|&v| v == 22.0 || v == 11.0), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_zip_packed_requires_same_kind() {
        let a = numbered(Kind::Diagonal, 3);
        let b = numbered(Kind::Full, 3);
        assert!(a.try_zip_packed(&b, |x, y| Ok(x + y)).is_err());
        let c = a.try_zip_packed(&a, |x, y| Ok(x + y)).unwrap();
        assert_eq!(c.kind(), Kind::Diagonal);
        assert_eq!(c.get(2, 2), 66.0);
    }

    #[test]
    fn test_order_indexes_stable() {
        let v = [3.0, 1.0, 3.0, 2.0];
        let cmp = |a: &f64, b: &f64| a.total_cmp(b);
        assert_eq!(order_indexes(&v, false, cmp), vec![1, 3, 0, 2]);
        assert_eq!(order_indexes(&v, true, cmp), vec![0, 2, 3, 1]);
    }
}
