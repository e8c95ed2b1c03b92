//! Kind-pair dispatch for element-wise operators and matrix products
//!
//! Both matrix families funnel their binary operators through here. The
//! rule is the same everywhere: two operands of the same kind stay packed
//! when every stored slot can take the result (structurally consistent
//! kind) or when the operator maps zero to zero; anything else materializes
//! a `Full` result over logical indices.
//!
//! Products specialize by kind pair so the sparse shapes never pay the
//! dense O(n³) loop:
//!
//! | a × b | Path | Result |
//! |-------|------|--------|
//! | any × `Column` | per-row dot over the stored run | `Column` |
//! | `Diagonal` × `Diagonal` | element-wise | `Diagonal` |
//! | `Diagonal` × X | row scaling | kind of X (`Symmetric` → `Full`) |
//! | X × `Diagonal` | column scaling | kind of X (`Symmetric` → `Full`) |
//! | otherwise | row axpy over dense rows of b | `Full` |

use std::borrow::Cow;

use super::{Element, Kind, Storage};
use crate::error::{LinalgError, Result};
use crate::parallel;
use crate::value::RealValue;
use crate::vectorized;

/// Ring operations the product paths need from an element type
///
/// `dot` and `axpy` have scalar defaults; `f64` overrides them with the
/// SIMD kernels.
pub trait Arithmetic: Element {
    fn try_add(self, other: Self) -> Result<Self>;

    fn try_mul(self, other: Self) -> Result<Self>;

    /// Σ aᵢ·bᵢ over the common prefix
    fn dot(a: &[Self], b: &[Self]) -> Result<Self> {
        a.iter()
            .zip(b)
            .try_fold(Self::ZERO, |acc, (&x, &y)| acc.try_add(x.try_mul(y)?))
    }

    /// `y += alpha·x` over the common prefix
    fn axpy(x: &[Self], alpha: Self, y: &mut [Self]) -> Result<()> {
        for (yj, &xj) in y.iter_mut().zip(x) {
            *yj = yj.try_add(alpha.try_mul(xj)?)?;
        }
        Ok(())
    }
}

impl Arithmetic for f64 {
    #[inline]
    fn try_add(self, other: Self) -> Result<Self> {
        Ok(self + other)
    }

    #[inline]
    fn try_mul(self, other: Self) -> Result<Self> {
        Ok(self * other)
    }

    fn dot(a: &[Self], b: &[Self]) -> Result<Self> {
        let n = a.len().min(b.len());
        Ok(vectorized::dot(&a[..n], &b[..n]))
    }

    fn axpy(x: &[Self], alpha: Self, y: &mut [Self]) -> Result<()> {
        let n = x.len().min(y.len());
        vectorized::axpy(&x[..n], alpha, &mut y[..n]);
        Ok(())
    }
}

impl Arithmetic for RealValue {
    fn try_add(self, other: Self) -> Result<Self> {
        self.add(other)
    }

    /// A zero factor yields the unit-less zero so it can join any sum
    fn try_mul(self, other: Self) -> Result<Self> {
        if self.value == 0.0 || other.value == 0.0 {
            return Ok(RealValue::ZERO);
        }
        Ok(self.mul(other))
    }
}

fn check_same_shape<T: Element, U: Element>(a: &Storage<T>, b: &Storage<U>) -> Result<()> {
    if a.rows() != b.rows() || a.cols() != b.cols() {
        return Err(LinalgError::MatrixDimensions);
    }
    Ok(())
}

/// Whether `a op b` may run slot-wise on the packed storage
pub fn stays_packed(a: Kind, b: Kind, preserves_zero: bool) -> bool {
    a == b && (a.is_structurally_consistent() || preserves_zero)
}

/// Element-wise `f(aᵢⱼ, bᵢⱼ)`
///
/// `preserves_zero` must hold only when `f(0, 0) == 0`.
pub fn zip<T, U, F>(a: &Storage<T>, b: &Storage<T>, preserves_zero: bool, f: F) -> Result<Storage<U>>
where
    T: Element,
    U: Element,
    F: Fn(T, T) -> Result<U> + Sync + Send,
{
    check_same_shape(a, b)?;
    if stays_packed(a.kind(), b.kind(), preserves_zero) {
        a.try_zip_packed(b, f)
    } else {
        a.try_zip_logical(b, f)
    }
}

/// Element-wise `f(aᵢⱼ)` against a scalar folded into `f`
///
/// `preserves_zero` must hold only when `f(0) == 0`.
pub fn map<T, U, F>(a: &Storage<T>, preserves_zero: bool, f: F) -> Result<Storage<U>>
where
    T: Element,
    U: Element,
    F: Fn(T) -> Result<U> + Sync + Send,
{
    if a.kind().is_structurally_consistent() || preserves_zero {
        a.try_map(f)
    } else {
        a.try_map_logical(f)
    }
}

/// Element-wise product; always zero preserving
pub fn hadamard<T: Arithmetic>(a: &Storage<T>, b: &Storage<T>) -> Result<Storage<T>> {
    zip(a, b, true, T::try_mul)
}

/// Kronecker product `a ⊗ b` as a `Full` matrix of shape `(m·p) × (n·q)`
pub fn kronecker<T: Arithmetic>(a: &Storage<T>, b: &Storage<T>) -> Result<Storage<T>> {
    let (m, n) = (a.rows(), a.cols());
    let (p, q) = (b.rows(), b.cols());
    super::check_size(m * p, n * q)?;
    let data = parallel::try_map_range(m * p, |r| {
        let (i, k) = (r / p, r % p);
        let b_row = b.row_view(k);
        let mut row = Vec::with_capacity(n * q);
        for j in 0..n {
            let a_ij = a.get(i, j);
            for &b_kl in b_row.iter() {
                row.push(a_ij.try_mul(b_kl)?);
            }
        }
        Ok(row)
    })?;
    Ok(Storage::from_parts(Kind::Full, m * p, n * q, data))
}

/// Σ aᵢⱼ·bᵢⱼ over all logical entries
pub fn frobenius<T: Arithmetic>(a: &Storage<T>, b: &Storage<T>) -> Result<T> {
    check_same_shape(a, b)?;
    let partial = parallel::try_map_range(a.rows(), |i| T::dot(&a.row_view(i), &b.row_view(i)))?;
    partial.into_iter().try_fold(T::ZERO, T::try_add)
}

/// Matrix product `a · b` dispatched on the kind pair
pub fn product<T: Arithmetic>(a: &Storage<T>, b: &Storage<T>) -> Result<Storage<T>> {
    if a.cols() != b.rows() {
        return Err(LinalgError::MatrixDimensions);
    }
    match (a.kind(), b.kind()) {
        (_, Kind::Column) => times_column(a, &b.raw_rows()[0]),
        (Kind::Diagonal, Kind::Diagonal) => hadamard(a, b),
        (Kind::Diagonal, _) => scale_rows(&a.raw_rows()[0], b),
        (_, Kind::Diagonal) => scale_cols(a, &b.raw_rows()[0]),
        _ => general(a, b),
    }
}

/// `a · x` as a `Column`
fn times_column<T: Arithmetic>(a: &Storage<T>, x: &[T]) -> Result<Storage<T>> {
    let m = a.rows();
    let rows = a.raw_rows();
    let y = match a.kind() {
        Kind::Full => parallel::try_map_range(m, |i| T::dot(&rows[i], x))?,
        Kind::LowerTriangular => parallel::try_map_range(m, |i| T::dot(&rows[i], &x[..=i]))?,
        Kind::UpperTriangular => parallel::try_map_range(m, |i| T::dot(&rows[i], &x[i..]))?,
        Kind::Diagonal => rows[0]
            .iter()
            .zip(x)
            .map(|(&d, &v)| d.try_mul(v))
            .collect::<Result<Vec<T>>>()?,
        Kind::Column => rows[0]
            .iter()
            .map(|&v| v.try_mul(x[0]))
            .collect::<Result<Vec<T>>>()?,
        Kind::Symmetric => {
            let mut y = vec![T::ZERO; m];
            for (i, row) in rows.iter().enumerate() {
                let d = T::dot(row, &x[i..])?;
                y[i] = y[i].try_add(d)?;
                if row.len() > 1 && !x[i].is_zero() {
                    T::axpy(&row[1..], x[i], &mut y[i + 1..])?;
                }
            }
            y
        }
    };
    Ok(Storage::from_parts(Kind::Column, m, 1, vec![y]))
}

/// `diag(d) · b`
fn scale_rows<T: Arithmetic>(d: &[T], b: &Storage<T>) -> Result<Storage<T>> {
    match b.kind() {
        Kind::Full | Kind::UpperTriangular | Kind::LowerTriangular => {
            let rows = b.raw_rows();
            let data = parallel::try_map_range(rows.len(), |i| {
                rows[i]
                    .iter()
                    .map(|&v| d[i].try_mul(v))
                    .collect::<Result<Vec<T>>>()
            })?;
            Ok(Storage::from_parts(b.kind(), b.rows(), b.cols(), data))
        }
        _ => {
            let data = parallel::try_map_range(b.rows(), |i| {
                b.row_view(i)
                    .iter()
                    .map(|&v| d[i].try_mul(v))
                    .collect::<Result<Vec<T>>>()
            })?;
            Ok(Storage::from_parts(Kind::Full, b.rows(), b.cols(), data))
        }
    }
}

/// `a · diag(d)`
fn scale_cols<T: Arithmetic>(a: &Storage<T>, d: &[T]) -> Result<Storage<T>> {
    let rows = a.raw_rows();
    let scaled = |row: &[T], first: usize| {
        row.iter()
            .enumerate()
            .map(|(k, &v)| v.try_mul(d[first + k]))
            .collect::<Result<Vec<T>>>()
    };
    match a.kind() {
        Kind::Full | Kind::LowerTriangular => {
            let data = parallel::try_map_range(rows.len(), |i| scaled(&rows[i], 0))?;
            Ok(Storage::from_parts(a.kind(), a.rows(), a.cols(), data))
        }
        Kind::UpperTriangular => {
            let data = parallel::try_map_range(rows.len(), |i| scaled(&rows[i], i))?;
            Ok(Storage::from_parts(a.kind(), a.rows(), a.cols(), data))
        }
        _ => {
            let data = parallel::try_map_range(a.rows(), |i| scaled(&a.row_view(i), 0))?;
            Ok(Storage::from_parts(Kind::Full, a.rows(), a.cols(), data))
        }
    }
}

/// Dense rows of `b`, borrowed when already dense
fn dense_rows<T: Element>(b: &Storage<T>) -> Cow<'_, [Vec<T>]> {
    match b.kind() {
        Kind::Full => Cow::Borrowed(b.raw_rows()),
        _ => Cow::Owned(b.to_full().into_raw()),
    }
}

/// Row-axpy product: `cᵢ = Σₖ aᵢₖ·bₖ`, skipping zero `aᵢₖ`
fn general<T: Arithmetic>(a: &Storage<T>, b: &Storage<T>) -> Result<Storage<T>> {
    let p = b.cols();
    let b_rows = dense_rows(b);
    let data = parallel::try_map_range(a.rows(), |i| {
        let a_row = a.row_view(i);
        let mut c = vec![T::ZERO; p];
        for (k, &a_ik) in a_row.iter().enumerate() {
            if !a_ik.is_zero() {
                T::axpy(&b_rows[k], a_ik, &mut c)?;
            }
        }
        Ok(c)
    })?;
    Ok(Storage::from_parts(Kind::Full, a.rows(), p, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::Unit;
    use proptest::prelude::*;

    fn numbered(kind: Kind, n: usize) -> Storage<f64> {
        let cols = if kind == Kind::Column { 1 } else { n };
        Storage::from_fn(kind, n, cols, |i, j| (i * 3 + j * 5 % 7) as f64 - 4.0).unwrap()
    }

    fn naive(a: &Storage<f64>, b: &Storage<f64>) -> Vec<Vec<f64>> {
        (0..a.rows())
            .map(|i| {
                (0..b.cols())
                    .map(|j| (0..a.cols()).map(|k| a.get(i, k) * b.get(k, j)).sum())
                    .collect()
            })
            .collect()
    }

    fn assert_same(s: &Storage<f64>, expected: &[Vec<f64>]) {
        for (i, row) in expected.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                assert!((s.get(i, j) - v).abs() < 1e-9, "({i}, {j}): {} != {v}", s.get(i, j));
            }
        }
    }

    const KINDS: [Kind; 5] = [
        Kind::Full,
        Kind::Diagonal,
        Kind::Symmetric,
        Kind::UpperTriangular,
        Kind::LowerTriangular,
    ];

    // ========================================================================
    // Element-wise
    // ========================================================================

    #[test]
    fn test_zip_same_consistent_kind_stays_packed() {
        let a = numbered(Kind::Symmetric, 4);
        let c = zip(&a, &a, false, |x, y| Ok(x / (y + 100.0))).unwrap();
        assert_eq!(c.kind(), Kind::Symmetric);
    }

    #[test]
    fn test_zip_inconsistent_kind_materializes_unless_zero_preserving() {
        let d = numbered(Kind::Diagonal, 3);
        let sum = zip(&d, &d, true, |x, y| Ok(x + y)).unwrap();
        assert_eq!(sum.kind(), Kind::Diagonal);
        let eq = zip(&d, &d, false, |x, y| Ok(if x == y { 1.0 } else { 0.0 })).unwrap();
        assert_eq!(eq.kind(), Kind::Full);
        assert_eq!(eq.get(0, 1), 1.0);
    }

    #[test]
    fn test_zip_mixed_kinds_go_full() {
        let u = numbered(Kind::UpperTriangular, 3);
        let l = numbered(Kind::LowerTriangular, 3);
        let s = zip(&u, &l, true, |x, y| Ok(x + y)).unwrap();
        assert_eq!(s.kind(), Kind::Full);
        assert_eq!(s.get(0, 2), u.get(0, 2));
        assert_eq!(s.get(2, 0), l.get(2, 0));
        assert!(zip(&u, &numbered(Kind::Full, 2), true, |x, y| Ok(x + y)).is_err());
    }

    #[test]
    fn test_map_adding_scalar_to_diagonal_goes_full() {
        let d = numbered(Kind::Diagonal, 3);
        let r = map(&d, false, |x| Ok(x + 1.0)).unwrap();
        assert_eq!(r.kind(), Kind::Full);
        assert_eq!(r.get(0, 1), 1.0);
        let scaled = map(&d, true, |x| Ok(2.0 * x)).unwrap();
        assert_eq!(scaled.kind(), Kind::Diagonal);
    }

    #[test]
    fn test_hadamard_column_stays_column() {
        let c = numbered(Kind::Column, 4);
        let h = hadamard(&c, &c).unwrap();
        assert_eq!(h.kind(), Kind::Column);
        assert_eq!(h.get(3, 0), c.get(3, 0) * c.get(3, 0));
    }

    #[test]
    fn test_kronecker() {
        let a = Storage::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        let b = Storage::from_rows(vec![vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let k = kronecker(&a, &b).unwrap();
        assert_eq!((k.rows(), k.cols()), (2, 4));
        assert_eq!(k.raw_rows(), &[vec![0.0, 1.0, 0.0, 2.0], vec![1.0, 0.0, 2.0, 0.0]]);
    }

    #[test]
    fn test_frobenius_counts_mirrored_entries() {
        let s = numbered(Kind::Symmetric, 3);
        let full = s.to_full();
        let expected: f64 = full.iter_stored().map(|v| v * v).sum();
        assert!((frobenius(&s, &s).unwrap() - expected).abs() < 1e-12);
    }

    // ========================================================================
    // Products
    // ========================================================================

    #[test]
    fn test_diagonal_times_column() {
        let d = Storage::from_fn(Kind::Diagonal, 3, 3, |_, _| 2.0).unwrap();
        let c = Storage::from_fn(Kind::Column, 3, 1, |i, _| (i + 1) as f64).unwrap();
        let p = product(&d, &c).unwrap();
        assert_eq!(p.kind(), Kind::Column);
        assert_eq!(p.raw_rows()[0], vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_every_kind_times_column_matches_naive() {
        let x = numbered(Kind::Column, 5);
        for kind in KINDS {
            let a = numbered(kind, 5);
            let p = product(&a, &x).unwrap();
            assert_eq!(p.kind(), Kind::Column, "{kind}");
            assert_same(&p, &naive(&a, &x));
        }
    }

    #[test]
    fn test_kind_pairs_match_naive() {
        for ka in KINDS {
            for kb in KINDS {
                let a = numbered(ka, 4);
                let b = numbered(kb, 4);
                let p = product(&a, &b).unwrap();
                assert_same(&p, &naive(&a, &b));
            }
        }
    }

    #[test]
    fn test_diagonal_scaling_keeps_triangular_kind() {
        let d = numbered(Kind::Diagonal, 3);
        let u = numbered(Kind::UpperTriangular, 3);
        assert_eq!(product(&d, &u).unwrap().kind(), Kind::UpperTriangular);
        assert_eq!(product(&u, &d).unwrap().kind(), Kind::UpperTriangular);
        assert_eq!(product(&d, &d).unwrap().kind(), Kind::Diagonal);
        let s = numbered(Kind::Symmetric, 3);
        assert_eq!(product(&d, &s).unwrap().kind(), Kind::Full);
    }

    #[test]
    fn test_product_dimension_mismatch() {
        let a = Storage::<f64>::new(Kind::Full, 2, 3).unwrap();
        assert_eq!(product(&a, &a), Err(LinalgError::MatrixDimensions));
    }

    #[test]
    fn test_real_value_product_with_implicit_zeros() {
        let m = Some(Unit::meter());
        let a = Storage::from_fn(Kind::UpperTriangular, 2, 2, |_, _| RealValue::with_units(2.0, m))
            .unwrap();
        let p = product(&a, &a).unwrap();
        assert_eq!(p.get(0, 1).value, 8.0);
        assert_eq!(p.get(0, 1).units, Unit::multiply(m, m).0);
        assert_eq!(p.get(1, 0).value, 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn test_product_dispatch_matches_dense(
            ka in 0usize..5,
            kb in 0usize..5,
            values in prop::collection::vec(-10.0f64..10.0, 72),
        ) {
            let n = 6;
            let a = Storage::from_fn(KINDS[ka], n, n, |i, j| values[i * n + j]).unwrap();
            let b = Storage::from_fn(KINDS[kb], n, n, |i, j| values[j * n + i] * 0.5).unwrap();
            let fast = product(&a, &b).unwrap();
            let dense = product(&a.to_full(), &b.to_full()).unwrap();
            for i in 0..n {
                for j in 0..n {
                    prop_assert!((fast.get(i, j) - dense.get(i, j)).abs() < 1e-9);
                }
            }
        }
    }
}
