//! Factorizations, solves and eigenproblems
//!
//! The LU family (solves, inverse, determinant, adjugate and the norm-based
//! condition numbers) runs on the unit-tagged elements directly, so a matrix
//! may mix dimensions as long as every elimination step is dimensionally
//! consistent. The remaining entry points convert into an [`HpMatrix`] and
//! need all elements to share one dimension.

use tracing::trace;

use super::lu::{self, RealLu};
use super::Matrix;
use crate::config::{ADJOINT_MINORS_LIMIT, NEAR_SINGULAR_PIVOT};
use crate::error::{LinalgError, Result};
use crate::parallel;
use crate::storage::{Kind, Storage};
use crate::value::RealValue;
use crate::vector::{HpVector, Vector};

/// Factor of a square matrix reused across solves
enum Factor {
    Diagonal(Vec<RealValue>),
    General(RealLu),
}

impl Factor {
    fn min_pivot(&self) -> f64 {
        match self {
            Factor::Diagonal(_) => f64::INFINITY,
            Factor::General(lu) => lu.min_pivot,
        }
    }

    fn determinant(&self) -> RealValue {
        match self {
            Factor::Diagonal(d) => diagonal_product(d),
            Factor::General(lu) => lu.determinant(),
        }
    }

    fn solve(&self, b: &[RealValue]) -> Result<Vec<RealValue>> {
        match self {
            Factor::Diagonal(d) => Ok(b.iter().zip(d).map(|(b, d)| b.div(*d)).collect()),
            Factor::General(lu) => lu.solve(b),
        }
    }

    fn solve_columns(&self, cols: &[Vec<RealValue>]) -> Result<Vec<Vec<RealValue>>> {
        parallel::try_map_range(cols.len(), |j| self.solve(&cols[j]))
    }

    /// Dense rows of A⁻¹
    fn inverse(&self) -> Result<Vec<Vec<RealValue>>> {
        match self {
            Factor::Diagonal(d) => Ok((0..d.len())
                .map(|i| {
                    let mut row = vec![RealValue::ZERO; d.len()];
                    row[i] = RealValue::ONE.div(d[i]);
                    row
                })
                .collect()),
            Factor::General(lu) => lu.inverse(),
        }
    }
}

fn diagonal_product(d: &[RealValue]) -> RealValue {
    d.iter().fold(RealValue::ONE, |p, &x| p.mul(x))
}

impl Matrix {
    fn require_square(&self) -> Result<()> {
        if self.is_square() {
            Ok(())
        } else {
            Err(LinalgError::MatrixNotSquare)
        }
    }

    fn check_rhs_len(&self, len: usize) -> Result<()> {
        if len == self.rows() {
            Ok(())
        } else {
            Err(LinalgError::MatrixDimensions)
        }
    }

    /// Dense rows of the logical matrix
    fn dense_values(&self) -> Vec<Vec<RealValue>> {
        (0..self.rows()).map(|i| self.storage.row(i)).collect()
    }

    /// Factorizes a square matrix; `None` when it is singular
    fn factor(&self) -> Result<Option<Factor>> {
        self.require_square()?;
        trace!(kind = self.kind().name(), n = self.rows(), "factorize");
        if self.kind() == Kind::Diagonal {
            let d = self.storage.diagonal();
            return Ok(d.iter().all(|x| x.value != 0.0).then_some(Factor::Diagonal(d)));
        }
        Ok(lu::factorize(&self.dense_values())?.map(Factor::General))
    }

    /// [`Matrix::factor`] with the solve-time failure policy
    fn solvable(&self) -> Result<Factor> {
        let f = self.factor()?.ok_or(LinalgError::MatrixSingular)?;
        if f.min_pivot() < NEAR_SINGULAR_PIVOT {
            return Err(LinalgError::MatrixCloseToSingular);
        }
        Ok(f)
    }

    /// Storage kind of A⁻¹ and adj(A)
    fn inverse_kind(&self) -> Kind {
        match self.kind() {
            Kind::Full | Kind::Column => Kind::Full,
            kind => kind,
        }
    }

    // ------------------------------------------------------------------------
    // Factorizations
    // ------------------------------------------------------------------------

    /// Combined `L\U` factor and its 0-based row permutation
    ///
    /// Diagonal and upper triangular matrices are their own factors. A
    /// Symmetric matrix returns its LDLᵀ factor like
    /// [`HpMatrix::lu_decomposition`](crate::HpMatrix::lu_decomposition).
    ///
    /// # Errors
    ///
    /// `MatrixNotSquare`, or `MatrixSingular` when the factorization fails.
    pub fn lu_decomposition(&self) -> Result<(Matrix, Vec<usize>)> {
        self.require_square()?;
        let n = self.rows();
        match self.kind() {
            Kind::Symmetric => {
                let lu = self.to_hp()?.lu_decomposition()?;
                Ok((lu.factors.to_matrix(), lu.indexes))
            }
            Kind::Diagonal | Kind::UpperTriangular => {
                if self.storage.diagonal().iter().any(|x| x.value == 0.0) {
                    return Err(LinalgError::MatrixSingular);
                }
                Ok((self.clone(), (0..n).collect()))
            }
            _ => {
                let lu = lu::factorize(&self.dense_values())?.ok_or(LinalgError::MatrixSingular)?;
                Ok((Matrix::from_values(lu.factors)?, lu.indexes))
            }
        }
    }

    /// `[Q | R]`
    pub fn qr_decomposition(&self) -> Result<Matrix> {
        self.to_hp()?.qr_decomposition()
    }

    /// `[U | σ | Vᵀ]` with σ descending
    pub fn svd_decomposition(&self) -> Result<Matrix> {
        self.to_hp()?.svd_decomposition()
    }

    /// Upper triangular `U` with `A = Uᵀ·U`, in units^½
    ///
    /// # Errors
    ///
    /// `MatrixMustBeSymmetric` unless the matrix is Symmetric or Diagonal,
    /// `MatrixNotPositiveDefinite` when a pivot is not positive.
    pub fn cholesky(&self) -> Result<Matrix> {
        Ok(self.to_hp()?.cholesky()?.to_matrix())
    }

    /// `D` on the diagonal and unit `Lᵀ` above it
    pub fn ldlt(&self) -> Result<Matrix> {
        Ok(self.to_hp()?.ldlt()?.to_matrix())
    }

    // ------------------------------------------------------------------------
    // Solves
    // ------------------------------------------------------------------------

    /// Solves `A·x = b`; `x` comes out in the units that balance the system
    ///
    /// # Errors
    ///
    /// - `MatrixNotSquare` or `MatrixDimensions` on a shape mismatch
    /// - `MatrixSingular` when the factorization fails
    /// - `MatrixCloseToSingular` when the smallest pivot is below 1e-15
    /// - `InconsistentUnits` when an elimination step mixes dimensions
    ///
    /// # Example
    ///
    /// ```
    /// use trueno_linalg::{Matrix, Vector};
    ///
    /// let a = Matrix::from_rows(&[vec![2.0, 1.0], vec![1.0, 3.0]]).unwrap();
    /// let x = a.lsolve(&Vector::from_slice(&[3.0, 5.0])).unwrap();
    /// assert!((x[0].value - 0.8).abs() < 1e-12);
    /// assert!((x[1].value - 1.4).abs() < 1e-12);
    /// ```
    pub fn lsolve(&self, b: &Vector) -> Result<Vector> {
        self.require_square()?;
        self.check_rhs_len(b.len())?;
        Ok(Vector::from(self.solvable()?.solve(b.as_slice())?))
    }

    /// Solves `A·X = B` column by column
    pub fn msolve(&self, b: &Matrix) -> Result<Matrix> {
        self.require_square()?;
        self.check_rhs_len(b.rows())?;
        let cols: Vec<Vec<RealValue>> = (0..b.cols()).map(|j| b.storage.col(j)).collect();
        let x = self.solvable()?.solve_columns(&cols)?;
        Ok(Matrix::from_storage(Storage::from_cols(&x)?))
    }

    /// `A⁻¹` in units⁻¹; structured kinds keep their kind
    pub fn invert(&self) -> Result<Matrix> {
        let n = self.rows();
        let inverse = self.solvable()?.inverse()?;
        Matrix::from_fn(self.inverse_kind(), n, n, |i, j| inverse[i][j])
    }

    /// Cholesky solve of a symmetric positive-definite system
    pub fn cl_solve(&self, b: &Vector) -> Result<Vector> {
        let b = HpVector::try_from(b)?;
        Ok(self.to_hp()?.cl_solve(&b)?.to_vector())
    }

    /// Cholesky solve for every column of `b`
    pub fn cm_solve(&self, b: &Matrix) -> Result<Matrix> {
        Ok(self.to_hp()?.cm_solve(&b.to_hp()?)?.to_matrix())
    }

    /// Preconditioned conjugate-gradient solve to relative tolerance `tol`
    pub fn sl_solve(&self, b: &Vector, tol: f64) -> Result<Vector> {
        let b = HpVector::try_from(b)?;
        Ok(self.to_hp()?.sl_solve(&b, tol)?.to_vector())
    }

    /// Conjugate-gradient solve for every column of `b`
    pub fn sm_solve(&self, b: &Matrix, tol: f64) -> Result<Matrix> {
        Ok(self.to_hp()?.sm_solve(&b.to_hp()?, tol)?.to_matrix())
    }

    // ------------------------------------------------------------------------
    // Determinant, conditioning, adjugate
    // ------------------------------------------------------------------------

    /// det(A) in the product of the diagonal units; exactly zero when singular
    pub fn determinant(&self) -> Result<RealValue> {
        self.require_square()?;
        let diagonal = diagonal_product(&self.storage.diagonal());
        if matches!(
            self.kind(),
            Kind::Diagonal | Kind::UpperTriangular | Kind::LowerTriangular
        ) {
            return Ok(diagonal);
        }
        Ok(match self.factor()? {
            Some(f) => f.determinant(),
            None => RealValue::with_units(0.0, diagonal.units),
        })
    }

    fn condition(&self, norm: fn(&[Vec<RealValue>]) -> f64) -> Result<RealValue> {
        let Some(f) = self.factor()? else {
            return Ok(RealValue::POSITIVE_INFINITY);
        };
        let inverse = f.inverse()?;
        Ok(RealValue::new(norm(&self.dense_values()) * norm(&inverse)))
    }

    /// Condition number in the 1-norm; +∞ when singular
    pub fn cond1(&self) -> Result<RealValue> {
        self.condition(lu::norm_1)
    }

    /// σmax / σmin; needs a single dimension
    pub fn cond2(&self) -> Result<RealValue> {
        self.to_hp()?.cond2()
    }

    /// Condition number in the Frobenius norm; +∞ when singular
    pub fn cond_frob(&self) -> Result<RealValue> {
        self.condition(lu::norm_frob)
    }

    /// Condition number in the ∞-norm; +∞ when singular
    pub fn cond_inf(&self) -> Result<RealValue> {
        self.condition(lu::norm_inf)
    }

    /// Number of singular values above one ulp of the largest
    pub fn rank(&self) -> Result<usize> {
        self.to_hp()?.rank()
    }

    /// Adjugate `adj(A) = det(A)·A⁻¹`
    ///
    /// General matrices that are singular or nearly so and have fewer than
    /// 11 rows use cofactor expansion instead.
    pub fn adjoint(&self) -> Result<Matrix> {
        let n = self.rows();
        let factor = self.factor()?;
        let general = matches!(self.kind(), Kind::Full | Kind::Column);
        let near_singular = factor.as_ref().map_or(true, |f| f.min_pivot() < NEAR_SINGULAR_PIVOT);
        if general && near_singular && n < ADJOINT_MINORS_LIMIT {
            return Matrix::from_values(lu::adjugate_by_minors(&self.dense_values())?);
        }
        let f = factor.ok_or(LinalgError::MatrixSingular)?;
        let det = f.determinant();
        let inverse = f.inverse()?;
        Matrix::from_fn(self.inverse_kind(), n, n, |i, j| det.mul(inverse[i][j]))
    }

    /// Cofactor matrix, the transposed adjugate
    pub fn cofactor(&self) -> Result<Matrix> {
        Ok(self.adjoint()?.transpose())
    }

    // ------------------------------------------------------------------------
    // Eigenproblems
    // ------------------------------------------------------------------------

    /// Eigenvalues of a Symmetric or Diagonal matrix
    ///
    /// A negative `count` selects the `|count|` largest in descending order;
    /// zero or an oversize count returns all of them ascending.
    pub fn eigen_values(&self, count: i64, tol: f64) -> Result<Vector> {
        Ok(self.to_hp()?.eigen_values(count, tol)?.to_vector())
    }

    /// Unit eigenvectors as rows, paired with [`Matrix::eigen_values`]
    pub fn eigen_vectors(&self, count: i64, tol: f64) -> Result<Matrix> {
        Ok(self.to_hp()?.eigen_vectors(count, tol)?.to_matrix())
    }

    /// Eigenvalue in column 0 of each row, its eigenvector after it
    pub fn eigen(&self, count: i64, tol: f64) -> Result<Matrix> {
        self.to_hp()?.eigen(count, tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinalgError;
    use crate::storage::Kind;
    use crate::unit::Unit;
    use approx::assert_abs_diff_eq;

    fn m(x: f64) -> RealValue {
        RealValue::with_units(x, Some(Unit::meter()))
    }

    fn cm(x: f64) -> RealValue {
        RealValue::with_units(x, Some(Unit::meter().scaled(0.01)))
    }

    /// Beam stiffness block [[12 N/m, 6 N], [6 N, 4 N·m]]
    fn beam() -> Matrix {
        let n = Some(Unit::newton());
        let n_per_m = Unit::divide(n, Some(Unit::meter())).0;
        let n_m = Unit::multiply(n, Some(Unit::meter())).0;
        Matrix::from_values(vec![
            vec![RealValue::with_units(12.0, n_per_m), RealValue::with_units(6.0, n)],
            vec![RealValue::with_units(6.0, n), RealValue::with_units(4.0, n_m)],
        ])
        .unwrap()
    }

    fn spd() -> Matrix {
        Matrix::from_fn(Kind::Symmetric, 2, 2, |i, j| match (i, j) {
            (0, 0) => RealValue::new(4.0),
            (1, 1) => RealValue::new(3.0),
            _ => RealValue::new(2.0),
        })
        .unwrap()
    }

    // ========================================================================
    // Determinant and inverse
    // ========================================================================

    #[test]
    fn test_determinant_of_mixed_units() {
        let a = Matrix::from_values(vec![vec![m(2.0), cm(0.0)], vec![cm(100.0), m(3.0)]]).unwrap();
        let det = a.determinant().unwrap();
        assert_abs_diff_eq!(det.value, 6.0, epsilon = 1e-12);
        assert_eq!(det.units, Some(Unit::meter().pow(2.0)));
    }

    #[test]
    fn test_determinant_of_mixed_dimensions() {
        let meter_second = Unit::multiply(Some(Unit::meter()), Some(Unit::second())).0;
        let s = RealValue::with_units(3.0, Some(Unit::second()));

        let mut d = Matrix::diagonal(2).unwrap();
        d.set(0, 0, m(2.0)).unwrap();
        d.set(1, 1, s).unwrap();
        let det = d.determinant().unwrap();
        assert_abs_diff_eq!(det.value, 6.0, epsilon = 1e-12);
        assert_eq!(det.units, meter_second);

        let full = Matrix::from_values(vec![vec![m(2.0), RealValue::ZERO], vec![RealValue::ZERO, s]]).unwrap();
        let det = full.determinant().unwrap();
        assert_abs_diff_eq!(det.value, 6.0, epsilon = 1e-12);
        assert_eq!(det.units, meter_second);
        assert!(full.to_hp().is_err());
    }

    #[test]
    fn test_beam_block_determinant() {
        let det = beam().determinant().unwrap();
        assert_abs_diff_eq!(det.value, 12.0, epsilon = 1e-12);
        assert_eq!(det.units, Some(Unit::newton().pow(2.0)));
    }

    #[test]
    fn test_beam_block_inverse_and_adjoint() {
        let a = beam();
        let inv = a.invert().unwrap();
        assert_eq!(inv.kind(), Kind::Full);
        assert_abs_diff_eq!(inv.get(0, 0).value, 1.0 / 3.0, epsilon = 1e-12);
        assert_eq!(inv.get(0, 0).units, Unit::divide(Some(Unit::meter()), Some(Unit::newton())).0);
        assert_abs_diff_eq!(inv.get(1, 0).value, -0.5, epsilon = 1e-12);

        let adj = a.adjoint().unwrap();
        let n_m = Unit::multiply(Some(Unit::newton()), Some(Unit::meter())).0;
        assert_abs_diff_eq!(adj.get(0, 0).value_in(n_m).unwrap(), 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(adj.get(0, 1).value_in(Some(Unit::newton())).unwrap(), -6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(adj.get(1, 0).value, -6.0, epsilon = 1e-12);
        let cof = a.cofactor().unwrap();
        assert_eq!(cof.get(0, 1).units, adj.get(1, 0).units);

        // ‖A‖₁·‖A⁻¹‖₁ in SI magnitudes
        let cond = a.cond1().unwrap();
        assert!(cond.units.is_none());
        assert_abs_diff_eq!(cond.value, 18.0 * 1.5, epsilon = 1e-9);
        assert!(a.cond_inf().unwrap().value.is_finite());
        assert!(a.cond_frob().unwrap().value >= 1.0);
    }

    #[test]
    fn test_inverse_round_trip() {
        let a = Matrix::from_rows(&[vec![4.0, 1.0], vec![1.0, 3.0]]).unwrap();
        let id = a.product(&a.invert().unwrap()).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                let e = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(id.get(i, j).value, e, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_singular_inverse_fails() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        assert!(a.invert().is_err());
        assert_eq!(a.determinant().unwrap().value, 0.0);
        assert!(a.cond1().unwrap().value.is_infinite());
    }

    // ========================================================================
    // Solves
    // ========================================================================

    #[test]
    fn test_lsolve_units() {
        let a = Matrix::from_values(vec![vec![m(2.0), m(0.0)], vec![m(0.0), m(4.0)]]).unwrap();
        let b = Vector::with_units(&[2.0, 8.0], Some(Unit::newton()));
        let x = a.lsolve(&b).unwrap();
        assert_abs_diff_eq!(x[0].value, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1].value, 2.0, epsilon = 1e-12);
        let (units, _) = Unit::divide(Some(Unit::newton()), Some(Unit::meter()));
        assert_eq!(x[0].units, units);
    }

    #[test]
    fn test_beam_block_solve() {
        let a = beam();
        let n_m = Unit::multiply(Some(Unit::newton()), Some(Unit::meter())).0;
        let b = Vector::from(vec![
            RealValue::with_units(1.0, Some(Unit::newton())),
            RealValue::with_units(0.0, n_m),
        ]);
        let x = a.lsolve(&b).unwrap();
        assert_abs_diff_eq!(x[0].value, 1.0 / 3.0, epsilon = 1e-12);
        assert_eq!(x[0].units, Some(Unit::meter()));
        assert_abs_diff_eq!(x[1].value, -0.5, epsilon = 1e-12);
        assert_eq!(x[1].units, None);

        // A·x reproduces b in its own units
        let ax = a.product(&Matrix::from_vector(&x).unwrap()).unwrap();
        assert_abs_diff_eq!(ax.get(0, 0).value_in(Some(Unit::newton())).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ax.get(1, 0).value_in(n_m).unwrap(), 0.0, epsilon = 1e-12);

        let xm = a.msolve(&Matrix::from_vector(&b).unwrap()).unwrap();
        assert_abs_diff_eq!(xm.get(0, 0).value, x[0].value, epsilon = 1e-15);
        assert_eq!(xm.get(1, 0).units, None);
    }

    #[test]
    fn test_near_singular_and_shape_errors() {
        let near = Matrix::from_values(vec![vec![m(1.0), m(1.0)], vec![m(1.0), m(1.0 + 4e-16)]]).unwrap();
        let b = Vector::with_units(&[1.0, 1.0], Some(Unit::newton()));
        assert_eq!(near.lsolve(&b).unwrap_err(), LinalgError::MatrixCloseToSingular);
        assert_eq!(near.invert().unwrap_err(), LinalgError::MatrixCloseToSingular);

        let a = spd();
        assert_eq!(a.lsolve(&Vector::from_slice(&[1.0])).unwrap_err(), LinalgError::MatrixDimensions);
        let wide = Matrix::new(2, 3).unwrap();
        assert_eq!(wide.determinant().unwrap_err(), LinalgError::MatrixNotSquare);
    }

    #[test]
    fn test_structured_inverse_keeps_kind() {
        let mut d = Matrix::diagonal(2).unwrap();
        d.set(0, 0, m(2.0)).unwrap();
        d.set(1, 1, m(4.0)).unwrap();
        let inv = d.invert().unwrap();
        assert_eq!(inv.kind(), Kind::Diagonal);
        assert_abs_diff_eq!(inv.get(1, 1).value, 0.25, epsilon = 1e-15);
        assert_eq!(inv.get(1, 1).units, Some(Unit::meter().pow(-1.0)));

        let u = Matrix::from_fn(Kind::UpperTriangular, 2, 2, |i, j| RealValue::new((i + j + 1) as f64)).unwrap();
        assert_eq!(u.invert().unwrap().kind(), Kind::UpperTriangular);
        assert_eq!(u.determinant().unwrap().value, 3.0);
        assert_eq!(spd().invert().unwrap().kind(), Kind::Symmetric);
    }

    #[test]
    fn test_symmetric_solvers_agree() {
        let a = spd();
        let b = Vector::from_slice(&[1.0, 2.0]);
        let direct = a.lsolve(&b).unwrap();
        let chol = a.cl_solve(&b).unwrap();
        let pcg = a.sl_solve(&b, 1e-12).unwrap();
        for i in 0..2 {
            assert_abs_diff_eq!(direct[i].value, chol[i].value, epsilon = 1e-12);
            assert_abs_diff_eq!(direct[i].value, pcg[i].value, epsilon = 1e-9);
        }
        let bm = Matrix::from_vector(&b).unwrap();
        let xm = a.sm_solve(&bm, 1e-12).unwrap();
        assert_abs_diff_eq!(xm.get(1, 0).value, direct[1].value, epsilon = 1e-9);
        let xc = a.cm_solve(&bm).unwrap();
        assert_abs_diff_eq!(xc.get(0, 0).value, direct[0].value, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_needs_symmetric() {
        let full = Matrix::from_rows(&[vec![4.0, 2.0], vec![2.0, 3.0]]).unwrap();
        assert_eq!(full.cholesky().unwrap_err(), LinalgError::MatrixMustBeSymmetric);
        let u = spd().cholesky().unwrap();
        assert_eq!(u.kind(), Kind::UpperTriangular);
        assert_eq!(u.get(0, 1).value, 1.0);
        assert_abs_diff_eq!(u.get(1, 1).value, 2f64.sqrt(), epsilon = 1e-15);
    }

    // ========================================================================
    // Factorizations and eigen
    // ========================================================================

    #[test]
    fn test_lu_permutation() {
        let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let (lu, indexes) = a.lu_decomposition().unwrap();
        assert_eq!(lu.kind(), Kind::Full);
        let mut sorted = indexes.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1]);
    }

    #[test]
    fn test_rank_and_adjoint() {
        let thin = Matrix::from_rows(&[vec![1.0, 0.0], vec![2.0, 0.0]]).unwrap();
        assert_eq!(thin.rank().unwrap(), 1);
        let a = Matrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        let adj = a.adjoint().unwrap();
        assert_abs_diff_eq!(adj.get(0, 0).value, 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(adj.get(0, 1).value, -2.0, epsilon = 1e-12);
        let cof = a.cofactor().unwrap();
        assert_abs_diff_eq!(cof.get(1, 0).value, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_eigen_values_of_symmetric() {
        let a = spd();
        let values = a.eigen_values(0, 1e-12).unwrap();
        // (7 ± √17) / 2
        let s = 17f64.sqrt();
        assert_abs_diff_eq!(values[0].value, (7.0 - s) / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(values[1].value, (7.0 + s) / 2.0, epsilon = 1e-12);
        let top = a.eigen(-1, 1e-12).unwrap();
        assert_eq!((top.rows(), top.cols()), (1, 3));
        assert_abs_diff_eq!(top.get(0, 0).value, (7.0 + s) / 2.0, epsilon = 1e-12);
        let vectors = a.eigen_vectors(0, 1e-12).unwrap();
        assert_eq!(vectors.rows(), 2);
    }
}
