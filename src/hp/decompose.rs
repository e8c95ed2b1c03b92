//! Factorizations, solves and the quantities derived from them
//!
//! Every square kind picks the cheapest factorization its structure allows:
//! a Diagonal divides, a triangular matrix substitutes directly, a Symmetric
//! matrix goes through the skyline LDLᵀ and everything else through Crout
//! LU. A failed factorization makes [`HpMatrix::determinant`] exactly zero
//! and the condition numbers infinite, while solves and inverses fail with
//! `MatrixSingular`.

use tracing::trace;

use super::HpMatrix;
use crate::config::{EigenConfig, PcgConfig, ADJOINT_MINORS_LIMIT, NEAR_SINGULAR_PIVOT};
use crate::error::{LinalgError, Result};
use crate::linalg::lu::{self, Lu};
use crate::linalg::pcg::PcgSolver;
use crate::linalg::skyline::{self, Skyline};
use crate::linalg::{self, eigen, fft, qr, svd};
use crate::matrix::Matrix;
use crate::parallel;
use crate::storage::{Kind, Storage};
use crate::unit::Unit;
use crate::value::RealValue;
use crate::vector::HpVector;
use crate::vectorized;

/// Combined L\U factors with their row permutation
#[derive(Debug, Clone, PartialEq)]
pub struct LuDecomposition {
    /// L strictly below the diagonal (unit diagonal implied), U on and above
    pub factors: HpMatrix,
    /// Row `i` of `factors` corresponds to row `indexes[i]` of the input
    pub indexes: Vec<usize>,
}

/// Kind-specific factorization of a square matrix
enum Factor<'a> {
    Diagonal(&'a [f64]),
    Upper(&'a [Vec<f64>]),
    Lower(&'a [Vec<f64>]),
    Symmetric(Skyline),
    General(Lu),
}

fn nonzero(mut pivots: impl Iterator<Item = f64>) -> bool {
    pivots.all(|x| x != 0.0)
}

fn upper_solve(rows: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = rows.len();
    let mut x = b[..n].to_vec();
    for i in (0..n).rev() {
        let row = &rows[i];
        let s = x[i] - vectorized::dot(&row[1..], &x[i + 1..]);
        x[i] = s / row[0];
    }
    x
}

fn lower_solve(rows: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = rows.len();
    let mut x = b[..n].to_vec();
    for i in 0..n {
        let row = &rows[i];
        let s = x[i] - vectorized::dot(&row[..i], &x[..i]);
        x[i] = s / row[i];
    }
    x
}

impl Factor<'_> {
    fn determinant(&self) -> f64 {
        match self {
            Factor::Diagonal(d) => d.iter().product(),
            Factor::Upper(rows) => rows.iter().map(|r| r[0]).product(),
            Factor::Lower(rows) => rows.iter().enumerate().map(|(i, r)| r[i]).product(),
            Factor::Symmetric(l) => l.determinant(),
            Factor::General(lu) => lu.determinant(),
        }
    }

    fn solve(&self, b: &[f64]) -> Vec<f64> {
        match self {
            Factor::Diagonal(d) => d.iter().zip(b).map(|(d, b)| b / d).collect(),
            Factor::Upper(rows) => upper_solve(rows, b),
            Factor::Lower(rows) => lower_solve(rows, b),
            Factor::Symmetric(l) => l.solve(b),
            Factor::General(lu) => lu.solve(b),
        }
    }

    fn solve_columns(&self, cols: &[Vec<f64>]) -> Vec<Vec<f64>> {
        match self {
            Factor::Symmetric(l) => l.solve_columns(cols),
            Factor::General(lu) => lu.solve_columns(cols),
            _ => parallel::map_range(cols.len(), |j| self.solve(&cols[j])),
        }
    }

    /// A⁻¹ in the storage kind it naturally has
    fn inverse(&self, n: usize) -> Result<Storage<f64>> {
        match self {
            Factor::Diagonal(d) => Ok(Storage::from_parts(
                Kind::Diagonal,
                n,
                n,
                vec![d.iter().map(|d| 1.0 / d).collect()],
            )),
            Factor::Upper(_) | Factor::Lower(_) => {
                let kind = if matches!(self, Factor::Upper(_)) {
                    Kind::UpperTriangular
                } else {
                    Kind::LowerTriangular
                };
                let cols = self.solve_columns(&linalg::identity(n));
                Storage::from_fn(kind, n, n, |i, j| cols[j][i])
            }
            Factor::Symmetric(l) => Ok(Storage::from_parts(Kind::Symmetric, n, n, l.inverse_upper())),
            Factor::General(lu) => Ok(Storage::from_parts(Kind::Full, n, n, lu.inverse())),
        }
    }

    fn min_pivot(&self) -> f64 {
        match self {
            Factor::General(lu) => lu.min_pivot,
            _ => f64::INFINITY,
        }
    }
}

impl HpMatrix {
    fn require_square(&self) -> Result<()> {
        if self.is_square() {
            Ok(())
        } else {
            Err(LinalgError::MatrixNotSquare)
        }
    }

    /// Dense rows of the logical matrix
    fn dense(&self) -> Vec<Vec<f64>> {
        match self.kind() {
            Kind::Full => self.storage.raw_rows().to_vec(),
            _ => self.storage.to_full().into_raw(),
        }
    }

    /// Dense rows with at least as many rows as columns
    fn dense_high(&self) -> Vec<Vec<f64>> {
        let rows = self.dense();
        if self.rows() < self.cols() {
            linalg::transpose(&rows)
        } else {
            rows
        }
    }

    /// Packed upper triangle of a Symmetric matrix
    fn packed_upper(&self) -> Result<&[Vec<f64>]> {
        if self.kind() == Kind::Symmetric {
            Ok(self.storage.raw_rows())
        } else {
            Err(LinalgError::MatrixMustBeSymmetric)
        }
    }

    /// Factorizes a square matrix; `None` when it is singular
    fn factor(&self) -> Result<Option<Factor<'_>>> {
        self.require_square()?;
        trace!(kind = self.kind().name(), n = self.rows(), "factorize");
        let rows = self.storage.raw_rows();
        Ok(match self.kind() {
            Kind::Diagonal => {
                let d = &rows[0];
                nonzero(d.iter().copied()).then_some(Factor::Diagonal(d))
            }
            Kind::UpperTriangular => nonzero(rows.iter().map(|r| r[0])).then_some(Factor::Upper(rows)),
            Kind::LowerTriangular => {
                nonzero(rows.iter().enumerate().map(|(i, r)| r[i])).then_some(Factor::Lower(rows))
            }
            Kind::Symmetric => skyline::ldlt(rows).map(Factor::Symmetric),
            Kind::Full | Kind::Column => lu::factorize(&self.dense()).map(Factor::General),
        })
    }

    /// [`HpMatrix::factor`] with the solve-time failure policy
    fn solvable(&self) -> Result<Factor<'_>> {
        let f = self.factor()?.ok_or(LinalgError::MatrixSingular)?;
        if f.min_pivot() < NEAR_SINGULAR_PIVOT {
            return Err(LinalgError::MatrixCloseToSingular);
        }
        Ok(f)
    }

    fn power_units(&self, p: f32) -> Option<Unit> {
        Unit::pow_opt(self.units, p)
    }

    /// Solution of `A·x = b` in units of `b / A`
    fn finish_solution(&self, x: Vec<f64>, b_units: Option<Unit>) -> HpVector {
        let (units, d) = Unit::divide(b_units, self.units);
        let mut v = HpVector::new(x, units);
        if d != 1.0 {
            v.scale(d);
        }
        v
    }

    fn finish_columns(&self, cols: Vec<Vec<f64>>, b_units: Option<Unit>) -> Result<HpMatrix> {
        let (units, d) = Unit::divide(b_units, self.units);
        let mut x = HpMatrix::from_cols(&cols)?.with_units(units);
        if d != 1.0 {
            x.scale(d);
        }
        Ok(x)
    }

    fn check_rhs_len(&self, len: usize) -> Result<()> {
        if len == self.rows() {
            Ok(())
        } else {
            Err(LinalgError::MatrixDimensions)
        }
    }

    fn columns_of(m: &HpMatrix) -> Vec<Vec<f64>> {
        (0..m.cols()).map(|j| m.storage.col(j)).collect()
    }

    // ------------------------------------------------------------------------
    // Factorizations
    // ------------------------------------------------------------------------

    /// LU decomposition with 0-based row permutation
    ///
    /// Diagonal and upper triangular matrices are their own factors and a
    /// Symmetric matrix returns its LDLᵀ factor as `D` on the diagonal with
    /// `Lᵀ` above; all come back with the identity permutation.
    ///
    /// # Errors
    ///
    /// `MatrixNotSquare`, or `MatrixSingular` when the factorization fails.
    pub fn lu_decomposition(&self) -> Result<LuDecomposition> {
        let n = self.rows();
        let identity = || (0..n).collect();
        match self.factor()?.ok_or(LinalgError::MatrixSingular)? {
            Factor::Diagonal(_) | Factor::Upper(_) => Ok(LuDecomposition {
                factors: self.clone(),
                indexes: identity(),
            }),
            Factor::Symmetric(l) => Ok(LuDecomposition {
                factors: self.derived(Storage::from_parts(Kind::UpperTriangular, n, n, l.to_upper())),
                indexes: identity(),
            }),
            Factor::Lower(_) => {
                let lu = lu::factorize(&self.dense()).ok_or(LinalgError::MatrixSingular)?;
                Ok(self.wrap_lu(lu))
            }
            Factor::General(lu) => Ok(self.wrap_lu(lu)),
        }
    }

    fn wrap_lu(&self, lu: Lu) -> LuDecomposition {
        let n = self.rows();
        LuDecomposition {
            factors: self.derived(Storage::from_parts(Kind::Full, n, n, lu.factors)),
            indexes: lu.indexes,
        }
    }

    /// Householder QR as `[Q | R]`
    ///
    /// `Q` is dimensionless and `R` carries the matrix units.
    pub fn qr_decomposition(&self) -> Result<Matrix> {
        let r = qr::decompose(&self.dense());
        let q = HpMatrix::from_rows(&r.q)?;
        let r = HpMatrix::from_rows(&r.r)?.with_units(self.units);
        Matrix::augment(&[&q.to_matrix(), &r.to_matrix()])
    }

    /// Singular value decomposition as `[U | σ | Vᵀ]`, σ descending
    ///
    /// # Errors
    ///
    /// `MatrixNotHigh` when there are fewer rows than columns.
    pub fn svd_decomposition(&self) -> Result<Matrix> {
        let s = svd::decompose(&self.dense())?;
        let u = HpMatrix::from_rows(&s.u)?;
        let sigma = HpMatrix::from_cols(&[s.sigma])?.with_units(self.units);
        let vt = HpMatrix::from_rows(&s.vt)?;
        Matrix::augment(&[&u.to_matrix(), &sigma.to_matrix(), &vt.to_matrix()])
    }

    /// Cholesky factor `U` with `A = Uᵀ·U`, in units^½
    ///
    /// # Example
    ///
    /// ```
    /// use trueno_linalg::{HpMatrix, Kind};
    ///
    /// let a = HpMatrix::from_fn(Kind::Symmetric, 2, 2, |i, j| match (i, j) {
    ///     (0, 0) => 4.0,
    ///     (1, 1) => 3.0,
    ///     _ => 2.0,
    /// })
    /// .unwrap();
    /// let u = a.cholesky().unwrap();
    /// assert_eq!(u.kind(), Kind::UpperTriangular);
    /// assert_eq!(u.get(0, 0), 2.0);
    /// assert_eq!(u.get(0, 1), 1.0);
    /// assert!((u.get(1, 1) - 2f64.sqrt()).abs() < 1e-15);
    /// ```
    ///
    /// # Errors
    ///
    /// `MatrixNotPositiveDefinite` when a pivot is not positive.
    pub fn cholesky(&self) -> Result<HpMatrix> {
        let n = self.rows();
        let units = self.power_units(0.5);
        if self.kind() == Kind::Diagonal {
            let d = self.storage.diagonal();
            if d.iter().any(|&x| x <= 0.0) {
                return Err(LinalgError::MatrixNotPositiveDefinite);
            }
            let rows = d
                .iter()
                .enumerate()
                .map(|(i, &x)| {
                    let mut row = vec![0.0; n - i];
                    row[0] = x.sqrt();
                    row
                })
                .collect();
            return Ok(HpMatrix::from_storage(
                Storage::from_parts(Kind::UpperTriangular, n, n, rows),
                units,
            ));
        }
        let l = skyline::cholesky(self.packed_upper()?)
            .ok_or(LinalgError::MatrixNotPositiveDefinite)?;
        Ok(HpMatrix::from_storage(
            Storage::from_parts(Kind::UpperTriangular, n, n, l.to_upper()),
            units,
        ))
    }

    /// LDLᵀ factor: `D` on the diagonal and unit `Lᵀ` above it
    ///
    /// # Errors
    ///
    /// `MatrixSingular` on a zero pivot.
    pub fn ldlt(&self) -> Result<HpMatrix> {
        let n = self.rows();
        let l = skyline::ldlt(self.packed_upper()?).ok_or(LinalgError::MatrixSingular)?;
        Ok(self.derived(Storage::from_parts(Kind::UpperTriangular, n, n, l.to_upper())))
    }

    // ------------------------------------------------------------------------
    // Solves and inverse
    // ------------------------------------------------------------------------

    /// Solves `A·x = b`
    ///
    /// # Errors
    ///
    /// - `MatrixNotSquare`, or `MatrixDimensions` when `b` does not fit
    /// - `MatrixSingular` / `MatrixCloseToSingular`
    pub fn lsolve(&self, b: &HpVector) -> Result<HpVector> {
        self.require_square()?;
        self.check_rhs_len(b.len())?;
        let x = self.solvable()?.solve(b.raw());
        Ok(self.finish_solution(x, b.units()))
    }

    /// Solves `A·X = B` column by column
    pub fn msolve(&self, b: &HpMatrix) -> Result<HpMatrix> {
        self.require_square()?;
        self.check_rhs_len(b.rows())?;
        let x = self.solvable()?.solve_columns(&Self::columns_of(b));
        self.finish_columns(x, b.units)
    }

    /// A⁻¹ in reciprocal units, keeping the kind where it is closed under
    /// inversion
    pub fn invert(&self) -> Result<HpMatrix> {
        let n = self.rows();
        let inverse = self.solvable()?.inverse(n)?;
        Ok(HpMatrix::from_storage(inverse, self.power_units(-1.0)))
    }

    /// `A·x = b` through the Cholesky factor
    ///
    /// # Errors
    ///
    /// `MatrixNotPositiveDefinite` when the factorization fails.
    pub fn cl_solve(&self, b: &HpVector) -> Result<HpVector> {
        let l = self.cholesky_factor()?;
        self.check_rhs_len(b.len())?;
        Ok(self.finish_solution(l.solve(b.raw()), b.units()))
    }

    /// `A·X = B` through the Cholesky factor
    pub fn cm_solve(&self, b: &HpMatrix) -> Result<HpMatrix> {
        let l = self.cholesky_factor()?;
        self.check_rhs_len(b.rows())?;
        self.finish_columns(l.solve_columns(&Self::columns_of(b)), b.units)
    }

    fn cholesky_factor(&self) -> Result<Skyline> {
        skyline::cholesky(self.packed_upper()?).ok_or(LinalgError::MatrixNotPositiveDefinite)
    }

    /// `A·x = b` by Jacobi-preconditioned conjugate gradient
    ///
    /// # Errors
    ///
    /// - `MatrixSingular` on a zero diagonal
    /// - `IllConditioned` / `PcgNoConvergence` from the iteration
    pub fn sl_solve(&self, b: &HpVector, tol: f64) -> Result<HpVector> {
        let solver = self.pcg(tol)?;
        self.check_rhs_len(b.len())?;
        Ok(self.finish_solution(solver.solve(b.raw())?, b.units()))
    }

    /// `A·X = B` by PCG, columns in parallel
    pub fn sm_solve(&self, b: &HpMatrix, tol: f64) -> Result<HpMatrix> {
        let solver = self.pcg(tol)?;
        self.check_rhs_len(b.rows())?;
        let x = solver.solve_columns(&Self::columns_of(b))?;
        self.finish_columns(x, b.units)
    }

    fn pcg(&self, tol: f64) -> Result<PcgSolver<'_>> {
        let config = PcgConfig {
            tolerance: tol,
            ..PcgConfig::default()
        };
        PcgSolver::new(self.packed_upper()?, config)
    }

    // ------------------------------------------------------------------------
    // Scalars
    // ------------------------------------------------------------------------

    /// det(A) in units^n; exactly zero when the factorization fails
    ///
    /// # Errors
    ///
    /// `MatrixNotSquare`.
    pub fn determinant(&self) -> Result<RealValue> {
        let units = self.power_units(self.rows() as f32);
        let det = self.factor()?.map_or(0.0, |f| f.determinant());
        Ok(RealValue::with_units(det, units))
    }

    fn condition<F>(&self, norm: F) -> Result<RealValue>
    where
        F: Fn(&HpMatrix) -> f64,
    {
        let n = self.rows();
        let Some(f) = self.factor()? else {
            return Ok(RealValue::POSITIVE_INFINITY);
        };
        let inverse = HpMatrix::from_storage(f.inverse(n)?, None);
        Ok(RealValue::new(norm(self) * norm(&inverse)))
    }

    /// Condition number in the 1-norm; +∞ when singular
    pub fn cond1(&self) -> Result<RealValue> {
        self.condition(|m| m.l1_norm().value)
    }

    /// Condition number in the Frobenius norm
    pub fn cond_frob(&self) -> Result<RealValue> {
        self.condition(|m| m.frob_norm().value)
    }

    /// Condition number in the ∞-norm
    pub fn cond_inf(&self) -> Result<RealValue> {
        self.condition(|m| m.inf_norm().value)
    }

    /// σmax / σmin
    pub fn cond2(&self) -> Result<RealValue> {
        let sigma = svd::decompose(&self.dense_high())?.sigma;
        let max = sigma.first().copied().unwrap_or(0.0);
        let min = sigma.last().copied().unwrap_or(0.0);
        Ok(RealValue::new(max / min))
    }

    /// Number of singular values above one ulp of the largest
    pub fn rank(&self) -> Result<usize> {
        let sigma = svd::decompose(&self.dense_high())?.sigma;
        Ok(svd::numerical_rank(&sigma))
    }

    /// Adjugate `adj(A) = det(A)·A⁻¹` in units^(n−1)
    ///
    /// General matrices that are singular or nearly so and have fewer than
    /// 11 rows use cofactor minors instead, which stay exact at det = 0.
    pub fn adjoint(&self) -> Result<HpMatrix> {
        let n = self.rows();
        let units = self.power_units(n as f32 - 1.0);
        let factor = self.factor()?;
        let general = matches!(self.kind(), Kind::Full | Kind::Column);
        let near_singular = factor.as_ref().map_or(true, |f| f.min_pivot() < NEAR_SINGULAR_PIVOT);
        if general && near_singular && n < ADJOINT_MINORS_LIMIT {
            let adj = lu::adjugate_by_minors(&self.dense());
            return Ok(HpMatrix::from_storage(Storage::from_parts(Kind::Full, n, n, adj), units));
        }
        let f = factor.ok_or(LinalgError::MatrixSingular)?;
        let mut adj = HpMatrix::from_storage(f.inverse(n)?, units);
        adj.scale(f.determinant());
        Ok(adj)
    }

    /// Cofactor matrix, the transposed adjugate
    pub fn cofactor(&self) -> Result<HpMatrix> {
        Ok(self.adjoint()?.transpose())
    }

    // ------------------------------------------------------------------------
    // Eigenproblems
    // ------------------------------------------------------------------------

    fn eigen_pairs(&self, count: i64, tol: f64, vectors: bool) -> Result<eigen::EigenPairs> {
        if self.kind() == Kind::Diagonal {
            let d = self.storage.diagonal();
            let (count, reverse) = eigen::resolve_count(count, d.len());
            let order = crate::storage::order_indexes(&d, reverse, f64::total_cmp);
            let order = &order[..count];
            let n = d.len();
            return Ok(eigen::EigenPairs {
                values: order.iter().map(|&k| d[k]).collect(),
                vectors: vectors.then(|| {
                    order
                        .iter()
                        .map(|&k| {
                            let mut e = vec![0.0; n];
                            e[k] = 1.0;
                            e
                        })
                        .collect()
                }),
            });
        }
        let config = EigenConfig {
            tolerance: tol,
            ..EigenConfig::default()
        };
        eigen::solve(self.packed_upper()?, count, vectors, &config)
    }

    /// Eigenvalues in the matrix units
    ///
    /// A negative `count` asks for the `|count|` largest in descending order;
    /// zero or an oversize count returns all of them ascending. `tol` is the
    /// Lanczos convergence tolerance for large matrices.
    pub fn eigen_values(&self, count: i64, tol: f64) -> Result<HpVector> {
        let pairs = self.eigen_pairs(count, tol, false)?;
        Ok(HpVector::new(pairs.values, self.units))
    }

    /// Unit eigenvectors as rows, ordered like [`HpMatrix::eigen_values`]
    pub fn eigen_vectors(&self, count: i64, tol: f64) -> Result<HpMatrix> {
        let pairs = self.eigen_pairs(count, tol, true)?;
        HpMatrix::from_rows(&pairs.vectors.unwrap_or_default())
    }

    /// Eigenvalues in column 0 followed by their eigenvectors as rows
    pub fn eigen(&self, count: i64, tol: f64) -> Result<Matrix> {
        let pairs = self.eigen_pairs(count, tol, true)?;
        let vectors = pairs.vectors.unwrap_or_default();
        let rows: Vec<Vec<RealValue>> = pairs
            .values
            .iter()
            .zip(&vectors)
            .map(|(&value, v)| {
                std::iter::once(RealValue::with_units(value, self.units))
                    .chain(v.iter().map(|&x| RealValue::new(x)))
                    .collect()
            })
            .collect();
        Ok(Matrix::from_storage(Storage::from_rows(rows)?))
    }

    // ------------------------------------------------------------------------
    // Fourier transform
    // ------------------------------------------------------------------------

    /// Discrete Fourier transform of a 1- or 2-row signal
    ///
    /// Row 1 is the real part and the optional row 2 the imaginary part.
    /// The signal is zero-padded to a power of two. The result has both
    /// rows and the inverse is scaled by `1/n`.
    ///
    /// # Errors
    ///
    /// `MatrixOneOrTwoRows` for any other row count.
    pub fn fft(&self, inverse: bool) -> Result<HpMatrix> {
        if self.rows() > 2 {
            return Err(LinalgError::MatrixOneOrTwoRows);
        }
        let n = self.cols().next_power_of_two();
        let mut re = self.storage.row(0);
        re.resize(n, 0.0);
        let mut im = if self.rows() == 2 {
            self.storage.row(1)
        } else {
            Vec::new()
        };
        im.resize(n, 0.0);
        fft::transform(&mut re, &mut im, inverse);
        let mut out = HpMatrix::from_storage(Storage::from_parts(Kind::Full, 2, n, vec![re, im]), self.units);
        if inverse {
            out.scale(1.0 / n as f64);
        }
        Ok(out)
    }
}
