//! Matrix product with a recursive path for large dense squares

use tracing::debug;

use super::HpMatrix;
use crate::config::WinogradConfig;
use crate::error::{LinalgError, Result};
use crate::linalg::winograd;
use crate::storage::{dispatch, Kind, Storage};
use crate::unit::Unit;
use crate::vector::HpVector;

impl HpMatrix {
    /// Matrix product `self · other` with multiplied units
    ///
    /// Square `Full × Full` products of order at least
    /// [`WinogradConfig::min_dimension`] go through the recursive 7-multiply;
    /// every other pair uses the kind-pair dispatch, so e.g. a `Diagonal`
    /// times a `Column` stays a `Column` and costs O(n).
    ///
    /// # Example
    ///
    /// ```
    /// use trueno_linalg::{HpMatrix, Kind};
    ///
    /// let mut d = HpMatrix::diagonal(3).unwrap();
    /// d.fill(2.0);
    /// let mut c = HpMatrix::column(3).unwrap();
    /// for i in 0..3 {
    ///     c.set(i, 0, (i + 1) as f64).unwrap();
    /// }
    /// let p = d.product(&c).unwrap();
    /// assert_eq!(p.kind(), Kind::Column);
    /// assert_eq!(p.col(1).unwrap().raw(), &[2.0, 4.0, 6.0]);
    /// ```
    pub fn product(&self, other: &HpMatrix) -> Result<HpMatrix> {
        self.product_with(other, &WinogradConfig::default())
    }

    /// [`HpMatrix::product`] with explicit recursive-multiply settings
    pub fn product_with(&self, other: &HpMatrix, config: &WinogradConfig) -> Result<HpMatrix> {
        if self.cols() != other.rows() {
            return Err(LinalgError::MatrixDimensions);
        }
        let (units, d) = Unit::multiply(self.units, other.units);
        let n = self.rows();
        let recursive = self.kind() == Kind::Full
            && other.kind() == Kind::Full
            && self.is_square()
            && other.is_square()
            && n >= config.min_dimension;
        if recursive {
            debug!(n, "winograd product");
            let rows = winograd::multiply(
                self.storage.raw_rows(),
                other.storage.raw_rows(),
                other.cols(),
                d,
                config,
            );
            return Ok(HpMatrix::from_storage(
                Storage::from_parts(Kind::Full, n, n, rows),
                units,
            ));
        }
        let mut r = HpMatrix::from_storage(dispatch::product(&self.storage, &other.storage)?, units);
        if d != 1.0 {
            r.scale(d);
        }
        Ok(r)
    }

    /// `self · v` for a vector `v`, as a vector
    pub fn product_vector(&self, v: &HpVector) -> Result<HpVector> {
        let c = self.product(&HpMatrix::from_vector(v)?)?;
        let units = c.units();
        Ok(HpVector::new(
            c.into_storage().into_raw().swap_remove(0),
            units,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random(n: usize, seed: u64) -> HpMatrix {
        let mut rng = StdRng::seed_from_u64(seed);
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|_| (0..n).map(|_| rng.gen::<f64>() - 0.5).collect())
            .collect();
        HpMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_recursive_path_matches_dispatch() {
        let a = random(40, 1);
        let b = random(40, 2);
        let config = WinogradConfig {
            kernel_size: 8,
            parallel_threshold: 16,
            min_dimension: 32,
        };
        let fast = a.product_with(&b, &config).unwrap();
        let plain = a.product(&b).unwrap();
        for i in 0..40 {
            for j in 0..40 {
                assert_abs_diff_eq!(fast.get(i, j), plain.get(i, j), epsilon = 1e-11);
            }
        }
    }

    #[test]
    fn test_units_fold_into_scale() {
        let a = HpMatrix::identity(2)
            .unwrap()
            .with_units(Some(Unit::meter()));
        let b = HpMatrix::identity(2)
            .unwrap()
            .with_units(Some(Unit::meter().scaled(0.01)));
        let p = a.product(&b).unwrap();
        assert_eq!(p.kind(), Kind::Diagonal);
        assert_eq!(p.units(), Some(Unit::meter().pow(2.0)));
        assert_abs_diff_eq!(p.get(1, 1), 0.01, epsilon = 1e-15);
    }

    #[test]
    fn test_product_vector() {
        let s = HpMatrix::from_fn(Kind::Symmetric, 2, 2, |i, j| if i == j { 4.0 - i as f64 } else { 1.0 })
            .unwrap();
        let y = s
            .product_vector(&HpVector::new(vec![1.0, 2.0], None))
            .unwrap();
        assert_eq!(y.raw(), &[6.0, 7.0]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = HpMatrix::new(2, 3).unwrap();
        assert_eq!(a.product(&a).unwrap_err(), LinalgError::MatrixDimensions);
    }
}
