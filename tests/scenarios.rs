//! Worked examples with known answers

use approx::assert_abs_diff_eq;
use trueno_linalg::linalg::fft;
use trueno_linalg::{BinaryOp, HpMatrix, HpVector, Kind, Matrix, RealValue, Unit, Vector};

// ============================================================================
// Determinant
// ============================================================================

#[test]
fn test_determinant_of_diagonal_and_full_agree() {
    let mut d = HpMatrix::diagonal(2).unwrap();
    d.set(0, 0, 2.0).unwrap();
    d.set(1, 1, 3.0).unwrap();
    let f = HpMatrix::from_rows(&[vec![2.0, 0.0], vec![0.0, 3.0]]).unwrap();
    assert_eq!(d.determinant().unwrap().value, 6.0);
    assert_abs_diff_eq!(f.determinant().unwrap().value, 6.0, epsilon = 1e-12);

    let m = Matrix::from_rows(&[vec![2.0, 0.0], vec![0.0, 3.0]]).unwrap();
    assert_abs_diff_eq!(m.determinant().unwrap().value, 6.0, epsilon = 1e-12);
}

// ============================================================================
// Cholesky
// ============================================================================

#[test]
fn test_cholesky_of_two_by_two() {
    let a = HpMatrix::from_fn(Kind::Symmetric, 2, 2, |i, j| match (i, j) {
        (0, 0) => 4.0,
        (1, 1) => 3.0,
        _ => 2.0,
    })
    .unwrap();
    let u = a.cholesky().unwrap();
    assert_eq!(u.kind(), Kind::UpperTriangular);
    assert_abs_diff_eq!(u.get(0, 0), 2.0, epsilon = 1e-15);
    assert_abs_diff_eq!(u.get(0, 1), 1.0, epsilon = 1e-15);
    assert_eq!(u.get(1, 0), 0.0);
    assert_abs_diff_eq!(u.get(1, 1), 2f64.sqrt(), epsilon = 1e-15);
}

// ============================================================================
// FFT
// ============================================================================

#[test]
fn test_fft_of_impulse() {
    let mut re = vec![1.0, 0.0, 0.0, 0.0];
    let mut im = vec![0.0; 4];
    fft::transform(&mut re, &mut im, false);
    for k in 0..4 {
        assert_abs_diff_eq!(re[k], 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(im[k], 0.0, epsilon = 1e-15);
    }

    // The raw kernel leaves the inverse unnormalized
    fft::transform(&mut re, &mut im, true);
    let expected = [4.0, 0.0, 0.0, 0.0];
    for k in 0..4 {
        assert_abs_diff_eq!(re[k], expected[k], epsilon = 1e-12);
        assert_abs_diff_eq!(im[k], 0.0, epsilon = 1e-12);
    }
}

#[test]
fn test_matrix_level_inverse_fft_is_scaled() {
    let x = HpMatrix::from_rows(&[vec![1.0, 0.0, 0.0, 0.0]]).unwrap();
    let spectrum = x.fft(false).unwrap();
    let back = spectrum.fft(true).unwrap();
    assert_abs_diff_eq!(back.get(0, 0), 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(back.get(0, 1), 0.0, epsilon = 1e-12);
}

// ============================================================================
// PCG
// ============================================================================

#[test]
fn test_pcg_two_by_two() {
    let a = HpMatrix::from_fn(Kind::Symmetric, 2, 2, |i, j| match (i, j) {
        (0, 0) => 4.0,
        (1, 1) => 3.0,
        _ => 1.0,
    })
    .unwrap();
    let b = HpVector::new(vec![1.0, 2.0], None);
    let x = a.sl_solve(&b, 1e-12).unwrap();
    assert_abs_diff_eq!(x[0], 1.0 / 11.0, epsilon = 1e-10);
    assert_abs_diff_eq!(x[1], 7.0 / 11.0, epsilon = 1e-10);
    assert_abs_diff_eq!(x[0], 0.0909, epsilon = 1e-4);
    assert_abs_diff_eq!(x[1], 0.6364, epsilon = 1e-4);
}

// ============================================================================
// Structured products
// ============================================================================

#[test]
fn test_diagonal_times_column_is_column() {
    let mut d = HpMatrix::diagonal(3).unwrap();
    d.fill(2.0);
    let c = HpMatrix::from_vector(&HpVector::new(vec![1.0, 2.0, 3.0], None)).unwrap();
    let p = d.apply(BinaryOp::Mul, &c).unwrap();
    assert_eq!(p.kind(), Kind::Column);
    assert_eq!(p.col(1).unwrap().raw(), &[2.0, 4.0, 6.0]);

    let mut dm = Matrix::diagonal(3).unwrap();
    dm.fill(RealValue::new(2.0));
    let cm = Matrix::from_vector(&Vector::from_slice(&[1.0, 2.0, 3.0])).unwrap();
    let pm = dm.product(&cm).unwrap();
    assert_eq!(pm.kind(), Kind::Column);
    let values: Vec<f64> = pm.col(1).unwrap().as_slice().iter().map(|v| v.value).collect();
    assert_eq!(values, vec![2.0, 4.0, 6.0]);
}

// ============================================================================
// Units through a full calculation
// ============================================================================

#[test]
fn test_stiffness_solve_carries_units() {
    // k·u = f with k in N/m and f in N gives u in m
    let (k_units, _) = Unit::divide(Some(Unit::newton()), Some(Unit::meter()));
    let k = HpMatrix::from_fn(Kind::Symmetric, 2, 2, |i, j| if i == j { 2.0 } else { -1.0 })
        .unwrap()
        .with_units(k_units);
    let f = HpVector::new(vec![1.0, 0.0], Some(Unit::newton()));
    let u = k.cl_solve(&f).unwrap();
    assert_eq!(u.units(), Some(Unit::meter()));
    assert_abs_diff_eq!(u[0], 2.0 / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(u[1], 1.0 / 3.0, epsilon = 1e-12);
}
