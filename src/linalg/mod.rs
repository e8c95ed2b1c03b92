//! Dense and structured kernels over raw `f64`
//!
//! Everything in here works on plain row vectors and knows nothing about
//! units or matrix kinds; the [`crate::hp`] and [`crate::matrix`] families
//! translate to and from these layouts.
//!
//! Layout conventions:
//! - dense: `rows[i][j]`
//! - packed symmetric: `upper[i][k] = A[i][i + k]`, row `i` may be shorter
//!   than `n - i` (missing entries are zero)

pub mod eigen;
pub mod fft;
pub mod lanczos;
pub mod lu;
pub mod pcg;
pub mod qr;
pub mod skyline;
pub mod svd;
pub mod winograd;

/// `n × n` identity as dense rows
pub fn identity(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| {
            let mut row = vec![0.0; n];
            row[i] = 1.0;
            row
        })
        .collect()
}

/// Transposes dense rows (`m × n` → `n × m`)
pub fn transpose(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = rows.first().map_or(0, Vec::len);
    (0..n).map(|j| rows.iter().map(|r| r[j]).collect()).collect()
}

/// Expands a packed symmetric matrix into dense rows
pub fn expand_symmetric(upper: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = upper.len();
    let mut a = vec![vec![0.0; n]; n];
    for (i, row) in upper.iter().enumerate() {
        for (k, &v) in row.iter().enumerate().take(n - i) {
            a[i][i + k] = v;
            a[i + k][i] = v;
        }
    }
    a
}

/// `y = A·x` for a packed symmetric `A`
pub fn symmetric_mul(upper: &[Vec<f64>], x: &[f64], y: &mut [f64]) {
    y.fill(0.0);
    let n = x.len();
    for (i, row) in upper.iter().enumerate() {
        let Some((&diag, rest)) = row.split_first() else {
            continue;
        };
        let x_i = x[i];
        let len = rest.len().min(n.saturating_sub(i + 1));
        let rest = &rest[..len];
        let sum = diag * x_i + crate::vectorized::dot(rest, &x[i + 1..i + 1 + len]);
        if x_i != 0.0 {
            crate::vectorized::axpy(rest, x_i, &mut y[i + 1..i + 1 + len]);
        }
        y[i] += sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_and_multiply_agree() {
        let upper = vec![vec![2.0, 1.0, 0.5], vec![3.0, -1.0], vec![4.0]];
        let dense = expand_symmetric(&upper);
        assert_eq!(dense[2][0], 0.5);
        assert_eq!(dense[2][1], -1.0);

        let x = [1.0, 2.0, 3.0];
        let mut y = [0.0; 3];
        symmetric_mul(&upper, &x, &mut y);
        for i in 0..3 {
            let expected: f64 = (0..3).map(|j| dense[i][j] * x[j]).sum();
            assert_eq!(y[i], expected);
        }
    }

    #[test]
    fn test_short_skyline_rows() {
        // Row 0 stops after the diagonal
        let upper = vec![vec![1.0], vec![2.0, 5.0], vec![3.0]];
        let mut y = [0.0; 3];
        symmetric_mul(&upper, &[1.0, 1.0, 1.0], &mut y);
        assert_eq!(y, [1.0, 7.0, 8.0]);
    }

    #[test]
    fn test_identity_and_transpose() {
        let i3 = identity(3);
        assert_eq!(transpose(&i3), i3);
        let a = vec![vec![1.0, 2.0, 3.0]];
        assert_eq!(transpose(&a), vec![vec![1.0], vec![2.0], vec![3.0]]);
    }
}
