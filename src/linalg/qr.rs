//! Householder QR

use tracing::instrument;

use crate::parallel;
use crate::vectorized;

/// `A = Q·R` with orthogonal `Q` (m × m) and upper-trapezoidal `R` (m × n)
#[derive(Debug, Clone, PartialEq)]
pub struct Qr {
    pub q: Vec<Vec<f64>>,
    pub r: Vec<Vec<f64>>,
}

/// Factorizes dense `a` (m × n) by successive Householder reflections
#[instrument(level = "debug", skip(a), fields(rows = a.len(), cols = a.first().map_or(0, Vec::len)))]
pub fn decompose(a: &[Vec<f64>]) -> Qr {
    let m = a.len();
    let n = a.first().map_or(0, Vec::len);
    let mut r = a.to_vec();
    let mut q = super::identity(m);
    let mut v = vec![0.0; m];
    let mut w = vec![0.0; n];
    for k in 0..m.min(n) {
        let norm_x = r[k..].iter().map(|row| row[k] * row[k]).sum::<f64>().sqrt();
        if norm_x == 0.0 {
            continue;
        }
        let rkk = r[k][k];
        let alpha = if rkk > 0.0 { -norm_x } else { norm_x };
        // ‖x − α·e₁‖
        let rs = 2.0 * (0.5 * alpha * (alpha - rkk)).sqrt();
        v[k] = (rkk - alpha) / rs;
        for i in k + 1..m {
            v[i] = r[i][k] / rs;
        }

        // R ← H·R on columns k..n
        w[k..].fill(0.0);
        for i in k..m {
            vectorized::axpy(&r[i][k..], v[i], &mut w[k..]);
        }
        for i in k..m {
            vectorized::axpy(&w[k..], -2.0 * v[i], &mut r[i][k..]);
        }

        // Q ← Q·H
        let vk = &v[k..];
        parallel::for_each_mut(&mut q, |_, row| {
            let d = vectorized::dot(vk, &row[k..]);
            if d != 0.0 {
                vectorized::axpy(vk, -2.0 * d, &mut row[k..]);
            }
        });
    }
    Qr { q, r }
}
