//! Table interpolation at fractional 1-based coordinates
//!
//! `x` runs along the columns and `y` along the rows. Coordinates may
//! overshoot the table by a relative 1e-14 before they count as out of
//! range, in which case the result is NaN.

use super::HpMatrix;
use crate::config::{DELTA_MINUS, DELTA_PLUS};
use crate::value::RealValue;

fn in_range(d: f64, len: usize) -> bool {
    d.is_finite() && d >= DELTA_MINUS && d <= len as f64 * DELTA_PLUS
}

/// Whole part of a 1-based coordinate, clamped to `1..=len`
fn knot(d: f64, len: usize) -> usize {
    (d.floor() as usize).clamp(1, len)
}

/// True when `d` sits on knot `k` or on the last knot
fn on_knot(d: f64, k: usize, len: usize) -> bool {
    d <= k as f64 || d >= len as f64
}

/// 0-based `(row, col)` of the entry nearest to `(x, y)` in an `m × n`
/// table, halves rounded away from zero
pub(crate) fn nearest(x: f64, y: f64, m: usize, n: usize) -> Option<(usize, usize)> {
    let (x, y) = (x.round(), y.round());
    if !(in_range(x, n) && in_range(y, m)) {
        return None;
    }
    Some((knot(y, m) - 1, knot(x, n) - 1))
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Cubic Hermite value between knots `k` and `k + 1` (0-based) at offset `t`
///
/// The end slopes are damped where the neighbouring differences change
/// sign, which keeps the curve from overshooting monotone data.
fn hermite<F>(z: F, k: usize, len: usize, t: f64) -> f64
where
    F: Fn(usize) -> f64,
{
    let y0 = z(k);
    let y1 = z(k + 1);
    let dy = y1 - y0;
    let s = sign(dy);
    let (mut a, mut b) = (dy, dy);
    if k > 0 {
        let y2 = z(k - 1);
        a = (y1 - y2) * if sign(y0 - y2) == s { 0.5 } else { 0.25 };
    }
    if k + 2 < len {
        let y2 = z(k + 2);
        b = (y2 - y0) * if sign(y2 - y1) == s { 0.5 } else { 0.25 };
    }
    if k == 0 {
        a += (a - b) / 2.0;
    }
    if k + 2 == len {
        b += (b - a) / 2.0;
    }
    y0 + (dy * (3.0 - 2.0 * t) * t + ((a + b) * t - a) * (t - 1.0)) * t
}

impl HpMatrix {
    fn coordinates_valid(&self, x: f64, y: f64) -> bool {
        in_range(x, self.cols()) && in_range(y, self.rows())
    }

    /// Entry nearest to `(x, y)`, halves rounded away from zero
    ///
    /// # Example
    ///
    /// ```
    /// use trueno_linalg::HpMatrix;
    ///
    /// let a = HpMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    /// assert_eq!(a.take(2.0, 1.0).value, 2.0);
    /// assert_eq!(a.take(1.5, 1.4).value, 2.0);
    /// assert!(a.take(3.0, 1.0).value.is_nan());
    /// ```
    pub fn take(&self, x: f64, y: f64) -> RealValue {
        match nearest(x, y, self.rows(), self.cols()) {
            Some((i, j)) => self.value(i, j),
            None => RealValue::NAN,
        }
    }

    /// Bilinear interpolation at `(x, y)`
    pub fn line(&self, x: f64, y: f64) -> RealValue {
        if !self.coordinates_valid(x, y) {
            return RealValue::NAN;
        }
        let (m, n) = (self.rows(), self.cols());
        let j = knot(x, n);
        let i = knot(y, m);
        let z11 = self.get(i - 1, j - 1);
        let exact_x = on_knot(x, j, n);
        let exact_y = on_knot(y, i, m);
        let z = match (exact_x, exact_y) {
            (true, true) => z11,
            (true, false) => z11 + (self.get(i, j - 1) - z11) * (y - i as f64),
            (false, true) => z11 + (self.get(i - 1, j) - z11) * (x - j as f64),
            (false, false) => {
                let tx = x - j as f64;
                let z12 = self.get(i - 1, j);
                let z21 = self.get(i, j - 1);
                let z22 = self.get(i, j);
                let top = z11 + (z12 - z11) * tx;
                let bottom = z21 + (z22 - z21) * tx;
                top + (bottom - top) * (y - i as f64)
            }
        };
        RealValue::with_units(z, self.units)
    }

    /// Hermite spline along the row at 0-based `i` through column coordinate `x`
    fn spline_row(&self, i: usize, x: f64) -> f64 {
        let n = self.cols();
        let j = knot(x, n);
        if on_knot(x, j, n) {
            return self.get(i, j - 1);
        }
        hermite(|k| self.get(i, k), j - 1, n, x - j as f64)
    }

    /// Spline interpolation at `(x, y)`: along each row, then across rows
    pub fn spline(&self, x: f64, y: f64) -> RealValue {
        if !self.coordinates_valid(x, y) {
            return RealValue::NAN;
        }
        let m = self.rows();
        let i = knot(y, m);
        let z = if on_knot(y, i, m) {
            self.spline_row(i - 1, x)
        } else {
            hermite(|k| self.spline_row(k, x), i - 1, m, y - i as f64)
        };
        RealValue::with_units(z, self.units)
    }
}
