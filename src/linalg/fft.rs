//! In-place radix-2 FFT on split real/imaginary arrays

use tracing::instrument;

/// Replaces `(re, im)` by its discrete Fourier transform
///
/// Only the common prefix of the two slices is transformed and its length
/// must be a power of two. The forward transform uses `exp(+2πi·jk/n)`; the
/// inverse uses the opposite sign and is **not** normalized, so a round trip
/// multiplies the input by `n`.
#[instrument(level = "debug", skip(re, im), fields(n = re.len().min(im.len())))]
pub fn transform(re: &mut [f64], im: &mut [f64], inverse: bool) {
    let n = re.len().min(im.len());
    debug_assert!(n == 0 || n.is_power_of_two());
    bit_reverse(&mut re[..n], &mut im[..n]);

    let isign = if inverse { -1.0 } else { 1.0 };
    let mut mmax = 1;
    while n > mmax {
        let istep = mmax << 1;
        let theta = isign * std::f64::consts::PI / mmax as f64;
        let wtemp = (0.5 * theta).sin();
        let wpr = -2.0 * wtemp * wtemp;
        let wpi = theta.sin();
        let (mut wr, mut wi) = (1.0, 0.0);
        for m in 0..mmax {
            for i in (m..n).step_by(istep) {
                let j = i + mmax;
                let tempr = wr * re[j] - wi * im[j];
                let tempi = wr * im[j] + wi * re[j];
                re[j] = re[i] - tempr;
                im[j] = im[i] - tempi;
                re[i] += tempr;
                im[i] += tempi;
            }
            let w = wr;
            wr = w * wpr - wi * wpi + w;
            wi = wi * wpr + w * wpi + wi;
        }
        mmax = istep;
    }
}

fn bit_reverse(re: &mut [f64], im: &mut [f64]) {
    let n = re.len();
    let mut j = 0;
    for i in 0..n {
        if j > i {
            re.swap(i, j);
            im.swap(i, j);
        }
        let mut m = n >> 1;
        while m >= 1 && j >= m {
            j -= m;
            m >>= 1;
        }
        j += m;
    }
}
