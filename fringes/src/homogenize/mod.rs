//! Flat-fielding by division with a low-pass copy of the frame.

use std::f64::consts::PI;

use common::Buffer2;
use rustfft::FftDirection;

use crate::gaussian::gaussian_filter;
use crate::spectrum::{fft_2d, fft_frequencies, Complex64};

/// Gaussian blur applied as a multiplication in the frequency domain, with
/// periodic boundaries.
pub fn fft_blur(image: &Buffer2<f64>, sigma: f64) -> Buffer2<f64> {
    let (width, height) = image.dimensions();
    let mut data = image.map(|&v| Complex64::new(v, 0.0));
    fft_2d(&mut data, FftDirection::Forward);

    let fx = fft_frequencies(width);
    let fy = fft_frequencies(height);
    let scale = -2.0 * PI * PI * sigma * sigma;
    let norm = 1.0 / (width * height).max(1) as f64;
    for (y, row) in data.pixels_mut().chunks_exact_mut(width.max(1)).enumerate() {
        for (x, z) in row.iter_mut().enumerate() {
            *z *= (scale * (fx[x] * fx[x] + fy[y] * fy[y])).exp() * norm;
        }
    }

    fft_2d(&mut data, FftDirection::Inverse);
    data.map(|z| z.re)
}

/// Divides `image` by its FFT blur of width `sigma`. Non-finite ratios become
/// 0. A non-zero `blur` smooths the result in real space.
///
/// Returns the homogenized image and the number of replaced samples.
pub fn homogenize(image: &Buffer2<f64>, sigma: f64, blur: f64) -> (Buffer2<f64>, usize) {
    let low_pass = fft_blur(image, sigma);
    let mut replaced = 0;
    let ratio = image.zip_map(&low_pass, |v, l| {
        let r = v / l;
        if r.is_finite() {
            r
        } else {
            replaced += 1;
            0.0
        }
    });
    if replaced > 0 {
        tracing::debug!(replaced, "homogenize: replaced non-finite ratios");
    }

    let out = if blur != 0.0 {
        gaussian_filter(&ratio, blur)
    } else {
        ratio
    };
    (out, replaced)
}

#[cfg(test)]
mod tests;
