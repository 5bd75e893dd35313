//! 2D Fourier transforms and spectrum reindexing.
//!
//! The forward transform is unnormalized with the standard `e^{-2πi kn/N}`
//! sign; the inverse carries the `1/(w·h)` factor. Spectra returned by
//! [`forward`] have DC at index `N/2` on each axis.

use std::sync::Arc;

use common::Buffer2;
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftDirection, FftPlanner};

pub type Complex64 = Complex<f64>;

/// Output of [`inverse`].
#[derive(Debug, Clone)]
pub struct InverseTransform {
    pub complex: Buffer2<Complex64>,
    pub amplitude: Buffer2<f64>,
    /// Wrapped phase in units of π, within [-1, 1].
    pub phase: Buffer2<f64>,
}

/// In-place unnormalized 2D FFT using row-column decomposition.
pub fn fft_2d(data: &mut Buffer2<Complex64>, direction: FftDirection) {
    let (width, height) = data.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let mut planner = FftPlanner::new();
    let row_fft = planner.plan_fft(width, direction);
    let col_fft = planner.plan_fft(height, direction);

    process_rows(data.pixels_mut(), width, &row_fft);

    let mut transposed = transpose(data.pixels(), width, height);
    process_rows(&mut transposed, height, &col_fft);
    let restored = transpose(&transposed, height, width);
    data.pixels_mut().copy_from_slice(&restored);
}

fn process_rows(data: &mut [Complex64], row_len: usize, fft: &Arc<dyn Fft<f64>>) {
    let scratch_len = fft.get_inplace_scratch_len();
    data.par_chunks_mut(row_len).for_each_init(
        || vec![Complex64::default(); scratch_len],
        |scratch, row| fft.process_with_scratch(row, scratch),
    );
}

/// Out-of-place transpose of a `width × height` row-major matrix.
fn transpose(data: &[Complex64], width: usize, height: usize) -> Vec<Complex64> {
    let mut out = vec![Complex64::default(); data.len()];
    out.par_chunks_mut(height).enumerate().for_each(|(x, col)| {
        for (y, v) in col.iter_mut().enumerate() {
            *v = data[y * width + x];
        }
    });
    out
}

/// Forward transform of a real image with DC moved to the center, then
/// cropped to a centered square of side `crop_size` (0 disables cropping).
pub fn forward(image: &Buffer2<f64>, crop_size: usize) -> Buffer2<Complex64> {
    let mut data = image.map(|&v| Complex64::new(v, 0.0));
    fft_2d(&mut data, FftDirection::Forward);
    let shifted = fftshift(&data);
    crop_center(&shifted, crop_size)
}

/// Undoes the center shift and applies the normalized inverse transform.
pub fn inverse(spectrum: &Buffer2<Complex64>) -> InverseTransform {
    let mut data = ifftshift(spectrum);
    fft_2d(&mut data, FftDirection::Inverse);

    let norm = 1.0 / (data.width() * data.height()).max(1) as f64;
    data.iter_mut().for_each(|z| *z *= norm);

    let amplitude = data.map(|z| z.norm());
    let phase = data.map(|z| z.arg() / std::f64::consts::PI);
    InverseTransform {
        complex: data,
        amplitude,
        phase,
    }
}

/// Centered square crop. The center is `(N + 1) / 2` per axis, one past the
/// shifted DC for odd `N`, and the side is
/// `min(crop_size, width, height)` rounded down to even. Returns the input
/// unchanged when `crop_size` is 0 or neither dimension exceeds it.
pub fn crop_center<T: Copy>(data: &Buffer2<T>, crop_size: usize) -> Buffer2<T> {
    let (width, height) = data.dimensions();
    if crop_size == 0 || (width <= crop_size && height <= crop_size) {
        return data.clone();
    }
    let half = crop_size.min(width).min(height) / 2;
    let cx = (width + 1) / 2;
    let cy = (height + 1) / 2;
    let x0 = cx.saturating_sub(half);
    let y0 = cy.saturating_sub(half);
    let side_x = (2 * half).min(width - x0);
    let side_y = (2 * half).min(height - y0);
    data.sub_buffer(x0, y0, side_x, side_y)
}

/// Toroidal shift: the value at `(x, y)` moves to `(x + dx, y + dy)` modulo
/// the dimensions.
pub fn roll<T: Copy + Send + Sync>(data: &Buffer2<T>, dx: isize, dy: isize) -> Buffer2<T> {
    let (width, height) = data.dimensions();
    if width == 0 || height == 0 {
        return data.clone();
    }
    let sx = dx.rem_euclid(width as isize) as usize;
    let sy = dy.rem_euclid(height as isize) as usize;

    let mut pixels = data.pixels().to_vec();
    pixels
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let src = data.row((y + height - sy) % height);
            row[sx..].copy_from_slice(&src[..width - sx]);
            row[..sx].copy_from_slice(&src[width - sx..]);
        });
    Buffer2::new(width, height, pixels)
}

/// Moves index 0 to index `N/2` on each axis.
pub fn fftshift<T: Copy + Send + Sync>(data: &Buffer2<T>) -> Buffer2<T> {
    roll(
        data,
        (data.width() / 2) as isize,
        (data.height() / 2) as isize,
    )
}

/// Inverse of [`fftshift`]; differs from it for odd sizes.
pub fn ifftshift<T: Copy + Send + Sync>(data: &Buffer2<T>) -> Buffer2<T> {
    roll(
        data,
        -((data.width() / 2) as isize),
        -((data.height() / 2) as isize),
    )
}

/// `|z|²` per sample.
pub fn power_spectrum(spectrum: &Buffer2<Complex64>) -> Buffer2<f64> {
    spectrum.map(|z| z.norm_sqr())
}

/// `ln(|z|²)` with non-finite values replaced by 0. Returns the image and the
/// number of replaced samples.
pub fn log_power(spectrum: &Buffer2<Complex64>) -> (Buffer2<f64>, usize) {
    let mut replaced = 0;
    let image = spectrum.map(|z| {
        let v = z.norm_sqr().ln();
        if v.is_finite() {
            v
        } else {
            replaced += 1;
            0.0
        }
    });
    if replaced > 0 {
        tracing::debug!(replaced, "log power: replaced non-finite samples");
    }
    (image, replaced)
}

/// Signed sample frequencies `k / n` in FFT order.
pub fn fft_frequencies(n: usize) -> Vec<f64> {
    let half = n.div_ceil(2);
    (0..n)
        .map(|k| {
            let signed = if k < half {
                k as f64
            } else {
                k as f64 - n as f64
            };
            signed / n as f64
        })
        .collect()
}
