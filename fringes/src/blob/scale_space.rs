//! Scale-space responses, 3D local maxima and overlap pruning.

use std::f64::consts::{PI, SQRT_2};

use common::Buffer2;
use rayon::prelude::*;

use crate::gaussian::{gaussian_derivative, gaussian_filter, gaussian_laplace};

/// Local maximum in a response cube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalePeak {
    pub x: usize,
    pub y: usize,
    /// Scale of the layer the peak was found in.
    pub sigma: f64,
    pub value: f64,
}

/// `count` evenly spaced scales from `min` to `max` inclusive.
pub fn linear_sigmas(min_sigma: f64, max_sigma: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![min_sigma],
        _ => {
            let step = (max_sigma - min_sigma) / (count - 1) as f64;
            (0..count).map(|i| min_sigma + step * i as f64).collect()
        }
    }
}

/// Geometric scales `min · ratio^i` for `i = 0..=k`, with
/// `k = ⌊ln(max/min) / ln(ratio) + 1⌋`.
pub fn dog_sigmas(min_sigma: f64, max_sigma: f64, sigma_ratio: f64) -> Vec<f64> {
    let k = ((max_sigma / min_sigma).ln() / sigma_ratio.ln() + 1.0).floor();
    if k.is_nan() || k < 0.0 {
        return Vec::new();
    }
    (0..=k as usize)
        .map(|i| min_sigma * sigma_ratio.powi(i as i32))
        .collect()
}

/// Scale-normalized Laplacian of Gaussian, `-σ²∇²G_σ * I`, one layer per scale.
pub fn log_cube(image: &Buffer2<f64>, sigmas: &[f64]) -> Vec<Buffer2<f64>> {
    sigmas
        .iter()
        .map(|&s| gaussian_laplace(image, s).map(|v| -v * s * s))
        .collect()
}

/// Difference of Gaussian layers `(G_σi - G_σi+1) / (ratio - 1)`. Yields one
/// layer fewer than `sigmas`; layer `i` belongs to `sigmas[i]`.
pub fn dog_cube(image: &Buffer2<f64>, sigmas: &[f64], sigma_ratio: f64) -> Vec<Buffer2<f64>> {
    let blurred: Vec<Buffer2<f64>> = sigmas.iter().map(|&s| gaussian_filter(image, s)).collect();
    let scale = 1.0 / (sigma_ratio - 1.0);
    blurred
        .windows(2)
        .map(|pair| pair[0].zip_map(&pair[1], |a, b| (a - b) * scale))
        .collect()
}

/// Scale-normalized determinant of the Hessian, `σ⁴ (Hxx·Hyy - Hxy²)`.
pub fn doh_cube(image: &Buffer2<f64>, sigmas: &[f64]) -> Vec<Buffer2<f64>> {
    sigmas
        .iter()
        .map(|&s| {
            let hxx = gaussian_derivative(image, s, 2, 0);
            let hyy = gaussian_derivative(image, s, 0, 2);
            let hxy = gaussian_derivative(image, s, 1, 1);
            let s4 = s.powi(4);
            let det = hxx.zip_map(&hyy, |a, b| a * b);
            det.zip_map(&hxy, |d, c| s4 * (d - c * c))
        })
        .collect()
}

/// Points that are maximal in their 3×3×3 neighbourhood (out-of-bounds
/// neighbours ignored) and strictly above `threshold`.
///
/// A constant cube has no peaks. Results are ordered by decreasing value;
/// equal values keep raster order (row, column, layer).
pub fn peak_local_max(cube: &[Buffer2<f64>], sigmas: &[f64], threshold: f64) -> Vec<ScalePeak> {
    let Some(first) = cube.first() else {
        return Vec::new();
    };
    let (width, height) = first.dimensions();
    let layers = cube.len();
    debug_assert!(sigmas.len() >= layers);

    let reference = first.pixels().first().copied().unwrap_or_default();
    if cube.iter().all(|layer| layer.iter().all(|&v| v == reference)) {
        return Vec::new();
    }

    let mut peaks: Vec<ScalePeak> = (0..height)
        .into_par_iter()
        .flat_map_iter(|y| {
            let mut row_peaks = Vec::new();
            for x in 0..width {
                for l in 0..layers {
                    let value = cube[l][(x, y)];
                    if value > threshold && is_local_max(cube, x, y, l, value) {
                        row_peaks.push(ScalePeak {
                            x,
                            y,
                            sigma: sigmas[l],
                            value,
                        });
                    }
                }
            }
            row_peaks
        })
        .collect();

    peaks.sort_by(|a, b| b.value.total_cmp(&a.value));
    peaks
}

fn is_local_max(cube: &[Buffer2<f64>], x: usize, y: usize, l: usize, value: f64) -> bool {
    let (width, height) = cube[0].dimensions();
    for nl in l.saturating_sub(1)..=(l + 1).min(cube.len() - 1) {
        let layer = &cube[nl];
        for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                if layer[(nx, ny)] > value {
                    return false;
                }
            }
        }
    }
    true
}

/// Fraction of the smaller blob's area covered by the larger one.
///
/// Positions are scaled by `max_sigma · √2` so the larger blob has radius 1.
pub fn blob_overlap(a: &ScalePeak, b: &ScalePeak) -> f64 {
    if a.sigma <= 0.0 || b.sigma <= 0.0 {
        return 0.0;
    }
    let (max_sigma, r1, r2) = if a.sigma > b.sigma {
        (a.sigma, 1.0, b.sigma / a.sigma)
    } else {
        (b.sigma, a.sigma / b.sigma, 1.0)
    };
    let scale = max_sigma * SQRT_2;
    let dx = (a.x as f64 - b.x as f64) / scale;
    let dy = (a.y as f64 - b.y as f64) / scale;
    let d = (dx * dx + dy * dy).sqrt();

    if d > r1 + r2 {
        return 0.0;
    }
    if d <= (r1 - r2).abs() {
        return 1.0;
    }
    disk_overlap(d, r1, r2)
}

fn disk_overlap(d: f64, r1: f64, r2: f64) -> f64 {
    let ratio1 = ((d * d + r1 * r1 - r2 * r2) / (2.0 * d * r1)).clamp(-1.0, 1.0);
    let ratio2 = ((d * d + r2 * r2 - r1 * r1) / (2.0 * d * r2)).clamp(-1.0, 1.0);
    let a = -d + r2 + r1;
    let b = d - r2 + r1;
    let c = d + r2 - r1;
    let e = d + r2 + r1;
    let area = r1 * r1 * ratio1.acos() + r2 * r2 * ratio2.acos() - 0.5 * (a * b * c * e).abs().sqrt();
    area / (PI * r1.min(r2).powi(2))
}

/// Removes the smaller of every pair overlapping by more than `overlap`.
///
/// Only pairs closer than `2 · σmax · √2` are compared. On equal scales the
/// earlier peak is removed.
pub fn prune_blobs(mut peaks: Vec<ScalePeak>, overlap: f64) -> Vec<ScalePeak> {
    let Some(max_sigma) = peaks.iter().map(|p| p.sigma).reduce(f64::max) else {
        return peaks;
    };
    let reach = 2.0 * max_sigma * SQRT_2;

    for i in 0..peaks.len() {
        for j in i + 1..peaks.len() {
            let (a, b) = (peaks[i], peaks[j]);
            let dx = a.x as f64 - b.x as f64;
            let dy = a.y as f64 - b.y as f64;
            if (dx * dx + dy * dy).sqrt() > reach {
                continue;
            }
            if blob_overlap(&a, &b) > overlap {
                if a.sigma > b.sigma {
                    peaks[j].sigma = 0.0;
                } else {
                    peaks[i].sigma = 0.0;
                }
            }
        }
    }

    peaks.retain(|p| p.sigma > 0.0);
    peaks
}
