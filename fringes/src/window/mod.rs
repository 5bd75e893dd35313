//! Separable apodization windows.
//!
//! All windows use the periodic (DFT-even) definition: a length `n` window is
//! the symmetric window of length `n + 1` with its last sample dropped. This
//! is the variant suited to spectral analysis.

use std::f64::consts::PI;
use std::ops::Mul;

use common::Buffer2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    #[default]
    Cosine,
    Hann,
    Hamming,
    Blackman,
    Boxcar,
    /// `alpha - (1 - alpha) cos(2πn/N)`. Hann is 0.5, Hamming 0.54.
    GeneralHamming { alpha: f64 },
    /// Flat top with cosine tapers. `alpha` is the tapered fraction.
    Tukey { alpha: f64 },
    Gaussian { std: f64 },
    Kaiser { beta: f64 },
}

impl WindowKind {
    /// Builds a window from its name and shape parameters.
    pub fn from_name(name: &str, args: &[f64]) -> Result<Self, ConfigError> {
        let normalized = name.trim().to_ascii_lowercase();
        let (expected, kind) = match normalized.as_str() {
            "cosine" | "cos" => (0, Some(Self::Cosine)),
            "hann" | "hanning" => (0, Some(Self::Hann)),
            "hamming" => (0, Some(Self::Hamming)),
            "blackman" => (0, Some(Self::Blackman)),
            "boxcar" | "rect" | "ones" => (0, Some(Self::Boxcar)),
            "general_hamming" => (1, None),
            "tukey" => (1, None),
            "gaussian" => (1, None),
            "kaiser" => (1, None),
            _ => return Err(ConfigError::UnknownWindow(name.to_string())),
        };
        if args.len() != expected {
            return Err(ConfigError::WindowArity {
                name: normalized,
                expected,
                actual: args.len(),
            });
        }

        let kind = match kind {
            Some(kind) => kind,
            None => {
                let p = args[0];
                match normalized.as_str() {
                    "general_hamming" => Self::GeneralHamming { alpha: p },
                    "tukey" => Self::Tukey { alpha: p },
                    "gaussian" => Self::Gaussian { std: p },
                    _ => Self::Kaiser { beta: p },
                }
            }
        };
        kind.validate()?;
        Ok(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Hann => "hann",
            Self::Hamming => "hamming",
            Self::Blackman => "blackman",
            Self::Boxcar => "boxcar",
            Self::GeneralHamming { .. } => "general_hamming",
            Self::Tukey { .. } => "tukey",
            Self::Gaussian { .. } => "gaussian",
            Self::Kaiser { .. } => "kaiser",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::GeneralHamming { alpha } if !(0.0..=1.0).contains(&alpha) => {
                Err(ConfigError::WindowParameter {
                    name: "alpha",
                    requirement: "within [0, 1]",
                    value: alpha,
                })
            }
            Self::Tukey { alpha } if !alpha.is_finite() => Err(ConfigError::WindowParameter {
                name: "alpha",
                requirement: "finite",
                value: alpha,
            }),
            Self::Gaussian { std } if !(std.is_finite() && std > 0.0) => {
                Err(ConfigError::WindowParameter {
                    name: "std",
                    requirement: "positive",
                    value: std,
                })
            }
            Self::Kaiser { beta } if !(beta.is_finite() && beta >= 0.0) => {
                Err(ConfigError::WindowParameter {
                    name: "beta",
                    requirement: "non-negative",
                    value: beta,
                })
            }
            _ => Ok(()),
        }
    }

    /// 1D window coefficients of length `n`.
    pub fn coefficients(&self, n: usize) -> Vec<f64> {
        if n <= 1 {
            return vec![1.0; n];
        }
        match *self {
            Self::Cosine => {
                let m = (n + 1) as f64;
                (0..n)
                    .map(|i| (PI * (i as f64 + 0.5) / m).sin())
                    .collect()
            }
            Self::Hann => general_cosine(n, &[0.5, 0.5]),
            Self::Hamming => general_cosine(n, &[0.54, 0.46]),
            Self::Blackman => general_cosine(n, &[0.42, 0.5, 0.08]),
            Self::Boxcar => vec![1.0; n],
            Self::GeneralHamming { alpha } => general_cosine(n, &[alpha, 1.0 - alpha]),
            Self::Tukey { alpha } => tukey(n, alpha),
            Self::Gaussian { std } => {
                let center = n as f64 / 2.0;
                let denom = 2.0 * std * std;
                (0..n)
                    .map(|i| {
                        let d = i as f64 - center;
                        (-d * d / denom).exp()
                    })
                    .collect()
            }
            Self::Kaiser { beta } => {
                let half = n as f64 / 2.0;
                let norm = bessel_i0(beta);
                (0..n)
                    .map(|i| {
                        let r = (i as f64 - half) / half;
                        bessel_i0(beta * (1.0 - r * r).max(0.0).sqrt()) / norm
                    })
                    .collect()
            }
        }
    }
}

/// `Σ (-1)^k a_k cos(2πkn/N)`, the periodic cosine-sum family.
fn general_cosine(n: usize, coeffs: &[f64]) -> Vec<f64> {
    let step = 2.0 * PI / n as f64;
    (0..n)
        .map(|i| {
            coeffs
                .iter()
                .enumerate()
                .map(|(k, a)| {
                    let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                    sign * a * (step * (k * i) as f64).cos()
                })
                .sum()
        })
        .collect()
}

fn tukey(n: usize, alpha: f64) -> Vec<f64> {
    if alpha <= 0.0 {
        return vec![1.0; n];
    }
    if alpha >= 1.0 {
        return general_cosine(n, &[0.5, 0.5]);
    }

    let span = n as f64;
    let width = (alpha * span / 2.0).floor() as usize;
    (0..n)
        .map(|i| {
            let t = i as f64;
            if i <= width {
                0.5 * (1.0 + (PI * (-1.0 + 2.0 * t / alpha / span)).cos())
            } else if i < n - width {
                1.0
            } else {
                0.5 * (1.0 + (PI * (-2.0 / alpha + 1.0 + 2.0 * t / alpha / span)).cos())
            }
        })
        .collect()
}

/// Modified Bessel function of the first kind, order zero (power series).
fn bessel_i0(x: f64) -> f64 {
    let q = x * x / 4.0;
    let mut term = 1.0;
    let mut sum = 1.0;
    let mut k = 1.0;
    while term > sum * 1e-17 {
        term *= q / (k * k);
        sum += term;
        k += 1.0;
    }
    sum
}

/// Multiplies `image` in place by the outer product of a row and a column
/// window of the same family.
pub fn apply<T>(image: &mut Buffer2<T>, kind: WindowKind)
where
    T: Copy + Send + Sync + Mul<f64, Output = T>,
{
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let wx = kind.coefficients(width);
    let wy = kind.coefficients(height);

    image
        .pixels_mut()
        .par_chunks_mut(width)
        .zip(wy.par_iter())
        .for_each(|(row, &fy)| {
            for (v, &fx) in row.iter_mut().zip(wx.iter()) {
                *v = *v * (fx * fy);
            }
        });
}

/// Returns a windowed copy of `image`.
pub fn windowed<T>(image: &Buffer2<T>, kind: WindowKind) -> Buffer2<T>
where
    T: Copy + Send + Sync + Mul<f64, Output = T>,
{
    let mut out = image.clone();
    apply(&mut out, kind);
    out
}
