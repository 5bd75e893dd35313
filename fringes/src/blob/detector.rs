//! Blob detection with an adaptive threshold search.

use common::Buffer2;
use tracing::debug;

use super::scale_space::{
    dog_cube, dog_sigmas, doh_cube, linear_sigmas, log_cube, peak_local_max, prune_blobs,
};
use super::Blob;
use crate::config::{DetectionMethod, Parameters};
use crate::error::DetectError;
use crate::spectrum::{log_power, Complex64};

/// The search stops once the relative threshold falls to this value.
pub const MIN_SEARCH_THRESHOLD: f64 = 0.001;

/// Scale-space settings shared by every detection call of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorSettings {
    pub min_sigma: f64,
    pub max_sigma: f64,
    pub overlap: f64,
    pub method: DetectionMethod,
    pub num_sigma: usize,
    pub sigma_ratio: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self::from(&Parameters::default())
    }
}

impl From<&Parameters> for DetectorSettings {
    fn from(p: &Parameters) -> Self {
        Self {
            min_sigma: p.min_sigma,
            max_sigma: p.max_sigma,
            overlap: p.overlap,
            method: p.method,
            num_sigma: p.num_sigma,
            sigma_ratio: p.sigma_ratio,
        }
    }
}

impl DetectorSettings {
    fn sigmas(&self) -> Vec<f64> {
        match self.method {
            DetectionMethod::Log | DetectionMethod::Doh => {
                linear_sigmas(self.min_sigma, self.max_sigma, self.num_sigma)
            }
            DetectionMethod::Dog => dog_sigmas(self.min_sigma, self.max_sigma, self.sigma_ratio),
        }
    }
}

/// Detector input. A complex spectrum is converted to `ln|z|²`; a real image
/// is taken as already log-scaled.
#[derive(Debug, Clone, Copy)]
pub enum SpectrumInput<'a> {
    Complex(&'a Buffer2<Complex64>),
    LogScaled(&'a Buffer2<f64>),
}

impl<'a> From<&'a Buffer2<Complex64>> for SpectrumInput<'a> {
    fn from(spectrum: &'a Buffer2<Complex64>) -> Self {
        Self::Complex(spectrum)
    }
}

impl<'a> From<&'a Buffer2<f64>> for SpectrumInput<'a> {
    fn from(image: &'a Buffer2<f64>) -> Self {
        Self::LogScaled(image)
    }
}

impl SpectrumInput<'_> {
    fn dimensions(&self) -> (usize, usize) {
        match self {
            Self::Complex(s) => s.dimensions(),
            Self::LogScaled(i) => i.dimensions(),
        }
    }

    /// Log image with non-finite samples replaced by 0, and the replacement count.
    fn log_image(&self) -> (Buffer2<f64>, usize) {
        match self {
            Self::Complex(s) => log_power(s),
            Self::LogScaled(i) => {
                let mut replaced = 0;
                let image = i.map(|&v| {
                    if v.is_finite() {
                        v
                    } else {
                        replaced += 1;
                        0.0
                    }
                });
                (image, replaced)
            }
        }
    }

    /// Linear power at one sample.
    fn power_at(&self, x: usize, y: usize) -> f64 {
        match self {
            Self::Complex(s) => s[(x, y)].norm_sqr(),
            Self::LogScaled(i) => i[(x, y)].exp(),
        }
    }
}

/// Outcome of [`find_number_blobs`].
#[derive(Debug, Clone, PartialEq)]
pub struct BlobSearch {
    pub blobs: Vec<Blob>,
    /// Relative threshold of the last detection pass.
    pub threshold_used: f64,
    pub attempts: usize,
    /// Non-finite log samples replaced by 0.
    pub non_finite_replaced: usize,
}

/// Detects blobs at one relative `threshold` in (0, 1].
///
/// The absolute threshold is `threshold · ptp + min` of the log image. Radii
/// are the detection scales times √2.
pub fn find_blobs<'a>(
    spectrum: impl Into<SpectrumInput<'a>>,
    settings: &DetectorSettings,
    threshold: f64,
) -> Result<Vec<Blob>, DetectError> {
    let input = spectrum.into();
    check_dimensions(&input)?;
    let (image, _) = input.log_image();
    detect_in_log_image(&image, settings, threshold)
}

fn check_dimensions(input: &SpectrumInput<'_>) -> Result<(), DetectError> {
    let (width, height) = input.dimensions();
    if width == 0 || height == 0 {
        return Err(DetectError::EmptySpectrum { width, height });
    }
    Ok(())
}

fn detect_in_log_image(
    image: &Buffer2<f64>,
    settings: &DetectorSettings,
    threshold: f64,
) -> Result<Vec<Blob>, DetectError> {
    Ok(ScaleSpace::build(image, settings)?.detect(threshold, settings.overlap))
}

/// Response cube of one log image, reused across threshold passes.
struct ScaleSpace {
    cube: Vec<Buffer2<f64>>,
    sigmas: Vec<f64>,
    method: DetectionMethod,
    min: f64,
    ptp: f64,
}

impl ScaleSpace {
    fn build(image: &Buffer2<f64>, settings: &DetectorSettings) -> Result<Self, DetectError> {
        let sigmas = settings.sigmas();
        let cube = match settings.method {
            DetectionMethod::Log => log_cube(image, &sigmas),
            DetectionMethod::Dog => dog_cube(image, &sigmas, settings.sigma_ratio),
            DetectionMethod::Doh => doh_cube(image, &sigmas),
        };
        if cube.is_empty() {
            return Err(DetectError::EmptyScaleList {
                min_sigma: settings.min_sigma,
                max_sigma: settings.max_sigma,
            });
        }

        let (min, max) = image
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Ok(Self {
            cube,
            sigmas,
            method: settings.method,
            min,
            ptp: max - min,
        })
    }

    fn detect(&self, threshold: f64, overlap: f64) -> Vec<Blob> {
        // Responses are compared against a non-negative floor.
        let absolute = (threshold * self.ptp + self.min).max(0.0);

        let peaks = peak_local_max(&self.cube, &self.sigmas, absolute);
        let peak_count = peaks.len();
        let peaks = prune_blobs(peaks, overlap);
        debug!(
            method = %self.method,
            threshold,
            absolute,
            peaks = peak_count,
            kept = peaks.len(),
            "blob detection pass"
        );

        peaks
            .into_iter()
            .map(|p| Blob::from_sigma(p.x as f64, p.y as f64, p.sigma))
            .collect()
    }
}

/// Lowers the threshold geometrically until at least `number` blobs are found
/// or it drops to [`MIN_SEARCH_THRESHOLD`].
///
/// Each pass divides the threshold by `10^(1/steps_per_decade)`. When more than
/// `number` blobs turn up, the ones with the lowest integrated power inside
/// their mask are kept; ties keep detection order.
pub fn find_number_blobs<'a>(
    spectrum: impl Into<SpectrumInput<'a>>,
    number: usize,
    settings: &DetectorSettings,
    threshold: f64,
    steps_per_decade: usize,
) -> Result<BlobSearch, DetectError> {
    let input = spectrum.into();
    check_dimensions(&input)?;
    let (image, non_finite_replaced) = input.log_image();
    let space = ScaleSpace::build(&image, settings)?;

    let step = 10f64.powf(1.0 / steps_per_decade.max(1) as f64);
    let mut current = threshold;
    let mut threshold_used = threshold;
    let mut attempts = 0;
    let mut blobs = Vec::new();

    while blobs.len() < number && current > MIN_SEARCH_THRESHOLD {
        blobs = space.detect(current, settings.overlap);
        threshold_used = current;
        attempts += 1;
        current /= step;
    }

    if blobs.len() > number {
        let mut ranked: Vec<(f64, Blob)> = blobs
            .into_iter()
            .map(|b| (mask_power(&input, &b), b))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
        blobs = ranked.into_iter().take(number).map(|(_, b)| b).collect();
    }

    debug!(
        found = blobs.len(),
        number, threshold_used, attempts, "threshold search finished"
    );

    Ok(BlobSearch {
        blobs,
        threshold_used,
        attempts,
        non_finite_replaced,
    })
}

/// Sum of linear power inside the blob's mask disk.
fn mask_power(input: &SpectrumInput<'_>, blob: &Blob) -> f64 {
    let (width, height) = input.dimensions();
    let r = blob.mask_radius();
    let x0 = (blob.x - r).floor().max(0.0) as usize;
    let y0 = (blob.y - r).floor().max(0.0) as usize;
    let x1 = ((blob.x + r).ceil().max(0.0) as usize).min(width.saturating_sub(1));
    let y1 = ((blob.y + r).ceil().max(0.0) as usize).min(height.saturating_sub(1));

    let mut total = 0.0;
    for y in y0..=y1 {
        for x in x0..=x1 {
            if blob.mask_contains(x as f64, y as f64) {
                total += input.power_at(x, y);
            }
        }
    }
    total
}
