//! Analysis parameters.
//!
//! [`Parameters`] is a flat struct grouped by comments into logical sections.
//! It is immutable for the duration of one analysis run; the worker swaps in a
//! new validated value between runs.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use common::SerdeFormat;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use crate::blob::Blob;
use crate::error::ConfigError;
use crate::window::WindowKind;

// ============================================================================
// Enums
// ============================================================================

/// Scale-space detector used to find blobs in the log power spectrum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    /// Laplacian of Gaussian. Most accurate, slowest.
    Log,
    /// Difference of Gaussian. Fast approximation of LoG.
    #[default]
    Dog,
    /// Determinant of Hessian.
    Doh,
}

impl DetectionMethod {
    pub fn names() -> Vec<String> {
        Self::iter().map(|m| m.to_string()).collect()
    }
}

impl FromStr for DetectionMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::iter()
            .find(|m| m.to_string().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ConfigError::UnknownMethod(s.to_string()))
    }
}

// ============================================================================
// Parameters
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    // -- Blob detection --------------------------------------------------------
    /// Smallest detection scale, in spectrum pixels.
    pub min_sigma: f64,
    /// Largest detection scale, in spectrum pixels.
    pub max_sigma: f64,
    /// Blobs overlapping by more than this fraction are merged. In [0, 1].
    pub overlap: f64,
    /// Starting relative threshold in (0, 1], scaled by the log spectrum's range.
    pub threshold: f64,
    pub method: DetectionMethod,
    /// Number of scales for LoG and DoH.
    pub num_sigma: usize,
    /// Ratio between consecutive DoG scales.
    pub sigma_ratio: f64,

    // -- Threshold search ------------------------------------------------------
    /// Blobs the threshold search aims for (DC plus two sidebands is 3).
    pub target_blob_count: usize,
    /// Search for blobs each frame. When off, `fixed_blob` is used.
    pub auto_detect: bool,
    /// Threshold is divided by `10^(1/steps_per_decade)` per attempt.
    pub steps_per_decade: usize,
    pub fixed_blob: Option<Blob>,
    /// Select the sideband on the opposite side of DC.
    pub pick_opposite: bool,

    // -- Preprocessing ---------------------------------------------------------
    pub homogenize: bool,
    /// Width of the low-pass image the frame is divided by.
    pub homogenize_sigma: f64,
    /// Real-space smoothing after division. 0 disables it.
    pub homogenize_blur: f64,
    pub window: bool,
    pub window_kind: WindowKind,
    /// Apply the window again to the masked spectrum before the inverse transform.
    pub inverse_window: bool,
    /// Side of the centered square crop of the spectrum. 0 disables cropping.
    pub transform_size: usize,

    // -- Phase -----------------------------------------------------------------
    /// Re-anchor the phase so the pixel next to the center reads zero.
    pub reference_phase: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            min_sigma: 8.0,
            max_sigma: 17.0,
            overlap: 0.0,
            threshold: 0.3,
            method: DetectionMethod::Dog,
            num_sigma: 10,
            sigma_ratio: 1.6,

            target_blob_count: 3,
            auto_detect: true,
            steps_per_decade: 5,
            fixed_blob: None,
            pick_opposite: false,

            homogenize: false,
            homogenize_sigma: 4.0,
            homogenize_blur: 0.0,
            window: true,
            window_kind: WindowKind::Cosine,
            inverse_window: false,
            transform_size: 300,

            reference_phase: true,
        }
    }
}

impl Parameters {
    /// Checks every field. Fails on the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("min_sigma", self.min_sigma)?;
        positive("max_sigma", self.max_sigma)?;
        if self.min_sigma > self.max_sigma {
            return Err(ConfigError::SigmaRange {
                min: self.min_sigma,
                max: self.max_sigma,
            });
        }
        if !(0.0..=1.0).contains(&self.overlap) {
            return Err(ConfigError::OutOfRange {
                name: "overlap",
                low: 0.0,
                high: 1.0,
                value: self.overlap,
            });
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(ConfigError::OutOfRange {
                name: "threshold",
                low: 0.0,
                high: 1.0,
                value: self.threshold,
            });
        }
        at_least("num_sigma", self.num_sigma, 1)?;
        if !(self.sigma_ratio.is_finite() && self.sigma_ratio > 1.0) {
            return Err(ConfigError::SigmaRatio(self.sigma_ratio));
        }

        at_least("target_blob_count", self.target_blob_count, 1)?;
        at_least("steps_per_decade", self.steps_per_decade, 1)?;
        match (self.auto_detect, &self.fixed_blob) {
            (false, None) => return Err(ConfigError::MissingFixedBlob),
            (_, Some(blob)) => positive("fixed_blob.radius", blob.radius)?,
            (true, None) => {}
        }

        if self.homogenize {
            positive("homogenize_sigma", self.homogenize_sigma)?;
        }
        if !(self.homogenize_blur.is_finite() && self.homogenize_blur >= 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "homogenize_blur",
                low: 0.0,
                high: f64::INFINITY,
                value: self.homogenize_blur,
            });
        }
        self.window_kind.validate()?;

        Ok(())
    }

    /// Parses parameters from text and validates them.
    pub fn parse(text: &str, format: SerdeFormat) -> Result<Self, ConfigError> {
        let params: Self =
            common::deserialize(text, format).map_err(|e| ConfigError::Parse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Loads parameters from a YAML or JSON file, picking the format from the
    /// extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let format = SerdeFormat::from_file_name(&display).map_err(|e| ConfigError::Io {
            path: display.clone(),
            message: e.to_string(),
        })?;
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: display.clone(),
            message: e.to_string(),
        })?;
        Self::parse(&text, format)
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sigma=[{}, {}] threshold={} overlap={} target={} window={}",
            self.method,
            self.min_sigma,
            self.max_sigma,
            self.threshold,
            self.overlap,
            self.target_blob_count,
            if self.window {
                self.window_kind.name()
            } else {
                "none"
            },
        )
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

fn at_least(name: &'static str, value: usize, min: usize) -> Result<(), ConfigError> {
    if value >= min {
        Ok(())
    } else {
        Err(ConfigError::TooSmall { name, min, value })
    }
}
