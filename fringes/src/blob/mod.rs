//! Blob detection in the power spectrum.
//!
//! A fringe pattern shows up in the centered spectrum as a DC peak plus two
//! point-symmetric sidebands. [`detector`] finds them with a scale-space
//! detector and an adaptive threshold search, [`selector`] picks the sideband
//! used for phase extraction.

pub mod detector;
pub mod scale_space;
pub mod selector;


use serde::{Deserialize, Serialize};

pub use detector::{find_blobs, find_number_blobs, BlobSearch, DetectorSettings, SpectrumInput};
pub use selector::pick_blob;

/// Detected peak in spectrum pixels. `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub x: f64,
    pub y: f64,
    /// Detection scale times √2.
    pub radius: f64,
}

impl Blob {
    /// Blob masks extend this factor beyond the detected radius.
    pub const MASK_FACTOR: f64 = 1.2;

    pub fn new(x: f64, y: f64, radius: f64) -> Self {
        Self { x, y, radius }
    }

    /// Builds a blob from a detection scale.
    pub fn from_sigma(x: f64, y: f64, sigma: f64) -> Self {
        Self::new(x, y, sigma * std::f64::consts::SQRT_2)
    }

    #[inline]
    pub fn mask_radius(&self) -> f64 {
        Self::MASK_FACTOR * self.radius
    }

    /// Whether `(x, y)` lies inside the blob mask.
    #[inline]
    pub fn mask_contains(&self, x: f64, y: f64) -> bool {
        let dx = x - self.x;
        let dy = y - self.y;
        (dx * dx + dy * dy).sqrt() <= self.mask_radius()
    }
}
