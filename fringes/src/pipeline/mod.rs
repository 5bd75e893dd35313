//! Per-frame analysis.
//!
//! One call walks `Transforming → Detecting → Found | NotFound`. The stage
//! enum is only observable through `trace` events; the worker owns the idle
//! and done states around each call.

use std::sync::Arc;
use std::time::Instant;

use common::Buffer2;
use serde::Serialize;
use strum_macros::Display;

use crate::blob::{find_number_blobs, pick_blob, Blob, DetectorSettings};
use crate::config::Parameters;
use crate::error::ConfigError;
use crate::homogenize::homogenize;
use crate::mask::mask_and_shift;
use crate::phase::{extract_phase, PhaseResult};
use crate::spectrum::{self, log_power, Complex64};
use crate::window;

/// Stage of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum Stage {
    Idle,
    Transforming,
    Detecting,
    Found,
    NotFound,
    Done,
}

/// Diagnostic information from one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Spectrum dimensions after cropping.
    pub spectrum_size: (usize, usize),
    /// Number of blobs kept by the detector.
    pub blob_count: usize,
    pub blobs: Vec<Blob>,
    /// Sideband the phase was extracted from.
    pub selected_blob: Option<Blob>,
    /// Relative threshold of the last detection pass. `None` with a fixed blob.
    pub threshold_used: Option<f64>,
    /// Detection passes made by the threshold search.
    pub detection_attempts: usize,
    /// Set when the detector failed and the frame was treated as blob-free.
    pub detector_error: Option<String>,
    /// Non-finite ratios replaced while homogenizing.
    pub homogenize_replaced: usize,
    /// Non-finite log-power samples replaced by 0.
    pub log_power_replaced: usize,
    /// Stages the run went through, starting at `Idle` and ending at `Done`.
    pub stages: Vec<Stage>,
    pub elapsed_ms: f64,
}

impl Diagnostics {
    fn enter(&mut self, to: Stage) {
        let from = self.stages.last().copied().unwrap_or(Stage::Idle);
        transition(from, to);
        self.stages.push(to);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Found(PhaseResult),
    /// Fewer blobs than requested. Both maps are zero-filled with the
    /// spectrum's dimensions.
    NotFound {
        amplitude: Buffer2<f64>,
        phase: Buffer2<f64>,
    },
}

impl Outcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found(_))
    }

    pub fn found(&self) -> Option<&PhaseResult> {
        match self {
            Outcome::Found(r) => Some(r),
            Outcome::NotFound { .. } => None,
        }
    }

    pub fn amplitude(&self) -> &Buffer2<f64> {
        match self {
            Outcome::Found(r) => &r.amplitude,
            Outcome::NotFound { amplitude, .. } => amplitude,
        }
    }

    pub fn phase(&self) -> &Buffer2<f64> {
        match self {
            Outcome::Found(r) => &r.phase,
            Outcome::NotFound { phase, .. } => phase,
        }
    }
}

/// Result of analyzing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub outcome: Outcome,
    /// `ln|F|²` of the centered, cropped spectrum.
    pub log_power: Buffer2<f64>,
    pub diagnostics: Diagnostics,
}

/// Runs the fringe pipeline with a fixed set of validated parameters.
#[derive(Debug, Clone)]
pub struct Analyzer {
    params: Arc<Parameters>,
}

impl Analyzer {
    pub fn new(params: Parameters) -> Result<Self, ConfigError> {
        Self::from_shared(Arc::new(params))
    }

    pub fn from_shared(params: Arc<Parameters>) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn shared_parameters(&self) -> Arc<Parameters> {
        Arc::clone(&self.params)
    }

    pub fn analyze(&self, frame: &Buffer2<f64>) -> Analysis {
        let start = Instant::now();
        let params = &*self.params;
        let mut diagnostics = Diagnostics {
            stages: vec![Stage::Idle],
            ..Default::default()
        };

        diagnostics.enter(Stage::Transforming);
        let spectrum = self.transform(frame, &mut diagnostics);
        diagnostics.spectrum_size = spectrum.dimensions();
        let (log_image, replaced) = log_power(&spectrum);
        diagnostics.log_power_replaced = replaced;

        diagnostics.enter(Stage::Detecting);
        let selected = self.detect(&spectrum, &mut diagnostics);

        let outcome = match selected {
            Some(blob) => {
                diagnostics.enter(Stage::Found);
                diagnostics.selected_blob = Some(blob);
                let shifted = mask_and_shift(&spectrum, &blob);
                let inverse_window = params.inverse_window.then_some(params.window_kind);
                Outcome::Found(extract_phase(
                    &shifted,
                    blob,
                    inverse_window,
                    params.reference_phase,
                ))
            }
            None => {
                diagnostics.enter(Stage::NotFound);
                let (width, height) = spectrum.dimensions();
                Outcome::NotFound {
                    amplitude: Buffer2::new_default(width, height),
                    phase: Buffer2::new_default(width, height),
                }
            }
        };

        diagnostics.enter(Stage::Done);
        diagnostics.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(
            found = outcome.is_found(),
            blobs = diagnostics.blob_count,
            elapsed_ms = diagnostics.elapsed_ms,
            "frame analyzed"
        );

        Analysis {
            outcome,
            log_power: log_image,
            diagnostics,
        }
    }

    fn transform(&self, frame: &Buffer2<f64>, diagnostics: &mut Diagnostics) -> Buffer2<Complex64> {
        let params = &*self.params;
        let mut image = if params.homogenize {
            let (flat, replaced) =
                homogenize(frame, params.homogenize_sigma, params.homogenize_blur);
            diagnostics.homogenize_replaced = replaced;
            flat
        } else {
            frame.clone()
        };
        if params.window {
            window::apply(&mut image, params.window_kind);
        }
        spectrum::forward(&image, params.transform_size)
    }

    /// Returns the sideband to reconstruct from, or `None` when too few blobs
    /// were found.
    fn detect(&self, spectrum: &Buffer2<Complex64>, diagnostics: &mut Diagnostics) -> Option<Blob> {
        let params = &*self.params;

        if !params.auto_detect {
            let blob = params.fixed_blob?;
            diagnostics.blob_count = 1;
            diagnostics.blobs = vec![blob];
            return Some(blob);
        }

        let settings = DetectorSettings::from(params);
        let blobs = match find_number_blobs(
            spectrum,
            params.target_blob_count,
            &settings,
            params.threshold,
            params.steps_per_decade,
        ) {
            Ok(search) => {
                diagnostics.threshold_used = Some(search.threshold_used);
                diagnostics.detection_attempts = search.attempts;
                search.blobs
            }
            Err(err) => {
                tracing::warn!("Blob detection failed, treating frame as blob-free: {err}");
                diagnostics.detector_error = Some(err.to_string());
                Vec::new()
            }
        };
        diagnostics.blob_count = blobs.len();
        diagnostics.blobs = blobs;

        let blobs = &diagnostics.blobs;
        if blobs.is_empty() || blobs.len() < params.target_blob_count {
            return None;
        }
        if blobs.len() == 1 {
            return Some(blobs[0]);
        }
        pick_blob(blobs, params.pick_opposite)
    }
}

pub(crate) fn transition(from: Stage, to: Stage) {
    tracing::trace!(%from, %to, "analysis stage");
}

#[cfg(test)]
mod tests;
