//! Phase extraction from a masked, centered sideband.

use std::f64::consts::PI;

use common::Buffer2;
use serde::{Deserialize, Serialize};

use crate::blob::Blob;
use crate::spectrum::{inverse, Complex64};
use crate::window::{self, WindowKind};

/// Amplitude and wrapped phase of the field encoded by one sideband.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub amplitude: Buffer2<f64>,
    /// Wrapped phase in units of π, within [-1, 1].
    pub phase: Buffer2<f64>,
    /// Sideband the field was reconstructed from.
    pub main_blob: Blob,
}

/// Reconstructs the field from a sideband already masked and shifted to the
/// center. The spectrum is windowed first when `inverse_window` is set.
pub fn extract_phase(
    shifted: &Buffer2<Complex64>,
    main_blob: Blob,
    inverse_window: Option<WindowKind>,
    reference_phase: bool,
) -> PhaseResult {
    let field = match inverse_window {
        Some(kind) => inverse(&window::windowed(shifted, kind)),
        None => inverse(shifted),
    };
    let mut phase = field.phase;
    if reference_phase {
        phase_shift_center(&mut phase);
    }
    PhaseResult {
        amplitude: field.amplitude,
        phase,
        main_blob,
    }
}

/// Pixel used as the phase reference: `(w/2 - 1, h/2 - 1)`, clamped to 0.
pub fn reference_pixel(width: usize, height: usize) -> (usize, usize) {
    ((width / 2).saturating_sub(1), (height / 2).saturating_sub(1))
}

/// Re-anchors a wrapped phase map (units of π) so the reference pixel reads 0.
///
/// Every sample becomes `(p - ref + 1) mod 2 - 1` with a Euclidean modulo,
/// which keeps the result in [-1, 1).
pub fn phase_shift_center(phase: &mut Buffer2<f64>) {
    let (width, height) = phase.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let reference = phase[reference_pixel(width, height)];
    for p in phase.iter_mut() {
        let wrapped = (*p - reference + 1.0).rem_euclid(2.0) - 1.0;
        // rem_euclid can round up to the modulus itself
        *p = if wrapped >= 1.0 { -1.0 } else { wrapped };
    }
}

/// Renders a complex field as RGB in [0, 1]: brightness from the normalized
/// amplitude, hue from three sines of the phase offset by 2π/3.
pub fn phase_to_rgb(amplitude: &Buffer2<f64>, phase: &Buffer2<f64>) -> Buffer2<[f64; 3]> {
    let max = amplitude.iter().cloned().fold(0.0, f64::max);
    if max <= 0.0 || !max.is_finite() {
        return Buffer2::new_filled(amplitude.width(), amplitude.height(), [0.0; 3]);
    }
    amplitude.zip_map(phase, |&a, &p| {
        let brightness = a / max;
        let channel = |offset: f64| 0.5 * ((PI * p + offset).sin() + 1.0) * brightness;
        [
            channel(0.0),
            channel(2.0 * PI / 3.0),
            channel(4.0 * PI / 3.0),
        ]
    })
}

#[cfg(test)]
mod tests;
