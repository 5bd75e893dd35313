//! Fringes - Fourier-domain fringe analysis.
//!
//! Extracts the amplitude and wrapped phase of an interferogram by isolating
//! one first-order peak of its spectrum:
//! - Windowed, optionally cropped 2-D FFT
//! - Scale-space blob detection (LoG, DoG, DoH) with an automatic threshold
//!   search
//! - Masking, re-centring and inverse transform of the selected peak
//! - A background worker that always analyzes the newest frame
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fringes::{Analyzer, Parameters};
//!
//! let analyzer = Analyzer::new(Parameters::default())?;
//! let analysis = analyzer.analyze(&frame);
//!
//! if let Some(result) = analysis.outcome.found() {
//!     println!("Carrier peak at {:?}", result.main_blob);
//! }
//! ```

pub mod blob;
pub mod config;
pub mod error;
pub mod export;
pub mod frame;
pub mod gaussian;
pub mod homogenize;
pub mod mask;
pub mod phase;
pub mod pipeline;
pub mod plugin;
pub mod spectrum;
pub mod window;
pub mod worker;

#[cfg(test)]
pub mod testing;

// ============================================================================
// Configuration
// ============================================================================

pub use config::{DetectionMethod, Parameters};
pub use error::{ConfigError, DetectError, ExportError, FrameError};
pub use window::WindowKind;

// ============================================================================
// Analysis
// ============================================================================

pub use blob::Blob;
pub use phase::{phase_to_rgb, PhaseResult};
pub use pipeline::{Analysis, Analyzer, Diagnostics, Outcome, Stage};

// ============================================================================
// Live processing
// ============================================================================

pub use frame::{clip_fraction, frame_from_interleaved};
pub use plugin::{Plugin, PluginInfo, PluginOutput, PluginRegistry, PluginSink};
pub use worker::{Report, Worker};

// ============================================================================
// Persistence
// ============================================================================

pub use export::{next_save_name, ArrayRecord, Calibration};
