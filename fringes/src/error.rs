//! Error types for fringe analysis.

use thiserror::Error;

/// Invalid analysis parameters. Raised before any computation starts.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Unknown detection method '{0}', expected one of: log, dog, doh")]
    UnknownMethod(String),

    #[error("Unknown window '{0}'")]
    UnknownWindow(String),

    #[error("Window '{name}' expects {expected} shape parameter(s), got {actual}")]
    WindowArity {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Window parameter {name} must be {requirement}, got {value}")]
    WindowParameter {
        name: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("{name} must be a positive finite number, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("min_sigma ({min}) must not exceed max_sigma ({max})")]
    SigmaRange { min: f64, max: f64 },

    #[error("sigma_ratio must be greater than 1, got {0}")]
    SigmaRatio(f64),

    #[error("auto_detect is off but no fixed_blob is set")]
    MissingFixedBlob,

    #[error("{name} must lie in [{low}, {high}], got {value}")]
    OutOfRange {
        name: &'static str,
        low: f64,
        high: f64,
        value: f64,
    },

    #[error("{name} must be at least {min}, got {value}")]
    TooSmall {
        name: &'static str,
        min: usize,
        value: usize,
    },

    #[error("Failed to read parameters file '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse parameters: {0}")]
    Parse(String),
}

/// Failure inside the scale-space detector for one spectrum.
///
/// The pipeline recovers from these by treating the frame as having no blobs.
#[derive(Debug, Error, PartialEq)]
pub enum DetectError {
    #[error("Spectrum is empty ({width}x{height})")]
    EmptySpectrum { width: usize, height: usize },

    #[error("Scale list is empty for min_sigma={min_sigma}, max_sigma={max_sigma}")]
    EmptyScaleList { min_sigma: f64, max_sigma: f64 },
}

/// Malformed camera frame data.
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("Frame must have at least one channel")]
    NoChannels,

    #[error("Frame {width}x{height}x{channels} needs {expected} samples, got {actual}")]
    Length {
        width: usize,
        height: usize,
        channels: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Clip region [{left}, {right}] x [{top}, {bottom}] is not a fraction of the frame")]
    ClipRegion {
        left: f64,
        top: f64,
        right: f64,
        bottom: f64,
    },
}

/// Failures while writing analysis results to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to read calibration file '{path}': {source}")]
    CalibrationIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed calibration file '{path}': {reason}")]
    CalibrationFormat { path: String, reason: String },

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Extension(#[from] common::FileExtensionError),

    #[error(transparent)]
    Serialize(#[from] common::SerdeFormatError),
}
