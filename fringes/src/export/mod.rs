//! Saving frames and analysis results as self-describing array documents.


use std::io::ErrorKind;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use common::{Buffer2, SerdeFormat};
use serde::{Deserialize, Serialize};

use crate::error::ExportError;

pub const DEFAULT_UNITS: &str = "arb. u.";

/// Pixel scale read from a two-line text file: pixels per unit, then the unit
/// name.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub px_per_unit: f64,
    pub unit: String,
}

impl Calibration {
    pub fn parse(text: &str, path: &str) -> Result<Self, ExportError> {
        let malformed = |reason: String| ExportError::CalibrationFormat {
            path: path.to_string(),
            reason,
        };
        let mut lines = text.lines().map(str::trim);

        let scale = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| malformed("missing pixels-per-unit line".into()))?;
        let px_per_unit: f64 = scale
            .parse()
            .map_err(|_| malformed(format!("'{scale}' is not a number")))?;
        if !(px_per_unit > 0.0 && px_per_unit.is_finite()) {
            return Err(malformed(format!(
                "pixels per unit must be positive, got {px_per_unit}"
            )));
        }
        let unit = lines
            .next()
            .filter(|line| !line.is_empty())
            .ok_or_else(|| malformed("missing unit line".into()))?;

        Ok(Self {
            px_per_unit,
            unit: unit.to_string(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ExportError::CalibrationIo {
            path: display.clone(),
            source,
        })?;
        Self::parse(&text, &display)
    }

    /// Like [`Calibration::from_file`], but a missing file is not an error.
    pub fn from_file_if_exists(path: impl AsRef<Path>) -> Result<Option<Self>, ExportError> {
        match Self::from_file(path.as_ref()) {
            Ok(calibration) => Ok(Some(calibration)),
            Err(ExportError::CalibrationIo { source, .. })
                if source.kind() == ErrorKind::NotFound =>
            {
                tracing::info!(path = %path.as_ref().display(), "Calibration file not found");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Coordinates centred on the image, spanning `len / px_per_unit`.
    pub fn axis(&self, len: usize) -> Vec<f64> {
        let span = len as f64 / self.px_per_unit / 2.0;
        linspace(-span, span, len)
    }
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub units: String,
    pub values: Vec<f64>,
}

/// Row-major 2-D array with its dimension names and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayRecord {
    pub name: String,
    pub dims: [String; 2],
    /// `[height, width]`, matching `dims`.
    pub shape: [usize; 2],
    pub units: String,
    /// Seconds since the Unix epoch.
    pub created: u64,
    pub data: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_pos: Option<Coordinate>,
    /// Decreasing: row 0 is the top of the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_pos: Option<Coordinate>,
}

impl ArrayRecord {
    pub fn from_buffer(name: impl Into<String>, buffer: &Buffer2<f64>) -> Self {
        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());

        Self {
            name: name.into(),
            dims: ["y".to_string(), "x".to_string()],
            shape: [buffer.height(), buffer.width()],
            units: DEFAULT_UNITS.to_string(),
            created,
            data: buffer.pixels().to_vec(),
            x_pos: None,
            y_pos: None,
        }
    }

    pub fn with_calibration(mut self, calibration: &Calibration) -> Self {
        let [height, width] = self.shape;
        let mut y = calibration.axis(height);
        y.reverse();
        self.x_pos = Some(Coordinate {
            units: calibration.unit.clone(),
            values: calibration.axis(width),
        });
        self.y_pos = Some(Coordinate {
            units: calibration.unit.clone(),
            values: y,
        });
        self
    }

    pub fn to_buffer(&self) -> Buffer2<f64> {
        let [height, width] = self.shape;
        Buffer2::new(width, height, self.data.clone())
    }

    /// Writes the record as YAML or JSON, chosen by the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        let format = SerdeFormat::from_file_name(&path_str)?;
        let text = common::serialize(self, format)?;
        std::fs::write(path, text).map_err(|source| ExportError::Write {
            path: path_str.clone(),
            source,
        })?;
        tracing::info!(path = %path_str, "saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let format = SerdeFormat::from_file_name(&display)?;
        let text = std::fs::read_to_string(path).map_err(|source| ExportError::Read {
            path: display.clone(),
            source,
        })?;
        Ok(common::deserialize(&text, format)?)
    }
}

/// Increments the last number in a file name, keeping its zero padding:
/// `scan_0041.json` becomes `scan_0042.json`. Returns an empty string when the
/// name has no number in it.
pub fn next_save_name(previous: &str) -> String {
    let chars: Vec<char> = previous.chars().collect();

    for start in 0..chars.len() {
        let run = chars[start..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        // the number is followed by nothing or by one character and a word
        for len in (1..=run).rev() {
            let rest = &chars[start + len..];
            let suffix_ok = rest.is_empty()
                || (rest.len() >= 2 && rest[1..].iter().all(|c| c.is_alphanumeric() || *c == '_'));
            if suffix_ok {
                let prefix: String = chars[..start].iter().collect();
                let digits: String = chars[start..start + len].iter().collect();
                let suffix: String = rest.iter().collect();
                return format!("{prefix}{}{suffix}", increment_digits(&digits));
            }
        }
    }
    String::new()
}

fn increment_digits(digits: &str) -> String {
    let mut out: Vec<u8> = digits.bytes().collect();
    for b in out.iter_mut().rev() {
        if *b == b'9' {
            *b = b'0';
        } else {
            *b += 1;
            return String::from_utf8_lossy(&out).into_owned();
        }
    }
    out.insert(0, b'1');
    String::from_utf8_lossy(&out).into_owned()
}
