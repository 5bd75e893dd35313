use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{bail, ensure, Context};
use common::Buffer2;

use super::{Plugin, PluginInfo, PluginOutput, PluginSink};
use crate::export::{ArrayRecord, Calibration};

pub const MAX_AVERAGED_FRAMES: usize = 999;

/// Running sum of a fixed number of frames.
#[derive(Debug, Default)]
struct Averager {
    sum: Option<Buffer2<f64>>,
    recorded: usize,
    target: usize,
    recording: bool,
}

impl Averager {
    fn start(&mut self, frames: usize) {
        self.sum = None;
        self.recorded = 0;
        self.target = frames;
        self.recording = true;
    }

    /// Adds a frame and returns the mean so far, or `None` when not recording.
    fn push(&mut self, frame: &Buffer2<f64>) -> anyhow::Result<Option<Buffer2<f64>>> {
        if !self.recording {
            return Ok(None);
        }
        match &mut self.sum {
            Some(sum) => {
                ensure!(
                    sum.dimensions() == frame.dimensions(),
                    "frame is {:?}, averaging {:?} frames",
                    frame.dimensions(),
                    sum.dimensions()
                );
                sum.iter_mut().zip(frame.iter()).for_each(|(s, v)| *s += v);
            }
            None => self.sum = Some(frame.clone()),
        }
        self.recorded += 1;
        if self.recorded >= self.target {
            self.recording = false;
            tracing::info!(frames = self.recorded, "averaging finished");
        }
        Ok(self.mean())
    }

    fn mean(&self) -> Option<Buffer2<f64>> {
        let n = self.recorded as f64;
        self.sum.as_ref().map(|sum| sum.map(|&v| v / n))
    }
}

/// Shared handle for starting, stopping and saving an averaging run while the
/// plugin itself is owned by a registry.
#[derive(Debug, Clone, Default)]
pub struct AveragingControl {
    state: Arc<Mutex<Averager>>,
}

impl AveragingControl {
    fn lock(&self) -> MutexGuard<'_, Averager> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Discards the previous average and records the next `frames` frames.
    pub fn start(&self, frames: usize) -> anyhow::Result<()> {
        ensure!(
            (1..=MAX_AVERAGED_FRAMES).contains(&frames),
            "number of averages must be in 1..={MAX_AVERAGED_FRAMES}, got {frames}"
        );
        self.lock().start(frames);
        Ok(())
    }

    /// Aborts recording. Frames recorded so far stay averaged.
    pub fn stop(&self) {
        self.lock().recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.lock().recording
    }

    pub fn recorded(&self) -> usize {
        self.lock().recorded
    }

    pub fn average(&self) -> Option<Buffer2<f64>> {
        self.lock().mean()
    }

    pub fn to_record(&self, calibration: Option<&Calibration>) -> Option<ArrayRecord> {
        let record = ArrayRecord::from_buffer("intensity", &self.average()?);
        Some(match calibration {
            Some(calibration) => record.with_calibration(calibration),
            None => record,
        })
    }

    pub fn save(
        &self,
        path: impl AsRef<Path>,
        calibration: Option<&Calibration>,
    ) -> anyhow::Result<()> {
        let path = path.as_ref();
        let Some(record) = self.to_record(calibration) else {
            bail!("No frames averaged; {} not saved", path.display());
        };
        record
            .save(path)
            .with_context(|| format!("{} not saved", path.display()))
    }
}

/// Averages a requested number of frames and publishes the running mean.
pub struct AveragingPlugin {
    control: AveragingControl,
    sink: Option<PluginSink>,
}

impl AveragingPlugin {
    pub const NAME: &'static str = "Averaging";

    pub fn new() -> Self {
        Self {
            control: AveragingControl::default(),
            sink: None,
        }
    }

    pub fn control(&self) -> AveragingControl {
        self.control.clone()
    }
}

impl Default for AveragingPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for AveragingPlugin {
    fn describe(&self) -> PluginInfo {
        PluginInfo {
            name: Self::NAME,
            description: "Averages a number of frames",
        }
    }

    fn init(&mut self, sink: PluginSink) -> anyhow::Result<()> {
        self.sink = Some(sink);
        Ok(())
    }

    fn process_frame(&mut self, frame: &Buffer2<f64>) -> anyhow::Result<()> {
        let sink = self.sink.as_ref().context("plugin is not initialized")?;
        let mean = self.control.lock().push(frame)?;
        if let Some(mean) = mean {
            sink(Self::NAME, PluginOutput::Image(mean));
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        self.control.stop();
    }
}
