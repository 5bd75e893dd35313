use std::sync::Arc;

use anyhow::Context;
use common::Buffer2;

use super::{Plugin, PluginInfo, PluginOutput, PluginSink};
use crate::config::Parameters;
use crate::worker::Worker;

/// Runs the fringe analysis on a background [`Worker`]. Frames arriving while
/// a run is in progress replace each other; only the newest is analyzed.
pub struct FourierPlugin {
    params: Parameters,
    worker: Option<Worker>,
}

impl FourierPlugin {
    pub const NAME: &'static str = "Fourier analysis";

    pub fn new(params: Parameters) -> Self {
        Self {
            params,
            worker: None,
        }
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn update_parameters(&mut self, params: Parameters) -> anyhow::Result<()> {
        if let Some(worker) = &self.worker {
            worker.update_parameters(params.clone())?;
        } else {
            params.validate()?;
        }
        self.params = params;
        Ok(())
    }

    pub fn dropped_frames(&self) -> u64 {
        self.worker.as_ref().map_or(0, Worker::dropped_frames)
    }
}

impl Plugin for FourierPlugin {
    fn describe(&self) -> PluginInfo {
        PluginInfo {
            name: Self::NAME,
            description: "Extracts amplitude and phase from the fringe pattern",
        }
    }

    fn init(&mut self, sink: PluginSink) -> anyhow::Result<()> {
        tokio::runtime::Handle::try_current()
            .context("Fourier analysis needs a tokio runtime")?;
        let worker = Worker::new(self.params.clone(), move |report| {
            tracing::trace!(frame_id = report.frame_id, "analysis ready");
            sink(Self::NAME, PluginOutput::Analysis(Arc::clone(&report.analysis)));
        })?;
        self.worker = Some(worker);
        Ok(())
    }

    fn process_frame(&mut self, frame: &Buffer2<f64>) -> anyhow::Result<()> {
        let worker = self.worker.as_ref().context("plugin is not initialized")?;
        anyhow::ensure!(worker.is_running(), "analysis worker has stopped");
        worker.submit(frame.clone());
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
    }
}
