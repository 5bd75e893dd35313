use anyhow::{ensure, Context};
use common::Buffer2;

use super::{Plugin, PluginInfo, PluginOutput, PluginSink};

/// Publishes the per-column sum of each frame as a horizontal profile.
#[derive(Default)]
pub struct ColumnSumPlugin {
    sink: Option<PluginSink>,
}

impl ColumnSumPlugin {
    pub const NAME: &'static str = "Sum of columns";
}

/// `profile[x] = Σ_y frame[x, y]`.
pub fn column_sums(frame: &Buffer2<f64>) -> Vec<f64> {
    let mut sums = vec![0.0; frame.width()];
    for row in frame.rows() {
        for (s, v) in sums.iter_mut().zip(row) {
            *s += v;
        }
    }
    sums
}

impl Plugin for ColumnSumPlugin {
    fn describe(&self) -> PluginInfo {
        PluginInfo {
            name: Self::NAME,
            description: "Sums the pixel columns of each frame",
        }
    }

    fn init(&mut self, sink: PluginSink) -> anyhow::Result<()> {
        self.sink = Some(sink);
        Ok(())
    }

    fn process_frame(&mut self, frame: &Buffer2<f64>) -> anyhow::Result<()> {
        ensure!(frame.width() > 0, "frame has no columns");
        let sink = self.sink.as_ref().context("plugin is not initialized")?;
        sink(Self::NAME, PluginOutput::Profile(column_sums(frame)));
        Ok(())
    }
}
