use anyhow::{ensure, Context};
use common::Buffer2;

use super::{Plugin, PluginInfo, PluginOutput, PluginSink};
use crate::homogenize::homogenize;

/// Interferogram viewer. Optionally flattens the illumination before
/// republishing the frame.
pub struct HighPassPlugin {
    pub enabled: bool,
    pub sigma: f64,
    pub blur: f64,
    sink: Option<PluginSink>,
}

impl HighPassPlugin {
    pub const NAME: &'static str = "Interferogram viewer";

    pub fn new(enabled: bool, sigma: f64, blur: f64) -> Self {
        Self {
            enabled,
            sigma,
            blur,
            sink: None,
        }
    }
}

impl Default for HighPassPlugin {
    fn default() -> Self {
        Self::new(true, 4.0, 0.0)
    }
}

impl Plugin for HighPassPlugin {
    fn describe(&self) -> PluginInfo {
        PluginInfo {
            name: Self::NAME,
            description: "Shows the interferogram, optionally high-pass filtered",
        }
    }

    fn init(&mut self, sink: PluginSink) -> anyhow::Result<()> {
        ensure!(
            self.sigma > 0.0 && self.sigma.is_finite(),
            "sigma must be positive, got {}",
            self.sigma
        );
        ensure!(
            self.blur >= 0.0 && self.blur.is_finite(),
            "blur must be non-negative, got {}",
            self.blur
        );
        self.sink = Some(sink);
        Ok(())
    }

    fn process_frame(&mut self, frame: &Buffer2<f64>) -> anyhow::Result<()> {
        let sink = self.sink.as_ref().context("plugin is not initialized")?;
        let image = if self.enabled {
            let (image, replaced) = homogenize(frame, self.sigma, self.blur);
            if replaced > 0 {
                tracing::debug!(replaced, "non-finite pixels after high-pass");
            }
            image
        } else {
            frame.clone()
        };
        sink(Self::NAME, PluginOutput::Image(image));
        Ok(())
    }
}
