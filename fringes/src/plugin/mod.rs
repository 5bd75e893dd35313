//! Frame consumers.
//!
//! Every plugin receives each grayscale frame while it is active and publishes
//! results to a shared sink. The registry is built from an explicit list at
//! startup.

mod averaging;
mod column_sum;
mod fourier;
mod high_pass;


use std::sync::Arc;

use anyhow::{bail, Context};
use common::Buffer2;

use crate::config::Parameters;
use crate::pipeline::Analysis;

pub use averaging::{AveragingControl, AveragingPlugin, MAX_AVERAGED_FRAMES};
pub use column_sum::{column_sums, ColumnSumPlugin};
pub use fourier::FourierPlugin;
pub use high_pass::HighPassPlugin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone)]
pub enum PluginOutput {
    Analysis(Arc<Analysis>),
    Image(Buffer2<f64>),
    Profile(Vec<f64>),
}

/// Receives `(plugin name, output)`. Called from worker threads.
pub type PluginSink = Arc<dyn Fn(&str, PluginOutput) + Send + Sync>;

pub trait Plugin: Send {
    fn describe(&self) -> PluginInfo;

    /// Called once before the first frame.
    fn init(&mut self, sink: PluginSink) -> anyhow::Result<()>;

    fn process_frame(&mut self, frame: &Buffer2<f64>) -> anyhow::Result<()>;

    /// Releases background resources.
    fn shutdown(&mut self) {}
}

struct Entry {
    plugin: Box<dyn Plugin>,
    active: bool,
}

pub struct PluginRegistry {
    entries: Vec<Entry>,
}

impl PluginRegistry {
    /// Initializes every plugin. All start inactive.
    pub fn new(plugins: Vec<Box<dyn Plugin>>, sink: PluginSink) -> anyhow::Result<Self> {
        let mut entries = Vec::with_capacity(plugins.len());
        for mut plugin in plugins {
            let info = plugin.describe();
            if entries
                .iter()
                .any(|e: &Entry| e.plugin.describe().name == info.name)
            {
                bail!("Duplicate plugin name '{}'", info.name);
            }
            plugin
                .init(Arc::clone(&sink))
                .with_context(|| format!("Failed to initialize plugin '{}'", info.name))?;
            tracing::info!(plugin = info.name, "plugin initialized");
            entries.push(Entry {
                plugin,
                active: false,
            });
        }
        Ok(Self { entries })
    }

    /// Fourier analysis, interferogram viewer and column sum.
    ///
    /// Must be called within a tokio runtime.
    pub fn with_default_plugins(params: Parameters, sink: PluginSink) -> anyhow::Result<Self> {
        Self::new(
            vec![
                Box::new(FourierPlugin::new(params)),
                Box::new(HighPassPlugin::default()),
                Box::new(ColumnSumPlugin::default()),
            ],
            sink,
        )
    }

    pub fn plugins(&self) -> Vec<(PluginInfo, bool)> {
        self.entries
            .iter()
            .map(|e| (e.plugin.describe(), e.active))
            .collect()
    }

    pub fn set_active(&mut self, name: &str, active: bool) -> anyhow::Result<()> {
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.plugin.describe().name == name)
        else {
            bail!("Unknown plugin '{name}'");
        };
        entry.active = active;
        tracing::debug!(plugin = name, active, "plugin toggled");
        Ok(())
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.active && e.plugin.describe().name == name)
    }

    /// Hands the frame to every active plugin. A failing plugin is logged and
    /// does not stop the others. Returns how many plugins succeeded.
    pub fn dispatch(&mut self, frame: &Buffer2<f64>) -> usize {
        let mut processed = 0;
        for entry in self.entries.iter_mut().filter(|e| e.active) {
            match entry.plugin.process_frame(frame) {
                Ok(()) => processed += 1,
                Err(err) => tracing::error!(
                    plugin = entry.plugin.describe().name,
                    "Plugin failed to process frame: {err:#}"
                ),
            }
        }
        processed
    }

    pub fn shutdown(&mut self) {
        for entry in &mut self.entries {
            entry.plugin.shutdown();
        }
    }
}

impl Drop for PluginRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
