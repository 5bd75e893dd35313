//! Feeds synthetic drifting fringes through the default plugins.
//!
//! ```text
//! cargo run --example live_fringes -- [parameters.yaml]
//! ```

use std::f64::consts::PI;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use common::{setup_logging, Buffer2, LogOptions};
use fringes::plugin::{AveragingPlugin, ColumnSumPlugin, FourierPlugin, HighPassPlugin};
use fringes::{next_save_name, ArrayRecord, Parameters, PluginOutput, PluginRegistry, PluginSink};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

const SIZE: usize = 256;
const FRAMES: usize = 40;

fn synthetic_frame(rng: &mut StdRng, drift: f64) -> Buffer2<f64> {
    Buffer2::from_fn(SIZE, SIZE, |x, y| {
        let carrier = 2.0 * PI * 32.25 * x as f64 / SIZE as f64;
        let tilt = 2.0 * PI * 3.0 * y as f64 / SIZE as f64;
        2.0 + 2.0 * (carrier + tilt + drift).cos() + rng.random_range(-0.1..0.1)
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_logging(&LogOptions::new("live_fringes"))?;

    let params = match std::env::args().nth(1) {
        Some(path) => Parameters::from_file(&path)
            .with_context(|| format!("Failed to load parameters from {path}"))?,
        None => Parameters {
            min_sigma: 1.0,
            max_sigma: 3.0,
            threshold: 0.9,
            steps_per_decade: 20,
            window_kind: fringes::WindowKind::Hann,
            ..Default::default()
        },
    };
    info!("Parameters: {params}");

    let latest_phase: Arc<Mutex<Option<Buffer2<f64>>>> = Arc::default();
    let sink: PluginSink = {
        let latest_phase = Arc::clone(&latest_phase);
        Arc::new(move |name: &str, output| match output {
            PluginOutput::Analysis(analysis) => {
                let d = &analysis.diagnostics;
                info!(
                    plugin = name,
                    found = analysis.outcome.is_found(),
                    blobs = d.blob_count,
                    selected = ?d.selected_blob,
                    elapsed_ms = d.elapsed_ms,
                    "analysis"
                );
                if let Some(result) = analysis.outcome.found() {
                    if let Ok(mut slot) = latest_phase.lock() {
                        *slot = Some(result.phase.clone());
                    }
                }
            }
            PluginOutput::Image(image) => {
                let (width, height) = image.dimensions();
                info!(plugin = name, width, height, "image");
            }
            PluginOutput::Profile(profile) => {
                let peak = profile.iter().copied().fold(f64::MIN, f64::max);
                info!(plugin = name, len = profile.len(), peak, "profile");
            }
        })
    };

    let averaging = AveragingPlugin::new();
    let average = averaging.control();
    let mut registry = PluginRegistry::new(
        vec![
            Box::new(FourierPlugin::new(params)),
            Box::new(HighPassPlugin::default()),
            Box::new(ColumnSumPlugin::default()),
            Box::new(averaging),
        ],
        sink,
    )?;
    for (info, _) in registry.plugins() {
        registry.set_active(info.name, true)?;
    }
    average.start(10)?;

    let mut rng = StdRng::seed_from_u64(1);
    let mut ticker = tokio::time::interval(Duration::from_millis(50));
    for i in 0..FRAMES {
        ticker.tick().await;
        let frame = synthetic_frame(&mut rng, i as f64 * 0.2);
        registry.dispatch(&frame);
    }
    // let the last analysis finish
    tokio::time::sleep(Duration::from_millis(500)).await;
    registry.shutdown();

    let phase = latest_phase.lock().ok().and_then(|mut slot| slot.take());
    if let Some(phase) = phase {
        let path = std::env::temp_dir().join(next_save_name("live_fringes_0000.json"));
        ArrayRecord::from_buffer("phase", &phase).save(&path)?;
        info!("Last phase map written to {}", path.display());
    }

    let path = std::env::temp_dir().join("live_fringes_average.json");
    average.save(&path, None)?;
    info!("Average of {} frames written to {}", average.recorded(), path.display());

    Ok(())
}
