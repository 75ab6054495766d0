//! Rescue Map - animated choropleth of London Fire Brigade animal rescues
//!
//! Finds the most frequently rescued animal per borough per year and renders
//! one map per year plus a looping GIF into `fig/`.

mod charts;
mod config;
mod data;
mod pipeline;

use anyhow::Result;
use config::PipelineConfig;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = PipelineConfig::default();
    let summary = pipeline::run(&config)?;

    tracing::info!(
        frames = summary.frames.len(),
        animation = %summary.animation.display(),
        "done"
    );
    Ok(())
}
