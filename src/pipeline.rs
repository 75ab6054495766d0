//! Pipeline Module
//! Load, clean, aggregate, render, animate.

use crate::charts::{
    frame_durations, AnimationAssembler, ChoroplethRenderer, JoinedView,
};
use crate::config::PipelineConfig;
use crate::data::{BoundaryLoader, DataProcessor, IncidentLoader, INCIDENT_ENCODING};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// What a successful run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub frames: Vec<PathBuf>,
    pub animation: PathBuf,
}

/// Run the whole report once. The first failure aborts the run.
pub fn run(config: &PipelineConfig) -> Result<RunSummary> {
    let incidents = IncidentLoader::load_csv(&config.incidents_path, INCIDENT_ENCODING)
        .context("loading incident table")?;
    let aggregates = DataProcessor::prepare(&incidents).context("cleaning incident table")?;
    let boundaries =
        BoundaryLoader::load(&config.boundaries_path).context("loading borough boundaries")?;

    let view = JoinedView::build(&aggregates, &boundaries)
        .context("joining incidents to borough boundaries")?;
    let frames = view.frames();
    tracing::info!(
        years = frames.len(),
        first = frames.first().map(|f| f.year),
        last = frames.last().map(|f| f.year),
        "rendering one frame per year"
    );

    let render = &config.render;
    let paths = ChoroplethRenderer::render_frames(&frames, render, &config.output_dir)
        .context("rendering frames")?;

    let durations = frame_durations(
        paths.len(),
        Duration::from_secs_f64(render.frame_seconds),
        Duration::from_secs_f64(render.final_frame_seconds),
    );
    let animation = config.animation_path();
    AnimationAssembler::assemble(&paths, &durations, &animation)
        .context("assembling animation")?;

    Ok(RunSummary {
        frames: paths,
        animation,
    })
}
