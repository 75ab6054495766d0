//! Pipeline Configuration
//! Fixed input/output locations and the immutable render settings.

use crate::charts::Palette;
use std::path::PathBuf;

/// Incident export published by the London Datastore.
pub const INCIDENTS_PATH: &str = "Animal Rescue incidents attended by LFB from Jan 2009.csv";
/// Borough boundaries (excluding the Thames mean high water line).
pub const BOUNDARIES_PATH: &str =
    "statistical-gis-boundaries-london/ESRI/London_Borough_Excluding_MHW.shp";
pub const OUTPUT_DIR: &str = "fig";
pub const ANIMATION_FILE: &str = "final.gif";

/// Where the pipeline reads from and writes to.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub incidents_path: PathBuf,
    pub boundaries_path: PathBuf,
    pub output_dir: PathBuf,
    pub render: RenderConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            incidents_path: PathBuf::from(INCIDENTS_PATH),
            boundaries_path: PathBuf::from(BOUNDARIES_PATH),
            output_dir: PathBuf::from(OUTPUT_DIR),
            render: RenderConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn animation_path(&self) -> PathBuf {
        self.output_dir.join(ANIMATION_FILE)
    }
}

/// A text annotation anchored at a fraction of the figure.
///
/// `x` runs left to right and `y` bottom to top, both in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct FigureAnnotation {
    pub x: f64,
    pub y: f64,
    pub font_pt: f64,
    pub color: (u8, u8, u8),
}

/// Everything the renderer needs to draw a frame.
///
/// Built once and shared read-only across all frames of a run.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub palette: Palette,
    /// Figure size in inches.
    pub figure_inches: (f64, f64),
    pub dpi: f64,
    /// Axes box as figure fractions: left, right, bottom, top.
    pub axes_box: (f64, f64, f64, f64),
    pub border_color: (u8, u8, u8),
    pub border_width_pt: f64,
    pub title: String,
    pub title_pt: f64,
    pub source_text: String,
    pub source: FigureAnnotation,
    pub year: FigureAnnotation,
    /// Region label size is `label_base_pt + label_scale_pt * normalized_area`.
    pub label_base_pt: f64,
    pub label_scale_pt: f64,
    pub font_family: String,
    pub frame_seconds: f64,
    pub final_frame_seconds: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            palette: Palette::dark2(),
            figure_inches: (6.4, 4.8),
            dpi: 300.0,
            axes_box: (0.125, 0.9, 0.11, 0.88),
            border_color: (0x73, 0x73, 0x73),
            border_width_pt: 0.4,
            title: "Most frequent animal rescues by the London Fire Brigade".to_string(),
            title_pt: 12.0,
            source_text: "Source: London Datastore, 2021".to_string(),
            source: FigureAnnotation {
                x: 0.60,
                y: 0.85,
                font_pt: 8.0,
                color: (0x55, 0x55, 0x55),
            },
            year: FigureAnnotation {
                x: 0.75,
                y: 0.25,
                font_pt: 20.0,
                color: (0, 0, 0),
            },
            label_base_pt: 10.0,
            label_scale_pt: 3.0,
            font_family: "sans-serif".to_string(),
            frame_seconds: 0.5,
            final_frame_seconds: 2.0,
        }
    }
}

impl RenderConfig {
    /// Pixel dimensions of a frame.
    pub fn frame_size(&self) -> (u32, u32) {
        let (w, h) = self.figure_inches;
        ((w * self.dpi).round() as u32, (h * self.dpi).round() as u32)
    }

    /// Convert a size in points to pixels at the configured resolution.
    pub fn pt_to_px(&self, pt: f64) -> f64 {
        pt * self.dpi / 72.0
    }

    pub fn label_pt(&self, normalized_area: f64) -> f64 {
        self.label_base_pt + self.label_scale_pt * normalized_area
    }
}
