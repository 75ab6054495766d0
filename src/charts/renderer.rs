//! Choropleth Frame Renderer
//! Draws one annotated borough map per year with plotters.
//!
//! Layout mirrors a default matplotlib figure:
//! 1. Title centred above the axes box
//! 2. Boroughs filled by category code, thin grey borders, no axes
//! 3. Source attribution and year label at fixed figure fractions
//! 4. Dominant animal name at each borough centroid, sized by area

use super::frame::YearFrame;
use crate::config::{FigureAnnotation, RenderConfig};
use geo::{Area, LineString, Rect};
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontFamily, FontStyle};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Region `{region}` ({year}) has no boundary to join")]
    UnmatchedRegion { region: String, year: i64 },
    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to draw frame {path}: {message}")]
    Drawing { path: PathBuf, message: String },
    #[error("Frame for {year} has no geometry to draw")]
    EmptyFrame { year: i64 },
    #[error("Failed to encode animation: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to write animation {path}: {source}")]
    AnimationIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No frames to animate")]
    NoFrames,
    #[error("{frames} frames but {durations} durations")]
    DurationMismatch { frames: usize, durations: usize },
}

/// Fraction of the data range added on each side, as matplotlib autoscale does.
const DATA_MARGIN: f64 = 0.05;

/// Deterministic per-year frame file name.
pub fn frame_path(dir: &Path, year: i64) -> PathBuf {
    dir.join(format!("rescues_{year}.png"))
}

/// Create `dir` if needed; failure is fatal for the run.
pub fn ensure_output_dir(dir: &Path) -> Result<(), RenderError> {
    std::fs::create_dir_all(dir).map_err(|source| RenderError::OutputDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Data-space window shown in the axes box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapExtent {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

impl MapExtent {
    /// Pad `bounds` and widen one axis so a data unit has the same length in
    /// x and y for an axes box of `width` x `height` pixels.
    pub fn fit(bounds: Rect<f64>, width: f64, height: f64) -> Self {
        let (min, max) = (bounds.min(), bounds.max());
        let mut dx = (max.x - min.x).max(f64::EPSILON);
        let mut dy = (max.y - min.y).max(f64::EPSILON);
        dx *= 1.0 + 2.0 * DATA_MARGIN;
        dy *= 1.0 + 2.0 * DATA_MARGIN;

        let box_aspect = width / height;
        if dx / dy < box_aspect {
            dx = dy * box_aspect;
        } else {
            dy = dx / box_aspect;
        }

        let cx = (min.x + max.x) / 2.0;
        let cy = (min.y + max.y) / 2.0;
        Self {
            x: (cx - dx / 2.0, cx + dx / 2.0),
            y: (cy - dy / 2.0, cy + dy / 2.0),
        }
    }
}

/// Pixel placement of the axes box and the data window drawn inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLayout {
    pub width: u32,
    pub height: u32,
    /// Axes box margins in pixels, measured from each edge of the figure.
    pub margin_top: i32,
    pub margin_bottom: i32,
    pub margin_left: i32,
    pub margin_right: i32,
    pub extent: MapExtent,
}

impl FrameLayout {
    pub fn new(config: &RenderConfig, bounds: Rect<f64>) -> Self {
        let (width, height) = config.frame_size();
        let (w, h) = (f64::from(width), f64::from(height));
        let (left, right, bottom, top) = config.axes_box;

        let margin_left = (left * w).round() as i32;
        let margin_right = ((1.0 - right) * w).round() as i32;
        let margin_top = ((1.0 - top) * h).round() as i32;
        let margin_bottom = (bottom * h).round() as i32;
        let (box_w, box_h) = (
            w - f64::from(margin_left + margin_right),
            h - f64::from(margin_top + margin_bottom),
        );

        Self {
            width,
            height,
            margin_top,
            margin_bottom,
            margin_left,
            margin_right,
            extent: MapExtent::fit(bounds, box_w, box_h),
        }
    }
}

fn ring(line: &LineString<f64>) -> Vec<(f64, f64)> {
    line.coords().map(|c| (c.x, c.y)).collect()
}

/// Area enclosed by the exterior ring, ignoring holes.
fn outline_area(polygon: &geo::Polygon<f64>) -> f64 {
    geo::Polygon::new(polygon.exterior().clone(), Vec::new()).unsigned_area()
}

/// Renders year frames to PNG files.
pub struct ChoroplethRenderer;

impl ChoroplethRenderer {
    /// Render every frame into `dir`, ascending by year.
    ///
    /// Stops at the first failure; frames already written stay on disk.
    pub fn render_frames(
        frames: &[YearFrame<'_>],
        config: &RenderConfig,
        dir: &Path,
    ) -> Result<Vec<PathBuf>, RenderError> {
        ensure_output_dir(dir)?;

        let mut written = Vec::with_capacity(frames.len());
        for frame in frames {
            let path = frame_path(dir, frame.year);
            Self::render_frame(frame, config, &path)?;
            tracing::debug!(year = frame.year, path = %path.display(), "rendered frame");
            written.push(path);
        }
        tracing::info!(frames = written.len(), dir = %dir.display(), "rendered frames");
        Ok(written)
    }

    /// Draw a single year to `path`.
    pub fn render_frame(
        frame: &YearFrame<'_>,
        config: &RenderConfig,
        path: &Path,
    ) -> Result<(), RenderError> {
        let drawing = |e: &dyn std::fmt::Display| RenderError::Drawing {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let bounds = frame
            .bounds()
            .ok_or(RenderError::EmptyFrame { year: frame.year })?;
        let layout = FrameLayout::new(config, bounds);
        let extent = layout.extent;

        let root = BitMapBackend::new(path, (layout.width, layout.height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| drawing(&e))?;

        let map_area = root.margin(
            layout.margin_top,
            layout.margin_bottom,
            layout.margin_left,
            layout.margin_right,
        );
        let mut chart = ChartBuilder::on(&map_area)
            .build_cartesian_2d(extent.x.0..extent.x.1, extent.y.0..extent.y.1)
            .map_err(|e| drawing(&e))?;
        // No configure_mesh(): ticks, labels and grid stay hidden.

        let (br, bg, bb) = config.border_color;
        let border_px = config.pt_to_px(config.border_width_pt).round().max(1.0) as u32;
        let border = RGBColor(br, bg, bb).stroke_width(border_px);

        // Largest outlines first; holes are whitened right after their own fill.
        let mut polygons: Vec<(&geo::Polygon<f64>, RGBColor)> = frame
            .regions
            .iter()
            .flat_map(|region| {
                let color = config.palette.color_for(region.record.code);
                region.boundary.geometry.0.iter().map(move |p| (p, color))
            })
            .collect();
        polygons.sort_by(|a, b| outline_area(b.0).total_cmp(&outline_area(a.0)));

        for (polygon, color) in &polygons {
            let fill = Polygon::new(ring(polygon.exterior()), color.filled());
            chart
                .draw_series(std::iter::once(fill))
                .map_err(|e| drawing(&e))?;
            for hole in polygon.interiors() {
                chart
                    .draw_series(std::iter::once(Polygon::new(ring(hole), WHITE.filled())))
                    .map_err(|e| drawing(&e))?;
            }
        }

        for (polygon, _) in &polygons {
            for line in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                chart
                    .draw_series(std::iter::once(PathElement::new(ring(line), border)))
                    .map_err(|e| drawing(&e))?;
            }
        }

        // Labels after all fills and borders.
        for region in &frame.regions {
            let size = config.pt_to_px(config.label_pt(region.boundary.normalized_area));
            let style = Self::text_style(config, size, &BLACK, HPos::Center, VPos::Bottom);
            let anchor = (region.boundary.centroid.x(), region.boundary.centroid.y());
            chart
                .draw_series(std::iter::once(Text::new(
                    region.record.category.clone(),
                    anchor,
                    style,
                )))
                .map_err(|e| drawing(&e))?;
        }

        let title_style = Self::text_style(
            config,
            config.pt_to_px(config.title_pt),
            &BLACK,
            HPos::Center,
            VPos::Bottom,
        );
        let title_gap = config.pt_to_px(6.0).round() as i32;
        root.draw(&Text::new(
            config.title.clone(),
            ((layout.width / 2) as i32, layout.margin_top - title_gap),
            title_style,
        ))
        .map_err(|e| drawing(&e))?;

        Self::annotate(&root, config, &config.source, config.source_text.clone())
            .map_err(|e| drawing(&e))?;
        Self::annotate(&root, config, &config.year, frame.year.to_string())
            .map_err(|e| drawing(&e))?;

        root.present().map_err(|e| drawing(&e))?;
        Ok(())
    }

    /// Left/top anchored text at a figure fraction.
    fn annotate<DB: DrawingBackend>(
        root: &DrawingArea<DB, plotters::coord::Shift>,
        config: &RenderConfig,
        annotation: &FigureAnnotation,
        text: String,
    ) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        let (width, height) = config.frame_size();
        let x = (annotation.x * f64::from(width)).round() as i32;
        let y = ((1.0 - annotation.y) * f64::from(height)).round() as i32;
        let (r, g, b) = annotation.color;
        let style = Self::text_style(
            config,
            config.pt_to_px(annotation.font_pt),
            &RGBColor(r, g, b),
            HPos::Left,
            VPos::Top,
        );
        root.draw(&Text::new(text, (x, y), style))
    }

    fn text_style<'a>(
        config: &'a RenderConfig,
        size_px: f64,
        color: &RGBColor,
        h: HPos,
        v: VPos,
    ) -> TextStyle<'a> {
        FontDesc::new(
            FontFamily::from(config.font_family.as_str()),
            size_px,
            FontStyle::Normal,
        )
        .color(color)
        .pos(Pos::new(h, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::animation::{frame_durations, AnimationAssembler};
    use crate::charts::frame::JoinedView;
    use crate::data::boundary::tests::{raw, square};
    use crate::data::boundary::RawRegion;
    use crate::data::processor::Incident;
    use crate::data::{BoundaryTable, DataProcessor};
    use geo::{LineString, MultiPolygon};
    use image::codecs::gif::GifDecoder;
    use image::{AnimationDecoder, GenericImageView};
    use std::fs::File;
    use std::io::BufReader;
    use std::time::Duration;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rescue_map_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn incident(year: i64, region: &str, category: &str) -> Incident {
        Incident {
            year,
            region: region.to_string(),
            category: category.to_string(),
        }
    }

    /// Image pixel showing the data point (`x`, `y`).
    fn pixel_at(layout: &FrameLayout, x: f64, y: f64) -> (u32, u32) {
        let box_w = f64::from(layout.width) - f64::from(layout.margin_left + layout.margin_right);
        let box_h = f64::from(layout.height) - f64::from(layout.margin_top + layout.margin_bottom);
        let (x0, x1) = layout.extent.x;
        let (y0, y1) = layout.extent.y;
        let px = f64::from(layout.margin_left) + (x - x0) / (x1 - x0) * box_w;
        let py = f64::from(layout.margin_top) + (y1 - y) / (y1 - y0) * box_h;
        (px.round() as u32, py.round() as u32)
    }

    fn rgb(color: RGBColor) -> [u8; 3] {
        [color.0, color.1, color.2]
    }

    #[test]
    fn frame_files_are_named_by_year() {
        let path = frame_path(Path::new("fig"), 2019);
        assert_eq!(path, PathBuf::from("fig/rescues_2019.png"));
    }

    #[test]
    fn extent_keeps_equal_aspect() {
        let bounds = Rect::new((0.0, 0.0), (100.0, 100.0));
        let extent = MapExtent::fit(bounds, 400.0, 200.0);
        let dx = extent.x.1 - extent.x.0;
        let dy = extent.y.1 - extent.y.0;
        assert!((dx / dy - 2.0).abs() < 1e-9);
        // Centred on the data.
        assert!(((extent.x.0 + extent.x.1) / 2.0 - 50.0).abs() < 1e-9);
        assert!(((extent.y.0 + extent.y.1) / 2.0 - 50.0).abs() < 1e-9);
    }

    #[test]
    fn extent_contains_padded_bounds() {
        let bounds = Rect::new((503_000.0, 155_000.0), (562_000.0, 201_000.0));
        let extent = MapExtent::fit(bounds, 1488.0, 1109.0);
        assert!(extent.x.0 < 503_000.0 && extent.x.1 > 562_000.0);
        assert!(extent.y.0 < 155_000.0 && extent.y.1 > 201_000.0);
    }

    #[test]
    fn output_dir_is_created() {
        let dir = std::env::temp_dir()
            .join(format!("rescue_map_outdir_{}", std::process::id()))
            .join("nested")
            .join("fig");
        ensure_output_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn output_dir_under_a_file_fails() {
        let base = std::env::temp_dir().join(format!("rescue_map_blocker_{}", std::process::id()));
        std::fs::write(&base, b"not a directory").unwrap();
        let err = ensure_output_dir(&base.join("fig")).unwrap_err();
        assert!(matches!(err, RenderError::OutputDir { .. }));
    }

    #[test]
    fn three_years_render_and_animate() {
        let dir = scratch_dir("render_years").join("fig");
        let boundaries =
            BoundaryTable::from_regions(vec![raw("Camden", 50.0, 0.0), raw("Hackney", 150.0, 20.0)])
                .unwrap();
        let aggregates = DataProcessor::aggregate(&[
            incident(2019, "camden", "Cat"),
            incident(2019, "hackney", "Dog"),
            incident(2020, "camden", "Bird"),
            incident(2020, "hackney", "Cat"),
            incident(2021, "camden", "Dog"),
            incident(2021, "hackney", "Bird"),
        ]);
        let view = JoinedView::build(&aggregates, &boundaries).unwrap();
        let frames = view.frames();
        let config = RenderConfig::default();

        let paths = ChoroplethRenderer::render_frames(&frames, &config, &dir).unwrap();
        assert_eq!(paths, vec![
            frame_path(&dir, 2019),
            frame_path(&dir, 2020),
            frame_path(&dir, 2021),
        ]);
        for path in &paths {
            assert_eq!(image::open(path).unwrap().dimensions(), config.frame_size());
        }

        // Below the centroid, clear of the label and the borders.
        let first = &frames[0];
        let layout = FrameLayout::new(&config, first.bounds().unwrap());
        let camden = first
            .regions
            .iter()
            .find(|r| r.boundary.name == "camden")
            .unwrap();
        let (px, py) = pixel_at(&layout, 5.0, 2.0);
        let image = image::open(&paths[0]).unwrap().to_rgb8();
        assert_eq!(
            image.get_pixel(px, py).0,
            rgb(config.palette.color_for(camden.record.code))
        );

        let durations = frame_durations(
            paths.len(),
            Duration::from_secs_f64(config.frame_seconds),
            Duration::from_secs_f64(config.final_frame_seconds),
        );
        let gif = dir.join("final.gif");
        AnimationAssembler::assemble(&paths, &durations, &gif).unwrap();
        let decoder = GifDecoder::new(BufReader::new(File::open(&gif).unwrap())).unwrap();
        assert_eq!(decoder.into_frames().collect_frames().unwrap().len(), 3);
    }

    #[test]
    fn region_inside_a_hole_stays_visible() {
        let path = scratch_dir("render_hole").join("rescues_2019.png");
        let outer: LineString<f64> =
            vec![(0.0, 0.0), (30.0, 0.0), (30.0, 30.0), (0.0, 30.0), (0.0, 0.0)].into();
        let hole: LineString<f64> =
            vec![(10.0, 10.0), (20.0, 10.0), (20.0, 20.0), (10.0, 20.0), (10.0, 10.0)].into();
        // Sorted by name the enclosed region comes first.
        let boundaries = BoundaryTable::from_regions(vec![
            RawRegion {
                name: "zzz".to_string(),
                hectares: 800.0,
                geometry: MultiPolygon::new(vec![geo::Polygon::new(outer, vec![hole])]),
            },
            RawRegion {
                name: "aaa".to_string(),
                hectares: 36.0,
                geometry: square(12.0, 12.0, 6.0),
            },
        ])
        .unwrap();
        let aggregates = DataProcessor::aggregate(&[
            incident(2019, "aaa", "Cat"),
            incident(2019, "zzz", "Dog"),
        ]);
        let view = JoinedView::build(&aggregates, &boundaries).unwrap();
        let frame = view.frame(2019);
        assert_eq!(frame.regions[0].boundary.name, "aaa");
        let config = RenderConfig::default();

        ChoroplethRenderer::render_frame(&frame, &config, &path).unwrap();

        let layout = FrameLayout::new(&config, frame.bounds().unwrap());
        let image = image::open(&path).unwrap().to_rgb8();
        let inner = rgb(config.palette.color_for(frame.regions[0].record.code));
        let donut = rgb(config.palette.color_for(frame.regions[1].record.code));
        assert_ne!(inner, donut);

        let (px, py) = pixel_at(&layout, 15.0, 13.0);
        assert_eq!(image.get_pixel(px, py).0, inner);
        let (px, py) = pixel_at(&layout, 5.0, 5.0);
        assert_eq!(image.get_pixel(px, py).0, donut);
        let (px, py) = pixel_at(&layout, 11.0, 15.0);
        assert_eq!(image.get_pixel(px, py).0, [255, 255, 255]);
    }
}
