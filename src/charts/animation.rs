//! GIF Animation Module
//! Stitches the per-year frames into one looping GIF.

use super::renderer::RenderError;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// NeuQuant sampling step; 1 is slowest, 30 fastest.
pub const GIF_SPEED: i32 = 10;

/// On-screen time per frame: `frame` everywhere except the last, which
/// holds for `last`. Always exactly `count` entries.
pub fn frame_durations(count: usize, frame: Duration, last: Duration) -> Vec<Duration> {
    let mut durations = vec![frame; count];
    if let Some(tail) = durations.last_mut() {
        *tail = last;
    }
    durations
}

/// Reads rendered frames back and encodes them as an animation.
pub struct AnimationAssembler;

impl AnimationAssembler {
    /// Encode `frames` (in order) into a looping GIF at `out`.
    pub fn assemble(
        frames: &[PathBuf],
        durations: &[Duration],
        out: &Path,
    ) -> Result<(), RenderError> {
        if frames.is_empty() {
            return Err(RenderError::NoFrames);
        }
        if frames.len() != durations.len() {
            return Err(RenderError::DurationMismatch {
                frames: frames.len(),
                durations: durations.len(),
            });
        }

        let file = File::create(out).map_err(|source| RenderError::AnimationIo {
            path: out.to_path_buf(),
            source,
        })?;
        let mut encoder = GifEncoder::new_with_speed(BufWriter::new(file), GIF_SPEED);
        encoder.set_repeat(Repeat::Infinite)?;

        for (path, duration) in frames.iter().zip(durations) {
            let buffer = image::open(path)?.to_rgba8();
            let delay = Delay::from_saturating_duration(*duration);
            encoder.encode_frame(Frame::from_parts(buffer, 0, 0, delay))?;
            tracing::debug!(frame = %path.display(), ?duration, "encoded frame");
        }

        tracing::info!(
            frames = frames.len(),
            path = %out.display(),
            "wrote animation"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::gif::GifDecoder;
    use image::{AnimationDecoder, Rgba, RgbaImage};
    use std::io::BufReader;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rescue_map_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_frames(dir: &Path, years: &[i64]) -> Vec<PathBuf> {
        years
            .iter()
            .enumerate()
            .map(|(i, year)| {
                let path = crate::charts::renderer::frame_path(dir, *year);
                let shade = (i * 80) as u8;
                RgbaImage::from_pixel(8, 6, Rgba([shade, 100, 200, 255]))
                    .save(&path)
                    .unwrap();
                path
            })
            .collect()
    }

    fn ms(delay: Delay) -> f64 {
        let (numer, denom) = delay.numer_denom_ms();
        f64::from(numer) / f64::from(denom)
    }

    #[test]
    fn durations_hold_the_last_frame() {
        let durations =
            frame_durations(3, Duration::from_millis(500), Duration::from_millis(2000));
        assert_eq!(durations.len(), 3);
        assert!(durations[..2].iter().all(|d| *d < durations[2]));
    }

    #[test]
    fn durations_follow_frame_count() {
        for count in [1, 13, 14] {
            let durations =
                frame_durations(count, Duration::from_millis(500), Duration::from_secs(2));
            assert_eq!(durations.len(), count);
            assert_eq!(durations[count - 1], Duration::from_secs(2));
        }
        assert!(frame_durations(0, Duration::ZERO, Duration::ZERO).is_empty());
    }

    #[test]
    fn three_years_make_three_frame_animation() {
        let dir = scratch_dir("animation");
        let frames = write_frames(&dir, &[2019, 2020, 2021]);
        let durations =
            frame_durations(frames.len(), Duration::from_millis(500), Duration::from_secs(2));
        let out = dir.join("final.gif");

        AnimationAssembler::assemble(&frames, &durations, &out).unwrap();

        let decoder = GifDecoder::new(BufReader::new(File::open(&out).unwrap())).unwrap();
        let decoded = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(decoded.len(), 3);

        let delays: Vec<f64> = decoded.iter().map(|f| ms(f.delay())).collect();
        assert_eq!(delays.len(), 3);
        assert!((delays[0] - 500.0).abs() < 1e-6);
        assert!(delays[..2].iter().all(|d| *d < delays[2]));
    }

    #[test]
    fn mismatched_durations_are_rejected() {
        let dir = scratch_dir("animation_mismatch");
        let frames = write_frames(&dir, &[2019, 2020]);
        let err = AnimationAssembler::assemble(
            &frames,
            &[Duration::from_millis(500)],
            &dir.join("final.gif"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RenderError::DurationMismatch {
                frames: 2,
                durations: 1
            }
        ));
    }

    #[test]
    fn no_frames_is_an_error() {
        let dir = scratch_dir("animation_empty");
        let err = AnimationAssembler::assemble(&[], &[], &dir.join("final.gif")).unwrap_err();
        assert!(matches!(err, RenderError::NoFrames));
    }
}
