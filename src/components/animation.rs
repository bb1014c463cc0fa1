//! Animations: one map per time step, saved as a looping GIF.

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use serde_json::json;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::figure::Figure;
use super::layers::Source;
use crate::error::{IsobarError, Result};
use crate::geo::Domain;
use crate::logging::log_timed_operation;
use crate::quickplot::PlotMethod;
use crate::schema;
use crate::sources::GriddedField;
use crate::styles::{Levels, Style};

/// A sequence of figures that share one colour scale.
#[derive(Debug, Clone, Default)]
pub struct Animation {
    frames: Vec<Figure>,
}

impl Animation {
    pub fn new(frames: Vec<Figure>) -> Self {
        Self { frames }
    }

    /// One map per time step of `field`.
    ///
    /// Levels are fixed from the range of every step so colours mean the
    /// same thing in every frame; each frame gets the schema's finishing
    /// steps and its own title.
    pub fn from_field(field: &GriddedField, method: PlotMethod, domain: Option<Domain>) -> Result<Self> {
        let kind = method.kind();
        if !kind.is_gridded() {
            return Err(IsobarError::invalid(
                "method",
                format!("{} cannot animate a gridded field", method),
            ));
        }

        let style = Style::auto(field);
        let levels = style.levels(field.all_values().iter().map(|v| *v as f64))?;
        let style = style.with_levels(Levels::Explicit(levels));
        let workflow = schema::with_schema(|s| s.workflow("quickmap_workflow"));

        let mut frames = Vec::with_capacity(field.n_steps());
        for index in 0..field.n_steps() {
            let step = field.select_step(index)?;
            let mut figure = Figure::default();
            let subplot = figure.add_map(domain.clone())?;
            subplot.add_styled(kind, Source::Field(step), Some(style.clone()), &json!({}))?;
            for name in &workflow {
                subplot.try_finishing(name);
            }
            debug!(frame = index, title = ?subplot.title_text(), "Built animation frame");
            frames.push(figure);
        }
        Ok(Self { frames })
    }

    pub fn frames(&self) -> &[Figure] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [Figure] {
        &mut self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn render_frames(&self) -> Result<Vec<RgbaImage>> {
        self.frames.iter().map(Figure::render).collect()
    }

    /// Write a looping GIF. Without a delay the schema's
    /// `animation.frame_delay_ms` is used.
    pub fn save_gif(&self, path: impl AsRef<Path>, frame_delay_ms: Option<u32>) -> Result<()> {
        if self.frames.is_empty() {
            return Err(IsobarError::invalid("animation", "there are no frames to save"));
        }
        let delay = frame_delay_ms
            .or_else(|| schema::with_schema(|s| s.get_u32("animation.frame_delay_ms")))
            .unwrap_or(500);

        let path = path.as_ref();
        let mut encoder = GifEncoder::new(BufWriter::new(File::create(path)?));
        encoder.set_repeat(Repeat::Infinite)?;
        let images = log_timed_operation("render_frames", || self.render_frames())?;
        for image in images {
            encoder.encode_frame(Frame::from_parts(image, 0, 0, Delay::from_numer_denom_ms(delay, 1)))?;
        }
        info!(path = %path.display(), frames = self.frames.len(), delay_ms = delay, "Saved animation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::Array3;

    fn field() -> GriddedField {
        let values = Array3::from_shape_fn((3, 3, 4), |(t, j, i)| (t * 10 + j + i) as f32);
        let times = (0..3)
            .map(|h| {
                NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_opt(h * 6, 0, 0)
                    .unwrap()
            })
            .collect();
        GriddedField::from_steps("t", vec![20.0, 10.0, 0.0], vec![0.0, 10.0, 20.0, 30.0], values)
            .unwrap()
            .with_times(times)
            .unwrap()
    }

    #[test]
    fn test_frames_share_levels() {
        let animation = Animation::from_field(&field(), PlotMethod::Pcolormesh, None).unwrap();
        assert_eq!(animation.len(), 3);
        let levels: Vec<Vec<f64>> = animation
            .frames()
            .iter()
            .map(|f| f.subplots()[0].layers()[0].levels().to_vec())
            .collect();
        assert_eq!(levels[0], levels[2]);
        assert!(*levels[0].last().unwrap() >= 25.0);
    }

    #[test]
    fn test_frame_titles_follow_time() {
        let animation = Animation::from_field(&field(), PlotMethod::Contourf, None).unwrap();
        let titles: Vec<&str> = animation
            .frames()
            .iter()
            .filter_map(|f| f.subplots()[0].title_text())
            .collect();
        assert_eq!(titles.len(), 3);
        assert!(titles[0].contains("00:00 on 2024-01-01"));
        assert!(titles[1].contains("06:00"));
    }

    #[test]
    fn test_line_cannot_animate() {
        assert!(Animation::from_field(&field(), PlotMethod::Line, None).is_err());
    }

    #[test]
    fn test_save_gif() {
        let mut animation = Animation::from_field(&field(), PlotMethod::Block, None).unwrap();
        for frame in animation.frames_mut() {
            *frame = std::mem::take(frame).with_size(320, 240);
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steps.gif");
        animation.save_gif(&path, Some(100)).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], b"GIF");
    }
}
