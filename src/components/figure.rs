//! Figures: a grid of subplots with a title, attributions and logos.

use image::RgbaImage;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::layouts::{rows_cols, MAX_COLUMNS};
use super::subplot::Subplot;
use crate::error::{IsobarError, Result};
use crate::geo::Domain;
use crate::logging::log_render_stats;
use crate::render::{Canvas, HAlign, PixelRect, VAlign};
use crate::styles::parse_color;
use crate::{ancillary, schema};

/// A logo, resolved to an image file when it is added.
#[derive(Debug, Clone, PartialEq)]
struct Logo {
    name: String,
    path: PathBuf,
}

/// The top-level drawing: owns its subplots.
#[derive(Debug, Clone, Default)]
pub struct Figure {
    rows: Option<usize>,
    columns: Option<usize>,
    size: Option<(u32, u32)>,
    dpi: Option<f32>,
    subplots: Vec<Subplot>,
    title: Option<String>,
    attributions: Vec<String>,
    logos: Vec<Logo>,
}

impl Figure {
    /// A figure with a fixed grid. `None` leaves a dimension to be derived
    /// from the number of subplots.
    pub fn new(rows: Option<usize>, columns: Option<usize>) -> Self {
        Self {
            rows,
            columns,
            ..Self::default()
        }
    }

    /// Set the size in pixels; otherwise the schema's figure size is used.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    /// Text is laid out for 100 dpi; other resolutions scale it.
    pub fn with_dpi(mut self, dpi: f32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    pub fn size(&self) -> (u32, u32) {
        self.size.unwrap_or_else(|| {
            schema::with_schema(|s| {
                (
                    s.get_u32("figure.width").unwrap_or(1000),
                    s.get_u32("figure.height").unwrap_or(700),
                )
            })
        })
    }

    /// The grid shape for the current subplots.
    pub fn shape(&self) -> Result<(usize, usize)> {
        rows_cols(self.subplots.len(), self.rows, self.columns, MAX_COLUMNS)
    }

    /// Add a Cartesian subplot in the next free cell.
    pub fn add_subplot(&mut self) -> Result<&mut Subplot> {
        self.push_subplot(Subplot::new())
    }

    /// Add a map of `domain`; `None` maps whatever data are plotted.
    pub fn add_map(&mut self, domain: Option<Domain>) -> Result<&mut Subplot> {
        self.push_subplot(Subplot::map(domain))
    }

    /// Add a prepared subplot.
    pub fn push_subplot(&mut self, subplot: Subplot) -> Result<&mut Subplot> {
        rows_cols(self.subplots.len() + 1, self.rows, self.columns, MAX_COLUMNS)?;
        self.subplots.push(subplot);
        let index = self.subplots.len() - 1;
        debug!(index, "Added subplot");
        Ok(&mut self.subplots[index])
    }

    pub fn subplots(&self) -> &[Subplot] {
        &self.subplots
    }

    pub fn subplot_mut(&mut self, index: usize) -> Option<&mut Subplot> {
        self.subplots.get_mut(index)
    }

    /// Set the figure title. Templates are filled from the first subplot.
    pub fn title(&mut self, template: &str) -> &mut Self {
        let title = match self.subplots.first() {
            Some(subplot) => subplot.format_string(template),
            None => template.to_string(),
        };
        self.title = Some(title);
        self
    }

    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Credit a data source in the footer. Repeats are ignored.
    pub fn add_attribution(&mut self, attribution: impl Into<String>) -> &mut Self {
        let attribution = attribution.into();
        if !self.attributions.contains(&attribution) {
            self.attributions.push(attribution);
        }
        self
    }

    pub fn attributions(&self) -> &[String] {
        &self.attributions
    }

    /// Add a bundled logo by name, or any image by path. A logo that
    /// resolves to an image already added is ignored, whatever its case;
    /// unknown logos are a [`IsobarError::DataNotFound`].
    pub fn add_logo(&mut self, name: &str) -> Result<&mut Self> {
        let path = ancillary::find_logo(name)?;
        if !self.logos.iter().any(|logo| logo.path == path) {
            self.logos.push(Logo {
                name: name.to_string(),
                path,
            });
        }
        Ok(self)
    }

    pub fn logos(&self) -> Vec<&str> {
        self.logos.iter().map(|logo| logo.name.as_str()).collect()
    }

    /// Draw the figure.
    pub fn render(&self) -> Result<RgbaImage> {
        let (width, height) = self.size();
        let mut canvas = Canvas::new(width, height)?;
        if let Some(dpi) = self.dpi {
            canvas.set_text_scale(dpi / 100.0);
        }
        let (background, text_color, title_size, margin) = schema::with_schema(|s| {
            (
                s.get_str("figure.background")
                    .and_then(|c| parse_color(&c).ok())
                    .unwrap_or([255, 255, 255, 255]),
                s.get_str("figure.text_color")
                    .and_then(|c| parse_color(&c).ok())
                    .unwrap_or([26, 26, 26, 255]),
                s.get_f32("figure.title_size").unwrap_or(24.0),
                s.get_f32("figure.margin").unwrap_or(14.0),
            )
        });
        canvas.fill(background);

        let mut area = canvas.bounds().inset(margin, margin, margin, margin);
        if let Some(title) = &self.title {
            let (cx, _) = area.center();
            canvas.text(title.clone(), cx, area.y, title_size, text_color, HAlign::Center, VAlign::Top);
            area = area.inset(0.0, title_size * 1.5, 0.0, 0.0);
        }
        let footer = self.footer_height(height);
        if footer > 0.0 {
            let strip = PixelRect::new(area.x, area.bottom() - footer, area.width, footer);
            self.draw_footer(&mut canvas, strip)?;
            area = area.inset(0.0, 0.0, 0.0, footer);
        }

        let (rows, columns) = self.shape()?;
        if !self.subplots.is_empty() {
            let cell_width = area.width / columns as f32;
            let cell_height = area.height / rows as f32;
            for (i, subplot) in self.subplots.iter().enumerate() {
                let (row, column) = (i / columns, i % columns);
                let cell = PixelRect::new(
                    area.x + column as f32 * cell_width,
                    area.y + row as f32 * cell_height,
                    cell_width,
                    cell_height,
                );
                subplot.render(&mut canvas, cell)?;
            }
        }

        let layers = self.subplots.iter().map(|s| s.layers().len()).sum();
        log_render_stats(width, height, self.subplots.len(), layers);
        Ok(canvas.finish())
    }

    fn footer_height(&self, height: u32) -> f32 {
        let (text_size, logo_fraction) = schema::with_schema(|s| {
            (
                s.get_f32("attribution.size").unwrap_or(13.0),
                s.get_f32("logo.height_fraction").unwrap_or(0.05),
            )
        });
        let text = if self.attributions.is_empty() { 0.0 } else { text_size * 1.6 };
        let logos = if self.logos.is_empty() { 0.0 } else { height as f32 * logo_fraction * 1.2 };
        text.max(logos)
    }

    /// Attributions on the left, logos packed from the right.
    fn draw_footer(&self, canvas: &mut Canvas, strip: PixelRect) -> Result<()> {
        let (text_size, text_color, width_fraction, spacing_fraction) = schema::with_schema(|s| {
            (
                s.get_f32("attribution.size").unwrap_or(13.0),
                s.get_str("attribution.color")
                    .and_then(|c| parse_color(&c).ok())
                    .unwrap_or([128, 128, 128, 255]),
                s.get_f32("logo.width_fraction").unwrap_or(0.12),
                s.get_f32("logo.spacing_fraction").unwrap_or(0.01),
            )
        });

        if !self.attributions.is_empty() {
            let (_, cy) = strip.center();
            canvas.text(
                self.attributions.join("; "),
                strip.x,
                cy,
                text_size,
                text_color,
                HAlign::Left,
                VAlign::Middle,
            );
        }

        let width = canvas.width() as f32;
        let spacing = width * spacing_fraction;
        let max_width = width * width_fraction;
        let mut right = strip.right();
        for logo in self.logos.iter().rev() {
            let image = image::open(&logo.path)?.to_rgba8();
            let aspect = image.width() as f32 / image.height().max(1) as f32;
            let mut logo_height = strip.height * 0.85;
            let mut logo_width = logo_height * aspect;
            if logo_width > max_width {
                logo_width = max_width;
                logo_height = logo_width / aspect;
            }
            let rect = PixelRect::new(
                right - logo_width,
                strip.y + (strip.height - logo_height) / 2.0,
                logo_width,
                logo_height,
            );
            canvas.draw_image(&image, rect, true)?;
            right -= logo_width + spacing;
        }
        Ok(())
    }

    /// Render and encode as PNG.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let image = self.render()?;
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, image::ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }

    /// Render and write to `path`; the format follows the extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.extension().is_none() {
            return Err(IsobarError::invalid(
                "path",
                format!("{} has no extension to choose an image format", path.display()),
            ));
        }
        self.render()?.save(path)?;
        info!(path = %path.display(), "Saved figure");
        Ok(())
    }
}
