//! Font discovery for figure text.
//!
//! No font is bundled. The first readable font among the configured path,
//! `ISOBAR_FONT`, the schema's `font` entry and a list of common system
//! fonts is loaded once and shared. Without one, text is skipped.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rusttype::{point, Font, Scale};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::schema;

/// Environment variable naming a TrueType font file.
pub const FONT_ENV: &str = "ISOBAR_FONT";

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

struct FontState {
    configured: Option<PathBuf>,
    loaded: Option<Option<Font<'static>>>,
}

static FONT: Lazy<Mutex<FontState>> = Lazy::new(|| {
    Mutex::new(FontState {
        configured: None,
        loaded: None,
    })
});

/// Use this font file ahead of any discovered one. `None` restores
/// discovery.
pub fn set_font_path(path: Option<PathBuf>) {
    let mut state = FONT.lock();
    state.configured = path;
    state.loaded = None;
}

/// The shared figure font, if one could be found.
pub fn font() -> Option<Font<'static>> {
    let mut state = FONT.lock();
    if state.loaded.is_none() {
        let discovered = discover(state.configured.as_deref());
        state.loaded = Some(discovered);
    }
    state.loaded.clone().flatten()
}

fn candidates(configured: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(path) = configured {
        paths.push(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(FONT_ENV) {
        paths.push(PathBuf::from(path));
    }
    if let Some(path) = schema::with_schema(|s| s.get_str("font")) {
        paths.push(PathBuf::from(path));
    }
    paths.extend(SYSTEM_FONTS.iter().map(PathBuf::from));
    paths
}

fn discover(configured: Option<&Path>) -> Option<Font<'static>> {
    for path in candidates(configured) {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        match Font::try_from_vec(bytes) {
            Some(font) => {
                info!(path = %path.display(), "Loaded figure font");
                return Some(font);
            }
            None => debug!(path = %path.display(), "Not a usable font"),
        }
    }
    debug!("No font found; figure text will be skipped");
    None
}

/// Pixel width and height of `text` at `size`. Falls back to an estimate
/// when no font is available.
pub fn measure(font: Option<&Font<'static>>, text: &str, size: f32) -> (f32, f32) {
    match font {
        Some(font) => {
            let scale = Scale::uniform(size);
            let metrics = font.v_metrics(scale);
            let width = font
                .layout(text, scale, point(0.0, metrics.ascent))
                .map(|glyph| glyph.position().x + glyph.unpositioned().h_metrics().advance_width)
                .fold(0.0f32, f32::max);
            (width, metrics.ascent - metrics.descent)
        }
        None => (text.chars().count() as f32 * size * 0.6, size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimated_measure() {
        let (width, height) = measure(None, "abcd", 10.0);
        assert_eq!(width, 24.0);
        assert_eq!(height, 10.0);
        assert_eq!(measure(None, "", 10.0).0, 0.0);
    }

    #[test]
    fn test_configured_path_comes_first() {
        let configured = PathBuf::from("/tmp/custom.ttf");
        let paths = candidates(Some(&configured));
        assert_eq!(paths[0], configured);
        assert!(paths.len() > SYSTEM_FONTS.len());
    }
}
