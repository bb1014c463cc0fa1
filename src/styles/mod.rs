//! Colour scales, levels and units.

pub mod colormap;
pub mod levels;
pub mod style;
pub mod units;

pub use colormap::{from_colors, get_colormap, lerp_color, parse_color, Colormap, GradientColormap, ListedColormap};
pub use levels::{auto_range, categorical_range, step_range, Levels};
pub use style::{bin_index, format_tick, legend_ticks, ColorSpec, Style, TRANSPARENT};
