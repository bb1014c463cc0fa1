//! Figure composition.
//!
//! A [`Figure`] owns a grid of [`Subplot`]s; each subplot holds the
//! [`Layer`]s plotted on it and the decorations added by finishing steps
//! (legend, coastlines, gridlines, title). [`Animation`] strings figures
//! together, one per time step.

pub mod animation;
pub mod figure;
pub mod formatter;
pub mod layers;
pub mod layouts;
pub mod subplot;

pub use animation::Animation;
pub use figure::Figure;
pub use formatter::{format_latitude, format_longitude, format_string, FormatContext};
pub use layers::{Layer, LayerGroup, LayerKind, LayerOptions, Points, Source};
pub use layouts::{rows_cols, MAX_COLUMNS};
pub use subplot::{Subplot, SubplotKind};
