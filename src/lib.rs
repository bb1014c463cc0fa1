//! # isobar
//!
//! Quick, labelled maps and charts of gridded weather and climate data.
//!
//! isobar turns gridded fields and time series into finished figures: maps
//! with coastlines, gridlines and a colorbar, contour plots, warming stripes,
//! simple animations and interactive plotly charts. Styling comes from a
//! process-wide [`schema`] of named defaults, so one-call plots look
//! consistent without any options.
//!
//! ## Key Features
//!
//! - **One-call plots**: [`quickmap`] and [`quickplot`] build a figure, plot
//!   the data and apply the schema's finishing steps
//! - **Named domains**: "France", "Europe" or any bounding box, drawn in a
//!   projection suited to its size and latitude
//! - **Composable figures**: a [`Figure`] owns a grid of subplots, each with
//!   its own layers, legend and title templates
//! - **Wind**: quiver arrows and barbs drawn from u/v component pairs
//! - **Raster output**: PNG and GIF through `tiny-skia` and `image`
//!
//! ## Architecture
//!
//! - **Sources**: [`sources::GriddedField`], [`sources::VectorField`] and
//!   [`sources::TimeSeries`], built in memory or loaded from JSON grids and
//!   NetCDF (feature `netcdf`)
//! - **Styles and geography**: colour levels, unit conversion, projections
//!   and domain lookup
//! - **Components**: figures, subplots and layers, drawn by [`render`]

pub mod ancillary;
pub mod components;
pub mod config;
pub mod error;
pub mod geo;
pub mod identifiers;
pub mod interactive;
pub mod interpolation;
pub mod logging;
pub mod quickmap;
pub mod quickplot;
pub mod render;
pub mod schema;
pub mod sources;
pub mod styles;
pub mod temporal;
pub mod utils;

pub use components::{Animation, Figure, Subplot};
pub use config::Config;
pub use error::{IsobarError, Result};
pub use geo::{Crs, Domain};
pub use interactive::Chart;
pub use logging::{init_tracing, log_error, log_operation_end, log_operation_start, log_timed_operation};
pub use quickmap::{quickmap, quickmap_vectors};
pub use quickplot::{quickplot, quickplot_series, stripes, PlotMethod};
pub use sources::{GriddedField, TimeSeries, VectorField};
pub use styles::Style;
pub use temporal::{Stripes, TimeSeriesPlot};
