//! Interactive charts as plotly figure JSON.

pub mod charts;

pub use charts::Chart;
