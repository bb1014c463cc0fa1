//! Data objects that can be plotted.

pub mod field;
pub mod loader;
pub mod series;
pub mod vectors;

pub use field::{AttributeValue, GriddedField, MetadataValue};
pub use loader::{field_from_fn, load_field, load_json_grid, load_vector_field, parse_json_grid, parse_json_grids};
pub use series::TimeSeries;
pub use vectors::VectorField;
