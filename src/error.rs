//! Error types for isobar.
//!
//! Every fallible operation in the crate returns [`Result`]. Most variants carry
//! a human-readable message; foreign errors convert through `#[from]`.

use thiserror::Error;

/// The main error type for isobar operations.
#[derive(Error, Debug)]
pub enum IsobarError {
    /// NetCDF file operation errors
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid parameter errors
    #[error("Invalid parameter: {param} - {message}")]
    InvalidParameter { param: String, message: String },

    /// A referenced ancillary resource (logo, domain table, coastline file)
    /// could not be found
    #[error("Data not found: {message}")]
    DataNotFound { message: String },

    /// A named schema could not be found
    #[error("Schema not found: {message}")]
    SchemaNotFound { message: String },

    /// Problems with the shape or content of input data
    #[error("Data error: {message}")]
    Data { message: String },

    /// Coordinate reference system errors
    #[error("Projection error: {message}")]
    Projection { message: String },

    /// Subplot grid errors
    #[error("Layout error: {message}")]
    Layout { message: String },

    /// Interpolation errors
    #[error("Interpolation error: {message}")]
    Interpolation { message: String },

    /// Drawing errors
    #[error("Render error: {message}")]
    Render { message: String },

    /// Image encoding errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl IsobarError {
    /// Shorthand for an [`IsobarError::InvalidParameter`].
    pub fn invalid(param: &str, message: impl Into<String>) -> Self {
        IsobarError::InvalidParameter {
            param: param.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error signals a missing ancillary resource.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            IsobarError::DataNotFound { .. } | IsobarError::SchemaNotFound { .. }
        )
    }
}

/// Convenience type alias for Results with IsobarError
pub type Result<T> = std::result::Result<T, IsobarError>;
