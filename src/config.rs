//! Configuration management for isobar.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{IsobarError, Result};

/// Command-line arguments for isobar
#[derive(Parser, Debug, Clone)]
#[command(name = "isobar")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input data (NetCDF, or a JSON grid)
    pub input: PathBuf,

    /// Where to write the PNG
    #[arg(short, long, env = "ISOBAR_OUTPUT", default_value = "isobar.png")]
    pub output: PathBuf,

    /// Plot method (pcolormesh, block, contour, contourf, quiver, barbs)
    #[arg(short, long, env = "ISOBAR_METHOD")]
    pub method: Option<String>,

    /// Named domain to map, e.g. "Europe" or "France"
    #[arg(short, long, env = "ISOBAR_DOMAIN")]
    pub domain: Option<String>,

    /// Variable to plot (defaults to the first gridded variable)
    #[arg(short = 'V', long, env = "ISOBAR_VARIABLE")]
    pub variable: Option<String>,

    /// Time step to plot
    #[arg(short, long, env = "ISOBAR_TIME_INDEX")]
    pub time_index: Option<usize>,

    /// Draw on plain axes instead of a map
    #[arg(long)]
    pub no_map: bool,

    /// Figure width in pixels
    #[arg(long, env = "ISOBAR_WIDTH")]
    pub width: Option<u32>,

    /// Figure height in pixels
    #[arg(long, env = "ISOBAR_HEIGHT")]
    pub height: Option<u32>,

    /// Resolution used to size text
    #[arg(long, env = "ISOBAR_DPI")]
    pub dpi: Option<f32>,

    /// Bundled schema name or path to a YAML schema
    #[arg(short, long, env = "ISOBAR_SCHEMA")]
    pub schema: Option<String>,

    /// TrueType font used for titles and labels
    #[arg(long, env = "ISOBAR_FONT")]
    pub font: Option<PathBuf>,

    /// Directory holding logos and geographic reference data
    #[arg(long, env = "ISOBAR_ANCILLARY_DIR")]
    pub ancillary_dir: Option<PathBuf>,

    /// Path to JSON configuration file
    #[arg(short, long, env = "ISOBAR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ISOBAR_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    /// Figure width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Figure height in pixels
    #[serde(default = "default_height")]
    pub height: u32,

    /// Resolution used to size text; 100 draws text at its schema size
    #[serde(default = "default_dpi")]
    pub dpi: f32,

    /// Font for text; system fonts are searched when unset
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

/// Data selection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    /// Resampling method used when drawing rasters
    #[serde(default = "default_interpolation")]
    pub interpolation_method: String,

    /// Variable to plot
    #[serde(default)]
    pub variable: Option<String>,

    /// Time step to plot
    #[serde(default)]
    pub time_index: usize,
}

/// Styling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StyleConfig {
    /// Schema name or path
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Default plot method
    #[serde(default = "default_method")]
    pub method: String,

    /// Default domain
    #[serde(default)]
    pub domain: Option<String>,
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PathsConfig {
    /// Directory holding logos and geographic reference data
    #[serde(default)]
    pub ancillary_dir: Option<PathBuf>,
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Rendering configuration
    #[serde(default)]
    pub render: RenderConfig,

    /// Data configuration
    #[serde(default)]
    pub data: DataConfig,

    /// Style configuration
    #[serde(default)]
    pub style: StyleConfig,

    /// Paths configuration
    #[serde(default)]
    pub paths: PathsConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, Args)> {
        let args = Args::parse();
        let config = Self::from_args(&args)?;
        Ok((config, args))
    }

    /// Build the configuration for already-parsed arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        if let Some(width) = args.width {
            config.render.width = width;
        }
        if let Some(height) = args.height {
            config.render.height = height;
        }
        if let Some(dpi) = args.dpi {
            config.render.dpi = dpi;
        }
        if args.font.is_some() {
            config.render.font_path = args.font.clone();
        }
        if args.variable.is_some() {
            config.data.variable = args.variable.clone();
        }
        if let Some(time_index) = args.time_index {
            config.data.time_index = time_index;
        }
        if let Some(schema) = &args.schema {
            config.style.schema = schema.clone();
        }
        if let Some(method) = &args.method {
            config.style.method = method.clone();
        }
        if args.domain.is_some() {
            config.style.domain = args.domain.clone();
        }
        if args.ancillary_dir.is_some() {
            config.paths.ancillary_dir = args.ancillary_dir.clone();
        }
        config.log_level = args.log_level.clone();

        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        self.render.width = other.render.width;
        self.render.height = other.render.height;
        self.render.dpi = other.render.dpi;
        if other.render.font_path.is_some() {
            self.render.font_path = other.render.font_path;
        }
        self.data = other.data;
        self.style.schema = other.style.schema;
        self.style.method = other.style.method;
        if other.style.domain.is_some() {
            self.style.domain = other.style.domain;
        }
        if other.paths.ancillary_dir.is_some() {
            self.paths.ancillary_dir = other.paths.ancillary_dir;
        }
        self.log_level = other.log_level;
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.render.width < 16 || self.render.height < 16 {
            return Err(IsobarError::Config {
                message: format!(
                    "Figure size {}x{} is too small; both sides must be at least 16 pixels",
                    self.render.width, self.render.height
                ),
            });
        }

        if self.render.width > 16384 || self.render.height > 16384 {
            return Err(IsobarError::Config {
                message: "Figure sides cannot exceed 16384 pixels".to_string(),
            });
        }

        if !(10.0..=1200.0).contains(&self.render.dpi) {
            return Err(IsobarError::Config {
                message: format!("Invalid dpi: {}. Must be between 10 and 1200", self.render.dpi),
            });
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(IsobarError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        match self.data.interpolation_method.as_str() {
            "nearest" | "bilinear" | "bicubic" => {}
            _ => {
                return Err(IsobarError::Config {
                    message: format!(
                        "Invalid interpolation method: {}. Must be one of: nearest, bilinear, bicubic",
                        self.data.interpolation_method
                    ),
                });
            }
        }

        if self.style.method.parse::<crate::quickplot::PlotMethod>().is_err() {
            return Err(IsobarError::Config {
                message: format!("Invalid plot method: {}", self.style.method),
            });
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            data: DataConfig::default(),
            style: StyleConfig::default(),
            paths: PathsConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            dpi: default_dpi(),
            font_path: None,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            interpolation_method: default_interpolation(),
            variable: None,
            time_index: 0,
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            method: default_method(),
            domain: None,
        }
    }
}

// Default value functions for serde
fn default_width() -> u32 {
    1000
}

fn default_height() -> u32 {
    700
}

fn default_dpi() -> f32 {
    100.0
}

fn default_interpolation() -> String {
    "bilinear".to_string()
}

fn default_schema() -> String {
    "default".to_string()
}

fn default_method() -> String {
    "pcolormesh".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["isobar", "input.nc"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.render.width, 1000);
        assert_eq!(config.render.height, 700);
        assert_eq!(config.data.interpolation_method, "bilinear");
        assert_eq!(config.style.schema, "default");
        assert_eq!(config.style.method, "pcolormesh");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_config_merge() {
        let mut config1 = Config::default();
        let mut config2 = Config::default();

        config2.render.width = 640;
        config2.style.domain = Some("Europe".to_string());

        config1.merge(config2);

        assert_eq!(config1.render.width, 640);
        assert_eq!(config1.style.domain.as_deref(), Some("Europe"));
    }

    #[test]
    fn test_merge_keeps_unset_options() {
        let mut config = Config::default();
        config.style.domain = Some("France".to_string());
        config.merge(Config::default());
        assert_eq!(config.style.domain.as_deref(), Some("France"));
    }

    #[test]
    fn test_args_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("isobar.json");
        std::fs::write(
            &path,
            r#"{"render": {"width": 500, "height": 400}, "style": {"method": "contour"}}"#,
        )
        .unwrap();

        let path_str = path.to_str().unwrap();
        let config = Config::from_args(&args(&["--config", path_str, "--width", "800", "--dpi", "150"])).unwrap();
        assert_eq!(config.render.width, 800);
        assert_eq!(config.render.dpi, 150.0);
        assert_eq!(config.render.height, 400);
        assert_eq!(config.style.method, "contour");
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.render.width = 4;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.render.dpi = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.data.interpolation_method = "invalid".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.style.method = "hexbin".to_string();
        assert!(config.validate().is_err());
    }
}
