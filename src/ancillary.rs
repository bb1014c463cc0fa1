//! Ancillary resources: bundled reference tables and logo images.
//!
//! Reference tables are embedded in the binary. Logos and coastline files live
//! on disk under the ancillary directory, which defaults to the crate's
//! `resources/` folder and can be redirected with [`set_ancillary_dir`] or the
//! `ISOBAR_ANCILLARY_DIR` environment variable.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{IsobarError, Result};

const DOMAINS_YAML: &str = include_str!("../resources/geo/domains.yaml");

/// Embedded reference tables, by name.
const TABLES: &[(&str, &str)] = &[("geo/domains", DOMAINS_YAML)];

/// Logos that ship with isobar.
const LOGOS: &[(&str, &str)] = &[("ecmwf", "ecmwf.png"), ("c3s", "c3s.png")];

static ANCILLARY_DIR: Lazy<RwLock<Option<PathBuf>>> = Lazy::new(|| RwLock::new(None));

static DOMAIN_TABLE: Lazy<Result<Value>> = Lazy::new(|| parse_table("geo/domains", DOMAINS_YAML));

/// Override the ancillary directory for the rest of the process.
pub fn set_ancillary_dir(path: Option<PathBuf>) {
    *ANCILLARY_DIR.write() = path;
}

/// The directory holding logos and geographic reference files.
pub fn ancillary_dir() -> PathBuf {
    if let Some(dir) = ANCILLARY_DIR.read().clone() {
        return dir;
    }
    if let Ok(dir) = std::env::var("ISOBAR_ANCILLARY_DIR") {
        return PathBuf::from(dir);
    }
    Path::new(env!("CARGO_MANIFEST_DIR")).join("resources")
}

/// Load an embedded reference table, e.g. `"geo/domains"`.
pub fn load(name: &str) -> Result<Value> {
    if name == "geo/domains" || name == "domains" {
        return domain_table().cloned();
    }
    let (table_name, text) = TABLES
        .iter()
        .find(|(table_name, _)| *table_name == name)
        .ok_or_else(|| IsobarError::DataNotFound {
            message: format!("no ancillary table named '{}'", name),
        })?;
    parse_table(table_name, text)
}

/// The parsed domain table, shared for the life of the process.
pub fn domain_table() -> Result<&'static Value> {
    DOMAIN_TABLE.as_ref().map_err(|e| IsobarError::Config {
        message: format!("bundled domain table is invalid: {}", e),
    })
}

fn parse_table(name: &str, text: &str) -> Result<Value> {
    debug!(table = name, "Parsing ancillary table");
    Ok(serde_yaml::from_str(text)?)
}

/// Find a logo image.
///
/// An existing file path is returned unchanged; otherwise the name must be one
/// of the bundled logos.
pub fn find_logo(name: &str) -> Result<PathBuf> {
    let as_path = Path::new(name);
    if as_path.is_file() {
        return Ok(as_path.to_path_buf());
    }

    let key = name.to_lowercase();
    LOGOS
        .iter()
        .find(|(logo, _)| *logo == key)
        .map(|(_, file)| ancillary_dir().join("logos").join(file))
        .ok_or_else(|| IsobarError::DataNotFound {
            message: format!(
                "no logo named '{}'; available logos are {}",
                name,
                crate::utils::list_to_human(&LOGOS.iter().map(|(n, _)| *n).collect::<Vec<_>>())
            ),
        })
}

/// Path of the default coastline GeoJSON file.
pub fn coastlines_path() -> PathBuf {
    ancillary_dir().join("geo").join("coastlines.geojson")
}
