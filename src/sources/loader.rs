//! Loading fields from files.
//!
//! JSON grids are always supported. NetCDF files need the `netcdf` feature;
//! coordinates are recognised through [`crate::identifiers`] and CF time
//! units are decoded into datetimes.

use ndarray::{Array2, Array3};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use super::field::{AttributeValue, GriddedField};
use super::vectors::VectorField;
use crate::error::{IsobarError, Result};
use crate::identifiers;
use crate::utils::to_datetimes;

/// The lowercased extension of an existing input file.
fn input_extension(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(IsobarError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "json" | "nc" | "nc4" | "netcdf" | "cdf" => Ok(extension),
        other => Err(IsobarError::invalid(
            "input",
            format!("unsupported file type '{}'; expected .json or .nc", other),
        )),
    }
}

/// Load a field from `path`, choosing the reader by extension.
///
/// `variable` picks the variable in multi-variable files; `time_index`
/// selects a single step (all steps are kept when `None`).
pub fn load_field(path: &Path, variable: Option<&str>, time_index: Option<usize>) -> Result<GriddedField> {
    let field = match input_extension(path)?.as_str() {
        "json" => {
            let text = std::fs::read_to_string(path)?;
            pick_field(parse_json_grids(&text)?, variable)?
        }
        _ => load_netcdf_field(path, variable)?,
    };

    info!(
        path = %path.display(),
        variable = field.name(),
        steps = field.n_steps(),
        grid = ?field.grid_shape(),
        "Loaded field"
    );

    match time_index {
        Some(index) => field.select_step(index),
        None => Ok(field),
    }
}

/// The on-disk layout of a JSON grid.
#[derive(Debug, Deserialize)]
struct GridFile {
    name: String,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    units: Option<String>,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    values: GridValues,
    #[serde(default)]
    times: Vec<String>,
    #[serde(default)]
    base_time: Option<String>,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GridFiles {
    One(Box<GridFile>),
    Many(Vec<GridFile>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GridValues {
    Single(Vec<Vec<Option<f32>>>),
    Steps(Vec<Vec<Vec<Option<f32>>>>),
}

/// Load the u and v wind components from `path`.
///
/// JSON documents hold a list of grids; NetCDF files are searched for a
/// pair of component variables. `time_index` selects a single step.
pub fn load_vector_field(path: &Path, time_index: Option<usize>) -> Result<VectorField> {
    let vectors = match input_extension(path)?.as_str() {
        "json" => {
            let text = std::fs::read_to_string(path)?;
            VectorField::from_fields(parse_json_grids(&text)?)?
        }
        _ => load_netcdf_vectors(path)?,
    };

    info!(
        path = %path.display(),
        components = vectors.name(),
        steps = vectors.n_steps(),
        "Loaded wind components"
    );

    match time_index {
        Some(index) => vectors.select_step(index),
        None => Ok(vectors),
    }
}

/// Read a field from a JSON document.
///
/// Values are nested latitude-major lists, optionally with a leading time
/// axis; `null` marks missing values.
pub fn load_json_grid(path: &Path) -> Result<GriddedField> {
    let text = std::fs::read_to_string(path)?;
    parse_json_grid(&text)
}

/// Parse a JSON grid document.
pub fn parse_json_grid(text: &str) -> Result<GriddedField> {
    grid_from_file(serde_json::from_str(text)?)
}

/// Parse a JSON document holding one grid or a list of grids.
pub fn parse_json_grids(text: &str) -> Result<Vec<GriddedField>> {
    let grids: GridFiles = serde_json::from_str(text)?;
    match grids {
        GridFiles::One(grid) => Ok(vec![grid_from_file(*grid)?]),
        GridFiles::Many(grids) => grids.into_iter().map(grid_from_file).collect(),
    }
}

/// The named grid, or the most likely data variable.
fn pick_field(fields: Vec<GriddedField>, variable: Option<&str>) -> Result<GriddedField> {
    let names: Vec<String> = fields.iter().map(|f| f.name().to_string()).collect();
    let wanted = match variable {
        Some(name) => name.to_string(),
        None if fields.len() == 1 => names[0].clone(),
        None => identifiers::identify_primary(&names)
            .map(str::to_string)
            .ok_or_else(|| IsobarError::DataNotFound {
                message: "no data variable among the grids".to_string(),
            })?,
    };
    fields
        .into_iter()
        .find(|f| f.name() == wanted)
        .ok_or_else(|| IsobarError::DataNotFound {
            message: format!("variable '{}' not found", wanted),
        })
}

fn grid_from_file(grid: GridFile) -> Result<GriddedField> {
    let (ny, nx) = (grid.latitudes.len(), grid.longitudes.len());

    let steps = match grid.values {
        GridValues::Single(rows) => vec![rows],
        GridValues::Steps(steps) => steps,
    };

    let mut flat = Vec::with_capacity(steps.len() * ny * nx);
    for rows in &steps {
        if rows.len() != ny || rows.iter().any(|row| row.len() != nx) {
            return Err(IsobarError::Data {
                message: format!(
                    "every step must have {} rows of {} values",
                    ny, nx
                ),
            });
        }
        flat.extend(rows.iter().flatten().map(|v| v.unwrap_or(f32::NAN)));
    }
    let values = Array3::from_shape_vec((steps.len(), ny, nx), flat).map_err(|e| IsobarError::Data {
        message: format!("invalid grid shape: {}", e),
    })?;

    let mut field = GriddedField::from_steps(grid.name, grid.latitudes, grid.longitudes, values)?;
    if let Some(long_name) = grid.long_name {
        field = field.with_long_name(long_name);
    }
    if let Some(units) = grid.units {
        field = field.with_units(units);
    }
    if !grid.times.is_empty() {
        field = field.with_times(to_datetimes(&grid.times)?)?;
    }
    if let Some(base_time) = grid.base_time {
        field = field.with_base_time(crate::utils::to_datetime(base_time)?);
    }
    for (key, value) in grid.attributes {
        field = field.with_attribute(key, value);
    }
    debug!(name = field.name(), "Parsed JSON grid");
    Ok(field)
}

#[cfg(not(feature = "netcdf"))]
fn without_netcdf(path: &Path) -> IsobarError {
    IsobarError::Config {
        message: format!(
            "cannot read {}: isobar was built without the `netcdf` feature",
            path.display()
        ),
    }
}

#[cfg(not(feature = "netcdf"))]
fn load_netcdf_field(path: &Path, _variable: Option<&str>) -> Result<GriddedField> {
    Err(without_netcdf(path))
}

#[cfg(feature = "netcdf")]
fn load_netcdf_field(path: &Path, variable: Option<&str>) -> Result<GriddedField> {
    netcdf_reader::load(path, variable)
}

#[cfg(not(feature = "netcdf"))]
fn load_netcdf_vectors(path: &Path) -> Result<VectorField> {
    Err(without_netcdf(path))
}

#[cfg(feature = "netcdf")]
fn load_netcdf_vectors(path: &Path) -> Result<VectorField> {
    let names = netcdf_reader::gridded_variables(path)?;
    let (u, v) = identifiers::find_uv_pair(&names)
        .map(|(u, v)| (u.to_string(), v.to_string()))
        .or_else(|| Some((identifiers::find_u(&names)?.to_string(), identifiers::find_v(&names)?.to_string())))
        .ok_or_else(|| IsobarError::DataNotFound {
            message: format!("no u and v wind components in {}", path.display()),
        })?;
    VectorField::new(netcdf_reader::load(path, Some(&u))?, netcdf_reader::load(path, Some(&v))?)
}

/// Build a 2-D field in memory; handy for tests and small examples.
pub fn field_from_fn(
    name: &str,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    f: impl Fn(f64, f64) -> f32,
) -> Result<GriddedField> {
    let values = Array2::from_shape_fn((latitudes.len(), longitudes.len()), |(j, i)| {
        f(latitudes[j], longitudes[i])
    });
    GriddedField::new(name, latitudes, longitudes, values)
}

#[cfg(feature = "netcdf")]
mod netcdf_reader {
    use ndarray::{Array, ArrayD, Axis, Dim, Ix3, IxDyn};
    use netcdf::{Attribute, Variable as NetCDFVariable};
    use tracing::{debug, info, warn};

    use super::super::field::{AttributeValue, GriddedField};
    use crate::error::{IsobarError, Result};
    use crate::identifiers;
    use crate::utils::decode_cf_times;
    use std::path::Path;

    /// Names of the numeric variables with at least two dimensions.
    pub(super) fn gridded_variables(path: &Path) -> Result<Vec<String>> {
        let file = netcdf::open(path)?;
        Ok(gridded_names(&file))
    }

    fn gridded_names(file: &netcdf::File) -> Vec<String> {
        file.variables()
            .filter(|var| var.dimensions().len() >= 2 && is_supported_variable(var))
            .map(|var| var.name().to_string())
            .collect()
    }

    pub(super) fn load(path: &Path, variable: Option<&str>) -> Result<GriddedField> {
        let file = netcdf::open(path)?;
        info!("Opened NetCDF file: {}", path.display());

        let gridded = gridded_names(&file);

        let name = match variable {
            Some(name) => name.to_string(),
            None => identifiers::identify_primary(&gridded)
                .map(str::to_string)
                .ok_or_else(|| IsobarError::DataNotFound {
                    message: format!("no gridded variable found in {}", path.display()),
                })?,
        };
        let var = file.variable(&name).ok_or_else(|| IsobarError::DataNotFound {
            message: format!("variable '{}' not found in {}", name, path.display()),
        })?;

        let dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|dim| dim.name().to_string())
            .collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|dim| dim.len()).collect();

        let lat_dim = identifiers::find_latitude(&dims)
            .or_else(|| identifiers::find_y(&dims))
            .map(str::to_string)
            .ok_or_else(|| IsobarError::Data {
                message: format!("variable '{}' has no latitude dimension", name),
            })?;
        let lon_dim = identifiers::find_longitude(&dims)
            .or_else(|| identifiers::find(&dims, identifiers::X))
            .map(str::to_string)
            .ok_or_else(|| IsobarError::Data {
                message: format!("variable '{}' has no longitude dimension", name),
            })?;
        let time_dim = identifiers::find_time(&dims).map(str::to_string);

        let mut array = convert_variable_to_array(&var, &shape)?;
        apply_packing(&var, &mut array)?;

        // Drop extra axes (levels, members) by taking their first index
        let mut kept = dims.clone();
        for axis in (0..dims.len()).rev() {
            let dim = &dims[axis];
            if *dim != lat_dim && *dim != lon_dim && Some(dim) != time_dim.as_ref() {
                warn!(dimension = %dim, "Taking the first index of an extra dimension");
                array = array.index_axis_move(Axis(axis), 0);
                kept.remove(axis);
            }
        }
        if time_dim.is_none() {
            array = array.insert_axis(Axis(0));
            kept.insert(0, String::new());
        }
        let position = |wanted: &str| kept.iter().position(|d| d == wanted).unwrap_or(0);
        let order = [
            time_dim.as_deref().map(position).unwrap_or(0),
            position(&lat_dim),
            position(&lon_dim),
        ];
        let values = array
            .permuted_axes(IxDyn(&order))
            .as_standard_layout()
            .to_owned()
            .into_dimensionality::<Ix3>()
            .map_err(|e| IsobarError::Data {
                message: format!("could not arrange '{}' as time x lat x lon: {}", name, e),
            })?;

        let latitudes = coordinate(&file, &lat_dim)?;
        let longitudes = coordinate(&file, &lon_dim)?;
        let mut field = GriddedField::from_steps(name.clone(), latitudes, longitudes, values)?;

        for attr in var.attributes() {
            let key = attr.name().to_string();
            let value = convert_attribute(&attr)?;
            match (key.as_str(), &value) {
                ("units", AttributeValue::Text(units)) => field = field.with_units(units.clone()),
                ("long_name", AttributeValue::Text(long)) => field = field.with_long_name(long.clone()),
                _ => field = field.with_attribute(key, value),
            }
        }

        if let Some(time_dim) = time_dim {
            if let Some(time_var) = file.variable(&time_dim) {
                let raw = extract_coordinate_values(&time_var)?;
                let units = time_var
                    .attribute("units")
                    .map(|attr| convert_attribute(&attr))
                    .transpose()?;
                if let Some(AttributeValue::Text(units)) = units {
                    let times = decode_cf_times(&raw, &units)?;
                    field = field.with_times(times)?;
                } else {
                    debug!(dimension = %time_dim, "Time coordinate has no CF units");
                }
            }
        }

        Ok(field)
    }

    fn coordinate(file: &netcdf::File, name: &str) -> Result<Vec<f64>> {
        match file.variable(name) {
            Some(var) => extract_coordinate_values(&var),
            None => {
                let size = file.dimension(name).map(|dim| dim.len()).unwrap_or(0);
                warn!("Created default coordinates for dimension: {}", name);
                Ok((0..size).map(|i| i as f64).collect())
            }
        }
    }

    /// Apply `scale_factor`/`add_offset` and turn `_FillValue` into NaN.
    fn apply_packing(var: &NetCDFVariable, array: &mut ArrayD<f32>) -> Result<()> {
        let number = |key: &str| -> Result<Option<f64>> {
            Ok(match var.attribute(key).map(|attr| convert_attribute(&attr)).transpose()? {
                Some(AttributeValue::Number(n)) => Some(n),
                _ => None,
            })
        };
        let fill = number("_FillValue")?.or(number("missing_value")?);
        let scale = number("scale_factor")?.unwrap_or(1.0);
        let offset = number("add_offset")?.unwrap_or(0.0);

        array.mapv_inplace(|v| {
            if fill.is_some_and(|fill| (v as f64 - fill).abs() < 1e-6 * fill.abs().max(1.0)) {
                f32::NAN
            } else {
                (v as f64 * scale + offset) as f32
            }
        });
        Ok(())
    }

    /// Check if a variable has a supported type that we can work with
    fn is_supported_variable(var: &NetCDFVariable) -> bool {
        use netcdf::types::{BasicType, VariableType};

        matches!(
            var.vartype(),
            VariableType::Basic(BasicType::Byte)
                | VariableType::Basic(BasicType::Short)
                | VariableType::Basic(BasicType::Int)
                | VariableType::Basic(BasicType::Float)
                | VariableType::Basic(BasicType::Double)
        )
    }

    /// Convert a NetCDF attribute to our AttributeValue enum
    fn convert_attribute(attr: &Attribute) -> Result<AttributeValue> {
        use netcdf::AttributeValue as NcAttributeValue;

        let value = attr.value()?;
        Ok(match value {
            NcAttributeValue::Str(s) => AttributeValue::Text(s),
            NcAttributeValue::Uchar(v) => AttributeValue::Number(v as f64),
            NcAttributeValue::Schar(v) => AttributeValue::Number(v as f64),
            NcAttributeValue::Short(v) => AttributeValue::Number(v as f64),
            NcAttributeValue::Int(v) => AttributeValue::Number(v as f64),
            NcAttributeValue::Float(v) => AttributeValue::Number(v as f64),
            NcAttributeValue::Double(v) => AttributeValue::Number(v),
            NcAttributeValue::Floats(v) => AttributeValue::NumberArray(v.into_iter().map(f64::from).collect()),
            NcAttributeValue::Doubles(v) => AttributeValue::NumberArray(v),
            NcAttributeValue::Ints(v) => AttributeValue::NumberArray(v.into_iter().map(f64::from).collect()),
            other => AttributeValue::Text(format!("{:?}", other)),
        })
    }

    /// Extract coordinate values from a coordinate variable
    fn extract_coordinate_values(var: &NetCDFVariable) -> Result<Vec<f64>> {
        use netcdf::types::{BasicType, VariableType};

        match var.vartype() {
            VariableType::Basic(BasicType::Short) => {
                let values: Vec<i16> = var.get_values::<i16, _>(&[] as &[netcdf::Extent])?;
                Ok(values.into_iter().map(|v| v as f64).collect())
            }
            VariableType::Basic(BasicType::Int) => {
                let values: Vec<i32> = var.get_values::<i32, _>(&[] as &[netcdf::Extent])?;
                Ok(values.into_iter().map(|v| v as f64).collect())
            }
            VariableType::Basic(BasicType::Int64) => {
                let values: Vec<i64> = var.get_values::<i64, _>(&[] as &[netcdf::Extent])?;
                Ok(values.into_iter().map(|v| v as f64).collect())
            }
            VariableType::Basic(BasicType::Float) => {
                let values: Vec<f32> = var.get_values::<f32, _>(&[] as &[netcdf::Extent])?;
                Ok(values.into_iter().map(|v| v as f64).collect())
            }
            VariableType::Basic(BasicType::Double) => {
                Ok(var.get_values::<f64, _>(&[] as &[netcdf::Extent])?)
            }
            _ => {
                let size = var.dimensions().first().map(|dim| dim.len()).unwrap_or(0);
                warn!(
                    "Unsupported coordinate variable type: {:?}, using indices instead",
                    var.vartype()
                );
                Ok((0..size).map(|i| i as f64).collect())
            }
        }
    }

    /// Convert a NetCDF variable to an ndarray Array<f32, IxDyn>
    fn convert_variable_to_array(var: &NetCDFVariable, shape: &[usize]) -> Result<ArrayD<f32>> {
        use netcdf::types::{BasicType, VariableType};

        let data: Vec<f32> = match var.vartype() {
            VariableType::Basic(BasicType::Byte) => var
                .get_values::<i8, _>(&[] as &[netcdf::Extent])?
                .into_iter()
                .map(|v| v as f32)
                .collect(),
            VariableType::Basic(BasicType::Short) => var
                .get_values::<i16, _>(&[] as &[netcdf::Extent])?
                .into_iter()
                .map(|v| v as f32)
                .collect(),
            VariableType::Basic(BasicType::Int) => var
                .get_values::<i32, _>(&[] as &[netcdf::Extent])?
                .into_iter()
                .map(|v| v as f32)
                .collect(),
            VariableType::Basic(BasicType::Float) => var.get_values::<f32, _>(&[] as &[netcdf::Extent])?,
            VariableType::Basic(BasicType::Double) => var
                .get_values::<f64, _>(&[] as &[netcdf::Extent])?
                .into_iter()
                .map(|v| v as f32)
                .collect(),
            other => {
                return Err(IsobarError::Data {
                    message: format!("Unsupported variable type: {:?}", other),
                })
            }
        };

        Array::from_shape_vec(Dim(shape.to_vec()), data).map_err(|e| IsobarError::Data {
            message: format!("variable '{}' does not match its dimensions: {}", var.name(), e),
        })
    }
}
