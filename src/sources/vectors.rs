//! Wind as a pair of gridded components.

use crate::error::{IsobarError, Result};
use crate::geo::Domain;
use crate::identifiers;
use crate::utils::list_to_human;

use super::field::{GriddedField, MetadataValue};

/// Eastward (`u`) and northward (`v`) components on one grid.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField {
    name: String,
    u: GriddedField,
    v: GriddedField,
}

impl VectorField {
    /// Pair two components; they must share their grid and time steps.
    pub fn new(u: GriddedField, v: GriddedField) -> Result<Self> {
        if u.latitudes() != v.latitudes() || u.longitudes() != v.longitudes() {
            return Err(IsobarError::Data {
                message: format!("'{}' and '{}' are not on the same grid", u.name(), v.name()),
            });
        }
        if u.n_steps() != v.n_steps() {
            return Err(IsobarError::Data {
                message: format!(
                    "'{}' has {} steps but '{}' has {}",
                    u.name(),
                    u.n_steps(),
                    v.name(),
                    v.n_steps()
                ),
            });
        }
        Ok(Self {
            name: format!("{}/{}", u.name(), v.name()),
            u,
            v,
        })
    }

    /// Pick the wind components out of `fields` by their names.
    ///
    /// A matching pair such as `u10`/`v10` wins over the first u-like and
    /// v-like names found separately.
    pub fn from_fields(fields: Vec<GriddedField>) -> Result<Self> {
        let names: Vec<String> = fields.iter().map(|f| f.name().to_string()).collect();
        let (u_name, v_name) = match identifiers::find_uv_pair(&names) {
            Some((u, v)) => (u.to_string(), v.to_string()),
            None => match (identifiers::find_u(&names), identifiers::find_v(&names)) {
                (Some(u), Some(v)) => (u.to_string(), v.to_string()),
                _ => {
                    return Err(IsobarError::DataNotFound {
                        message: format!("no u and v wind components among {}", list_to_human(&names)),
                    })
                }
            },
        };

        let (mut u, mut v) = (None, None);
        for field in fields {
            if u.is_none() && field.name() == u_name {
                u = Some(field);
            } else if v.is_none() && field.name() == v_name {
                v = Some(field);
            }
        }
        match (u, v) {
            (Some(u), Some(v)) => Self::new(u, v),
            _ => Err(IsobarError::DataNotFound {
                message: format!("wind components '{}' and '{}' are incomplete", u_name, v_name),
            }),
        }
    }

    /// `u/v`, e.g. `u10/v10`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn u(&self) -> &GriddedField {
        &self.u
    }

    pub fn v(&self) -> &GriddedField {
        &self.v
    }

    pub fn units(&self) -> Option<&str> {
        self.u.units()
    }

    pub fn latitudes(&self) -> &[f64] {
        self.u.latitudes()
    }

    pub fn longitudes(&self) -> &[f64] {
        self.u.longitudes()
    }

    pub fn n_steps(&self) -> usize {
        self.u.n_steps()
    }

    /// Both components at step `index` only.
    pub fn select_step(&self, index: usize) -> Result<Self> {
        Ok(Self {
            name: self.name.clone(),
            u: self.u.select_step(index)?,
            v: self.v.select_step(index)?,
        })
    }

    pub fn crop(&self, domain: &Domain) -> Result<Self> {
        Ok(Self {
            name: self.name.clone(),
            u: self.u.crop(domain)?,
            v: self.v.crop(domain)?,
        })
    }

    /// Title metadata; names describe the pair, everything else comes from
    /// the `u` component.
    pub fn metadata(&self, key: &str) -> Option<MetadataValue> {
        match key {
            "variable_name" => Some(MetadataValue::Text(shared_name(
                &self.u.variable_name(),
                &self.v.variable_name(),
            ))),
            "short_name" | "name" => Some(MetadataValue::Text(self.name.clone())),
            _ => self.u.metadata(key),
        }
    }
}

/// "10 metre U wind component" and "10 metre V wind component" become
/// "10 metre wind component"; names that differ more are joined.
fn shared_name(u: &str, v: &str) -> String {
    let u_words: Vec<&str> = u.split_whitespace().collect();
    let v_words: Vec<&str> = v.split_whitespace().collect();
    if u_words.len() == v_words.len() && u_words.len() > 1 {
        let differing: Vec<usize> = (0..u_words.len()).filter(|i| u_words[*i] != v_words[*i]).collect();
        if let [only] = differing[..] {
            return u_words
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != only)
                .map(|(_, word)| *word)
                .collect::<Vec<_>>()
                .join(" ");
        }
    }
    if u == v {
        return u.to_string();
    }
    format!("{} and {}", u, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::field_from_fn;

    fn component(name: &str, value: f32) -> GriddedField {
        field_from_fn(name, vec![50.0, 40.0], vec![0.0, 10.0, 20.0], move |_, _| value)
            .unwrap()
            .with_units("m s**-1")
    }

    #[test]
    fn test_from_fields_finds_matching_pair() {
        let fields = vec![component("t2m", 280.0), component("v10", 2.0), component("u10", 1.0)];
        let wind = VectorField::from_fields(fields).unwrap();
        assert_eq!(wind.name(), "u10/v10");
        assert_eq!(wind.u().values()[[0, 0]], 1.0);
        assert_eq!(wind.v().values()[[0, 0]], 2.0);
        assert_eq!(wind.units(), Some("m s**-1"));
    }

    #[test]
    fn test_from_fields_falls_back_to_single_names() {
        let fields = vec![component("U", 1.0), component("northward_wind", 2.0)];
        let wind = VectorField::from_fields(fields).unwrap();
        assert_eq!(wind.name(), "U/northward_wind");
    }

    #[test]
    fn test_from_fields_without_wind() {
        let err = VectorField::from_fields(vec![component("t2m", 280.0)]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_new_rejects_different_grids() {
        let other = field_from_fn("v", vec![0.0], vec![0.0], |_, _| 0.0).unwrap();
        assert!(matches!(
            VectorField::new(component("u", 1.0), other),
            Err(IsobarError::Data { .. })
        ));
    }

    #[test]
    fn test_variable_name_of_pair() {
        let u = component("u10", 1.0).with_long_name("10 metre U wind component");
        let v = component("v10", 1.0).with_long_name("10 metre V wind component");
        let wind = VectorField::new(u, v).unwrap();
        assert_eq!(
            wind.metadata("variable_name"),
            Some(MetadataValue::Text("10 metre wind component".into()))
        );
        assert_eq!(wind.metadata("units"), Some(MetadataValue::Text("m s**-1".into())));
        assert_eq!(shared_name("u10", "v10"), "u10 and v10");
    }
}
