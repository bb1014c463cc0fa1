//! The process-wide styling schema.
//!
//! A schema is a nested table of named styling defaults (line widths, colour
//! maps, finishing workflows, ...) loaded from YAML. Plotting functions read
//! it at call time through [`current`], and callers can override parts of it
//! temporarily with [`set`] or swap it out with [`use_schema`].
//!
//! Keys are dotted paths (`"legend.label_size"`). A "magic" underscore key
//! such as `line_width` resolves to `line.width` when no literal `line_width`
//! entry exists. String values may reference other entries with
//! `{section.key}` placeholders, which are expanded on lookup.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, error, info};

use crate::error::{IsobarError, Result};
use crate::utils::dict_utils::{merged, recursive_dict_update};

const DEFAULT_SCHEMA_NAME: &str = "default";
const DEFAULT_SCHEMA_YAML: &str = include_str!("../resources/schemas/default.yaml");
const DARK_SCHEMA_YAML: &str = include_str!("../resources/schemas/dark.yaml");

/// The bundled schemas, by name.
const BUNDLED: &[(&str, &str)] = &[
    (DEFAULT_SCHEMA_NAME, DEFAULT_SCHEMA_YAML),
    ("dark", DARK_SCHEMA_YAML),
];

static SCHEMA: Lazy<RwLock<Schema>> = Lazy::new(|| RwLock::new(Schema::default_schema()));

/// A table of named styling defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    values: Value,
}

impl Schema {
    /// Parse a schema from YAML text.
    pub fn from_yaml(name: &str, text: &str) -> Result<Self> {
        let values: Value = serde_yaml::from_str(text)?;
        let values = match values {
            Value::Null => Value::Object(serde_json::Map::new()),
            Value::Object(_) => values,
            _ => {
                return Err(IsobarError::Config {
                    message: format!("schema '{}' must be a mapping", name),
                })
            }
        };
        Ok(Self {
            name: name.to_string(),
            values,
        })
    }

    /// The bundled default schema.
    pub fn default_schema() -> Self {
        Self::from_yaml(DEFAULT_SCHEMA_NAME, DEFAULT_SCHEMA_YAML).unwrap_or_else(|e| {
            error!(error = %e, "Bundled default schema is invalid; using an empty schema");
            Self {
                name: DEFAULT_SCHEMA_NAME.to_string(),
                values: Value::Object(serde_json::Map::new()),
            }
        })
    }

    /// A bundled schema by name. Non-default schemas are layered over the
    /// default one.
    pub fn bundled(name: &str) -> Result<Self> {
        let (_, text) = BUNDLED
            .iter()
            .find(|(bundled_name, _)| bundled_name.eq_ignore_ascii_case(name))
            .ok_or_else(|| IsobarError::SchemaNotFound {
                message: format!("no bundled schema named '{}'", name),
            })?;
        Self::layered(name, text)
    }

    /// Load a bundled schema by name, or a YAML schema from a file path.
    pub fn load(name_or_path: &str) -> Result<Self> {
        if let Ok(schema) = Self::bundled(name_or_path) {
            return Ok(schema);
        }

        let path = expand_home(name_or_path);
        if !path.exists() {
            return Err(IsobarError::SchemaNotFound {
                message: format!("no schema '{}' found", name_or_path),
            });
        }
        let text = std::fs::read_to_string(&path)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name_or_path)
            .to_string();
        Self::layered(&name, &text)
    }

    fn layered(name: &str, text: &str) -> Result<Self> {
        let overlay = Self::from_yaml(name, text)?;
        if name == DEFAULT_SCHEMA_NAME {
            return Ok(overlay);
        }
        let mut schema = Self::default_schema();
        schema.name = name.to_string();
        recursive_dict_update(&mut schema.values, &overlay.values);
        Ok(schema)
    }

    /// The schema's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The whole table.
    pub fn values(&self) -> &Value {
        &self.values
    }

    /// Whether a key resolves to anything (including an explicit null).
    pub fn contains(&self, key: &str) -> bool {
        self.raw(key).is_some()
    }

    /// Look up a key without expanding string references.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        resolve(&self.values, key)
    }

    /// Look up a key, expanding `{section.key}` references inside strings.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.raw(key).map(|value| self.expand(value))
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.raw(key).and_then(Value::as_f64)
    }

    pub fn get_f32(&self, key: &str) -> Option<f32> {
        self.get_f64(key).map(|v| v as f32)
    }

    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.raw(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.raw(key).and_then(Value::as_bool)
    }

    /// A list of strings; non-string entries are skipped.
    pub fn get_str_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The finishing steps of a named workflow, e.g. `"quickmap_workflow"`.
    pub fn workflow(&self, name: &str) -> Vec<String> {
        self.get_str_list(name)
    }

    /// Merge the defaults stored under `keys` and lay `overrides` over them.
    ///
    /// With no keys the whole schema forms the defaults. Caller-supplied
    /// options always win.
    pub fn apply(&self, keys: &[&str], overrides: &Value) -> Value {
        let mut defaults = Value::Object(serde_json::Map::new());
        if keys.is_empty() {
            defaults = self.expand(&self.values);
        } else {
            for key in keys {
                if let Some(value) = self.get(key) {
                    recursive_dict_update(&mut defaults, &value);
                }
            }
        }
        merged(&defaults, overrides)
    }

    /// Recursively merge `overrides` into this schema. Dotted and magic keys
    /// in the top level of `overrides` are expanded into nested tables.
    pub fn update(&mut self, overrides: &Value) {
        if let Value::Object(map) = overrides {
            for (key, value) in map {
                let nested = self.nest_key(key, value.clone());
                recursive_dict_update(&mut self.values, &nested);
            }
        }
    }

    /// Turn `"line_width": 3` into `{"line": {"width": 3}}` when `line` is a
    /// table of this schema, and `"a.b": 1` into `{"a": {"b": 1}}`.
    fn nest_key(&self, key: &str, value: Value) -> Value {
        let mut path: Vec<String> = key.split('.').map(str::to_string).collect();
        if path.len() == 1 && self.values.get(key).is_none() {
            if let Some((magic, rest)) = key.split_once('_') {
                if self.values.get(magic).map_or(false, Value::is_object) {
                    path = vec![magic.to_string(), rest.to_string()];
                }
            }
        }
        path.into_iter().rev().fold(value, |inner, segment| {
            let mut map = serde_json::Map::new();
            map.insert(segment, inner);
            Value::Object(map)
        })
    }

    fn expand(&self, value: &Value) -> Value {
        match value {
            Value::String(s) if s.contains('{') => Value::String(self.format_string(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.expand(v)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.expand(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Replace `{key}` references with schema values. `{{` and `}}` are
    /// literal braces, and unknown references are left untouched.
    fn format_string(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut key = String::new();
                    let mut closed = false;
                    for k in chars.by_ref() {
                        if k == '}' {
                            closed = true;
                            break;
                        }
                        key.push(k);
                    }
                    match self.raw(&key) {
                        Some(Value::String(s)) if closed => out.push_str(s),
                        Some(Value::Null) | None => {
                            out.push('{');
                            out.push_str(&key);
                            if closed {
                                out.push('}');
                            }
                        }
                        Some(other) if closed => out.push_str(&other.to_string()),
                        Some(_) => {
                            out.push('{');
                            out.push_str(&key);
                        }
                    }
                }
                other => out.push(other),
            }
        }
        out
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::default_schema()
    }
}

/// Resolve a dotted key, falling back to magic underscore keys per segment.
fn resolve<'a>(values: &'a Value, key: &str) -> Option<&'a Value> {
    let mut current = values;
    for segment in key.split('.') {
        current = resolve_segment(current, segment)?;
    }
    Some(current)
}

fn resolve_segment<'a>(values: &'a Value, segment: &str) -> Option<&'a Value> {
    if let Some(value) = values.get(segment) {
        return Some(value);
    }
    let (magic, rest) = segment.split_once('_')?;
    let table = values.get(magic)?;
    if table.is_object() {
        resolve_segment(table, rest)
    } else {
        None
    }
}

/// Look up a styling option in caller-supplied options, honouring magic
/// keys: `line_width` is found either literally or as `line.width`.
pub fn lookup_option<'a>(options: &'a Value, key: &str) -> Option<&'a Value> {
    resolve(options, key).filter(|v| !v.is_null())
}

fn expand_home(path: &str) -> std::path::PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return Path::new(&home).join(rest);
        }
    }
    Path::new(path).to_path_buf()
}

/// A snapshot of the process-wide schema.
pub fn current() -> Schema {
    SCHEMA.read().clone()
}

/// Run a closure against the process-wide schema without cloning it.
pub fn with_schema<R>(f: impl FnOnce(&Schema) -> R) -> R {
    f(&SCHEMA.read())
}

/// Replace the process-wide schema with a bundled schema or a YAML file.
pub fn use_schema(name_or_path: &str) -> Result<()> {
    let schema = Schema::load(name_or_path)?;
    info!(schema = schema.name(), "Using schema");
    *SCHEMA.write() = schema;
    Ok(())
}

/// Restore the bundled default schema.
pub fn reset() {
    *SCHEMA.write() = Schema::default_schema();
}

/// Temporarily override parts of the process-wide schema.
///
/// The previous schema is restored when the returned guard is dropped.
///
/// ```
/// use serde_json::json;
///
/// let before = isobar::schema::current().get_f64("line.width");
/// {
///     let _guard = isobar::schema::set(json!({"line_width": 7.0}));
///     assert_eq!(isobar::schema::current().get_f64("line.width"), Some(7.0));
/// }
/// assert_eq!(isobar::schema::current().get_f64("line.width"), before);
/// ```
pub fn set(overrides: Value) -> SchemaGuard {
    let mut schema = SCHEMA.write();
    let previous = schema.clone();
    schema.update(&overrides);
    debug!(overrides = %overrides, "Schema overridden");
    SchemaGuard {
        previous: Some(previous),
    }
}

/// Restores the schema captured by [`set`] on drop.
#[must_use = "the override is undone as soon as the guard is dropped"]
pub struct SchemaGuard {
    previous: Option<Schema>,
}

impl Drop for SchemaGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            *SCHEMA.write() = previous;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Schema {
        Schema::from_yaml(
            "sample",
            r#"
settings:
  hoverprecision: ".2f"
line:
  width: 2
  color: red
template: "%{{y:{settings.hoverprecision}}}"
unknown_ref: "{nothing.here}"
workflow: [legend, title]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_default_schema_loads() {
        let schema = Schema::default_schema();
        assert_eq!(schema.name(), "default");
        assert_eq!(
            schema.workflow("quickmap_workflow"),
            vec!["legend", "coastlines", "title", "gridlines"]
        );
        assert_eq!(schema.get_str("default_crs").as_deref(), Some("PlateCarree"));
        assert_eq!(schema.get_str_list("stripes.colors").len(), 17);
    }

    #[test]
    fn test_magic_keys() {
        let schema = sample();
        assert_eq!(schema.get_f64("line_width"), Some(2.0));
        assert_eq!(schema.get_f64("line.width"), Some(2.0));
        assert_eq!(schema.get_str("line_color").as_deref(), Some("red"));
        assert!(schema.get("line_style").is_none());
    }

    #[test]
    fn test_reference_formatting() {
        let schema = sample();
        assert_eq!(schema.get_str("template").as_deref(), Some("%{y:.2f}"));
        assert_eq!(
            schema.get_str("unknown_ref").as_deref(),
            Some("{nothing.here}")
        );
    }

    #[test]
    fn test_apply_prefers_overrides() {
        let schema = sample();
        let options = schema.apply(&["line"], &json!({"width": 5}));
        assert_eq!(options, json!({"width": 5, "color": "red"}));
    }

    #[test]
    fn test_update_expands_magic_keys() {
        let mut schema = sample();
        schema.update(&json!({"line_width": 4, "legend.location": "right"}));
        assert_eq!(schema.get_f64("line.width"), Some(4.0));
        assert_eq!(schema.get_str("line.color").as_deref(), Some("red"));
        assert_eq!(schema.get_str("legend.location").as_deref(), Some("right"));
    }

    #[test]
    fn test_bundled_dark_layers_over_default() {
        let schema = Schema::bundled("dark").unwrap();
        assert_eq!(schema.name(), "dark");
        assert_eq!(schema.get_str("figure.background").as_deref(), Some("#111418"));
        // Untouched keys come from the default schema
        assert_eq!(schema.get_f64("line.width"), Some(2.0));
    }

    #[test]
    fn test_load_missing_schema() {
        let err = Schema::load("no-such-schema").unwrap_err();
        assert!(matches!(err, IsobarError::SchemaNotFound { .. }));
        assert!(use_schema("no-such-schema").is_err());
    }

    #[test]
    fn test_load_schema_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "line:\n  width: 9\n").unwrap();
        let schema = Schema::load(path.to_str().unwrap()).unwrap();
        assert_eq!(schema.name(), "custom");
        assert_eq!(schema.get_f64("line.width"), Some(9.0));
        assert_eq!(schema.get_f64("scatter.size"), Some(4.0));
    }

    #[test]
    fn test_set_restores_on_drop() {
        assert!(!current().contains("schema_guard_marker"));
        {
            let _outer = set(json!({"schema_guard_marker": 1}));
            assert_eq!(current().get_f64("schema_guard_marker"), Some(1.0));
            {
                let _inner = set(json!({"schema_guard_marker": 2}));
                assert_eq!(current().get_f64("schema_guard_marker"), Some(2.0));
            }
            assert_eq!(current().get_f64("schema_guard_marker"), Some(1.0));
        }
        assert!(!current().contains("schema_guard_marker"));
    }

    #[test]
    fn test_lookup_option() {
        let options = json!({"line": {"width": 3}, "line_color": "blue", "cmap": null});
        assert_eq!(lookup_option(&options, "line_width"), Some(&json!(3)));
        assert_eq!(lookup_option(&options, "line_color"), Some(&json!("blue")));
        assert_eq!(lookup_option(&options, "cmap"), None);
    }
}
