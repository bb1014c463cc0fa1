//! Title and label templates.
//!
//! Templates use `{key}` fields with an optional conversion and format spec,
//! `{key!conv:spec}`. Conversions are `u` (upper case), `l` (lower case),
//! `c` (capitalise), `t` (title case) or a layer index such as `!0`. The spec
//! is a strftime pattern for times, a precision such as `.1f` for numbers, or
//! `%Lt`/`%Ln` to write a number as a latitude/longitude. `{{` and `}}` are
//! literal braces.

use tracing::debug;

use crate::sources::MetadataValue;
use crate::utils::{capitalize, list_to_human, unique};

/// Something that can supply values for template fields.
pub trait FormatContext {
    /// Every value of `key`, one per layer, already formatted with `spec`.
    fn values(&self, key: &str, spec: Option<&str>) -> Vec<String>;
}

impl<F> FormatContext for F
where
    F: Fn(&str, Option<&str>) -> Vec<String>,
{
    fn values(&self, key: &str, spec: Option<&str>) -> Vec<String> {
        self(key, spec)
    }
}

/// Format one metadata value.
pub fn format_value(value: &MetadataValue, spec: Option<&str>) -> String {
    match (value, spec) {
        (MetadataValue::Number(n), Some("%Lt")) => format_latitude(*n),
        (MetadataValue::Number(n), Some("%Ln")) => format_longitude(*n),
        _ => value.format(spec),
    }
}

/// `50°N`, `12.5°S`, `0°`.
pub fn format_latitude(value: f64) -> String {
    let text = trim_number(value.abs());
    match value {
        v if v > 0.0 => format!("{}°N", text),
        v if v < 0.0 => format!("{}°S", text),
        _ => format!("{}°", text),
    }
}

/// `10°E`, `75°W`, `0°`.
pub fn format_longitude(value: f64) -> String {
    let text = trim_number(value.abs());
    match value {
        v if v > 0.0 => format!("{}°E", text),
        v if v < 0.0 => format!("{}°W", text),
        _ => format!("{}°", text),
    }
}

fn trim_number(value: f64) -> String {
    let text = format!("{:.2}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Join distinct values into a phrase such as "a, b and c".
pub fn unique_join(values: Vec<String>) -> String {
    let values: Vec<String> = unique(&values).into_iter().filter(|v| !v.is_empty()).collect();
    list_to_human(&values)
}

/// Fill in a template from `context`. Unknown keys become empty strings.
pub fn format_string(template: &str, context: &dyn FormatContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

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
                let mut field = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    field.push(c);
                }
                if closed {
                    out.push_str(&format_field(&field, context));
                } else {
                    out.push('{');
                    out.push_str(&field);
                }
            }
            c => out.push(c),
        }
    }
    out
}

fn format_field(field: &str, context: &dyn FormatContext) -> String {
    let (head, spec) = match field.split_once(':') {
        Some((head, spec)) => (head, Some(spec)),
        None => (field, None),
    };
    let (key, conversion) = match head.split_once('!') {
        Some((key, conversion)) => (key.trim(), Some(conversion.trim())),
        None => (head.trim(), None),
    };

    let values = context.values(key, spec);
    if values.is_empty() {
        debug!(key, "No value for template key");
        return String::new();
    }

    match conversion {
        Some(conversion) if conversion.chars().all(|c| c.is_ascii_digit()) && !conversion.is_empty() => {
            conversion
                .parse::<usize>()
                .ok()
                .and_then(|i| values.get(i).cloned())
                .unwrap_or_default()
        }
        Some(conversion) => convert(&unique_join(values), conversion),
        None => unique_join(values),
    }
}

fn convert(text: &str, conversion: &str) -> String {
    match conversion {
        "u" => text.to_uppercase(),
        "l" => text.to_lowercase(),
        "c" => capitalize(text),
        "t" => text
            .split(' ')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
        other => {
            debug!(conversion = other, "Unknown template conversion");
            text.to_string()
        }
    }
}
