//! Contour and colour-bin levels.
//!
//! Levels are either given explicitly or generated from the data range:
//! [`auto_range`] picks a "nice" step close to a target number of bins,
//! [`step_range`] tiles the range with a fixed step aligned to a reference
//! value, and [`categorical_range`] puts bin edges halfway between distinct
//! values.

use serde_json::Value;

use crate::error::{IsobarError, Result};

/// Number of bins targeted when nothing else is specified.
pub const DEFAULT_LEVEL_COUNT: usize = 10;

const STEP_FACTORS: [f64; 4] = [1.0, 2.0, 5.0, 10.0];

/// Round away floating point noise from `value` given the step it is a
/// multiple of.
fn tidy(value: f64, step: f64) -> f64 {
    if step <= 0.0 || !step.is_finite() {
        return value;
    }
    let decimals = (-step.log10().floor()).max(0.0) as i32 + 2;
    let scale = 10f64.powi(decimals);
    let tidied = (value * scale).round() / scale;
    if tidied == 0.0 {
        0.0
    } else {
        tidied
    }
}

/// About `n_levels` "nice" levels spanning `min..max`.
///
/// Candidate steps are 1, 2, 5 and 10 times the power of ten just below
/// `range / n_levels`; the candidate whose level count lies closest to
/// `n_levels` wins (the smaller step on ties). With a `divergence_point`
/// the range is made symmetric around it first.
///
/// A NaN or empty range yields `n_levels + 1` zeros.
pub fn auto_range(min: f64, max: f64, n_levels: usize, divergence_point: Option<f64>) -> Vec<f64> {
    let n_levels = n_levels.max(1);
    if min.is_nan() || max.is_nan() || min == max {
        return vec![0.0; n_levels + 1];
    }

    let (min, max) = match divergence_point {
        Some(point) => {
            let max_diff = (max - point).abs().max((point - min).abs());
            (point - max_diff, point + max_diff)
        }
        None => (min, max),
    };

    let range = max - min;
    let magnitude = 10f64.powf((range / n_levels as f64).log10().floor());

    let mut best: Option<Vec<f64>> = None;
    for factor in STEP_FACTORS {
        let step = factor * magnitude;
        let first = (min / step).floor() as i64;
        let last = (max / step).ceil() as i64;
        let levels: Vec<f64> = (first..=last).map(|i| tidy(i as f64 * step, step)).collect();

        let distance = levels.len().abs_diff(n_levels);
        let better = match &best {
            Some(current) => distance < current.len().abs_diff(n_levels),
            None => true,
        };
        if better {
            best = Some(levels);
        }
    }
    best.unwrap_or_default()
}

/// Levels every `step`, aligned so that `reference` (default: `step`) is
/// one of them, covering `min..=max`.
pub fn step_range(min: f64, max: f64, step: f64, reference: Option<f64>) -> Result<Vec<f64>> {
    if !(step > 0.0) || !step.is_finite() {
        return Err(IsobarError::invalid("step", format!("step must be positive, got {}", step)));
    }
    if min.is_nan() || max.is_nan() {
        return Ok(Vec::new());
    }

    let reference = reference.unwrap_or(step);
    let max_modifier = reference.rem_euclid(step);
    let min_modifier = if max_modifier == 0.0 { 0.0 } else { step - max_modifier };
    let start = min - min.rem_euclid(step) - min_modifier;

    let count = ((max + step - start) / step).ceil().max(0.0) as usize;
    let mut levels: Vec<f64> = (0..count)
        .map(|i| tidy(start + i as f64 * step, step))
        .collect();

    if levels.len() > 1 && levels[1] <= min {
        levels.remove(0);
    }
    Ok(levels)
}

/// Bin edges for categorical data: halfway between sorted distinct values,
/// with the outer edges extrapolated by half a gap.
pub fn categorical_range(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut distinct: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();

    match distinct.len() {
        0 => Vec::new(),
        1 => vec![distinct[0] - 0.1, distinct[0] + 0.1],
        n => {
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(distinct[0] - (distinct[1] - distinct[0]) / 2.0);
            for pair in distinct.windows(2) {
                edges.push((pair[0] + pair[1]) / 2.0);
            }
            edges.push(distinct[n - 1] + (distinct[n - 1] - distinct[n - 2]) / 2.0);
            edges
        }
    }
}

/// How a style derives its levels.
#[derive(Debug, Clone, PartialEq)]
pub enum Levels {
    /// About [`DEFAULT_LEVEL_COUNT`] nice levels, optionally symmetric
    /// around a divergence point.
    Auto { divergence_point: Option<f64> },
    /// About `n` nice levels.
    Count(usize),
    /// Every `step`, aligned to `reference`.
    Step { step: f64, reference: Option<f64> },
    /// Exactly these levels.
    Explicit(Vec<f64>),
    /// One bin per distinct value.
    Categorical,
}

impl Default for Levels {
    fn default() -> Self {
        Levels::Auto {
            divergence_point: None,
        }
    }
}

impl Levels {
    /// Read levels from a style option:
    ///
    /// - a number: [`Levels::Count`];
    /// - a list: [`Levels::Explicit`];
    /// - `"categorical"`;
    /// - a table with `step`, `reference`, `divergence_point`, `levels`,
    ///   `count` or `categorical`.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Levels::default()),
            Value::Number(n) => n
                .as_u64()
                .filter(|n| *n > 0)
                .map(|n| Levels::Count(n as usize))
                .ok_or_else(|| IsobarError::invalid("levels", format!("invalid level count {}", n))),
            Value::Array(items) => {
                let levels = items
                    .iter()
                    .map(|v| {
                        v.as_f64()
                            .ok_or_else(|| IsobarError::invalid("levels", format!("non-numeric level {}", v)))
                    })
                    .collect::<Result<Vec<f64>>>()?;
                Ok(Levels::Explicit(levels))
            }
            Value::String(s) if s.eq_ignore_ascii_case("categorical") => Ok(Levels::Categorical),
            Value::String(s) if s.eq_ignore_ascii_case("auto") => Ok(Levels::default()),
            Value::Object(map) => {
                if map.get("categorical").and_then(Value::as_bool) == Some(true) {
                    return Ok(Levels::Categorical);
                }
                if let Some(levels) = map.get("levels").filter(|v| !v.is_null()) {
                    return Self::from_value(levels);
                }
                if let Some(step) = map.get("step").and_then(Value::as_f64) {
                    return Ok(Levels::Step {
                        step,
                        reference: map.get("reference").and_then(Value::as_f64),
                    });
                }
                if let Some(count) = map.get("count").and_then(Value::as_u64) {
                    return Ok(Levels::Count(count.max(1) as usize));
                }
                Ok(Levels::Auto {
                    divergence_point: map.get("divergence_point").and_then(Value::as_f64),
                })
            }
            other => Err(IsobarError::invalid("levels", format!("cannot read levels from {}", other))),
        }
    }

    /// Levels that do not depend on the data, if any.
    pub fn fixed(&self) -> Option<&[f64]> {
        match self {
            Levels::Explicit(levels) => Some(levels),
            _ => None,
        }
    }

    /// Generate levels for some data. NaNs are ignored.
    pub fn apply(&self, data: impl IntoIterator<Item = f64>) -> Result<Vec<f64>> {
        if let Levels::Explicit(levels) = self {
            return Ok(levels.clone());
        }
        if let Levels::Categorical = self {
            return Ok(categorical_range(data));
        }

        let (min, max) = data
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::NAN, f64::NAN), |(lo, hi), v| (lo.min(v), hi.max(v)));
        self.apply_range(min, max)
    }

    /// Generate levels for a known data range.
    pub fn apply_range(&self, min: f64, max: f64) -> Result<Vec<f64>> {
        match self {
            Levels::Auto { divergence_point } => {
                Ok(auto_range(min, max, DEFAULT_LEVEL_COUNT, *divergence_point))
            }
            Levels::Count(n) => Ok(auto_range(min, max, *n, None)),
            Levels::Step { step, reference } => step_range(min, max, *step, *reference),
            Levels::Explicit(levels) => Ok(levels.clone()),
            Levels::Categorical => Ok(categorical_range([min, max])),
        }
    }
}
