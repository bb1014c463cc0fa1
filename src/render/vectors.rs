//! Wind arrows and barbs.
//!
//! Glyphs are built in pixel space. Angles are counter-clockwise from the
//! +x axis with y pointing up, as on the page; the caller turns map
//! directions into page directions before asking for a glyph.

use ndarray::{Array2, ArrayView2, Zip};
use std::f64::consts::PI;

use super::{Canvas, PixelRect};

/// Speed represented by a triangular pennant.
pub const PENNANT: f64 = 50.0;
/// Speed represented by a full barb line.
pub const FULL_BARB: f64 = 10.0;
/// Speed represented by a half barb line.
pub const HALF_BARB: f64 = 5.0;

/// Speed and the direction the wind blows from, as an angle in `[0, 2π)`.
///
/// A wind from the north, `(0, -10)`, gives `π/2`; from the west,
/// `(10, 0)`, gives `π`.
pub fn uv_to_speed_direction(u: f32, v: f32) -> (f64, f64) {
    let (u, v) = (u as f64, v as f64);
    let speed = u.hypot(v);
    let mut direction = (-v).atan2(-u);
    if direction < 0.0 {
        direction += 2.0 * PI;
    }
    (speed, direction)
}

/// Speed at every grid point.
pub fn magnitude(u: ArrayView2<'_, f32>, v: ArrayView2<'_, f32>) -> Array2<f32> {
    Zip::from(u).and(v).map_collect(|u, v| u.hypot(*v))
}

/// Glyph centres on a regular lattice, `spacing` pixels apart and starting
/// half a spacing in from the top-left corner of `rect`.
pub fn glyph_positions(rect: PixelRect, spacing: f32) -> Vec<(f32, f32)> {
    let mut positions = Vec::new();
    if spacing <= 0.0 {
        return positions;
    }
    let mut y = spacing / 2.0;
    while y < rect.height {
        let mut x = spacing / 2.0;
        while x < rect.width {
            positions.push((rect.x + x, rect.y + y));
            x += spacing;
        }
        y += spacing;
    }
    positions
}

/// How many of each barb element a speed needs, after rounding to the
/// nearest half barb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarbIncrements {
    pub pennants: u32,
    pub full: u32,
    pub half: u32,
}

impl BarbIncrements {
    pub fn from_speed(speed: f64) -> Self {
        let halves = (speed.max(0.0) / HALF_BARB).round() as u32;
        let per_pennant = (PENNANT / HALF_BARB) as u32;
        let per_full = (FULL_BARB / HALF_BARB) as u32;
        let rest = halves % per_pennant;
        Self {
            pennants: halves / per_pennant,
            full: rest / per_full,
            half: rest % per_full,
        }
    }

    /// Below half of [`HALF_BARB`]; drawn as a circle.
    pub fn is_calm(&self) -> bool {
        self.pennants == 0 && self.full == 0 && self.half == 0
    }
}

/// Lines to stroke and shapes to fill for one glyph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Glyph {
    pub lines: Vec<Vec<(f32, f32)>>,
    pub fills: Vec<Vec<(f32, f32)>>,
}

impl Glyph {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.fills.is_empty()
    }

    pub fn draw(&self, canvas: &mut Canvas, color: [u8; 4], width: f32) {
        for line in &self.lines {
            canvas.stroke_polyline(line, color, width, None, false);
        }
        for shape in &self.fills {
            canvas.fill_polygon(std::slice::from_ref(shape), color);
        }
    }
}

/// Page-space unit vector for `angle`; y grows downwards on the canvas.
fn unit(angle: f64) -> (f32, f32) {
    (angle.cos() as f32, -(angle.sin() as f32))
}

fn offset(point: (f32, f32), direction: (f32, f32), distance: f32) -> (f32, f32) {
    (point.0 + direction.0 * distance, point.1 + direction.1 * distance)
}

/// An arrow `length` pixels long, centred on `(x, y)` and pointing along
/// `angle`.
pub fn arrow(x: f32, y: f32, angle: f64, length: f32) -> Glyph {
    if length.is_nan() || length < 0.5 {
        return Glyph::default();
    }
    let along = unit(angle);
    let across = (-along.1, along.0);
    let tail = offset((x, y), along, -length / 2.0);
    let tip = offset((x, y), along, length / 2.0);
    let head = (length * 0.3).clamp(2.0, 8.0).min(length);
    let base = offset(tip, along, -head);

    Glyph {
        lines: vec![vec![tail, base]],
        fills: vec![vec![tip, offset(base, across, head * 0.45), offset(base, across, -head * 0.45)]],
    }
}

/// A wind barb rooted at `(x, y)` whose staff, `length` pixels long, points
/// towards `from`, the direction the wind blows from. Calm winds give a
/// small circle.
pub fn barb(x: f32, y: f32, speed: f64, from: f64, length: f32) -> Glyph {
    let increments = BarbIncrements::from_speed(speed);
    if increments.is_calm() {
        return Glyph {
            lines: vec![circle(x, y, (length * 0.15).max(1.5))],
            fills: Vec::new(),
        };
    }

    let staff = unit(from);
    // Feathers sit on the clockwise side of the staff.
    let side = (-staff.1, staff.0);
    let feather = length * 0.4;
    let step = length * 0.15;
    let slant = |at: (f32, f32), size: f32| {
        let tip = offset(offset(at, side, size), staff, size * 0.3);
        vec![at, tip]
    };

    let root = (x, y);
    let mut glyph = Glyph {
        lines: vec![vec![root, offset(root, staff, length)]],
        fills: Vec::new(),
    };
    let mut along = length;
    for _ in 0..increments.pennants {
        let outer = offset(root, staff, along);
        let inner = offset(root, staff, along - step);
        glyph.fills.push(vec![outer, offset(outer, side, feather), inner]);
        along -= step * 1.3;
    }
    for _ in 0..increments.full {
        glyph.lines.push(slant(offset(root, staff, along), feather));
        along -= step;
    }
    if increments.half > 0 {
        // A lone half barb stands off the end of the staff so it reads as half.
        if increments.pennants == 0 && increments.full == 0 {
            along -= step;
        }
        glyph.lines.push(slant(offset(root, staff, along), feather / 2.0));
    }
    glyph
}

fn circle(x: f32, y: f32, radius: f32) -> Vec<(f32, f32)> {
    const SEGMENTS: usize = 16;
    (0..=SEGMENTS)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / SEGMENTS as f64;
            (x + radius * angle.cos() as f32, y + radius * angle.sin() as f32)
        })
        .collect()
}
