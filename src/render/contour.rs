//! Contour lines (isolines) by marching squares.
//!
//! Grids are row-major with `width` columns and `height` rows; output
//! points are in fractional grid coordinates (`x` = column, `y` = row), so
//! callers map them onto pixels or projected coordinates themselves.

/// A point in grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A line segment between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

/// A connected contour line at one level.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub level: f32,
    pub points: Vec<Point>,
    pub closed: bool,
}

impl Contour {
    /// Total length along the line.
    pub fn length(&self) -> f32 {
        self.points.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }

    /// The point halfway along the line.
    pub fn midpoint(&self) -> Option<Point> {
        let half = self.length() / 2.0;
        let mut walked = 0.0;
        for pair in self.points.windows(2) {
            let step = pair[0].distance(&pair[1]);
            if walked + step >= half && step > 0.0 {
                let t = (half - walked) / step;
                return Some(Point::new(
                    pair[0].x + t * (pair[1].x - pair[0].x),
                    pair[0].y + t * (pair[1].y - pair[0].y),
                ));
            }
            walked += step;
        }
        self.points.first().copied()
    }
}

const EPSILON: f32 = 1e-3;

/// Extract the line segments where `data` crosses `level`.
///
/// Cells with a NaN corner are skipped.
pub fn march_squares(data: &[f32], width: usize, height: usize, level: f32) -> Vec<Segment> {
    if width < 2 || height < 2 || data.len() != width * height {
        return vec![];
    }

    let mut segments = Vec::new();
    for y in 0..(height - 1) {
        for x in 0..(width - 1) {
            let tl = data[y * width + x];
            let tr = data[y * width + x + 1];
            let bl = data[(y + 1) * width + x];
            let br = data[(y + 1) * width + x + 1];

            if tl.is_nan() || tr.is_nan() || bl.is_nan() || br.is_nan() {
                continue;
            }

            let mut case = 0u8;
            if tl >= level {
                case |= 1;
            }
            if tr >= level {
                case |= 2;
            }
            if br >= level {
                case |= 4;
            }
            if bl >= level {
                case |= 8;
            }

            let corners = Corners { tl, tr, br, bl };
            cell_segments(case, x as f32, y as f32, &corners, level, &mut segments);
        }
    }
    segments
}

struct Corners {
    tl: f32,
    tr: f32,
    br: f32,
    bl: f32,
}

fn cell_segments(case: u8, x: f32, y: f32, c: &Corners, level: f32, out: &mut Vec<Segment>) {
    let top = interpolate_edge((x, y), (x + 1.0, y), c.tl, c.tr, level);
    let right = interpolate_edge((x + 1.0, y), (x + 1.0, y + 1.0), c.tr, c.br, level);
    let bottom = interpolate_edge((x, y + 1.0), (x + 1.0, y + 1.0), c.bl, c.br, level);
    let left = interpolate_edge((x, y), (x, y + 1.0), c.tl, c.bl, level);

    let mut push = |start: Point, end: Point| out.push(Segment { start, end });
    match case {
        1 | 14 => push(left, top),
        2 | 13 => push(top, right),
        3 | 12 => push(left, right),
        4 | 11 => push(right, bottom),
        6 | 9 => push(top, bottom),
        7 | 8 => push(left, bottom),
        // Saddles: resolve by the cell mean.
        5 | 10 => {
            let centre_above = (c.tl + c.tr + c.br + c.bl) / 4.0 >= level;
            if (case == 5) == centre_above {
                push(left, bottom);
                push(top, right);
            } else {
                push(left, top);
                push(right, bottom);
            }
        }
        _ => {}
    }
}

/// Where `level` crosses the edge from `a` (value `va`) to `b` (value `vb`).
fn interpolate_edge(a: (f32, f32), b: (f32, f32), va: f32, vb: f32, level: f32) -> Point {
    if (vb - va).abs() < 1e-6 {
        return Point::new((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
    }
    let t = ((level - va) / (vb - va)).clamp(0.0, 1.0);
    Point::new(a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1))
}

/// Join unordered segments into polylines. Lines are grown from both ends,
/// and a line whose ends meet is marked closed.
pub fn connect_segments(segments: Vec<Segment>) -> Vec<Contour> {
    let mut contours = Vec::new();
    let mut used = vec![false; segments.len()];

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut points = std::collections::VecDeque::from(vec![segments[start].start, segments[start].end]);

        loop {
            let (Some(&head), Some(&tail)) = (points.front(), points.back()) else {
                break;
            };
            let mut extended = false;
            for (i, seg) in segments.iter().enumerate() {
                if used[i] {
                    continue;
                }
                if seg.start.distance(&tail) < EPSILON {
                    points.push_back(seg.end);
                } else if seg.end.distance(&tail) < EPSILON {
                    points.push_back(seg.start);
                } else if seg.end.distance(&head) < EPSILON {
                    points.push_front(seg.start);
                } else if seg.start.distance(&head) < EPSILON {
                    points.push_front(seg.end);
                } else {
                    continue;
                }
                used[i] = true;
                extended = true;
                break;
            }
            if !extended {
                break;
            }
        }

        let points: Vec<Point> = points.into_iter().collect();
        let closed = points.len() > 2 && points[0].distance(&points[points.len() - 1]) < EPSILON;
        contours.push(Contour {
            level: 0.0,
            points,
            closed,
        });
    }
    contours
}

/// Chaikin corner cutting. Open lines keep their end points.
pub fn smooth_polyline(contour: &Contour, iterations: u32) -> Contour {
    if iterations == 0 || contour.points.len() < 3 {
        return contour.clone();
    }

    // A closed line repeats its first point at the end; drop it while
    // cutting corners and restore it afterwards.
    let mut points = contour.points.clone();
    if contour.closed {
        points.pop();
    }

    for _ in 0..iterations {
        let n = points.len();
        let pairs = if contour.closed { n } else { n - 1 };
        let mut next = Vec::with_capacity(pairs * 2 + 2);
        if !contour.closed {
            next.push(points[0]);
        }
        for i in 0..pairs {
            let p1 = points[i];
            let p2 = points[(i + 1) % n];
            next.push(Point::new(0.75 * p1.x + 0.25 * p2.x, 0.75 * p1.y + 0.25 * p2.y));
            next.push(Point::new(0.25 * p1.x + 0.75 * p2.x, 0.25 * p1.y + 0.75 * p2.y));
        }
        if !contour.closed {
            next.push(points[n - 1]);
        }
        points = next;
    }

    if contour.closed {
        if let Some(first) = points.first().copied() {
            points.push(first);
        }
    }
    Contour {
        level: contour.level,
        points,
        closed: contour.closed,
    }
}

/// All contour lines for `levels`, smoothed with `smoothing` Chaikin passes.
pub fn contour_lines(data: &[f32], width: usize, height: usize, levels: &[f32], smoothing: u32) -> Vec<Contour> {
    levels
        .iter()
        .flat_map(|&level| {
            connect_segments(march_squares(data, width, height, level))
                .into_iter()
                .map(move |mut contour| {
                    contour.level = level;
                    smooth_polyline(&contour, smoothing)
                })
        })
        .collect()
}

/// Which values fall in the band `lower <= v < upper`. NaN is never inside.
pub fn filled_band_mask(data: &[f32], lower: f32, upper: f32) -> Vec<bool> {
    data.iter().map(|v| *v >= lower && *v < upper).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_march_squares_flat() {
        let data = vec![1.0; 9];
        assert!(march_squares(&data, 3, 3, 0.5).is_empty());
    }

    #[test]
    fn test_march_squares_simple() {
        // A single high corner.
        let data = vec![1.0, 0.0, 0.0, 0.0];
        let segments = march_squares(&data, 2, 2, 0.5);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, Point::new(0.0, 0.5));
        assert_eq!(segments[0].end, Point::new(0.5, 0.0));
    }

    #[test]
    fn test_march_squares_skips_nan_cells() {
        let data = vec![1.0, f32::NAN, 0.0, 0.0];
        assert!(march_squares(&data, 2, 2, 0.5).is_empty());
        assert!(march_squares(&data, 3, 2, 0.5).is_empty());
    }

    #[test]
    fn test_peak_makes_closed_ring() {
        // A 5x5 grid with a peak in the middle.
        let mut data = vec![0.0f32; 25];
        data[12] = 10.0;
        let contours = connect_segments(march_squares(&data, 5, 5, 5.0));
        assert_eq!(contours.len(), 1);
        assert!(contours[0].closed);
        assert_eq!(contours[0].points.len(), 5);
    }

    #[test]
    fn test_connect_open_line_from_middle() {
        // A ramp gives one straight open line even when the first segment
        // found is in the middle.
        let data: Vec<f32> = (0..12).map(|i| (i % 4) as f32).collect();
        let mut segments = march_squares(&data, 4, 3, 1.5);
        segments.swap(0, 1);
        let contours = connect_segments(segments);
        assert_eq!(contours.len(), 1);
        assert!(!contours[0].closed);
        assert_eq!(contours[0].points.len(), 3);
    }

    #[test]
    fn test_smooth_polyline() {
        let open = Contour {
            level: 1.0,
            points: vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 0.0)],
            closed: false,
        };
        let smoothed = smooth_polyline(&open, 1);
        assert_eq!(smoothed.points.len(), 6);
        assert_eq!(smoothed.points[0], open.points[0]);
        assert_eq!(smoothed.points[5], open.points[2]);
        assert_eq!(smoothed.level, 1.0);

        let ring = Contour {
            level: 0.0,
            points: vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 1.0),
                Point::new(0.0, 0.0),
            ],
            closed: true,
        };
        let smoothed = smooth_polyline(&ring, 2);
        assert_eq!(smoothed.points.first(), smoothed.points.last());
        assert_eq!(smoothed.points.len(), 13);
    }

    #[test]
    fn test_contour_midpoint() {
        let line = Contour {
            level: 0.0,
            points: vec![Point::new(0.0, 0.0), Point::new(4.0, 0.0)],
            closed: false,
        };
        assert_eq!(line.length(), 4.0);
        assert_eq!(line.midpoint(), Some(Point::new(2.0, 0.0)));
    }

    #[test]
    fn test_filled_band_mask() {
        let mask = filled_band_mask(&[0.0, 1.0, 2.0, f32::NAN], 1.0, 2.0);
        assert_eq!(mask, vec![false, true, false, false]);
    }

    #[test]
    fn test_contour_lines_sets_levels() {
        let mut data = vec![0.0f32; 25];
        data[12] = 10.0;
        let contours = contour_lines(&data, 5, 5, &[2.0, 8.0], 0);
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0].level, 2.0);
        assert_eq!(contours[1].level, 8.0);
    }
}
