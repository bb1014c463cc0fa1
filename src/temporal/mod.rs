//! Subplots whose x axis is time.

pub mod stripes;
pub mod timeseries;

pub use stripes::{Stripes, DEFAULT_COLORS};
pub use timeseries::TimeSeriesPlot;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};

const DAY: f64 = 86_400.0;
const MAX_TICKS: f64 = 8.0;

/// Round datetime ticks between two unix times, with labels.
///
/// The unit (years, months, days or hours) follows the span, and the step
/// within that unit keeps the count to a handful of ticks.
pub(crate) fn time_ticks(start: f64, end: f64) -> Vec<(f64, String)> {
    let (start, end) = (start.min(end), start.max(end));
    let (Some(first), Some(last)) = (from_unix(start), from_unix(end)) else {
        return Vec::new();
    };
    let span = end - start;

    let ticks: Vec<NaiveDateTime> = if span >= 3.0 * 365.0 * DAY {
        let years = (last.year() - first.year()) as f64;
        let step = pick_step(&[1, 2, 5, 10, 20, 50, 100], years) as i32;
        let first_year = first.year() + (step - first.year().rem_euclid(step)) % step;
        (0..)
            .map(|i| first_year + i * step)
            .take_while(|year| *year <= last.year())
            .filter_map(|year| NaiveDate::from_ymd_opt(year, 1, 1))
            .filter_map(|date| date.and_hms_opt(0, 0, 0))
            .filter(|tick| *tick >= first)
            .collect()
    } else if span >= 60.0 * DAY {
        let months = span / (30.0 * DAY);
        let step = pick_step(&[1, 2, 3, 6], months) as u32;
        let mut ticks = Vec::new();
        let (mut year, mut month) = (first.year(), first.month0());
        loop {
            if month % step == 0 {
                if let Some(tick) = NaiveDate::from_ymd_opt(year, month + 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)) {
                    if tick > last {
                        break;
                    }
                    if tick >= first {
                        ticks.push(tick);
                    }
                }
            }
            month += 1;
            if month == 12 {
                month = 0;
                year += 1;
            }
        }
        ticks
    } else if span >= 2.0 * DAY {
        let step = pick_step(&[1, 2, 5, 7, 14], span / DAY);
        let midnight = first.date().and_hms_opt(0, 0, 0).unwrap_or(first);
        stepped(midnight, Duration::days(step), first, last)
    } else {
        let step = pick_step(&[1, 2, 3, 6, 12], (span / 3600.0).max(1.0));
        let hour = first.date().and_hms_opt(0, 0, 0).unwrap_or(first);
        stepped(hour, Duration::hours(step), first, last)
    };

    let format = if span >= 3.0 * 365.0 * DAY {
        "%Y"
    } else if span >= 60.0 * DAY {
        "%b %Y"
    } else if span >= 2.0 * DAY {
        "%d %b"
    } else {
        "%H:%M"
    };
    ticks
        .into_iter()
        .map(|tick| (tick.and_utc().timestamp() as f64, tick.format(format).to_string()))
        .collect()
}

fn from_unix(seconds: f64) -> Option<NaiveDateTime> {
    if !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp(seconds.floor() as i64, 0).map(|dt| dt.naive_utc())
}

/// The smallest step that gives at most [`MAX_TICKS`] ticks over `span`.
fn pick_step(steps: &[i64], span: f64) -> i64 {
    steps
        .iter()
        .copied()
        .find(|step| span / *step as f64 <= MAX_TICKS)
        .unwrap_or(steps[steps.len() - 1])
}

fn stepped(origin: NaiveDateTime, step: Duration, first: NaiveDateTime, last: NaiveDateTime) -> Vec<NaiveDateTime> {
    let mut ticks = Vec::new();
    let mut tick = origin;
    while tick <= last {
        if tick >= first {
            ticks.push(tick);
        }
        tick += step;
    }
    ticks
}
