//! Series construction: colour resolution and per-pass totals.

use std::collections::HashMap;

use serde::Serialize;

use super::{Datapoint, NormalizedSeries, SeriesStats};
use crate::error::CoreError;
use crate::types::TimeRange;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// How far (ms) the last point may precede the range start before the
/// series counts as outside the range.
pub const OUTSIDE_RANGE_TOLERANCE_MS: f64 = 10_000.0;

/// Default series colours, assigned by result index.
pub const DEFAULT_COLORS: &[&str] = &[
    "#7EB26D", "#EAB839", "#6ED0E0", "#EF843C", "#E24D42", "#1F78C1", "#BA43A6", "#705DA0",
    "#508642", "#CCA300", "#447EBC", "#C15C17", "#890F02", "#0A437C", "#6D1F62", "#584477",
    "#B7DBAB", "#F4D598", "#70DBED", "#F9BA8F", "#F29191", "#82B5D8", "#E5A8E2", "#AEA2E0",
    "#629E51", "#E5AC0E", "#64B0C8", "#E0752D", "#BF1B00", "#0A50A1", "#962D82", "#614D93",
    "#9AC48A", "#F2C96D", "#65C5DB", "#F9934E", "#EA6460", "#5195CE", "#D683CE", "#806EB7",
    "#3F6833", "#967302", "#2F575E", "#99440A", "#58140C", "#052B51", "#511749", "#3F2B5B",
    "#E0F9D7", "#FCEACA", "#CFFAFF", "#F9E2D2", "#FCE2DE", "#BADFF4", "#F9D9F9", "#DEDAF7",
];

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// Non-empty list of fallback colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette(Vec<String>);

impl Palette {
    pub fn new(colors: Vec<String>) -> Result<Self, CoreError> {
        if colors.is_empty() {
            return Err(CoreError::Validation(
                "colour palette must contain at least one colour".to_string(),
            ));
        }
        Ok(Self(colors))
    }

    /// Colour for the series at `index`; wraps around the palette.
    pub fn color_at(&self, index: usize) -> &str {
        &self.0[index % self.0.len()]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self(DEFAULT_COLORS.iter().map(|c| c.to_string()).collect())
    }
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

/// Totals threaded through every [`build_series`] call of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Accumulator {
    pub datapoints_count: usize,
    /// Some series ends more than the tolerance before the range start.
    pub datapoints_outside: bool,
    /// Some timestamp needs millisecond precision to display.
    pub ms_resolution: bool,
}

impl Accumulator {
    pub fn warning(&self) -> bool {
        self.datapoints_count == 0 || self.datapoints_outside
    }
}

/// Read-only inputs shared by every series of a pass.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub alias_colors: &'a HashMap<String, String>,
    pub palette: &'a Palette,
    pub range: &'a TimeRange,
}

impl BuildContext<'_> {
    /// Alias override first, palette slot by index otherwise.
    pub fn resolve_color(&self, alias: &str, index: usize) -> String {
        self.alias_colors
            .get(alias)
            .cloned()
            .unwrap_or_else(|| self.palette.color_at(index).to_string())
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Build the series at position `index` and return it with the updated
/// totals.
pub fn build_series(
    unit: Option<&str>,
    index: usize,
    datapoints: Vec<Datapoint>,
    alias: String,
    ctx: &BuildContext<'_>,
    mut acc: Accumulator,
) -> (NormalizedSeries, Accumulator) {
    let color = ctx.resolve_color(&alias, index);

    if let Some(last) = datapoints.last() {
        if let Some(last_ms) = last.x() {
            if last_ms - (ctx.range.from_millis() as f64) < -OUTSIDE_RANGE_TOLERANCE_MS {
                acc.datapoints_outside = true;
            }
        }
        acc.datapoints_count += datapoints.len();
        acc.ms_resolution = acc.ms_resolution || is_ms_resolution_needed(&datapoints);
    }

    let series = NormalizedSeries {
        stats: SeriesStats::from_points(&datapoints),
        alias,
        datapoints,
        color,
        unit: unit.map(str::to_string),
        yaxis: 1,
        lines: None,
        bars: None,
        points: None,
        fill: None,
        linewidth: None,
        stack: None,
        legend: true,
    };

    (series, acc)
}

/// True when any timestamp is a 13-digit epoch-ms value with a non-zero
/// millisecond (or sub-millisecond) part. Integer and float timestamps
/// are treated alike.
pub fn is_ms_resolution_needed(points: &[Datapoint]) -> bool {
    points.iter().filter_map(|p| p.1.as_f64()).any(|ts| {
        let whole = ts.trunc().abs();
        (1e12..1e13).contains(&whole) && (ts.fract() != 0.0 || whole % 1000.0 != 0.0)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
