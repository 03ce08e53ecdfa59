//! Series normalization pipeline.
//!
//! Converts a query result set in one of three shapes (time series,
//! table, raw documents) into an ordered list of [`NormalizedSeries`]
//! ready for the render surface:
//!
//! 1. [`mode::select_mode`] parses the x-axis mode and
//!    [`mode::prepare_results`] truncates single-result modes and
//!    recomputes the selectable x-axis descriptors.
//! 2. [`extract::extract_points`] reshapes each raw result into
//!    `[value, x]` pairs plus an alias.
//! 3. [`build::build_series`] resolves colour and unit and threads a
//!    [`build::Accumulator`] across the pass.
//! 4. [`finalize`] attaches the annotation outcome.

pub mod build;
pub mod extract;
pub mod fields;
pub mod mode;
pub mod overrides;
pub mod visibility;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::panel_config::PanelConfig;
use crate::types::{DbId, TimeRange};

pub use build::{build_series, Accumulator, BuildContext, Palette};
pub use extract::extract_points;
pub use mode::{prepare_results, select_mode, Mode, XAxisColumn};

// ---------------------------------------------------------------------------
// Points
// ---------------------------------------------------------------------------

/// A `[value, x]` pair. In time mode `x` is an epoch-millisecond
/// timestamp; in table and document modes it is whatever the selected
/// column or field holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datapoint(pub Value, pub Value);

impl Datapoint {
    pub fn new(value: impl Into<Value>, x: impl Into<Value>) -> Self {
        Self(value.into(), x.into())
    }

    pub fn value(&self) -> Option<f64> {
        self.0.as_f64()
    }

    pub fn x(&self) -> Option<f64> {
        self.1.as_f64()
    }
}

// ---------------------------------------------------------------------------
// Raw results
// ---------------------------------------------------------------------------

/// A time-series result: named target plus ordered points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesResult {
    pub target: String,
    #[serde(default)]
    pub datapoints: Vec<Datapoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Column header of a tabular result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub text: String,
}

/// A tabular result: ordered columns and rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableResult {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Marker for the `"type": "docs"` discriminator of document results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocsTag {
    #[serde(rename = "docs")]
    Docs,
}

/// A raw document result: each datapoint is a nested JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    #[serde(rename = "type")]
    pub kind: DocsTag,
    #[serde(default)]
    pub datapoints: Vec<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// One element of a query result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawResultSeries {
    Table(TableResult),
    Documents(DocumentResult),
    TimeSeries(TimeSeriesResult),
}

impl RawResultSeries {
    pub fn unit(&self) -> Option<&str> {
        match self {
            Self::Table(t) => t.unit.as_deref(),
            Self::Documents(d) => d.unit.as_deref(),
            Self::TimeSeries(ts) => ts.unit.as_deref(),
        }
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::Table(_) => "table",
            Self::Documents(_) => "docs",
            Self::TimeSeries(_) => "time series",
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized output
// ---------------------------------------------------------------------------

/// Summary statistics of a series' numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    /// Last non-null value.
    pub current: Option<f64>,
    pub total: f64,
    pub count: usize,
}

impl SeriesStats {
    pub fn from_points(points: &[Datapoint]) -> Self {
        let mut stats = Self::default();
        for value in points.iter().filter_map(Datapoint::value) {
            stats.min = Some(stats.min.map_or(value, |m| m.min(value)));
            stats.max = Some(stats.max.map_or(value, |m| m.max(value)));
            stats.total += value;
            stats.count += 1;
            stats.current = Some(value);
        }
        if stats.count > 0 {
            stats.avg = Some(stats.total / stats.count as f64);
        }
        stats
    }

    /// Look up the aggregate named by the x-axis `seriesValue` setting.
    pub fn by_name(&self, name: &str) -> Option<f64> {
        match name {
            "min" => self.min,
            "max" => self.max,
            "avg" => self.avg,
            "current" => self.current,
            "total" => Some(self.total),
            _ => None,
        }
    }
}

/// A render-ready series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSeries {
    pub alias: String,
    pub datapoints: Vec<Datapoint>,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// 1 or 2.
    pub yaxis: u8,
    pub stats: SeriesStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bars: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linewidth: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<bool>,
    /// `false` hides the series from the legend.
    pub legend: bool,
}

/// Result of one normalization pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Normalized {
    pub mode: Mode,
    pub series: Vec<NormalizedSeries>,
    pub totals: Accumulator,
    /// Set when nothing was plotted or data lies before the range.
    pub warning: bool,
    /// Selectable x-axis columns (table) or field paths (documents).
    pub x_axis_columns: Vec<XAxisColumn>,
}

/// Run a full normalization pass over `results`.
///
/// Single-result modes truncate `results` to its first element and may
/// default `config.xaxis.value_column_index`. The accumulator starts
/// fresh on every call; its ms-resolution flag is folded into
/// `config.tooltip.ms_resolution`.
pub fn normalize(
    mut results: Vec<RawResultSeries>,
    config: &mut PanelConfig,
    range: &TimeRange,
    palette: &Palette,
) -> Result<Normalized, CoreError> {
    let mode = select_mode(&config.xaxis)?;
    let x_axis_columns = prepare_results(mode, &mut results, &mut config.xaxis);

    let ctx = BuildContext {
        alias_colors: &config.alias_colors,
        palette,
        range,
    };

    let mut acc = Accumulator::default();
    let mut series = Vec::with_capacity(results.len());
    for (index, raw) in results.iter().enumerate() {
        let (points, alias) = extract_points(raw, mode, &config.xaxis)?;
        let (built, next) = build_series(raw.unit(), index, points, alias, &ctx, acc);
        acc = next;
        series.push(built);
    }

    config.tooltip.ms_resolution = config.tooltip.ms_resolution || acc.ms_resolution;

    Ok(Normalized {
        mode,
        warning: acc.warning(),
        series,
        totals: acc,
        x_axis_columns,
    })
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

/// An event marker drawn over the graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Annotation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboard_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub panel_id: Option<DbId>,
    /// Epoch milliseconds.
    pub time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<i64>,
    pub text: String,
    pub tags: Vec<String>,
}

/// A series list ready to draw, with annotations when they resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    pub series: Vec<NormalizedSeries>,
    pub annotations: Vec<Annotation>,
    /// `false` when the annotation fetch failed.
    pub annotations_loaded: bool,
}

/// Attach the annotation outcome. A failed fetch still yields a frame;
/// the series list is complete either way.
pub fn finalize<E>(
    series: Vec<NormalizedSeries>,
    annotations: Result<Vec<Annotation>, E>,
) -> RenderFrame {
    match annotations {
        Ok(annotations) => RenderFrame {
            series,
            annotations,
            annotations_loaded: true,
        },
        Err(_) => RenderFrame {
            series,
            annotations: Vec::new(),
            annotations_loaded: false,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
