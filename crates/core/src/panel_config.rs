//! Graph panel configuration model.
//!
//! Mirrors the persisted panel JSON. Every struct deserializes with
//! `#[serde(default)]` so a stored panel missing keys is filled in with
//! the defaults below.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_AXIS_FORMAT: &str = "short";

pub const X_AXIS_MODE_TIME: &str = "time";
pub const X_AXIS_MODE_SERIES: &str = "series";
pub const X_AXIS_MODE_TABLE: &str = "table";
pub const X_AXIS_MODE_ELASTIC: &str = "elastic";

/// Display label and stored value of every x-axis mode.
pub const X_AXIS_MODES: &[(&str, &str)] = &[
    ("Time", X_AXIS_MODE_TIME),
    ("Series", X_AXIS_MODE_SERIES),
    ("Table", X_AXIS_MODE_TABLE),
    ("Elastic Raw Doc", X_AXIS_MODE_ELASTIC),
];

/// Aggregations available when the x-axis shows one bucket per series.
pub const X_AXIS_SERIES_VALUES: &[&str] = &["min", "max", "avg", "current", "total"];

/// Log scale choices for a y-axis.
pub const LOG_SCALES: &[(&str, u32)] = &[
    ("linear", 1),
    ("log (base 2)", 2),
    ("log (base 10)", 10),
    ("log (base 32)", 32),
    ("log (base 1024)", 1024),
];

// ---------------------------------------------------------------------------
// Axes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct YAxis {
    pub label: Option<String>,
    pub show: bool,
    pub log_base: u32,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub format: String,
}

impl Default for YAxis {
    fn default() -> Self {
        Self {
            label: None,
            show: true,
            log_base: 1,
            min: None,
            max: None,
            format: DEFAULT_AXIS_FORMAT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct XAxis {
    pub show: bool,
    pub mode: String,
    pub series_value: String,
    /// Table mode: column supplying the X value.
    pub column_index: Option<usize>,
    /// Table mode: column supplying the Y value.
    pub value_column_index: Option<usize>,
    /// Document mode: dot path of the X value.
    pub es_field: Option<String>,
    /// Document mode: dot path of the Y value.
    pub es_value_field: Option<String>,
}

impl Default for XAxis {
    fn default() -> Self {
        Self {
            show: true,
            mode: X_AXIS_MODE_TIME.to_string(),
            series_value: "avg".to_string(),
            column_index: None,
            value_column_index: None,
            es_field: None,
            es_value_field: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Legend / tooltip
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendOptions {
    pub show: bool,
    pub values: bool,
    pub min: bool,
    pub max: bool,
    pub current: bool,
    pub total: bool,
    pub avg: bool,
}

impl Default for LegendOptions {
    fn default() -> Self {
        Self {
            show: true,
            values: false,
            min: false,
            max: false,
            current: false,
            total: false,
            avg: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TooltipOptions {
    pub value_type: String,
    pub shared: bool,
    pub sort: u8,
    pub ms_resolution: bool,
}

impl Default for TooltipOptions {
    fn default() -> Self {
        Self {
            value_type: "cumulative".to_string(),
            shared: true,
            sort: 0,
            ms_resolution: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Series overrides
// ---------------------------------------------------------------------------

/// Per-alias style override. `alias` is either an exact series alias or
/// a `/regex/` pattern.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesOverride {
    pub alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<bool>,
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PanelConfig {
    pub yaxes: [YAxis; 2],
    pub xaxis: XAxis,
    pub lines: bool,
    pub fill: u8,
    pub linewidth: u8,
    pub points: bool,
    pub pointradius: u8,
    pub bars: bool,
    pub stack: bool,
    pub percentage: bool,
    pub legend: LegendOptions,
    pub null_point_mode: String,
    pub stepped_line: bool,
    pub tooltip: TooltipOptions,
    pub alias_colors: HashMap<String, String>,
    pub series_overrides: Vec<SeriesOverride>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            yaxes: [YAxis::default(), YAxis::default()],
            xaxis: XAxis::default(),
            lines: true,
            fill: 1,
            linewidth: 2,
            points: false,
            pointradius: 5,
            bars: false,
            stack: false,
            percentage: false,
            legend: LegendOptions::default(),
            null_point_mode: "connected".to_string(),
            stepped_line: false,
            tooltip: TooltipOptions::default(),
            alias_colors: HashMap::new(),
            series_overrides: Vec::new(),
        }
    }
}

impl PanelConfig {
    /// Parse a stored panel document, filling missing keys with defaults.
    pub fn from_json(value: serde_json::Value) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| CoreError::Validation(format!("Invalid panel configuration: {e}")))?;
        for o in &config.series_overrides {
            if let Some(axis) = o.yaxis.filter(|a| !(1..=2).contains(a)) {
                return Err(CoreError::Validation(format!(
                    "Invalid y-axis {axis} in override for '{}'. Must be 1 or 2",
                    o.alias
                )));
            }
        }
        Ok(config)
    }

    /// Flip legend visibility.
    pub fn toggle_legend(&mut self) {
        self.legend.show = !self.legend.show;
    }

    /// Set the unit format of y-axis `axis` (1 or 2).
    pub fn set_unit_format(&mut self, axis: u8, format: &str) -> Result<(), CoreError> {
        let y = self.y_axis_mut(axis)?;
        y.format = format.to_string();
        Ok(())
    }

    pub fn y_axis_mut(&mut self, axis: u8) -> Result<&mut YAxis, CoreError> {
        match axis {
            1 => Ok(&mut self.yaxes[0]),
            2 => Ok(&mut self.yaxes[1]),
            other => Err(CoreError::Validation(format!(
                "Invalid y-axis {other}. Must be 1 or 2"
            ))),
        }
    }
}

/// Recompute the legend `values` flag after one of the value toggles
/// changed.
pub fn legend_values_option_changed(legend: &mut LegendOptions) {
    legend.values = legend.min || legend.max || legend.avg || legend.current || legend.total;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
