//! X-axis mode selection and result-set preparation.

use serde::Serialize;

use super::fields::discover_field_paths;
use super::RawResultSeries;
use crate::error::CoreError;
use crate::panel_config::{
    XAxis, X_AXIS_MODES, X_AXIS_MODE_ELASTIC, X_AXIS_MODE_SERIES, X_AXIS_MODE_TABLE,
    X_AXIS_MODE_TIME,
};

/// How raw results are reshaped into points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    TimeSeries,
    Table,
    DocumentFields,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimeSeries => "time series",
            Self::Table => "table",
            Self::DocumentFields => "document fields",
        }
    }

    /// Table and document modes plot only the first result.
    pub fn is_single_result(&self) -> bool {
        matches!(self, Self::Table | Self::DocumentFields)
    }
}

/// A selectable x-axis source: a table column or a document field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XAxisColumn {
    pub text: String,
    /// Column position for tables; position in discovery order for fields.
    pub index: usize,
}

/// Parse the configured x-axis mode.
///
/// `time` and `series` share the time-series handler; `series` only
/// changes how the render surface buckets values. Unknown modes are
/// rejected.
pub fn select_mode(xaxis: &XAxis) -> Result<Mode, CoreError> {
    match xaxis.mode.as_str() {
        X_AXIS_MODE_TIME | X_AXIS_MODE_SERIES => Ok(Mode::TimeSeries),
        X_AXIS_MODE_TABLE => Ok(Mode::Table),
        X_AXIS_MODE_ELASTIC => Ok(Mode::DocumentFields),
        other => {
            let valid: Vec<&str> = X_AXIS_MODES.iter().map(|(_, v)| *v).collect();
            Err(CoreError::Validation(format!(
                "Invalid x-axis mode '{other}'. Must be one of: {}",
                valid.join(", ")
            )))
        }
    }
}

/// Truncate single-result modes to their first result and return the
/// x-axis descriptors exposed back to the editor.
///
/// In table mode an unset value column defaults to the last column.
/// Time mode leaves `results` untouched and returns no descriptors.
pub fn prepare_results(
    mode: Mode,
    results: &mut Vec<RawResultSeries>,
    xaxis: &mut XAxis,
) -> Vec<XAxisColumn> {
    if !mode.is_single_result() || results.is_empty() {
        return Vec::new();
    }
    results.truncate(1);

    match (mode, &results[0]) {
        (Mode::Table, RawResultSeries::Table(table)) => {
            let columns: Vec<XAxisColumn> = table
                .columns
                .iter()
                .enumerate()
                .map(|(index, c)| XAxisColumn {
                    text: c.text.clone(),
                    index,
                })
                .collect();
            if xaxis.value_column_index.is_none() {
                xaxis.value_column_index = columns.len().checked_sub(1);
            }
            columns
        }
        (Mode::DocumentFields, RawResultSeries::Documents(docs)) => docs
            .datapoints
            .first()
            .map(discover_field_paths)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, text)| XAxisColumn { text, index })
            .collect(),
        // Shape mismatches surface from extract_points.
        _ => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
