//! Per-mode point extraction.

use serde_json::Value;

use super::fields::pluck_deep;
use super::{Datapoint, DocumentResult, Mode, RawResultSeries, TableResult};
use crate::error::CoreError;
use crate::panel_config::XAxis;

/// Reshape one raw result into `[value, x]` points and its alias.
///
/// The result's shape must match the mode; a mismatch is a validation
/// error.
pub fn extract_points(
    raw: &RawResultSeries,
    mode: Mode,
    xaxis: &XAxis,
) -> Result<(Vec<Datapoint>, String), CoreError> {
    match (mode, raw) {
        (Mode::TimeSeries, RawResultSeries::TimeSeries(ts)) => {
            Ok((ts.datapoints.clone(), ts.target.clone()))
        }
        (Mode::Table, RawResultSeries::Table(table)) => table_points(table, xaxis),
        (Mode::DocumentFields, RawResultSeries::Documents(docs)) => Ok(document_points(docs, xaxis)),
        (mode, raw) => Err(CoreError::Validation(format!(
            "{} mode cannot plot a {} result",
            mode.as_str(),
            raw.shape_name()
        ))),
    }
}

/// Y from the value column (last cell when unset), X from the x column
/// (first cell when unset). Short rows yield nulls.
fn table_points(table: &TableResult, xaxis: &XAxis) -> Result<(Vec<Datapoint>, String), CoreError> {
    let alias = match xaxis.value_column_index {
        Some(idx) => table
            .columns
            .get(idx)
            .map(|c| c.text.clone())
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "value column index {idx} is out of range for {} columns",
                    table.columns.len()
                ))
            })?,
        None => table
            .columns
            .last()
            .map(|c| c.text.clone())
            .unwrap_or_default(),
    };

    let x_idx = xaxis.column_index.unwrap_or(0);
    let points = table
        .rows
        .iter()
        .map(|row| {
            let y = match xaxis.value_column_index {
                Some(idx) => row.get(idx),
                None => row.last(),
            };
            Datapoint(
                y.cloned().unwrap_or(Value::Null),
                row.get(x_idx).cloned().unwrap_or(Value::Null),
            )
        })
        .collect();

    Ok((points, alias))
}

/// Y and X by dot path; documents without a Y value are dropped.
fn document_points(docs: &DocumentResult, xaxis: &XAxis) -> (Vec<Datapoint>, String) {
    let Some(value_field) = xaxis.es_value_field.as_deref() else {
        return (Vec::new(), String::new());
    };

    let points = docs
        .datapoints
        .iter()
        .filter_map(|doc| {
            let y = pluck_deep(doc, value_field)?;
            let x = xaxis
                .es_field
                .as_deref()
                .and_then(|field| pluck_deep(doc, field))
                .cloned()
                .unwrap_or(Value::Null);
            Some(Datapoint(y.clone(), x))
        })
        .collect();

    (points, value_field.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{ColumnDescriptor, DocsTag, TimeSeriesResult};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn table(cols: &[&str], rows: Value) -> RawResultSeries {
        RawResultSeries::Table(TableResult {
            columns: cols
                .iter()
                .map(|c| ColumnDescriptor {
                    text: c.to_string(),
                })
                .collect(),
            rows: serde_json::from_value(rows).unwrap(),
            unit: None,
        })
    }

    fn docs(items: Value) -> RawResultSeries {
        RawResultSeries::Documents(DocumentResult {
            kind: DocsTag::Docs,
            datapoints: serde_json::from_value(items).unwrap(),
            unit: None,
        })
    }

    // -- time series -----------------------------------------------------

    #[test]
    fn time_series_is_identity() {
        let points = vec![
            Datapoint::new(1.5, 1000),
            Datapoint(Value::Null, json!(2000)),
            Datapoint::new(-3, 3000),
        ];
        let raw = RawResultSeries::TimeSeries(TimeSeriesResult {
            target: "cpu".into(),
            datapoints: points.clone(),
            unit: None,
        });
        let (out, alias) = extract_points(&raw, Mode::TimeSeries, &XAxis::default()).unwrap();
        assert_eq!(out, points);
        assert_eq!(alias, "cpu");
    }

    // -- table -----------------------------------------------------------

    #[test]
    fn table_scenario() {
        let raw = table(&["x", "y"], json!([[1, 10], [2, 20]]));
        let xaxis = XAxis {
            column_index: Some(0),
            value_column_index: Some(1),
            ..Default::default()
        };
        let (points, alias) = extract_points(&raw, Mode::Table, &xaxis).unwrap();
        assert_eq!(points, vec![Datapoint::new(10, 1), Datapoint::new(20, 2)]);
        assert_eq!(alias, "y");
    }

    #[test]
    fn table_unset_value_column_uses_last_cell() {
        let raw = table(&["t", "a", "b"], json!([[1, 5, 9], [2, 6]]));
        let (points, alias) = extract_points(&raw, Mode::Table, &XAxis::default()).unwrap();
        assert_eq!(points, vec![Datapoint::new(9, 1), Datapoint::new(6, 2)]);
        assert_eq!(alias, "b");
    }

    #[test]
    fn table_short_row_yields_null() {
        let raw = table(&["t", "v"], json!([[1]]));
        let xaxis = XAxis {
            value_column_index: Some(1),
            ..Default::default()
        };
        let (points, _) = extract_points(&raw, Mode::Table, &xaxis).unwrap();
        assert_eq!(points, vec![Datapoint(Value::Null, json!(1))]);
    }

    #[test]
    fn table_value_column_out_of_range() {
        let raw = table(&["t"], json!([[1]]));
        let xaxis = XAxis {
            value_column_index: Some(4),
            ..Default::default()
        };
        assert_matches!(
            extract_points(&raw, Mode::Table, &xaxis),
            Err(CoreError::Validation(_))
        );
    }

    // -- documents -------------------------------------------------------

    #[test]
    fn documents_drop_absent_values() {
        let raw = docs(json!([
            {"ts": 1, "m": {"v": 1}},
            {"ts": 2, "m": {"v": 0}},
            {"ts": 3, "m": {}},
            {"ts": 4, "m": {"v": 4}},
            {"ts": 5},
            {"ts": 6, "m": {"v": 6}},
            {"ts": 7, "m": {"v": 7}}
        ]));
        let xaxis = XAxis {
            es_field: Some("ts".into()),
            es_value_field: Some("m.v".into()),
            ..Default::default()
        };
        let (points, alias) = extract_points(&raw, Mode::DocumentFields, &xaxis).unwrap();
        assert_eq!(points.len(), 5);
        assert_eq!(points[1], Datapoint::new(0, 2));
        assert_eq!(alias, "m.v");
    }

    #[test]
    fn documents_missing_x_becomes_null() {
        let raw = docs(json!([{"v": 3}]));
        let xaxis = XAxis {
            es_field: Some("when".into()),
            es_value_field: Some("v".into()),
            ..Default::default()
        };
        let (points, _) = extract_points(&raw, Mode::DocumentFields, &xaxis).unwrap();
        assert_eq!(points, vec![Datapoint(json!(3), Value::Null)]);
    }

    #[test]
    fn documents_without_value_field_yield_nothing() {
        let raw = docs(json!([{"v": 3}]));
        let (points, alias) =
            extract_points(&raw, Mode::DocumentFields, &XAxis::default()).unwrap();
        assert!(points.is_empty());
        assert_eq!(alias, "");
    }

    // -- shape mismatch --------------------------------------------------

    #[test]
    fn mismatched_shape_is_rejected() {
        let raw = table(&["t"], json!([]));
        let err = extract_points(&raw, Mode::TimeSeries, &XAxis::default()).unwrap_err();
        assert_matches!(err, CoreError::Validation(ref msg) if msg.contains("table result"));
    }
}
