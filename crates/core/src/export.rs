//! CSV export of a normalized series list.
//!
//! Two layouts: one row per datapoint (`Series;Time;Value`), or one row
//! per timestamp with a column per series (`Time;<alias>...`). Fields are
//! separated by `;` and timestamps are written as RFC 3339 UTC with
//! millisecond precision.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, TimeZone, Utc};
use serde_json::Value;

use crate::series::NormalizedSeries;

const SEPARATOR: &str = ";";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Quote a field that contains the separator, a quote, or a newline.
fn csv_escape(value: &str) -> String {
    if value.contains(SEPARATOR) || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn json_value_to_csv(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Numeric x values as whole epoch milliseconds; floats are rounded.
fn epoch_millis(x: &Value) -> Option<i64> {
    x.as_i64().or_else(|| {
        x.as_f64()
            .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
            .map(|f| f.round() as i64)
    })
}

/// Epoch-ms x values become timestamps; anything else is written as is.
fn format_time(x: &Value) -> String {
    epoch_millis(x)
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| json_value_to_csv(x))
}

// ---------------------------------------------------------------------------
// Layouts
// ---------------------------------------------------------------------------

/// One line per datapoint, series after series.
pub fn series_as_rows(series: &[NormalizedSeries]) -> String {
    let mut lines = vec![["Series", "Time", "Value"].join(SEPARATOR)];
    for s in series {
        let alias = csv_escape(&s.alias);
        for point in &s.datapoints {
            lines.push(
                [
                    alias.clone(),
                    csv_escape(&format_time(&point.1)),
                    csv_escape(&json_value_to_csv(&point.0)),
                ]
                .join(SEPARATOR),
            );
        }
    }
    lines.join("\n") + "\n"
}

/// One line per distinct timestamp (ascending), one column per series.
/// Series without a value at a timestamp leave the cell empty.
///
/// Points whose x is not numeric are skipped.
pub fn series_as_columns(series: &[NormalizedSeries]) -> String {
    let mut header = vec!["Time".to_string()];
    header.extend(series.iter().map(|s| csv_escape(&s.alias)));

    let mut by_time: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for (col, s) in series.iter().enumerate() {
        for point in &s.datapoints {
            let Some(ts) = epoch_millis(&point.1) else {
                continue;
            };
            let row = by_time
                .entry(ts)
                .or_insert_with(|| vec![String::new(); series.len()]);
            row[col] = csv_escape(&json_value_to_csv(&point.0));
        }
    }

    let mut lines = vec![header.join(SEPARATOR)];
    for (ts, cells) in by_time {
        let mut row = vec![format_time(&Value::from(ts))];
        row.extend(cells);
        lines.push(row.join(SEPARATOR));
    }
    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
