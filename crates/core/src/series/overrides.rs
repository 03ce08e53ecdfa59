//! Series style overrides, axis units and colour changes.
//!
//! Applied after normalization, right before the series list is handed
//! to the render surface.

use regex::Regex;

use super::NormalizedSeries;
use crate::error::CoreError;
use crate::panel_config::{PanelConfig, SeriesOverride};

/// Does `pattern` select the series named `alias`?
///
/// `/regex/` (optionally `/regex/i`) is matched as a regular expression;
/// anything else must equal the alias exactly. An invalid regex matches
/// nothing.
pub fn matches_alias(pattern: &str, alias: &str) -> bool {
    match parse_alias_regex(pattern) {
        Some(Ok(re)) => re.is_match(alias),
        Some(Err(_)) => false,
        None => pattern == alias,
    }
}

fn parse_alias_regex(pattern: &str) -> Option<Result<Regex, regex::Error>> {
    let body = pattern.strip_prefix('/')?;
    let end = body.rfind('/')?;
    let (expr, flags) = (&body[..end], &body[end + 1..]);
    let expr = if flags.contains('i') {
        format!("(?i){expr}")
    } else {
        expr.to_string()
    };
    Some(Regex::new(&expr))
}

/// Apply every matching override in order; later overrides win.
/// A y-axis other than 1 or 2 is ignored.
pub fn apply_series_overrides(series: &mut NormalizedSeries, overrides: &[SeriesOverride]) {
    for o in overrides.iter().filter(|o| matches_alias(&o.alias, &series.alias)) {
        if let Some(yaxis @ 1..=2) = o.yaxis {
            series.yaxis = yaxis;
        }
        if let Some(color) = &o.color {
            series.color = color.clone();
        }
        if let Some(lines) = o.lines {
            series.lines = Some(lines);
        }
        if let Some(bars) = o.bars {
            series.bars = Some(bars);
        }
        if let Some(points) = o.points {
            series.points = Some(points);
        }
        if let Some(fill) = o.fill {
            series.fill = Some(fill);
        }
        if let Some(linewidth) = o.linewidth {
            series.linewidth = Some(linewidth);
        }
        if let Some(stack) = o.stack {
            series.stack = Some(stack);
        }
        if let Some(legend) = o.legend {
            series.legend = legend;
        }
    }
}

/// Apply the panel's overrides to every series, then let series that
/// carry a unit set the format of their y-axis.
pub fn prepare_for_render(
    config: &mut PanelConfig,
    series: &mut [NormalizedSeries],
) -> Result<(), CoreError> {
    for s in series.iter_mut() {
        apply_series_overrides(s, &config.series_overrides);
    }
    apply_axis_units(config, series)
}

/// A series with a unit sets the format of the y-axis it is drawn on.
pub fn apply_axis_units(config: &mut PanelConfig, series: &[NormalizedSeries]) -> Result<(), CoreError> {
    for s in series {
        if let Some(unit) = &s.unit {
            config.set_unit_format(s.yaxis, unit)?;
        }
    }
    Ok(())
}

/// Recolour a series and remember the choice for its alias.
pub fn change_series_color(config: &mut PanelConfig, series: &mut NormalizedSeries, color: &str) {
    series.color = color.to_string();
    config
        .alias_colors
        .insert(series.alias.clone(), color.to_string());
}

/// Move a series to the other y-axis, recording it in the alias's
/// override (created when missing). Returns the new axis.
pub fn toggle_axis(config: &mut PanelConfig, series: &mut NormalizedSeries) -> u8 {
    let next = if series.yaxis == 2 { 1 } else { 2 };

    match config
        .series_overrides
        .iter_mut()
        .find(|o| o.alias == series.alias)
    {
        Some(existing) => existing.yaxis = Some(next),
        None => config.series_overrides.push(SeriesOverride {
            alias: series.alias.clone(),
            yaxis: Some(next),
            ..Default::default()
        }),
    }

    series.yaxis = next;
    next
}

/// Append an override (an empty one when `None`).
pub fn add_series_override(config: &mut PanelConfig, o: Option<SeriesOverride>) {
    config.series_overrides.push(o.unwrap_or_default());
}

/// Remove the first override equal to `o`.
pub fn remove_series_override(config: &mut PanelConfig, o: &SeriesOverride) {
    if let Some(pos) = config.series_overrides.iter().position(|x| x == o) {
        config.series_overrides.remove(pos);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
