//! Graph panel controller.
//!
//! Each batch of query results starts a new cycle: the results are
//! normalized synchronously, then the cycle waits for its annotation
//! fetch. Only the latest cycle may publish a [`RenderFrame`]; a cycle
//! superseded while waiting drops its annotations.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use dashpanel_core::export;
use dashpanel_core::panel_config::PanelConfig;
use dashpanel_core::series::{
    self, overrides, visibility::HiddenSeries, Annotation, NormalizedSeries, Palette,
    RawResultSeries, RenderFrame, XAxisColumn,
};
use dashpanel_core::types::{DbId, TimeRange};

use crate::backend::AnnotationSource;
use crate::error::PanelResult;

/// CSV layouts offered by the panel menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvLayout {
    SeriesAsRows,
    SeriesAsColumns,
}

/// Mutable view state, replaced wholesale by each cycle.
#[derive(Debug, Default)]
struct PanelState {
    /// Cycle that produced `series`.
    cycle: u64,
    series: Vec<NormalizedSeries>,
    frame: Option<RenderFrame>,
    x_axis_columns: Vec<XAxisColumn>,
    warning: bool,
    loading: bool,
    hidden: HiddenSeries,
}

pub struct GraphPanel {
    dashboard_id: DbId,
    palette: Palette,
    config: Mutex<PanelConfig>,
    state: Mutex<PanelState>,
    latest_cycle: AtomicU64,
}

impl GraphPanel {
    pub fn new(dashboard_id: DbId, config: PanelConfig) -> Self {
        Self::with_palette(dashboard_id, config, Palette::default())
    }

    pub fn with_palette(dashboard_id: DbId, config: PanelConfig, palette: Palette) -> Self {
        Self {
            dashboard_id,
            palette,
            config: Mutex::new(config),
            state: Mutex::new(PanelState::default()),
            latest_cycle: AtomicU64::new(0),
        }
    }

    pub fn dashboard_id(&self) -> DbId {
        self.dashboard_id
    }

    /// Fetch annotations from `source` and process `results`.
    pub async fn refresh<A: AnnotationSource + ?Sized>(
        &self,
        source: &A,
        results: Vec<RawResultSeries>,
        range: TimeRange,
    ) -> PanelResult<Option<RenderFrame>> {
        self.data_received(results, range, source.get_annotations(self.dashboard_id))
            .await
    }

    /// Normalize `results` and, once `annotations` resolves, publish the
    /// frame.
    ///
    /// Returns `Ok(None)` when a newer cycle started while this one was
    /// waiting; the newer cycle then owns the loading flag. A failed
    /// annotation fetch still publishes the frame, without annotations.
    /// Normalization errors abort the batch without starting a cycle, so
    /// the previous frame and any pending cycle are left in place.
    pub async fn data_received<F>(
        &self,
        results: Vec<RawResultSeries>,
        range: TimeRange,
        annotations: F,
    ) -> PanelResult<Option<RenderFrame>>
    where
        F: Future<Output = PanelResult<Vec<Annotation>>>,
    {
        // Only a batch that normalized starts a cycle.
        let (cycle, normalized) = {
            let mut config = self.config.lock().await;
            let normalized = series::normalize(results, &mut config, &range, &self.palette)?;
            (self.latest_cycle.fetch_add(1, Ordering::SeqCst) + 1, normalized)
        };

        tracing::debug!(
            dashboard_id = self.dashboard_id,
            cycle,
            mode = normalized.mode.as_str(),
            series_count = normalized.series.len(),
            datapoint_count = normalized.totals.datapoints_count,
            warning = normalized.warning,
            "Normalized query results"
        );

        {
            let mut state = self.state.lock().await;
            if !self.is_current(cycle) {
                tracing::debug!(cycle, "Cycle superseded before publishing series");
                return Ok(None);
            }
            state.cycle = cycle;
            state.series = normalized.series;
            state.x_axis_columns = normalized.x_axis_columns;
            state.warning = normalized.warning;
            state.loading = true;
        }

        let outcome = annotations.await;
        if let Err(e) = &outcome {
            tracing::warn!(
                dashboard_id = self.dashboard_id,
                cycle,
                error = %e,
                "Annotation fetch failed, rendering without annotations"
            );
        }

        let mut config = self.config.lock().await;
        let mut state = self.state.lock().await;
        if state.cycle != cycle || !self.is_current(cycle) {
            tracing::debug!(cycle, "Discarding annotations of superseded cycle");
            return Ok(None);
        }

        let mut frame = series::finalize(state.series.clone(), outcome);
        state.loading = false;
        overrides::prepare_for_render(&mut config, &mut frame.series)?;
        state.frame = Some(frame.clone());
        Ok(Some(frame))
    }

    /// The query failed: clear the series list and render an empty frame.
    /// Any cycle still waiting for annotations is superseded.
    pub async fn data_error(&self) -> RenderFrame {
        let cycle = self.latest_cycle.fetch_add(1, Ordering::SeqCst) + 1;
        let frame = RenderFrame {
            series: Vec::new(),
            annotations: Vec::new(),
            annotations_loaded: false,
        };
        let mut state = self.state.lock().await;
        state.cycle = cycle;
        state.series.clear();
        state.loading = false;
        state.frame = Some(frame.clone());
        frame
    }

    fn is_current(&self, cycle: u64) -> bool {
        self.latest_cycle.load(Ordering::SeqCst) == cycle
    }

    // ---- view state ----

    /// Last published frame.
    pub async fn frame(&self) -> Option<RenderFrame> {
        self.state.lock().await.frame.clone()
    }

    pub async fn x_axis_columns(&self) -> Vec<XAxisColumn> {
        self.state.lock().await.x_axis_columns.clone()
    }

    /// Nothing plotted, or data ends before the display range.
    pub async fn datapoints_warning(&self) -> bool {
        self.state.lock().await.warning
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    pub async fn config(&self) -> PanelConfig {
        self.config.lock().await.clone()
    }

    pub async fn is_hidden(&self, alias: &str) -> bool {
        self.state.lock().await.hidden.is_hidden(alias)
    }

    // ---- legend / menu actions ----

    /// Legend click on `alias`; `additive` when a modifier key is held.
    pub async fn toggle_series(&self, alias: &str, additive: bool) {
        let mut state = self.state.lock().await;
        let PanelState { hidden, series, .. } = &mut *state;
        hidden.toggle(alias, additive, series);
    }

    /// Recolour every published series named `alias` and remember the
    /// colour for future cycles.
    pub async fn change_series_color(&self, alias: &str, color: &str) {
        let mut config = self.config.lock().await;
        let mut state = self.state.lock().await;
        let PanelState { series, frame, .. } = &mut *state;
        let published = frame.iter_mut().flat_map(|f| f.series.iter_mut());
        for s in series.iter_mut().chain(published).filter(|s| s.alias == alias) {
            overrides::change_series_color(&mut config, s, color);
        }
        config
            .alias_colors
            .insert(alias.to_string(), color.to_string());
    }

    /// Move `alias` to the other y-axis. Returns the new axis, or `None`
    /// when no published series has that alias.
    pub async fn toggle_axis(&self, alias: &str) -> Option<u8> {
        let mut config = self.config.lock().await;
        let mut state = self.state.lock().await;
        let frame = state.frame.as_mut()?;
        let target = frame.series.iter_mut().find(|s| s.alias == alias)?;
        Some(overrides::toggle_axis(&mut config, target))
    }

    pub async fn toggle_legend(&self) {
        self.config.lock().await.toggle_legend();
    }

    /// Export the published series as CSV.
    pub async fn export_csv(&self, layout: CsvLayout) -> String {
        let state = self.state.lock().await;
        let series = state
            .frame
            .as_ref()
            .map(|f| f.series.as_slice())
            .unwrap_or_default();
        match layout {
            CsvLayout::SeriesAsRows => export::series_as_rows(series),
            CsvLayout::SeriesAsColumns => export::series_as_columns(series),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PanelError;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use dashpanel_core::error::CoreError;
    use dashpanel_core::series::{Datapoint, TimeSeriesResult};

    fn range() -> TimeRange {
        TimeRange::new(
            Utc.timestamp_millis_opt(0).unwrap(),
            Utc.timestamp_millis_opt(60_000).unwrap(),
        )
    }

    fn ts(target: &str) -> RawResultSeries {
        RawResultSeries::TimeSeries(TimeSeriesResult {
            target: target.to_string(),
            datapoints: vec![Datapoint::new(1.0, 1000), Datapoint::new(2.0, 2000)],
            unit: Some("bytes".into()),
        })
    }

    #[tokio::test]
    async fn publishes_frame_with_annotations() {
        let panel = GraphPanel::new(1, PanelConfig::default());
        let ann = Annotation {
            time: 1500,
            text: "deploy".into(),
            ..Default::default()
        };
        let frame = panel
            .data_received(vec![ts("cpu")], range(), async { Ok::<_, PanelError>(vec![ann.clone()]) })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.series.len(), 1);
        assert_eq!(frame.annotations, vec![ann]);
        assert!(!panel.is_loading().await);
        assert!(!panel.datapoints_warning().await);
        assert_eq!(panel.config().await.yaxes[0].format, "bytes");
    }

    #[tokio::test]
    async fn annotation_failure_still_renders() {
        let panel = GraphPanel::new(1, PanelConfig::default());
        let frame = panel
            .data_received(vec![ts("cpu")], range(), async {
                Err(PanelError::Api {
                    status: 500,
                    body: "down".into(),
                })
            })
            .await
            .unwrap()
            .unwrap();
        assert!(!frame.annotations_loaded);
        assert_eq!(frame.series.len(), 1);
    }

    #[tokio::test]
    async fn normalization_error_keeps_previous_frame() {
        let mut config = PanelConfig::default();
        config.xaxis.mode = "bogus".into();
        let panel = GraphPanel::new(1, config);
        let result = panel
            .data_received(vec![ts("cpu")], range(), async { Ok::<_, PanelError>(Vec::new()) })
            .await;
        assert_matches!(result, Err(PanelError::Core(CoreError::Validation(_))));
        assert!(panel.frame().await.is_none());
        assert!(!panel.is_loading().await);
    }

    #[tokio::test]
    async fn render_failure_clears_loading() {
        let panel = GraphPanel::new(1, PanelConfig::default());
        panel
            .data_received(vec![ts("cpu")], range(), async { Ok::<_, PanelError>(Vec::new()) })
            .await
            .unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let pending = panel.data_received(vec![ts("cpu")], range(), async move {
            rx.await.ok();
            Ok::<_, PanelError>(Vec::new())
        });
        let driver = async {
            tokio::task::yield_now().await;
            // A unit on an axis that does not exist cannot be drawn.
            panel.state.lock().await.series[0].yaxis = 3;
            tx.send(()).unwrap();
        };
        let (result, ()) = tokio::join!(pending, driver);

        assert_matches!(result, Err(PanelError::Core(CoreError::Validation(_))));
        assert!(!panel.is_loading().await);
        assert_eq!(panel.frame().await.unwrap().series[0].yaxis, 1);
    }

    #[tokio::test]
    async fn data_error_clears_series() {
        let panel = GraphPanel::new(1, PanelConfig::default());
        panel
            .data_received(vec![ts("cpu")], range(), async { Ok::<_, PanelError>(Vec::new()) })
            .await
            .unwrap();
        let frame = panel.data_error().await;
        assert!(frame.series.is_empty());
        assert_eq!(panel.frame().await.unwrap().series.len(), 0);
    }

    #[tokio::test]
    async fn legend_actions_update_config_and_frame() {
        let panel = GraphPanel::new(1, PanelConfig::default());
        panel
            .data_received(vec![ts("cpu"), ts("mem")], range(), async { Ok::<_, PanelError>(Vec::new()) })
            .await
            .unwrap();

        panel.change_series_color("cpu", "#abcdef").await;
        let frame = panel.frame().await.unwrap();
        assert_eq!(frame.series[0].color, "#abcdef");
        assert_eq!(panel.config().await.alias_colors["cpu"], "#abcdef");

        assert_eq!(panel.toggle_axis("mem").await, Some(2));
        assert_eq!(panel.toggle_axis("missing").await, None);

        panel.toggle_series("cpu", false).await;
        assert!(panel.is_hidden("mem").await);
        assert!(!panel.is_hidden("cpu").await);

        panel.toggle_legend().await;
        assert!(!panel.config().await.legend.show);
    }

    #[tokio::test]
    async fn export_uses_published_frame() {
        let panel = GraphPanel::new(1, PanelConfig::default());
        assert_eq!(panel.export_csv(CsvLayout::SeriesAsRows).await, "Series;Time;Value\n");
        panel
            .data_received(vec![ts("cpu")], range(), async { Ok::<_, PanelError>(Vec::new()) })
            .await
            .unwrap();
        let csv = panel.export_csv(CsvLayout::SeriesAsColumns).await;
        assert!(csv.starts_with("Time;cpu\n"));
        assert_eq!(csv.lines().count(), 3);
    }
}
