//! `dashpanel` -- command-line driver for the panel controllers.
//!
//! ```text
//! dashpanel acl <dashboard-id>
//! dashpanel normalize <request.json>
//! dashpanel export-csv <request.json> [rows|columns]
//! ```
//!
//! A request file holds `{ "panel": {...}, "range": {"from", "to"},
//! "results": [...] }` and optionally `"dashboardId"`; when present,
//! annotations are fetched from the backend for that dashboard.
//!
//! # Environment variables
//!
//! | Variable                         | Required | Default                 |
//! |----------------------------------|----------|-------------------------|
//! | `DASHPANEL_BACKEND_URL`          | no       | `http://localhost:3000` |
//! | `DASHPANEL_API_TOKEN`            | no       | --                      |
//! | `DASHPANEL_REQUEST_TIMEOUT_SECS` | no       | `30`                    |
//! | `RUST_LOG`                       | no       | `dashpanel=info`        |

use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dashpanel_core::series::{RawResultSeries, RenderFrame};
use dashpanel_core::types::{DbId, TimeRange};
use dashpanel_panel::{
    AclEditor, AnnotationSource, ClientConfig, CsvLayout, GraphPanel, HttpBackend, PanelError,
    PanelResult,
};

const USAGE: &str =
    "usage: dashpanel acl <dashboard-id> | normalize <file> | export-csv <file> [rows|columns]";

/// Dashboard id used when a request names none.
const DETACHED_DASHBOARD_ID: DbId = 0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PanelRequest {
    dashboard_id: Option<DbId>,
    #[serde(default)]
    panel: serde_json::Value,
    range: TimeRange,
    #[serde(default)]
    results: Vec<RawResultSeries>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashpanel=info,dashpanel_panel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(&args).await {
        tracing::error!(error = %e, "dashpanel failed");
        std::process::exit(1);
    }
}

async fn run(args: &[String]) -> PanelResult<()> {
    let config = ClientConfig::from_env()?;
    tracing::debug!(backend_url = %config.backend_url, "Loaded client configuration");

    match args.first().map(String::as_str) {
        Some("acl") => {
            let dashboard_id: DbId = args
                .get(1)
                .and_then(|raw| raw.parse().ok())
                .ok_or_else(|| PanelError::Config(USAGE.to_string()))?;
            let backend = HttpBackend::new(&config)?;
            let editor = AclEditor::load(&backend, dashboard_id).await?;
            println!("{}", serde_json::to_string_pretty(editor.items())?);
        }
        Some("normalize") => {
            let (panel, frame) = process_request(args.get(1), &config).await?;
            let output = serde_json::json!({
                "frame": frame,
                "warning": panel.datapoints_warning().await,
                "xAxisColumns": panel.x_axis_columns().await,
                "panel": panel.config().await,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Some("export-csv") => {
            let layout = match args.get(2).map(String::as_str) {
                None | Some("rows") => CsvLayout::SeriesAsRows,
                Some("columns") => CsvLayout::SeriesAsColumns,
                Some(_) => return Err(PanelError::Config(USAGE.to_string())),
            };
            let (panel, _) = process_request(args.get(1), &config).await?;
            print!("{}", panel.export_csv(layout).await);
        }
        _ => return Err(PanelError::Config(USAGE.to_string())),
    }

    Ok(())
}

/// Read a request file and run it through a fresh [`GraphPanel`].
async fn process_request(
    path: Option<&String>,
    config: &ClientConfig,
) -> PanelResult<(GraphPanel, Option<RenderFrame>)> {
    let path = path.ok_or_else(|| PanelError::Config(USAGE.to_string()))?;
    let raw = tokio::fs::read_to_string(path).await?;
    let request: PanelRequest = serde_json::from_str(&raw)?;

    let panel_config = dashpanel_core::panel_config::PanelConfig::from_json(request.panel)?;
    let panel = GraphPanel::new(
        request.dashboard_id.unwrap_or(DETACHED_DASHBOARD_ID),
        panel_config,
    );

    let frame = match request.dashboard_id {
        Some(dashboard_id) => {
            let backend = HttpBackend::new(config)?;
            panel
                .data_received(
                    request.results,
                    request.range,
                    backend.get_annotations(dashboard_id),
                )
                .await?
        }
        None => {
            panel
                .data_received(
                    request.results,
                    request.range,
                    futures::future::ready(Ok(Vec::new())),
                )
                .await?
        }
    };

    tracing::info!(
        path = %path,
        series_count = frame.as_ref().map_or(0, |f| f.series.len()),
        "Processed panel request"
    );
    Ok((panel, frame))
}
