use std::fmt::Write as _;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use chrono::Utc;

use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "topology_source": state.source.kind(),
        "data_source_base": state.data_source_base,
        "uptime_secs": uptime_secs(&state),
        "options": {
            "us_empty_selects_all": state.map_options.us_empty_selects_all,
            "graticule": state.map_options.graticule,
        },
        "observability": {
            "map_requests_total": observability.map_requests_total,
            "map_render_failures_total": observability.map_render_failures_total,
            "regions_drawn_total": observability.regions_drawn_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = render_prometheus_metrics(uptime_secs(&state), state.observability.snapshot());

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn uptime_secs(state: &AppState) -> i64 {
    (Utc::now() - state.started_at).num_seconds().max(0)
}

fn render_prometheus_metrics(uptime_secs: i64, observability: ObservabilitySnapshot) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "# HELP choropleth_uptime_seconds Seconds since the server started."
    );
    let _ = writeln!(body, "# TYPE choropleth_uptime_seconds gauge");
    let _ = writeln!(body, "choropleth_uptime_seconds {uptime_secs}");

    let counters = [
        (
            "choropleth_map_requests_total",
            "Total map render requests.",
            observability.map_requests_total,
        ),
        (
            "choropleth_map_render_failures_total",
            "Map renders that failed to fetch or decode their topology.",
            observability.map_render_failures_total,
        ),
        (
            "choropleth_regions_drawn_total",
            "Region paths drawn across all renders.",
            observability.regions_drawn_total,
        ),
    ];
    for (name, help, value) in counters {
        let _ = writeln!(body, "# HELP {name} {help}");
        let _ = writeln!(body, "# TYPE {name} counter");
        let _ = writeln!(body, "{name} {value}");
    }

    body
}
