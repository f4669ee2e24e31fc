use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use choropleth_shared::{MapContainer, MapMode, MapRequest, SelectionSet, try_render_map};
use serde::Deserialize;

use crate::state::AppState;

const SVG_CONTENT_TYPE: &str = "image/svg+xml; charset=utf-8";

#[derive(Debug, Default, Deserialize)]
pub struct MapQuery {
    /// JSON array or comma-separated region ids.
    #[serde(default)]
    pub selected: Option<String>,
}

pub async fn render_map(
    State(state): State<AppState>,
    Path(mode): Path<String>,
    Query(query): Query<MapQuery>,
) -> Response {
    let mode = match mode.parse::<MapMode>() {
        Ok(mode) => mode,
        Err(e) => return (StatusCode::NOT_FOUND, e.to_string()).into_response(),
    };
    state.observability.record_map_request();

    let selected = query
        .selected
        .as_deref()
        .map(SelectionSet::parse)
        .unwrap_or_default();
    let request = MapRequest::new(selected, state.data_source_base.clone(), mode)
        .with_options(state.map_options);

    let mut container = MapContainer::new();
    match try_render_map(state.source.as_ref(), &mut container, &request).await {
        Ok(summary) => {
            state
                .observability
                .record_regions_drawn(summary.regions as u64);
            (
                [
                    (header::CONTENT_TYPE, SVG_CONTENT_TYPE),
                    (header::CACHE_CONTROL, "public, max-age=300"),
                ],
                container.to_markup(),
            )
                .into_response()
        }
        Err(e) => {
            state.observability.record_render_failure();
            tracing::warn!(error = %e, url = %request.data_url(), %mode, "map render failed");
            (StatusCode::BAD_GATEWAY, "map data unavailable").into_response()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::net::SocketAddr;
    use std::path::PathBuf;

    use choropleth_shared::MapOptions;

    use super::*;
    use crate::services::topology_source::{HttpTopologySource, TopologyBackend};

    /// California ("06") and Nevada ("32") sharing the -120° meridian.
    pub(crate) const US_FIXTURE: &str = r#"{
        "type": "Topology",
        "arcs": [
            [[-120, 35], [-120, 41]],
            [[-120, 41], [-124, 41], [-124, 35], [-120, 35]],
            [[-120, 35], [-115, 35], [-115, 41], [-120, 41]]
        ],
        "objects": {
            "land": {"type": "Polygon", "arcs": [[1, 2]]},
            "states": {"type": "GeometryCollection", "geometries": [
                {"type": "Polygon", "id": "06", "arcs": [[0, 1]]},
                {"type": "Polygon", "id": 32, "arcs": [[2, -1]]}
            ]}
        }
    }"#;

    /// Two quantized countries in Europe sharing one arc.
    pub(crate) const WORLD_FIXTURE: &str = r#"{
        "type": "Topology",
        "transform": {"scale": [0.5, 0.5], "translate": [0, 40]},
        "arcs": [
            [[20, 0], [0, 20]],
            [[20, 20], [-20, 0], [0, -20], [20, 0]],
            [[20, 0], [20, 0], [0, 20], [-20, 0]]
        ],
        "objects": {
            "land": {"type": "Polygon", "arcs": [[1, 2]]},
            "countries": {"type": "GeometryCollection", "geometries": [
                {"type": "Polygon", "id": "250", "arcs": [[0, 1]]},
                {"type": "Polygon", "id": "276", "arcs": [[2, -1]]}
            ]}
        }
    }"#;

    /// A fresh directory holding both fixture topologies.
    pub(crate) fn fixture_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "choropleth-server-{}-{name}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).expect("create fixture dir");
        std::fs::write(dir.join("us.json"), US_FIXTURE).expect("write us fixture");
        std::fs::write(dir.join("world-50m.json"), WORLD_FIXTURE).expect("write world fixture");
        dir
    }

    pub(crate) fn test_state(name: &str) -> AppState {
        AppState::with_local_files(fixture_dir(name), MapOptions::default())
    }

    pub(crate) async fn spawn_test_server(
        state: AppState,
    ) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let app = crate::app::build_app(state);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });
        (addr, handle)
    }

    async fn get(addr: SocketAddr, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .get(format!("http://{addr}{path}"))
            .send()
            .await
            .expect("map request")
    }

    #[tokio::test]
    async fn us_map_marks_selected_states_and_draws_boundaries() {
        let state = test_state("us-selected");
        let (addr, server_handle) = spawn_test_server(state.clone()).await;

        let response = get(addr, "/api/map/us?selected=06").await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some(SVG_CONTENT_TYPE)
        );
        let body = response.text().await.expect("svg body");

        assert!(body.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"480\" height=\"240\">"));
        assert!(body.contains("<path class=\"land\""));
        assert!(body.contains("class=\"region selected\" data-id=\"06\""));
        assert!(body.contains("class=\"region\" data-id=\"32\""));
        assert!(body.contains("class=\"region-boundary\""));
        assert_eq!(state.observability.snapshot().regions_drawn_total, 2);

        server_handle.abort();
    }

    #[tokio::test]
    async fn empty_us_selection_selects_every_state() {
        let (addr, server_handle) = spawn_test_server(test_state("us-empty")).await;

        let body = get(addr, "/api/map/usa").await.text().await.expect("svg body");

        assert_eq!(body.matches("class=\"region selected\"").count(), 2);
        assert!(!body.contains("region-boundary"));

        server_handle.abort();
    }

    #[tokio::test]
    async fn world_map_accepts_json_array_selection() {
        let (addr, server_handle) = spawn_test_server(test_state("world-json")).await;

        let body = get(addr, "/api/map/world?selected=%5B276%5D")
            .await
            .text()
            .await
            .expect("svg body");

        assert!(body.contains("class=\"region selected\" data-id=\"276\""));
        assert!(body.contains("class=\"region\" data-id=\"250\""));
        assert!(body.contains("class=\"region-boundary\""));

        server_handle.abort();
    }

    #[tokio::test]
    async fn unknown_mode_is_not_found() {
        let state = test_state("unknown-mode");
        let (addr, server_handle) = spawn_test_server(state.clone()).await;

        let response = get(addr, "/api/map/mars").await;
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
        assert_eq!(state.observability.snapshot().map_requests_total, 0);

        server_handle.abort();
    }

    #[tokio::test]
    async fn missing_topology_is_bad_gateway() {
        let dir = std::env::temp_dir().join(format!(
            "choropleth-server-{}-empty",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).expect("create empty dir");
        let state = AppState::with_local_files(dir, MapOptions::default());
        let (addr, server_handle) = spawn_test_server(state.clone()).await;

        let response = get(addr, "/api/map/world").await;
        assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
        let observability = state.observability.snapshot();
        assert_eq!(observability.map_requests_total, 1);
        assert_eq!(observability.map_render_failures_total, 1);

        server_handle.abort();
    }

    #[tokio::test]
    async fn http_source_renders_from_upstream_geo_route() {
        let (upstream_addr, upstream_handle) = spawn_test_server(test_state("upstream")).await;
        let state = AppState::new(
            TopologyBackend::Http(HttpTopologySource::new(reqwest::Client::new())),
            format!("http://{upstream_addr}/geo"),
            fixture_dir("downstream"),
            MapOptions {
                us_empty_selects_all: false,
                graticule: true,
            },
        );
        let (addr, server_handle) = spawn_test_server(state).await;

        let body = get(addr, "/api/map/us").await.text().await.expect("svg body");

        assert_eq!(body.matches("class=\"region\"").count(), 2);
        assert!(body.contains("class=\"region-boundary\""));
        let boundary = body.find("region-boundary").expect("boundary path");
        let graticule = body.find("class=\"graticule\"").expect("graticule path");
        assert!(boundary < graticule);

        server_handle.abort();
        upstream_handle.abort();
    }
}
