use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use choropleth_shared::MapOptions;
use tracing::warn;

use crate::config::{
    GEO_ROUTE, geo_base_url, geo_data_dir, map_options, upstream_connect_timeout,
    upstream_http_timeout,
};
use crate::services::topology_source::{FileTopologySource, HttpTopologySource, TopologyBackend};

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<TopologyBackend>,
    /// Base URL handed to the renderer; the resource file name is appended.
    pub data_source_base: String,
    /// Directory served under `/geo/`.
    pub geo_data_dir: PathBuf,
    pub map_options: MapOptions,
    pub started_at: DateTime<Utc>,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    map_requests_total: AtomicU64,
    map_render_failures_total: AtomicU64,
    regions_drawn_total: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservabilitySnapshot {
    pub map_requests_total: u64,
    pub map_render_failures_total: u64,
    pub regions_drawn_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            map_requests_total: self.map_requests_total.load(Ordering::Relaxed),
            map_render_failures_total: self.map_render_failures_total.load(Ordering::Relaxed),
            regions_drawn_total: self.regions_drawn_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_map_request(&self) {
        self.map_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_render_failure(&self) {
        self.map_render_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_regions_drawn(&self, count: u64) {
        self.regions_drawn_total.fetch_add(count, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new(
        backend: TopologyBackend,
        data_source_base: impl Into<String>,
        geo_data_dir: impl Into<PathBuf>,
        map_options: MapOptions,
    ) -> Self {
        Self {
            source: Arc::new(backend),
            data_source_base: data_source_base.into(),
            geo_data_dir: geo_data_dir.into(),
            map_options,
            started_at: Utc::now(),
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }

    /// Serves and renders from a local directory of topology files.
    pub fn with_local_files(geo_data_dir: impl Into<PathBuf>, map_options: MapOptions) -> Self {
        let geo_data_dir = geo_data_dir.into();
        Self::new(
            TopologyBackend::Files(FileTopologySource::new(geo_data_dir.clone())),
            GEO_ROUTE,
            geo_data_dir,
            map_options,
        )
    }

    pub fn from_env() -> Result<Self, reqwest::Error> {
        let geo_data_dir = geo_data_dir();
        let map_options = map_options();
        let Some(base_url) = geo_base_url() else {
            return Ok(Self::with_local_files(geo_data_dir, map_options));
        };

        let http_client = build_http_client()?;
        Ok(Self::new(
            TopologyBackend::Http(HttpTopologySource::new(http_client)),
            base_url,
            geo_data_dir,
            map_options,
        ))
    }
}

pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    let request_timeout = upstream_http_timeout();
    let connect_timeout = upstream_connect_timeout();
    reqwest::Client::builder()
        .user_agent("choropleth-map/0.1")
        .timeout(request_timeout)
        .connect_timeout(connect_timeout)
        .build()
        .or_else(|e| {
            warn!(
                error = %e,
                "failed to build configured HTTP client, retrying without custom user-agent"
            );
            reqwest::Client::builder()
                .timeout(request_timeout)
                .connect_timeout(connect_timeout)
                .build()
        })
}
