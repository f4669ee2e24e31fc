use std::path::PathBuf;
use std::time::Duration;

use choropleth_shared::MapOptions;

pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_GEO_DATA_DIR: &str = "geo";
pub const CLIENT_DIST_DIR: &str = "client/dist";
/// Route the topology files are served under, and the data source base the
/// server renders from when no upstream is configured.
pub const GEO_ROUTE: &str = "/geo/";
pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 3;

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn geo_data_dir() -> PathBuf {
    std::env::var("GEO_DATA_DIR")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_GEO_DATA_DIR))
}

/// Remote base URL for the topology files. Unset means read `GEO_DATA_DIR`.
pub fn geo_base_url() -> Option<String> {
    std::env::var("GEO_BASE_URL")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

pub fn map_options() -> MapOptions {
    let defaults = MapOptions::default();
    MapOptions {
        us_empty_selects_all: env_flag("US_EMPTY_SELECTS_ALL", defaults.us_empty_selects_all),
        graticule: env_flag("MAP_GRATICULE", defaults.graticule),
    }
}

pub fn upstream_http_timeout() -> Duration {
    std::env::var("UPSTREAM_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS))
}

pub fn upstream_connect_timeout() -> Duration {
    std::env::var("UPSTREAM_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS))
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|value| match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}
