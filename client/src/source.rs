use choropleth_shared::{MapError, Topology, TopologySource};

/// Fetches topology files with the browser's `fetch`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlooTopologySource;

impl TopologySource for GlooTopologySource {
    async fn fetch(&self, url: &str) -> Result<Topology, MapError> {
        let fetch_error = |e: gloo_net::Error| MapError::Fetch {
            url: url.to_owned(),
            message: e.to_string(),
        };
        let resp = gloo_net::http::Request::get(url)
            .send()
            .await
            .map_err(fetch_error)?;

        if !resp.ok() {
            return Err(MapError::Status {
                url: url.to_owned(),
                status: resp.status(),
            });
        }

        let body = resp.binary().await.map_err(fetch_error)?;
        Topology::from_slice(&body)
    }
}
