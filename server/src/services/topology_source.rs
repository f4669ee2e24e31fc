use std::path::PathBuf;

use choropleth_shared::{MapError, Topology, TopologySource};

/// Fetches topology files over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTopologySource {
    client: reqwest::Client,
}

impl HttpTopologySource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl TopologySource for HttpTopologySource {
    async fn fetch(&self, url: &str) -> Result<Topology, MapError> {
        let fetch_error = |e: reqwest::Error| MapError::Fetch {
            url: url.to_owned(),
            message: e.to_string(),
        };
        let resp = self.client.get(url).send().await.map_err(fetch_error)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MapError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        let body = resp.bytes().await.map_err(fetch_error)?;
        Topology::from_slice(&body)
    }
}

/// Reads topology files from a local directory. Only the file name of the
/// requested URL is used, so requests cannot leave the directory.
#[derive(Debug, Clone)]
pub struct FileTopologySource {
    root: PathBuf,
}

impl FileTopologySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let name = path.rsplit('/').next().filter(|name| {
            !name.is_empty() && *name != "." && *name != ".." && !name.contains('\\')
        })?;
        Some(self.root.join(name))
    }
}

impl TopologySource for FileTopologySource {
    async fn fetch(&self, url: &str) -> Result<Topology, MapError> {
        let Some(path) = self.resolve(url) else {
            return Err(MapError::Status {
                url: url.to_owned(),
                status: 404,
            });
        };
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| MapError::Io { path, source })?;
        Topology::from_slice(&bytes)
    }
}

/// The source chosen at startup.
#[derive(Debug, Clone)]
pub enum TopologyBackend {
    Http(HttpTopologySource),
    Files(FileTopologySource),
}

impl TopologyBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Files(_) => "files",
        }
    }
}

impl TopologySource for TopologyBackend {
    async fn fetch(&self, url: &str) -> Result<Topology, MapError> {
        match self {
            Self::Http(source) => source.fetch(url).await,
            Self::Files(source) => source.fetch(url).await,
        }
    }
}
