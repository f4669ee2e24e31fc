use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("HTTP {status} while fetching {url}")]
    Status { url: String, status: u16 },
    #[error("invalid topology: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("topology has no object named {0:?}")]
    MissingObject(String),
    #[error("arc index {0} is out of range")]
    InvalidArc(i64),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown map mode {0:?}, expected \"world\" or \"us\"")]
pub struct UnknownMapMode(pub String);
