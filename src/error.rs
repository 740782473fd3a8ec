use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("request to {url} failed")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not parse {what}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    // A ranking entry without timestamp/ep would silently skew updatedAt, so it fails the run.
    #[error("rank {rank}: entry #{index} is malformed")]
    DataShape {
        rank: u32,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("i/o error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
