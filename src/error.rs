// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a prune run.
///
/// "Nothing to remove" and short parallel series are not errors; they are
/// reported through [`crate::prune::Outcome`] and tolerated respectively.
#[derive(Debug, Error)]
pub enum PruneError {
    #[error("fetching {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("loading {path:?} failed: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("backup target {path:?} already exists; refusing to overwrite")]
    BackupCollision { path: PathBuf },

    #[error("writing {path:?} failed: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("server restart failed: {0}")]
    Restart(String),
}
