#![forbid(unsafe_code)]

use std::{path::PathBuf, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot read directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("{what} timed out after {after:?}")]
    Timeout { what: &'static str, after: Duration },

    /// Failure reported by a fact source implementation.
    #[error(transparent)]
    Source(Box<dyn std::error::Error + Send + Sync>),
}
