#![forbid(unsafe_code)]

use crate::signals::SignalEvent;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to install signal handler: {0}")]
    SignalHandler(#[source] io::Error),

    #[error("Audit interrupted by {0:?}")]
    Interrupted(SignalEvent),

    #[error("No directory to audit: pass one or set `scan.directory`")]
    NoDirectory,

    #[error("Failed to write report: {0}")]
    Write(#[from] io::Error),

    #[error("Failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}
