#![forbid(unsafe_code)]

use crate::error::Error;
use tokio::signal::unix::{SignalKind, signal};

/// Resolves on the first SIGINT or SIGTERM.
pub async fn wait_for_signal() -> Result<SignalEvent, Error> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(Error::SignalHandler)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(Error::SignalHandler)?;

    tokio::select! {
        _ = sigint.recv() => Ok(SignalEvent::SigINT),
        _ = sigterm.recv() => Ok(SignalEvent::SigTERM),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    SigINT,
    SigTERM,
}
