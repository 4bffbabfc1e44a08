#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitStatus;

/// Represents all possible errors that can occur in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The external tool could not be started.
    #[error("Failed to run {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external tool ran but reported failure.
    #[error("{} exited with {status}: {stderr}", program.display())]
    CommandFailed {
        program: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    /// `qemu-img` printed something that is not its JSON report.
    #[error("Failed to parse image info: {0}")]
    ImageInfo(#[from] serde_json::Error),

    /// Error occurred while querying the control-plane database.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No database URL was configured.
    #[error("Control plane database is not configured")]
    NotConfigured,
}

impl From<Error> for reconcile::Error {
    fn from(err: Error) -> Self {
        reconcile::Error::Source(Box::new(err))
    }
}
