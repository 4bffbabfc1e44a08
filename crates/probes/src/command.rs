#![forbid(unsafe_code)]

use crate::Error;
use std::ffi::OsStr;
use std::path::Path;
use tokio::process::Command;
use tracing::trace;

/// Run `program` with `args` and return its stdout.
///
/// A non-zero exit status is an error carrying the tool's stderr. The child is
/// killed if the returned future is dropped, so callers may wrap this in a
/// timeout.
pub(crate) async fn run<I, S>(program: &Path, args: I) -> Result<String, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args).kill_on_drop(true);
    trace!(?command, "running");

    let output = command.output().await.map_err(|source| Error::Spawn {
        program: program.to_owned(),
        source,
    })?;

    if !output.status.success() {
        return Err(Error::CommandFailed {
            program: program.to_owned(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
