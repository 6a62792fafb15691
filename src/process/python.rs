//! Python interpreter process bootstrap.

use std::path::Path;
use std::process::Stdio;

use tokio::io::BufReader;
use tokio::process::{Child, Command};
use tracing::debug;

use super::ProcessHandle;
use crate::error::WorkerError;

/// Worker loop that owns the namespace and speaks NDJSON on stdin/stdout.
pub const BOOTSTRAP: &str = include_str!("bootstrap.py");

pub fn start_python(python: &Path, bootstrap: &str) -> Result<ProcessHandle, WorkerError> {
    let mut cmd = Command::new(python);
    cmd.arg("-u") // unbuffered
        .arg("-c")
        .arg(bootstrap)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let mut child: Child = cmd.spawn().map_err(|source| WorkerError::Spawn {
        program: python.display().to_string(),
        source,
    })?;
    debug!(pid = ?child.id(), python = %python.display(), "started python worker");

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| WorkerError::Rejected("worker has no stdin".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| WorkerError::Rejected("worker has no stdout".into()))?;

    Ok(ProcessHandle {
        child,
        stdin,
        stdout: BufReader::new(stdout),
    })
}
