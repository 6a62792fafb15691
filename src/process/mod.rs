//! Interpreter process management (startup/IO).

use std::time::Duration;

use tokio::io::BufReader;
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::time::timeout;
use tracing::warn;

pub mod python;

/// How long a worker that closed its pipes gets to exit before it is killed.
pub const EXIT_GRACE: Duration = Duration::from_secs(2);

/// A running worker: its stdin carries requests, its stdout carries replies.
pub struct ProcessHandle {
    pub child: Child,
    pub stdin: ChildStdin,
    pub stdout: BufReader<ChildStdout>,
}

impl ProcessHandle {
    /// Exit code once the process has finished; `None` if it died by signal or
    /// had to be killed after `EXIT_GRACE`.
    pub async fn exit_status(&mut self) -> Option<i32> {
        match timeout(EXIT_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => status.code(),
            Ok(Err(_)) => None,
            Err(_) => {
                warn!(pid = ?self.child.id(), "worker closed its pipes but kept running; killing it");
                let _ = self.child.kill().await;
                None
            }
        }
    }
}
