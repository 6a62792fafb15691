use std::io;

use thiserror::Error;

/// Failures talking to the Python worker that hosts the namespace.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The interpreter could not be started
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("worker I/O error: {0}")]
    Io(#[from] io::Error),

    /// A reply line that is not valid protocol JSON
    #[error("malformed worker reply: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("worker exited ({})", exit_label(.status))]
    Exited { status: Option<i32> },

    /// The worker answered a non-exec request with an error
    #[error("worker rejected request: {0}")]
    Rejected(String),
}

impl WorkerError {
    /// Error-kind name used when this failure is reported as an execution outcome.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "WorkerUnavailable",
            Self::Io(_) => "WorkerIoError",
            Self::Protocol(_) => "WorkerProtocolError",
            Self::Exited { .. } => "WorkerExited",
            Self::Rejected(_) => "WorkerRejected",
        }
    }

    /// Whether the worker can no longer be trusted and must be replaced.
    /// A reply that fails to decode still leaves the channel line-aligned.
    pub fn resets_worker(&self) -> bool {
        matches!(self, Self::Spawn { .. } | Self::Io(_) | Self::Exited { .. })
    }
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "killed by signal".to_string(),
    }
}
