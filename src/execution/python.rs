//! Namespace executor backed by a long-lived Python worker.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::{ExecutionOutcome, WorkerReply, WorkerRequest};
use crate::error::WorkerError;
use crate::process::{
    python::{start_python, BOOTSTRAP},
    ProcessHandle,
};

/// Owns the execution namespace. Variables, imports and definitions made by one
/// `execute` call stay visible to the next.
pub struct NamespaceExecutor {
    python: PathBuf,
    bindings: Map<String, Value>,
    aliases: BTreeMap<String, String>,
    worker: Option<ProcessHandle>,
}

impl NamespaceExecutor {
    /// Start the worker and seed its namespace: caller bindings first, then each
    /// alias whose name is still unbound.
    pub async fn start(
        python: impl Into<PathBuf>,
        bindings: Map<String, Value>,
        aliases: BTreeMap<String, String>,
    ) -> Result<Self, WorkerError> {
        let mut executor = Self {
            python: python.into(),
            bindings,
            aliases,
            worker: None,
        };
        executor.worker().await?;
        Ok(executor)
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    /// Run `code` to completion. Worker failures are reported as outcomes too;
    /// if the worker died, the next call starts a fresh one.
    pub async fn execute(&mut self, code: &str) -> ExecutionOutcome {
        debug!(bytes = code.len(), "executing code");
        match self.call(&WorkerRequest::Exec { code }).await {
            Ok(reply) => {
                let outcome = reply.into_outcome();
                if let ExecutionOutcome::Failure { kind, message, .. } = &outcome {
                    debug!(%kind, %message, "code raised");
                }
                outcome
            }
            Err(err) => {
                warn!(error = %err, "python worker call failed");
                ExecutionOutcome::Failure {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                    partial_output: String::new(),
                }
            }
        }
    }

    /// Names currently bound in the namespace, mapped to their type names.
    pub async fn variables(&mut self) -> Result<BTreeMap<String, String>, WorkerError> {
        let reply = self.call(&WorkerRequest::Vars).await?;
        if !reply.ok {
            return Err(WorkerError::Rejected(reply.error_text()));
        }
        Ok(reply.vars)
    }

    async fn call(&mut self, request: &WorkerRequest<'_>) -> Result<WorkerReply, WorkerError> {
        let worker = self.worker().await?;
        let result = exchange(worker, request).await;
        if let Err(err) = &result {
            if err.resets_worker() {
                warn!(error = %err, "python worker lost; namespace state is gone");
                self.worker = None;
            }
        }
        result
    }

    async fn worker(&mut self) -> Result<&mut ProcessHandle, WorkerError> {
        if self.worker.is_none() {
            let mut handle = start_python(&self.python, BOOTSTRAP)?;
            let reply = exchange(
                &mut handle,
                &WorkerRequest::Seed {
                    bindings: &self.bindings,
                    aliases: &self.aliases,
                },
            )
            .await?;
            if !reply.ok {
                return Err(WorkerError::Rejected(reply.error_text()));
            }
            for (alias, reason) in &reply.skipped {
                warn!(%alias, %reason, "alias not seeded");
            }
            info!(seeded = ?reply.seeded, bindings = self.bindings.len(), "namespace ready");
            self.worker = Some(handle);
        }
        self.worker
            .as_mut()
            .ok_or_else(|| WorkerError::Rejected("worker not running".into()))
    }
}

async fn exchange(
    handle: &mut ProcessHandle,
    request: &WorkerRequest<'_>,
) -> Result<WorkerReply, WorkerError> {
    let mut line = serde_json::to_string(request)?;
    line.push('\n');
    if let Err(err) = write_line(handle, &line).await {
        if err.kind() == std::io::ErrorKind::BrokenPipe {
            return Err(WorkerError::Exited { status: handle.exit_status().await });
        }
        return Err(err.into());
    }

    let mut reply = String::new();
    if handle.stdout.read_line(&mut reply).await? == 0 {
        return Err(WorkerError::Exited { status: handle.exit_status().await });
    }
    Ok(serde_json::from_str(&reply)?)
}

async fn write_line(handle: &mut ProcessHandle, line: &str) -> std::io::Result<()> {
    handle.stdin.write_all(line.as_bytes()).await?;
    handle.stdin.flush().await
}
