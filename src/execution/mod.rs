//! Execution engine: worker protocol and result types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod python;

pub use python::NamespaceExecutor;

/// Result of running one piece of code against the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Everything the code printed, possibly empty.
    Success(String),
    /// The code raised. Namespace changes made before the raise are kept.
    Failure {
        kind: String,
        message: String,
        partial_output: String,
    },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Captured stdout, complete or partial.
    pub fn output(&self) -> &str {
        match self {
            Self::Success(output) => output,
            Self::Failure { partial_output, .. } => partial_output,
        }
    }
}

/// One NDJSON request line sent to the worker.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum WorkerRequest<'a> {
    Seed {
        bindings: &'a Map<String, Value>,
        aliases: &'a BTreeMap<String, String>,
    },
    Exec {
        code: &'a str,
    },
    Vars,
}

/// One NDJSON reply line. Fields not used by a given op are left at their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerReply {
    pub ok: bool,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub seeded: Vec<String>,
    #[serde(default)]
    pub skipped: BTreeMap<String, String>,
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

impl WorkerReply {
    pub fn into_outcome(self) -> ExecutionOutcome {
        if self.ok {
            ExecutionOutcome::Success(self.output)
        } else {
            ExecutionOutcome::Failure {
                kind: self.kind.unwrap_or_else(|| "Exception".into()),
                message: self.message.unwrap_or_default(),
                partial_output: self.output,
            }
        }
    }

    /// Error text for a failed non-exec request.
    pub fn error_text(&self) -> String {
        match (&self.kind, &self.message) {
            (Some(kind), Some(message)) => format!("{}: {}", kind, message),
            (Some(kind), None) => kind.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => "unknown error".into(),
        }
    }
}
