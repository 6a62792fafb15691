//! The notebook code executor tool: install requested libraries, run code
//! against the shared namespace, return a text report.

use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    config::Config,
    error::WorkerError,
    execution::NamespaceExecutor,
    install::{Installer, DEFAULT_INSTALL_TIMEOUT},
    report,
};

pub const TOOL_NAME: &str = "Notebook Code Executor";

/// Function name in the tool schema; must match `^[a-zA-Z0-9_-]{1,64}$`.
pub const TOOL_FUNCTION_NAME: &str = "notebook_code_executor";

pub const TOOL_DESCRIPTION: &str = "Executes Python code directly using a persistent execution namespace \
(like a notebook's globals) and installs required libraries using pip. \
IMPORTANT: Allows access and modification of variables in the namespace. \
Use this for data analysis, preprocessing, modeling, etc. \
Input must be the Python code string and an optional list of libraries to install. \
Include print() statements in your code to see results. Returns captured stdout.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub r#type: String, // always "function"
    pub function: FunctionSchema,
}

/// Tool-call arguments as an agent sends them.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteArgs {
    pub code: String,
    #[serde(default)]
    pub required_libraries: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub python: PathBuf,
    /// Alias name -> module imported into the namespace when the name is unbound.
    pub aliases: BTreeMap<String, String>,
    pub install_timeout: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        let mut aliases = BTreeMap::new();
        aliases.insert("pd".to_string(), "pandas".to_string());
        aliases.insert("np".to_string(), "numpy".to_string());
        Self {
            python: PathBuf::from("python3"),
            aliases,
            install_timeout: DEFAULT_INSTALL_TIMEOUT,
        }
    }
}

impl ExecutorOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            python: cfg.python(),
            aliases: cfg.aliases(),
            install_timeout: cfg.install_timeout(),
        }
    }
}

pub struct NotebookCodeExecutor {
    installer: Installer,
    // Held for a whole call so concurrent callers run one after another.
    namespace: Mutex<NamespaceExecutor>,
}

impl NotebookCodeExecutor {
    /// `namespace` pre-populates the execution namespace; its bindings win over aliases.
    pub async fn new(
        options: ExecutorOptions,
        namespace: Option<Map<String, Value>>,
    ) -> Result<Self, WorkerError> {
        let installer = Installer::pip(options.python.clone()).timeout(options.install_timeout);
        let executor = NamespaceExecutor::start(
            options.python,
            namespace.unwrap_or_default(),
            options.aliases,
        )
        .await?;
        Ok(Self {
            installer,
            namespace: Mutex::new(executor),
        })
    }

    /// Replace the pip installer, e.g. with a different package manager command.
    pub fn with_installer(mut self, installer: Installer) -> Self {
        self.installer = installer;
        self
    }

    pub async fn from_config(
        cfg: &Config,
        namespace: Option<Map<String, Value>>,
    ) -> Result<Self, WorkerError> {
        Self::new(ExecutorOptions::from_config(cfg), namespace).await
    }

    /// Install `required_libraries` (if any), run `code`, and describe both.
    /// Every failure ends up in the returned text.
    pub async fn execute(&self, code: &str, required_libraries: Option<&[String]>) -> String {
        let mut namespace = self.namespace.lock().await;

        let libraries = required_libraries.unwrap_or_default();
        let records = if libraries.is_empty() {
            Vec::new()
        } else {
            info!(count = libraries.len(), "installing libraries");
            self.installer.install_all(libraries).await
        };

        let outcome = namespace.execute(code).await;
        info!(success = outcome.is_success(), "execution finished");
        report::assemble(&records, &outcome)
    }

    /// Entry point for a raw tool call: `{"code": "...", "required_libraries": [...]}`.
    pub async fn run_json(&self, args_json: &str) -> Result<String> {
        let args: ExecuteArgs = serde_json::from_str(args_json)
            .with_context(|| format!("invalid tool args json: {}", args_json))?;
        Ok(self
            .execute(&args.code, args.required_libraries.as_deref())
            .await)
    }

    pub async fn variables(&self) -> Result<BTreeMap<String, String>, WorkerError> {
        self.namespace.lock().await.variables().await
    }

    pub fn schema() -> ToolSchema {
        ToolSchema {
            r#type: "function".into(),
            function: FunctionSchema {
                name: TOOL_FUNCTION_NAME.into(),
                description: Some(format!("{}. {}", TOOL_NAME, TOOL_DESCRIPTION)),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "code": {
                            "type": "string",
                            "description": "The Python code to execute."
                        },
                        "required_libraries": {
                            "type": ["array", "null"],
                            "items": { "type": "string" },
                            "description": "A list of Python library names that need to be installed using pip before executing the code. Example: ['seaborn', 'pandas']"
                        }
                    },
                    "required": ["code"]
                }),
            },
        }
    }
}
