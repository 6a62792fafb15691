//! Per-library package installation through `<python> -m pip install <name>`.

use std::{path::PathBuf, process::Stdio, time::Duration};

use tokio::{process::Command, time::timeout};
use tracing::{info, warn};

pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Succeeded,
    /// The installer ran and exited non-zero.
    FailedWithExitCode { code: i32, stderr: String },
    /// The installer could not be run or did not finish in time.
    FailedWithError { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRecord {
    pub library: String,
    pub outcome: InstallOutcome,
}

#[derive(Debug, Clone)]
pub struct Installer {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl Installer {
    /// Installer that runs pip through the given interpreter.
    pub fn pip(python: impl Into<PathBuf>) -> Self {
        Self::with_command(python, ["-m", "pip", "install"])
    }

    /// Arbitrary command; the library name is appended as the last argument.
    pub fn with_command<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            timeout: DEFAULT_INSTALL_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Install each library in order. A failure never stops the next attempt.
    pub async fn install_all(&self, libraries: &[String]) -> Vec<InstallRecord> {
        let mut records = Vec::with_capacity(libraries.len());
        for library in libraries {
            let outcome = self.install(library).await;
            records.push(InstallRecord {
                library: library.clone(),
                outcome,
            });
        }
        records
    }

    pub async fn install(&self, library: &str) -> InstallOutcome {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(library)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(%library, error = %e, "installer failed to start");
                return InstallOutcome::FailedWithError {
                    message: format!("failed to run `{}`: {}", self.command_line(library), e),
                };
            }
        };

        let out = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(out)) => out,
            Ok(Err(e)) => {
                warn!(%library, error = %e, "installer I/O failed");
                return InstallOutcome::FailedWithError { message: e.to_string() };
            }
            Err(_) => {
                warn!(%library, timeout_secs = self.timeout.as_secs(), "installer timed out");
                return InstallOutcome::FailedWithError {
                    message: format!(
                        "`{}` timed out after {} seconds",
                        self.command_line(library),
                        self.timeout.as_secs()
                    ),
                };
            }
        };

        let code = out.status.code().unwrap_or(-1);
        if code == 0 {
            info!(%library, "installed");
            InstallOutcome::Succeeded
        } else {
            warn!(%library, code, "installer exited non-zero");
            InstallOutcome::FailedWithExitCode {
                code,
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            }
        }
    }

    fn command_line(&self, library: &str) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.push(library.to_string());
        parts.join(" ")
    }
}
