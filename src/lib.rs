//! Notebook-style code execution for agents: install libraries with pip, run
//! Python against a namespace that persists between calls, and report captured
//! output as text.

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod install;
pub mod logging;
pub mod printer;
pub mod process;
pub mod report;
pub mod tool;

pub use error::WorkerError;
pub use execution::ExecutionOutcome;
pub use install::{InstallOutcome, InstallRecord, Installer};
pub use tool::{ExecutorOptions, NotebookCodeExecutor};
