//! Text report returned to the caller: optional installation section, then
//! the execution section.

use crate::execution::ExecutionOutcome;
use crate::install::{InstallOutcome, InstallRecord};

pub const INSTALL_BANNER: &str = "--- Installing Libraries ---";
pub const INSTALL_DONE_BANNER: &str = "--- Library Installation Finished ---";
pub const EXECUTE_BANNER: &str = "--- Executing Code ---";
pub const NO_PRINT_OUTPUT: &str = "[No Print Output]";

/// Empty when no libraries were requested.
pub fn installation_section(records: &[InstallRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }
    let mut log = format!("{}\n", INSTALL_BANNER);
    for record in records {
        let lib = &record.library;
        log.push_str(&format!("Attempting to install {}...\n", lib));
        match &record.outcome {
            InstallOutcome::Succeeded => {
                log.push_str(&format!("Successfully installed {}.\n", lib));
            }
            InstallOutcome::FailedWithExitCode { code, stderr } => {
                log.push_str(&format!(
                    "Failed to install {}. RetCode: {}\nStderr: {}\n",
                    lib, code, stderr
                ));
            }
            InstallOutcome::FailedWithError { message } => {
                log.push_str(&format!("Error installing {}: {}\n", lib, message));
            }
        }
    }
    log.push_str(&format!("{}\n\n", INSTALL_DONE_BANNER));
    log
}

pub fn execution_section(outcome: &ExecutionOutcome) -> String {
    let mut log = format!("{}\n", EXECUTE_BANNER);
    match outcome {
        ExecutionOutcome::Success(output) => {
            let shown = if output.is_empty() { NO_PRINT_OUTPUT } else { output.as_str() };
            log.push_str(&format!(
                "Code executed successfully. Output:\n{}",
                fenced(shown)
            ));
        }
        ExecutionOutcome::Failure {
            kind,
            message,
            partial_output,
        } => {
            log.push_str(&format!("Error executing code: {}: {}\n", kind, message));
            if !partial_output.is_empty() {
                log.push_str(&format!(
                    "Captured output before error:\n{}",
                    fenced(partial_output)
                ));
            }
        }
    }
    log
}

pub fn assemble(records: &[InstallRecord], outcome: &ExecutionOutcome) -> String {
    installation_section(records) + &execution_section(outcome)
}

fn fenced(body: &str) -> String {
    format!("```output\n{}\n```\n", body)
}
