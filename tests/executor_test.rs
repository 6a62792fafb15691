use std::collections::BTreeMap;
use std::process::Command;
use std::time::Duration;

use anyhow::Result;
use nbx::{ExecutorOptions, Installer, NotebookCodeExecutor};
use serde_json::{json, Map};

fn python() -> Option<String> {
    let candidate = std::env::var("NBX_PYTHON").unwrap_or_else(|_| "python3".into());
    let ok = Command::new(&candidate)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    ok.then_some(candidate)
}

fn options(python: String, aliases: &[(&str, &str)]) -> ExecutorOptions {
    ExecutorOptions {
        python: python.into(),
        aliases: aliases
            .iter()
            .map(|(a, m)| (a.to_string(), m.to_string()))
            .collect::<BTreeMap<_, _>>(),
        ..ExecutorOptions::default()
    }
}

macro_rules! require_python {
    () => {
        match python() {
            Some(p) => p,
            None => {
                println!("python interpreter not found; skipping");
                return Ok(());
            }
        }
    };
}

#[tokio::test]
async fn assignment_then_read_back() -> Result<()> {
    let py = require_python!();
    let tool = NotebookCodeExecutor::new(options(py, &[]), None).await?;

    let first = tool.execute("answer = 6 * 7", None).await;
    assert!(first.contains("Code executed successfully."), "{first}");
    assert!(first.contains("```output\n[No Print Output]\n```"), "{first}");

    let second = tool.execute("print(answer)", None).await;
    assert!(second.contains("```output\n42\n\n```"), "{second}");
    Ok(())
}

#[tokio::test]
async fn printed_text_is_captured_verbatim() -> Result<()> {
    let py = require_python!();
    let tool = NotebookCodeExecutor::new(options(py, &[]), None).await?;

    let report = tool.execute("print('  spaced\\tout  ', end='')", None).await;
    assert!(report.contains("```output\n  spaced\tout  \n```"), "{report}");
    Ok(())
}

#[tokio::test]
async fn partial_output_survives_an_error() -> Result<()> {
    let py = require_python!();
    let tool = NotebookCodeExecutor::new(options(py, &[]), None).await?;

    let report = tool
        .execute("print('partial')\nkept = 1\nraise ValueError('boom')", None)
        .await;
    assert!(report.contains("Error executing code: ValueError: boom"), "{report}");
    assert!(report.contains("Captured output before error:\n```output\npartial\n"), "{report}");

    // No rollback: the assignment before the raise is still there.
    let report = tool.execute("print(kept)", None).await;
    assert!(report.contains("```output\n1\n"), "{report}");
    Ok(())
}

#[tokio::test]
async fn state_accumulates_across_calls() -> Result<()> {
    let py = require_python!();
    let tool = NotebookCodeExecutor::new(options(py, &[]), None).await?;

    let code = "x = (x if 'x' in dir() else 0) + 1\nprint(x)";
    assert!(tool.execute(code, None).await.contains("```output\n1\n"));
    assert!(tool.execute(code, None).await.contains("```output\n2\n"));
    assert!(tool.execute(code, None).await.contains("```output\n3\n"));
    Ok(())
}

#[tokio::test]
async fn no_libraries_means_no_installation_section() -> Result<()> {
    let py = require_python!();
    let tool = NotebookCodeExecutor::new(options(py, &[]), None).await?;

    let omitted = tool.execute("pass", None).await;
    let empty = tool.execute("pass", Some(&[][..])).await;
    for report in [omitted, empty] {
        assert!(!report.contains("Installing Libraries"), "{report}");
        assert!(report.starts_with("--- Executing Code ---\n"), "{report}");
    }
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn failed_install_does_not_block_execution() -> Result<()> {
    let py = require_python!();
    let installer = Installer::with_command(
        "sh",
        [
            "-c",
            "[ \"$1\" = libA ] && exit 0; echo \"could not find $1\" >&2; exit 2",
            "sh",
        ],
    );
    let tool = NotebookCodeExecutor::new(options(py, &[]), None)
        .await?
        .with_installer(installer);

    let libs = vec!["libA".to_string(), "libB".to_string()];
    let report = tool.execute("print('ran')", Some(libs.as_slice())).await;

    let a = report.find("Successfully installed libA.").expect("libA line");
    let b = report
        .find("Failed to install libB. RetCode: 2\nStderr: could not find libB\n")
        .expect("libB line");
    assert!(a < b);
    assert!(report.contains("--- Library Installation Finished ---\n\n--- Executing Code ---"));
    assert!(report.contains("```output\nran\n"), "{report}");
    Ok(())
}

#[tokio::test]
async fn caller_bindings_win_over_aliases() -> Result<()> {
    let py = require_python!();
    let mut namespace = Map::new();
    namespace.insert("pd".into(), json!("mine"));
    let tool = NotebookCodeExecutor::new(
        options(py, &[("pd", "json"), ("j", "json")]),
        Some(namespace),
    )
    .await?;

    let report = tool.execute("print(pd)\nprint(j.dumps([1]))", None).await;
    assert!(report.contains("```output\nmine\n[1]\n"), "{report}");
    Ok(())
}

#[tokio::test]
async fn missing_alias_module_is_skipped() -> Result<()> {
    let py = require_python!();
    let tool = NotebookCodeExecutor::new(
        options(py, &[("nope", "nbx_module_that_does_not_exist")]),
        None,
    )
    .await?;

    let report = tool.execute("print('nope' in dir())", None).await;
    assert!(report.contains("```output\nFalse\n"), "{report}");
    Ok(())
}

#[tokio::test]
async fn system_exit_is_reported_and_worker_survives() -> Result<()> {
    let py = require_python!();
    let tool = NotebookCodeExecutor::new(options(py, &[]), None).await?;

    tool.execute("keep = 'still here'", None).await;
    let report = tool.execute("import sys\nsys.exit(4)", None).await;
    assert!(report.contains("Error executing code: SystemExit: 4"), "{report}");

    let report = tool.execute("print(keep)", None).await;
    assert!(report.contains("```output\nstill here\n"), "{report}");
    Ok(())
}

#[tokio::test]
async fn user_stdio_does_not_break_the_protocol() -> Result<()> {
    let py = require_python!();
    let tool = NotebookCodeExecutor::new(options(py, &[]), None).await?;

    let report = tool
        .execute(
            "import os, sys\nos.write(1, b'raw fd write\\n')\nsys.__stdout__.write('dunder\\n')\nprint(sys.stdin.read() == '')",
            None,
        )
        .await;
    assert!(report.contains("```output\nTrue\n"), "{report}");

    let report = tool.execute("print('next')", None).await;
    assert!(report.contains("```output\nnext\n"), "{report}");
    Ok(())
}

#[tokio::test]
async fn hard_exit_restarts_with_a_fresh_namespace() -> Result<()> {
    let py = require_python!();
    let mut namespace = Map::new();
    namespace.insert("seed".into(), json!(7));
    let tool = NotebookCodeExecutor::new(options(py, &[]), Some(namespace)).await?;

    tool.execute("lost = True", None).await;
    let report = tool.execute("import os\nos._exit(9)", None).await;
    assert!(report.contains("Error executing code: WorkerExited"), "{report}");

    let report = tool.execute("print(seed, 'lost' in dir())", None).await;
    assert!(report.contains("```output\n7 False\n"), "{report}");
    Ok(())
}

#[tokio::test]
async fn tool_call_json_and_variables() -> Result<()> {
    let py = require_python!();
    let tool = NotebookCodeExecutor::new(options(py, &[]), None).await?;

    let report = tool
        .run_json(r#"{"code": "def f(n):\n    return n * 2\ntotal = f(21)\nprint(total)"}"#)
        .await?;
    assert!(report.contains("```output\n42\n"), "{report}");
    assert!(tool.run_json("{not json").await.is_err());

    let vars = tool.variables().await?;
    assert_eq!(vars.get("total").map(String::as_str), Some("int"));
    assert_eq!(vars.get("f").map(String::as_str), Some("function"));
    assert!(!vars.contains_key("__builtins__"));
    Ok(())
}

#[tokio::test]
async fn missing_interpreter_fails_construction() {
    let opts = ExecutorOptions {
        python: "/nonexistent/nbx-python".into(),
        ..ExecutorOptions::default()
    };
    let err = NotebookCodeExecutor::new(opts, None).await.err().expect("spawn error");
    assert_eq!(err.kind(), "WorkerUnavailable");
}

#[tokio::test]
async fn non_ascii_output_round_trips() -> Result<()> {
    let py = require_python!();
    let tool = NotebookCodeExecutor::new(options(py, &[]), None).await?;

    let report = tool.execute("print('héllo 世界 🚀')", None).await;
    assert!(report.contains("```output\nhéllo 世界 🚀\n\n```"), "{report}");
    Ok(())
}

#[tokio::test]
async fn lone_surrogates_are_escaped_and_namespace_survives() -> Result<()> {
    let py = require_python!();
    let tool = NotebookCodeExecutor::new(options(py, &[]), None).await?;

    tool.execute("kept = 41", None).await;

    let report = tool
        .execute("print(b'\\xff'.decode('utf-8', 'surrogateescape'))", None)
        .await;
    assert!(report.contains("Code executed successfully."), "{report}");
    assert!(report.contains("```output\n\\udcff\n"), "{report}");

    let report = tool
        .execute("print('before \\ud800')\nraise KeyError('\\ud800')", None)
        .await;
    assert!(report.contains("Error executing code: KeyError: '\\ud800'"), "{report}");
    assert!(report.contains("```output\nbefore \\ud800\n"), "{report}");

    let report = tool.execute("print(kept + 1)", None).await;
    assert!(report.contains("```output\n42\n"), "{report}");
    Ok(())
}

#[tokio::test]
async fn concurrent_calls_run_one_after_another() -> Result<()> {
    let py = require_python!();
    let mut namespace = Map::new();
    namespace.insert("counter".into(), json!(0));
    let tool = NotebookCodeExecutor::new(options(py, &[]), Some(namespace)).await?;

    let alpha = "import time\nfor i in range(50):\n    print('alpha-%d' % i)\n    counter = counter + 1\n    time.sleep(0.001)\n";
    let beta = "import time\nfor i in range(30):\n    print('beta-%d' % i)\n    counter = counter + 1\n    time.sleep(0.001)\n";
    let (a, b) = tokio::join!(tool.execute(alpha, None), tool.execute(beta, None));

    assert_eq!(a.matches("alpha-").count(), 50, "{a}");
    assert_eq!(a.matches("beta-").count(), 0, "{a}");
    assert_eq!(b.matches("beta-").count(), 30, "{b}");
    assert_eq!(b.matches("alpha-").count(), 0, "{b}");

    let report = tool.execute("print(counter)", None).await;
    assert!(report.contains("```output\n80\n"), "{report}");
    Ok(())
}

#[tokio::test]
async fn worker_that_closes_its_channel_but_lingers_is_killed() -> Result<()> {
    let py = require_python!();
    let tool = NotebookCodeExecutor::new(options(py, &[]), None).await?;

    // Closing the reply channel makes the worker loop fail, but the
    // non-daemon thread keeps the interpreter alive.
    let code = "import __main__, threading, time\n\
                threading.Thread(target=time.sleep, args=(60,)).start()\n\
                __main__._proto_out.close()";
    let report = tokio::time::timeout(Duration::from_secs(30), tool.execute(code, None))
        .await
        .expect("call must not hang on a lingering worker");
    assert!(report.contains("Error executing code: WorkerExited"), "{report}");

    let report = tool.execute("print('fresh')", None).await;
    assert!(report.contains("```output\nfresh\n"), "{report}");
    Ok(())
}
