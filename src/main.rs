use std::io::{self, Read};

use anyhow::{anyhow, bail, Context, Result};
use is_terminal::IsTerminal;
use serde_json::Map;

use nbx::{
    cli::{self, Cli},
    config::Config,
    logging, printer,
    tool::NotebookCodeExecutor,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut cfg = Config::load();
    logging::init(&cfg);

    if args.tool_schema {
        println!("{}", serde_json::to_string_pretty(&NotebookCodeExecutor::schema())?);
        return Ok(());
    }

    // CLI overrides config
    if let Some(python) = args.python.as_deref() {
        cfg.set("NBX_PYTHON", python);
    }
    if args.no_aliases {
        cfg.set("NBX_ALIASES", "");
    }
    let markdown = if args.no_md {
        false
    } else if args.md {
        true
    } else {
        cfg.get_bool("NBX_PRETTIFY_MARKDOWN")
    };

    let mut namespace = Map::new();
    for raw in &args.var {
        let (name, value) =
            cli::parse_var(raw).ok_or_else(|| anyhow!("--var expects NAME=JSON, got `{}`", raw))?;
        namespace.insert(name, value);
    }

    let stdin_is_tty = io::stdin().is_terminal();
    let read_stdin = || -> Result<String> {
        if stdin_is_tty {
            bail!("no code given; pass CODE, --file, or pipe code on stdin");
        }
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    };

    let executor = NotebookCodeExecutor::from_config(&cfg, Some(namespace))
        .await
        .with_context(|| format!("starting python worker with {}", cfg.python().display()))?;

    if args.tool_call {
        let report = executor.run_json(&read_stdin()?).await?;
        printer::print_report(&cfg, markdown, &report);
    } else {
        let cells = if let Some(code) = args.code {
            vec![code]
        } else if !args.file.is_empty() {
            let mut cells = Vec::with_capacity(args.file.len());
            for path in &args.file {
                cells.push(
                    std::fs::read_to_string(path)
                        .with_context(|| format!("reading {}", path))?,
                );
            }
            cells
        } else {
            cli::split_cells(&read_stdin()?)
        };

        for (i, cell) in cells.iter().enumerate() {
            // Libraries are installed once, ahead of the first cell
            let libs = if i == 0 { Some(args.lib.as_slice()) } else { None };
            let report = executor.execute(cell, libs).await;
            printer::print_report(&cfg, markdown, &report);
        }
    }

    if args.vars {
        let vars = executor.variables().await?;
        for (name, ty) in vars {
            println!("{}: {}", name, ty);
        }
    }

    Ok(())
}
