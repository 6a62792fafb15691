use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "nbx", about = "Run Python code against a persistent namespace", version)]
#[command(group(ArgGroup::new("md_switch").args(["md", "no_md"]).multiple(false)))]
#[command(group(ArgGroup::new("source").args(["code", "file", "tool_call"]).multiple(false)))]
pub struct Cli {
    /// Python code to execute. Read from stdin when omitted.
    #[arg(value_name = "CODE")]
    pub code: Option<String>,

    /// Execute a file as a cell. Can be used multiple times; files run in order
    /// against the same namespace.
    #[arg(short = 'f', long = "file", action = clap::ArgAction::Append)]
    pub file: Vec<String>,

    /// Library to pip-install before the first cell runs (repeatable).
    #[arg(short = 'l', long = "lib", action = clap::ArgAction::Append)]
    pub lib: Vec<String>,

    /// Initial namespace binding as NAME=JSON, e.g. --var 'rows=[1,2,3]' (repeatable).
    #[arg(long = "var", action = clap::ArgAction::Append)]
    pub var: Vec<String>,

    /// Python interpreter hosting the namespace and running pip.
    #[arg(long)]
    pub python: Option<String>,

    /// Do not pre-import the configured aliases (pd, np, ...).
    #[arg(long = "no-aliases")]
    pub no_aliases: bool,

    /// Print namespace variables and their types after execution.
    #[arg(long)]
    pub vars: bool,

    /// Read tool-call JSON arguments ({"code": ..., "required_libraries": [...]}) from stdin.
    #[arg(long = "tool-call")]
    pub tool_call: bool,

    /// Print the tool's function schema as JSON and exit.
    #[arg(long = "tool-schema")]
    pub tool_schema: bool,

    /// Render reports as Markdown.
    #[arg(long)]
    pub md: bool,
    /// Print reports as plain text.
    #[arg(long = "no-md")]
    pub no_md: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

/// Split `NAME=JSON`. A value that is not valid JSON is taken as a plain string.
pub fn parse_var(raw: &str) -> Option<(String, serde_json::Value)> {
    let (name, value) = raw.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Some((name.to_string(), value))
}

/// Split stdin into cells on `# %%` marker lines. Blank cells are dropped.
pub fn split_cells(source: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    for line in source.lines() {
        if line.trim_start().starts_with("# %%") {
            cells.push(std::mem::take(&mut current));
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    cells.push(current);
    cells.retain(|c| !c.trim().is_empty());
    cells
}
