//! Printers for reports: plain/colored text and markdown (termimad).

use owo_colors::OwoColorize;
use termimad::MadSkin;

use crate::config::Config;

pub struct TextPrinter {
    pub color: Option<String>,
}

impl TextPrinter {
    pub fn from_config(cfg: &Config) -> Self {
        Self { color: cfg.get("NBX_DEFAULT_COLOR").filter(|c| !c.trim().is_empty()) }
    }

    pub fn print(&self, text: &str) {
        match self.color.as_deref() {
            Some("green") => println!("{}", text.green()),
            Some("cyan") => println!("{}", text.cyan()),
            Some("magenta") => println!("{}", text.magenta()),
            Some("yellow") => println!("{}", text.yellow()),
            _ => println!("{}", text),
        }
    }
}

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }
}

/// Print a report either as markdown or as plain text.
pub fn print_report(cfg: &Config, markdown: bool, report: &str) {
    if markdown {
        MarkdownPrinter::default().print(report);
    } else {
        TextPrinter::from_config(cfg).print(report.trim_end_matches('\n'));
    }
}
