//! Operator-facing message styling.
//!
//! Headlines are coloured and status markers are emoji only when colour is
//! wanted: `--color always|never|auto`, where `auto` honours `NO_COLOR`,
//! `CLICOLOR`, `CLICOLOR_FORCE` and `TERM=dumb` before asking the terminal.

use std::env;

use clap::ValueEnum;
use console::style;

/// The `--color` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    Always,
    Never,
    #[default]
    Auto,
}

/// How messages are rendered for this run.
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    pub fn new(mode: ColorMode) -> Self {
        let use_color = match mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => terminal_wants_color(),
        };
        Self { use_color }
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn terminal_wants_color() -> bool {
    // NO_COLOR counts even when empty
    if env::var_os("NO_COLOR").is_some() || var("CLICOLOR").as_deref() == Some("0") {
        return false;
    }
    if var("CLICOLOR_FORCE").is_some_and(|v| !v.is_empty() && v != "0") {
        return true;
    }
    var("TERM").as_deref() != Some("dumb") && console::Term::stdout().features().colors_supported()
}

/// `symbol` when colour is on, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, symbol: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        symbol
    } else {
        plain
    }
}

/// Renders a headline: the banners announcing repository switches and the
/// final verdict of a run.
pub fn headline(config: &OutputConfig, text: &str) -> String {
    if config.use_color {
        style(text).magenta().bold().force_styling(true).to_string()
    } else {
        text.to_string()
    }
}

/// Indents every line of `text` by four spaces.
pub fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
