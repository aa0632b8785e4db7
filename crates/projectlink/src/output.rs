//! Output formatting: table or JSON.
//!
//! Table uses `tabled`; JSON serializes the original data via serde.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;

/// Render a list of serializable items in the chosen format.
pub fn render_list<T, R>(format: OutputFormat, data: &[T], to_row: impl Fn(&T) -> R) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Json => render_json(data),
    }
}

/// Render a single item; table mode uses the caller's detail view.
pub fn render_single<T>(format: OutputFormat, data: &T, detail_fn: impl Fn(&T) -> String) -> String
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data),
    }
}

pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

pub(crate) fn render_json<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).expect("serialization should not fail")
}

/// `label: value` lines with the labels dimmed on a terminal.
pub fn detail_lines(pairs: &[(&str, String)]) -> String {
    let color = io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    let width = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    pairs
        .iter()
        .map(|(key, value)| {
            let label = format!("{key:<width$}");
            if color {
                format!("{}  {value}", label.dimmed())
            } else {
                format!("{label}  {value}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Green `yes` / red `no` on a terminal.
pub fn yes_no(value: bool) -> String {
    let text = if value { "yes" } else { "no" };
    if !io::stdout().is_terminal() {
        return text.to_owned();
    }
    if value {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}
