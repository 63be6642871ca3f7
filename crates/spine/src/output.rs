use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One JSON document per line.
pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Two-column table of labelled values.
pub fn print_kv_table(rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["FIELD", "VALUE"]);
    for (label, value) in rows {
        table.add_row(vec![label.to_string(), value.clone()]);
    }
    println!("{table}");
}

/// Aligned `label: value` lines.
pub fn print_kv_lines(title: &str, rows: &[(&str, String)]) {
    println!("{title}:");
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in rows {
        println!("  {:<width$}  {}", format!("{label}:"), value, width = width + 1);
    }
}

pub fn print_record<T: Serialize>(
    value: &T,
    title: &str,
    rows: &[(&str, String)],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => print_kv_table(rows),
        OutputFormat::Pretty => print_kv_lines(title, rows),
    }
}

pub fn or_unknown<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}
