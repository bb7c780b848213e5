pub mod config;
pub mod explain;
pub mod functions;
pub mod run;

use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{Table, presets::UTF8_FULL};
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct OutputContext {
    pub table: bool,
    pub csv: bool,
    pub pretty: bool,
    pub verbose: bool,
}

impl OutputContext {
    /// Result rows: a table or CSV when asked for, a JSON array otherwise
    pub fn print_rows(&self, rows: &[Value]) -> Result<()> {
        if !self.table && !self.csv {
            return self.print_json(&rows);
        }

        let columns = row_columns(rows);
        let cells: Vec<Vec<String>> = rows.iter().map(|row| row_cells(row, &columns)).collect();

        if self.csv {
            println!("{}", columns.join(","));
            for row in cells {
                let escaped: Vec<String> = row.iter().map(|cell| csv_escape(cell)).collect();
                println!("{}", escaped.join(","));
            }
            return Ok(());
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(&columns);
        for row in cells {
            table.add_row(row);
        }
        println!("{table}");
        Ok(())
    }

    pub fn print_json<T: serde::Serialize>(&self, data: &T) -> Result<()> {
        let text = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        println!("{text}");
        Ok(())
    }

    pub fn print_success(&self, message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    pub fn print_info(&self, message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }
}

/// Column names for tabular output: object keys in first-seen order, plus
/// `value` when some row is not an object
pub fn row_columns(rows: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    let mut scalar = false;
    for row in rows {
        match row {
            Value::Object(map) => {
                for key in map.keys() {
                    if !columns.contains(key) {
                        columns.push(key.clone());
                    }
                }
            }
            _ => scalar = true,
        }
    }
    if scalar && !columns.iter().any(|c| c == "value") {
        columns.push("value".to_string());
    }
    columns
}

fn row_cells(row: &Value, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|column| match row {
            Value::Object(map) => map.get(column).map(value_to_string).unwrap_or_default(),
            other if column == "value" => value_to_string(other),
            _ => String::new(),
        })
        .collect()
}

pub fn value_to_string(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => v.to_string(),
    }
}

fn csv_escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Read and parse a JSON file
pub fn read_json(path: &Path) -> Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}
