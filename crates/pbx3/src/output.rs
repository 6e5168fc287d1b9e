//! Output formatting: table, JSON, YAML, plain.
//!
//! Responses are schemaless JSON, so tables are built from whatever keys
//! the rows carry; structured formats go through serde.

use std::collections::BTreeSet;
use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use pbx3_api::Payload;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Highlight a heading when color is on.
pub fn heading(text: &str, color: bool) -> String {
    if color {
        text.bold().cyan().to_string()
    } else {
        text.to_owned()
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a response payload. Text bodies are passed through untouched.
pub fn render_payload(format: OutputFormat, payload: &Payload) -> Result<String, CliError> {
    match payload {
        Payload::Empty => Ok(String::new()),
        Payload::Text(text) => Ok(text.clone()),
        Payload::Json(value) => render_value(format, value),
    }
}

/// Render an arbitrary JSON value in the chosen format.
pub fn render_value(format: OutputFormat, value: &Value) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => render_json(value, false),
        OutputFormat::JsonCompact => render_json(value, true),
        OutputFormat::Yaml => render_yaml(value),
        OutputFormat::Plain => Ok(render_plain(value)),
        OutputFormat::Table => Ok(match value {
            Value::Array(rows) => render_rows(rows),
            Value::Object(_) => render_rows(std::slice::from_ref(value)),
            other => plain_scalar(other),
        }),
    }
}

/// Render a list of rows; `table` uses the union of their scalar keys.
pub fn render_list(format: OutputFormat, rows: &[Value]) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(render_rows(rows)),
        OutputFormat::Plain => Ok(rows.iter().map(row_identifier).collect::<Vec<_>>().join("\n")),
        OutputFormat::Json => render_json(rows, false),
        OutputFormat::JsonCompact => render_json(rows, true),
        OutputFormat::Yaml => render_yaml(rows),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(CliError::from)
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}

/// Arrays one element per line; everything else as a single line.
fn render_plain(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(plain_scalar).collect::<Vec<_>>().join("\n"),
        other => plain_scalar(other),
    }
}

/// Strings unquoted, null empty, structures as compact JSON.
fn plain_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `pkey` is the primary key on every PBX3 resource; fall back to `id`.
fn row_identifier(row: &Value) -> String {
    ["pkey", "id"]
        .iter()
        .find_map(|key| row.get(key))
        .map_or_else(|| plain_scalar(row), plain_scalar)
}

fn render_rows(rows: &[Value]) -> String {
    let mut columns = BTreeSet::new();
    for row in rows {
        if let Value::Object(map) = row {
            columns.extend(
                map.iter()
                    .filter(|(_, v)| !v.is_array() && !v.is_object())
                    .map(|(k, _)| k.as_str()),
            );
        }
    }
    if columns.is_empty() {
        return render_plain(&Value::Array(rows.to_vec()));
    }

    // Primary key first, the rest alphabetical.
    let mut ordered: Vec<&str> = Vec::with_capacity(columns.len());
    if columns.remove("pkey") {
        ordered.push("pkey");
    }
    ordered.extend(columns);

    let mut builder = Builder::default();
    builder.push_record(ordered.iter().map(|col| (*col).to_owned()));
    for row in rows {
        builder.push_record(
            ordered
                .iter()
                .map(|col| row.get(col).map(plain_scalar).unwrap_or_default()),
        );
    }
    builder.build().with(Style::rounded()).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn plain_lists_use_primary_key() {
        let rows = vec![json!({"pkey": "1000", "desc": "Reception"}), json!({"id": 7}), json!("x")];
        assert_eq!(render_list(OutputFormat::Plain, &rows).unwrap(), "1000\n7\nx");
    }

    #[test]
    fn table_puts_pkey_first_and_skips_nested() {
        let rows = vec![
            json!({"pkey": "1000", "desc": "Reception", "cfim": null, "opts": {"a": 1}}),
            json!({"pkey": "1001", "active": "YES"}),
        ];
        let table = render_list(OutputFormat::Table, &rows).unwrap();
        let header = table.lines().nth(1).unwrap();
        let pkey = header.find("pkey").unwrap();
        let active = header.find("active").unwrap();
        assert!(pkey < active);
        assert!(!table.contains("opts"));
        assert!(table.contains("Reception"));
    }

    #[test]
    fn payload_text_is_passed_through() {
        let out = render_payload(OutputFormat::Json, &Payload::Text("OK".into())).unwrap();
        assert_eq!(out, "OK");
        assert!(render_payload(OutputFormat::Json, &Payload::Empty).unwrap().is_empty());
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_value(OutputFormat::JsonCompact, &json!({"a": [1, 2]})).unwrap();
        assert_eq!(out, r#"{"a":[1,2]}"#);
    }
}
