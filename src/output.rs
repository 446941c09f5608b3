//! Output formatting for the command line
//!
//! Rows produced by a datasource are dynamic key/value maps, so tables are built
//! column by column from the keys of the first row.

use crate::database::RowMap;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Output format shared by the CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Pretty table with borders (default)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// Compact JSON (single line)
    Json,
    /// Pretty-printed JSON with indentation
    JsonPretty,
    /// JSON Lines format (one JSON object per line)
    JsonLine,
    /// Pipe-separated values with header
    Psv,
}

impl OutputFormat {
    /// Check if this is a JSON variant
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty | Self::JsonLine)
    }

    /// Check if this is a table variant
    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table | Self::Markdown)
    }

    /// Get a list of all format names for help text
    pub fn all_names() -> &'static [&'static str] {
        &[
            "table",
            "markdown",
            "json",
            "json-pretty",
            "json-line",
            "psv",
        ]
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
            Self::JsonPretty => write!(f, "json-pretty"),
            Self::JsonLine => write!(f, "json-line"),
            Self::Psv => write!(f, "psv"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "pretty" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "json-pretty" | "jsonpretty" => Ok(Self::JsonPretty),
            "json-line" | "jsonline" | "jsonl" | "ndjson" => Ok(Self::JsonLine),
            "psv" | "pipe" => Ok(Self::Psv),
            _ => Err(format!(
                "Unknown output format '{}'. Valid formats: {}",
                s,
                Self::all_names().join(", ")
            )),
        }
    }
}

/// Text shown for one cell; strings unquoted, `null` empty
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn header(rows: &[RowMap]) -> Vec<String> {
    rows.first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default()
}

fn record(row: &RowMap, header: &[String]) -> Vec<String> {
    header
        .iter()
        .map(|key| row.get(key).map(cell_text).unwrap_or_default())
        .collect()
}

/// Render result rows in the requested format
pub fn format_rows(rows: &[RowMap], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(rows)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(rows)?),
        OutputFormat::JsonLine => {
            let lines = rows
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(lines.join("\n"))
        }
        OutputFormat::Psv => Ok(format_psv(rows)),
        OutputFormat::Table | OutputFormat::Markdown => Ok(format_table(rows, format)),
    }
}

fn format_psv(rows: &[RowMap]) -> String {
    let header = header(rows);
    let mut lines = vec![header.join("|")];
    lines.extend(rows.iter().map(|row| record(row, &header).join("|")));
    lines.join("\n")
}

#[cfg(feature = "display")]
fn format_table(rows: &[RowMap], format: OutputFormat) -> String {
    use tabled::builder::Builder;
    use tabled::settings::Style;

    if rows.is_empty() {
        return "(no rows)".to_string();
    }

    let header = header(rows);
    let mut builder = Builder::default();
    builder.push_record(header.clone());
    for row in rows {
        builder.push_record(record(row, &header));
    }

    let mut table = builder.build();
    match format {
        OutputFormat::Markdown => table.with(Style::markdown()),
        _ => table.with(Style::rounded()),
    };
    table.to_string()
}

#[cfg(not(feature = "display"))]
fn format_table(rows: &[RowMap], _format: OutputFormat) -> String {
    format_psv(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<RowMap> {
        let first = json!({"id": 1, "name": "ann", "note": null});
        let second = json!({"id": 2, "name": "bob", "note": "x"});
        vec![
            first.as_object().unwrap().clone(),
            second.as_object().unwrap().clone(),
        ]
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert_eq!("md".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert_eq!("jsonl".parse::<OutputFormat>(), Ok(OutputFormat::JsonLine));
        assert_eq!("PSV".parse::<OutputFormat>(), Ok(OutputFormat::Psv));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_display_round_trip() {
        for name in OutputFormat::all_names() {
            let format: OutputFormat = name.parse().unwrap();
            assert_eq!(&format.to_string(), name);
        }
        assert!(OutputFormat::JsonPretty.is_json());
        assert!(OutputFormat::Markdown.is_table());
    }

    #[test]
    fn test_format_psv() {
        let text = format_rows(&rows(), OutputFormat::Psv).unwrap();
        assert_eq!(text, "id|name|note\n1|ann|\n2|bob|x");
    }

    #[test]
    fn test_format_json_line() {
        let text = format_rows(&rows(), OutputFormat::JsonLine).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"id":1,"name":"ann","note":null}"#);
    }

    #[test]
    fn test_format_table_contains_cells() {
        let text = format_rows(&rows(), OutputFormat::Table).unwrap();
        assert!(text.contains("name"));
        assert!(text.contains("bob"));
    }
}
