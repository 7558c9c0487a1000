//! Common utility functions for lens modules
//!
//! This module provides the output format shared by every command and the
//! row renderer used to print lens results.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Unified output format for all lens commands
///
/// This enum provides a consistent set of output formats that can be used
/// across all opacidb commands. Commands that don't support a particular
/// format should return an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Pretty table with borders (default)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// Compact JSON (single line per object)
    Json,
    /// Pretty-printed JSON with indentation
    JsonPretty,
    /// JSON Lines format (one JSON object per line, for streaming)
    JsonLine,
    /// Pipe-separated values with header
    Psv,
}

impl OutputFormat {
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

/// Render rows in the requested output format
///
/// Tables and PSV use the `Tabled` headers and fields; the JSON variants
/// use the `Serialize` impl, so fields skipped in tables still show up.
pub fn format_rows<T>(rows: &[T], format: OutputFormat) -> Result<String>
where
    T: Tabled + Serialize,
{
    let output = match format {
        OutputFormat::Table => Table::new(rows).with(Style::rounded()).to_string(),
        OutputFormat::Markdown => Table::new(rows).with(Style::markdown()).to_string(),
        OutputFormat::Json => serde_json::to_string(rows)
            .map_err(|e| anyhow!("Failed to serialize to JSON: {}", e))?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(rows)
            .map_err(|e| anyhow!("Failed to serialize to JSON: {}", e))?,
        OutputFormat::JsonLine => rows
            .iter()
            .map(|r| {
                serde_json::to_string(r).map_err(|e| anyhow!("Failed to serialize to JSON: {}", e))
            })
            .collect::<Result<Vec<_>>>()?
            .join("\n"),
        OutputFormat::Psv => {
            let mut lines = vec![T::headers().join("|")];
            lines.extend(rows.iter().map(|r| r.fields().join("|")));
            lines.join("\n")
        }
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(
            OutputFormat::from_str("table").unwrap(),
            OutputFormat::Table
        );
        assert_eq!(
            OutputFormat::from_str("pretty").unwrap(),
            OutputFormat::Table
        );
        assert_eq!(
            OutputFormat::from_str("markdown").unwrap(),
            OutputFormat::Markdown
        );
        assert_eq!(
            OutputFormat::from_str("md").unwrap(),
            OutputFormat::Markdown
        );
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(
            OutputFormat::from_str("json-pretty").unwrap(),
            OutputFormat::JsonPretty
        );
        assert_eq!(
            OutputFormat::from_str("json-line").unwrap(),
            OutputFormat::JsonLine
        );
        assert_eq!(
            OutputFormat::from_str("jsonl").unwrap(),
            OutputFormat::JsonLine
        );
        assert_eq!(OutputFormat::from_str("psv").unwrap(), OutputFormat::Psv);
        assert!(OutputFormat::from_str("invalid").is_err());
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Markdown.to_string(), "markdown");
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::JsonPretty.to_string(), "json-pretty");
        assert_eq!(OutputFormat::JsonLine.to_string(), "json-line");
        assert_eq!(OutputFormat::Psv.to_string(), "psv");
    }

    #[derive(Serialize, Tabled)]
    struct Row {
        molecule: String,
        temperature: f64,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                molecule: "H2H2".to_string(),
                temperature: 300.0,
            },
            Row {
                molecule: "H2He".to_string(),
                temperature: 75.5,
            },
        ]
    }

    #[test]
    fn test_format_rows_psv() {
        let out = format_rows(&rows(), OutputFormat::Psv).unwrap();
        assert_eq!(out, "molecule|temperature\nH2H2|300\nH2He|75.5");
    }

    #[test]
    fn test_format_rows_json() {
        let out = format_rows(&rows(), OutputFormat::Json).unwrap();
        assert_eq!(
            out,
            r#"[{"molecule":"H2H2","temperature":300.0},{"molecule":"H2He","temperature":75.5}]"#
        );

        let out = format_rows(&rows(), OutputFormat::JsonLine).unwrap();
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn test_format_rows_tables() {
        let out = format_rows(&rows(), OutputFormat::Markdown).unwrap();
        assert!(out.contains("| molecule |"));
        assert!(out.contains("H2He"));

        let out = format_rows(&rows(), OutputFormat::Table).unwrap();
        assert!(out.contains("H2H2"));
    }
}
