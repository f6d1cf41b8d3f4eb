//! Output formatting for the pim CLI.
//!
//! Text output is one line per record (`id  key:value ...`), JSON output is
//! pretty-printed and wraps lists in a `{ "<name>": [...], "count": n }`
//! envelope.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write as _};

/// How command results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON, for scripts
    Json,
    /// One line per record, for people
    #[default]
    Text,
}

/// Fields printed first, without a label, in text output.
const ID_KEYS: [&str; 3] = ["id", "project_id", "template_id"];

#[derive(Debug, Clone, Copy, Default)]
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render one value.
    ///
    /// # Errors
    ///
    /// Fails if `data` cannot be serialized.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let rendered = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(data)?,
            OutputFormat::Text => render_text(&serde_json::to_value(data)?),
        };
        Ok(rendered)
    }

    /// Render a collection. JSON wraps it as `{ <name>: [...], "count": n }`;
    /// text prints `empty_message` when there is nothing to show.
    ///
    /// # Errors
    ///
    /// Fails if `data` cannot be serialized.
    pub fn format_list<T: Serialize>(
        &self,
        data: &[T],
        empty_message: &str,
        collection_name: &str,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let mut envelope = serde_json::Map::new();
                envelope.insert(collection_name.to_string(), serde_json::to_value(data)?);
                envelope.insert("count".to_string(), Value::from(data.len()));
                Ok(serde_json::to_string_pretty(&Value::Object(envelope))?)
            }
            OutputFormat::Text if data.is_empty() => Ok(empty_message.to_string()),
            OutputFormat::Text => self.format(&data),
        }
    }

    /// [`Self::format`], written to stdout.
    ///
    /// # Errors
    ///
    /// Fails on serialization or write errors.
    pub fn print<T: Serialize>(&self, data: &T) -> Result<()> {
        emit(&self.format(data)?)
    }

    /// [`Self::format_list`], written to stdout.
    ///
    /// # Errors
    ///
    /// Fails on serialization or write errors.
    pub fn print_list<T: Serialize>(
        &self,
        data: &[T],
        empty_message: &str,
        collection_name: &str,
    ) -> Result<()> {
        emit(&self.format_list(data, empty_message, collection_name)?)
    }
}

fn emit(rendered: &str) -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{rendered}")?;
    Ok(())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Records become `id  key:value ...` lines; arrays become one line each.
fn render_text(value: &Value) -> String {
    match value {
        Value::Array(rows) => rows.iter().map(render_text).collect::<Vec<_>>().join("\n"),
        Value::Object(map) => {
            let ids = ID_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .filter(|v| !v.is_null())
                .map(render_scalar);
            let labelled = map
                .iter()
                .filter(|(key, v)| !ID_KEYS.contains(&key.as_str()) && !is_blank(v))
                .map(|(key, v)| format!("{key}:{}", render_scalar(v)));
            ids.chain(labelled).collect::<Vec<_>>().join("  ")
        }
        other => render_scalar(other),
    }
}

/// Inline form of a single value; nested structures stay on one line.
fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) if s.chars().any(char::is_whitespace) => {
            format!("\"{}\"", s.replace('\n', "\\n"))
        }
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(render_scalar).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| format!("{k}:{}", render_scalar(v)))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pim_core::model::{BlockType, Element, Project, ProjectStatus, ValueType};

    fn project() -> Project {
        Project {
            id: Some(3),
            meeting_name: "Q3 Kickoff".to_string(),
            client_name: "Acme".to_string(),
            status: Some(ProjectStatus::Active),
            ..Project::default()
        }
    }

    #[test]
    fn test_text_puts_id_first_and_skips_empty() {
        let output = Formatter::new(OutputFormat::Text).format(&project()).unwrap();
        assert!(output.starts_with("3  "));
        assert!(output.contains("meeting_name:\"Q3 Kickoff\""));
        assert!(output.contains("client_name:Acme"));
        assert!(output.contains("status:active"));
        assert!(!output.contains("description"));
        assert!(!output.contains("null"));
    }

    #[test]
    fn test_json_output_is_valid() {
        let output = Formatter::new(OutputFormat::Json).format(&project()).unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["id"], 3);
        assert_eq!(parsed["status"], "active");
    }

    #[test]
    fn test_list_envelope() {
        let formatter = Formatter::new(OutputFormat::Json);
        let output = formatter
            .format_list(&[project(), project()], "No projects.", "projects")
            .unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["count"], 2);
        assert_eq!(parsed["projects"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_text_list_uses_message() {
        let formatter = Formatter::new(OutputFormat::Text);
        let empty: Vec<Project> = Vec::new();
        assert_eq!(
            formatter.format_list(&empty, "No projects.", "projects").unwrap(),
            "No projects."
        );
    }

    #[test]
    fn test_text_list_one_line_per_record() {
        let formatter = Formatter::new(OutputFormat::Text);
        let mut second = project();
        second.id = Some(4);
        let output = formatter.format_list(&[project(), second], "", "projects").unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("4  "));
    }

    #[test]
    fn test_nested_elements_inline() {
        #[derive(Serialize)]
        struct Row {
            id: i64,
            #[serde(rename = "type")]
            block_type: BlockType,
            elements: Vec<Element>,
        }
        let row = Row {
            id: 9,
            block_type: BlockType::Template(2),
            elements: vec![Element::new("Capacity", "100", ValueType::Number)],
        };
        let output = Formatter::new(OutputFormat::Text).format(&row).unwrap();
        assert!(output.starts_with("9  "));
        assert!(output.contains("type:2"));
        assert!(output.contains("elements:[{key:Capacity,type:number,value:100}]"));
    }
}
