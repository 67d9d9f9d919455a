use std::collections::BTreeSet;
use std::io::{self, Write};

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::{Map, Value};
use tabled::builder::Builder;
use tabled::settings::Style;

/// Keys tried, in order, when printing one identifier per record.
const IDENTIFIER_KEYS: [&str; 4] = ["accountId", "name", "key", "id"];

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
    Csv,
    /// One identifier per line
    Quiet,
}

pub struct OutputRenderer {
    format: OutputFormat,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn render<T: Serialize>(&self, value: &T) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write(&mut out, value)
    }

    pub fn write<W: Write, T: Serialize>(&self, out: &mut W, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;

        match self.format {
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?,
            OutputFormat::Yaml => write!(out, "{}", serde_yaml::to_string(&value)?)?,
            OutputFormat::Table => match tabulate(&value) {
                Some((headers, rows)) => {
                    let mut builder = Builder::default();
                    builder.push_record(headers);
                    for row in rows {
                        builder.push_record(row);
                    }
                    writeln!(out, "{}", builder.build().with(Style::rounded()))?;
                }
                None => writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?,
            },
            OutputFormat::Csv => match tabulate(&value) {
                Some((headers, rows)) => {
                    writeln!(out, "{}", csv_line(&headers))?;
                    for row in rows {
                        writeln!(out, "{}", csv_line(&row))?;
                    }
                }
                None => writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?,
            },
            OutputFormat::Quiet => {
                for id in identifiers(&value) {
                    writeln!(out, "{id}")?;
                }
            }
        }

        Ok(())
    }
}

/// Headers and rows for an array of objects, or a field/value listing for one object.
fn tabulate(value: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    match value {
        Value::Array(rows) if !rows.is_empty() => {
            let objects: Vec<&Map<String, Value>> =
                rows.iter().filter_map(Value::as_object).collect();
            if objects.len() != rows.len() {
                return None;
            }

            let headers: Vec<String> = objects
                .iter()
                .flat_map(|obj| obj.keys().cloned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            if headers.is_empty() {
                return None;
            }

            let data = objects
                .iter()
                .map(|obj| {
                    headers
                        .iter()
                        .map(|h| obj.get(h).map(cell).unwrap_or_default())
                        .collect()
                })
                .collect();
            Some((headers, data))
        }
        Value::Object(obj) if !obj.is_empty() => {
            let headers = vec!["field".to_string(), "value".to_string()];
            let data = obj.iter().map(|(k, v)| vec![k.clone(), cell(v)]).collect();
            Some((headers, data))
        }
        _ => None,
    }
}

fn identifiers(value: &Value) -> Vec<String> {
    let record_id = |obj: &Map<String, Value>| {
        IDENTIFIER_KEYS
            .iter()
            .find_map(|key| obj.get(*key).filter(|v| !v.is_null()).map(cell))
    };

    match value {
        Value::Array(rows) => rows
            .iter()
            .filter_map(|row| match row {
                Value::Object(obj) => record_id(obj),
                Value::Null => None,
                other => Some(cell(other)),
            })
            .collect(),
        Value::Object(obj) => record_id(obj).into_iter().collect(),
        Value::Null => Vec::new(),
        other => vec![cell(other)],
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) if items.iter().all(Value::is_string) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn csv_line(fields: &[String]) -> String {
    fields
        .iter()
        .map(|field| {
            if field.contains(&[',', '"', '\n'][..]) {
                format!("\"{}\"", field.replace('"', "\"\""))
            } else {
                field.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rendered<T: Serialize>(format: OutputFormat, value: &T) -> String {
        let mut out = Vec::new();
        OutputRenderer::new(format).write(&mut out, value).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Table);
    }

    #[test]
    fn test_tabulate_mixed_keys() {
        let value = json!([
            {"accountId": "1", "displayName": "Alice"},
            {"accountId": "2", "emailAddress": "bob@example.com"}
        ]);

        let (headers, rows) = tabulate(&value).unwrap();
        assert_eq!(headers, vec!["accountId", "displayName", "emailAddress"]);
        assert_eq!(rows[0], vec!["1", "Alice", ""]);
        assert_eq!(rows[1], vec!["2", "", "bob@example.com"]);
    }

    #[test]
    fn test_tabulate_single_object_as_fields() {
        let (headers, rows) = tabulate(&json!({"name": "jdoe", "active": true})).unwrap();
        assert_eq!(headers, vec!["field", "value"]);
        assert!(rows.contains(&vec!["active".to_string(), "true".to_string()]));
    }

    #[test]
    fn test_tabulate_rejects_non_tabular() {
        assert!(tabulate(&json!([])).is_none());
        assert!(tabulate(&json!(["one", "two"])).is_none());
        assert!(tabulate(&json!("plain")).is_none());
    }

    #[test]
    fn test_cell_joins_string_lists() {
        assert_eq!(cell(&json!(["jira-core", "jira-software"])), "jira-core, jira-software");
        assert_eq!(cell(&json!(null)), "");
        assert_eq!(cell(&json!(42)), "42");
    }

    #[test]
    fn test_quiet_prefers_account_id() {
        let value = json!([
            {"accountId": "abc", "name": "jdoe"},
            {"name": "legacy"},
            {"displayName": "no id"}
        ]);
        assert_eq!(rendered(OutputFormat::Quiet, &value), "abc\nlegacy\n");
    }

    #[test]
    fn test_csv_quotes_fields() {
        let value = json!([{"displayName": "Doe, Jane", "note": "say \"hi\""}]);
        assert_eq!(
            rendered(OutputFormat::Csv, &value),
            "displayName,note\n\"Doe, Jane\",\"say \"\"hi\"\"\"\n"
        );
    }

    #[test]
    fn test_json_and_yaml() {
        let value = json!({"name": "jdoe"});
        assert!(rendered(OutputFormat::Json, &value).contains("\"name\": \"jdoe\""));
        assert_eq!(rendered(OutputFormat::Yaml, &value), "name: jdoe\n");
    }

    #[test]
    fn test_table_contains_values() {
        let value = json!([{"name": "alice"}, {"name": "bob"}]);
        let table = rendered(OutputFormat::Table, &value);
        assert!(table.contains("alice"));
        assert!(table.contains("bob"));
    }
}
