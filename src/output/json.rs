//! JSON output format

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use termcolor::WriteColor;

use crate::diff::TableInsertUpdate;
use crate::model::{ColumnType, Row, Table, Value};

use super::{DuplicateKey, OutputFormatter};

/// JSON output formatter
pub struct JsonOutput {
    pretty: bool,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }

    fn write(&self, value: &impl Serialize, writer: &mut dyn WriteColor) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, value)?;
        } else {
            serde_json::to_writer(&mut *writer, value)?;
        }
        writeln!(writer)?;
        Ok(())
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct JsonColumn<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    column_type: ColumnType,
    nullable: bool,
}

#[derive(Serialize)]
struct JsonTable<'a> {
    name: &'a str,
    columns: Vec<JsonColumn<'a>>,
    rows: Vec<Map<String, Json>>,
}

#[derive(Serialize)]
struct JsonUpdate<'a> {
    key: &'a str,
    changed_columns: &'a [String],
    row: Map<String, Json>,
}

#[derive(Serialize)]
struct JsonStats {
    inserts: usize,
    updates: usize,
    outer_row_count: usize,
}

#[derive(Serialize)]
struct JsonDiffOutput<'a> {
    inner_file: String,
    outer_file: String,
    inserts: Vec<Map<String, Json>>,
    updates: Vec<JsonUpdate<'a>>,
    stats: JsonStats,
}

#[derive(Serialize)]
struct JsonDuplicate<'a> {
    key: &'a str,
    /// 1-based row numbers
    rows: Vec<usize>,
}

/// Convert a value to JSON. Enums are written by name.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::Text(s) => Json::String(s.to_string()),
        Value::Enum(e) => Json::String(e.name.to_string()),
        Value::Date(d) => Json::String(d.to_string()),
        Value::DateTime(dt) => Json::String(dt.to_string()),
    }
}

fn row_to_json(row: &Row, table: &Table) -> Map<String, Json> {
    table
        .columns
        .iter()
        .zip(&row.cells)
        .map(|(col, cell)| (col.name.clone(), value_to_json(cell)))
        .collect()
}

impl OutputFormatter for JsonOutput {
    fn render_table(&self, table: &Table, writer: &mut dyn WriteColor) -> Result<()> {
        let output = JsonTable {
            name: &table.name,
            columns: table
                .columns
                .iter()
                .map(|c| JsonColumn {
                    name: &c.name,
                    column_type: c.column_type,
                    nullable: c.nullable,
                })
                .collect(),
            rows: table.rows.iter().map(|r| row_to_json(r, table)).collect(),
        };
        self.write(&output, writer)
    }

    fn render_diff(
        &self,
        diff: &TableInsertUpdate<'_>,
        outer: &Table,
        inner_path: &Path,
        outer_path: &Path,
        writer: &mut dyn WriteColor,
    ) -> Result<()> {
        let output = JsonDiffOutput {
            inner_file: inner_path.display().to_string(),
            outer_file: outer_path.display().to_string(),
            inserts: diff.inserts.iter().map(|r| row_to_json(r, outer)).collect(),
            updates: diff
                .updates
                .iter()
                .map(|u| JsonUpdate {
                    key: u.key,
                    changed_columns: &u.changed_columns,
                    row: row_to_json(u.outer, outer),
                })
                .collect(),
            stats: JsonStats {
                inserts: diff.inserts.len(),
                updates: diff.updates.len(),
                outer_row_count: outer.row_count(),
            },
        };
        self.write(&output, writer)
    }

    fn render_duplicates(
        &self,
        _table: &Table,
        duplicates: &[DuplicateKey],
        writer: &mut dyn WriteColor,
    ) -> Result<()> {
        let output: Vec<JsonDuplicate> = duplicates
            .iter()
            .map(|(key, positions)| JsonDuplicate {
                key: key.as_str(),
                rows: positions.iter().map(|p| p + 1).collect(),
            })
            .collect();
        self.write(&output, writer)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use termcolor::NoColor;

    use super::*;
    use crate::diff::RowMatcher;

    fn table(rows: &[(i64, Option<f64>)]) -> Table {
        let mut table = Table::new("scores");
        table.add_column("id", ColumnType::Int).unwrap();
        table.add_column("score", ColumnType::Float).unwrap();
        for (id, score) in rows {
            table.add_row(vec![Value::Int(*id), Value::from(*score)]).unwrap();
        }
        table.set_key_columns(&["id".to_string()]).unwrap();
        table
    }

    fn parse(f: impl FnOnce(&mut dyn WriteColor) -> Result<()>) -> Json {
        let mut out = NoColor::new(Vec::new());
        f(&mut out).unwrap();
        serde_json::from_slice(&out.into_inner()).unwrap()
    }

    #[test]
    fn test_value_to_json() {
        assert_eq!(value_to_json(&Value::Int(3)), json!(3));
        assert_eq!(value_to_json(&Value::Float(f64::NAN)), Json::Null);
        assert_eq!(value_to_json(&Value::enumerated(1, "Male")), json!("Male"));
    }

    #[test]
    fn test_render_table() {
        let t = table(&[(1, Some(2.5)), (2, None)]);
        let out = parse(|w| JsonOutput::compact().render_table(&t, w));

        assert_eq!(out["name"], "scores");
        assert_eq!(out["columns"][1]["type"], "Float");
        assert_eq!(out["rows"][1], json!({"id": 2, "score": null}));
    }

    #[test]
    fn test_render_diff() {
        let inner = table(&[(1, Some(1.0))]);
        let outer = table(&[(1, Some(1.5)), (3, None)]);
        let diff = RowMatcher::default().insert_update(&inner, &outer).unwrap();

        let out = parse(|w| {
            JsonOutput::new().render_diff(&diff, &outer, Path::new("a.json"), Path::new("b.json"), w)
        });

        assert_eq!(out["stats"], json!({"inserts": 1, "updates": 1, "outer_row_count": 2}));
        assert_eq!(out["inserts"][0]["id"], 3);
        assert_eq!(out["updates"][0]["changed_columns"], json!(["score"]));
    }
}
