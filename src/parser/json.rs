//! JSON array parser

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value as Json;

use crate::convert::{parse_date, parse_datetime};
use crate::model::Value;

use super::{Parser, RawRow};

/// Parser for JSON arrays of objects (a lone object is one record)
pub struct JsonParser;

impl Parser for JsonParser {
    fn parse_rows(&self, path: &Path) -> Result<Vec<RawRow>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open JSON file: {}", path.display()))?;
        let value: Json =
            serde_json::from_reader(BufReader::new(file)).context("Failed to parse JSON file")?;
        rows_from_json(value)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "json")
    }
}

fn rows_from_json(value: Json) -> Result<Vec<RawRow>> {
    let array = match value {
        Json::Array(arr) => arr,
        Json::Object(_) => vec![value],
        _ => bail!("JSON must be an array or object"),
    };

    array
        .into_iter()
        .enumerate()
        .map(|(idx, item)| -> Result<RawRow> {
            match item {
                Json::Object(obj) => Ok(obj
                    .into_iter()
                    .map(|(k, v)| (k, json_to_value(v)))
                    .collect()),
                _ => bail!("JSON element {} is not an object", idx),
            }
        })
        .collect()
}

fn json_to_value(value: Json) -> Value {
    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::text(n.to_string())
            }
        }
        Json::String(s) => {
            if let Some(date) = parse_date(&s) {
                return Value::Date(date);
            }
            if let Some(dt) = parse_datetime(&s) {
                return Value::DateTime(dt);
            }
            Value::text(s)
        }
        // Nested structures are kept as their JSON text
        nested @ (Json::Array(_) | Json::Object(_)) => Value::text(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_rows_from_array() {
        let rows = rows_from_json(json!([
            {"id": 1, "born": "1990-05-01", "tags": ["a"]},
            {"id": 2.5, "extra": null}
        ]))
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], Value::Int(1));
        assert!(matches!(rows[0]["born"], Value::Date(_)));
        assert_eq!(rows[0]["tags"], Value::from("[\"a\"]"));
        assert_eq!(rows[1]["id"], Value::Float(2.5));
        assert_eq!(rows[1]["extra"], Value::Null);
    }

    #[test]
    fn test_single_object_and_bad_input() {
        assert_eq!(rows_from_json(json!({"a": true})).unwrap().len(), 1);
        assert!(rows_from_json(json!(3)).is_err());
        assert!(rows_from_json(json!([1, 2])).is_err());
    }
}
