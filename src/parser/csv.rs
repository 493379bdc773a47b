//! CSV file parser

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};

use crate::convert::{parse_date, parse_datetime, parse_text};
use crate::model::{FieldType, Value};

use super::{Parser, RawRow};

/// Parser for CSV files with a header row
pub struct CsvParser;

impl Parser for CsvParser {
    fn parse_rows(&self, path: &Path) -> Result<Vec<RawRow>> {
        let file =
            File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
            _ => b',',
        };
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let headers = csv_reader
            .headers()
            .context("Failed to read CSV headers")?
            .clone();

        let mut rows = Vec::new();
        for (line_num, result) in csv_reader.records().enumerate() {
            // +2 for 1-indexing and header
            let record = result.with_context(|| format!("Failed to read CSV row {}", line_num + 2))?;

            // Short rows are padded with nulls
            let row: RawRow = headers
                .iter()
                .enumerate()
                .map(|(i, name)| (name.to_string(), record.get(i).map_or(Value::Null, parse_cell_value)))
                .collect();
            rows.push(row);
        }

        Ok(rows)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "csv" | "tsv" | "txt")
    }
}

/// Parse a string value into a Value with type inference
fn parse_cell_value(s: &str) -> Value {
    let trimmed = s.trim();

    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") || trimmed == "NA" {
        return Value::Null;
    }

    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(trimmed.eq_ignore_ascii_case("true"));
    }

    if let Some(v) = parse_text(trimmed, FieldType::Int) {
        return v;
    }
    if let Some(v) = parse_text(trimmed, FieldType::Float) {
        return v;
    }
    if let Some(date) = parse_date(trimmed) {
        return Value::Date(date);
    }
    if let Some(dt) = parse_datetime(trimmed) {
        return Value::DateTime(dt);
    }

    Value::text(trimmed)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::config::Config;
    use crate::model::Record;

    #[test]
    fn test_parse_cell_value() {
        assert_eq!(parse_cell_value(""), Value::Null);
        assert_eq!(parse_cell_value("null"), Value::Null);
        assert_eq!(parse_cell_value("true"), Value::Bool(true));
        assert_eq!(parse_cell_value("False"), Value::Bool(false));
        assert_eq!(parse_cell_value("42"), Value::Int(42));
        assert_eq!(parse_cell_value("3.14"), Value::Float(3.14));
        assert_eq!(parse_cell_value(" hello "), Value::from("hello"));
        assert!(matches!(parse_cell_value("2024-01-31"), Value::Date(_)));
        assert!(matches!(parse_cell_value("2024-01-31 10:00:00"), Value::DateTime(_)));
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,name,score").unwrap();
        writeln!(file, "1,ana,3").unwrap();
        writeln!(file, "2,bo").unwrap();

        let records = CsvParser.parse(file.path(), &Config::default()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("name"), Some(Value::from("ana")));
        assert_eq!(records[1].get("score"), Some(Value::Null));
        assert!(records[1].fields()[2].nullable);
    }
}
