//! Parser layer for loading records from data files

mod csv;
mod json;

use std::path::Path;

use anyhow::{bail, Context, Result};
use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::config::Config;
use crate::convert::{StandardConverter, TypeConverter};
use crate::model::{DynamicRecord, FieldDescriptor, FieldType, Value};

pub use self::csv::CsvParser;
pub use self::json::JsonParser;

/// Field values of one parsed row, keyed by field name
pub type RawRow = IndexMap<String, Value>;

/// Trait for parsing record files
pub trait Parser: Send + Sync {
    /// Parse a file into rows of raw values
    fn parse_rows(&self, path: &Path) -> Result<Vec<RawRow>>;

    /// Check if this parser can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool;

    /// Parse a file into records of one inferred shape
    fn parse(&self, path: &Path, config: &Config) -> Result<Vec<DynamicRecord>> {
        let rows = self.parse_rows(path)?;
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Record");
        build_records(name, rows, config)
    }
}

/// Factory for creating parsers based on file extension
pub struct ParserFactory {
    parsers: Vec<Box<dyn Parser>>,
}

impl Default for ParserFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserFactory {
    /// Create a new parser factory with all supported parsers
    pub fn new() -> Self {
        Self {
            parsers: vec![Box::new(CsvParser), Box::new(JsonParser)],
        }
    }

    /// Get a parser for the given file path
    pub fn get_parser(&self, path: &Path) -> Result<&dyn Parser> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .or_else(|| detect_format(path).map(str::to_string))
            .unwrap_or_default();

        for parser in &self.parsers {
            if parser.supports_extension(&ext) {
                return Ok(parser.as_ref());
            }
        }

        bail!(
            "Unsupported file format: {}",
            path.extension()
                .and_then(|e| e.to_str())
                .unwrap_or("unknown")
        )
    }

    /// Parse a file using the appropriate parser
    pub fn parse(&self, path: &Path, config: &Config) -> Result<Vec<DynamicRecord>> {
        let parser = self.get_parser(path)?;
        parser.parse(path, config)
    }
}

/// Detect file format from content (for files without extension)
pub fn detect_format(path: &Path) -> Option<&'static str> {
    let content = std::fs::read_to_string(path).ok()?;
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        Some("json")
    } else {
        Some("csv")
    }
}

/// Turn raw rows into records sharing one shape.
///
/// Fields are the union of all row keys in first-seen order. Each field's
/// type is the widest type among its non-null values; a field that is ever
/// null or missing is nullable.
pub fn build_records(name: &str, rows: Vec<RawRow>, config: &Config) -> Result<Vec<DynamicRecord>> {
    let mut names: IndexSet<String> = IndexSet::new();
    for row in &rows {
        for key in row.keys() {
            names.insert(key.clone());
        }
    }

    let fields: Vec<FieldDescriptor> = names
        .iter()
        .map(|field| {
            let mut widest: Option<FieldType> = None;
            let mut nullable = false;
            for row in &rows {
                match row.get(field).and_then(Value::field_type) {
                    Some(t) => widest = Some(widest.map_or(t, |w| w.widen(t))),
                    None => nullable = true,
                }
            }
            let field_type = widest.unwrap_or(FieldType::Text);
            trace!(field = %field, %field_type, nullable, "inferred field");
            FieldDescriptor::dynamic(field.clone(), field_type).nullable(nullable || widest.is_none())
        })
        .collect();

    let converter = StandardConverter::new(config.datetime_encoding);
    let mut records = Vec::with_capacity(rows.len());
    for (idx, mut row) in rows.into_iter().enumerate() {
        let mut record = DynamicRecord::new(name);
        for field in &fields {
            let raw = row.swap_remove(&*field.name).unwrap_or(Value::Null);
            let value = converter
                .coerce(&raw, field.field_type)
                .map_err(|e| crate::Error::conversion(field.name.to_string(), e))
                .with_context(|| format!("row {}", idx + 1))?;
            record
                .push(field.clone(), value)
                .with_context(|| format!("row {}", idx + 1))?;
        }
        records.push(record);
    }

    Ok(records)
}
