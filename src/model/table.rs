//! Table and Row data structures

use indexmap::IndexMap;
use serde::Serialize;

use super::key;
use super::schema::{Column, ColumnType};
use super::value::Value;
use crate::error::{Error, Result};

/// A row in the table
#[derive(Debug, Clone, Serialize)]
pub struct Row {
    /// Cell values in column order
    pub cells: Vec<Value>,
    /// Composite key string for this row
    pub key: String,
    /// Pre-computed hash of the key cells for O(1) lookup
    #[serde(skip)]
    pub key_hash: u64,
    /// Position of the record this row came from (0-based)
    pub source_index: usize,
}

impl Row {
    /// Create a new row with computed key
    pub fn new(cells: Vec<Value>, key_column_indices: &[usize], source_index: usize) -> Self {
        let key = key::display_key(&cells, key_column_indices);
        let key_hash = key::hash_key(&cells, key_column_indices);
        Self {
            cells,
            key,
            key_hash,
            source_index,
        }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.cells.get(index)
    }

    /// Cells that make up this row's key
    pub fn key_cells<'a>(&'a self, key_column_indices: &'a [usize]) -> Vec<&'a Value> {
        key::key_cells(&self.cells, key_column_indices)
    }

    /// Recompute the key with new key column indices
    pub fn recompute_key(&mut self, key_column_indices: &[usize]) {
        self.key = key::display_key(&self.cells, key_column_indices);
        self.key_hash = key::hash_key(&self.cells, key_column_indices);
    }
}

/// A table of typed columns and rows.
///
/// Every row has exactly one value per column and column names are unique.
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub name: String,
    /// Column definitions
    pub columns: Vec<Column>,
    /// All rows in the table
    pub rows: Vec<Row>,
    /// Indices of columns used as primary key
    #[serde(skip)]
    pub key_columns: Vec<usize>,
    /// Index from key hash to row indices
    #[serde(skip)]
    pub row_index: IndexMap<u64, Vec<usize>>,
}

impl Table {
    /// Create a table with no columns
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            key_columns: Vec::new(),
            row_index: IndexMap::new(),
        }
    }

    /// Create an empty table with column definitions
    pub fn with_columns(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let mut table = Self::new(name);
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Append a column of the given type and return its index
    pub fn add_column(&mut self, name: impl Into<String>, column_type: ColumnType) -> Result<usize> {
        let index = self.columns.len();
        self.push_column(Column::new(name, index, column_type))?;
        Ok(index)
    }

    /// Append a column definition; only allowed while the table has no rows
    pub fn push_column(&mut self, mut column: Column) -> Result<()> {
        if !self.rows.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "cannot add column `{}` to a table that already has rows",
                column.name
            )));
        }
        if self.column_index(&column.name).is_some() {
            return Err(Error::DuplicateColumn(column.name));
        }
        column.index = self.columns.len();
        self.columns.push(column);
        Ok(())
    }

    /// Add a row to the table. Values are checked against the column types.
    pub fn add_row(&mut self, cells: Vec<Value>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(Error::RowArity {
                expected: self.columns.len(),
                found: cells.len(),
            });
        }
        for (column, cell) in self.columns.iter().zip(&cells) {
            if !column.accepts(cell) {
                return Err(Error::ColumnType {
                    column: column.name.clone(),
                    expected: column.column_type.to_string(),
                    found: cell.kind().to_string(),
                });
            }
        }

        let idx = self.rows.len();
        let row = Row::new(cells, &self.key_columns, idx);
        self.row_index.entry(row.key_hash).or_default().push(idx);
        self.rows.push(row);
        Ok(())
    }

    /// Set key columns by name
    pub fn set_key_columns(&mut self, key_names: &[String]) -> Result<()> {
        let indices = key_names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| Error::UnknownField(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        self.set_key_column_indices(indices);
        Ok(())
    }

    /// Set key columns by index
    pub fn set_key_column_indices(&mut self, indices: Vec<usize>) {
        self.key_columns = indices;

        for row in &mut self.rows {
            row.recompute_key(&self.key_columns);
        }

        self.rebuild_row_index();
    }

    fn rebuild_row_index(&mut self) {
        self.row_index.clear();
        for (idx, row) in self.rows.iter().enumerate() {
            self.row_index.entry(row.key_hash).or_default().push(idx);
        }
    }

    /// Rows whose key hash matches. Callers verify the key cells.
    pub fn rows_by_hash(&self, hash: u64) -> impl Iterator<Item = &Row> {
        self.row_index
            .get(&hash)
            .into_iter()
            .flatten()
            .map(|&idx| &self.rows[idx])
    }

    /// Find a row whose key cells equal the given cells
    pub fn find_by_key(&self, key_cells: &[&Value], hash: u64) -> Option<&Row> {
        self.rows_by_hash(hash)
            .find(|row| row.key_cells(&self.key_columns) == key_cells)
    }

    /// Get column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get column index by name, ignoring ASCII case
    pub fn column_index_ignore_case(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Get column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
