//! Row matching between tables

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, trace};

use crate::convert::{StandardConverter, TypeConverter};
use crate::error::{Error, Result};
use crate::model::{ColumnType, FieldType, Row, Table, Value};

/// An outer row whose key also occurs in the inner table
#[derive(Debug, Clone, Serialize)]
pub struct RowUpdate<'a> {
    pub key: &'a str,
    pub inner: &'a Row,
    pub outer: &'a Row,
    /// Shared columns whose values differ between the two rows
    pub changed_columns: Vec<String>,
}

/// Outer rows split by key membership in the inner table
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableInsertUpdate<'a> {
    pub inserts: Vec<&'a Row>,
    pub updates: Vec<RowUpdate<'a>>,
}

impl TableInsertUpdate<'_> {
    pub fn has_inserts(&self) -> bool {
        !self.inserts.is_empty()
    }
}

/// Row matcher using hash-based lookup on the tables' key columns
#[derive(Debug, Clone, Copy, Default)]
pub struct RowMatcher {
    distinct: bool,
}

impl RowMatcher {
    pub fn new(distinct: bool) -> Self {
        Self { distinct }
    }

    /// Rows of `outer` whose key is absent from `inner`
    pub fn difference<'a>(&self, inner: &'a Table, outer: &'a Table) -> Result<Vec<&'a Row>> {
        Ok(self.insert_update(inner, outer)?.inserts)
    }

    /// Partition the rows of `outer` by key membership in `inner`.
    ///
    /// Keys are compared cell by cell, so both tables must key on the same
    /// number of columns. A table without key columns keys on every column.
    /// An inner table without rows matches nothing, whatever its columns.
    /// Key columns typed differently in the two tables are compared after
    /// widening both sides to a common type.
    pub fn insert_update<'a>(
        &self,
        inner: &'a Table,
        outer: &'a Table,
    ) -> Result<TableInsertUpdate<'a>> {
        let index = if inner.is_empty() {
            InnerIndex::Empty
        } else {
            let inner_types = key_types(inner);
            let outer_types = key_types(outer);
            if inner_types.len() != outer_types.len() {
                return Err(Error::ShapeMismatch {
                    left: format!("{} key column(s)", inner_types.len()),
                    right: format!("{} key column(s)", outer_types.len()),
                });
            }
            if inner_types == outer_types {
                InnerIndex::Native
            } else {
                let targets: Vec<FieldType> = inner_types
                    .iter()
                    .zip(&outer_types)
                    .map(|(a, b)| a.field_type().widen(b.field_type()))
                    .collect();
                debug!(?inner_types, ?outer_types, ?targets, "widening key columns");
                let mut rows: FxHashMap<Vec<Value>, &'a Row> = FxHashMap::default();
                for row in &inner.rows {
                    rows.entry(widened_key(row, inner, &targets)).or_insert(row);
                }
                InnerIndex::Widened { targets, rows }
            }
        };

        let mut result = TableInsertUpdate::default();
        let mut emitted: FxHashMap<u64, Vec<&'a Row>> = FxHashMap::default();

        for outer_row in &outer.rows {
            let key_cells = outer_row.key_cells(&outer.key_columns);

            if self.distinct {
                let bucket = emitted.entry(outer_row.key_hash).or_default();
                if bucket
                    .iter()
                    .any(|seen| seen.key_cells(&outer.key_columns) == key_cells)
                {
                    continue;
                }
                bucket.push(outer_row);
            }

            let matched = match &index {
                InnerIndex::Empty => None,
                InnerIndex::Native => inner.find_by_key(&key_cells, outer_row.key_hash),
                InnerIndex::Widened { targets, rows } => rows
                    .get(&widened_key(outer_row, outer, targets))
                    .copied(),
            };

            match matched {
                Some(inner_row) => {
                    let changed_columns = changed_columns(inner, inner_row, outer, outer_row);
                    trace!(key = %outer_row.key, changed = changed_columns.len(), "matched row");
                    result.updates.push(RowUpdate {
                        key: &outer_row.key,
                        inner: inner_row,
                        outer: outer_row,
                        changed_columns,
                    });
                }
                None => result.inserts.push(outer_row),
            }
        }

        Ok(result)
    }
}

/// How outer keys are looked up among inner rows
enum InnerIndex<'a> {
    /// No inner rows
    Empty,
    /// Key columns agree on type; the table's own hash index is used
    Native,
    /// Key cells widened to `targets`, first inner row per key
    Widened {
        targets: Vec<FieldType>,
        rows: FxHashMap<Vec<Value>, &'a Row>,
    },
}

/// Types of the columns that make up a table's key
fn key_types(table: &Table) -> Vec<ColumnType> {
    if table.key_columns.is_empty() {
        table.columns.iter().map(|c| c.column_type).collect()
    } else {
        table
            .key_columns
            .iter()
            .filter_map(|&i| table.columns.get(i))
            .map(|c| c.column_type)
            .collect()
    }
}

/// Key cells converted to `targets`. A cell that does not convert is kept
/// as is and so matches no widened cell of another kind.
fn widened_key(row: &Row, table: &Table, targets: &[FieldType]) -> Vec<Value> {
    let converter = StandardConverter::default();
    row.key_cells(&table.key_columns)
        .into_iter()
        .zip(targets)
        .map(|(cell, &target)| {
            converter
                .coerce(cell, target)
                .unwrap_or_else(|_| cell.clone())
        })
        .collect()
}

/// Names of columns present in both tables whose cells differ
fn changed_columns(inner: &Table, inner_row: &Row, outer: &Table, outer_row: &Row) -> Vec<String> {
    let mut changes = Vec::new();

    for (outer_idx, column) in outer.columns.iter().enumerate() {
        let Some(inner_idx) = inner.column_index(&column.name) else {
            continue;
        };
        let old = inner_row.get(inner_idx).unwrap_or(&Value::Null);
        let new = outer_row.get(outer_idx).unwrap_or(&Value::Null);
        if !old.loosely_equals(new) {
            changes.push(column.name.clone());
        }
    }

    changes
}
