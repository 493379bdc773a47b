//! Row key handling utilities

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashSet, FxHasher};

use super::table::Table;
use super::value::Value;

/// Separator between key components in displayed keys
pub const KEY_SEPARATOR: &str = "|";

/// Cells that make up a row's key. With no key columns every cell is part
/// of the key.
pub fn key_cells<'a>(cells: &'a [Value], key_column_indices: &'a [usize]) -> Vec<&'a Value> {
    if key_column_indices.is_empty() {
        cells.iter().collect()
    } else {
        key_column_indices
            .iter()
            .filter_map(|&i| cells.get(i))
            .collect()
    }
}

/// Human-readable composite key
pub fn display_key(cells: &[Value], key_column_indices: &[usize]) -> String {
    key_cells(cells, key_column_indices)
        .iter()
        .map(|c| c.display().into_owned())
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Hash the key cells using FxHasher for performance
pub fn hash_key(cells: &[Value], key_column_indices: &[usize]) -> u64 {
    let mut hasher = FxHasher::default();
    for cell in key_cells(cells, key_column_indices) {
        cell.hash(&mut hasher);
    }
    hasher.finish()
}

/// Auto-detect a key column: the first column whose values are all unique
pub fn detect_key_columns(table: &Table) -> Vec<usize> {
    for col_idx in 0..table.column_count() {
        let mut seen: FxHashSet<&Value> = FxHashSet::default();
        let mut all_unique = true;

        for row in &table.rows {
            if let Some(cell) = row.cells.get(col_idx) {
                if cell.is_null() || !seen.insert(cell) {
                    all_unique = false;
                    break;
                }
            }
        }

        if all_unique && !table.rows.is_empty() {
            return vec![col_idx];
        }
    }

    // If no single unique column found, return empty (will use all columns)
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ColumnType};

    #[test]
    fn test_display_key() {
        let cells = vec![Value::Int(1), Value::from("a"), Value::Null];
        assert_eq!(display_key(&cells, &[0, 1]), "1|a");
        assert_eq!(display_key(&cells, &[]), "1|a|NULL");
    }

    #[test]
    fn test_hash_key_depends_on_selected_cells() {
        let a = vec![Value::Int(1), Value::from("x")];
        let b = vec![Value::Int(1), Value::from("y")];
        assert_eq!(hash_key(&a, &[0]), hash_key(&b, &[0]));
        assert_ne!(hash_key(&a, &[]), hash_key(&b, &[]));
    }

    #[test]
    fn test_detect_key_columns() {
        let mut table = Table::with_columns(
            "t",
            vec![
                Column::new("kind", 0, ColumnType::Text),
                Column::new("id", 1, ColumnType::Int),
            ],
        )
        .unwrap();
        table.add_row(vec![Value::from("a"), Value::Int(1)]).unwrap();
        table.add_row(vec![Value::from("a"), Value::Int(2)]).unwrap();

        assert_eq!(detect_key_columns(&table), vec![1]);
    }
}
