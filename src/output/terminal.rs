//! Colored terminal output

use std::path::Path;

use anyhow::Result;
use tabled::builder::Builder;
use tabled::settings::Style;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::diff::TableInsertUpdate;
use crate::model::{Row, Table};

use super::{DuplicateKey, OutputFormatter};

/// Terminal output with boxed tables and colored headings
#[derive(Debug, Default)]
pub struct TerminalOutput;

impl TerminalOutput {
    pub fn new() -> Self {
        Self
    }

    fn write_heading(
        &self,
        writer: &mut dyn WriteColor,
        text: &str,
        color: Option<Color>,
    ) -> Result<()> {
        writer.set_color(ColorSpec::new().set_fg(color).set_bold(true))?;
        write!(writer, "{}", text)?;
        writer.reset()?;
        writeln!(writer)?;
        Ok(())
    }

    fn write_rows(&self, rows: &[&Row], table: &Table, writer: &mut dyn WriteColor) -> Result<()> {
        let mut builder = Builder::default();
        builder.push_record(table.columns.iter().map(|c| format!("{} ({})", c.name, c.column_type)));
        for row in rows {
            builder.push_record(row.cells.iter().map(|c| c.display().into_owned()));
        }
        let mut rendered = builder.build();
        rendered.with(Style::modern());
        writeln!(writer, "{}", rendered)?;
        Ok(())
    }
}

impl OutputFormatter for TerminalOutput {
    fn render_table(&self, table: &Table, writer: &mut dyn WriteColor) -> Result<()> {
        self.write_heading(
            writer,
            &format!("{} ({} rows)", table.name, table.row_count()),
            Some(Color::Cyan),
        )?;
        if table.columns.is_empty() {
            writeln!(writer, "(no columns)")?;
            return Ok(());
        }
        let rows: Vec<&Row> = table.rows.iter().collect();
        self.write_rows(&rows, table, writer)
    }

    fn render_diff(
        &self,
        diff: &TableInsertUpdate<'_>,
        outer: &Table,
        inner_path: &Path,
        outer_path: &Path,
        writer: &mut dyn WriteColor,
    ) -> Result<()> {
        writeln!(
            writer,
            "recordkit: {} → {}",
            inner_path.display(),
            outer_path.display()
        )?;
        writeln!(
            writer,
            "Summary: {} to insert, {} to update (out of {} rows)",
            diff.inserts.len(),
            diff.updates.len(),
            outer.row_count()
        )?;
        writeln!(writer)?;

        if !diff.inserts.is_empty() {
            self.write_heading(writer, "Inserts:", Some(Color::Green))?;
            self.write_rows(&diff.inserts, outer, writer)?;
            writeln!(writer)?;
        }

        let changed: Vec<_> = diff
            .updates
            .iter()
            .filter(|u| !u.changed_columns.is_empty())
            .collect();
        if !diff.updates.is_empty() {
            self.write_heading(writer, "Updates:", Some(Color::Yellow))?;
            writeln!(
                writer,
                "  {} matched, {} with changed values",
                diff.updates.len(),
                changed.len()
            )?;
            for update in changed {
                writeln!(writer, "  {}: {}", update.key, update.changed_columns.join(", "))?;
            }
        }

        Ok(())
    }

    fn render_duplicates(
        &self,
        table: &Table,
        duplicates: &[DuplicateKey],
        writer: &mut dyn WriteColor,
    ) -> Result<()> {
        if duplicates.is_empty() {
            writeln!(writer, "No duplicate keys in {}.", table.name)?;
            return Ok(());
        }

        self.write_heading(writer, "Duplicate keys:", Some(Color::Red))?;
        let mut builder = Builder::default();
        builder.push_record(["key", "count", "rows"]);
        for (key, positions) in duplicates {
            let rows: Vec<String> = positions.iter().map(|p| (p + 1).to_string()).collect();
            builder.push_record([key.clone(), positions.len().to_string(), rows.join(", ")]);
        }
        let mut rendered = builder.build();
        rendered.with(Style::modern());
        writeln!(writer, "{}", rendered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use termcolor::NoColor;

    use super::*;
    use crate::diff::RowMatcher;
    use crate::model::{ColumnType, Value};

    fn table(name: &str, rows: &[(i64, &str)]) -> Table {
        let mut table = Table::new(name);
        table.add_column("id", ColumnType::Int).unwrap();
        table.add_column("name", ColumnType::Text).unwrap();
        for (id, n) in rows {
            table.add_row(vec![Value::Int(*id), Value::from(*n)]).unwrap();
        }
        table.set_key_columns(&["id".to_string()]).unwrap();
        table
    }

    fn render(f: impl FnOnce(&mut dyn WriteColor) -> Result<()>) -> String {
        let mut out = NoColor::new(Vec::new());
        f(&mut out).unwrap();
        String::from_utf8(out.into_inner()).unwrap()
    }

    #[test]
    fn test_render_table() {
        let t = table("people", &[(1, "ana"), (2, "bo")]);
        let text = render(|w| TerminalOutput.render_table(&t, w));

        assert!(text.starts_with("people (2 rows)"));
        assert!(text.contains("id (int)"));
        assert!(text.contains("ana"));
    }

    #[test]
    fn test_render_diff() {
        let inner = table("old", &[(1, "ana")]);
        let outer = table("new", &[(1, "ANA"), (2, "bo")]);
        let diff = RowMatcher::default().insert_update(&inner, &outer).unwrap();

        let text = render(|w| {
            TerminalOutput.render_diff(&diff, &outer, Path::new("old.csv"), Path::new("new.csv"), w)
        });

        assert!(text.contains("1 to insert, 1 to update"));
        assert!(text.contains("Inserts:"));
        assert!(text.contains("  1: name"));
    }

    #[test]
    fn test_render_duplicates() {
        let t = table("t", &[(1, "a")]);
        let text = render(|w| TerminalOutput.render_duplicates(&t, &[("7".into(), vec![0, 3])], w));
        assert!(text.contains("1, 4"));

        let none = render(|w| TerminalOutput.render_duplicates(&t, &[], w));
        assert!(none.contains("No duplicate keys"));
    }
}
