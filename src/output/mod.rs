//! Output formatting for tables and set-difference results

mod json;
mod terminal;

use std::path::Path;

use anyhow::Result;
use termcolor::{ColorChoice, StandardStream, WriteColor};

use crate::config::OutputFormat;
use crate::diff::TableInsertUpdate;
use crate::model::Table;

pub use json::{value_to_json, JsonOutput};
pub use terminal::TerminalOutput;

/// A repeated key and the 0-based row positions it occurs at
pub type DuplicateKey = (String, Vec<usize>);

/// Trait for output formatters
pub trait OutputFormatter {
    /// Render a table
    fn render_table(&self, table: &Table, writer: &mut dyn WriteColor) -> Result<()>;

    /// Render the insert/update split of `outer` against `inner`
    fn render_diff(
        &self,
        diff: &TableInsertUpdate<'_>,
        outer: &Table,
        inner_path: &Path,
        outer_path: &Path,
        writer: &mut dyn WriteColor,
    ) -> Result<()>;

    /// Render repeated keys of a table
    fn render_duplicates(
        &self,
        table: &Table,
        duplicates: &[DuplicateKey],
        writer: &mut dyn WriteColor,
    ) -> Result<()>;
}

/// Factory for creating output formatters
pub struct OutputFactory;

impl OutputFactory {
    /// Create an output formatter based on format type
    pub fn create(format: OutputFormat) -> Box<dyn OutputFormatter> {
        match format {
            OutputFormat::Terminal => Box::new(TerminalOutput::new()),
            OutputFormat::Json => Box::new(JsonOutput::new()),
        }
    }
}

/// Colored stdout when attached to a terminal
pub fn stdout() -> StandardStream {
    let choice = if std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}
