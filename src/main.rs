//! recordkit - inspect, reshape and diff record files

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use recordkit::config::{Config, OutputFormat};
use recordkit::convert::StandardDefaults;
use recordkit::diff::{duplicates_with_indices, RowMatcher};
use recordkit::model::key::detect_key_columns;
use recordkit::model::{DynamicRecord, FieldDescriptor, FieldType, Table};
use recordkit::output::{self, DuplicateKey, OutputFactory};
use recordkit::parser::ParserFactory;
use recordkit::{Mapper, Projector};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Terminal,
    Json,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Terminal => OutputFormat::Terminal,
            CliOutputFormat::Json => OutputFormat::Json,
        }
    }
}

/// Map, project and diff record files (CSV, JSON)
#[derive(Parser, Debug)]
#[command(name = "recordkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct FormatArg {
    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: CliOutputFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a file and print it as a typed table
    Table {
        file: PathBuf,

        /// Table name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        format: FormatArg,
    },

    /// Map every record of a file onto a new shape
    Map {
        file: PathBuf,

        /// Target fields as `Name:type[?]`, comma-separated (`?` marks nullable)
        #[arg(long, value_delimiter = ',', required = true)]
        shape: Vec<String>,

        /// Match field names ignoring ASCII case
        #[arg(long)]
        ignore_case: bool,

        #[command(flatten)]
        format: FormatArg,
    },

    /// Split the rows of OUTER into inserts and updates against INNER.
    /// Exits with 1 when there is anything to insert.
    Diff {
        inner: PathBuf,
        outer: PathBuf,

        /// Key column(s) (comma-separated); defaults to the first unique column
        #[arg(short, long, value_delimiter = ',')]
        key: Vec<String>,

        /// Report each key at most once
        #[arg(long)]
        distinct: bool,

        #[command(flatten)]
        format: FormatArg,
    },

    /// List keys that occur more than once
    Dupes {
        file: PathBuf,

        /// Key column(s) (comma-separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        key: Vec<String>,

        #[command(flatten)]
        format: FormatArg,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(has_inserts) => {
            if has_inserts {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run a subcommand; `Ok(true)` means a diff found rows to insert
fn run(command: Command) -> Result<bool> {
    match command {
        Command::Table { file, name, format } => {
            let config = Config::new()
                .with_table_name(name.unwrap_or_default())
                .with_output_format(format.format.into());
            let table = load_table(&file, &config)?;
            let formatter = OutputFactory::create(config.output_format);
            formatter.render_table(&table, &mut output::stdout())?;
            Ok(false)
        }
        Command::Map {
            file,
            shape,
            ignore_case,
            format,
        } => {
            let config = Config::new()
                .with_table_name("")
                .with_case_sensitive(!ignore_case)
                .with_output_format(format.format.into());
            let records = ParserFactory::new()
                .parse(&file, &config)
                .with_context(|| format!("Failed to parse file: {}", file.display()))?;
            let shape = DynamicRecord::with_shape("Mapped", parse_shape(&shape)?, &StandardDefaults)?;

            let mapped = Mapper::new(&config).map_all(&records, &shape);
            let table = Projector::new(&config).project(&mapped)?;

            let formatter = OutputFactory::create(config.output_format);
            formatter.render_table(&table, &mut output::stdout())?;
            Ok(false)
        }
        Command::Diff {
            inner,
            outer,
            key,
            distinct,
            format,
        } => {
            let config = Config::new()
                .with_table_name("")
                .with_key_columns(key)
                .with_distinct(distinct)
                .with_output_format(format.format.into());

            let mut inner_table = load_table(&inner, &config)?;
            let mut outer_table = load_table(&outer, &config)?;

            // An inner file without rows has no columns to key on; every
            // outer row is then an insert
            let key_source = if inner_table.is_empty() {
                &outer_table
            } else {
                &inner_table
            };
            let keys = if config.key_columns.is_empty() {
                detect_key_columns(key_source)
                    .into_iter()
                    .map(|idx| key_source.columns[idx].name.clone())
                    .collect()
            } else {
                config.key_columns.clone()
            };
            tracing::debug!(?keys, "key columns");
            if !inner_table.is_empty() {
                inner_table
                    .set_key_columns(&keys)
                    .with_context(|| format!("Invalid key for {}", inner.display()))?;
            }
            outer_table
                .set_key_columns(&keys)
                .with_context(|| format!("Invalid key for {}", outer.display()))?;

            let diff = RowMatcher::new(config.distinct).insert_update(&inner_table, &outer_table)?;

            let formatter = OutputFactory::create(config.output_format);
            formatter.render_diff(&diff, &outer_table, &inner, &outer, &mut output::stdout())?;
            Ok(diff.has_inserts())
        }
        Command::Dupes { file, key, format } => {
            let config = Config::new()
                .with_table_name("")
                .with_key_columns(key)
                .with_output_format(format.format.into());
            let mut table = load_table(&file, &config)?;
            table.set_key_columns(&config.key_columns)?;

            let keys = table.rows.iter().map(|r| r.key_cells(&table.key_columns));
            let dupes: Vec<DuplicateKey> = duplicates_with_indices(keys)
                .into_iter()
                .map(|(_, positions)| (table.rows[positions[0]].key.clone(), positions))
                .collect();

            let formatter = OutputFactory::create(config.output_format);
            formatter.render_duplicates(&table, &dupes, &mut output::stdout())?;
            Ok(false)
        }
    }
}

fn load_table(path: &Path, config: &Config) -> Result<Table> {
    let records = ParserFactory::new()
        .parse(path, config)
        .with_context(|| format!("Failed to parse file: {}", path.display()))?;
    let mut table = Projector::new(config).project(&records)?;
    if table.name.is_empty() {
        table.name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("table")
            .to_string();
    }
    Ok(table)
}

/// Parse `Name:type[?]` field specs
fn parse_shape(specs: &[String]) -> Result<Vec<FieldDescriptor>> {
    specs
        .iter()
        .map(|spec| -> Result<FieldDescriptor> {
            let Some((name, ty)) = spec.split_once(':') else {
                bail!("Invalid field spec `{}`: expected Name:type", spec);
            };
            let (ty, nullable) = match ty.strip_suffix('?') {
                Some(ty) => (ty, true),
                None => (ty, false),
            };
            let Some(field_type) = FieldType::parse(ty) else {
                bail!("Unknown field type `{}` in `{}`", ty, spec);
            };
            Ok(FieldDescriptor::dynamic(name.trim().to_string(), field_type).nullable(nullable))
        })
        .collect()
}
