//! Configuration handling for recordkit

/// Output format for rendered results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" => Ok(OutputFormat::Terminal),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// How a date/time is stored in an integer column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateTimeEncoding {
    /// Seconds since the Unix epoch
    #[default]
    EpochSeconds,
    /// Milliseconds since the Unix epoch
    EpochMillis,
}

/// What a projected table stores for a null field value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NullPolicy {
    /// Store `Value::Null`
    #[default]
    Null,
    /// Store the default value of the column type
    TypeDefault,
}

/// Configuration for mapping, projection and set operations
#[derive(Debug, Clone)]
pub struct Config {
    /// Name given to projected tables. Empty means "use the record name".
    pub table_name: String,
    /// Null handling for projected tables
    pub null_policy: NullPolicy,
    /// Integer encoding of date/time columns
    pub datetime_encoding: DateTimeEncoding,
    /// Match field and column names case-sensitively
    pub case_sensitive: bool,
    /// Drop repeated values/keys from set difference results
    pub distinct: bool,
    /// Columns used as the key for table-level set operations
    pub key_columns: Vec<String>,
    /// Output format
    pub output_format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            table_name: "DataTable".to_string(),
            null_policy: NullPolicy::default(),
            datetime_encoding: DateTimeEncoding::default(),
            case_sensitive: true,
            distinct: false,
            key_columns: Vec::new(),
            output_format: OutputFormat::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the projected table name
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// Set null handling for projected tables
    pub fn with_null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = policy;
        self
    }

    /// Set date/time column encoding
    pub fn with_datetime_encoding(mut self, encoding: DateTimeEncoding) -> Self {
        self.datetime_encoding = encoding;
        self
    }

    /// Enable or disable case-sensitive name matching
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Request distinct set difference output
    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Set key columns for table-level set operations
    pub fn with_key_columns(mut self, keys: Vec<String>) -> Self {
        self.key_columns = keys;
        self
    }

    /// Set output format
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("html".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let config = Config::new().with_distinct(true).with_table_name("");
        assert!(config.distinct);
        assert!(config.case_sensitive);
        assert!(config.table_name.is_empty());
        assert_eq!(config.datetime_encoding, DateTimeEncoding::EpochSeconds);
    }
}
