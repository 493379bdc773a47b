//! Error types shared by the library

use thiserror::Error;

use crate::model::FieldType;

/// A single value could not be coerced to a field type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("cannot convert {from} value `{value}` to {to}")]
    Incompatible {
        value: String,
        from: &'static str,
        to: FieldType,
    },
    #[error("value `{value}` is out of range for {to}")]
    OutOfRange { value: String, to: FieldType },
    #[error("null is not allowed for a non-nullable {to} field")]
    NullNotAllowed { to: FieldType },
    #[error("unknown variant `{0}`")]
    UnknownVariant(String),
    #[error("reference fields hold records, not values")]
    Reference,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("field `{field}`: {source}")]
    Conversion {
        field: String,
        #[source]
        source: ConversionError,
    },
    #[error("incompatible keys: {left} vs {right}")]
    ShapeMismatch { left: String, right: String },
    #[error("comparer has no key extractor, hash codes are unavailable")]
    HashUnavailable,
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("duplicate column `{0}`")]
    DuplicateColumn(String),
    #[error("row has {found} values but the table has {expected} columns")]
    RowArity { expected: usize, found: usize },
    #[error("column `{column}` expects {expected}, got {found}")]
    ColumnType {
        column: String,
        expected: String,
        found: String,
    },
}

impl Error {
    pub fn conversion(field: impl Into<String>, source: ConversionError) -> Self {
        Error::Conversion {
            field: field.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
