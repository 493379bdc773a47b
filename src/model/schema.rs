//! Field and column metadata

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use super::value::Value;

/// Declared type of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    Text,
    Date,
    DateTime,
    Enum,
    /// Holds other records; never copied or projected
    Reference,
}

impl FieldType {
    /// Widen the type to accommodate another type
    pub fn widen(self, other: FieldType) -> FieldType {
        if self == other {
            return self;
        }

        match (self, other) {
            (FieldType::Int, FieldType::Float) | (FieldType::Float, FieldType::Int) => {
                FieldType::Float
            }
            (FieldType::Date, FieldType::DateTime) | (FieldType::DateTime, FieldType::Date) => {
                FieldType::DateTime
            }
            _ => FieldType::Text,
        }
    }

    /// Parse a type name as written in shape strings (`Name:text`)
    pub fn parse(s: &str) -> Option<FieldType> {
        match s.trim().to_lowercase().as_str() {
            "bool" | "boolean" => Some(FieldType::Bool),
            "int" | "integer" | "long" => Some(FieldType::Int),
            "float" | "double" | "decimal" => Some(FieldType::Float),
            "text" | "string" | "str" => Some(FieldType::Text),
            "date" => Some(FieldType::Date),
            "datetime" | "timestamp" => Some(FieldType::DateTime),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Bool => write!(f, "bool"),
            FieldType::Int => write!(f, "int"),
            FieldType::Float => write!(f, "float"),
            FieldType::Text => write!(f, "text"),
            FieldType::Date => write!(f, "date"),
            FieldType::DateTime => write!(f, "datetime"),
            FieldType::Enum => write!(f, "enum"),
            FieldType::Reference => write!(f, "reference"),
        }
    }
}

/// Name and type of one record field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: Cow<'static, str>,
    pub field_type: FieldType,
    /// Whether the field can hold `Value::Null`
    pub nullable: bool,
    /// `false` excludes the field from mapping and projection
    pub mapped: bool,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, field_type: FieldType) -> Self {
        Self::declared(name, field_type, false, true)
    }

    /// Fully specified descriptor, usable in constant field tables
    pub const fn declared(
        name: &'static str,
        field_type: FieldType,
        nullable: bool,
        mapped: bool,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            field_type,
            nullable,
            mapped,
        }
    }

    /// Descriptor with a name only known at runtime
    pub fn dynamic(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            field_type,
            nullable: false,
            mapped: true,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn mapped(mut self, mapped: bool) -> Self {
        self.mapped = mapped;
        self
    }

    /// Whether mapping and projection should look at this field
    pub fn is_transferable(&self) -> bool {
        self.mapped && self.field_type != FieldType::Reference
    }
}

/// Storage type of a table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Bool,
    Int,
    Float,
    Text,
    Date,
    DateTime,
}

impl ColumnType {
    /// Check whether a non-null value fits this column
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ColumnType::Bool, Value::Bool(_))
                | (ColumnType::Int, Value::Int(_))
                | (ColumnType::Float, Value::Float(_))
                | (ColumnType::Text, Value::Text(_))
                | (ColumnType::Date, Value::Date(_))
                | (ColumnType::DateTime, Value::DateTime(_))
        )
    }

    pub fn field_type(self) -> FieldType {
        match self {
            ColumnType::Bool => FieldType::Bool,
            ColumnType::Int => FieldType::Int,
            ColumnType::Float => FieldType::Float,
            ColumnType::Text => FieldType::Text,
            ColumnType::Date => FieldType::Date,
            ColumnType::DateTime => FieldType::DateTime,
        }
    }

    /// Column type that stores a field type unchanged, if any
    pub fn for_field(field_type: FieldType) -> Option<ColumnType> {
        match field_type {
            FieldType::Bool => Some(ColumnType::Bool),
            FieldType::Int => Some(ColumnType::Int),
            FieldType::Float => Some(ColumnType::Float),
            FieldType::Text => Some(ColumnType::Text),
            FieldType::Date => Some(ColumnType::Date),
            FieldType::DateTime => Some(ColumnType::DateTime),
            FieldType::Enum | FieldType::Reference => None,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field_type())
    }
}

/// Column metadata
#[derive(Debug, Clone, Serialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Column index (0-based position)
    pub index: usize,
    pub column_type: ColumnType,
    pub nullable: bool,
    /// Value stored when a record has no value for this column
    pub null_marker: Value,
}

impl Column {
    /// Create a nullable column whose null marker is `Value::Null`
    pub fn new(name: impl Into<String>, index: usize, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            index,
            column_type,
            nullable: true,
            null_marker: Value::Null,
        }
    }

    /// Replace the null marker; a non-null marker makes the column non-nullable
    pub fn with_null_marker(mut self, marker: Value) -> Self {
        self.nullable = marker.is_null();
        self.null_marker = marker;
        self
    }

    /// Check whether a value may be stored in this column
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            self.nullable
        } else {
            self.column_type.accepts(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widen() {
        assert_eq!(FieldType::Int.widen(FieldType::Float), FieldType::Float);
        assert_eq!(FieldType::Date.widen(FieldType::DateTime), FieldType::DateTime);
        assert_eq!(FieldType::Bool.widen(FieldType::Int), FieldType::Text);
        assert_eq!(FieldType::Text.widen(FieldType::Text), FieldType::Text);
    }

    #[test]
    fn test_parse_type_names() {
        assert_eq!(FieldType::parse("Text"), Some(FieldType::Text));
        assert_eq!(FieldType::parse(" int "), Some(FieldType::Int));
        assert_eq!(FieldType::parse("blob"), None);
    }

    #[test]
    fn test_column_accepts() {
        let col = Column::new("age", 0, ColumnType::Int);
        assert!(col.accepts(&Value::Int(3)));
        assert!(col.accepts(&Value::Null));
        assert!(!col.accepts(&Value::Float(3.0)));

        let strict = col.with_null_marker(Value::Int(0));
        assert!(!strict.accepts(&Value::Null));
    }
}
