//! Data model: values, field/column metadata, records and tables

pub mod key;
mod record;
mod schema;
mod table;
mod value;

pub use record::{validate_fields, DynamicRecord, Record};
pub use schema::{Column, ColumnType, FieldDescriptor, FieldType};
pub use table::{Row, Table};
pub use value::{EnumValue, Field, Value};
