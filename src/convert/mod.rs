//! Type conversion and default values, plus the mapper and projector
//! built on top of them.

pub mod mapper;
pub mod projector;

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::config::DateTimeEncoding;
use crate::error::ConversionError;
use crate::model::{EnumValue, FieldDescriptor, FieldType, Value};

pub use mapper::{FieldMap, Mapper};
pub use projector::{ColumnRule, ColumnRules, ColumnTransform, Projector};

/// Coerces a value to a field type
pub trait TypeConverter: Send + Sync {
    /// Convert `value` so it can be stored in a field of type `target`.
    /// `Value::Null` is passed through; the receiving field decides whether
    /// it accepts null.
    fn coerce(&self, value: &Value, target: FieldType) -> Result<Value, ConversionError>;
}

/// Supplies the value an unset field starts with
pub trait DefaultPolicy: Send + Sync {
    fn default_for(&self, field: &FieldDescriptor) -> Value;
}

/// Null for nullable fields, the zero value of the type otherwise
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDefaults;

impl StandardDefaults {
    /// Zero value of a field type
    pub fn zero(field_type: FieldType) -> Value {
        match field_type {
            FieldType::Bool => Value::Bool(false),
            FieldType::Int => Value::Int(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::Text => Value::Text(Cow::Borrowed("")),
            FieldType::Date => Value::Date(NaiveDate::default()),
            FieldType::DateTime => Value::DateTime(NaiveDateTime::default()),
            FieldType::Enum => Value::Enum(EnumValue {
                ordinal: 0,
                name: Cow::Borrowed(""),
            }),
            FieldType::Reference => Value::Null,
        }
    }
}

impl DefaultPolicy for StandardDefaults {
    fn default_for(&self, field: &FieldDescriptor) -> Value {
        if field.nullable {
            Value::Null
        } else {
            Self::zero(field.field_type)
        }
    }
}

/// Widening, parsing and epoch conversions between the scalar types
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardConverter {
    encoding: DateTimeEncoding,
}

impl StandardConverter {
    pub fn new(encoding: DateTimeEncoding) -> Self {
        Self { encoding }
    }

    /// Encode a date/time as an epoch integer
    pub fn encode_datetime(&self, dt: &NaiveDateTime) -> i64 {
        let utc = dt.and_utc();
        match self.encoding {
            DateTimeEncoding::EpochSeconds => utc.timestamp(),
            DateTimeEncoding::EpochMillis => utc.timestamp_millis(),
        }
    }

    /// Decode an epoch integer into a date/time
    pub fn decode_datetime(&self, n: i64) -> Option<NaiveDateTime> {
        let utc = match self.encoding {
            DateTimeEncoding::EpochSeconds => DateTime::from_timestamp(n, 0),
            DateTimeEncoding::EpochMillis => DateTime::from_timestamp_millis(n),
        };
        utc.map(|d| d.naive_utc())
    }
}

fn incompatible(value: &Value, to: FieldType) -> ConversionError {
    ConversionError::Incompatible {
        value: value.display().into_owned(),
        from: value.kind(),
        to,
    }
}

fn out_of_range(value: &Value, to: FieldType) -> ConversionError {
    ConversionError::OutOfRange {
        value: value.display().into_owned(),
        to,
    }
}

impl TypeConverter for StandardConverter {
    fn coerce(&self, value: &Value, target: FieldType) -> Result<Value, ConversionError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        if value.field_type() == Some(target) {
            return Ok(value.clone());
        }

        match (value, target) {
            (_, FieldType::Reference) => Err(ConversionError::Reference),
            (Value::Int(i), FieldType::Float) => Ok(Value::Float(*i as f64)),
            (Value::Float(f), FieldType::Int) => {
                // 2^63 is exactly representable; anything at or above it overflows
                if f.is_finite() && f.fract() == 0.0 && *f >= -(2f64.powi(63)) && *f < 2f64.powi(63)
                {
                    Ok(Value::Int(*f as i64))
                } else {
                    Err(out_of_range(value, target))
                }
            }
            (Value::Bool(b), FieldType::Int) => Ok(Value::Int(i64::from(*b))),
            (Value::Int(i), FieldType::Bool) => match i {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                _ => Err(out_of_range(value, target)),
            },
            (Value::Enum(e), FieldType::Int) => Ok(Value::Int(e.ordinal)),
            // The enum field resolves ordinals and names itself
            (Value::Int(_) | Value::Text(_), FieldType::Enum) => Ok(value.clone()),
            (Value::DateTime(dt), FieldType::Int) => Ok(Value::Int(self.encode_datetime(dt))),
            (Value::Int(i), FieldType::DateTime) => self
                .decode_datetime(*i)
                .map(Value::DateTime)
                .ok_or_else(|| out_of_range(value, target)),
            (Value::Date(d), FieldType::DateTime) => {
                Ok(Value::DateTime(d.and_time(NaiveTime::MIN)))
            }
            (Value::DateTime(dt), FieldType::Date) => Ok(Value::Date(dt.date())),
            (Value::Text(s), _) => parse_text(s, target).ok_or_else(|| incompatible(value, target)),
            (_, FieldType::Text) => Ok(Value::Text(Cow::Owned(value.display().into_owned()))),
            _ => Err(incompatible(value, target)),
        }
    }
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse text into a value of the target type
pub fn parse_text(s: &str, target: FieldType) -> Option<Value> {
    let trimmed = s.trim();
    match target {
        FieldType::Bool => {
            if trimmed.eq_ignore_ascii_case("true")
                || trimmed.eq_ignore_ascii_case("yes")
                || trimmed == "1"
            {
                Some(Value::Bool(true))
            } else if trimmed.eq_ignore_ascii_case("false")
                || trimmed.eq_ignore_ascii_case("no")
                || trimmed == "0"
            {
                Some(Value::Bool(false))
            } else {
                None
            }
        }
        FieldType::Int => trimmed.parse::<i64>().ok().map(Value::Int),
        FieldType::Float => trimmed.parse::<f64>().ok().map(Value::Float),
        FieldType::Text => Some(Value::Text(Cow::Owned(s.to_string()))),
        FieldType::Date => parse_date(trimmed).map(Value::Date),
        FieldType::DateTime => parse_datetime(trimmed)
            .or_else(|| parse_date(trimmed).map(|d| d.and_time(NaiveTime::MIN)))
            .map(Value::DateTime),
        FieldType::Enum | FieldType::Reference => None,
    }
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

pub(crate) fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}
