//! Dynamic field values and the typed-field bridge

use std::borrow::Cow;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::schema::FieldType;
use crate::error::ConversionError;

/// Ordinal and variant name of an enumerated field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EnumValue {
    pub ordinal: i64,
    pub name: Cow<'static, str>,
}

/// A field or cell value with type information
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(Cow<'static, str>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Enum(EnumValue),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                // Handle NaN comparison
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => {
                // All NaNs compare equal, so they must hash alike; same for +0/-0
                if f.is_nan() {
                    f64::NAN.to_bits().hash(state)
                } else if *f == 0.0 {
                    0u64.hash(state)
                } else {
                    f.to_bits().hash(state)
                }
            }
            Value::Text(s) => s.hash(state),
            Value::Date(d) => d.hash(state),
            Value::DateTime(dt) => dt.hash(state),
            Value::Enum(e) => e.hash(state),
        }
    }
}

impl Value {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Enum(_) => "enum",
        }
    }

    /// Field type that naturally holds this value
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(FieldType::Bool),
            Value::Int(_) => Some(FieldType::Int),
            Value::Float(_) => Some(FieldType::Float),
            Value::Text(_) => Some(FieldType::Text),
            Value::Date(_) => Some(FieldType::Date),
            Value::DateTime(_) => Some(FieldType::DateTime),
            Value::Enum(_) => Some(FieldType::Enum),
        }
    }

    /// Convert to a display string
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed("NULL"),
            Value::Bool(b) => Cow::Owned(b.to_string()),
            Value::Int(i) => Cow::Owned(i.to_string()),
            Value::Float(f) => Cow::Owned(f.to_string()),
            Value::Text(s) => Cow::Borrowed(s.as_ref()),
            Value::Date(d) => Cow::Owned(d.to_string()),
            Value::DateTime(dt) => Cow::Owned(dt.to_string()),
            Value::Enum(e) => Cow::Borrowed(e.name.as_ref()),
        }
    }

    /// Equality that also matches an int against an equal float
    pub fn loosely_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) => (*a as f64) == *b,
            (Value::Float(a), Value::Int(b)) => *a == (*b as f64),
            _ => self == other,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(Cow::Owned(s.into()))
    }

    pub fn enumerated(ordinal: i64, name: &'static str) -> Self {
        Value::Enum(EnumValue {
            ordinal,
            name: Cow::Borrowed(name),
        })
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(Cow::Owned(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(Cow::Owned(s))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// A Rust type that can back a record field.
///
/// `from_value` is strict: it expects a value already coerced to
/// `FIELD_TYPE` by a [`TypeConverter`](crate::convert::TypeConverter).
pub trait Field: Sized {
    const FIELD_TYPE: FieldType;
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

fn incompatible(value: &Value, to: FieldType) -> ConversionError {
    if value.is_null() {
        return ConversionError::NullNotAllowed { to };
    }
    ConversionError::Incompatible {
        value: value.display().into_owned(),
        from: value.kind(),
        to,
    }
}

macro_rules! int_field {
    ($($ty:ty),*) => {
        $(
            impl Field for $ty {
                const FIELD_TYPE: FieldType = FieldType::Int;

                fn to_value(&self) -> Value {
                    Value::Int(i64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, ConversionError> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(i).map_err(|_| ConversionError::OutOfRange {
                            value: i.to_string(),
                            to: FieldType::Int,
                        }),
                        other => Err(incompatible(&other, FieldType::Int)),
                    }
                }
            }
        )*
    };
}

int_field!(i8, i16, i32, i64, u8, u16, u32);

impl Field for bool {
    const FIELD_TYPE: FieldType = FieldType::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(incompatible(&other, FieldType::Bool)),
        }
    }
}

impl Field for f64 {
    const FIELD_TYPE: FieldType = FieldType::Float;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(f) => Ok(f),
            other => Err(incompatible(&other, FieldType::Float)),
        }
    }
}

impl Field for f32 {
    const FIELD_TYPE: FieldType = FieldType::Float;

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(f) if f.is_nan() || f.is_infinite() || f.abs() <= f64::from(f32::MAX) => {
                Ok(f as f32)
            }
            Value::Float(f) => Err(ConversionError::OutOfRange {
                value: f.to_string(),
                to: FieldType::Float,
            }),
            other => Err(incompatible(&other, FieldType::Float)),
        }
    }
}

impl Field for String {
    const FIELD_TYPE: FieldType = FieldType::Text;

    fn to_value(&self) -> Value {
        Value::Text(Cow::Owned(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(s) => Ok(s.into_owned()),
            other => Err(incompatible(&other, FieldType::Text)),
        }
    }
}

impl Field for NaiveDate {
    const FIELD_TYPE: FieldType = FieldType::Date;

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Date(d) => Ok(d),
            other => Err(incompatible(&other, FieldType::Date)),
        }
    }
}

impl Field for NaiveDateTime {
    const FIELD_TYPE: FieldType = FieldType::DateTime;

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            other => Err(incompatible(&other, FieldType::DateTime)),
        }
    }
}

impl<T: Field> Field for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHasher;

    fn hash_of(v: &Value) -> u64 {
        let mut hasher = FxHasher::default();
        v.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equality_is_variant_strict() {
        assert_eq!(Value::Int(1), Value::Int(1));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert!(Value::Int(1).loosely_equals(&Value::Float(1.0)));
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
    }

    #[test]
    fn test_equal_values_hash_alike() {
        assert_eq!(hash_of(&Value::Float(0.0)), hash_of(&Value::Float(-0.0)));
        assert_eq!(
            hash_of(&Value::Float(f64::NAN)),
            hash_of(&Value::Float(-f64::NAN))
        );
        assert_eq!(hash_of(&Value::from("a")), hash_of(&Value::text("a")));
    }

    #[test]
    fn test_int_field_range() {
        assert_eq!(i32::from_value(Value::Int(7)), Ok(7));
        assert!(matches!(
            u8::from_value(Value::Int(300)),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert!(matches!(
            i64::from_value(Value::Null),
            Err(ConversionError::NullNotAllowed { .. })
        ));
    }

    #[test]
    fn test_option_field() {
        assert_eq!(Option::<i32>::from_value(Value::Null), Ok(None));
        assert_eq!(Option::<i32>::from_value(Value::Int(2)), Ok(Some(2)));
        assert!(<Option<String> as Field>::NULLABLE);
        assert_eq!(Some(3i64).to_value(), Value::Int(3));
    }
}
