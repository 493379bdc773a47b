//! The `Record` trait and its two implementations: statically registered
//! structs (via [`record!`](crate::record)) and [`DynamicRecord`].

use std::borrow::Cow;

use super::schema::{FieldDescriptor, FieldType};
use super::value::{Field, Value};
use crate::convert::DefaultPolicy;
use crate::error::{ConversionError, Error, Result};

/// A structured value with named, typed fields.
///
/// Implementations describe their fields up front instead of being
/// inspected at runtime. Field names must be unique.
pub trait Record {
    /// Ordered field descriptors
    fn fields(&self) -> Cow<'_, [FieldDescriptor]>;

    /// Read a field by name
    fn get(&self, name: &str) -> Option<Value>;

    /// Write a field by name. The value must already have the field's type.
    fn set(&mut self, name: &str, value: Value) -> Result<()>;

    /// Name used for tables built from this record
    fn record_name(&self) -> Cow<'_, str> {
        let full = std::any::type_name::<Self>();
        Cow::Borrowed(full.rsplit("::").next().unwrap_or(full))
    }

    /// Look up one field descriptor
    fn field(&self, name: &str) -> Option<FieldDescriptor> {
        self.fields().iter().find(|f| f.name == name).cloned()
    }
}

/// Collections of records are references, not values
impl<R: Record> Field for Vec<R> {
    const FIELD_TYPE: FieldType = FieldType::Reference;

    fn to_value(&self) -> Value {
        Value::Null
    }

    fn from_value(_value: Value) -> std::result::Result<Self, ConversionError> {
        Err(ConversionError::Reference)
    }
}

/// Check that field names are unique
pub fn validate_fields(fields: &[FieldDescriptor]) -> Result<()> {
    for (i, field) in fields.iter().enumerate() {
        if fields[..i].iter().any(|f| f.name == field.name) {
            return Err(Error::InvalidArgument(format!(
                "field `{}` is declared more than once",
                field.name
            )));
        }
    }
    Ok(())
}

/// Declare a struct and register it as a [`Record`].
///
/// Field attributes: `#[rename = "Name"]` sets the record field name
/// (defaults to the Rust identifier) and `#[not_mapped]` excludes the field
/// from mapping and projection. Field types must implement [`Field`].
///
/// ```
/// recordkit::record! {
///     #[derive(Debug, Clone, Default)]
///     pub struct Robot {
///         #[rename = "Name"]
///         pub name: String,
///         #[rename = "Legs"]
///         pub legs: i32,
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (@name $field:ident) => { stringify!($field) };
    (@name $field:ident rename = $value:literal $($rest:tt)*) => { $value };
    (@name $field:ident not_mapped $($rest:tt)*) => { $crate::record!(@name $field $($rest)*) };

    (@mapped) => { true };
    (@mapped not_mapped $($rest:tt)*) => { false };
    (@mapped rename = $value:literal $($rest:tt)*) => { $crate::record!(@mapped $($rest)*) };

    (
        $(#[$meta:meta])*
        $vis:vis struct $ty:ident {
            $(
                $(#[$attr:ident $(= $attr_value:literal)?])*
                $field_vis:vis $field:ident : $field_ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $ty {
            $( $field_vis $field: $field_ty ),*
        }

        impl $crate::model::Record for $ty {
            fn fields(&self) -> ::std::borrow::Cow<'_, [$crate::model::FieldDescriptor]> {
                const FIELDS: &[$crate::model::FieldDescriptor] = &[
                    $(
                        $crate::model::FieldDescriptor::declared(
                            $crate::record!(@name $field $($attr $(= $attr_value)?)*),
                            <$field_ty as $crate::model::Field>::FIELD_TYPE,
                            <$field_ty as $crate::model::Field>::NULLABLE,
                            $crate::record!(@mapped $($attr $(= $attr_value)?)*),
                        )
                    ),*
                ];
                ::std::borrow::Cow::Borrowed(FIELDS)
            }

            fn get(&self, name: &str) -> Option<$crate::model::Value> {
                $(
                    if name == $crate::record!(@name $field $($attr $(= $attr_value)?)*) {
                        return Some($crate::model::Field::to_value(&self.$field));
                    }
                )*
                None
            }

            fn set(&mut self, name: &str, value: $crate::model::Value) -> $crate::Result<()> {
                $(
                    if name == $crate::record!(@name $field $($attr $(= $attr_value)?)*) {
                        self.$field = <$field_ty as $crate::model::Field>::from_value(value)
                            .map_err(|e| $crate::Error::conversion(name, e))?;
                        return Ok(());
                    }
                )*
                Err($crate::Error::UnknownField(name.to_string()))
            }

            fn record_name(&self) -> ::std::borrow::Cow<'_, str> {
                ::std::borrow::Cow::Borrowed(stringify!($ty))
            }
        }
    };
}

/// Register a fieldless enum as an enumerated [`Field`].
///
/// Values are read back from an enum value, its ordinal, or its variant
/// name (ASCII case-insensitive).
///
/// ```
/// #[derive(Debug, Clone, Copy, Default, PartialEq)]
/// pub enum Gender { #[default] Unknown, Male, Female }
///
/// recordkit::enum_field!(Gender { Unknown = 0, Male = 1, Female = 2 });
/// ```
#[macro_export]
macro_rules! enum_field {
    ($ty:ident { $($variant:ident = $ordinal:literal),+ $(,)? }) => {
        impl $crate::model::Field for $ty {
            const FIELD_TYPE: $crate::model::FieldType = $crate::model::FieldType::Enum;

            fn to_value(&self) -> $crate::model::Value {
                match self {
                    $( $ty::$variant => $crate::model::Value::enumerated($ordinal, stringify!($variant)), )+
                }
            }

            fn from_value(
                value: $crate::model::Value,
            ) -> ::std::result::Result<Self, $crate::ConversionError> {
                let ordinal = match &value {
                    $crate::model::Value::Enum(e) => e.ordinal,
                    $crate::model::Value::Int(i) => *i,
                    $crate::model::Value::Text(s) => {
                        $(
                            if s.eq_ignore_ascii_case(stringify!($variant)) {
                                return Ok($ty::$variant);
                            }
                        )+
                        return Err($crate::ConversionError::UnknownVariant(s.to_string()));
                    }
                    other => {
                        return Err($crate::ConversionError::Incompatible {
                            value: other.display().into_owned(),
                            from: other.kind(),
                            to: $crate::model::FieldType::Enum,
                        });
                    }
                };
                match ordinal {
                    $( $ordinal => Ok($ty::$variant), )+
                    other => Err($crate::ConversionError::UnknownVariant(other.to_string())),
                }
            }
        }
    };
}

/// A record whose fields are only known at runtime, such as a row read
/// from a JSON or CSV file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicRecord {
    name: String,
    fields: Vec<FieldDescriptor>,
    values: Vec<Value>,
}

impl DynamicRecord {
    /// Create an empty record
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Create a record with the given fields, each set to its default
    pub fn with_shape(
        name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
        defaults: &dyn DefaultPolicy,
    ) -> Result<Self> {
        validate_fields(&fields)?;
        let values = fields.iter().map(|f| defaults.default_for(f)).collect();
        Ok(Self {
            name: name.into(),
            fields,
            values,
        })
    }

    /// Append a field. Fails if the name is taken or the value does not fit.
    pub fn push(&mut self, field: FieldDescriptor, value: Value) -> Result<()> {
        if self.position(&field.name).is_some() {
            return Err(Error::InvalidArgument(format!(
                "field `{}` is declared more than once",
                field.name
            )));
        }
        check_fits(&field, &value)?;
        self.fields.push(field);
        self.values.push(value);
        Ok(())
    }

    /// Values in field order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

fn check_fits(field: &FieldDescriptor, value: &Value) -> Result<()> {
    let fits = match value.field_type() {
        None => field.nullable,
        Some(t) => t == field.field_type,
    };
    if fits {
        return Ok(());
    }
    let source = if value.is_null() {
        ConversionError::NullNotAllowed {
            to: field.field_type,
        }
    } else {
        ConversionError::Incompatible {
            value: value.display().into_owned(),
            from: value.kind(),
            to: field.field_type,
        }
    };
    Err(Error::conversion(field.name.clone(), source))
}

impl Record for DynamicRecord {
    fn fields(&self) -> Cow<'_, [FieldDescriptor]> {
        Cow::Borrowed(&self.fields)
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.position(name).map(|i| self.values[i].clone())
    }

    fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let idx = self
            .position(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))?;
        check_fits(&self.fields[idx], &value)?;
        self.values[idx] = value;
        Ok(())
    }

    fn record_name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::StandardDefaults;

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    enum Mood {
        #[default]
        Calm,
        Angry,
    }

    crate::enum_field!(Mood { Calm = 0, Angry = 5 });

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Pet {
            #[rename = "Name"]
            name: String,
            age: Option<i32>,
            mood: Mood,
            #[not_mapped]
            #[rename = "Cache"]
            cache: String,
        }
    }

    #[test]
    fn test_registered_fields() {
        let pet = Pet::default();
        let fields = pet.fields();
        let names: Vec<_> = fields.iter().map(|f| f.name.as_ref()).collect();
        assert_eq!(names, vec!["Name", "age", "mood", "Cache"]);
        assert_eq!(fields[1].field_type, FieldType::Int);
        assert!(fields[1].nullable);
        assert_eq!(fields[2].field_type, FieldType::Enum);
        assert!(!fields[3].mapped);
        assert_eq!(pet.record_name(), "Pet");
    }

    #[test]
    fn test_get_and_set() {
        let mut pet = Pet::default();
        pet.set("Name", Value::from("Rex")).unwrap();
        pet.set("age", Value::Int(4)).unwrap();
        pet.set("mood", Value::Int(5)).unwrap();

        assert_eq!(pet.name, "Rex");
        assert_eq!(pet.age, Some(4));
        assert_eq!(pet.mood, Mood::Angry);
        assert_eq!(pet.get("mood"), Some(Value::enumerated(5, "Angry")));
        assert!(matches!(
            pet.set("legs", Value::Int(4)),
            Err(Error::UnknownField(_))
        ));
        assert!(matches!(
            pet.set("Name", Value::Int(4)),
            Err(Error::Conversion { .. })
        ));
    }

    #[test]
    fn test_enum_from_name() {
        assert_eq!(Mood::from_value(Value::from("angry")), Ok(Mood::Angry));
        assert!(Mood::from_value(Value::Int(2)).is_err());
    }

    #[test]
    fn test_dynamic_record() {
        let mut rec = DynamicRecord::new("Row");
        rec.push(FieldDescriptor::dynamic("id", FieldType::Int), Value::Int(1))
            .unwrap();
        assert!(rec
            .push(FieldDescriptor::dynamic("id", FieldType::Text), Value::from("x"))
            .is_err());
        assert!(rec.set("id", Value::from("x")).is_err());
        rec.set("id", Value::Int(9)).unwrap();
        assert_eq!(rec.get("id"), Some(Value::Int(9)));
        assert_eq!(rec.record_name(), "Row");
    }

    #[test]
    fn test_with_shape_fills_defaults() {
        let shape = DynamicRecord::with_shape(
            "Drone",
            vec![
                FieldDescriptor::dynamic("Name", FieldType::Text),
                FieldDescriptor::dynamic("Note", FieldType::Text).nullable(true),
            ],
            &StandardDefaults,
        )
        .unwrap();
        assert_eq!(shape.values(), &[Value::from(""), Value::Null]);
    }

    #[test]
    fn test_validate_fields() {
        let fields = vec![
            FieldDescriptor::new("a", FieldType::Int),
            FieldDescriptor::new("a", FieldType::Text),
        ];
        assert!(matches!(
            validate_fields(&fields),
            Err(Error::InvalidArgument(_))
        ));
    }
}
