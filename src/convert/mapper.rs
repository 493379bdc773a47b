//! Structural mapping between differently shaped records

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::{DefaultPolicy, StandardConverter, StandardDefaults, TypeConverter};
use crate::config::Config;
use crate::error::Result;
use crate::model::{validate_fields, FieldDescriptor, Record, Value};

/// Field values of one record by name, in field order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    values: IndexMap<String, Value>,
    case_sensitive: bool,
}

impl FieldMap {
    /// Value of a field. Ignores ASCII case unless built case-sensitive.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.values.get(name) {
            return Some(value);
        }
        if self.case_sensitive {
            return None;
        }
        self.values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.values
    }
}

/// Whether `value` is what the policy would give an unset field.
/// Enum values compare by ordinal only.
fn is_default(value: &Value, default: &Value) -> bool {
    match (value, default) {
        (Value::Enum(a), Value::Enum(b)) => a.ordinal == b.ordinal,
        _ => value == default,
    }
}

/// Copies fields between records by name, coercing types on the way
pub struct Mapper {
    converter: Box<dyn TypeConverter>,
    defaults: Box<dyn DefaultPolicy>,
    case_sensitive: bool,
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Mapper {
    /// Create a mapper with the standard converter and default policy
    pub fn new(config: &Config) -> Self {
        Self {
            converter: Box::new(StandardConverter::new(config.datetime_encoding)),
            defaults: Box::new(StandardDefaults),
            case_sensitive: config.case_sensitive,
        }
    }

    /// Replace the type-conversion service
    pub fn with_converter(mut self, converter: impl TypeConverter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    /// Replace the default-value policy
    pub fn with_defaults(mut self, defaults: impl DefaultPolicy + 'static) -> Self {
        self.defaults = Box::new(defaults);
        self
    }

    /// Map one record onto a fresh `T::default()`
    pub fn map_to<S, T>(&self, source: &S) -> Result<T>
    where
        S: Record + ?Sized,
        T: Record + Default + Clone,
    {
        self.map_one(source, &T::default())
    }

    /// Map one record onto a copy of `shape`.
    ///
    /// Every mapped target field starts at its default; fields the source
    /// also has are then overwritten with the converted source value. A field
    /// whose value cannot be converted keeps its default. Fails only when
    /// either record declares the same field name twice.
    ///
    /// A field that rejects the policy's default (an enum without an
    /// ordinal-0 variant, under [`StandardDefaults`]) keeps the value it has
    /// in `shape`. [`map_to`](Self::map_to) starts from `T::default()`, so
    /// there such a field starts at the type's own default.
    pub fn map_one<S, T>(&self, source: &S, shape: &T) -> Result<T>
    where
        S: Record + ?Sized,
        T: Record + Clone,
    {
        let source_fields = source.fields();
        validate_fields(&source_fields)?;

        let mut target = shape.clone();
        let target_fields = target.fields().into_owned();
        validate_fields(&target_fields)?;

        for field in target_fields.iter().filter(|f| f.is_transferable()) {
            self.reset(&mut target, field);

            let Some(source_field) = self.find(&source_fields, &field.name) else {
                continue;
            };
            if !source_field.is_transferable() {
                continue;
            }
            let Some(value) = source.get(&source_field.name) else {
                continue;
            };

            let converted = match self.converter.coerce(&value, field.field_type) {
                Ok(v) => v,
                Err(e) => {
                    debug!(field = %field.name, error = %e, "leaving field at default");
                    continue;
                }
            };
            if let Err(e) = target.set(&field.name, converted) {
                debug!(field = %field.name, error = %e, "leaving field at default");
            }
        }

        Ok(target)
    }

    /// Map every record of a sequence, preserving length and order.
    ///
    /// An element that cannot be mapped is replaced by the default-filled
    /// shape instead of aborting the batch.
    pub fn map_all<'a, S, T, I>(&self, sources: I, shape: &T) -> Vec<T>
    where
        S: Record + ?Sized + 'a,
        T: Record + Clone,
        I: IntoIterator<Item = &'a S>,
    {
        sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| match self.map_one(source, shape) {
                Ok(target) => target,
                Err(e) => {
                    warn!(index, error = %e, "record could not be mapped, using defaults");
                    self.blank(shape)
                }
            })
            .collect()
    }

    /// [`map_all`](Self::map_all) onto `T::default()`
    pub fn map_all_to<'a, S, T, I>(&self, sources: I) -> Vec<T>
    where
        S: Record + ?Sized + 'a,
        T: Record + Default + Clone,
        I: IntoIterator<Item = &'a S>,
    {
        self.map_all(sources, &T::default())
    }

    /// Field values of `source` by name, in field order.
    ///
    /// With `except_defaults`, null fields and fields holding the default
    /// policy's value are left out. Lookups on the result ignore case when
    /// the mapper does. Fails when `source` declares a field name twice.
    pub fn to_map<S>(&self, source: &S, except_defaults: bool) -> Result<FieldMap>
    where
        S: Record + ?Sized,
    {
        let fields = source.fields();
        validate_fields(&fields)?;

        let mut values = IndexMap::with_capacity(fields.len());
        for field in fields.iter() {
            let value = source.get(&field.name).unwrap_or(Value::Null);
            if except_defaults
                && (value.is_null() || is_default(&value, &self.defaults.default_for(field)))
            {
                continue;
            }
            values.insert(field.name.to_string(), value);
        }

        Ok(FieldMap {
            values,
            case_sensitive: self.case_sensitive,
        })
    }

    fn blank<T: Record + Clone>(&self, shape: &T) -> T {
        let mut target = shape.clone();
        let fields = target.fields().into_owned();
        for field in fields.iter().filter(|f| f.is_transferable()) {
            self.reset(&mut target, field);
        }
        target
    }

    fn reset<T: Record>(&self, target: &mut T, field: &FieldDescriptor) {
        if let Err(e) = target.set(&field.name, self.defaults.default_for(field)) {
            debug!(field = %field.name, error = %e, "field has no representable default");
        }
    }

    fn find<'f>(&self, fields: &'f [FieldDescriptor], name: &str) -> Option<&'f FieldDescriptor> {
        if self.case_sensitive {
            fields.iter().find(|f| f.name == name)
        } else {
            fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::error::Error;
    use crate::model::{DynamicRecord, FieldType, Value};

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Robot {
            #[rename = "Name"]
            name: String,
            #[rename = "Legs"]
            legs: i32,
            #[rename = "Battery"]
            battery: i64,
        }
    }

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Drone {
            #[rename = "Name"]
            name: String,
            #[rename = "FlyCount"]
            fly_count: i32,
            #[rename = "Battery"]
            battery: f64,
            #[not_mapped]
            #[rename = "Legs"]
            legs: i32,
        }
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    enum Rank {
        #[default]
        Low,
        High,
    }

    crate::enum_field!(Rank { Low = 1, High = 2 });

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Badge {
            #[rename = "Name"]
            name: String,
            #[rename = "Rank"]
            rank: Rank,
        }
    }

    /// Hand-written record that can be made to declare a field twice
    #[derive(Debug, Clone, Default)]
    struct Loose {
        broken: bool,
        value: i64,
    }

    impl Record for Loose {
        fn fields(&self) -> Cow<'_, [FieldDescriptor]> {
            let mut fields = vec![FieldDescriptor::new("Battery", FieldType::Int)];
            if self.broken {
                fields.push(FieldDescriptor::new("Battery", FieldType::Int));
            }
            Cow::Owned(fields)
        }

        fn get(&self, name: &str) -> Option<Value> {
            (name == "Battery").then_some(Value::Int(self.value))
        }

        fn set(&mut self, name: &str, value: Value) -> crate::Result<()> {
            match (name, value) {
                ("Battery", Value::Int(i)) => {
                    self.value = i;
                    Ok(())
                }
                _ => Err(Error::UnknownField(name.to_string())),
            }
        }
    }

    fn robot(name: &str, legs: i32, battery: i64) -> Robot {
        Robot {
            name: name.to_string(),
            legs,
            battery,
        }
    }

    #[test]
    fn test_robot_to_drone() {
        let mapper = Mapper::default();
        let robots = vec![robot("Robot13", 2, 12)];

        let drones: Vec<Drone> = mapper.map_all_to(&robots);

        assert_eq!(
            drones,
            vec![Drone {
                name: "Robot13".to_string(),
                fly_count: 0,
                battery: 12.0,
                legs: 0,
            }]
        );
    }

    #[test]
    fn test_map_all_preserves_length_and_order() {
        let mapper = Mapper::default();
        let robots: Vec<Robot> = (0..5).map(|i| robot(&format!("r{}", i), i, 1)).collect();

        let drones: Vec<Drone> = mapper.map_all_to(&robots);

        assert_eq!(drones.len(), robots.len());
        for (r, d) in robots.iter().zip(&drones) {
            assert_eq!(r.name, d.name);
        }
    }

    #[test]
    fn test_empty_sequence() {
        let mapper = Mapper::default();
        let drones: Vec<Drone> = mapper.map_all_to(Vec::<&Robot>::new());
        assert!(drones.is_empty());
    }

    #[test]
    fn test_shape_values_are_reset() {
        let mapper = Mapper::default();
        let shape = Drone {
            fly_count: 99,
            ..Default::default()
        };

        let drone = mapper.map_one(&robot("a", 1, 1), &shape).unwrap();

        assert_eq!(drone.fly_count, 0);
    }

    #[test]
    fn test_failed_conversion_keeps_default() {
        let mapper = Mapper::default();
        let mut source = DynamicRecord::new("Row");
        source
            .push(FieldDescriptor::dynamic("Name", FieldType::Text), Value::from("x"))
            .unwrap();
        source
            .push(FieldDescriptor::dynamic("FlyCount", FieldType::Text), Value::from("many"))
            .unwrap();
        source
            .push(FieldDescriptor::dynamic("Battery", FieldType::Text), Value::from("7.5"))
            .unwrap();

        let drone: Drone = mapper.map_to(&source).unwrap();

        assert_eq!(drone.name, "x");
        assert_eq!(drone.fly_count, 0);
        assert_eq!(drone.battery, 7.5);
    }

    #[test]
    fn test_case_insensitive_names() {
        let mut source = DynamicRecord::new("Row");
        source
            .push(FieldDescriptor::dynamic("flycount", FieldType::Int), Value::Int(3))
            .unwrap();

        let strict: Drone = Mapper::default().map_to(&source).unwrap();
        let loose: Drone = Mapper::new(&Config::new().with_case_sensitive(false))
            .map_to(&source)
            .unwrap();

        assert_eq!(strict.fly_count, 0);
        assert_eq!(loose.fly_count, 3);
    }

    #[test]
    fn test_duplicate_fields_fail_fast() {
        let mapper = Mapper::default();
        let broken = Loose {
            broken: true,
            value: 5,
        };

        assert!(matches!(
            mapper.map_to::<_, Drone>(&broken),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_batch_replaces_bad_elements() {
        let mapper = Mapper::default();
        let sources = vec![
            Loose {
                broken: false,
                value: 5,
            },
            Loose {
                broken: true,
                value: 6,
            },
        ];

        let drones: Vec<Drone> = mapper.map_all_to(&sources);

        assert_eq!(drones.len(), 2);
        assert_eq!(drones[0].battery, 5.0);
        assert_eq!(drones[1], Drone::default());
    }

    #[test]
    fn test_dynamic_shape() {
        let mapper = Mapper::default();
        let shape = DynamicRecord::with_shape(
            "Drone",
            vec![
                FieldDescriptor::dynamic("Name", FieldType::Text),
                FieldDescriptor::dynamic("FlyCount", FieldType::Int),
            ],
            &StandardDefaults,
        )
        .unwrap();

        let out = mapper.map_one(&robot("Robot13", 2, 12), &shape).unwrap();

        assert_eq!(out.values(), &[Value::from("Robot13"), Value::Int(0)]);
    }

    #[test]
    fn test_enum_without_zero_ordinal() {
        let mapper = Mapper::default();
        let shape = Badge {
            name: "old".to_string(),
            rank: Rank::High,
        };

        let from_shape = mapper.map_one(&robot("a", 1, 1), &shape).unwrap();
        let from_default: Badge = mapper.map_to(&robot("a", 1, 1)).unwrap();

        assert_eq!(from_shape.name, "a");
        assert_eq!(from_shape.rank, Rank::High);
        assert_eq!(from_default.rank, Rank::Low);
    }

    #[test]
    fn test_to_map() {
        let mapper = Mapper::default();
        let source = robot("Robot13", 0, 12);

        let all = mapper.to_map(&source, false).unwrap();
        let names: Vec<_> = all.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["Name", "Legs", "Battery"]);
        assert_eq!(all.get("Legs"), Some(&Value::Int(0)));
        assert!(all.get("battery").is_none());

        let set = mapper.to_map(&source, true).unwrap();
        assert_eq!(set.len(), 2);
        assert!(!set.contains_key("Legs"));
        assert_eq!(set.get("Battery"), Some(&Value::Int(12)));
    }

    #[test]
    fn test_to_map_ignoring_case() {
        let mapper = Mapper::new(&Config::new().with_case_sensitive(false));
        let badge = Badge {
            name: String::new(),
            rank: Rank::Low,
        };

        let map = mapper.to_map(&badge, true).unwrap();

        assert!(!map.contains_key("name"));
        assert_eq!(map.get("RANK"), Some(&Value::enumerated(1, "Low")));
        assert!(matches!(
            mapper.to_map(
                &Loose {
                    broken: true,
                    value: 1
                },
                false
            ),
            Err(Error::InvalidArgument(_))
        ));
    }
}
