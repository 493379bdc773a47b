//! Projection of record collections into tables, and back

use tracing::{debug, trace};

use super::{StandardConverter, StandardDefaults, TypeConverter};
use crate::config::{Config, NullPolicy};
use crate::error::{ConversionError, Error, Result};
use crate::model::{Column, ColumnType, FieldType, Record, Table, Value};

/// How a field of some type becomes a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnTransform {
    /// Store the value as is
    Identity,
    /// Store a date/time as an epoch integer
    Epoch,
    /// Store an enum as its ordinal
    Ordinal,
    /// Store a date or date/time as ISO-8601 text
    IsoText,
    /// Leave the field out of the table
    Skip,
}

impl ColumnTransform {
    /// Column type produced for a field type, `None` if no column is made
    pub fn column_type(self, field_type: FieldType) -> Option<ColumnType> {
        match self {
            ColumnTransform::Identity => ColumnType::for_field(field_type),
            ColumnTransform::Epoch | ColumnTransform::Ordinal => Some(ColumnType::Int),
            ColumnTransform::IsoText => Some(ColumnType::Text),
            ColumnTransform::Skip => None,
        }
    }

    /// Transform a non-null field value into a cell of `column_type`
    pub fn apply(
        self,
        value: &Value,
        column_type: ColumnType,
        converter: &StandardConverter,
    ) -> std::result::Result<Value, ConversionError> {
        match (self, value) {
            (ColumnTransform::Epoch, Value::DateTime(dt)) => {
                Ok(Value::Int(converter.encode_datetime(dt)))
            }
            (ColumnTransform::Epoch, Value::Date(d)) => Ok(Value::Int(
                converter.encode_datetime(&d.and_time(chrono::NaiveTime::MIN)),
            )),
            (ColumnTransform::IsoText, Value::DateTime(dt)) => {
                Ok(Value::text(dt.format("%Y-%m-%dT%H:%M:%S").to_string()))
            }
            (ColumnTransform::IsoText, Value::Date(d)) => {
                Ok(Value::text(d.format("%Y-%m-%d").to_string()))
            }
            _ => converter.coerce(value, column_type.field_type()),
        }
    }
}

/// One entry of the rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRule {
    pub field_type: FieldType,
    pub transform: ColumnTransform,
}

/// Field type → column transform table.
///
/// Types without a rule use [`ColumnTransform::Identity`].
#[derive(Debug, Clone)]
pub struct ColumnRules {
    rules: Vec<ColumnRule>,
}

impl Default for ColumnRules {
    fn default() -> Self {
        Self {
            rules: vec![
                ColumnRule {
                    field_type: FieldType::DateTime,
                    transform: ColumnTransform::Epoch,
                },
                ColumnRule {
                    field_type: FieldType::Enum,
                    transform: ColumnTransform::Ordinal,
                },
                ColumnRule {
                    field_type: FieldType::Reference,
                    transform: ColumnTransform::Skip,
                },
            ],
        }
    }
}

impl ColumnRules {
    /// Add or replace the rule for a field type
    pub fn with_rule(mut self, field_type: FieldType, transform: ColumnTransform) -> Self {
        self.rules.retain(|r| r.field_type != field_type);
        self.rules.push(ColumnRule {
            field_type,
            transform,
        });
        self
    }

    pub fn transform_for(&self, field_type: FieldType) -> ColumnTransform {
        self.rules
            .iter()
            .find(|r| r.field_type == field_type)
            .map(|r| r.transform)
            .unwrap_or(ColumnTransform::Identity)
    }

    pub fn rules(&self) -> &[ColumnRule] {
        &self.rules
    }
}

/// Builds tables from records
pub struct Projector {
    rules: ColumnRules,
    converter: StandardConverter,
    null_policy: NullPolicy,
    table_name: String,
    case_sensitive: bool,
}

impl Default for Projector {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Projector {
    pub fn new(config: &Config) -> Self {
        Self {
            rules: ColumnRules::default(),
            converter: StandardConverter::new(config.datetime_encoding),
            null_policy: config.null_policy,
            table_name: config.table_name.clone(),
            case_sensitive: config.case_sensitive,
        }
    }

    /// Replace the column rule table
    pub fn with_rules(mut self, rules: ColumnRules) -> Self {
        self.rules = rules;
        self
    }

    /// Project records into a table.
    ///
    /// Columns come from the first record's mapped fields; later records are
    /// read by the same field names. Missing or null values become the
    /// column's null marker.
    pub fn project<'a, R, I>(&self, records: I) -> Result<Table>
    where
        R: Record + ?Sized + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        let mut records = records.into_iter();
        let Some(first) = records.next() else {
            return Ok(Table::new(self.table_name.clone()));
        };

        let name = if self.table_name.is_empty() {
            first.record_name().into_owned()
        } else {
            self.table_name.clone()
        };
        let mut table = Table::new(name);
        let mut plan = Vec::new();

        for field in first.fields().iter().filter(|f| f.is_transferable()) {
            let transform = self.rules.transform_for(field.field_type);
            let Some(column_type) = transform.column_type(field.field_type) else {
                trace!(field = %field.name, "no column for field");
                continue;
            };
            let mut column = Column::new(field.name.to_string(), 0, column_type);
            if self.null_policy == NullPolicy::TypeDefault {
                column = column.with_null_marker(StandardDefaults::zero(column_type.field_type()));
            }
            table.push_column(column)?;
            plan.push((field.name.to_string(), transform));
        }

        for record in std::iter::once(first).chain(records) {
            let cells = plan
                .iter()
                .zip(&table.columns)
                .map(|((name, transform), column)| match record.get(name) {
                    None | Some(Value::Null) => Ok(column.null_marker.clone()),
                    Some(value) => transform
                        .apply(&value, column.column_type, &self.converter)
                        .map_err(|_| Error::ColumnType {
                            column: column.name.clone(),
                            expected: column.column_type.to_string(),
                            found: value.kind().to_string(),
                        }),
                })
                .collect::<Result<Vec<_>>>()?;
            table.add_row(cells)?;
        }

        Ok(table)
    }

    /// Convert table rows back into records by column name.
    ///
    /// Each row starts from `T::default()`; cells that cannot be converted
    /// leave the field at its default.
    pub fn to_records<T>(&self, table: &Table) -> Vec<T>
    where
        T: Record + Default,
    {
        let mut out = Vec::with_capacity(table.row_count());
        for row in &table.rows {
            let mut target = T::default();
            let fields = target.fields().into_owned();
            for field in fields.iter().filter(|f| f.is_transferable()) {
                let col_idx = if self.case_sensitive {
                    table.column_index(&field.name)
                } else {
                    table.column_index_ignore_case(&field.name)
                };
                let Some(cell) = col_idx.and_then(|i| row.get(i)) else {
                    continue;
                };
                let result = self
                    .converter
                    .coerce(cell, field.field_type)
                    .map_err(|e| Error::conversion(field.name.clone(), e))
                    .and_then(|value| target.set(&field.name, value));
                if let Err(e) = result {
                    debug!(row = row.source_index, error = %e, "leaving field at default");
                }
            }
            out.push(target);
        }
        out
    }
}
