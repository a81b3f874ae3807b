//! Maps scalar field kinds to column definitions.

use serde_json::Value;

use super::column::{Column, ColumnType, DefaultValue, IdType};
use crate::error::SchemaError;

/// Scalar storage kind of a field that occupies a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarKind {
    Text,
    Number,
    Date,
    Checkbox,
    RichText,
    Json,
    Point,
    /// Select/radio value stored as a generated enum
    Enum(String),
    /// Foreign key to a table with the given id type
    Reference(IdType),
}

impl ScalarKind {
    fn column_type(&self, timestamp_precision: u8) -> ColumnType {
        match self {
            ScalarKind::Text => ColumnType::Varchar,
            ScalarKind::Number => ColumnType::Numeric,
            ScalarKind::Date => ColumnType::Timestamp {
                precision: timestamp_precision,
                with_time_zone: true,
            },
            ScalarKind::Checkbox => ColumnType::Boolean,
            ScalarKind::RichText | ScalarKind::Json => ColumnType::Jsonb,
            ScalarKind::Point => ColumnType::Point,
            ScalarKind::Enum(name) => ColumnType::Enum { name: name.clone() },
            ScalarKind::Reference(id_type) => id_type.reference_type(),
        }
    }

    fn default_value(&self, value: &Value, field_path: &str) -> Result<DefaultValue, SchemaError> {
        let invalid = |expected| SchemaError::InvalidDefault {
            field_path: field_path.to_string(),
            expected,
        };
        match (self, value) {
            (ScalarKind::Text | ScalarKind::Date | ScalarKind::Enum(_), Value::String(s)) => {
                Ok(DefaultValue::Text(s.clone()))
            }
            (ScalarKind::Text, _) => Err(invalid("text")),
            (ScalarKind::Date, _) => Err(invalid("date")),
            (ScalarKind::Enum(_), _) => Err(invalid("enum")),
            (ScalarKind::Number, Value::Number(n)) => Ok(DefaultValue::Number(n.clone())),
            (ScalarKind::Number, _) => Err(invalid("number")),
            (ScalarKind::Checkbox, Value::Bool(b)) => Ok(DefaultValue::Boolean(*b)),
            (ScalarKind::Checkbox, _) => Err(invalid("checkbox")),
            (ScalarKind::Reference(_), Value::String(s)) => Ok(DefaultValue::Text(s.clone())),
            (ScalarKind::Reference(_), Value::Number(n)) => Ok(DefaultValue::Number(n.clone())),
            (ScalarKind::Reference(_), _) => Err(invalid("reference")),
            (ScalarKind::RichText | ScalarKind::Json | ScalarKind::Point, v) => {
                Ok(DefaultValue::Json(v.clone()))
            }
        }
    }
}

/// Modifiers that shape a mapped column.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnModifiers<'a> {
    pub default_value: Option<&'a Value>,
    /// Field is required and NOT NULL is applicable at this position
    pub not_null: bool,
    pub timestamp_precision: u8,
}

/// Maps a scalar field to its column definition.
///
/// # Arguments
/// * `kind` - Scalar storage kind
/// * `name` - Derived column name
/// * `field_path` - Logical field path, recorded as the column source
/// * `modifiers` - Default value, nullability and timestamp precision
///
/// # Returns
/// `Result<Column, SchemaError>`; fails only when the default does not fit.
pub fn map_column(
    kind: &ScalarKind,
    name: &str,
    field_path: &str,
    modifiers: ColumnModifiers<'_>,
) -> Result<Column, SchemaError> {
    let mut column = Column::new(name, kind.column_type(modifiers.timestamp_precision), field_path);
    column.not_null = modifiers.not_null;
    column.default = match modifiers.default_value {
        None | Some(Value::Null) => None,
        Some(value) => Some(kind.default_value(value, field_path)?),
    };
    Ok(column)
}
