//! Column definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Storage type of an id column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    #[default]
    Integer,
    Uuid,
    Numeric,
    Varchar,
}

impl IdType {
    /// Column type of a primary key with this id type.
    pub fn primary_key_type(self) -> ColumnType {
        match self {
            IdType::Integer => ColumnType::Serial,
            IdType::Uuid => ColumnType::Uuid,
            IdType::Numeric => ColumnType::Numeric,
            IdType::Varchar => ColumnType::Varchar,
        }
    }

    /// Column type of a foreign key referencing this id type.
    pub fn reference_type(self) -> ColumnType {
        match self {
            IdType::Integer => ColumnType::Integer,
            IdType::Uuid => ColumnType::Uuid,
            IdType::Numeric => ColumnType::Numeric,
            IdType::Varchar => ColumnType::Varchar,
        }
    }

    /// Primary key column named `id`.
    pub fn id_column(self) -> Column {
        let mut column = Column::new("id", self.primary_key_type(), "#id");
        column.primary_key = true;
        column.not_null = true;
        if self == IdType::Uuid {
            column.default = Some(DefaultValue::RandomUuid);
        }
        column
    }
}

/// Storage engine column type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnType {
    Serial,
    Integer,
    Numeric,
    Varchar,
    Text,
    Uuid,
    Boolean,
    Timestamp { precision: u8, with_time_zone: bool },
    Jsonb,
    Point,
    /// Reference to a generated enum type
    Enum { name: String },
}

impl ColumnType {
    /// Canonical spelling used in fingerprints.
    pub fn canonical(&self) -> String {
        match self {
            ColumnType::Serial => "serial".to_string(),
            ColumnType::Integer => "integer".to_string(),
            ColumnType::Numeric => "numeric".to_string(),
            ColumnType::Varchar => "varchar".to_string(),
            ColumnType::Text => "text".to_string(),
            ColumnType::Uuid => "uuid".to_string(),
            ColumnType::Boolean => "boolean".to_string(),
            ColumnType::Timestamp {
                precision,
                with_time_zone,
            } => format!("timestamp({}){}", precision, if *with_time_zone { "tz" } else { "" }),
            ColumnType::Jsonb => "jsonb".to_string(),
            ColumnType::Point => "geometry(point)".to_string(),
            ColumnType::Enum { name } => format!("enum:{}", name),
        }
    }
}

/// Column default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
    Text(String),
    Number(Number),
    Boolean(bool),
    Json(Value),
    Now,
    RandomUuid,
}

impl DefaultValue {
    fn canonical(&self) -> String {
        match self {
            DefaultValue::Text(s) => format!("'{}'", s),
            DefaultValue::Number(n) => n.to_string(),
            DefaultValue::Boolean(b) => b.to_string(),
            DefaultValue::Json(v) => v.to_string(),
            DefaultValue::Now => "now()".to_string(),
            DefaultValue::RandomUuid => "gen_random_uuid()".to_string(),
        }
    }
}

/// Column definition within a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Physical column name
    pub name: String,
    /// Storage type
    pub column_type: ColumnType,
    /// NOT NULL constraint
    pub not_null: bool,
    /// Part of the primary key
    pub primary_key: bool,
    /// Column default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Logical field path that produced the column (`#` prefix for row defaults)
    pub source: String,
}

impl Column {
    /// Creates a nullable column without default.
    pub fn new(name: impl Into<String>, column_type: ColumnType, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null: false,
            primary_key: false,
            default: None,
            source: source.into(),
        }
    }

    /// Marks the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Sets the column default.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Canonical text of the column's storage shape.
    pub fn canonical(&self) -> String {
        let mut out = format!("{} {}", self.name, self.column_type.canonical());
        if self.primary_key {
            out.push_str(" pk");
        }
        if self.not_null {
            out.push_str(" not null");
        }
        if let Some(default) = &self.default {
            out.push_str(" default ");
            out.push_str(&default.canonical());
        }
        out
    }
}
