//! Schema compilation error types.

use thiserror::Error;

/// Schema compilation errors.
///
/// Every variant describes a contradiction in the field tree itself. None of
/// them are retryable; a failed pass produces no schema artifacts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Unique constraint requested on a field stored as an ordered child table
    #[error("Field '{field_path}' in table '{table}': unique is not supported for multi-valued {kind} fields")]
    UniqueOnMultiValued {
        table: String,
        field_path: String,
        kind: &'static str,
    },

    /// Block slug reused with a structure that differs from the first occurrence
    #[error("Block '{slug}' does not match the existing shape of table '{table}' (differs at '{differs_at}')")]
    BlockShapeMismatch {
        slug: String,
        table: String,
        differs_at: String,
    },

    /// Relationship references a collection that was never registered
    #[error("Field '{field_path}' references unknown collection '{target}'")]
    UnknownRelationTarget { field_path: String, target: String },

    /// Default value does not fit the column type
    #[error("Field '{field_path}' has a default value incompatible with {expected}")]
    InvalidDefault {
        field_path: String,
        expected: &'static str,
    },

    /// Two distinct logical paths derived the same physical identifier
    #[error("{kind} name '{name}' derived from '{incoming}' collides with '{existing}'")]
    NameCollision {
        kind: &'static str,
        name: String,
        existing: String,
        incoming: String,
    },

    /// Two distinct field paths derived the same column within one table
    #[error("Column '{column}' in table '{table}' derived from '{incoming}' collides with '{existing}'")]
    ColumnCollision {
        table: String,
        column: String,
        existing: String,
        incoming: String,
    },

    /// Relation key recorded twice with different targets
    #[error("Relation '{field_path}' on table '{table}' already targets '{existing}', cannot retarget to '{incoming}'")]
    RelationConflict {
        table: String,
        field_path: String,
        existing: String,
        incoming: String,
    },

    /// Enum name claimed twice with different values
    #[error("Enum '{name}' already registered with different values")]
    EnumConflict { name: String },

    /// Identifier limit too small to hold a hash suffix
    #[error("Identifier limit {limit} is below the minimum of {minimum}")]
    IdentifierLimitTooSmall { limit: usize, minimum: usize },

    /// Localization configured without any locales
    #[error("Localization is enabled but no locales are configured")]
    EmptyLocales,
}
