//! Index and foreign key definitions.

use serde::{Deserialize, Serialize};

use crate::naming::Naming;

/// Column name of the locale discriminator.
pub const LOCALE_COLUMN: &str = "_locale";

/// Index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexSpec {
    /// Creates an index named after its table and columns.
    pub fn new(naming: &Naming, table: &str, columns: &[&str], unique: bool) -> Self {
        Self {
            name: naming.index(table, columns),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique,
        }
    }

    pub(crate) fn canonical(&self) -> String {
        format!(
            "{} {}({})",
            self.name,
            if self.unique { "unique " } else { "" },
            self.columns.join(",")
        )
    }
}

/// Referential action on delete of the referenced row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
    Cascade,
    SetNull,
}

/// Foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySpec {
    pub name: String,
    pub columns: Vec<String>,
    pub foreign_table: String,
    pub foreign_columns: Vec<String>,
    pub on_delete: OnDelete,
}

impl ForeignKeySpec {
    /// Foreign key from `column` to `foreign_table.id`.
    pub fn to_id(
        naming: &Naming,
        table: &str,
        column: &str,
        foreign_table: &str,
        on_delete: OnDelete,
    ) -> Self {
        Self {
            name: naming.foreign_key(table, column),
            columns: vec![column.to_string()],
            foreign_table: foreign_table.to_string(),
            foreign_columns: vec!["id".to_string()],
            on_delete,
        }
    }

    pub(crate) fn canonical(&self) -> String {
        format!(
            "{} ({}) -> {}({}) on delete {:?}",
            self.name,
            self.columns.join(","),
            self.foreign_table,
            self.foreign_columns.join(","),
            self.on_delete
        )
    }
}

/// Builds the index requested by a field's `unique`/`index` flags.
///
/// Uniqueness on a localized column is scoped per locale, so the locale
/// discriminator joins the index. `disable_unique` demotes a unique index
/// to a plain one.
///
/// # Returns
/// `None` when the field asks for neither.
pub fn field_index(
    naming: &Naming,
    table: &str,
    column: &str,
    unique: bool,
    index: bool,
    localized: bool,
    disable_unique: bool,
) -> Option<IndexSpec> {
    if !unique && !index {
        return None;
    }
    let unique = unique && !disable_unique;
    if unique && localized {
        return Some(IndexSpec::new(naming, table, &[column, LOCALE_COLUMN], true));
    }
    Some(IndexSpec::new(naming, table, &[column], unique))
}
