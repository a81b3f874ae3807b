//! Table registry entries and the builder that produces them.

mod builder;
mod column;
mod constraint;
mod draft;
mod mapper;
#[allow(clippy::module_inception)]
mod table;

pub use builder::{build_table, BuiltTable, TableRequest, LOCALES_RELATION, PARENT_COLUMN};
pub(crate) use builder::locale_column;
pub use column::{Column, ColumnType, DefaultValue, IdType};
pub use constraint::{field_index, ForeignKeySpec, IndexSpec, OnDelete, LOCALE_COLUMN};
pub use draft::{DraftSide, Placement, TableDraft};
pub use mapper::{map_column, ColumnModifiers, ScalarKind};
pub use table::{TableKind, TableSpec};
