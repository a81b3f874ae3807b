//! Physical table specification.
//!
//! Each table has:
//! - Ordered columns, named indexes and foreign keys
//! - Optional locale side-table holding localized columns
//! - Links to root-scoped tables it caused to exist (shared blocks, `_rels`)
//! - A canonical fingerprint computed once when the table is registered

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::column::{Column, ColumnType, IdType};
use super::constraint::{ForeignKeySpec, IndexSpec};
use crate::relation::Relation;
use crate::session::EnumSpec;
use crate::walker::AggregateFlags;

/// Role of a table in the compiled schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Collection,
    Global,
    Versions,
    Array,
    Block,
    /// Ordered value table of a multi-valued scalar, select or relationship
    MultiValue,
    Locales,
    Relationships,
}

/// Physical table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Table name
    pub name: String,
    /// Logical path that claimed the name
    pub source: String,
    pub kind: TableKind,
    /// Table this one hangs off through its parent key
    pub parent: Option<String>,
    /// Type of this table's `id` column
    pub id_type: IdType,
    /// Columns in declaration order
    pub columns: IndexMap<String, Column>,
    pub indexes: IndexMap<String, IndexSpec>,
    pub foreign_keys: IndexMap<String, ForeignKeySpec>,
    /// Name of the locale side-table
    pub locale_sibling: Option<String>,
    /// Root-scoped structures referenced from this table's subtree
    pub root_links: BTreeSet<String>,
    /// Flags of the subtree walked into this table
    pub flags: AggregateFlags,
    /// Canonical order-independent description of the table's shape
    pub fingerprint: String,
}

impl TableSpec {
    /// Returns a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Returns true if the table has a column with this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// CRC-32 of the fingerprint, for logs and summaries.
    pub fn digest(&self) -> u32 {
        crc32fast::hash(self.fingerprint.as_bytes())
    }

    /// Computes the canonical fingerprint.
    ///
    /// Lines are sorted so declaration order does not matter. Enum columns
    /// include their values so option drift changes the fingerprint.
    pub(crate) fn compute_fingerprint<'a>(
        &self,
        relations: impl Iterator<Item = &'a Relation>,
        enums: &BTreeMap<String, EnumSpec>,
    ) -> String {
        let mut lines: Vec<String> = Vec::new();
        for column in self.columns.values() {
            let mut line = format!("col {}", column.canonical());
            if let ColumnType::Enum { name } = &column.column_type {
                if let Some(spec) = enums.get(name) {
                    line.push_str(&format!(" [{}]", spec.values.join(",")));
                }
            }
            lines.push(line);
        }
        lines.extend(self.indexes.values().map(|i| format!("idx {}", i.canonical())));
        lines.extend(
            self.foreign_keys
                .values()
                .map(|fk| format!("fk {}", fk.canonical())),
        );
        if let Some(locales) = &self.locale_sibling {
            lines.push(format!("locales {}", locales));
        }
        lines.extend(relations.map(|r| format!("rel {}", r.canonical())));
        lines.extend(self.root_links.iter().map(|l| format!("link {}", l)));
        lines.sort();
        lines.join("\n")
    }
}
