//! Compiled schema artifacts handed to downstream collaborators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::relation::RelationDecl;
use crate::session::EnumSpec;
use crate::table::TableSpec;
use crate::walker::AggregateFlags;

/// Output of a compilation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledSchema {
    /// Table registry, consumed by the DDL emitter
    pub tables: BTreeMap<String, TableSpec>,
    /// Generated enum types
    pub enums: BTreeMap<String, EnumSpec>,
    /// Join declarations per table, consumed by the query planner
    pub relations: BTreeMap<String, Vec<RelationDecl>>,
    /// Aggregate flags per root table
    pub roots: BTreeMap<String, AggregateFlags>,
}

impl CompiledSchema {
    /// Gets a table by name.
    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.get(name)
    }

    /// Join declarations of a table.
    pub fn relations_of(&self, table: &str) -> &[RelationDecl] {
        self.relations.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of columns across all tables.
    pub fn column_count(&self) -> usize {
        self.tables.values().map(|t| t.columns.len()).sum()
    }
}
