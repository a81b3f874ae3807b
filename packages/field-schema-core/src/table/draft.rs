//! Mutable table under construction.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use super::column::Column;
use super::constraint::{ForeignKeySpec, IndexSpec};
use crate::error::SchemaError;
use crate::relation::Relation;

/// Table a walked column is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Main,
    Locales,
}

/// Column, index and constraint sets of one side of a draft.
#[derive(Debug, Clone, Default)]
pub struct DraftSide {
    pub columns: IndexMap<String, Column>,
    pub indexes: IndexMap<String, IndexSpec>,
    pub foreign_keys: IndexMap<String, ForeignKeySpec>,
}

impl DraftSide {
    fn add_column(&mut self, table: &str, column: Column) -> Result<(), SchemaError> {
        if let Some(existing) = self.columns.get(&column.name) {
            if existing.source != column.source {
                return Err(SchemaError::ColumnCollision {
                    table: table.to_string(),
                    column: column.name,
                    existing: existing.source.clone(),
                    incoming: column.source,
                });
            }
            return Ok(());
        }
        self.columns.insert(column.name.clone(), column);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Table being assembled by the table builder and the walker.
///
/// Columns of localized fields collect on the `locales` side and become the
/// locale side-table when the draft is committed.
#[derive(Debug, Clone)]
pub struct TableDraft {
    pub name: String,
    pub locales_name: String,
    pub main: DraftSide,
    pub locales: DraftSide,
    pub relations: Vec<Relation>,
    pub root_links: BTreeSet<String>,
}

impl TableDraft {
    pub fn new(name: impl Into<String>, locales_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locales_name: locales_name.into(),
            main: DraftSide::default(),
            locales: DraftSide::default(),
            relations: Vec::new(),
            root_links: BTreeSet::new(),
        }
    }

    /// Name of the table a placement resolves to.
    pub fn table_name(&self, placement: Placement) -> &str {
        match placement {
            Placement::Main => &self.name,
            Placement::Locales => &self.locales_name,
        }
    }

    /// Adds a column, rejecting a second column of the same name from a different field.
    pub fn add_column(&mut self, placement: Placement, column: Column) -> Result<(), SchemaError> {
        let table = self.table_name(placement).to_string();
        self.side_mut(placement).add_column(&table, column)
    }

    pub fn add_index(&mut self, placement: Placement, index: IndexSpec) {
        self.side_mut(placement)
            .indexes
            .insert(index.name.clone(), index);
    }

    pub fn add_foreign_key(&mut self, placement: Placement, foreign_key: ForeignKeySpec) {
        self.side_mut(placement)
            .foreign_keys
            .insert(foreign_key.name.clone(), foreign_key);
    }

    /// Returns true if the given side already has a column with this name.
    pub fn has_column(&self, placement: Placement, name: &str) -> bool {
        match placement {
            Placement::Main => self.main.columns.contains_key(name),
            Placement::Locales => self.locales.columns.contains_key(name),
        }
    }

    pub fn add_relation(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    fn side_mut(&mut self, placement: Placement) -> &mut DraftSide {
        match placement {
            Placement::Main => &mut self.main,
            Placement::Locales => &mut self.locales,
        }
    }
}
