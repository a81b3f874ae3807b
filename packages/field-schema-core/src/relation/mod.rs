//! Relation descriptors and their materialization into join declarations.
//!
//! Descriptors are recorded per owning table while the field tree is
//! walked. Materialization runs once over the complete registry, after all
//! passes, so late siblings can still merge into an existing relation set.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Cardinality of a relation from the owning table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    /// Foreign key column on the owning table (or its locale sibling)
    One,
    /// Separate child or junction table keyed back to the owner
    Many,
}

/// Relation between an owning table and a target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Field path on the owning table (e.g. `blocks`, `meta.author`)
    pub field_path: String,
    pub cardinality: Cardinality,
    pub localized: bool,
    /// Table holding the join column for `One`, the owner for `Many`
    pub source_table: String,
    pub target_table: String,
    /// FK column on the source for `One`, parent key column on the target for `Many`
    pub join_column: String,
}

impl Relation {
    /// Foreign key relation stored in `source_table.join_column`.
    pub fn one(
        field_path: impl Into<String>,
        localized: bool,
        source_table: impl Into<String>,
        target_table: impl Into<String>,
        join_column: impl Into<String>,
    ) -> Self {
        Self {
            field_path: field_path.into(),
            cardinality: Cardinality::One,
            localized,
            source_table: source_table.into(),
            target_table: target_table.into(),
            join_column: join_column.into(),
        }
    }

    /// Child table relation keyed back to `owner` through `parent_column`.
    pub fn many(
        field_path: impl Into<String>,
        localized: bool,
        owner: impl Into<String>,
        target_table: impl Into<String>,
        parent_column: impl Into<String>,
    ) -> Self {
        Self {
            field_path: field_path.into(),
            cardinality: Cardinality::Many,
            localized,
            source_table: owner.into(),
            target_table: target_table.into(),
            join_column: parent_column.into(),
        }
    }

    pub(crate) fn canonical(&self) -> String {
        format!(
            "{} {:?}{} {}.{} -> {}",
            self.field_path,
            self.cardinality,
            if self.localized { " localized" } else { "" },
            self.source_table,
            self.join_column,
            self.target_table
        )
    }
}

/// Join declaration consumed by the query planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDecl {
    /// Relation name on the declaring table
    pub name: String,
    pub cardinality: Cardinality,
    pub source_table: String,
    pub target_table: String,
    /// Columns on `source_table` (empty for `Many`)
    pub fields: Vec<String>,
    /// Columns on `target_table` (empty for `Many`)
    pub references: Vec<String>,
    /// Pairs a `Many` declaration with its inverse `One`
    pub relation_name: String,
    pub localized: bool,
}

/// Relation descriptors keyed by owning table, then by field path.
#[derive(Debug, Clone, Default)]
pub struct RelationRegistry {
    tables: BTreeMap<String, IndexMap<String, Relation>>,
}

impl RelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a relation on `table`.
    ///
    /// Recording the same field path again merges the `localized` bit;
    /// a different target or cardinality is a conflict.
    pub fn record(&mut self, table: &str, relation: Relation) -> Result<(), SchemaError> {
        let relations = self.tables.entry(table.to_string()).or_default();
        match relations.get_mut(&relation.field_path) {
            Some(existing) => {
                if existing.target_table != relation.target_table
                    || existing.cardinality != relation.cardinality
                    || existing.join_column != relation.join_column
                {
                    return Err(SchemaError::RelationConflict {
                        table: table.to_string(),
                        field_path: relation.field_path,
                        existing: existing.target_table.clone(),
                        incoming: relation.target_table,
                    });
                }
                existing.localized |= relation.localized;
                Ok(())
            }
            None => {
                relations.insert(relation.field_path.clone(), relation);
                Ok(())
            }
        }
    }

    /// Relations recorded on `table`, in recording order.
    pub fn relations_of(&self, table: &str) -> impl Iterator<Item = &Relation> {
        self.tables.get(table).into_iter().flat_map(|r| r.values())
    }

    /// Returns the relation recorded for a field path on `table`.
    pub fn get(&self, table: &str, field_path: &str) -> Option<&Relation> {
        self.tables.get(table)?.get(field_path)
    }

    /// Total number of recorded relations.
    pub fn len(&self) -> usize {
        self.tables.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Produces join declarations for every table.
    ///
    /// Each `Many` relation yields a declaration on the owner plus an inverse
    /// `One` on the child table through its parent key column.
    pub fn materialize(&self) -> BTreeMap<String, Vec<RelationDecl>> {
        let mut decls: BTreeMap<String, Vec<RelationDecl>> = BTreeMap::new();
        for (table, relations) in &self.tables {
            for relation in relations.values() {
                match relation.cardinality {
                    Cardinality::One => {
                        decls.entry(table.clone()).or_default().push(RelationDecl {
                            name: relation.field_path.clone(),
                            cardinality: Cardinality::One,
                            source_table: relation.source_table.clone(),
                            target_table: relation.target_table.clone(),
                            fields: vec![relation.join_column.clone()],
                            references: vec!["id".to_string()],
                            relation_name: relation.field_path.clone(),
                            localized: relation.localized,
                        });
                    }
                    Cardinality::Many => {
                        decls.entry(table.clone()).or_default().push(RelationDecl {
                            name: relation.field_path.clone(),
                            cardinality: Cardinality::Many,
                            source_table: table.clone(),
                            target_table: relation.target_table.clone(),
                            fields: Vec::new(),
                            references: Vec::new(),
                            relation_name: relation.field_path.clone(),
                            localized: relation.localized,
                        });
                        let inverse = decls.entry(relation.target_table.clone()).or_default();
                        if !inverse.iter().any(|d| d.name == relation.join_column) {
                            inverse.push(RelationDecl {
                                name: relation.join_column.clone(),
                                cardinality: Cardinality::One,
                                source_table: relation.target_table.clone(),
                                target_table: table.clone(),
                                fields: vec![relation.join_column.clone()],
                                references: vec!["id".to_string()],
                                relation_name: relation.field_path.clone(),
                                localized: false,
                            });
                        }
                    }
                }
            }
        }
        decls
    }
}
