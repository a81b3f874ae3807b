use std::collections::HashMap;

use crate::error::SchemaError;

/// Namespace of a claimed identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    Table,
    Enum,
    Index,
    ForeignKey,
}

impl NameKind {
    fn label(self) -> &'static str {
        match self {
            NameKind::Table => "Table",
            NameKind::Enum => "Enum",
            NameKind::Index => "Index",
            NameKind::ForeignKey => "Foreign key",
        }
    }
}

/// Process-wide registry of claimed identifiers.
///
/// A name may be claimed any number of times by the same logical source;
/// a claim from a different source is a structural ambiguity.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    claims: HashMap<(NameKind, String), String>,
}

impl NameTable {
    /// Creates an empty name table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `name` for `source`.
    ///
    /// # Returns
    /// `Ok(true)` on the first claim, `Ok(false)` when the same source
    /// already holds the name.
    pub fn claim(&mut self, kind: NameKind, name: &str, source: &str) -> Result<bool, SchemaError> {
        match self.claims.get(&(kind, name.to_string())) {
            Some(existing) if existing == source => Ok(false),
            Some(existing) => Err(SchemaError::NameCollision {
                kind: kind.label(),
                name: name.to_string(),
                existing: existing.clone(),
                incoming: source.to_string(),
            }),
            None => {
                self.claims
                    .insert((kind, name.to_string()), source.to_string());
                Ok(true)
            }
        }
    }

    /// Returns the source that claimed a name.
    pub fn source_of(&self, kind: NameKind, name: &str) -> Option<&str> {
        self.claims
            .get(&(kind, name.to_string()))
            .map(String::as_str)
    }

    /// Number of claimed names across all kinds.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}
