//! Compilation session shared by every recursive frame.
//!
//! The session owns the table registry, enum registry, relation registry,
//! name claims and root-scoped relationship targets. One session may span
//! several passes (document, versions, globals); it must not be used by two
//! passes at once. [`SharedSession`] provides that discipline across threads.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::CompilerConfig;
use crate::error::SchemaError;
use crate::fields::Block;
use crate::naming::{NameKind, NameTable, Naming};
use crate::relation::RelationRegistry;
use crate::schema::CompiledSchema;
use crate::table::{IdType, TableSpec};
use crate::walker::AggregateFlags;

/// Source tag of the locale enum claim.
const LOCALES_ENUM_SOURCE: &str = "#locales";

/// Generated enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumSpec {
    pub name: String,
    pub values: Vec<String>,
}

/// Table a relationship can point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub slug: String,
    pub table: String,
    pub id_type: IdType,
}

/// State collected for one root table across its whole subtree.
#[derive(Debug, Clone, Default)]
pub struct RootScope {
    /// Collections referenced by polymorphic relationships anywhere below the root
    pub polymorphic_targets: BTreeSet<String>,
    /// A localized polymorphic relationship stores rows per locale
    pub localized_polymorphic: bool,
    pub flags: AggregateFlags,
}

/// Compilation session.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) config: CompilerConfig,
    pub(crate) naming: Naming,
    pub(crate) names: NameTable,
    pub(crate) tables: BTreeMap<String, TableSpec>,
    /// Tables whose walk is in progress
    pub(crate) building: BTreeSet<String>,
    /// First declaration of each shared block table
    pub(crate) block_shapes: BTreeMap<String, Block>,
    pub(crate) enums: BTreeMap<String, EnumSpec>,
    pub(crate) relations: RelationRegistry,
    pub(crate) targets: BTreeMap<String, Target>,
    pub(crate) roots: BTreeMap<String, RootScope>,
    locales_enum: Option<String>,
}

impl Session {
    /// Opens a session for the given configuration.
    ///
    /// Registers the locale enum when localization is enabled.
    pub fn new(config: CompilerConfig) -> Result<Self, SchemaError> {
        config.validate()?;
        let naming = Naming::new(config.max_identifier_length);
        let mut session = Self {
            config,
            naming,
            names: NameTable::new(),
            tables: BTreeMap::new(),
            building: BTreeSet::new(),
            block_shapes: BTreeMap::new(),
            enums: BTreeMap::new(),
            relations: RelationRegistry::new(),
            targets: BTreeMap::new(),
            roots: BTreeMap::new(),
            locales_enum: None,
        };
        if let Some(localization) = session.config.localization.clone() {
            let name = session.naming.derive(&["enum", "_locales"]);
            session.register_enum(&name, localization.locales, LOCALES_ENUM_SOURCE)?;
            session.locales_enum = Some(name);
        }
        Ok(session)
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn naming(&self) -> &Naming {
        &self.naming
    }

    /// Returns true if the owning system supports multiple locales.
    pub fn localization_enabled(&self) -> bool {
        self.locales_enum.is_some()
    }

    /// Name of the locale enum, when localization is enabled.
    pub fn locales_enum(&self) -> Option<&str> {
        self.locales_enum.as_deref()
    }

    /// Registers a collection that relationships may target.
    ///
    /// Claims the table name for the slug; registering the same slug again
    /// is a no-op.
    pub fn register_target(
        &mut self,
        slug: &str,
        table: &str,
        id_type: IdType,
    ) -> Result<(), SchemaError> {
        self.names.claim(NameKind::Table, table, slug)?;
        self.targets.entry(slug.to_string()).or_insert_with(|| Target {
            slug: slug.to_string(),
            table: table.to_string(),
            id_type,
        });
        Ok(())
    }

    /// Returns the registered target for a collection slug.
    pub fn target(&self, slug: &str) -> Option<&Target> {
        self.targets.get(slug)
    }

    /// Registers an enum type; idempotent for identical values.
    pub fn register_enum(
        &mut self,
        name: &str,
        values: Vec<String>,
        source: &str,
    ) -> Result<(), SchemaError> {
        self.names.claim(NameKind::Enum, name, source)?;
        match self.enums.get(name) {
            Some(existing) if existing.values == values => Ok(()),
            Some(_) => Err(SchemaError::EnumConflict {
                name: name.to_string(),
            }),
            None => {
                tracing::debug!("Registered enum '{}' with {} values", name, values.len());
                self.enums.insert(
                    name.to_string(),
                    EnumSpec {
                        name: name.to_string(),
                        values,
                    },
                );
                Ok(())
            }
        }
    }

    /// Gets a table by name.
    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.get(name)
    }

    /// Returns true if the table is fully built.
    pub fn is_built(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Returns an iterator over all table names.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Returns the number of registered tables.
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn enums(&self) -> &BTreeMap<String, EnumSpec> {
        &self.enums
    }

    pub fn relations(&self) -> &RelationRegistry {
        &self.relations
    }

    /// Root-scoped state of a root table.
    pub fn root_scope(&self, root: &str) -> Option<&RootScope> {
        self.roots.get(root)
    }

    pub(crate) fn root_scope_mut(&mut self, root: &str) -> &mut RootScope {
        self.roots.entry(root.to_string()).or_default()
    }

    /// Fresh session with the same capabilities and targets but no tables.
    ///
    /// Used to build a candidate shape without touching this session.
    pub(crate) fn probe(&self) -> Session {
        let mut probe = Session {
            config: self.config.clone(),
            naming: self.naming.clone(),
            names: NameTable::new(),
            tables: BTreeMap::new(),
            building: BTreeSet::new(),
            block_shapes: BTreeMap::new(),
            enums: BTreeMap::new(),
            relations: RelationRegistry::new(),
            targets: self.targets.clone(),
            roots: BTreeMap::new(),
            locales_enum: self.locales_enum.clone(),
        };
        if let Some(name) = &self.locales_enum {
            if let Some(spec) = self.enums.get(name) {
                probe.enums.insert(name.clone(), spec.clone());
            }
        }
        probe
    }

    /// Runs `f` against a copy of the session and keeps the result only on success.
    ///
    /// A failed pass leaves the session exactly as it was.
    pub fn atomically<F, R>(&mut self, f: F) -> Result<R, SchemaError>
    where
        F: FnOnce(&mut Session) -> Result<R, SchemaError>,
    {
        let mut scratch = self.clone();
        let result = f(&mut scratch)?;
        *self = scratch;
        Ok(result)
    }

    /// Snapshot of every artifact compiled so far, with relations materialized.
    pub fn to_schema(&self) -> CompiledSchema {
        CompiledSchema {
            tables: self.tables.clone(),
            enums: self.enums.clone(),
            relations: self.relations.materialize(),
            roots: self
                .roots
                .iter()
                .map(|(name, scope)| (name.clone(), scope.flags))
                .collect(),
        }
    }
}

/// Session guarded for use from several threads.
///
/// The lock is held for a full pass so two document types never interleave
/// on shared names.
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Runs one pass with exclusive access; rolled back on error.
    pub fn with_pass<F, R>(&self, f: F) -> Result<R, SchemaError>
    where
        F: FnOnce(&mut Session) -> Result<R, SchemaError>,
    {
        let mut session = self.inner.lock();
        session.atomically(f)
    }

    /// Snapshot of the compiled schema.
    pub fn to_schema(&self) -> CompiledSchema {
        self.inner.lock().to_schema()
    }
}
