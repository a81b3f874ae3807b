//! Table builder: registers one physical table per derived name.

use tracing::debug;

use super::column::{Column, ColumnType, DefaultValue, IdType};
use super::constraint::{ForeignKeySpec, IndexSpec, OnDelete, LOCALE_COLUMN};
use super::draft::{Placement, TableDraft};
use super::table::{TableKind, TableSpec};
use crate::error::SchemaError;
use crate::fields::Field;
use crate::naming::NameKind;
use crate::relation::Relation;
use crate::session::Session;
use crate::walker::{self, AggregateFlags, WalkContext, WalkOptions};

/// Parent key column of locale side-tables, arrays and blocks.
pub const PARENT_COLUMN: &str = "_parent_id";

/// Relation name from a table to its locale side-table.
pub const LOCALES_RELATION: &str = "_locales";

/// Everything needed to build one table.
#[derive(Debug, Clone)]
pub struct TableRequest<'a> {
    pub name: String,
    /// Logical path claiming the name
    pub source: String,
    pub kind: TableKind,
    pub parent: Option<String>,
    /// Type of this table's `id` column
    pub id_type: IdType,
    pub base_columns: Vec<Column>,
    pub base_indexes: Vec<IndexSpec>,
    pub base_foreign_keys: Vec<ForeignKeySpec>,
    /// Relations owned by the table itself, recorded before its fingerprint
    pub base_relations: Vec<Relation>,
    pub fields: &'a [Field],
    pub walk: WalkOptions,
    /// Append `updated_at`/`created_at` after the walk
    pub timestamps: bool,
}

/// Result of a table build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltTable {
    pub name: String,
    pub flags: AggregateFlags,
    /// The table already existed (or was being built) and was not walked again
    pub reused: bool,
}

/// Builds and registers a table, walking its field tree.
///
/// Returns the existing table's flags without walking when the name is
/// already registered. A name reserved by a build in progress (a block that
/// embeds itself) is returned as reused with empty flags.
///
/// # Returns
/// `Result<BuiltTable, SchemaError>`; on error the session holds partial
/// state and should be discarded (see [`Session::atomically`]).
pub fn build_table(
    session: &mut Session,
    request: TableRequest<'_>,
) -> Result<BuiltTable, SchemaError> {
    session
        .names
        .claim(NameKind::Table, &request.name, &request.source)?;

    if let Some(existing) = session.tables.get(&request.name) {
        debug!("Reusing table '{}'", request.name);
        return Ok(BuiltTable {
            name: request.name,
            flags: existing.flags,
            reused: true,
        });
    }
    if session.building.contains(&request.name) {
        debug!("Table '{}' is being built, linking only", request.name);
        return Ok(BuiltTable {
            name: request.name,
            flags: AggregateFlags::default(),
            reused: true,
        });
    }
    session.building.insert(request.name.clone());

    let naming = session.naming.clone();
    let mut draft = TableDraft::new(&request.name, naming.locales_table(&request.name));
    for column in request.base_columns {
        draft.add_column(Placement::Main, column)?;
    }
    for index in request.base_indexes {
        draft.add_index(Placement::Main, index);
    }
    for foreign_key in request.base_foreign_keys {
        draft.add_foreign_key(Placement::Main, foreign_key);
    }
    for relation in request.base_relations {
        draft.add_relation(relation);
    }

    let ctx = WalkContext::new(
        &request.name,
        &request.source,
        request.id_type,
        request.walk,
        session.localization_enabled(),
    );
    let flags = walker::walk(session, &ctx, &mut draft, request.fields)?;

    if request.timestamps {
        add_timestamps(session, &mut draft)?;
    }

    let locale_sibling = if draft.locales.is_empty() {
        None
    } else {
        Some(commit_locales(
            session,
            &mut draft,
            &request.source,
            request.id_type,
        )?)
    };

    let spec = TableSpec {
        name: request.name.clone(),
        source: request.source,
        kind: request.kind,
        parent: request.parent,
        id_type: request.id_type,
        columns: draft.main.columns,
        indexes: draft.main.indexes,
        foreign_keys: draft.main.foreign_keys,
        locale_sibling,
        root_links: draft.root_links,
        flags,
        fingerprint: String::new(),
    };
    for relation in draft.relations {
        session.relations.record(&spec.name, relation)?;
    }
    register(session, spec)?;
    session.building.remove(&request.name);

    Ok(BuiltTable {
        name: request.name,
        flags,
        reused: false,
    })
}

/// Claims constraint names, computes the fingerprint and stores the table.
fn register(session: &mut Session, mut spec: TableSpec) -> Result<(), SchemaError> {
    for index in spec.indexes.keys() {
        session
            .names
            .claim(NameKind::Index, index, &format!("{}#index", spec.source))?;
    }
    for foreign_key in spec.foreign_keys.keys() {
        session
            .names
            .claim(NameKind::ForeignKey, foreign_key, &format!("{}#fk", spec.source))?;
    }
    spec.fingerprint =
        spec.compute_fingerprint(session.relations.relations_of(&spec.name), &session.enums);
    debug!(
        "Built table '{}' with {} columns (fingerprint {:08x})",
        spec.name,
        spec.columns.len(),
        spec.digest()
    );
    session.tables.insert(spec.name.clone(), spec);
    Ok(())
}

/// Locale discriminator column typed by the session's locale enum.
pub(crate) fn locale_column(session: &Session, name: &str) -> Column {
    let locales_enum = session
        .locales_enum()
        .map(str::to_string)
        .unwrap_or_default();
    Column::new(name, ColumnType::Enum { name: locales_enum }, format!("#{}", name)).not_null()
}

fn add_timestamps(session: &Session, draft: &mut TableDraft) -> Result<(), SchemaError> {
    let precision = session.config.timestamp_precision;
    for name in ["updated_at", "created_at"] {
        if draft.has_column(Placement::Main, name) {
            debug!("Table '{}' declares '{}' itself", draft.name, name);
            continue;
        }
        let column = Column::new(
            name,
            ColumnType::Timestamp {
                precision,
                with_time_zone: true,
            },
            format!("#{}", name),
        )
        .not_null()
        .with_default(DefaultValue::Now);
        draft.add_column(Placement::Main, column)?;
        let index = IndexSpec::new(&session.naming, &draft.name, &[name], false);
        draft.add_index(Placement::Main, index);
    }
    Ok(())
}

/// Turns the locale side of a draft into the `<table>_locales` table.
fn commit_locales(
    session: &mut Session,
    draft: &mut TableDraft,
    owner_source: &str,
    owner_id_type: IdType,
) -> Result<String, SchemaError> {
    let naming = session.naming.clone();
    let name = draft.locales_name.clone();
    let source = format!("{}#locales", owner_source);
    session.names.claim(NameKind::Table, &name, &source)?;

    let side = std::mem::take(&mut draft.locales);

    let mut locales = TableDraft::new(&name, String::new());
    locales.add_column(Placement::Main, IdType::Integer.id_column())?;
    for column in side.columns.into_values() {
        locales.add_column(Placement::Main, column)?;
    }
    locales.add_column(Placement::Main, locale_column(session, LOCALE_COLUMN))?;
    locales.add_column(
        Placement::Main,
        Column::new(PARENT_COLUMN, owner_id_type.reference_type(), "#_parent_id").not_null(),
    )?;

    for index in side.indexes.into_values() {
        locales.add_index(Placement::Main, index);
    }
    let unique = IndexSpec {
        name: naming.derive(&[name.as_str(), "locale_parent_id", "unique"]),
        columns: vec![LOCALE_COLUMN.to_string(), PARENT_COLUMN.to_string()],
        unique: true,
    };
    locales.add_index(Placement::Main, unique);

    for foreign_key in side.foreign_keys.into_values() {
        locales.add_foreign_key(Placement::Main, foreign_key);
    }
    locales.add_foreign_key(
        Placement::Main,
        ForeignKeySpec::to_id(&naming, &name, PARENT_COLUMN, &draft.name, OnDelete::Cascade),
    );

    let owner = draft.name.clone();
    draft.add_relation(Relation::many(
        LOCALES_RELATION,
        false,
        &owner,
        &name,
        PARENT_COLUMN,
    ));

    let spec = TableSpec {
        name: name.clone(),
        source,
        kind: TableKind::Locales,
        parent: Some(owner),
        id_type: IdType::Integer,
        columns: locales.main.columns,
        indexes: locales.main.indexes,
        foreign_keys: locales.main.foreign_keys,
        locale_sibling: None,
        root_links: Default::default(),
        flags: AggregateFlags::default(),
        fingerprint: String::new(),
    };
    register(session, spec)?;
    Ok(name)
}
