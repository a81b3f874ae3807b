//! Entry points compiling document types into a session.
//!
//! Each entry point is one pass: it runs atomically against the session and
//! leaves it untouched on error.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::SchemaError;
use crate::fields::{CollectionConfig, Field, FieldAttrs, GlobalConfig, ScalarField, SchemaConfig};
use crate::relation::Relation;
use crate::schema::CompiledSchema;
use crate::session::Session;
use crate::table::{
    build_table, locale_column, BuiltTable, Column, ColumnType, ForeignKeySpec, IdType, IndexSpec,
    OnDelete, TableKind, TableRequest,
};
use crate::walker::{AggregateFlags, RootRef, WalkOptions};

/// Column linking a version row to its document.
const VERSION_PARENT_COLUMN: &str = "parent_id";
/// Field and column prefix of versioned fields.
const VERSION_PREFIX: &str = "version";
/// Flag marking the newest version of a document.
const LATEST_COLUMN: &str = "latest";
/// Join column of the consolidated relationship table.
const RELS_PARENT_COLUMN: &str = "parent_id";
/// Relation name from a root to its consolidated relationship table.
const RELS_RELATION: &str = "_rels";

/// Document type normalized for table building.
struct Document {
    slug: String,
    table: String,
    source: String,
    kind: TableKind,
    id_type: IdType,
    fields: Vec<Field>,
    timestamps: bool,
    drafts: bool,
}

impl Document {
    fn collection(session: &Session, collection: &CollectionConfig) -> Self {
        Self {
            slug: collection.slug.clone(),
            table: collection_table(session, collection),
            source: collection.slug.clone(),
            kind: TableKind::Collection,
            id_type: collection
                .id_type
                .unwrap_or(session.config.default_id_type),
            fields: with_draft_status(&collection.fields, collection.drafts()),
            timestamps: collection.timestamps,
            drafts: collection.drafts(),
        }
    }

    fn global(session: &Session, global: &GlobalConfig) -> Self {
        let table = match &global.db_name {
            Some(db_name) => session.naming.derive(&[db_name]),
            None => session.naming.derive(&[&global.slug]),
        };
        Self {
            slug: global.slug.clone(),
            table,
            source: format!("global:{}", global.slug),
            kind: TableKind::Global,
            id_type: IdType::Integer,
            fields: with_draft_status(&global.fields, global.drafts()),
            timestamps: true,
            drafts: global.drafts(),
        }
    }

    fn root(&self) -> RootRef {
        RootRef {
            table: self.table.clone(),
            source: self.source.clone(),
            id_type: self.id_type,
        }
    }
}

fn collection_table(session: &Session, collection: &CollectionConfig) -> String {
    match &collection.db_name {
        Some(db_name) => session.naming.derive(&[db_name]),
        None => session.naming.derive(&[&collection.slug]),
    }
}

fn with_draft_status(fields: &[Field], drafts: bool) -> Vec<Field> {
    let mut fields = fields.to_vec();
    if drafts {
        fields.push(Field::draft_status());
    }
    fields
}

/// Registers a collection as a relationship target without building it.
///
/// Lets collections reference each other regardless of declaration order.
pub fn register_collection(
    session: &mut Session,
    collection: &CollectionConfig,
) -> Result<(), SchemaError> {
    let table = collection_table(session, collection);
    let id_type = collection
        .id_type
        .unwrap_or(session.config.default_id_type);
    session.register_target(&collection.slug, &table, id_type)
}

/// Compiles a collection's document table and everything below it.
///
/// # Arguments
/// * `session` - Session receiving the tables
/// * `collection` - Collection definition
///
/// # Returns
/// `Result<BuiltTable, SchemaError>` describing the document table.
pub fn compile_collection(
    session: &mut Session,
    collection: &CollectionConfig,
) -> Result<BuiltTable, SchemaError> {
    session.atomically(|session| {
        register_collection(session, collection)?;
        let document = Document::collection(session, collection);
        build_document(session, &document)
    })
}

/// Compiles the version history table `_<slug>_v` of a collection.
pub fn compile_versions(
    session: &mut Session,
    collection: &CollectionConfig,
) -> Result<BuiltTable, SchemaError> {
    session.atomically(|session| {
        register_collection(session, collection)?;
        let document = Document::collection(session, collection);
        build_versions(session, &document, true)
    })
}

/// Compiles a global's singleton table.
pub fn compile_global(
    session: &mut Session,
    global: &GlobalConfig,
) -> Result<BuiltTable, SchemaError> {
    session.atomically(|session| {
        let document = Document::global(session, global);
        build_document(session, &document)
    })
}

/// Compiles the version history table of a global.
pub fn compile_global_versions(
    session: &mut Session,
    global: &GlobalConfig,
) -> Result<BuiltTable, SchemaError> {
    session.atomically(|session| {
        let document = Document::global(session, global);
        build_versions(session, &document, false)
    })
}

/// Compiles every collection and global of a configuration.
///
/// Collections are registered as relationship targets before any table is
/// built. Versions follow their document type.
///
/// # Returns
/// `Result<CompiledSchema, SchemaError>`; nothing is returned on error.
pub fn compile_schema(config: &SchemaConfig) -> Result<CompiledSchema, SchemaError> {
    let mut session = Session::new(config.compiler.clone())?;
    for collection in &config.collections {
        register_collection(&mut session, collection)?;
    }
    for collection in &config.collections {
        compile_collection(&mut session, collection)?;
        if collection.versions.is_some() {
            compile_versions(&mut session, collection)?;
        }
    }
    for global in &config.globals {
        compile_global(&mut session, global)?;
        if global.versions.is_some() {
            compile_global_versions(&mut session, global)?;
        }
    }

    let schema = session.to_schema();
    info!(
        "Compiled {} collections and {} globals into {} tables ({} columns, {} enums)",
        config.collections.len(),
        config.globals.len(),
        schema.tables.len(),
        schema.column_count(),
        schema.enums.len()
    );
    Ok(schema)
}

fn build_document(session: &mut Session, document: &Document) -> Result<BuiltTable, SchemaError> {
    let root = document.root();
    let built = build_table(
        session,
        TableRequest {
            name: document.table.clone(),
            source: document.source.clone(),
            kind: document.kind,
            parent: None,
            id_type: document.id_type,
            base_columns: vec![document.id_type.id_column()],
            base_indexes: Vec::new(),
            base_foreign_keys: Vec::new(),
            base_relations: Vec::new(),
            fields: &document.fields,
            walk: WalkOptions::root(root.clone()),
            timestamps: document.timestamps,
        },
    )?;
    finish_root(session, &root, built.flags)?;
    debug!("Compiled '{}' into '{}'", document.slug, built.name);
    Ok(built)
}

/// Builds `_<table>_v`, holding a snapshot of every field under `version_`.
fn build_versions(
    session: &mut Session,
    document: &Document,
    link_parent: bool,
) -> Result<BuiltTable, SchemaError> {
    let naming = session.naming.clone();
    let name = naming.versions_table(&document.table);
    let root = RootRef {
        table: name.clone(),
        source: format!("{}#versions", document.source),
        id_type: document.id_type,
    };

    let mut fields = document.fields.clone();
    if document.timestamps {
        for timestamp in ["updatedAt", "createdAt"] {
            if !fields.iter().any(|f| f.name() == Some(timestamp)) {
                fields.push(Field::Date(ScalarField {
                    attrs: FieldAttrs {
                        name: timestamp.to_string(),
                        index: true,
                        ..FieldAttrs::default()
                    },
                }));
            }
        }
    }

    let mut base_columns = vec![document.id_type.id_column()];
    let mut base_indexes = Vec::new();
    let mut base_foreign_keys = Vec::new();
    let mut base_relations = Vec::new();
    if link_parent {
        base_columns.push(Column::new(
            VERSION_PARENT_COLUMN,
            document.id_type.reference_type(),
            "#parent",
        ));
        base_indexes.push(IndexSpec::new(&naming, &name, &[VERSION_PARENT_COLUMN], false));
        base_foreign_keys.push(ForeignKeySpec::to_id(
            &naming,
            &name,
            VERSION_PARENT_COLUMN,
            &document.table,
            OnDelete::SetNull,
        ));
        base_relations.push(Relation::one(
            "parent",
            false,
            &name,
            &document.table,
            VERSION_PARENT_COLUMN,
        ));
    }
    if document.drafts {
        base_columns.push(Column::new(LATEST_COLUMN, ColumnType::Boolean, "#latest"));
        base_indexes.push(IndexSpec::new(&naming, &name, &[LATEST_COLUMN], false));
    }

    let mut walk = WalkOptions::root(root.clone());
    walk.column_prefix = vec![VERSION_PREFIX.to_string()];
    walk.path_prefix = vec![VERSION_PREFIX.to_string()];
    walk.disable_unique = true;
    walk.disable_not_null = document.drafts;

    let built = build_table(
        session,
        TableRequest {
            name,
            source: root.source.clone(),
            kind: TableKind::Versions,
            parent: None,
            id_type: document.id_type,
            base_columns,
            base_indexes,
            base_foreign_keys,
            base_relations,
            fields: &fields,
            walk,
            timestamps: true,
        },
    )?;
    finish_root(session, &root, built.flags)?;
    debug!("Compiled versions of '{}' into '{}'", document.slug, built.name);
    Ok(built)
}

/// Records the root's flags and builds its consolidated relationship table.
fn finish_root(
    session: &mut Session,
    root: &RootRef,
    flags: AggregateFlags,
) -> Result<(), SchemaError> {
    let scope = session.root_scope_mut(&root.table);
    scope.flags.merge(flags);
    let targets = scope.polymorphic_targets.clone();
    let localized = scope.localized_polymorphic;
    if targets.is_empty() {
        return Ok(());
    }
    build_relationships_table(session, root, &targets, localized)
}

/// Builds `<root>_rels` with one nullable foreign key column per target.
fn build_relationships_table(
    session: &mut Session,
    root: &RootRef,
    slugs: &BTreeSet<String>,
    localized: bool,
) -> Result<(), SchemaError> {
    let naming = session.naming.clone();
    let name = naming.relationships_table(&root.table);

    let mut columns = vec![
        IdType::Integer.id_column(),
        Column::new("order", ColumnType::Integer, "#order"),
        Column::new(RELS_PARENT_COLUMN, root.id_type.reference_type(), "#parent_id").not_null(),
        Column::new("path", ColumnType::Varchar, "#path").not_null(),
    ];
    let mut indexes = vec![
        IndexSpec::new(&naming, &name, &["order"], false),
        IndexSpec::new(&naming, &name, &[RELS_PARENT_COLUMN], false),
        IndexSpec::new(&naming, &name, &["path"], false),
    ];
    if localized {
        let mut locale = locale_column(session, "locale");
        locale.not_null = false;
        columns.push(locale);
        indexes.push(IndexSpec::new(&naming, &name, &["locale"], false));
    }
    let mut foreign_keys = vec![ForeignKeySpec::to_id(
        &naming,
        &name,
        RELS_PARENT_COLUMN,
        &root.table,
        OnDelete::Cascade,
    )];

    let mut relations = Vec::new();
    for slug in slugs {
        let target = session
            .target(slug)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownRelationTarget {
                field_path: name.clone(),
                target: slug.clone(),
            })?;
        let column = naming.derive(&[target.table.as_str(), "id"]);
        columns.push(Column::new(
            column.as_str(),
            target.id_type.reference_type(),
            format!("#{}", slug),
        ));
        indexes.push(IndexSpec::new(&naming, &name, &[column.as_str()], false));
        foreign_keys.push(ForeignKeySpec::to_id(
            &naming,
            &name,
            &column,
            &target.table,
            OnDelete::Cascade,
        ));
        relations.push(Relation::one(slug.as_str(), false, &name, &target.table, column));
    }

    let built = build_table(
        session,
        TableRequest {
            name,
            source: format!("{}#rels", root.source),
            kind: TableKind::Relationships,
            parent: Some(root.table.clone()),
            id_type: IdType::Integer,
            base_columns: columns,
            base_indexes: indexes,
            base_foreign_keys: foreign_keys,
            base_relations: relations,
            fields: &[],
            walk: WalkOptions::root(root.clone()),
            timestamps: false,
        },
    )?;
    session.relations.record(
        &root.table,
        Relation::many(RELS_RELATION, localized, &root.table, &built.name, RELS_PARENT_COLUMN),
    )?;
    debug!("Root '{}' links {} collections through '{}'", root.table, slugs.len(), built.name);
    Ok(())
}
