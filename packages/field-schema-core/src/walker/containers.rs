//! Arrays and blocks: ordered child tables.

use std::collections::BTreeMap;

use tracing::debug;

use super::{key_index, localized_flags, AggregateFlags, RootRef, WalkContext, WalkOptions};
use crate::error::SchemaError;
use crate::fields::{ArrayField, Block, BlocksField};
use crate::relation::Relation;
use crate::session::Session;
use crate::table::{
    build_table, locale_column, Column, ColumnType, ForeignKeySpec, IdType, IndexSpec, OnDelete,
    TableDraft, TableKind, TableRequest, LOCALE_COLUMN, PARENT_COLUMN,
};

/// Position of a row within its parent's list.
const ORDER_COLUMN: &str = "_order";
/// Field path a block row belongs to, for blocks shared across fields.
const PATH_COLUMN: &str = "_path";
/// Optional editor label of a block row.
const BLOCK_NAME_COLUMN: &str = "block_name";

/// Columns every ordered child row carries, keyed to `parent_table`.
fn ordered_base(
    session: &Session,
    table: &str,
    parent_table: &str,
    parent_id_type: IdType,
    localized: bool,
) -> (Vec<Column>, Vec<IndexSpec>, Vec<ForeignKeySpec>) {
    let naming = &session.naming;
    let mut columns = vec![
        Column::new(ORDER_COLUMN, ColumnType::Integer, "#_order").not_null(),
        Column::new(PARENT_COLUMN, parent_id_type.reference_type(), "#_parent_id").not_null(),
    ];
    let mut indexes = vec![
        key_index(session, table, ORDER_COLUMN),
        key_index(session, table, PARENT_COLUMN),
    ];
    if localized {
        columns.push(locale_column(session, LOCALE_COLUMN));
        indexes.push(key_index(session, table, LOCALE_COLUMN));
    }
    let foreign_keys = vec![ForeignKeySpec::to_id(
        naming,
        table,
        PARENT_COLUMN,
        parent_table,
        OnDelete::Cascade,
    )];
    (columns, indexes, foreign_keys)
}

/// Array field: child table `<table>_<prefix>_<name>` with one row per item.
pub(super) fn array(
    session: &mut Session,
    ctx: &WalkContext,
    draft: &mut TableDraft,
    array: &ArrayField,
) -> Result<AggregateFlags, SchemaError> {
    let attrs = &array.attrs;
    let name = match &array.db_name {
        Some(db_name) => session.naming.derive(&[db_name]),
        None => session
            .naming
            .child_table(&ctx.table, &ctx.column_prefix, &attrs.name),
    };
    let localized = ctx.is_localized(attrs.localized);

    let (mut base_columns, base_indexes, base_foreign_keys) =
        ordered_base(session, &name, &ctx.table, ctx.id_type, localized);
    base_columns.push(IdType::Varchar.id_column());

    let built = build_table(
        session,
        TableRequest {
            name,
            source: ctx.child_source(&attrs.name),
            kind: TableKind::Array,
            parent: Some(ctx.table.clone()),
            id_type: IdType::Varchar,
            base_columns,
            base_indexes,
            base_foreign_keys,
            base_relations: Vec::new(),
            fields: &array.fields,
            walk: ctx.child_options(localized, attrs.conditional),
            timestamps: false,
        },
    )?;
    draft.add_relation(Relation::many(
        ctx.field_path(&attrs.name),
        localized,
        &ctx.table,
        &built.name,
        PARENT_COLUMN,
    ));

    let mut flags = localized_flags(ctx, attrs);
    flags.merge(built.flags);
    Ok(flags)
}

/// Blocks field: one shared table per block slug under the root table.
///
/// The first declaration of a slug builds the table. Later declarations
/// reuse it once their declared shape matches the first one; the position
/// of a use (display conditions, enclosing localization) does not count.
pub(super) fn blocks(
    session: &mut Session,
    ctx: &WalkContext,
    draft: &mut TableDraft,
    blocks: &BlocksField,
) -> Result<AggregateFlags, SchemaError> {
    let attrs = &blocks.attrs;
    let localized = ctx.is_localized(attrs.localized);
    let root = ctx.root.clone();
    let mut flags = localized_flags(ctx, attrs);

    for block in &blocks.blocks {
        let walk = ctx.child_options(localized, attrs.conditional);
        let request = block_request(session, &root, block, localized, walk);
        let table = request.name.clone();
        if let Some(first) = session.block_shapes.get(&table) {
            if first != block && session.is_built(&table) {
                verify_block(session, &root, first, block)?;
            }
        } else {
            session.block_shapes.insert(table.clone(), block.clone());
        }
        let built = build_table(session, request)?;
        if built.reused {
            debug!("Block '{}' shares table '{}'", block.slug, table);
        }
        flags.merge(built.flags);

        draft.root_links.insert(format!("block:{}", table));
        session.relations.record(
            &root.table,
            Relation::many(
                format!("_blocks_{}", block.slug),
                localized,
                &root.table,
                &table,
                PARENT_COLUMN,
            ),
        )?;
    }
    Ok(flags)
}

fn block_request<'a>(
    session: &Session,
    root: &RootRef,
    block: &'a Block,
    localized: bool,
    walk: WalkOptions,
) -> TableRequest<'a> {
    let name = match &block.db_name {
        Some(db_name) => session.naming.derive(&[db_name]),
        None => session.naming.block_table(&root.table, &block.slug),
    };

    let (mut base_columns, mut base_indexes, base_foreign_keys) =
        ordered_base(session, &name, &root.table, root.id_type, localized);
    base_columns.push(Column::new(PATH_COLUMN, ColumnType::Text, "#_path").not_null());
    base_indexes.push(key_index(session, &name, PATH_COLUMN));
    base_columns.push(IdType::Varchar.id_column());
    base_columns.push(Column::new(
        BLOCK_NAME_COLUMN,
        ColumnType::Varchar,
        "#block_name",
    ));

    TableRequest {
        source: format!("{}#blocks.{}", root.source, block.slug),
        name,
        kind: TableKind::Block,
        parent: Some(root.table.clone()),
        id_type: IdType::Varchar,
        base_columns,
        base_indexes,
        base_foreign_keys,
        base_relations: Vec::new(),
        fields: &block.fields,
        walk,
        timestamps: false,
    }
}

/// Fingerprints of every table a block declaration produces when built
/// directly under the root, outside any condition or localized container.
fn declared_shape(
    session: &Session,
    root: &RootRef,
    block: &Block,
) -> Result<BTreeMap<String, String>, SchemaError> {
    let mut probe = session.probe();
    let request = block_request(&probe, root, block, false, WalkOptions::root(root.clone()));
    build_table(&mut probe, request)?;
    Ok(probe
        .tables
        .into_iter()
        .map(|(name, table)| (name, table.fingerprint))
        .collect())
}

/// Compares a later declaration of a block with the first one.
fn verify_block(
    session: &Session,
    root: &RootRef,
    first: &Block,
    block: &Block,
) -> Result<(), SchemaError> {
    let existing = declared_shape(session, root, first)?;
    let candidate = declared_shape(session, root, block)?;
    let mismatch = |table: &str, differs_at: String| SchemaError::BlockShapeMismatch {
        slug: block.slug.clone(),
        table: table.to_string(),
        differs_at,
    };

    for (name, fingerprint) in &candidate {
        match existing.get(name) {
            None => {
                let reason = "table missing from first declaration".to_string();
                return Err(mismatch(name.as_str(), reason));
            }
            Some(expected) if expected != fingerprint => {
                return Err(mismatch(name.as_str(), first_difference(expected, fingerprint)));
            }
            Some(_) => {}
        }
    }
    if let Some(name) = existing.keys().find(|name| !candidate.contains_key(*name)) {
        let reason = "table missing from later declaration".to_string();
        return Err(mismatch(name.as_str(), reason));
    }
    Ok(())
}

/// First fingerprint line present in one shape but not the other.
fn first_difference(existing: &str, candidate: &str) -> String {
    let existing_lines: Vec<&str> = existing.lines().collect();
    let candidate_lines: Vec<&str> = candidate.lines().collect();
    if let Some(line) = candidate_lines.iter().find(|l| !existing_lines.contains(l)) {
        return format!("+ {}", line);
    }
    if let Some(line) = existing_lines.iter().find(|l| !candidate_lines.contains(l)) {
        return format!("- {}", line);
    }
    String::new()
}
