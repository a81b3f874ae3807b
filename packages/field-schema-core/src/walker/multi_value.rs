//! Multi-valued scalars: one ordered value table per field.
//!
//! Text, number, select and single-target relationship fields with
//! `has_many` store their values as rows of
//! `(id, order, parent_id, value[, locale])`.

use super::{
    key_index, localized_flags, register_select_enum, AggregateFlags, MultiValued, WalkContext,
};
use crate::error::SchemaError;
use crate::fields::{FieldAttrs, SelectField};
use crate::relation::Relation;
use crate::session::{Session, Target};
use crate::table::{
    build_table, locale_column, map_column, Column, ColumnModifiers, ColumnType, ForeignKeySpec,
    IdType, OnDelete, ScalarKind, TableDraft, TableKind, TableRequest,
};

const ORDER_COLUMN: &str = "order";
const PARENT_COLUMN: &str = "parent_id";
const VALUE_COLUMN: &str = "value";
const LOCALE_COLUMN: &str = "locale";

/// Value table for one multi-valued field.
struct ValueTable<'a> {
    attrs: &'a FieldAttrs,
    name: String,
    kind: ScalarKind,
    /// Collection the values reference, for relationships
    target: Option<&'a Target>,
}

pub(super) fn text(
    session: &mut Session,
    ctx: &WalkContext,
    draft: &mut TableDraft,
    attrs: &FieldAttrs,
) -> Result<AggregateFlags, SchemaError> {
    reject_unique(ctx, attrs, "text")?;
    let name = default_name(session, ctx, attrs);
    build_value_table(
        session,
        ctx,
        draft,
        ValueTable {
            attrs,
            name,
            kind: ScalarKind::Text,
            target: None,
        },
    )?;
    let mut flags = localized_flags(ctx, attrs);
    flags.has_many_text = MultiValued::of(attrs.index);
    Ok(flags)
}

pub(super) fn number(
    session: &mut Session,
    ctx: &WalkContext,
    draft: &mut TableDraft,
    attrs: &FieldAttrs,
) -> Result<AggregateFlags, SchemaError> {
    reject_unique(ctx, attrs, "number")?;
    let name = default_name(session, ctx, attrs);
    build_value_table(
        session,
        ctx,
        draft,
        ValueTable {
            attrs,
            name,
            kind: ScalarKind::Number,
            target: None,
        },
    )?;
    let mut flags = localized_flags(ctx, attrs);
    flags.has_many_number = MultiValued::of(attrs.index);
    Ok(flags)
}

/// Multi-valued select. A `unique` flag is ignored here.
pub(super) fn select(
    session: &mut Session,
    ctx: &WalkContext,
    draft: &mut TableDraft,
    field: &SelectField,
) -> Result<AggregateFlags, SchemaError> {
    let enum_name = register_select_enum(session, ctx, field)?;
    let name = match &field.db_name {
        Some(db_name) => session.naming.derive(&[db_name]),
        None => default_name(session, ctx, &field.attrs),
    };
    build_value_table(
        session,
        ctx,
        draft,
        ValueTable {
            attrs: &field.attrs,
            name,
            kind: ScalarKind::Enum(enum_name),
            target: None,
        },
    )?;
    Ok(localized_flags(ctx, &field.attrs))
}

/// Multi-valued relationship with a single target collection.
pub(super) fn relationship(
    session: &mut Session,
    ctx: &WalkContext,
    draft: &mut TableDraft,
    attrs: &FieldAttrs,
    target: &Target,
) -> Result<AggregateFlags, SchemaError> {
    let name = default_name(session, ctx, attrs);
    build_value_table(
        session,
        ctx,
        draft,
        ValueTable {
            attrs,
            name,
            kind: ScalarKind::Reference(target.id_type),
            target: Some(target),
        },
    )
}

fn default_name(session: &Session, ctx: &WalkContext, attrs: &FieldAttrs) -> String {
    session
        .naming
        .child_table(&ctx.table, &ctx.column_prefix, &attrs.name)
}

fn reject_unique(
    ctx: &WalkContext,
    attrs: &FieldAttrs,
    kind: &'static str,
) -> Result<(), SchemaError> {
    if attrs.unique {
        return Err(SchemaError::UniqueOnMultiValued {
            table: ctx.table.clone(),
            field_path: ctx.field_path(&attrs.name),
            kind,
        });
    }
    Ok(())
}

fn build_value_table(
    session: &mut Session,
    ctx: &WalkContext,
    draft: &mut TableDraft,
    spec: ValueTable<'_>,
) -> Result<AggregateFlags, SchemaError> {
    let attrs = spec.attrs;
    let name = spec.name;
    let localized = ctx.is_localized(attrs.localized);
    let field_path = ctx.field_path(&attrs.name);

    let value = map_column(
        &spec.kind,
        VALUE_COLUMN,
        &field_path,
        ColumnModifiers {
            default_value: None,
            not_null: true,
            timestamp_precision: session.config.timestamp_precision,
        },
    )?;
    let mut columns = vec![
        IdType::Integer.id_column(),
        Column::new(ORDER_COLUMN, ColumnType::Integer, "#order").not_null(),
        Column::new(PARENT_COLUMN, ctx.id_type.reference_type(), "#parent_id").not_null(),
        value,
    ];
    let mut indexes = vec![
        key_index(session, &name, ORDER_COLUMN),
        key_index(session, &name, PARENT_COLUMN),
    ];
    if localized {
        columns.push(locale_column(session, LOCALE_COLUMN));
        indexes.push(key_index(session, &name, LOCALE_COLUMN));
    }
    if attrs.index || spec.target.is_some() {
        indexes.push(key_index(session, &name, VALUE_COLUMN));
    }

    let mut foreign_keys = vec![ForeignKeySpec::to_id(
        &session.naming,
        &name,
        PARENT_COLUMN,
        &ctx.table,
        OnDelete::Cascade,
    )];
    let mut relations = Vec::new();
    if let Some(target) = spec.target {
        foreign_keys.push(ForeignKeySpec::to_id(
            &session.naming,
            &name,
            VALUE_COLUMN,
            &target.table,
            OnDelete::Cascade,
        ));
        relations.push(Relation::one(
            VALUE_COLUMN,
            false,
            &name,
            &target.table,
            VALUE_COLUMN,
        ));
    }

    let built = build_table(
        session,
        TableRequest {
            name,
            source: ctx.child_source(&attrs.name),
            kind: TableKind::MultiValue,
            parent: Some(ctx.table.clone()),
            id_type: IdType::Integer,
            base_columns: columns,
            base_indexes: indexes,
            base_foreign_keys: foreign_keys,
            base_relations: relations,
            fields: &[],
            walk: ctx.child_options(localized, attrs.conditional),
            timestamps: false,
        },
    )?;
    draft.add_relation(Relation::many(
        field_path,
        localized,
        &ctx.table,
        &built.name,
        PARENT_COLUMN,
    ));
    Ok(built.flags)
}
