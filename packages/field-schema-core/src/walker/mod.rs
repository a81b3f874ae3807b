//! Field tree walker.
//!
//! Walks a field list in declaration order and dispatches per field kind:
//! - scalars, single selects and single-target relationships become columns
//!   on the current table or its locale side-table
//! - multi-valued fields, arrays and blocks become child tables built through
//!   [`build_table`](crate::table::build_table)
//! - groups, tabs, rows and collapsibles flatten into the current table
//!
//! The session is threaded through every frame by mutable reference.

mod containers;
mod context;
mod flags;
mod multi_value;

pub use context::{RootRef, WalkContext, WalkOptions};
pub use flags::{AggregateFlags, MultiValued};

use tracing::debug;

use crate::error::SchemaError;
use crate::fields::{Field, FieldAttrs, RelationshipField, SelectField};
use crate::relation::Relation;
use crate::session::{Session, Target};
use crate::table::{
    field_index, map_column, ColumnModifiers, ForeignKeySpec, IndexSpec, OnDelete, Placement,
    ScalarKind, TableDraft,
};

/// Field name reserved for the primary key of every table.
const RESERVED_ID: &str = "id";

/// Walks `fields` into `draft`, returning the subtree's aggregate flags.
pub fn walk(
    session: &mut Session,
    ctx: &WalkContext,
    draft: &mut TableDraft,
    fields: &[Field],
) -> Result<AggregateFlags, SchemaError> {
    let mut flags = AggregateFlags::default();
    for field in fields {
        if field.name() == Some(RESERVED_ID) {
            debug!(
                "Skipping reserved {} field 'id' on table '{}'",
                field.kind(),
                ctx.table
            );
            continue;
        }
        match field {
            Field::Text(f) | Field::Textarea(f) | Field::Email(f) | Field::Code(f) => {
                if f.has_many {
                    flags.merge(multi_value::text(session, ctx, draft, &f.attrs)?);
                } else {
                    flags.merge(scalar(session, ctx, draft, &f.attrs, ScalarKind::Text)?);
                }
            }
            Field::Number(f) => {
                if f.has_many {
                    flags.merge(multi_value::number(session, ctx, draft, &f.attrs)?);
                } else {
                    flags.merge(scalar(session, ctx, draft, &f.attrs, ScalarKind::Number)?);
                }
            }
            Field::Date(f) => {
                flags.merge(scalar(session, ctx, draft, &f.attrs, ScalarKind::Date)?);
            }
            Field::Checkbox(f) => {
                flags.merge(scalar(session, ctx, draft, &f.attrs, ScalarKind::Checkbox)?);
            }
            Field::RichText(f) => {
                flags.merge(scalar(session, ctx, draft, &f.attrs, ScalarKind::RichText)?);
            }
            Field::Json(f) => {
                flags.merge(scalar(session, ctx, draft, &f.attrs, ScalarKind::Json)?);
            }
            Field::Point(f) => {
                flags.merge(scalar(session, ctx, draft, &f.attrs, ScalarKind::Point)?);
            }
            Field::Select(f) | Field::Radio(f) => {
                if f.has_many {
                    flags.merge(multi_value::select(session, ctx, draft, f)?);
                } else {
                    flags.merge(select(session, ctx, draft, f)?);
                }
            }
            Field::Relationship(f) | Field::Upload(f) => {
                flags.merge(relationship(session, ctx, draft, f)?);
            }
            Field::Group(group) => {
                let frame = match &group.name {
                    Some(name) => ctx.nested(name, group.localized, group.conditional),
                    None => ctx.in_place(group.localized, group.conditional),
                };
                flags.merge(walk(session, &frame, draft, &group.fields)?);
            }
            Field::Tabs(tabs) => {
                for tab in &tabs.tabs {
                    let conditional = tabs.conditional || tab.conditional;
                    let frame = match &tab.name {
                        Some(name) => ctx.nested(name, tab.localized, conditional),
                        None => ctx.in_place(tab.localized, conditional),
                    };
                    flags.merge(walk(session, &frame, draft, &tab.fields)?);
                }
            }
            Field::Row(layout) | Field::Collapsible(layout) => {
                let frame = ctx.in_place(false, layout.conditional);
                flags.merge(walk(session, &frame, draft, &layout.fields)?);
            }
            Field::Array(array) => {
                flags.merge(containers::array(session, ctx, draft, array)?);
            }
            Field::Blocks(blocks) => {
                flags.merge(containers::blocks(session, ctx, draft, blocks)?);
            }
            Field::Ui(_) => {}
        }
    }
    Ok(flags)
}

/// Placement of a field's column and whether it is stored per locale.
fn placement(ctx: &WalkContext, attrs: &FieldAttrs) -> Placement {
    if ctx.routes_to_locales(attrs.localized) {
        Placement::Locales
    } else {
        Placement::Main
    }
}

fn localized_flags(ctx: &WalkContext, attrs: &FieldAttrs) -> AggregateFlags {
    AggregateFlags {
        has_localized_field: ctx.localization && (attrs.localized || ctx.force_localized),
        ..Default::default()
    }
}

/// Emits one column for a single-column field, plus its index.
fn scalar(
    session: &mut Session,
    ctx: &WalkContext,
    draft: &mut TableDraft,
    attrs: &FieldAttrs,
    kind: ScalarKind,
) -> Result<AggregateFlags, SchemaError> {
    let column_name = session.naming.column(&ctx.column_prefix, &attrs.name);
    add_column(session, ctx, draft, attrs, kind, &column_name, false)?;
    Ok(localized_flags(ctx, attrs))
}

/// Maps the column, routes it, and builds its index.
///
/// Foreign key columns are always indexed.
fn add_column(
    session: &Session,
    ctx: &WalkContext,
    draft: &mut TableDraft,
    attrs: &FieldAttrs,
    kind: ScalarKind,
    column_name: &str,
    always_index: bool,
) -> Result<Placement, SchemaError> {
    let placement = placement(ctx, attrs);
    let column = map_column(
        &kind,
        column_name,
        &ctx.field_path(&attrs.name),
        ColumnModifiers {
            default_value: attrs.default_value.as_ref(),
            not_null: attrs.required && !attrs.conditional && !ctx.disable_not_null,
            timestamp_precision: session.config.timestamp_precision,
        },
    )?;
    draft.add_column(placement, column)?;

    let per_locale = ctx.is_localized(attrs.localized);
    let table = draft.table_name(placement).to_string();
    if let Some(index) = field_index(
        &session.naming,
        &table,
        column_name,
        attrs.unique,
        attrs.index || always_index,
        per_locale,
        ctx.disable_unique,
    ) {
        draft.add_index(placement, index);
    }
    Ok(placement)
}

/// Single select or radio: enum column.
fn select(
    session: &mut Session,
    ctx: &WalkContext,
    draft: &mut TableDraft,
    field: &SelectField,
) -> Result<AggregateFlags, SchemaError> {
    let enum_name = register_select_enum(session, ctx, field)?;
    scalar(session, ctx, draft, &field.attrs, ScalarKind::Enum(enum_name))
}

/// Registers the enum of a select field, named from its full path.
fn register_select_enum(
    session: &mut Session,
    ctx: &WalkContext,
    field: &SelectField,
) -> Result<String, SchemaError> {
    let name = match &field.enum_name {
        Some(name) => session.naming.derive(&[name]),
        None => session
            .naming
            .enum_type(&ctx.table, &ctx.column_prefix, &field.attrs.name),
    };
    let source = ctx.child_source(&field.attrs.name);
    session.register_enum(&name, field.values(), &source)?;
    Ok(name)
}

/// Resolves every target collection of a relationship.
fn resolve_targets(
    session: &Session,
    ctx: &WalkContext,
    field: &RelationshipField,
) -> Result<Vec<Target>, SchemaError> {
    field
        .relation_to
        .slugs()
        .into_iter()
        .map(|slug| {
            session
                .target(slug)
                .cloned()
                .ok_or_else(|| SchemaError::UnknownRelationTarget {
                    field_path: ctx.field_path(&field.attrs.name),
                    target: slug.to_string(),
                })
        })
        .collect()
}

/// Relationship or upload.
///
/// - polymorphic: recorded at the root, stored in the consolidated `_rels` table
/// - multi-valued: ordered value table holding foreign keys
/// - otherwise: foreign key column `<name>_id`
fn relationship(
    session: &mut Session,
    ctx: &WalkContext,
    draft: &mut TableDraft,
    field: &RelationshipField,
) -> Result<AggregateFlags, SchemaError> {
    let attrs = &field.attrs;
    let targets = resolve_targets(session, ctx, field)?;
    let mut flags = localized_flags(ctx, attrs);
    flags.has_localized_relationship = ctx.is_localized(attrs.localized);

    if field.relation_to.is_polymorphic() {
        let field_path = ctx.field_path(&attrs.name);
        let slugs: Vec<String> = targets.iter().map(|t| t.slug.clone()).collect();
        let scope = session.root_scope_mut(&ctx.root.table);
        scope.polymorphic_targets.extend(slugs.iter().cloned());
        scope.localized_polymorphic |= flags.has_localized_relationship;
        draft
            .root_links
            .insert(format!("rels {} [{}]", field_path, slugs.join(",")));
        flags.has_polymorphic_relationship = true;
        return Ok(flags);
    }

    let target = targets
        .first()
        .ok_or_else(|| SchemaError::UnknownRelationTarget {
            field_path: ctx.field_path(&attrs.name),
            target: String::new(),
        })?;
    if field.has_many {
        flags.merge(multi_value::relationship(session, ctx, draft, attrs, target)?);
        return Ok(flags);
    }

    let base = session.naming.column(&ctx.column_prefix, &attrs.name);
    let column_name = session.naming.derive(&[base.as_str(), "id"]);
    let placement = add_column(
        session,
        ctx,
        draft,
        attrs,
        ScalarKind::Reference(target.id_type),
        &column_name,
        true,
    )?;
    let table = draft.table_name(placement).to_string();
    draft.add_foreign_key(
        placement,
        ForeignKeySpec::to_id(
            &session.naming,
            &table,
            &column_name,
            &target.table,
            OnDelete::SetNull,
        ),
    );
    draft.add_relation(Relation::one(
        ctx.field_path(&attrs.name),
        placement == Placement::Locales,
        table,
        &target.table,
        column_name,
    ));
    Ok(flags)
}

/// Index on a child table's key column.
fn key_index(session: &Session, table: &str, column: &str) -> IndexSpec {
    IndexSpec::new(&session.naming, table, &[column], false)
}
