//! End-to-end compilation of representative document types.

use ntest::timeout;
use serde_json::json;

use field_schema_core::config::CompilerConfig;
use field_schema_core::relation::Cardinality;
use field_schema_core::table::{ColumnType, DefaultValue, IdType, OnDelete, TableKind};
use field_schema_core::walker::MultiValued;

use super::helpers::{collection, column_type, compile, localized, table};

/// Localized title plus multi-valued tags
#[timeout(1000)]
#[test]
fn test_localized_title_and_tags() {
    let schema = compile(
        localized(),
        vec![collection(
            "posts",
            json!([
                {"type": "text", "name": "title", "localized": true},
                {"type": "text", "name": "tags", "hasMany": true}
            ]),
        )],
    )
    .unwrap();

    let posts = table(&schema, "posts");
    assert_eq!(posts.column_names(), vec!["id", "updated_at", "created_at"]);
    assert_eq!(posts.locale_sibling.as_deref(), Some("posts_locales"));

    let locales = table(&schema, "posts_locales");
    assert_eq!(
        locales.column_names(),
        vec!["id", "title", "_locale", "_parent_id"]
    );
    assert_eq!(
        column_type(&schema, "posts_locales", "_locale"),
        &ColumnType::Enum {
            name: "enum__locales".to_string()
        }
    );
    assert_eq!(schema.enums["enum__locales"].values, vec!["en", "de"]);

    let tags = table(&schema, "posts_tags");
    assert_eq!(tags.kind, TableKind::MultiValue);
    assert_eq!(
        tags.column_names(),
        vec!["id", "order", "parent_id", "value"]
    );
    assert!(tags.column("value").unwrap().not_null);
    assert_eq!(tags.foreign_keys["posts_tags_parent_id_fk"].foreign_table, "posts");
    assert!(!tags.indexes.contains_key("posts_tags_value_idx"));

    let flags = schema.roots["posts"];
    assert!(flags.has_localized_field);
    assert_eq!(flags.has_many_text, MultiValued::Present);
    assert_eq!(flags.has_many_number, MultiValued::Absent);

    let decls = schema.relations_of("posts");
    let tags_decl = decls.iter().find(|d| d.name == "tags").unwrap();
    assert_eq!(tags_decl.cardinality, Cardinality::Many);
    assert_eq!(tags_decl.target_table, "posts_tags");
    assert!(decls.iter().any(|d| d.name == "_locales"));

    let inverse = schema
        .relations_of("posts_tags")
        .iter()
        .find(|d| d.name == "parent_id")
        .unwrap();
    assert_eq!(inverse.cardinality, Cardinality::One);
    assert_eq!(inverse.target_table, "posts");
}

/// Named group flattens into prefixed columns
#[timeout(1000)]
#[test]
fn test_group_prefixes_columns() {
    let schema = compile(
        CompilerConfig::default(),
        vec![collection(
            "people",
            json!([
                {"type": "group", "name": "bio", "fields": [
                    {"type": "number", "name": "age", "required": true},
                    {"type": "group", "fields": [{"type": "text", "name": "nickName"}]}
                ]},
                {"type": "row", "fields": [{"type": "checkbox", "name": "active"}]}
            ]),
        )],
    )
    .unwrap();

    let people = table(&schema, "people");
    assert_eq!(
        people.column_names(),
        vec!["id", "bio_age", "bio_nick_name", "active", "updated_at", "created_at"]
    );
    let age = people.column("bio_age").unwrap();
    assert_eq!(age.column_type, ColumnType::Numeric);
    assert!(age.not_null);
    assert_eq!(age.source, "bio.age");
    assert_eq!(schema.tables.len(), 1);
}

/// Relationship inside an array references the target's id type
#[timeout(1000)]
#[test]
fn test_array_relationship_uses_target_id_type() {
    let mut users = collection("users", json!([{"type": "email", "name": "email"}]));
    users.id_type = Some(IdType::Uuid);
    let posts = collection(
        "posts",
        json!([
            {"type": "array", "name": "authors", "fields": [
                {"type": "relationship", "name": "user", "relationTo": "users", "required": true}
            ]}
        ]),
    );
    // Declared before its target on purpose
    let schema = compile(CompilerConfig::default(), vec![posts, users]).unwrap();

    let users = table(&schema, "users");
    let id = users.column("id").unwrap();
    assert_eq!(id.column_type, ColumnType::Uuid);
    assert_eq!(id.default, Some(DefaultValue::RandomUuid));

    let authors = table(&schema, "posts_authors");
    assert_eq!(authors.kind, TableKind::Array);
    assert_eq!(
        authors.column_names(),
        vec!["_order", "_parent_id", "id", "user_id"]
    );
    assert_eq!(column_type(&schema, "posts_authors", "_parent_id"), &ColumnType::Integer);
    assert_eq!(column_type(&schema, "posts_authors", "id"), &ColumnType::Varchar);
    assert_eq!(column_type(&schema, "posts_authors", "user_id"), &ColumnType::Uuid);

    let fk = &authors.foreign_keys["posts_authors_user_id_fk"];
    assert_eq!(fk.foreign_table, "users");
    assert_eq!(fk.on_delete, OnDelete::SetNull);
    assert!(authors.indexes.contains_key("posts_authors_user_id_idx"));
    assert_eq!(
        authors.foreign_keys["posts_authors__parent_id_fk"].on_delete,
        OnDelete::Cascade
    );

    let relation = schema
        .relations_of("posts_authors")
        .iter()
        .find(|d| d.name == "user")
        .unwrap();
    assert_eq!(relation.fields, vec!["user_id"]);
    assert_eq!(relation.target_table, "users");
}

#[timeout(1000)]
#[test]
fn test_polymorphic_relationship_builds_rels_table() {
    let schema = compile(
        CompilerConfig::default(),
        vec![
            collection("pages", json!([{"type": "text", "name": "title"}])),
            collection(
                "posts",
                json!([
                    {"type": "relationship", "name": "related", "relationTo": ["posts", "pages"]},
                    {"type": "upload", "name": "cover", "relationTo": "pages"}
                ]),
            ),
        ],
    )
    .unwrap();

    let posts = table(&schema, "posts");
    assert!(!posts.has_column("related"));
    assert!(posts.has_column("cover_id"));
    assert!(posts.root_links.contains("rels related [posts,pages]"));
    assert!(schema.roots["posts"].has_polymorphic_relationship);

    let rels = table(&schema, "posts_rels");
    assert_eq!(rels.kind, TableKind::Relationships);
    assert_eq!(
        rels.column_names(),
        vec!["id", "order", "parent_id", "path", "pages_id", "posts_id"]
    );
    assert_eq!(rels.foreign_keys["posts_rels_pages_id_fk"].on_delete, OnDelete::Cascade);
    assert!(schema
        .relations_of("posts")
        .iter()
        .any(|d| d.name == "_rels" && d.target_table == "posts_rels"));
    assert!(schema.table("pages_rels").is_none());
}

#[timeout(1000)]
#[test]
fn test_blocks_hang_off_root() {
    let schema = compile(
        localized(),
        vec![collection(
            "pages",
            json!([
                {"type": "array", "name": "sections", "fields": [
                    {"type": "blocks", "name": "content", "localized": true, "blocks": [
                        {"slug": "hero", "fields": [
                            {"type": "text", "name": "heading"},
                            {"type": "select", "name": "tone", "options": ["calm", "loud"]}
                        ]}
                    ]}
                ]}
            ]),
        )],
    )
    .unwrap();

    let hero = table(&schema, "pages_blocks_hero");
    assert_eq!(hero.kind, TableKind::Block);
    assert_eq!(hero.parent.as_deref(), Some("pages"));
    assert_eq!(
        hero.column_names(),
        vec!["_order", "_parent_id", "_locale", "_path", "id", "block_name", "heading", "tone"]
    );
    assert_eq!(hero.foreign_keys["pages_blocks_hero__parent_id_fk"].foreign_table, "pages");
    assert!(hero.locale_sibling.is_none());
    assert_eq!(
        schema.enums["enum_pages_blocks_hero_tone"].values,
        vec!["calm", "loud"]
    );

    let sections = table(&schema, "pages_sections");
    assert!(sections.root_links.contains("block:pages_blocks_hero"));
    assert!(schema
        .relations_of("pages")
        .iter()
        .any(|d| d.name == "_blocks_hero" && d.localized));
}

#[timeout(1000)]
#[test]
fn test_select_and_unique_indexes() {
    let schema = compile(
        localized(),
        vec![collection(
            "products",
            json!([
                {"type": "text", "name": "sku", "unique": true},
                {"type": "text", "name": "slug", "unique": true, "localized": true},
                {"type": "select", "name": "size", "options": [
                    {"label": "Small", "value": "s"},
                    {"label": "Large", "value": "l"}
                ], "defaultValue": "s", "index": true},
                {"type": "select", "name": "colors", "hasMany": true, "options": ["red"]},
                {"type": "radio", "name": "finish", "enumName": "finishes", "options": ["matte"]},
                {"type": "ui", "name": "preview"},
                {"type": "text", "name": "id"}
            ]),
        )],
    )
    .unwrap();

    let products = table(&schema, "products");
    assert!(products.indexes["products_sku_idx"].unique);
    assert_eq!(
        products.column("size").unwrap().default,
        Some(DefaultValue::Text("s".to_string()))
    );
    assert!(!products.has_column("colors"));
    assert!(!products.has_column("preview"));
    assert_eq!(products.column("id").unwrap().column_type, ColumnType::Serial);
    assert_eq!(
        column_type(&schema, "products", "finish"),
        &ColumnType::Enum {
            name: "finishes".to_string()
        }
    );

    let locales = table(&schema, "products_locales");
    let slug_index = &locales.indexes["products_locales_slug__locale_idx"];
    assert!(slug_index.unique);
    assert_eq!(slug_index.columns, vec!["slug", "_locale"]);

    assert_eq!(schema.enums["enum_products_size"].values, vec!["s", "l"]);
    assert_eq!(
        column_type(&schema, "products_colors", "value"),
        &ColumnType::Enum {
            name: "enum_products_colors".to_string()
        }
    );
}

#[timeout(1000)]
#[test]
fn test_multi_valued_relationship_table() {
    let schema = compile(
        CompilerConfig::default(),
        vec![
            collection("tags", json!([{"type": "text", "name": "label"}])),
            collection(
                "posts",
                json!([
                    {"type": "relationship", "name": "tags", "relationTo": "tags", "hasMany": true},
                    {"type": "number", "name": "scores", "hasMany": true, "index": true}
                ]),
            ),
        ],
    )
    .unwrap();

    let values = table(&schema, "posts_tags");
    assert_eq!(column_type(&schema, "posts_tags", "value"), &ColumnType::Integer);
    assert_eq!(values.foreign_keys["posts_tags_value_fk"].foreign_table, "tags");
    assert!(values.indexes.contains_key("posts_tags_value_idx"));
    assert!(table(&schema, "posts_scores")
        .indexes
        .contains_key("posts_scores_value_idx"));
    assert_eq!(schema.roots["posts"].has_many_number, MultiValued::Indexed);
    assert!(schema
        .relations_of("posts_tags")
        .iter()
        .any(|d| d.name == "value" && d.target_table == "tags"));
}

#[timeout(1000)]
#[test]
fn test_display_conditions_relax_not_null() {
    let schema = compile(
        CompilerConfig::default(),
        vec![collection(
            "forms",
            json!([
                {"type": "text", "name": "email", "required": true},
                {"type": "text", "name": "phone", "required": true, "conditional": true},
                {"type": "group", "name": "address", "conditional": true, "fields": [
                    {"type": "text", "name": "city", "required": true}
                ]},
                {"type": "row", "conditional": true, "fields": [
                    {"type": "number", "name": "zip", "required": true}
                ]},
                {"type": "collapsible", "fields": [
                    {"type": "number", "name": "age", "required": true}
                ]},
                {"type": "tabs", "tabs": [
                    {"name": "extra", "conditional": true, "fields": [
                        {"type": "checkbox", "name": "agree", "required": true}
                    ]}
                ]},
                {"type": "array", "name": "guests", "conditional": true, "fields": [
                    {"type": "text", "name": "name", "required": true}
                ]},
                {"type": "array", "name": "hosts", "fields": [
                    {"type": "text", "name": "name", "required": true}
                ]}
            ]),
        )],
    )
    .unwrap();

    let forms = table(&schema, "forms");
    let not_null = |name: &str| forms.column(name).unwrap().not_null;
    assert!(not_null("email"));
    assert!(not_null("age"));
    assert!(!not_null("phone"));
    assert!(!not_null("address_city"));
    assert!(!not_null("zip"));
    assert!(!not_null("extra_agree"));

    let guests = table(&schema, "forms_guests");
    assert!(!guests.column("name").unwrap().not_null);
    assert!(guests.column("_parent_id").unwrap().not_null);
    assert!(table(&schema, "forms_hosts").column("name").unwrap().not_null);
}

#[timeout(1000)]
#[test]
fn test_rels_locale_follows_polymorphic_relationships() {
    let schema = compile(
        localized(),
        vec![
            collection("pages", json!([{"type": "text", "name": "title"}])),
            collection(
                "posts",
                json!([
                    {"type": "relationship", "name": "author", "relationTo": "pages", "localized": true},
                    {"type": "relationship", "name": "related", "relationTo": ["posts", "pages"]}
                ]),
            ),
            collection(
                "events",
                json!([
                    {"type": "relationship", "name": "links", "relationTo": ["posts", "pages"], "localized": true}
                ]),
            ),
        ],
    )
    .unwrap();

    // Only the single-target link is localized here
    assert!(schema.roots["posts"].has_localized_relationship);
    assert!(table(&schema, "posts_locales").has_column("author_id"));
    assert!(!table(&schema, "posts_rels").has_column("locale"));

    let events = table(&schema, "events_rels");
    let locale = events.column("locale").unwrap();
    assert!(!locale.not_null);
    assert_eq!(
        locale.column_type,
        ColumnType::Enum {
            name: "enum__locales".to_string()
        }
    );
    assert!(events.indexes.contains_key("events_rels_locale_idx"));
}
