//! Whole-schema properties: determinism, name uniqueness, localization
//! routing, multi-valued exclusivity, block sharing and idempotency.

use std::collections::HashSet;
use std::thread;

use ntest::timeout;
use serde_json::json;

use field_schema_core::config::CompilerConfig;
use field_schema_core::fields::CollectionConfig;
use field_schema_core::schema::CompiledSchema;
use field_schema_core::{compile_collection, Session, SchemaError, SharedSession};

use super::helpers::{collection, compile, localized, table};

fn blog() -> Vec<CollectionConfig> {
    vec![
        collection("authors", json!([{"type": "text", "name": "name", "required": true}])),
        collection(
            "posts",
            json!([
                {"type": "text", "name": "title", "localized": true, "unique": true},
                {"type": "relationship", "name": "author", "relationTo": "authors"},
                {"type": "tabs", "tabs": [
                    {"name": "meta", "fields": [
                        {"type": "text", "name": "keywords", "hasMany": true, "localized": true},
                        {"type": "select", "name": "robots", "options": ["index", "noindex"]}
                    ]},
                    {"fields": [{"type": "json", "name": "extra"}]}
                ]},
                {"type": "array", "name": "links", "fields": [
                    {"type": "text", "name": "url", "required": true},
                    {"type": "relationship", "name": "target", "relationTo": ["posts", "authors"]}
                ]},
                {"type": "blocks", "name": "layout", "blocks": [
                    {"slug": "quote", "fields": [{"type": "textarea", "name": "body"}]}
                ]}
            ]),
        ),
    ]
}

fn all_identifiers(schema: &CompiledSchema) -> Vec<String> {
    let mut names: Vec<String> = schema.tables.keys().cloned().collect();
    names.extend(schema.enums.keys().cloned());
    for table in schema.tables.values() {
        names.extend(table.indexes.keys().cloned());
        names.extend(table.foreign_keys.keys().cloned());
    }
    names
}

#[timeout(2000)]
#[test]
fn test_compilation_is_deterministic() {
    let first = compile(localized(), blog()).unwrap();
    let second = compile(localized(), blog()).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    for (name, spec) in &first.tables {
        assert_eq!(spec.fingerprint, second.tables[name].fingerprint);
    }
}

#[timeout(2000)]
#[test]
fn test_identifiers_are_unique() {
    let schema = compile(localized(), blog()).unwrap();
    let names = all_identifiers(&schema);
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), names.len());
}

#[timeout(2000)]
#[test]
fn test_identifiers_respect_limit() {
    let compiler = CompilerConfig {
        max_identifier_length: 24,
        ..localized()
    };
    let schema = compile(
        compiler,
        vec![collection(
            "editorialArticles",
            json!([
                {"type": "array", "name": "relatedReadingSuggestions", "fields": [
                    {"type": "select", "name": "presentationStyle", "options": ["card"], "index": true},
                    {"type": "text", "name": "overrideHeadline", "localized": true, "unique": true}
                ]}
            ]),
        )],
    )
    .unwrap();

    let names = all_identifiers(&schema);
    assert!(names.iter().all(|n| n.len() <= 24), "{:?}", names);
    for table in schema.tables.values() {
        assert!(table.columns.keys().all(|c| c.len() <= 24));
    }
    let unique: HashSet<&String> = names.iter().collect();
    assert_eq!(unique.len(), names.len());
}

#[timeout(1000)]
#[test]
fn test_ambiguous_table_names_are_rejected() {
    let err = compile(
        CompilerConfig::default(),
        vec![
            collection("blogPosts", json!([])),
            collection("blog_posts", json!([])),
        ],
    )
    .unwrap_err();
    assert_eq!(
        err,
        SchemaError::NameCollision {
            kind: "Table",
            name: "blog_posts".to_string(),
            existing: "blogPosts".to_string(),
            incoming: "blog_posts".to_string(),
        }
    );
}

#[timeout(1000)]
#[test]
fn test_array_name_clashing_with_collection_is_rejected() {
    let err = compile(
        CompilerConfig::default(),
        vec![
            collection("posts_items", json!([])),
            collection(
                "posts",
                json!([{"type": "array", "name": "items", "fields": []}]),
            ),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, SchemaError::NameCollision { kind: "Table", .. }));
}

#[timeout(2000)]
#[test]
fn test_localization_routing_follows_capability() {
    let with = compile(localized(), blog()).unwrap();
    let without = compile(CompilerConfig::default(), blog()).unwrap();

    assert!(table(&with, "posts_locales").has_column("title"));
    assert!(!table(&with, "posts").has_column("title"));
    assert!(table(&with, "posts_meta_keywords").has_column("locale"));

    assert!(table(&without, "posts").has_column("title"));
    assert!(!table(&without, "posts_meta_keywords").has_column("locale"));
    assert!(without.tables.keys().all(|t| !t.ends_with("_locales")));
    assert!(without.enums.keys().all(|e| e != "enum__locales"));
    assert!(!without.roots["posts"].has_localized_field);
    assert!(with.roots["posts"].has_localized_field);
}

#[timeout(1000)]
#[test]
fn test_localized_group_forces_children() {
    let schema = compile(
        localized(),
        vec![collection(
            "pages",
            json!([
                {"type": "group", "name": "seo", "localized": true, "fields": [
                    {"type": "text", "name": "title"},
                    {"type": "array", "name": "tags", "fields": [{"type": "text", "name": "tag"}]}
                ]}
            ]),
        )],
    )
    .unwrap();

    assert!(table(&schema, "pages_locales").has_column("seo_title"));
    let tags = table(&schema, "pages_seo_tags");
    assert!(tags.has_column("_locale"));
    assert!(tags.has_column("tag"));
    assert!(tags.locale_sibling.is_none());
}

#[timeout(1000)]
#[test]
fn test_multi_valued_fields_have_no_owner_column() {
    let schema = compile(
        CompilerConfig::default(),
        vec![collection(
            "posts",
            json!([
                {"type": "text", "name": "tags", "hasMany": true},
                {"type": "number", "name": "scores", "hasMany": true},
                {"type": "select", "name": "labels", "hasMany": true, "unique": true, "options": ["a"]}
            ]),
        )],
    )
    .unwrap();
    let posts = table(&schema, "posts");
    for name in ["tags", "scores", "labels"] {
        assert!(!posts.has_column(name));
        assert!(table(&schema, &format!("posts_{}", name)).has_column("value"));
    }
}

#[timeout(1000)]
#[test]
fn test_unique_multi_valued_text_is_rejected() {
    let err = compile(
        CompilerConfig::default(),
        vec![collection(
            "posts",
            json!([{"type": "group", "name": "meta", "fields": [
                {"type": "text", "name": "tags", "hasMany": true, "unique": true}
            ]}]),
        )],
    )
    .unwrap_err();
    assert_eq!(
        err,
        SchemaError::UniqueOnMultiValued {
            table: "posts".to_string(),
            field_path: "meta.tags".to_string(),
            kind: "text",
        }
    );
}

#[timeout(1000)]
#[test]
fn test_unknown_relation_target_is_rejected() {
    let err = compile(
        CompilerConfig::default(),
        vec![collection(
            "posts",
            json!([{"type": "relationship", "name": "owner", "relationTo": "users"}]),
        )],
    )
    .unwrap_err();
    assert_eq!(
        err,
        SchemaError::UnknownRelationTarget {
            field_path: "owner".to_string(),
            target: "users".to_string(),
        }
    );
}

#[timeout(1000)]
#[test]
fn test_invalid_default_is_rejected() {
    let err = compile(
        CompilerConfig::default(),
        vec![collection(
            "posts",
            json!([{"type": "number", "name": "rank", "defaultValue": "high"}]),
        )],
    )
    .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidDefault { expected: "number", .. }));
}

#[timeout(1000)]
#[test]
fn test_identical_blocks_share_one_table() {
    let hero = json!({"slug": "hero", "fields": [
        {"type": "text", "name": "heading"},
        {"type": "array", "name": "buttons", "fields": [{"type": "text", "name": "label"}]}
    ]});
    let schema = compile(
        CompilerConfig::default(),
        vec![collection(
            "pages",
            json!([
                {"type": "blocks", "name": "layout", "blocks": [hero.clone()]},
                {"type": "group", "name": "footer", "fields": [
                    {"type": "blocks", "name": "content", "blocks": [hero]}
                ]}
            ]),
        )],
    )
    .unwrap();

    let block_tables: Vec<&String> = schema
        .tables
        .keys()
        .filter(|t| t.starts_with("pages_blocks_"))
        .collect();
    assert_eq!(block_tables, vec!["pages_blocks_hero", "pages_blocks_hero_buttons"]);
    let hero_relations: Vec<_> = schema
        .relations_of("pages")
        .iter()
        .filter(|d| d.name == "_blocks_hero")
        .collect();
    assert_eq!(hero_relations.len(), 1);
}

#[timeout(1000)]
#[test]
fn test_block_shape_mismatch_is_rejected() {
    let err = compile(
        CompilerConfig::default(),
        vec![collection(
            "pages",
            json!([
                {"type": "blocks", "name": "layout", "blocks": [
                    {"slug": "hero", "fields": [{"type": "text", "name": "heading"}]}
                ]},
                {"type": "blocks", "name": "sidebar", "blocks": [
                    {"slug": "hero", "fields": [{"type": "number", "name": "heading"}]}
                ]}
            ]),
        )],
    )
    .unwrap_err();
    match err {
        SchemaError::BlockShapeMismatch {
            slug,
            table,
            differs_at,
        } => {
            assert_eq!(slug, "hero");
            assert_eq!(table, "pages_blocks_hero");
            assert!(differs_at.contains("heading numeric"), "{}", differs_at);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

/// Block tables reachable from the `pages` root.
fn block_tables(schema: &CompiledSchema) -> Vec<&str> {
    schema
        .tables
        .keys()
        .map(String::as_str)
        .filter(|t| t.starts_with("pages_blocks_"))
        .collect()
}

#[timeout(1000)]
#[test]
fn test_block_shared_under_conditional_container() {
    let schema = compile(
        CompilerConfig::default(),
        vec![collection(
            "pages",
            json!([
                {"type": "blocks", "name": "layout", "blocks": [
                    {"slug": "hero", "fields": [
                        {"type": "text", "name": "heading", "required": true},
                        {"type": "text", "name": "subheading"}
                    ]}
                ]},
                {"type": "collapsible", "conditional": true, "fields": [
                    {"type": "blocks", "name": "aside", "blocks": [
                        {"slug": "hero", "fields": [
                            {"type": "text", "name": "subheading"},
                            {"type": "text", "name": "heading", "required": true}
                        ]}
                    ]}
                ]}
            ]),
        )],
    )
    .unwrap();

    assert_eq!(block_tables(&schema), vec!["pages_blocks_hero"]);
    // The first declaration decides the physical shape
    assert!(table(&schema, "pages_blocks_hero").column("heading").unwrap().not_null);
}

#[timeout(1000)]
#[test]
fn test_block_shared_under_localized_array() {
    let schema = compile(
        localized(),
        vec![collection(
            "pages",
            json!([
                {"type": "blocks", "name": "layout", "blocks": [
                    {"slug": "hero", "fields": [
                        {"type": "text", "name": "heading"},
                        {"type": "checkbox", "name": "dark"}
                    ]}
                ]},
                {"type": "array", "name": "sections", "localized": true, "fields": [
                    {"type": "blocks", "name": "content", "blocks": [
                        {"slug": "hero", "fields": [
                            {"type": "checkbox", "name": "dark"},
                            {"type": "text", "name": "heading"}
                        ]}
                    ]}
                ]}
            ]),
        )],
    )
    .unwrap();

    assert_eq!(block_tables(&schema), vec!["pages_blocks_hero"]);
    assert!(!table(&schema, "pages_blocks_hero").has_column("_locale"));

    let sections = table(&schema, "pages_sections");
    assert!(sections.has_column("_locale"));
    assert!(sections.root_links.contains("block:pages_blocks_hero"));

    let hero = schema
        .relations_of("pages")
        .iter()
        .find(|d| d.name == "_blocks_hero")
        .unwrap();
    assert!(hero.localized);
}

#[timeout(1000)]
#[test]
fn test_block_drift_under_conditional_container_is_rejected() {
    let err = compile(
        CompilerConfig::default(),
        vec![collection(
            "pages",
            json!([
                {"type": "blocks", "name": "layout", "blocks": [
                    {"slug": "hero", "fields": [{"type": "text", "name": "heading"}]}
                ]},
                {"type": "row", "conditional": true, "fields": [
                    {"type": "blocks", "name": "aside", "blocks": [
                        {"slug": "hero", "fields": [{"type": "number", "name": "heading"}]}
                    ]}
                ]}
            ]),
        )],
    )
    .unwrap_err();
    match err {
        SchemaError::BlockShapeMismatch { table, differs_at, .. } => {
            assert_eq!(table, "pages_blocks_hero");
            assert!(differs_at.contains("heading numeric"), "{}", differs_at);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[timeout(1000)]
#[test]
fn test_nested_block_drift_is_rejected() {
    let err = compile(
        CompilerConfig::default(),
        vec![collection(
            "pages",
            json!([
                {"type": "blocks", "name": "layout", "blocks": [
                    {"slug": "card", "fields": [
                        {"type": "array", "name": "items", "fields": [{"type": "text", "name": "label"}]}
                    ]}
                ]},
                {"type": "blocks", "name": "aside", "blocks": [
                    {"slug": "card", "fields": [
                        {"type": "array", "name": "items", "fields": [{"type": "checkbox", "name": "label"}]}
                    ]}
                ]}
            ]),
        )],
    )
    .unwrap_err();
    assert!(matches!(
        err,
        SchemaError::BlockShapeMismatch { ref table, .. } if table == "pages_blocks_card_items"
    ));
}

#[timeout(1000)]
#[test]
fn test_self_embedding_block_terminates() {
    let schema = compile(
        CompilerConfig::default(),
        vec![collection(
            "pages",
            json!([
                {"type": "blocks", "name": "layout", "blocks": [
                    {"slug": "section", "fields": [
                        {"type": "text", "name": "title"},
                        {"type": "blocks", "name": "children", "blocks": [
                            {"slug": "section", "fields": [{"type": "text", "name": "title"}]}
                        ]}
                    ]}
                ]}
            ]),
        )],
    )
    .unwrap();
    let section = table(&schema, "pages_blocks_section");
    assert!(section.root_links.contains("block:pages_blocks_section"));
}

#[timeout(1000)]
#[test]
fn test_repeated_pass_is_idempotent() {
    let mut session = Session::new(localized()).unwrap();
    let collections = blog();
    let (authors, posts) = (&collections[0], &collections[1]);
    compile_collection(&mut session, authors).unwrap();

    let first = compile_collection(&mut session, posts).unwrap();
    let before = session.to_schema();
    let second = compile_collection(&mut session, posts).unwrap();

    assert!(!first.reused);
    assert!(second.reused);
    assert_eq!(first.flags, second.flags);
    assert_eq!(session.to_schema(), before);
}

#[timeout(1000)]
#[test]
fn test_failed_pass_leaves_session_untouched() {
    let mut session = Session::new(CompilerConfig::default()).unwrap();
    compile_collection(&mut session, &blog()[0]).unwrap();
    let before = session.to_schema();

    let broken = collection(
        "broken",
        json!([
            {"type": "text", "name": "ok"},
            {"type": "number", "name": "values", "hasMany": true, "unique": true}
        ]),
    );
    assert!(compile_collection(&mut session, &broken).is_err());
    assert_eq!(session.to_schema(), before);
    assert!(session.target("broken").is_none());
}

#[timeout(5000)]
#[test]
fn test_shared_session_across_threads() {
    let shared = SharedSession::new(Session::new(localized()).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let shared = shared.clone();
            thread::spawn(move || {
                let config = collection(
                    &format!("things{}", i),
                    json!([
                        {"type": "text", "name": "title", "localized": true},
                        {"type": "array", "name": "parts", "fields": [{"type": "text", "name": "name"}]}
                    ]),
                );
                shared.with_pass(|session| compile_collection(session, &config))
            })
        })
        .collect();
    for handle in handles {
        assert!(!handle.join().unwrap().unwrap().reused);
    }

    let schema = shared.to_schema();
    for i in 0..4 {
        assert!(schema.table(&format!("things{}", i)).is_some());
        assert!(schema.table(&format!("things{}_locales", i)).is_some());
        assert!(schema.table(&format!("things{}_parts", i)).is_some());
    }
}
