//! Classification precedence and frontmatter schema composition through the public API.

mod common;

use common::{cache_for, note, settings, vault_with};
use notetype_core::{
    config::Settings,
    frontmatter::{process_frontmatter, FieldSpec, FrontmatterSpec, Frontmatter, NOTETYPE_FIELD},
    markdown::parse_frontmatter,
    registry::{NoteTypeDescriptor, TypeRegistry, ARCHIVED_TYPE, GENERIC_TYPE},
    types::{LOG_CONS_FIELD, PARENTABLE_TYPE},
    NotetypeError,
};
use serde_yaml::Value;
use test_log::test;

fn frontmatter(yaml: &str) -> Frontmatter {
    parse_frontmatter(&format!("---\n{yaml}\n---\n"))
        .unwrap()
        .unwrap()
}

#[test]
fn test_archived_flag_beats_declared_type() {
    let registry = TypeRegistry::builtin();
    let settings = settings();

    let conflicting = frontmatter("notetype: log\narchived: true");
    assert_eq!(
        registry
            .classify("Logs/2024-01-01 x.md", Some(&conflicting), &settings)
            .tag,
        ARCHIVED_TYPE
    );

    let unarchived = frontmatter("notetype: log\narchived: false");
    assert_eq!(
        registry
            .classify("Zettels/2024-01-01 x.md", Some(&unarchived), &settings)
            .tag,
        "log"
    );
}

#[test]
fn test_declared_type_then_folder_then_generic() {
    let registry = TypeRegistry::builtin();
    let settings = settings();

    let declared = frontmatter("notetype: project");
    assert_eq!(
        registry.classify("Logs/x.md", Some(&declared), &settings).tag,
        "project"
    );

    // Unknown and abstract tags fall through to the folder mapping
    for tag in ["mystery", PARENTABLE_TYPE, "dated"] {
        let raw = frontmatter(&format!("notetype: {tag}"));
        assert_eq!(
            registry.classify("Logs/x.md", Some(&raw), &settings).tag,
            "log",
            "{tag} should not classify"
        );
    }

    assert_eq!(registry.classify("Zettels/deep/x.md", None, &settings).tag, "zettel");
    assert_eq!(registry.classify("Elsewhere/x.md", None, &settings).tag, GENERIC_TYPE);
    // Prefix matching is per path segment
    assert_eq!(registry.classify("Zettelsx/x.md", None, &settings).tag, GENERIC_TYPE);
}

#[test]
fn test_folder_mapping_is_first_match() {
    let registry = TypeRegistry::builtin();
    let nested_first = Settings::default()
        .with_folder("log", "Notes/Logs")
        .with_folder("zettel", "Notes");
    let outer_first = Settings::default()
        .with_folder("zettel", "Notes")
        .with_folder("log", "Notes/Logs");

    assert_eq!(registry.classify("Notes/Logs/a.md", None, &nested_first).tag, "log");
    assert_eq!(registry.classify("Notes/Logs/a.md", None, &outer_first).tag, "zettel");
}

#[test]
fn test_effective_spec_is_stable_and_isolated() {
    let registry = TypeRegistry::builtin();
    let first = registry.frontmatter_spec("log");
    let second = registry.frontmatter_spec("log");
    assert_eq!(first, second);

    let keys: Vec<&str> = first.keys().collect();
    assert_eq!(keys, vec![NOTETYPE_FIELD, "createdat", LOG_CONS_FIELD, "cons-hp"]);
    assert_eq!(first.get(NOTETYPE_FIELD).unwrap().default, Value::from("log"));
}

fn tagged_fields() -> FrontmatterSpec {
    FrontmatterSpec::new().field("reviewed", FieldSpec::flag(false))
}

fn tagged_refine(spec: FrontmatterSpec) -> FrontmatterSpec {
    spec.with_default("tags", Value::Sequence(vec![Value::from("reading")]))
}

#[test]
fn test_descendant_override_leaves_ancestor_alone() {
    let mut registry = TypeRegistry::builtin();
    registry
        .register_types(vec![NoteTypeDescriptor::new("reading", "Reading", "zettel")
            .fields(tagged_fields)
            .refine(tagged_refine)])
        .unwrap();

    let reading = registry.frontmatter_spec("reading");
    assert_eq!(
        reading.get("tags").unwrap().default,
        Value::Sequence(vec![Value::from("reading")])
    );
    assert!(reading.contains("reviewed"));
    assert!(reading.contains("parent"));

    let zettel = registry.frontmatter_spec("zettel");
    assert_eq!(zettel.get("tags").unwrap().default, Value::Sequence(vec![]));
    assert!(!zettel.contains("reviewed"));

    assert!(registry.is_a("reading", PARENTABLE_TYPE));
    assert_eq!(
        registry
            .register_types(vec![NoteTypeDescriptor::new("reading", "Again", "zettel")])
            .unwrap_err(),
        NotetypeError::DuplicateType("reading".to_string())
    );
    assert!(registry
        .register_types(vec![NoteTypeDescriptor::new("orphan", "Orphan", "missing")])
        .is_err());
    assert!(registry.get("orphan").is_none());
}

#[test]
fn test_fixed_values_always_win() {
    let registry = TypeRegistry::builtin();
    let spec = registry.frontmatter_spec("zettel");
    let raw = frontmatter("notetype: foo\ntags: [a]\nextra: 1");

    let once = process_frontmatter(&raw, &spec, false);
    let twice = process_frontmatter(&raw, &spec, false);
    assert_eq!(once, twice);
    assert_eq!(once.get(NOTETYPE_FIELD), Some(&Value::from("zettel")));
    assert_eq!(
        once.get("tags"),
        Some(&Value::Sequence(vec![Value::from("a")]))
    );
    assert_eq!(once.get("extra"), Some(&Value::from(1)));
}

#[test]
fn test_cache_classifies_and_queries_by_ancestor() {
    let vault = vault_with(&[
        ("Zettels/z.md", note("tags: [x]", "")),
        ("Logs/2024-05-01 run.md", "ran\n".to_string()),
        ("Inbox/p.md", note("notetype: project", "")),
        ("Old/z.md", note("notetype: zettel\narchived: yes", "")),
    ]);
    let cache = cache_for(&vault, settings());

    let parentable: Vec<String> = cache
        .all_notes_of_type(PARENTABLE_TYPE)
        .iter()
        .map(|note| note.path().to_string())
        .collect();
    assert_eq!(parentable, vec!["Inbox/p.md", "Zettels/z.md"]);
    assert_eq!(cache.all_notes_of_type("dated").len(), 1);

    let archived = cache.get("Old/z.md", false).unwrap();
    assert_eq!(archived.notetype(), ARCHIVED_TYPE);
    assert_eq!(archived.title_prefix_color(&cache), Some("gray"));

    let log = cache.get("Logs/2024-05-01 run.md", false).unwrap();
    assert_eq!(log.flag(LOG_CONS_FIELD), Some(false));
    assert!(log.validate(&cache));
    assert_eq!(log.title_prefix(&cache).as_deref(), Some("Wed"));
}
