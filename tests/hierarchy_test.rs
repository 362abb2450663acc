//! Parent/child discovery, descendant trees and lineages over the link graph.

mod common;

use chrono::NaiveDate;
use common::{cache_for, note, settings, vault_with};
use notetype_core::{
    types::{project_dates, PROJECT_STATUS_FIELD},
    NotetypeError,
};
use test_log::test;

fn paths(notes: &[std::sync::Arc<notetype_core::note::Note>]) -> Vec<String> {
    notes.iter().map(|note| note.path().to_string()).collect()
}

#[test]
fn test_cycle_is_reported_from_every_start() {
    let vault = vault_with(&[
        ("Zettels/A.md", note("notetype: zettel\nparent: \"[[B]]\"", "")),
        ("Zettels/B.md", note("notetype: zettel\nparent: \"[[C]]\"", "")),
        ("Zettels/C.md", note("notetype: zettel\nparent: \"[[A]]\"", "")),
    ]);
    let cache = cache_for(&vault, settings());
    let cyclic = ["Zettels/A.md", "Zettels/B.md", "Zettels/C.md"];

    for start in cyclic {
        let note = cache.get(start, false).unwrap();
        match note.descendants(&cache, &[]) {
            Err(NotetypeError::CycleDetected { path }) => {
                assert!(cyclic.contains(&path.as_str()), "unexpected path {path}");
            }
            other => panic!("expected a cycle from {start}, got {other:?}"),
        }
        assert!(matches!(
            note.lineage(&cache),
            Err(NotetypeError::CycleDetected { .. })
        ));
    }
}

#[test]
fn test_chain_depth_matches_length() {
    let vault = vault_with(&[
        ("Zettels/n1.md", note("notetype: zettel", "")),
        ("Zettels/n2.md", note("notetype: zettel\nparent: \"[[n1]]\"", "")),
        ("Zettels/n3.md", note("notetype: zettel\nparent: \"[[n2]]\"", "")),
        ("Zettels/n4.md", note("notetype: zettel\nparent: \"[[n3]]\"", "")),
    ]);
    let cache = cache_for(&vault, settings());
    let root = cache.get("Zettels/n1.md", false).unwrap();

    let tree = root.descendants(&cache, &[]).unwrap();
    assert_eq!(tree.depth(), 4);
    assert_eq!(tree.len(), 4);
    assert_eq!(
        paths(&tree.descendants()),
        vec!["Zettels/n2.md", "Zettels/n3.md", "Zettels/n4.md"]
    );
    assert_eq!(
        tree.outline().render(),
        "Zettels/n1.md [zettel]\n  Zettels/n2.md [zettel]\n    Zettels/n3.md [zettel]\n      Zettels/n4.md [zettel]\n"
    );

    let leaf = cache.get("Zettels/n4.md", false).unwrap();
    assert_eq!(
        paths(&leaf.lineage(&cache).unwrap()),
        vec!["Zettels/n1.md", "Zettels/n2.md", "Zettels/n3.md"]
    );
    assert!(root.lineage(&cache).unwrap().is_empty());
    assert!(leaf.descendants(&cache, &[]).unwrap().is_leaf());
}

#[test]
fn test_children_need_both_link_and_parent() {
    let vault = vault_with(&[
        ("Zettels/A.md", note("notetype: zettel", "")),
        // Parent declared, no link anywhere once frontmatter links are not indexed
        ("Zettels/declared.md", note("notetype: zettel\nparent: \"[[A]]\"", "")),
        // Parent declared and linked from the body
        (
            "Zettels/linked.md",
            note("notetype: zettel\nparent: \"[[A]]\"", "Part of [[A]].\n"),
        ),
        // Linked without declaring a parent
        ("Zettels/mention.md", note("notetype: zettel", "Mentions [[A]].\n")),
    ]);
    vault.set_index_frontmatter_links(false);
    let cache = cache_for(&vault, settings());
    let a = cache.get("Zettels/A.md", false).unwrap();

    assert_eq!(paths(&a.child_notes(&cache)), vec!["Zettels/linked.md"]);
    let declared = cache.get("Zettels/declared.md", false).unwrap();
    assert_eq!(declared.parent(&cache).unwrap().path(), "Zettels/A.md");
    assert_eq!(a.title_suffix(&cache).as_deref(), Some("(1)"));

    vault.set_index_frontmatter_links(true);
    cache.reload_all();
    let a = cache.get("Zettels/A.md", false).unwrap();
    assert_eq!(
        paths(&a.child_notes(&cache)),
        vec!["Zettels/declared.md", "Zettels/linked.md"]
    );
}

#[test]
fn test_malformed_or_unresolved_parent_is_none() {
    let vault = vault_with(&[
        ("Zettels/A.md", note("notetype: zettel", "")),
        ("Zettels/plain.md", note("notetype: zettel\nparent: A", "")),
        ("Zettels/two.md", note("notetype: zettel\nparent: \"[[A]] [[B]]\"", "")),
        ("Zettels/ghost.md", note("notetype: zettel\nparent: \"[[Nowhere]]\"", "")),
    ]);
    let cache = cache_for(&vault, settings());
    for path in ["Zettels/plain.md", "Zettels/two.md", "Zettels/ghost.md"] {
        assert!(cache.get(path, false).unwrap().parent(&cache).is_none(), "{path}");
    }
    assert!(cache
        .get("Zettels/A.md", false)
        .unwrap()
        .child_notes(&cache)
        .is_empty());
}

#[test]
fn test_type_filter_prunes_subtrees() {
    let vault = vault_with(&[
        ("Projects/Alpha.md", note("notetype: project", "")),
        (
            "Projects/Design.md",
            note("notetype: module\nparent: \"[[Alpha]]\"", ""),
        ),
        (
            "Zettels/idea.md",
            note("notetype: zettel\nparent: \"[[Alpha]]\"", ""),
        ),
        (
            "Zettels/deeper.md",
            note("notetype: module\nparent: \"[[idea]]\"", ""),
        ),
    ]);
    let cache = cache_for(&vault, settings());
    let alpha = cache.get("Projects/Alpha.md", false).unwrap();

    let everything = alpha.descendants(&cache, &[]).unwrap();
    assert_eq!(everything.len(), 4);
    assert_eq!(everything.depth(), 3);

    let modules = alpha.descendants(&cache, &["module"]).unwrap();
    assert_eq!(paths(&modules.descendants()), vec!["Projects/Design.md"]);
    assert_eq!(modules.depth(), 2);
}

#[test]
fn test_project_dates_come_from_modules() {
    let vault = vault_with(&[
        (
            "Projects/Alpha.md",
            note("notetype: project\nproj-status: active", ""),
        ),
        (
            "Projects/M1.md",
            note(
                "notetype: module\nparent: \"[[Alpha]]\"\nmod-start-date: 2024-01-01\nmod-end-date: 2024-02-01",
                "",
            ),
        ),
        (
            "Projects/M2.md",
            note(
                "notetype: module\nparent: \"[[Alpha]]\"\nmod-start-date: 2024-01-15\nmod-end-date: 2024-03-01",
                "",
            ),
        ),
    ]);
    let cache = cache_for(&vault, settings());
    let alpha = cache.get("Projects/Alpha.md", false).unwrap();

    assert_eq!(
        project_dates(&alpha, &cache),
        (
            NaiveDate::from_ymd_opt(2024, 1, 1),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        )
    );
    assert_eq!(alpha.text(PROJECT_STATUS_FIELD), Some("active"));
    assert!(alpha.validate(&cache));
    assert_eq!(alpha.title_prefix_color(&cache), Some("green"));
    assert_eq!(
        alpha.title_suffix(&cache).as_deref(),
        Some("(2024-01-01 → 2024-03-01)")
    );

    let module = cache.get("Projects/M2.md", false).unwrap();
    assert!(module.validate(&cache));
    assert_eq!(module.lineage(&cache).unwrap(), vec![alpha.clone()]);
}

#[test]
fn test_active_project_without_dates_is_invalid() {
    let vault = vault_with(&[(
        "Projects/Lonely.md",
        note("notetype: project\nproj-status: active", ""),
    )]);
    let cache = cache_for(&vault, settings());
    let lonely = cache.get("Projects/Lonely.md", false).unwrap();
    assert!(!lonely.validate(&cache));
    assert_eq!(lonely.title_prefix_color(&cache), Some("red"));
    assert_eq!(lonely.title_suffix(&cache), None);
}
