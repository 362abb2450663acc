//! The creation pipeline end to end: drafts in, files and cache entries out.

mod common;

use std::{sync::Arc, time::Duration};

use common::{at, cache_for, pump, settings, vault_with};
use notetype_core::{
    creation::{create_note_and_wait, create_note_at, CreatedNote, NoteDraft},
    event::CacheUpdate,
    frontmatter::{CREATED_AT_FIELD, NOTETYPE_FIELD},
    markdown::{parse_frontmatter, split_frontmatter},
    types::{DATE_EXTRA, LOG_CONS_FIELD, LOG_CONS_HP_FIELD, RANGE_EXTRA},
    vault::Vault,
    NotetypeError,
};
use parking_lot::Mutex;
use serde_yaml::Value;
use test_log::test;

fn keys(text: &str) -> Vec<String> {
    let (block, _) = split_frontmatter(text);
    block
        .unwrap_or_default()
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, _)| key.trim().to_string())
        .collect()
}

#[test]
fn test_second_create_returns_the_existing_file() {
    let vault = vault_with(&[]);
    let cache = cache_for(&vault, settings());
    let now = at(2024, 1, 1, 8, 0);

    let first = create_note_at(&cache, NoteDraft::new("Idea").with_type("zettel"), now).unwrap();
    let second = create_note_at(
        &cache,
        NoteDraft::new("Idea")
            .with_type("zettel")
            .with_content("different body\n"),
        now,
    )
    .unwrap();

    assert_eq!(first, CreatedNote::Created("Zettels/Idea.md".to_string()));
    assert_eq!(second, CreatedNote::Existing("Zettels/Idea.md".to_string()));
    assert_eq!(vault.write_count("Zettels/Idea.md"), 1);
    assert!(!vault
        .read_file_text("Zettels/Idea.md")
        .unwrap()
        .contains("different body"));
    assert_eq!(vault.notices(), vec!["Zettels/Idea.md already exists"]);
}

#[test]
fn test_frontmatter_order_survives_a_reparse() {
    let vault = vault_with(&[]);
    let cache = cache_for(&vault, settings());
    let draft = NoteDraft::new("Alpha")
        .with_type("project")
        .with_field("zz-extra", "kept")
        .with_field("proj-status", "active")
        .with_field(NOTETYPE_FIELD, "zettel");

    let created = create_note_at(&cache, draft, at(2024, 1, 1, 8, 0)).unwrap();
    let text = vault.read_file_text(created.path()).unwrap();
    assert_eq!(
        keys(&text),
        vec![
            "notetype",
            "createdat",
            "proj-status",
            "proj-start-date",
            "proj-end-date",
            "zz-extra"
        ]
    );

    let reparsed = parse_frontmatter(&text).unwrap().unwrap();
    assert_eq!(reparsed.get(NOTETYPE_FIELD), Some(&Value::from("project")));
    assert_eq!(
        reparsed.get(CREATED_AT_FIELD),
        Some(&Value::from("2024-01-01T08:00:00"))
    );
    assert_eq!(reparsed.get("proj-status"), Some(&Value::from("active")));
    assert_eq!(reparsed.get("zz-extra"), Some(&Value::from("kept")));
    assert!(!reparsed.contains_key("parent"));

    pump(&vault, &cache);
    let note = cache.get(created.path(), false).unwrap();
    assert_eq!(
        note.created_at(),
        Some(at(2024, 1, 1, 8, 0))
    );
}

#[test]
fn test_log_from_natural_date() {
    let vault = vault_with(&[]);
    let cache = cache_for(&vault, settings());
    let now = at(2024, 5, 6, 14, 5);

    let created = create_note_at(
        &cache,
        NoteDraft::new("Groceries")
            .with_type("log")
            .with_extra(DATE_EXTRA, "today"),
        now,
    )
    .unwrap();
    assert_eq!(created.path(), "Logs/2024-05-06 Groceries.md");

    let frontmatter = parse_frontmatter(&vault.read_file_text(created.path()).unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(frontmatter.get(NOTETYPE_FIELD), Some(&Value::from("log")));
    assert_eq!(frontmatter.get(LOG_CONS_FIELD), Some(&Value::from(false)));
    assert_eq!(frontmatter.get(LOG_CONS_HP_FIELD), Some(&Value::from(true)));

    let rejected = create_note_at(
        &cache,
        NoteDraft::new("Groceries")
            .with_type("log")
            .with_extra(DATE_EXTRA, "the day after never"),
        now,
    );
    assert!(matches!(rejected, Err(NotetypeError::Creation(_))));
    assert_eq!(vault.list_files(), vec!["Logs/2024-05-06 Groceries.md"]);
    assert_eq!(vault.notices().len(), 1);
}

#[test]
fn test_planner_gets_range_and_checklists() {
    let vault = vault_with(&[]);
    let cache = cache_for(&vault, settings());

    let created = create_note_at(
        &cache,
        NoteDraft::new("Sprint")
            .with_type("planner")
            .with_extra(RANGE_EXTRA, "2024-03-04 to 2024-03-06"),
        at(2024, 3, 1, 9, 0),
    )
    .unwrap();
    assert_eq!(created.path(), "Planners/2024-03-04 Sprint.md");

    let text = vault.read_file_text(created.path()).unwrap();
    assert_eq!(text.matches("- [ ] ").count(), 3);
    assert!(text.contains("## 2024-03-04 Mon"));

    pump(&vault, &cache);
    let planner = cache.get(created.path(), false).unwrap();
    assert!(planner.validate(&cache));
    assert_eq!(planner.title_suffix(&cache).as_deref(), Some("(3d)"));
}

#[test]
fn test_creation_errors_write_nothing() {
    let vault = vault_with(&[]);
    let cache = cache_for(&vault, settings());
    let now = at(2024, 1, 1, 8, 0);

    let unconfigured = create_note_at(&cache, NoteDraft::new("Guide").with_type("doc"), now);
    assert!(matches!(unconfigured, Err(NotetypeError::Creation(_))));

    let empty = create_note_at(&cache, NoteDraft::new(":/?").with_type("zettel"), now);
    assert!(matches!(empty, Err(NotetypeError::Creation(_))));

    let abstract_type = create_note_at(&cache, NoteDraft::new("x").with_type("dated"), now);
    assert_eq!(
        abstract_type.unwrap_err(),
        NotetypeError::UnknownType("dated".to_string())
    );

    assert!(vault.list_files().is_empty());
    assert_eq!(vault.notices().len(), 3);

    // The generic type may live at the root
    let loose = create_note_at(&cache, NoteDraft::new("Loose"), now).unwrap();
    assert_eq!(loose.path(), "Loose.md");
}

#[test(tokio::test)]
async fn test_create_and_wait_resolves_on_the_create_event() {
    let vault = vault_with(&[]);
    let cache = cache_for(&vault, settings());
    let creates = Arc::new(Mutex::new(Vec::new()));
    let sink = creates.clone();
    let _subscription = cache.subscribe(move |update| {
        if let CacheUpdate::Create(note) = update {
            sink.lock().push(note.path().to_string());
        }
    });

    let pumper = {
        let vault = vault.clone();
        let cache = cache.clone();
        tokio::spawn(async move {
            loop {
                pump(&vault, &cache);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
    };

    let note = create_note_and_wait(&cache, NoteDraft::new("Idea").with_type("zettel"))
        .await
        .unwrap();
    pumper.abort();

    assert_eq!(note.path(), "Zettels/Idea.md");
    assert_eq!(note.notetype(), "zettel");
    assert!(Arc::ptr_eq(&note, &cache.get("Zettels/Idea.md", false).unwrap()));
    assert_eq!(*creates.lock(), vec!["Zettels/Idea.md"]);
}

#[test(tokio::test)]
async fn test_create_and_wait_falls_back_after_timeout() {
    let vault = vault_with(&[]);
    let mut quick = settings();
    quick.creation_timeout_ms = 20;
    let cache = cache_for(&vault, quick);

    let note = create_note_and_wait(&cache, NoteDraft::new("Slow").with_type("zettel"))
        .await
        .unwrap();
    assert_eq!(note.path(), "Zettels/Slow.md");
    assert!(!note.is_stub());

    // A late event only refreshes the entry
    assert_eq!(pump(&vault, &cache), 1);
    assert_eq!(cache.get("Zettels/Slow.md", false).unwrap().notetype(), "zettel");

    let again = create_note_and_wait(&cache, NoteDraft::new("Slow").with_type("zettel"))
        .await
        .unwrap();
    assert_eq!(again.path(), "Zettels/Slow.md");
    assert_eq!(vault.write_count("Zettels/Slow.md"), 1);
    assert_eq!(cache.pending_creations("Zettels/Slow.md"), 0);
}

#[test(tokio::test)]
async fn test_repeated_create_and_wait_leaves_no_waiters() {
    let vault = vault_with(&[]);
    let mut quick = settings();
    quick.creation_timeout_ms = 20;
    let cache = cache_for(&vault, quick);

    create_note_and_wait(&cache, NoteDraft::new("Idea").with_type("zettel"))
        .await
        .unwrap();
    for _ in 0..3 {
        let existing = create_note_and_wait(&cache, NoteDraft::new("Idea").with_type("zettel"))
            .await
            .unwrap();
        assert_eq!(existing.path(), "Zettels/Idea.md");
    }
    assert_eq!(cache.pending_creations("Zettels/Idea.md"), 0);
    assert_eq!(vault.write_count("Zettels/Idea.md"), 1);

    // Another caller's pending waiter survives a release
    let first = cache.expect_creation("Zettels/Later.md");
    let second = cache.expect_creation("Zettels/Later.md");
    cache.release_creation("Zettels/Later.md", second);
    assert_eq!(cache.pending_creations("Zettels/Later.md"), 1);
    drop(first);
}
