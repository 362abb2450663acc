//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use notetype_core::{
    cache::NoteCache, config::Settings, registry::TypeRegistry, vault::MemoryVault,
};

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times, subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Frontmatter block plus body.
#[allow(dead_code)]
pub fn note(frontmatter: &str, body: &str) -> String {
    format!("---\n{frontmatter}\n---\n{body}")
}

/// A vault seeded with `files`, no events queued.
#[allow(dead_code)]
pub fn vault_with(files: &[(&str, String)]) -> Arc<MemoryVault> {
    Arc::new(
        files
            .iter()
            .fold(MemoryVault::new(), |vault, (path, text)| vault.with_file(path, text)),
    )
}

/// The folder layout most tests use.
#[allow(dead_code)]
pub fn settings() -> Settings {
    Settings::default()
        .with_folder("zettel", "Zettels")
        .with_folder("log", "Logs")
        .with_folder("planner", "Planners")
        .with_folder("project", "Projects")
        .with_folder("module", "Projects")
        .with_folder("capture", "Inbox")
}

/// An initialized cache with the built-in types.
#[allow(dead_code)]
pub fn cache_for(vault: &Arc<MemoryVault>, settings: Settings) -> Arc<NoteCache> {
    init_logging();
    let cache = Arc::new(NoteCache::new(
        vault.clone(),
        Arc::new(TypeRegistry::builtin()),
        settings,
    ));
    cache.init();
    cache
}

/// Delivers queued vault events to the cache.
#[allow(dead_code)]
pub fn pump(vault: &MemoryVault, cache: &NoteCache) -> usize {
    let events = vault.drain_events();
    for event in events.iter() {
        cache.handle_event(event);
    }
    events.len()
}

#[allow(dead_code)]
pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, 0))
        .expect("valid test timestamp")
}
