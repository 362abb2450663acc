//! Shared fixtures for the in-crate tests.

use std::sync::Arc;

use crate::{cache::NoteCache, config::Settings, registry::TypeRegistry, vault::MemoryVault};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// A vault seeded with `files`, without any queued events.
pub fn vault_with(files: &[(&str, &str)]) -> Arc<MemoryVault> {
    let vault = files
        .iter()
        .fold(MemoryVault::new(), |vault, (path, text)| vault.with_file(path, text));
    Arc::new(vault)
}

/// An initialized cache over `vault` with the built-in types.
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

/// Hands every queued vault event to the cache, in order.
pub fn pump(vault: &MemoryVault, cache: &NoteCache) -> usize {
    let events = vault.drain_events();
    for event in events.iter() {
        cache.handle_event(event);
    }
    events.len()
}

/// Frontmatter block plus body.
pub fn note_text(frontmatter: &str, body: &str) -> String {
    format!("---\n{frontmatter}\n---\n{body}")
}
