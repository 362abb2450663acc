//! Filesystem watching for [FsVault]-backed caches.
//!
//! Changes under the vault root are debounced with `notify-debouncer-full`, refreshed into the
//! vault's metadata with [FsVault::sync_path] and handed to the [NoteCache] as
//! [crate::event::VaultEvent]s from the debouncer thread.

use std::{path::PathBuf, sync::Arc, time::Duration};

use notify_debouncer_full::{
    new_debouncer,
    notify::{
        event::{ModifyKind, RenameMode},
        EventKind, RecommendedWatcher, RecursiveMode, Watcher,
    },
    DebounceEventResult, DebouncedEvent, Debouncer, FileIdMap,
};

use crate::{cache::NoteCache, error::NotetypeError, event::VaultEvent, vault::FsVault};

type VaultDebouncer = Debouncer<RecommendedWatcher, FileIdMap>;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Keeps a cache in sync with a vault directory while alive.
pub struct VaultWatcher {
    root: PathBuf,
    debouncer: VaultDebouncer,
}

fn translate(vault: &FsVault, event: &DebouncedEvent) -> Vec<VaultEvent> {
    let relative: Vec<String> = event
        .paths
        .iter()
        .filter_map(|path| vault.relative_path(path))
        .collect();
    let synced = match event.event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if relative.len() == 2 => {
            vec![vault.sync_rename(&relative[0], &relative[1])]
        }
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => relative
            .iter()
            .map(|path| vault.sync_path(path))
            .collect(),
        _ => Vec::new(),
    };
    synced
        .into_iter()
        .filter_map(|result| match result {
            Ok(event) => event,
            Err(error) => {
                tracing::error!("[VaultWatcher] failed to sync a change: {error}");
                None
            }
        })
        .collect()
}

/// Hands one debounced batch to the cache. Events queued by writes made through the vault go
/// first, so the queue never outlives a batch.
fn handle_batch(vault: &FsVault, cache: &NoteCache, events: &[DebouncedEvent]) {
    let written = vault.drain_events();
    let changed = events.iter().flat_map(|event| translate(vault, event));
    for vault_event in written.into_iter().chain(changed) {
        tracing::info!("[VaultWatcher] {vault_event}");
        cache.handle_event(&vault_event);
    }
}

impl VaultWatcher {
    pub fn start(
        vault: Arc<FsVault>,
        cache: Arc<NoteCache>,
        debounce: Duration,
    ) -> Result<Self, NotetypeError> {
        let root = vault.root().to_path_buf();
        let handler_vault = vault.clone();
        let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => handle_batch(&handler_vault, &cache, &events),
                Err(errors) => {
                    tracing::error!("[VaultWatcher] notify debouncer returned errors: {errors:?}");
                }
            }
        })?;
        debouncer
            .watcher()
            .watch(&root, RecursiveMode::Recursive)?;
        tracing::info!("[VaultWatcher::start] watching {root:?}");
        Ok(VaultWatcher { root, debouncer })
    }

    pub fn stop(mut self) -> Result<(), NotetypeError> {
        tracing::info!("[VaultWatcher::stop] unwatching {:?}", self.root);
        self.debouncer.watcher().unwatch(&self.root)?;
        Ok(())
    }
}
