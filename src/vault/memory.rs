use std::collections::{BTreeMap, BTreeSet, VecDeque};

use parking_lot::{Mutex, RwLock};

use crate::{error::NotetypeError, event::VaultEvent, frontmatter::Frontmatter};

use super::{LinkIndex, Vault};

fn parent_folder(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(folder, _)| folder)
}

fn is_note_path(path: &str) -> bool {
    path.ends_with(".md")
}

/// An in-memory vault that records the events a host would deliver.
///
/// Events are queued rather than dispatched; whoever drives the vault decides when to hand
/// them to a [crate::cache::NoteCache], which is how tests reproduce delayed delivery.
#[derive(Debug, Default)]
pub struct MemoryVault {
    files: RwLock<BTreeMap<String, String>>,
    folders: RwLock<BTreeSet<String>>,
    index: RwLock<LinkIndex>,
    events: Mutex<VecDeque<VaultEvent>>,
    notices: Mutex<Vec<String>>,
    write_counts: Mutex<BTreeMap<String, usize>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        MemoryVault::default()
    }

    /// Seeds a file without queueing an event.
    pub fn with_file(self, path: &str, text: &str) -> Self {
        self.register_folders(path);
        self.store(path, text);
        self
    }

    pub fn set_index_frontmatter_links(&self, enabled: bool) {
        let files = self.files.read();
        let mut index = self.index.write();
        index.set_index_frontmatter_links(enabled);
        for (path, text) in files.iter().filter(|(path, _)| is_note_path(path)) {
            index.update(path, text);
        }
    }

    fn register_folders(&self, path: &str) {
        let mut folders = self.folders.write();
        let mut current = parent_folder(path);
        while let Some(folder) = current {
            if !folders.insert(folder.to_string()) {
                break;
            }
            current = parent_folder(folder);
        }
    }

    /// Writes text and reindexes it. True when the file is new.
    fn store(&self, path: &str, text: &str) -> bool {
        let is_new = self
            .files
            .write()
            .insert(path.to_string(), text.to_string())
            .is_none();
        if is_note_path(path) {
            self.index.write().update(path, text);
        }
        is_new
    }

    fn push_event(&self, event: VaultEvent) {
        tracing::debug!("[MemoryVault] queueing {event}");
        self.events.lock().push_back(event);
    }

    /// Writes a file the way a user would, creating its folders.
    pub fn insert_file(&self, path: &str, text: &str) {
        self.register_folders(path);
        let event = if self.store(path, text) {
            VaultEvent::Created(path.to_string())
        } else {
            VaultEvent::MetadataChanged(path.to_string())
        };
        self.push_event(event);
    }

    pub fn delete_file(&self, path: &str) -> Result<(), NotetypeError> {
        if self.files.write().remove(path).is_none() {
            return Err(NotetypeError::NotFound(path.to_string()));
        }
        self.index.write().remove(path);
        self.push_event(VaultEvent::Deleted(path.to_string()));
        Ok(())
    }

    /// Deletes the file but leaves its metadata indexed, like a host whose metadata cache has
    /// not caught up with a deletion yet.
    pub fn delete_without_reindex(&self, path: &str) -> Result<(), NotetypeError> {
        if self.files.write().remove(path).is_none() {
            return Err(NotetypeError::NotFound(path.to_string()));
        }
        self.push_event(VaultEvent::Deleted(path.to_string()));
        Ok(())
    }

    pub fn rename_file(&self, from: &str, to: &str) -> Result<(), NotetypeError> {
        let text = self
            .files
            .write()
            .remove(from)
            .ok_or_else(|| NotetypeError::NotFound(from.to_string()))?;
        self.register_folders(to);
        self.files.write().insert(to.to_string(), text);
        self.index.write().rename(from, to);
        self.push_event(VaultEvent::Renamed(from.to_string(), to.to_string()));
        Ok(())
    }

    pub fn queued_events(&self) -> usize {
        self.events.lock().len()
    }

    /// Removes and returns every queued event, oldest first.
    pub fn drain_events(&self) -> Vec<VaultEvent> {
        self.events.lock().drain(..).collect()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().clone()
    }

    /// Number of [Vault::write_file] calls for `path`.
    pub fn write_count(&self, path: &str) -> usize {
        self.write_counts.lock().get(path).copied().unwrap_or(0)
    }

    pub(crate) fn remove_untracked(&self, path: &str) -> bool {
        let removed = self.files.write().remove(path).is_some();
        self.index.write().remove(path);
        removed
    }

    pub(crate) fn store_untracked(&self, path: &str, text: &str) -> bool {
        self.register_folders(path);
        self.store(path, text)
    }

    pub(crate) fn rename_untracked(&self, from: &str, to: &str) -> bool {
        let Some(text) = self.files.write().remove(from) else {
            return false;
        };
        self.register_folders(to);
        self.files.write().insert(to.to_string(), text);
        self.index.write().rename(from, to);
        true
    }
}

impl Vault for MemoryVault {
    fn read_file_text(&self, path: &str) -> Result<String, NotetypeError> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| NotetypeError::NotFound(path.to_string()))
    }

    fn write_file(&self, path: &str, text: &str) -> Result<(), NotetypeError> {
        if let Some(folder) = parent_folder(path) {
            if !self.folder_exists(folder) {
                return Err(NotetypeError::NotFound(format!("folder {folder}")));
            }
        }
        *self
            .write_counts
            .lock()
            .entry(path.to_string())
            .or_insert(0) += 1;
        let event = if self.store(path, text) {
            VaultEvent::Created(path.to_string())
        } else {
            VaultEvent::MetadataChanged(path.to_string())
        };
        self.push_event(event);
        Ok(())
    }

    fn file_exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }

    fn folder_exists(&self, path: &str) -> bool {
        let path = path.trim_end_matches('/');
        path.is_empty() || self.folders.read().contains(path)
    }

    fn create_folder(&self, path: &str) -> Result<(), NotetypeError> {
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            return Ok(());
        }
        // Registering a child path registers the folder and its ancestors
        self.register_folders(&format!("{path}/"));
        Ok(())
    }

    fn list_files(&self) -> Vec<String> {
        self.files.read().keys().cloned().collect()
    }

    fn frontmatter(&self, path: &str) -> Option<Frontmatter> {
        self.index.read().frontmatter(path)
    }

    fn forward_links(&self, path: &str) -> BTreeMap<String, usize> {
        self.index.read().forward_links(path)
    }

    fn backlinks(&self, path: &str) -> Vec<(String, usize)> {
        self.index.read().backlinks(path)
    }

    fn unresolved_links(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.index.read().unresolved_links()
    }

    fn resolve_link(&self, link: &str, source: &str) -> Option<String> {
        self.index.read().resolve(link, source)
    }

    fn notice(&self, message: &str) {
        tracing::info!("[MemoryVault::notice] {message}");
        self.notices.lock().push(message.to_string());
    }
}
