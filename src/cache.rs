//! The note cache: the single owner of live [Note] instances.
//!
//! The cache maps vault paths to `Arc<Note>` and is kept current by feeding it the host's
//! [VaultEvent]s through [NoteCache::handle_event]. Every handled event commits its mutation
//! first and then publishes a [CacheUpdate] to subscribers, synchronously and in subscription
//! order, with no cache lock held, so subscribers may query the cache from their callback.
//!
//! Deleted paths are tombstoned until a later create or rename brings them back, or until a
//! reload finds that the vault no longer reports the path at all. Hosts whose metadata index
//! lags behind deletions would otherwise resurrect the note on the next lookup.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;

use crate::{
    config::{Settings, SettingsProvider},
    error::NotetypeError,
    event::{CacheUpdate, VaultEvent},
    frontmatter::{order_frontmatter, Frontmatter},
    markdown::{parse_frontmatter, replace_frontmatter},
    note::Note,
    registry::TypeRegistry,
    vault::{stub_path, Vault},
};

pub type Subscriber = Arc<dyn Fn(&CacheUpdate) + Send + Sync>;

type SubscriberList = Mutex<Vec<(u64, Subscriber)>>;

/// Handle returned by [NoteCache::subscribe].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    subscribers: Weak<SubscriberList>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Removes exactly this subscriber. False if the cache is gone or was torn down.
    pub fn unsubscribe(self) -> bool {
        let Some(subscribers) = self.subscribers.upgrade() else {
            return false;
        };
        let mut subscribers = subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(id, _)| *id != self.id);
        subscribers.len() != before
    }
}

pub struct NoteCache {
    vault: Arc<dyn Vault>,
    registry: Arc<TypeRegistry>,
    settings: RwLock<Settings>,
    notes: RwLock<BTreeMap<String, Arc<Note>>>,
    deleted: RwLock<BTreeSet<String>>,
    subscribers: Arc<SubscriberList>,
    next_subscriber: AtomicU64,
    waiters: Mutex<HashMap<String, Vec<oneshot::Sender<Arc<Note>>>>>,
}

impl fmt::Debug for NoteCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteCache")
            .field("notes", &self.notes.read().len())
            .field("deleted", &self.deleted.read().len())
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}

impl NoteCache {
    /// An empty cache. Call [NoteCache::init] to load the vault.
    pub fn new(vault: Arc<dyn Vault>, registry: Arc<TypeRegistry>, settings: Settings) -> Self {
        NoteCache {
            vault,
            registry,
            settings: RwLock::new(settings),
            notes: RwLock::new(BTreeMap::new()),
            deleted: RwLock::new(BTreeSet::new()),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            next_subscriber: AtomicU64::new(0),
            waiters: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_provider(
        vault: Arc<dyn Vault>,
        registry: Arc<TypeRegistry>,
        provider: &dyn SettingsProvider,
    ) -> Result<Self, NotetypeError> {
        Ok(NoteCache::new(vault, registry, provider.get_settings()?))
    }

    pub fn init(&self) -> usize {
        self.reload_all()
    }

    pub fn vault(&self) -> &dyn Vault {
        self.vault.as_ref()
    }

    pub fn vault_handle(&self) -> Arc<dyn Vault> {
        self.vault.clone()
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Replaces the settings and reloads, since folder mappings change classification.
    pub fn update_settings(&self, settings: Settings) -> usize {
        *self.settings.write() = settings;
        self.reload_all()
    }

    /// Rebuilds the cache from the vault: one note per markdown file plus a stub for every
    /// unresolved link target. Tombstoned paths stay out; tombstones for paths the vault has
    /// forgotten entirely are dropped.
    pub fn reload_all(&self) -> usize {
        let settings = self.settings();
        let deleted = {
            let mut deleted = self.deleted.write();
            let before = deleted.len();
            deleted.retain(|path| {
                self.vault.file_exists(path) || self.vault.frontmatter(path).is_some()
            });
            if deleted.len() < before {
                tracing::debug!(
                    "[NoteCache::reload_all] dropped {} settled tombstones",
                    before - deleted.len()
                );
            }
            deleted.clone()
        };
        let mut notes = BTreeMap::new();
        for path in self.vault.list_files() {
            if !settings.is_markdown_path(&path) || deleted.contains(&path) {
                continue;
            }
            if let Some(note) = Note::load(&path, self.vault(), &self.registry, &settings) {
                notes.insert(path, Arc::new(note));
            }
        }
        let files = notes.len();
        for links in self.vault.unresolved_links().into_values() {
            for link in links {
                let path = stub_path(&link);
                if !notes.contains_key(&path) && !deleted.contains(&path) {
                    let stub = Note::stub(&path, &self.registry);
                    notes.insert(path, Arc::new(stub));
                }
            }
        }
        let total = notes.len();
        *self.notes.write() = notes;
        tracing::info!(
            "[NoteCache::reload_all] loaded {files} notes and {} stubs",
            total - files
        );
        self.publish(&CacheUpdate::Reload);
        files
    }

    /// Drops every note, tombstone, subscriber and pending creation waiter.
    pub fn teardown(&self) {
        self.notes.write().clear();
        self.deleted.write().clear();
        self.subscribers.lock().clear();
        self.waiters.lock().clear();
        tracing::debug!("[NoteCache::teardown] done");
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&CacheUpdate) + Send + Sync + 'static,
    {
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push((id, Arc::new(callback)));
        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    fn publish(&self, update: &CacheUpdate) {
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();
        tracing::debug!(
            "[NoteCache::publish] {update} {:?} to {} subscribers",
            update.path(),
            subscribers.len()
        );
        for subscriber in subscribers {
            subscriber(update);
        }
    }

    /// A receiver resolved with the note once the cache has handled the creation of `path`.
    pub fn expect_creation(&self, path: &str) -> oneshot::Receiver<Arc<Note>> {
        let (sender, receiver) = oneshot::channel();
        self.waiters
            .lock()
            .entry(path.to_string())
            .or_default()
            .push(sender);
        receiver
    }

    /// Gives up on a creation registered with [NoteCache::expect_creation]. Other callers still
    /// waiting on `path` keep their waiters.
    pub fn release_creation(&self, path: &str, receiver: oneshot::Receiver<Arc<Note>>) {
        drop(receiver);
        let mut waiters = self.waiters.lock();
        if let Some(pending) = waiters.get_mut(path) {
            pending.retain(|sender| !sender.is_closed());
            if pending.is_empty() {
                waiters.remove(path);
            }
        }
    }

    /// Number of callers waiting for `path` to be created.
    pub fn pending_creations(&self, path: &str) -> usize {
        self.waiters.lock().get(path).map_or(0, Vec::len)
    }

    fn resolve_waiters(&self, path: &str, note: &Arc<Note>) {
        let Some(waiters) = self.waiters.lock().remove(path) else {
            return;
        };
        for waiter in waiters {
            // The waiter may have timed out already
            let _ = waiter.send(note.clone());
        }
    }

    pub fn handle_event(&self, event: &VaultEvent) {
        tracing::debug!("[NoteCache::handle_event] {event}");
        let settings = self.settings();
        match event {
            VaultEvent::Created(path) => {
                if !settings.is_markdown_path(path) {
                    return;
                }
                self.deleted.write().remove(path);
                self.upsert(path, &settings);
            }
            VaultEvent::MetadataChanged(path) => {
                if !settings.is_markdown_path(path) {
                    return;
                }
                if self.deleted.read().contains(path) {
                    tracing::warn!(
                        "[NoteCache::handle_event] ignoring metadata change of deleted {path}"
                    );
                    return;
                }
                self.upsert(path, &settings);
            }
            VaultEvent::Deleted(path) => {
                self.deleted.write().insert(path.clone());
                let removed = self.notes.write().remove(path);
                match removed {
                    Some(note) => self.publish(&CacheUpdate::Delete(note)),
                    None => tracing::debug!("[NoteCache::handle_event] {path} was not cached"),
                }
            }
            VaultEvent::Renamed(from, to) => {
                if !settings.is_markdown_path(to) {
                    self.handle_event(&VaultEvent::Deleted(from.clone()));
                    return;
                }
                {
                    let mut deleted = self.deleted.write();
                    deleted.insert(from.clone());
                    deleted.remove(to);
                }
                let moved = {
                    let mut notes = self.notes.write();
                    notes.remove(from).map(|note| {
                        let moved = Arc::new(note.renamed(to));
                        notes.insert(to.clone(), moved.clone());
                        moved
                    })
                };
                match moved {
                    Some(note) => self.publish(&CacheUpdate::Rename(from.clone(), note)),
                    None => self.upsert(to, &settings),
                }
            }
        }
    }

    /// Loads `path` fresh and replaces its entry. Publishes `Change` over a real note and
    /// `Create` over nothing or a stub.
    fn upsert(&self, path: &str, settings: &Settings) {
        let Some(note) = Note::load(path, self.vault(), &self.registry, settings) else {
            tracing::debug!("[NoteCache::upsert] {path} has no file, ignoring");
            return;
        };
        let note = Arc::new(note);
        let previous = self.notes.write().insert(path.to_string(), note.clone());
        let update = match previous {
            Some(old) if !old.is_stub() => CacheUpdate::Change(old, note.clone()),
            _ => CacheUpdate::Create(note.clone()),
        };
        self.publish(&update);
        self.resolve_waiters(path, &note);
    }

    /// The cached note for `path`, loading it on a miss. `force_reload` always rebuilds it from
    /// the vault. Tombstoned paths give `None`.
    pub fn get(&self, path: &str, force_reload: bool) -> Option<Arc<Note>> {
        if self.deleted.read().contains(path) {
            tracing::debug!("[NoteCache::get] {path} is tombstoned");
            return None;
        }
        if !force_reload {
            if let Some(note) = self.notes.read().get(path) {
                return Some(note.clone());
            }
        }
        let settings = self.settings();
        if !settings.is_markdown_path(path) {
            return None;
        }
        match Note::load(path, self.vault(), &self.registry, &settings) {
            Some(note) => {
                let note = Arc::new(note);
                self.notes.write().insert(path.to_string(), note.clone());
                Some(note)
            }
            None => self
                .notes
                .read()
                .get(path)
                .filter(|note| note.is_stub())
                .cloned(),
        }
    }

    pub fn load_note(&self, path: &str) -> Option<Arc<Note>> {
        self.get(path, false)
    }

    /// Like [NoteCache::get], but a path without a file gets a stub entry.
    pub fn load_or_stub(&self, path: &str) -> Option<Arc<Note>> {
        if let Some(note) = self.get(path, false) {
            return Some(note);
        }
        if self.deleted.read().contains(path) {
            return None;
        }
        let mut notes = self.notes.write();
        let note = notes
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(Note::stub(path, &self.registry)));
        Some(note.clone())
    }

    /// The note a link written in `source` points to, or a stub for its would-be path.
    pub fn resolve_link_target(&self, link: &str, source: &str) -> Option<Arc<Note>> {
        match self.vault.resolve_link(link, source) {
            Some(path) => self.get(&path, false),
            None => self.load_or_stub(&stub_path(link)),
        }
    }

    /// Every note backed by a file, by path.
    pub fn all_notes(&self) -> Vec<Arc<Note>> {
        self.notes
            .read()
            .values()
            .filter(|note| !note.is_stub())
            .cloned()
            .collect()
    }

    /// Notes of `notetype` or of any type descending from it.
    pub fn all_notes_of_type(&self, notetype: &str) -> Vec<Arc<Note>> {
        self.all_notes()
            .into_iter()
            .filter(|note| self.registry.is_a(note.notetype(), notetype))
            .collect()
    }

    pub fn stubs(&self) -> Vec<Arc<Note>> {
        self.notes
            .read()
            .values()
            .filter(|note| note.is_stub())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.notes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.read().is_empty()
    }

    pub fn is_tombstoned(&self, path: &str) -> bool {
        self.deleted.read().contains(path)
    }

    /// Read-modify-write of a note's frontmatter through the vault.
    ///
    /// The cached note is rebuilt from the mapping that was written, not from the host's
    /// metadata index, and a `Change` is published. The metadata-changed event the write causes
    /// later rebuilds the same state again.
    pub fn modify_frontmatter<F>(&self, path: &str, modify: F) -> Result<Arc<Note>, NotetypeError>
    where
        F: FnOnce(&mut Frontmatter),
    {
        let current = self
            .get(path, false)
            .filter(|note| !note.is_stub())
            .ok_or_else(|| NotetypeError::NotFound(path.to_string()))?;
        let text = self.vault.read_file_text(path)?;
        let mut frontmatter = parse_frontmatter(&text)?.unwrap_or_default();
        modify(&mut frontmatter);
        let spec = self.registry.frontmatter_spec(current.notetype());
        let ordered = order_frontmatter(&frontmatter, &spec);
        self.vault
            .write_file(path, &replace_frontmatter(&text, &ordered)?)?;

        let settings = self.settings();
        let note = Arc::new(Note::from_frontmatter(
            path,
            Some(&ordered),
            &self.registry,
            &settings,
        ));
        let previous = self.notes.write().insert(path.to_string(), note.clone());
        tracing::debug!("[NoteCache::modify_frontmatter] rewrote {path}");
        self.publish(&CacheUpdate::Change(
            previous.unwrap_or(current),
            note.clone(),
        ));
        Ok(note)
    }
}
