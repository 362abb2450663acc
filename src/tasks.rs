//! Checkbox tasks across the vault, kept current by a cache subscription.

use std::{
    collections::BTreeMap,
    sync::{Arc, Weak},
};

use parking_lot::{Mutex, RwLock};

use crate::{
    cache::{NoteCache, Subscription},
    event::CacheUpdate,
    markdown::split_frontmatter,
    note::Note,
    vault::Vault,
};

pub use crate::markdown::{extract_tasks, Task};

type TaskMap = RwLock<BTreeMap<String, Vec<Task>>>;

fn read_tasks(vault: &dyn Vault, note: &Note) -> Vec<Task> {
    if note.is_stub() {
        return Vec::new();
    }
    match vault.read_file_text(note.path()) {
        Ok(text) => {
            let (_, body) = split_frontmatter(&text);
            extract_tasks(body)
        }
        Err(error) => {
            tracing::debug!("[TaskIndex] {} unreadable: {error}", note.path());
            Vec::new()
        }
    }
}

fn index_all(tasks: &TaskMap, cache: &NoteCache) {
    let mut indexed = BTreeMap::new();
    for note in cache.all_notes() {
        let found = read_tasks(cache.vault(), &note);
        if !found.is_empty() {
            indexed.insert(note.path().to_string(), found);
        }
    }
    *tasks.write() = indexed;
}

fn index_note(tasks: &TaskMap, vault: &dyn Vault, note: &Note) {
    let found = read_tasks(vault, note);
    let mut tasks = tasks.write();
    if found.is_empty() {
        tasks.remove(note.path());
    } else {
        tasks.insert(note.path().to_string(), found);
    }
}

/// Tasks per note path.
#[derive(Debug, Default)]
pub struct TaskIndex {
    tasks: Arc<TaskMap>,
    subscription: Mutex<Option<Subscription>>,
}

impl TaskIndex {
    /// Indexes every note in `cache` and follows its updates until [TaskIndex::detach].
    pub fn attach(cache: &Arc<NoteCache>) -> TaskIndex {
        let tasks: Arc<TaskMap> = Arc::new(RwLock::new(BTreeMap::new()));
        index_all(&tasks, cache);

        let weak_tasks = Arc::downgrade(&tasks);
        let weak_cache: Weak<NoteCache> = Arc::downgrade(cache);
        let subscription = cache.subscribe(move |update| {
            let (Some(tasks), Some(cache)) = (weak_tasks.upgrade(), weak_cache.upgrade()) else {
                return;
            };
            match update {
                CacheUpdate::Create(note) | CacheUpdate::Change(_, note) => {
                    index_note(&tasks, cache.vault(), note)
                }
                CacheUpdate::Delete(note) => {
                    tasks.write().remove(note.path());
                }
                CacheUpdate::Rename(from, note) => {
                    let mut tasks = tasks.write();
                    if let Some(moved) = tasks.remove(from) {
                        tasks.insert(note.path().to_string(), moved);
                    }
                }
                CacheUpdate::Reload => index_all(&tasks, &cache),
            }
        });
        tracing::debug!(
            "[TaskIndex::attach] {} notes with tasks",
            tasks.read().len()
        );
        TaskIndex {
            tasks,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    /// Stops following cache updates. The index keeps its last state.
    pub fn detach(&self) -> bool {
        self.subscription
            .lock()
            .take()
            .map(Subscription::unsubscribe)
            .unwrap_or(false)
    }

    pub fn tasks_for(&self, path: &str) -> Vec<Task> {
        self.tasks.read().get(path).cloned().unwrap_or_default()
    }

    /// Every unchecked task with the path of its note.
    pub fn open_tasks(&self) -> Vec<(String, Task)> {
        self.tasks
            .read()
            .iter()
            .flat_map(|(path, tasks)| {
                tasks
                    .iter()
                    .filter(|task| !task.done)
                    .map(move |task| (path.clone(), task.clone()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tasks of a planner note. Without a task index the user is told and nothing is returned.
pub fn planner_tasks(index: Option<&TaskIndex>, note: &Note, vault: &dyn Vault) -> Vec<Task> {
    match index {
        Some(index) => index.tasks_for(note.path()),
        None => {
            tracing::warn!("[planner_tasks] no task index for {}", note.path());
            vault.notice("Task indexing is not available, planner tasks cannot be listed");
            Vec::new()
        }
    }
}
