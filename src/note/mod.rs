//! The runtime entity for one classified file.
//!
//! A [Note] is immutable once built. Its link sets are computed on first use and memoized for
//! the lifetime of the instance; the [NoteCache] replaces the instance wholesale when the
//! file's metadata changes. Relationships are handed out as `Arc<Note>`s looked up through the
//! cache, never stored, so a note never keeps a stale neighbour alive.

use std::{
    collections::BTreeSet,
    hash::{Hash, Hasher},
    sync::Arc,
};

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::OnceCell;
use serde_yaml::Mapping;

use crate::{
    cache::NoteCache,
    config::Settings,
    error::NotetypeError,
    frontmatter::{
        get_str, process_frontmatter, FieldKind, FieldValue, Frontmatter, CREATED_AT_FIELD,
        PARENT_FIELD,
    },
    markdown::parse_link,
    registry::{TypeRegistry, GENERIC_TYPE},
    vault::{stub_path, Vault},
};

mod tree;

pub use tree::{NoteTree, TreeOutline};

/// File name of a vault path without its extension.
pub fn basename_of(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

#[derive(Debug, Clone)]
pub struct Note {
    path: String,
    basename: String,
    notetype: String,
    frontmatter: Frontmatter,
    created_at: Option<NaiveDateTime>,
    is_stub: bool,
    outgoing: OnceCell<Vec<String>>,
    incoming: OnceCell<Vec<String>>,
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for Note {}

impl Hash for Note {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl Note {
    /// Classifies and builds the note for an existing file. `None` when there is no such file.
    pub fn load(
        path: &str,
        vault: &dyn Vault,
        registry: &TypeRegistry,
        settings: &Settings,
    ) -> Option<Note> {
        if !vault.file_exists(path) {
            return None;
        }
        let raw = vault.frontmatter(path);
        Some(Note::from_frontmatter(path, raw.as_ref(), registry, settings))
    }

    /// Builds a note from frontmatter already in hand, without consulting the vault.
    pub fn from_frontmatter(
        path: &str,
        raw: Option<&Frontmatter>,
        registry: &TypeRegistry,
        settings: &Settings,
    ) -> Note {
        let descriptor = registry.classify(path, raw, settings);
        let spec = registry.frontmatter_spec(descriptor.tag);
        let empty = Mapping::new();
        let frontmatter = process_frontmatter(raw.unwrap_or(&empty), &spec, false);
        let created_at = frontmatter
            .get(CREATED_AT_FIELD)
            .and_then(|value| FieldValue::read(FieldKind::DateTime, value))
            .and_then(|value| match value {
                FieldValue::DateTime(stamp) => Some(stamp),
                _ => None,
            });
        tracing::debug!("[Note::from_frontmatter] {path} -> {}", descriptor.tag);
        Note {
            path: path.to_string(),
            basename: basename_of(path).to_string(),
            notetype: descriptor.tag.to_string(),
            frontmatter,
            created_at,
            is_stub: false,
            outgoing: OnceCell::new(),
            incoming: OnceCell::new(),
        }
    }

    /// Placeholder for a link target that has no file yet.
    pub fn stub(path: &str, registry: &TypeRegistry) -> Note {
        let spec = registry.frontmatter_spec(GENERIC_TYPE);
        Note {
            path: path.to_string(),
            basename: basename_of(path).to_string(),
            notetype: GENERIC_TYPE.to_string(),
            frontmatter: process_frontmatter(&Mapping::new(), &spec, false),
            created_at: None,
            is_stub: true,
            outgoing: OnceCell::new(),
            incoming: OnceCell::new(),
        }
    }

    /// The same note under a new path. Type and frontmatter are kept; link memos are not.
    pub fn renamed(&self, path: &str) -> Note {
        Note {
            path: path.to_string(),
            basename: basename_of(path).to_string(),
            notetype: self.notetype.clone(),
            frontmatter: self.frontmatter.clone(),
            created_at: self.created_at,
            is_stub: self.is_stub,
            outgoing: OnceCell::new(),
            incoming: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn notetype(&self) -> &str {
        &self.notetype
    }

    pub fn frontmatter(&self) -> &Frontmatter {
        &self.frontmatter
    }

    pub fn created_at(&self) -> Option<NaiveDateTime> {
        self.created_at
    }

    pub fn is_stub(&self) -> bool {
        self.is_stub
    }

    /// Trimmed, non-empty string value of a frontmatter field.
    pub fn text(&self, key: &str) -> Option<&str> {
        get_str(&self.frontmatter, key)
    }

    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        self.frontmatter
            .get(key)
            .and_then(|value| FieldValue::read(FieldKind::Date, value))
            .and_then(|value| value.as_date())
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        match self
            .frontmatter
            .get(key)
            .and_then(|value| FieldValue::read(FieldKind::Bool, value))
        {
            Some(FieldValue::Bool(flag)) => Some(flag),
            _ => None,
        }
    }

    /// A field read according to the kind its type declares. Undeclared fields and values of
    /// the wrong kind give `None`.
    pub fn field(&self, registry: &TypeRegistry, key: &str) -> Option<FieldValue> {
        let spec = registry.frontmatter_spec(&self.notetype);
        spec.get(key)?.read(self.frontmatter.get(key)?)
    }

    /// Notes this note links to, stubs included for targets without a file.
    pub fn outgoing_links(&self, cache: &NoteCache) -> Vec<Arc<Note>> {
        let paths = self.outgoing.get_or_init(|| {
            if self.is_stub {
                return Vec::new();
            }
            let vault = cache.vault();
            let mut targets: Vec<String> = vault.forward_links(&self.path).into_keys().collect();
            if let Some(unresolved) = vault.unresolved_links().remove(&self.path) {
                targets.extend(unresolved.iter().map(|link| stub_path(link)));
            }
            targets
        });
        paths
            .iter()
            .filter_map(|path| cache.load_or_stub(path))
            .collect()
    }

    /// Notes linking to this note.
    pub fn incoming_links(&self, cache: &NoteCache) -> Vec<Arc<Note>> {
        let paths = self.incoming.get_or_init(|| {
            cache
                .vault()
                .backlinks(&self.path)
                .into_iter()
                .map(|(source, _)| source)
                .collect()
        });
        paths
            .iter()
            .filter_map(|path| cache.get(path, false))
            .collect()
    }

    /// The note named by the `parent` field. Values that are not exactly one wikilink and
    /// links that resolve to no file give `None`.
    pub fn parent(&self, cache: &NoteCache) -> Option<Arc<Note>> {
        let link = parse_link(self.text(PARENT_FIELD)?)?;
        let path = cache.vault().resolve_link(&link.target, &self.path)?;
        cache.get(&path, false)
    }

    /// Linking notes whose `parent` resolves to this note.
    pub fn child_notes(&self, cache: &NoteCache) -> Vec<Arc<Note>> {
        self.incoming_links(cache)
            .into_iter()
            .filter(|candidate| {
                candidate
                    .parent(cache)
                    .map(|parent| *parent == *self)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Depth-first tree of children, limited to `notetypes` when it is not empty. Children of
    /// other types are left out along with their subtrees.
    ///
    /// Meeting a note twice means the parent relation has a cycle; that fails with
    /// [NotetypeError::CycleDetected] naming the note met twice.
    pub fn descendants(
        &self,
        cache: &NoteCache,
        notetypes: &[&str],
    ) -> Result<NoteTree, NotetypeError> {
        let root = cache
            .get(&self.path, false)
            .unwrap_or_else(|| Arc::new(self.clone()));
        let mut visited = BTreeSet::from([self.path.clone()]);
        build_tree(root, cache, notetypes, &mut visited)
    }

    /// Ancestors from the root of the hierarchy down to the direct parent.
    pub fn lineage(&self, cache: &NoteCache) -> Result<Vec<Arc<Note>>, NotetypeError> {
        let mut visited = BTreeSet::from([self.path.clone()]);
        let mut lineage = Vec::new();
        let mut current = self.parent(cache);
        while let Some(ancestor) = current {
            if !visited.insert(ancestor.path.clone()) {
                tracing::warn!("[Note::lineage] cycle at {}", ancestor.path);
                return Err(NotetypeError::CycleDetected {
                    path: ancestor.path.clone(),
                });
            }
            current = ancestor.parent(cache);
            lineage.push(ancestor);
        }
        lineage.reverse();
        Ok(lineage)
    }

    pub fn validate(&self, cache: &NoteCache) -> bool {
        (cache.registry().validate_fn(&self.notetype))(self, cache)
    }

    pub fn title_prefix(&self, cache: &NoteCache) -> Option<String> {
        (cache.registry().title_prefix_fn(&self.notetype))(self, cache)
    }

    /// Stubs are gray and invalid notes red, whatever their type would pick.
    pub fn title_prefix_color(&self, cache: &NoteCache) -> Option<&'static str> {
        if self.is_stub {
            return Some("gray");
        }
        if !self.validate(cache) {
            return Some("red");
        }
        (cache.registry().title_prefix_color_fn(&self.notetype))(self, cache)
    }

    pub fn title_suffix(&self, cache: &NoteCache) -> Option<String> {
        (cache.registry().title_suffix_fn(&self.notetype))(self, cache)
    }
}

fn build_tree(
    note: Arc<Note>,
    cache: &NoteCache,
    notetypes: &[&str],
    visited: &mut BTreeSet<String>,
) -> Result<NoteTree, NotetypeError> {
    let mut tree = NoteTree::leaf(note);
    for child in tree.note.child_notes(cache) {
        if visited.contains(child.path()) {
            tracing::warn!(
                "[Note::descendants] cycle at {} below {}",
                child.path(),
                tree.note.path()
            );
            return Err(NotetypeError::CycleDetected {
                path: child.path().to_string(),
            });
        }
        if !notetypes.is_empty() && !notetypes.contains(&child.notetype()) {
            continue;
        }
        visited.insert(child.path().to_string());
        tree.children.push(build_tree(child, cache, notetypes, visited)?);
    }
    Ok(tree)
}
