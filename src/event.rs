use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};

use crate::note::Note;

/// A change notification delivered by the host vault. Paths are vault-relative with forward
/// slashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    Created(String),
    Deleted(String),
    /// From path, To path
    Renamed(String, String),
    /// Frontmatter or content changed in a way that affects derived state
    MetadataChanged(String),
}

impl VaultEvent {
    /// The path the event leaves behind in the vault (the new path for renames).
    pub fn path(&self) -> &str {
        match self {
            VaultEvent::Created(path) => path,
            VaultEvent::Deleted(path) => path,
            VaultEvent::Renamed(_, to) => to,
            VaultEvent::MetadataChanged(path) => path,
        }
    }
}

impl Display for VaultEvent {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VaultEvent::Created(path) => write!(f, "Created({path})"),
            VaultEvent::Deleted(path) => write!(f, "Deleted({path})"),
            VaultEvent::Renamed(from, to) => write!(f, "Renamed({from} -> {to})"),
            VaultEvent::MetadataChanged(path) => write!(f, "MetadataChanged({path})"),
        }
    }
}

/// An update published by the [crate::cache::NoteCache] to its subscribers, always after the
/// cache mutation for the event has been committed.
#[derive(Debug, Clone)]
pub enum CacheUpdate {
    Create(Arc<Note>),
    /// The removed note, for subscriber bookkeeping
    Delete(Arc<Note>),
    /// Old note, reconstructed note
    Change(Arc<Note>, Arc<Note>),
    /// Old path, moved note
    Rename(String, Arc<Note>),
    /// The whole cache was rebuilt
    Reload,
}

impl CacheUpdate {
    /// Path of the note the update concerns after the update was applied.
    pub fn path(&self) -> Option<&str> {
        match self {
            CacheUpdate::Create(note) => Some(note.path()),
            CacheUpdate::Delete(note) => Some(note.path()),
            CacheUpdate::Change(_, new) => Some(new.path()),
            CacheUpdate::Rename(_, note) => Some(note.path()),
            CacheUpdate::Reload => None,
        }
    }
}

impl PartialEq for CacheUpdate {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Create(l0), Self::Create(r0)) => l0 == r0,
            (Self::Delete(l0), Self::Delete(r0)) => l0 == r0,
            (Self::Change(l0, l1), Self::Change(r0, r1)) => l0 == r0 && l1 == r1,
            (Self::Rename(l0, l1), Self::Rename(r0, r1)) => l0 == r0 && l1 == r1,
            (Self::Reload, Self::Reload) => true,
            _ => false,
        }
    }
}

impl Display for CacheUpdate {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CacheUpdate::Create(_) => write!(f, "Create"),
            CacheUpdate::Delete(_) => write!(f, "Delete"),
            CacheUpdate::Change(_, _) => write!(f, "Change"),
            CacheUpdate::Rename(_, _) => write!(f, "Rename"),
            CacheUpdate::Reload => write!(f, "Reload"),
        }
    }
}
