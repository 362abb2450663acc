//! The host vault as seen by the note cache.
//!
//! A [Vault] is a set of path-addressable text files plus the metadata a host derives from
//! them: parsed frontmatter and the resolved/unresolved link graph. Paths are vault-relative
//! and use forward slashes. [MemoryVault] keeps everything in memory and records the
//! [crate::event::VaultEvent]s a host would emit; [FsVault] mirrors a directory on disk.

use std::collections::{BTreeMap, BTreeSet};

use crate::{error::NotetypeError, frontmatter::Frontmatter};

mod fs;
mod index;
mod memory;

pub use fs::FsVault;
pub use index::{stub_path, LinkIndex};
pub use memory::MemoryVault;

pub trait Vault: Send + Sync {
    fn read_file_text(&self, path: &str) -> Result<String, NotetypeError>;

    /// Creates or overwrites a file. Parent folders must already exist.
    fn write_file(&self, path: &str, text: &str) -> Result<(), NotetypeError>;

    fn file_exists(&self, path: &str) -> bool;

    fn folder_exists(&self, path: &str) -> bool;

    /// Creates a folder and any missing ancestors.
    fn create_folder(&self, path: &str) -> Result<(), NotetypeError>;

    /// Every file path in the vault, sorted.
    fn list_files(&self) -> Vec<String>;

    /// Parsed frontmatter of a file as the host's metadata cache currently sees it.
    fn frontmatter(&self, path: &str) -> Option<Frontmatter>;

    /// Resolved outgoing links of a file: target path to occurrence count.
    fn forward_links(&self, path: &str) -> BTreeMap<String, usize>;

    /// Files linking to `path`, with occurrence counts.
    fn backlinks(&self, path: &str) -> Vec<(String, usize)>;

    /// Link texts that resolve to no file, keyed by the file they occur in.
    fn unresolved_links(&self) -> BTreeMap<String, BTreeSet<String>>;

    /// Resolves link text as written in `source` to a file path.
    fn resolve_link(&self, link: &str, source: &str) -> Option<String>;

    /// A user-visible message.
    fn notice(&self, message: &str) {
        tracing::info!("[Vault::notice] {message}");
    }
}
