use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Component, Path, PathBuf},
};

use walkdir::WalkDir;

use crate::{error::NotetypeError, event::VaultEvent, frontmatter::Frontmatter};

use super::{MemoryVault, Vault};

/// A vault backed by a directory. Metadata is kept in memory and refreshed through
/// [FsVault::sync_path] when the directory changes behind our back.
#[derive(Debug)]
pub struct FsVault {
    root: PathBuf,
    extensions: Vec<String>,
    mirror: MemoryVault,
}

fn is_hidden(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => name.to_str().map(|n| n.starts_with('.')).unwrap_or(false),
        _ => false,
    })
}

impl FsVault {
    /// Scans `root` for files with one of `extensions`. Hidden files and folders are skipped.
    pub fn open<P: AsRef<Path>>(root: P, extensions: &[String]) -> Result<Self, NotetypeError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(NotetypeError::NotFound(format!("vault root {root:?}")));
        }
        let vault = FsVault {
            root,
            extensions: extensions.to_vec(),
            mirror: MemoryVault::new(),
        };
        let mut loaded = 0;
        for entry in WalkDir::new(&vault.root).follow_links(false) {
            let entry = entry?;
            let Some(relative) = vault.relative_path(entry.path()) else {
                continue;
            };
            if relative.is_empty() || is_hidden(Path::new(&relative)) {
                continue;
            }
            if entry.file_type().is_dir() {
                vault.mirror.create_folder(&relative)?;
            } else if vault.is_tracked(&relative) {
                let text = fs::read_to_string(entry.path())?;
                vault.mirror.store_untracked(&relative, &text);
                loaded += 1;
            }
        }
        tracing::info!("[FsVault::open] loaded {loaded} files from {:?}", vault.root);
        Ok(vault)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_tracked(&self, path: &str) -> bool {
        path.rsplit_once('.')
            .map(|(_, ext)| self.extensions.iter().any(|known| known == ext))
            .unwrap_or(false)
    }

    fn absolute(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Vault-relative, forward-slash form of an absolute path under the root.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|component| match component {
                Component::Normal(name) => name.to_str(),
                _ => None,
            })
            .collect::<Option<_>>()?;
        Some(parts.join("/"))
    }

    /// Refreshes one path from disk and returns the event describing what changed, if
    /// anything.
    pub fn sync_path(&self, path: &str) -> Result<Option<VaultEvent>, NotetypeError> {
        if !self.is_tracked(path) || is_hidden(Path::new(path)) {
            return Ok(None);
        }
        let absolute = self.absolute(path);
        if absolute.is_file() {
            let text = fs::read_to_string(&absolute)?;
            if self.mirror.read_file_text(path).ok().as_deref() == Some(text.as_str()) {
                // Already seen, typically a write made through this vault
                return Ok(None);
            }
            let is_new = self.mirror.store_untracked(path, &text);
            return Ok(Some(if is_new {
                VaultEvent::Created(path.to_string())
            } else {
                VaultEvent::MetadataChanged(path.to_string())
            }));
        }
        if self.mirror.remove_untracked(path) {
            return Ok(Some(VaultEvent::Deleted(path.to_string())));
        }
        Ok(None)
    }

    /// Refreshes a rename reported by the filesystem.
    pub fn sync_rename(&self, from: &str, to: &str) -> Result<Option<VaultEvent>, NotetypeError> {
        if !self.mirror.rename_untracked(from, to) {
            return self.sync_path(to);
        }
        let absolute = self.absolute(to);
        if absolute.is_file() {
            let text = fs::read_to_string(&absolute)?;
            self.mirror.store_untracked(to, &text);
        }
        Ok(Some(VaultEvent::Renamed(from.to_string(), to.to_string())))
    }

    /// Events caused by writes made through this vault. Whoever drives the cache must drain
    /// them; [crate::watch::VaultWatcher] does so with every batch of changes.
    pub fn drain_events(&self) -> Vec<VaultEvent> {
        self.mirror.drain_events()
    }

    pub fn queued_events(&self) -> usize {
        self.mirror.queued_events()
    }

    pub fn notices(&self) -> Vec<String> {
        self.mirror.notices()
    }
}

impl Vault for FsVault {
    fn read_file_text(&self, path: &str) -> Result<String, NotetypeError> {
        let absolute = self.absolute(path);
        if !absolute.is_file() {
            return Err(NotetypeError::NotFound(path.to_string()));
        }
        Ok(fs::read_to_string(absolute)?)
    }

    fn write_file(&self, path: &str, text: &str) -> Result<(), NotetypeError> {
        let absolute = self.absolute(path);
        if let Some(parent) = absolute.parent() {
            if !parent.is_dir() {
                return Err(NotetypeError::NotFound(format!("folder {parent:?}")));
            }
        }
        tracing::debug!("[FsVault::write_file] {path}");
        fs::write(&absolute, text)?;
        if let Some((folder, _)) = path.rsplit_once('/') {
            self.mirror.create_folder(folder)?;
        }
        self.mirror.write_file(path, text)
    }

    fn file_exists(&self, path: &str) -> bool {
        !is_hidden(Path::new(path)) && self.absolute(path).is_file()
    }

    fn folder_exists(&self, path: &str) -> bool {
        self.absolute(path).is_dir()
    }

    fn create_folder(&self, path: &str) -> Result<(), NotetypeError> {
        fs::create_dir_all(self.absolute(path))?;
        self.mirror.create_folder(path)
    }

    fn list_files(&self) -> Vec<String> {
        self.mirror.list_files()
    }

    fn frontmatter(&self, path: &str) -> Option<Frontmatter> {
        self.mirror.frontmatter(path)
    }

    fn forward_links(&self, path: &str) -> BTreeMap<String, usize> {
        self.mirror.forward_links(path)
    }

    fn backlinks(&self, path: &str) -> Vec<(String, usize)> {
        self.mirror.backlinks(path)
    }

    fn unresolved_links(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.mirror.unresolved_links()
    }

    fn resolve_link(&self, link: &str, source: &str) -> Option<String> {
        self.mirror.resolve_link(link, source)
    }

    fn notice(&self, message: &str) {
        self.mirror.notice(message)
    }
}
