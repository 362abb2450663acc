use std::collections::{BTreeMap, BTreeSet};

use crate::{
    frontmatter::Frontmatter,
    markdown::{extract_frontmatter_links, extract_links, parse_frontmatter, split_frontmatter},
};

const NOTE_EXTENSION: &str = ".md";

/// Vault path a link target would have as a note: `[[Projects/Alpha]]` is `Projects/Alpha.md`.
pub fn stub_path(link: &str) -> String {
    let target = link.trim().trim_start_matches('/');
    if target.ends_with(NOTE_EXTENSION) {
        target.to_string()
    } else {
        format!("{target}{NOTE_EXTENSION}")
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

#[derive(Debug, Clone, Default)]
struct IndexedFile {
    frontmatter: Option<Frontmatter>,
    /// Link targets in document order, frontmatter links first
    links: Vec<String>,
}

impl IndexedFile {
    /// File names the links could resolve to. A link only ever resolves to a path ending in
    /// its candidate's file name.
    fn target_names(&self) -> BTreeSet<String> {
        self.links
            .iter()
            .map(|link| file_name(&stub_path(link)).to_string())
            .collect()
    }
}

/// Metadata a host derives from note text: parsed frontmatter and the link graph.
///
/// Links are stored as written and resolved whenever a file they could point to appears or
/// goes away, so a file created later resolves links that were dangling when they were
/// indexed. Resolved links are kept in both directions.
#[derive(Debug, Clone)]
pub struct LinkIndex {
    files: BTreeMap<String, IndexedFile>,
    /// File name to the indexed paths carrying it
    by_name: BTreeMap<String, BTreeSet<String>>,
    /// File name to the sources holding a link that could resolve to it
    dependents: BTreeMap<String, BTreeSet<String>>,
    outgoing: BTreeMap<String, BTreeMap<String, usize>>,
    incoming: BTreeMap<String, BTreeMap<String, usize>>,
    index_frontmatter_links: bool,
}

impl Default for LinkIndex {
    fn default() -> Self {
        LinkIndex {
            files: BTreeMap::new(),
            by_name: BTreeMap::new(),
            dependents: BTreeMap::new(),
            outgoing: BTreeMap::new(),
            incoming: BTreeMap::new(),
            index_frontmatter_links: true,
        }
    }
}

impl LinkIndex {
    pub fn new() -> Self {
        LinkIndex::default()
    }

    /// Whether wikilinks in frontmatter values (like `parent`) count as links. On by default.
    /// Files indexed earlier keep their links until they are updated again.
    pub fn set_index_frontmatter_links(&mut self, enabled: bool) {
        self.index_frontmatter_links = enabled;
    }

    pub fn update(&mut self, path: &str, text: &str) {
        let frontmatter = match parse_frontmatter(text) {
            Ok(frontmatter) => frontmatter,
            Err(error) => {
                tracing::warn!("[LinkIndex::update] {path}: unreadable frontmatter: {error}");
                None
            }
        };
        let mut links = Vec::new();
        if self.index_frontmatter_links {
            if let Some(frontmatter) = frontmatter.as_ref() {
                links.extend(
                    extract_frontmatter_links(frontmatter)
                        .into_iter()
                        .map(|link| link.target),
                );
            }
        }
        let (_, body) = split_frontmatter(text);
        links.extend(extract_links(body).into_iter().map(|link| link.target));
        self.insert(path, IndexedFile { frontmatter, links });
    }

    pub fn remove(&mut self, path: &str) -> bool {
        if self.take(path).is_none() {
            return false;
        }
        self.refresh_dependents(file_name(path), None);
        true
    }

    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(file) = self.take(from) {
            self.refresh_dependents(file_name(from), None);
            self.insert(to, file);
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn frontmatter(&self, path: &str) -> Option<Frontmatter> {
        self.files.get(path).and_then(|file| file.frontmatter.clone())
    }

    /// Resolution order: exact vault path, path relative to the source's folder, then the
    /// shortest indexed path with a matching file name.
    pub fn resolve(&self, link: &str, source: &str) -> Option<String> {
        let candidate = stub_path(link);
        if self.files.contains_key(&candidate) {
            return Some(candidate);
        }
        if let Some((folder, _)) = source.rsplit_once('/') {
            let relative = format!("{folder}/{candidate}");
            if self.files.contains_key(&relative) {
                return Some(relative);
            }
        }
        let suffix = format!("/{candidate}");
        self.by_name
            .get(file_name(&candidate))?
            .iter()
            .filter(|path| path.ends_with(&suffix))
            .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
            .cloned()
    }

    pub fn forward_links(&self, path: &str) -> BTreeMap<String, usize> {
        self.outgoing.get(path).cloned().unwrap_or_default()
    }

    pub fn backlinks(&self, path: &str) -> Vec<(String, usize)> {
        self.incoming
            .get(path)
            .map(|sources| {
                sources
                    .iter()
                    .map(|(source, count)| (source.clone(), *count))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn unresolved_links(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut unresolved: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (source, file) in self.files.iter() {
            for link in file.links.iter() {
                if self.resolve(link, source).is_none() {
                    unresolved
                        .entry(source.clone())
                        .or_default()
                        .insert(link.clone());
                }
            }
        }
        unresolved
    }

    fn insert(&mut self, path: &str, file: IndexedFile) {
        let is_new = self.take(path).is_none();
        for name in file.target_names() {
            self.dependents
                .entry(name)
                .or_default()
                .insert(path.to_string());
        }
        self.files.insert(path.to_string(), file);
        self.by_name
            .entry(file_name(path).to_string())
            .or_default()
            .insert(path.to_string());
        self.refresh(path);
        if is_new {
            self.refresh_dependents(file_name(path), Some(path));
        }
    }

    /// Removes a file with its names and outgoing links. Links pointing at it are left for
    /// the caller to refresh.
    fn take(&mut self, path: &str) -> Option<IndexedFile> {
        let file = self.files.remove(path)?;
        for name in file.target_names() {
            if let Some(sources) = self.dependents.get_mut(&name) {
                sources.remove(path);
                if sources.is_empty() {
                    self.dependents.remove(&name);
                }
            }
        }
        let name = file_name(path);
        if let Some(paths) = self.by_name.get_mut(name) {
            paths.remove(path);
            if paths.is_empty() {
                self.by_name.remove(name);
            }
        }
        self.detach(path);
        Some(file)
    }

    fn detach(&mut self, source: &str) {
        let Some(previous) = self.outgoing.remove(source) else {
            return;
        };
        for target in previous.keys() {
            if let Some(sources) = self.incoming.get_mut(target) {
                sources.remove(source);
                if sources.is_empty() {
                    self.incoming.remove(target);
                }
            }
        }
    }

    /// Re-resolves the links of `source`.
    fn refresh(&mut self, source: &str) {
        self.detach(source);
        let resolved = {
            let Some(file) = self.files.get(source) else {
                return;
            };
            let mut resolved: BTreeMap<String, usize> = BTreeMap::new();
            for link in file.links.iter() {
                if let Some(target) = self.resolve(link, source) {
                    *resolved.entry(target).or_insert(0) += 1;
                }
            }
            resolved
        };
        for (target, count) in resolved.iter() {
            self.incoming
                .entry(target.clone())
                .or_default()
                .insert(source.to_string(), *count);
        }
        self.outgoing.insert(source.to_string(), resolved);
    }

    /// Re-resolves every source whose links could point at a file called `name`.
    fn refresh_dependents(&mut self, name: &str, skip: Option<&str>) {
        let sources: Vec<String> = self
            .dependents
            .get(name)
            .map(|sources| {
                sources
                    .iter()
                    .filter(|source| Some(source.as_str()) != skip)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        for source in sources {
            self.refresh(&source);
        }
    }
}
