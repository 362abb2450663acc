//! The note creation pipeline.
//!
//! [prepare_note] turns a [NoteDraft] into the exact text and path of the new file without
//! touching the vault. [commit_note] then writes it, unless a file already sits at that path.
//! Every rejection happens during preparation, so a failed creation never leaves a partial
//! file behind.
//!
//! [create_note_and_wait] additionally waits for the cache to pick the new file up, bounded by
//! [Settings::creation_timeout].

use std::{collections::BTreeMap, sync::Arc};

use chrono::{Local, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;
use unicode_normalization::UnicodeNormalization;

use crate::{
    cache::NoteCache,
    config::Settings,
    error::NotetypeError,
    event::VaultEvent,
    frontmatter::{
        is_truthy, order_frontmatter, process_frontmatter, Frontmatter, ARCHIVED_FIELD,
        CREATED_AT_FIELD, DATETIME_FORMAT,
    },
    markdown::render_note,
    note::Note,
    registry::{TypeRegistry, ARCHIVED_TYPE, GENERIC_TYPE},
    vault::Vault,
};

static ILLEGAL_TITLE_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[\\/:*?"<>|#^\[\]]"#).expect("static title regex compiles")
});

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("static whitespace regex compiles"));

/// NFC-normalizes a title and drops characters that cannot appear in a vault file name.
pub fn sanitize_title(title: &str) -> String {
    let normalized: String = title.nfc().collect();
    let stripped = ILLEGAL_TITLE_CHARS.replace_all(&normalized, "");
    WHITESPACE_RUN.replace_all(stripped.trim(), " ").into_owned()
}

/// The user's input for a new note.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteDraft {
    /// Type tag; derived from `folder` when absent
    pub notetype: Option<String>,
    pub title: String,
    /// Destination folder; the type's configured folder when absent
    pub folder: Option<String>,
    /// Body; the type's default content when absent
    pub content: Option<String>,
    /// Frontmatter overrides
    pub frontmatter: Frontmatter,
    /// Free-form input consumed by type hooks, like a log's `date`
    pub extra: BTreeMap<String, String>,
}

impl NoteDraft {
    pub fn new(title: &str) -> Self {
        NoteDraft {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, notetype: &str) -> Self {
        self.notetype = Some(notetype.to_string());
        self
    }

    pub fn with_folder(mut self, folder: &str) -> Self {
        self.folder = Some(folder.to_string());
        self
    }

    pub fn with_content(mut self, content: &str) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.frontmatter.insert(Value::from(key), value.into());
        self
    }

    pub fn with_extra(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key.to_string(), value.to_string());
        self
    }
}

/// What type hooks get to see besides the draft.
#[derive(Debug, Clone, Copy)]
pub struct CreationContext<'a> {
    pub now: NaiveDateTime,
    pub settings: &'a Settings,
}

impl<'a> CreationContext<'a> {
    pub fn new(now: NaiveDateTime, settings: &'a Settings) -> Self {
        CreationContext { now, settings }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }
}

/// A fully resolved note, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedNote {
    pub notetype: String,
    pub folder: String,
    pub path: String,
    pub frontmatter: Frontmatter,
    pub text: String,
}

/// Outcome of a creation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatedNote {
    Created(String),
    /// A file was already at the path and was left alone
    Existing(String),
}

impl CreatedNote {
    pub fn path(&self) -> &str {
        match self {
            CreatedNote::Created(path) | CreatedNote::Existing(path) => path,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, CreatedNote::Created(_))
    }
}

fn resolve_notetype(
    draft: &NoteDraft,
    registry: &TypeRegistry,
    settings: &Settings,
) -> Result<String, NotetypeError> {
    if draft
        .frontmatter
        .get(ARCHIVED_FIELD)
        .map(is_truthy)
        .unwrap_or(false)
    {
        return Ok(ARCHIVED_TYPE.to_string());
    }
    let tag = match draft.notetype.as_deref() {
        Some(tag) => tag.to_string(),
        None => draft
            .folder
            .as_deref()
            .map(|folder| format!("{}/", folder.trim_end_matches('/')))
            .and_then(|prefix| settings.type_for_path(&prefix).map(str::to_string))
            .unwrap_or_else(|| GENERIC_TYPE.to_string()),
    };
    if !registry.is_concrete(&tag) {
        return Err(NotetypeError::UnknownType(tag));
    }
    Ok(tag)
}

/// Runs every creation step short of touching the vault.
pub fn prepare_note(
    draft: NoteDraft,
    registry: &TypeRegistry,
    settings: &Settings,
    now: NaiveDateTime,
) -> Result<PreparedNote, NotetypeError> {
    let mut draft = draft;
    let notetype = resolve_notetype(&draft, registry, settings)?;
    draft.notetype = Some(notetype.clone());

    let ctx = CreationContext::new(now, settings);
    if !(registry.process_note_data_fn(&notetype))(&mut draft, &ctx) {
        return Err(NotetypeError::Creation(format!(
            "the {notetype} draft '{}' was rejected",
            draft.title
        )));
    }
    let title = sanitize_title(&draft.title);
    if title.is_empty() {
        return Err(NotetypeError::Creation("the title is empty".to_string()));
    }

    let spec = registry.frontmatter_spec(&notetype);
    let mut frontmatter = process_frontmatter(&draft.frontmatter, &spec, true);
    frontmatter.insert(
        Value::from(CREATED_AT_FIELD),
        Value::from(now.format(DATETIME_FORMAT).to_string()),
    );
    let frontmatter = order_frontmatter(&frontmatter, &spec);

    let folder = match draft.folder.as_deref() {
        Some(folder) => folder.trim_matches('/').to_string(),
        None => match settings.folder_for(&notetype) {
            Some(folder) => folder.trim_matches('/').to_string(),
            None if notetype == GENERIC_TYPE => String::new(),
            None => {
                return Err(NotetypeError::Creation(format!(
                    "no folder is configured for {notetype} notes"
                )))
            }
        },
    };
    let path = if folder.is_empty() {
        format!("{title}.md")
    } else {
        format!("{folder}/{title}.md")
    };

    let content = match draft.content.as_deref() {
        Some(content) => content.to_string(),
        None => (registry.default_content_fn(&notetype))(&draft, &title),
    };
    let text = render_note(&frontmatter, &content)?;
    Ok(PreparedNote {
        notetype,
        folder,
        path,
        frontmatter,
        text,
    })
}

/// Writes a prepared note, creating its folder first. An existing file is never overwritten.
pub fn commit_note(prepared: &PreparedNote, vault: &dyn Vault) -> Result<CreatedNote, NotetypeError> {
    if vault.file_exists(&prepared.path) {
        tracing::warn!("[commit_note] {} already exists", prepared.path);
        vault.notice(&format!("{} already exists", prepared.path));
        return Ok(CreatedNote::Existing(prepared.path.clone()));
    }
    if !prepared.folder.is_empty() && !vault.folder_exists(&prepared.folder) {
        vault.create_folder(&prepared.folder)?;
    }
    vault.write_file(&prepared.path, &prepared.text)?;
    tracing::info!("[commit_note] created {} ({})", prepared.path, prepared.notetype);
    Ok(CreatedNote::Created(prepared.path.clone()))
}

fn report<T>(vault: &dyn Vault, result: Result<T, NotetypeError>) -> Result<T, NotetypeError> {
    if let Err(error) = result.as_ref() {
        tracing::warn!("[create_note] {error}");
        if error.is_user_facing() {
            vault.notice(&error.to_string());
        }
    }
    result
}

/// Creates a note stamped with the current local time.
pub fn create_note(cache: &NoteCache, draft: NoteDraft) -> Result<CreatedNote, NotetypeError> {
    create_note_at(cache, draft, Local::now().naive_local())
}

pub fn create_note_at(
    cache: &NoteCache,
    draft: NoteDraft,
    now: NaiveDateTime,
) -> Result<CreatedNote, NotetypeError> {
    let settings = cache.settings();
    let result = prepare_note(draft, cache.registry(), &settings, now)
        .and_then(|prepared| commit_note(&prepared, cache.vault()));
    report(cache.vault(), result)
}

/// Creates a note and returns it once the cache has handled its creation.
///
/// The waiter is registered before the write so the cache's own create handling resolves it.
/// When that does not happen within the creation timeout the file is loaded directly, as if
/// the host had delivered the event. An existing file is returned as is.
pub async fn create_note_and_wait(
    cache: &NoteCache,
    draft: NoteDraft,
) -> Result<Arc<Note>, NotetypeError> {
    let settings = cache.settings();
    let now = Local::now().naive_local();
    let prepared = report(
        cache.vault(),
        prepare_note(draft, cache.registry(), &settings, now),
    )?;

    let receiver = cache.expect_creation(&prepared.path);
    match report(cache.vault(), commit_note(&prepared, cache.vault())) {
        Ok(created) if created.is_new() => {}
        other => {
            cache.release_creation(&prepared.path, receiver);
            let created = other?;
            return cache
                .get(created.path(), false)
                .ok_or_else(|| NotetypeError::NotFound(created.path().to_string()));
        }
    }

    match tokio::time::timeout(settings.creation_timeout(), receiver).await {
        Ok(Ok(note)) => Ok(note),
        Ok(Err(_)) | Err(_) => {
            tracing::warn!(
                "[create_note_and_wait] no create event for {} within {:?}, loading directly",
                prepared.path,
                settings.creation_timeout()
            );
            cache.handle_event(&VaultEvent::Created(prepared.path.clone()));
            cache.get(&prepared.path, false).ok_or_else(|| {
                NotetypeError::Timeout(format!("cache entry for {}", prepared.path))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::NOTETYPE_FIELD;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("  a/b: c?  "), "ab c");
        assert_eq!(sanitize_title("[[x]] #tag"), "x tag");
        // Decomposed e + combining acute becomes one code point
        assert_eq!(sanitize_title("Caf\u{0065}\u{0301}"), "Caf\u{00e9}");
        assert_eq!(sanitize_title("///"), "");
    }

    #[test]
    fn test_type_comes_from_folder_or_archived_flag() {
        let registry = TypeRegistry::builtin();
        let settings = Settings::default().with_folder("zettel", "Zettels");
        let draft = NoteDraft::new("x").with_folder("Zettels");
        assert_eq!(resolve_notetype(&draft, &registry, &settings).unwrap(), "zettel");

        let draft = NoteDraft::new("x")
            .with_type("zettel")
            .with_field("archived", true);
        assert_eq!(resolve_notetype(&draft, &registry, &settings).unwrap(), ARCHIVED_TYPE);

        let draft = NoteDraft::new("x").with_type("dated");
        assert_eq!(
            resolve_notetype(&draft, &registry, &settings),
            Err(NotetypeError::UnknownType("dated".to_string()))
        );
    }

    #[test]
    fn test_prepare_orders_fields_and_stamps_creation() {
        let registry = TypeRegistry::builtin();
        let settings = Settings::default().with_folder("zettel", "Zettels/");
        let draft = NoteDraft::new("Ownership")
            .with_type("zettel")
            .with_field("zz-extra", "kept")
            .with_field("createdat", "1999-01-01T00:00:00")
            .with_field("notetype", "log");
        let prepared = prepare_note(draft, &registry, &settings, now()).unwrap();
        assert_eq!(prepared.path, "Zettels/Ownership.md");
        let keys: Vec<&str> = prepared.frontmatter.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec![NOTETYPE_FIELD, CREATED_AT_FIELD, "zz-extra"]);
        assert_eq!(
            prepared.frontmatter.get(NOTETYPE_FIELD),
            Some(&Value::from("zettel"))
        );
        assert_eq!(
            prepared.frontmatter.get(CREATED_AT_FIELD),
            Some(&Value::from("2024-01-01T08:00:00"))
        );
        assert!(prepared.text.starts_with("---\nnotetype: zettel\n"));
        assert!(prepared.text.ends_with("---\n\n# Ownership\n\n"));
    }

    #[test]
    fn test_prepare_rejections() {
        let registry = TypeRegistry::builtin();
        let settings = Settings::default();
        let unplaced = prepare_note(NoteDraft::new("x").with_type("zettel"), &registry, &settings, now());
        assert!(matches!(unplaced, Err(NotetypeError::Creation(_))));

        let untitled = prepare_note(NoteDraft::new("  "), &registry, &settings, now());
        assert!(matches!(untitled, Err(NotetypeError::Creation(_))));

        let generic = prepare_note(NoteDraft::new("Loose"), &registry, &settings, now()).unwrap();
        assert_eq!(generic.path, "Loose.md");
    }
}
