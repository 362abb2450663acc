use std::fmt::Write;

use serde_yaml::Value;
use url::Url;

use crate::{
    cache::NoteCache,
    creation::{CreationContext, NoteDraft},
    frontmatter::{get_str, FieldSpec, FrontmatterSpec},
    note::Note,
    registry::{NoteBehavior, NoteTypeDescriptor, ROOT_TYPE},
};

pub const CAPTURE_SOURCE_FIELD: &str = "cap-source";
pub const CAPTURE_PROCESSED_FIELD: &str = "cap-processed";
pub const REPO_URL_FIELD: &str = "repo-url";
pub const REFERENCE_URL_FIELD: &str = "ref-url";
pub const REFERENCE_AUTHOR_FIELD: &str = "ref-author";
pub const SOURCE_AUTHOR_FIELD: &str = "src-author";
pub const SOURCE_YEAR_FIELD: &str = "src-year";
pub const SOURCE_URL_FIELD: &str = "src-url";
pub const MEMO_TO_FIELD: &str = "memo-to";

pub const URL_EXTRA: &str = "url";
pub const AUTHOR_EXTRA: &str = "author";

fn is_web_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Draft value of `field`: the frontmatter override if set, else the named extra.
fn draft_value(draft: &NoteDraft, field: &str, extra: &str) -> Option<String> {
    get_str(&draft.frontmatter, field)
        .map(str::to_string)
        .or_else(|| {
            draft
                .extra
                .get(extra)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
}

fn capture_fields() -> FrontmatterSpec {
    FrontmatterSpec::new()
        .field(CAPTURE_SOURCE_FIELD, FieldSpec::text("").skip_if_absent())
        .field(CAPTURE_PROCESSED_FIELD, FieldSpec::flag(false))
}

/// Captures are named after the moment they were taken.
fn capture_process(draft: &mut NoteDraft, ctx: &CreationContext<'_>) -> bool {
    let mut stamp = String::new();
    if write!(stamp, "{}", ctx.now.format(&ctx.settings.capture_stamp_format)).is_err() {
        tracing::warn!(
            "[capture_process] invalid stamp format '{}'",
            ctx.settings.capture_stamp_format
        );
        return false;
    }
    draft.title = format!("{stamp} {}", draft.title.trim()).trim_end().to_string();
    true
}

fn capture_prefix(note: &Note, _cache: &NoteCache) -> Option<String> {
    (note.flag(CAPTURE_PROCESSED_FIELD) != Some(true)).then(|| "📥".to_string())
}

pub(super) fn capture() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new("capture", "Capture", ROOT_TYPE)
        .icon("inbox")
        .fields(capture_fields)
        .behavior(NoteBehavior {
            title_prefix: Some(capture_prefix),
            process_note_data: Some(capture_process),
            ..Default::default()
        })
}

fn repo_fields() -> FrontmatterSpec {
    FrontmatterSpec::new().field(REPO_URL_FIELD, FieldSpec::text(""))
}

/// Moves the `url` extra into `repo-url` and names untitled repos after the last path segment.
fn repo_process(draft: &mut NoteDraft, _ctx: &CreationContext<'_>) -> bool {
    let Some(url) = draft_value(draft, REPO_URL_FIELD, URL_EXTRA) else {
        return !draft.title.trim().is_empty();
    };
    let Ok(parsed) = Url::parse(&url) else {
        tracing::warn!("[repo_process] '{url}' is not a url");
        return false;
    };
    if draft.title.trim().is_empty() {
        if let Some(name) = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        {
            draft.title = name.trim_end_matches(".git").to_string();
        }
    }
    draft
        .frontmatter
        .insert(Value::from(REPO_URL_FIELD), Value::from(url));
    true
}

fn repo_validate(note: &Note, _cache: &NoteCache) -> bool {
    note.text(REPO_URL_FIELD).map(is_web_url).unwrap_or(false)
}

fn repo_suffix(note: &Note, _cache: &NoteCache) -> Option<String> {
    let url = Url::parse(note.text(REPO_URL_FIELD)?).ok()?;
    url.host_str().map(|host| format!("({host})"))
}

pub(super) fn repo() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new("repo", "Repository", ROOT_TYPE)
        .icon("git-branch")
        .fields(repo_fields)
        .behavior(NoteBehavior {
            validate: Some(repo_validate),
            title_suffix: Some(repo_suffix),
            process_note_data: Some(repo_process),
            ..Default::default()
        })
}

fn reference_fields() -> FrontmatterSpec {
    FrontmatterSpec::new()
        .field(REFERENCE_URL_FIELD, FieldSpec::text(""))
        .field(REFERENCE_AUTHOR_FIELD, FieldSpec::text("").skip_if_absent())
}

fn reference_process(draft: &mut NoteDraft, _ctx: &CreationContext<'_>) -> bool {
    match draft_value(draft, REFERENCE_URL_FIELD, URL_EXTRA) {
        Some(url) if is_web_url(&url) => {
            draft
                .frontmatter
                .insert(Value::from(REFERENCE_URL_FIELD), Value::from(url));
            true
        }
        Some(url) => {
            tracing::warn!("[reference_process] '{url}' is not a web url");
            false
        }
        None => {
            tracing::warn!("[reference_process] references need a url");
            false
        }
    }
}

fn reference_validate(note: &Note, _cache: &NoteCache) -> bool {
    note.text(REFERENCE_URL_FIELD).map(is_web_url).unwrap_or(false)
}

pub(super) fn reference() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new("reference", "Reference", ROOT_TYPE)
        .icon("link")
        .fields(reference_fields)
        .behavior(NoteBehavior {
            validate: Some(reference_validate),
            process_note_data: Some(reference_process),
            ..Default::default()
        })
}

fn source_fields() -> FrontmatterSpec {
    FrontmatterSpec::new()
        .field(SOURCE_AUTHOR_FIELD, FieldSpec::text(""))
        .field(SOURCE_YEAR_FIELD, FieldSpec::text("").skip_if_absent())
        .field(SOURCE_URL_FIELD, FieldSpec::text("").skip_if_absent())
}

fn source_process(draft: &mut NoteDraft, _ctx: &CreationContext<'_>) -> bool {
    let Some(author) = draft_value(draft, SOURCE_AUTHOR_FIELD, AUTHOR_EXTRA) else {
        tracing::warn!("[source_process] sources need an author");
        return false;
    };
    draft
        .frontmatter
        .insert(Value::from(SOURCE_AUTHOR_FIELD), Value::from(author));
    if let Some(url) = draft_value(draft, SOURCE_URL_FIELD, URL_EXTRA) {
        if !is_web_url(&url) {
            tracing::warn!("[source_process] '{url}' is not a web url");
            return false;
        }
        draft
            .frontmatter
            .insert(Value::from(SOURCE_URL_FIELD), Value::from(url));
    }
    true
}

fn source_validate(note: &Note, _cache: &NoteCache) -> bool {
    note.text(SOURCE_AUTHOR_FIELD).is_some()
        && note.text(SOURCE_URL_FIELD).map(is_web_url).unwrap_or(true)
}

fn source_suffix(note: &Note, _cache: &NoteCache) -> Option<String> {
    let author = note.text(SOURCE_AUTHOR_FIELD)?;
    Some(match note.text(SOURCE_YEAR_FIELD) {
        Some(year) => format!("({author}, {year})"),
        None => format!("({author})"),
    })
}

pub(super) fn source() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new("source", "Source", ROOT_TYPE)
        .icon("book")
        .fields(source_fields)
        .behavior(NoteBehavior {
            validate: Some(source_validate),
            title_suffix: Some(source_suffix),
            process_note_data: Some(source_process),
            ..Default::default()
        })
}

fn memo_fields() -> FrontmatterSpec {
    FrontmatterSpec::new().field(MEMO_TO_FIELD, FieldSpec::text("").skip_if_absent())
}

fn memo_content(draft: &NoteDraft, title: &str) -> String {
    match get_str(&draft.frontmatter, MEMO_TO_FIELD) {
        Some(to) => format!("# {title}\n\n**To:** {to}\n\n"),
        None => format!("# {title}\n\n"),
    }
}

pub(super) fn memo() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new("memo", "Memo", ROOT_TYPE)
        .icon("mail")
        .fields(memo_fields)
        .behavior(NoteBehavior {
            default_content: Some(memo_content),
            ..Default::default()
        })
}

fn blank_content(_draft: &NoteDraft, _title: &str) -> String {
    String::new()
}

pub(super) fn pad() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new("pad", "Pad", ROOT_TYPE)
        .icon("pencil")
        .behavior(NoteBehavior {
            default_content: Some(blank_content),
            ..Default::default()
        })
}
