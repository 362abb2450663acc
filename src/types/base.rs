use crate::{
    cache::NoteCache,
    creation::NoteDraft,
    frontmatter::{
        FieldKind, FieldSpec, FrontmatterSpec, ARCHIVED_FIELD, CREATED_AT_FIELD, NOTETYPE_FIELD,
    },
    note::Note,
    registry::{NoteBehavior, NoteTypeDescriptor, ARCHIVED_TYPE, GENERIC_TYPE, ROOT_TYPE},
};

pub const ARCHIVED_FROM_FIELD: &str = "archived-from";

fn base_fields() -> FrontmatterSpec {
    FrontmatterSpec::new()
        .field(NOTETYPE_FIELD, FieldSpec::text(GENERIC_TYPE).fixed().hidden())
        .field(
            CREATED_AT_FIELD,
            FieldSpec::new(FieldKind::DateTime, "").hidden(),
        )
}

fn heading_content(_draft: &NoteDraft, title: &str) -> String {
    format!("# {title}\n\n")
}

pub(super) fn base() -> NoteTypeDescriptor {
    NoteTypeDescriptor {
        tag: ROOT_TYPE,
        display_name: "Base",
        icon: "file",
        is_abstract: true,
        parent: None,
        fields: base_fields,
        refine: None,
        behavior: NoteBehavior {
            default_content: Some(heading_content),
            ..Default::default()
        },
    }
}

pub(super) fn note() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new(GENERIC_TYPE, "Note", ROOT_TYPE).icon("file-text")
}

fn archived_fields() -> FrontmatterSpec {
    FrontmatterSpec::new()
        .field(ARCHIVED_FIELD, FieldSpec::flag(true).fixed().hidden())
        .field(ARCHIVED_FROM_FIELD, FieldSpec::text("").skip_if_absent())
}

fn archived_prefix(_note: &Note, _cache: &NoteCache) -> Option<String> {
    Some("🗄".to_string())
}

fn archived_color(_note: &Note, _cache: &NoteCache) -> Option<&'static str> {
    Some("gray")
}

fn archived_suffix(note: &Note, _cache: &NoteCache) -> Option<String> {
    note.text(ARCHIVED_FROM_FIELD)
        .map(|previous| format!("(was {previous})"))
}

pub(super) fn archived() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new(ARCHIVED_TYPE, "Archived", ROOT_TYPE)
        .icon("archive")
        .fields(archived_fields)
        .behavior(NoteBehavior {
            title_prefix: Some(archived_prefix),
            title_prefix_color: Some(archived_color),
            title_suffix: Some(archived_suffix),
            ..Default::default()
        })
}
