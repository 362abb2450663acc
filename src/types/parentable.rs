use crate::{
    cache::NoteCache,
    creation::NoteDraft,
    frontmatter::{FieldSpec, FrontmatterSpec, PARENT_FIELD},
    note::Note,
    registry::{NoteBehavior, NoteTypeDescriptor, ROOT_TYPE},
};

pub const PARENTABLE_TYPE: &str = "parentable";

pub const DOC_STATUS_FIELD: &str = "doc-status";
pub const DOC_STATUSES: &[&str] = &["draft", "review", "final"];

pub const ENTITY_KIND_FIELD: &str = "entity-kind";
pub const ENTITY_KINDS: &[&str] = &["person", "organization", "place", "thing"];

fn parentable_fields() -> FrontmatterSpec {
    FrontmatterSpec::new().field(PARENT_FIELD, FieldSpec::link().skip_if_absent())
}

/// Number of direct children, when there are any.
fn child_count_suffix(note: &Note, cache: &NoteCache) -> Option<String> {
    let count = note.child_notes(cache).len();
    (count > 0).then(|| format!("({count})"))
}

pub(super) fn parentable() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new(PARENTABLE_TYPE, "Parentable", ROOT_TYPE)
        .abstract_type()
        .fields(parentable_fields)
        .behavior(NoteBehavior {
            title_suffix: Some(child_count_suffix),
            ..Default::default()
        })
}

fn zettel_fields() -> FrontmatterSpec {
    FrontmatterSpec::new()
        .field("tags", FieldSpec::list().skip_if_absent())
        .field("aliases", FieldSpec::list().skip_if_absent().hidden())
}

pub(super) fn zettel() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new("zettel", "Zettel", PARENTABLE_TYPE)
        .icon("sticky-note")
        .fields(zettel_fields)
}

fn concept_fields() -> FrontmatterSpec {
    FrontmatterSpec::new().field("concept-domain", FieldSpec::text("").skip_if_absent())
}

fn concept_prefix(_note: &Note, _cache: &NoteCache) -> Option<String> {
    Some("💡".to_string())
}

pub(super) fn concept() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new("concept", "Concept", PARENTABLE_TYPE)
        .icon("lightbulb")
        .fields(concept_fields)
        .behavior(NoteBehavior {
            title_prefix: Some(concept_prefix),
            ..Default::default()
        })
}

fn box_fields() -> FrontmatterSpec {
    FrontmatterSpec::new().field("box-description", FieldSpec::text(""))
}

/// Boxes count every zettel below them, not just direct children.
fn box_suffix(note: &Note, cache: &NoteCache) -> Option<String> {
    match note.descendants(cache, &["zettel"]) {
        Ok(tree) => {
            let count = tree.len() - 1;
            (count > 0).then(|| format!("({count} zettels)"))
        }
        Err(error) => {
            tracing::warn!("[box_suffix] {}: {error}", note.path());
            None
        }
    }
}

fn box_content(_draft: &NoteDraft, title: &str) -> String {
    format!("# {title}\n\n## Zettels\n\n")
}

pub(super) fn note_box() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new("box", "Box", PARENTABLE_TYPE)
        .icon("package")
        .fields(box_fields)
        .behavior(NoteBehavior {
            title_suffix: Some(box_suffix),
            default_content: Some(box_content),
            ..Default::default()
        })
}

fn doc_fields() -> FrontmatterSpec {
    FrontmatterSpec::new().field(DOC_STATUS_FIELD, FieldSpec::text("draft"))
}

fn doc_validate(note: &Note, _cache: &NoteCache) -> bool {
    note.text(DOC_STATUS_FIELD)
        .map(|status| DOC_STATUSES.contains(&status))
        .unwrap_or(false)
}

fn doc_suffix(note: &Note, _cache: &NoteCache) -> Option<String> {
    note.text(DOC_STATUS_FIELD)
        .filter(|status| *status != "final")
        .map(|status| format!("[{status}]"))
}

pub(super) fn doc() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new("doc", "Doc", PARENTABLE_TYPE)
        .icon("book-open")
        .fields(doc_fields)
        .behavior(NoteBehavior {
            validate: Some(doc_validate),
            title_suffix: Some(doc_suffix),
            ..Default::default()
        })
}

fn entity_fields() -> FrontmatterSpec {
    FrontmatterSpec::new().field(ENTITY_KIND_FIELD, FieldSpec::text("person"))
}

fn entity_validate(note: &Note, _cache: &NoteCache) -> bool {
    note.text(ENTITY_KIND_FIELD)
        .map(|kind| ENTITY_KINDS.contains(&kind))
        .unwrap_or(false)
}

fn entity_prefix(note: &Note, _cache: &NoteCache) -> Option<String> {
    let icon = match note.text(ENTITY_KIND_FIELD)? {
        "person" => "👤",
        "organization" => "🏢",
        "place" => "📍",
        _ => "🔹",
    };
    Some(icon.to_string())
}

pub(super) fn entity() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new("entity", "Entity", PARENTABLE_TYPE)
        .icon("user")
        .fields(entity_fields)
        .behavior(NoteBehavior {
            validate: Some(entity_validate),
            title_prefix: Some(entity_prefix),
            ..Default::default()
        })
}
