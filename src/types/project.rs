use chrono::NaiveDate;

use crate::{
    cache::NoteCache,
    dates::ISO_DATE_FORMAT,
    frontmatter::{FieldSpec, FrontmatterSpec, PARENT_FIELD},
    note::Note,
    registry::{NoteBehavior, NoteTypeDescriptor},
};

use super::parentable::PARENTABLE_TYPE;

pub const PROJECT_TYPE: &str = "project";
pub const MODULE_TYPE: &str = "module";

pub const PROJECT_STATUS_FIELD: &str = "proj-status";
pub const PROJECT_START_FIELD: &str = "proj-start-date";
pub const PROJECT_END_FIELD: &str = "proj-end-date";
pub const MODULE_START_FIELD: &str = "mod-start-date";
pub const MODULE_END_FIELD: &str = "mod-end-date";

pub const PROJECT_STATUSES: &[&str] = &["planned", "active", "stream", "paused", "done", "cancelled"];

fn project_fields() -> FrontmatterSpec {
    FrontmatterSpec::new()
        .field(PROJECT_STATUS_FIELD, FieldSpec::text("planned"))
        .field(PROJECT_START_FIELD, FieldSpec::date())
        .field(PROJECT_END_FIELD, FieldSpec::date())
}

/// Effective start and end of a project.
///
/// The project's own dates win. An empty side falls back to the earliest module start or the
/// latest module end among the project's child modules.
pub fn project_dates(note: &Note, cache: &NoteCache) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let mut start = note.date(PROJECT_START_FIELD);
    let mut end = note.date(PROJECT_END_FIELD);
    if start.is_some() && end.is_some() {
        return (start, end);
    }
    let modules: Vec<_> = note
        .child_notes(cache)
        .into_iter()
        .filter(|child| child.notetype() == MODULE_TYPE)
        .collect();
    if start.is_none() {
        start = modules
            .iter()
            .filter_map(|module| module.date(MODULE_START_FIELD))
            .min();
    }
    if end.is_none() {
        end = modules
            .iter()
            .filter_map(|module| module.date(MODULE_END_FIELD))
            .max();
    }
    (start, end)
}

fn project_validate(note: &Note, cache: &NoteCache) -> bool {
    let Some(status) = note.text(PROJECT_STATUS_FIELD) else {
        return false;
    };
    if !PROJECT_STATUSES.contains(&status) {
        return false;
    }
    match status {
        "active" => {
            let (start, end) = project_dates(note, cache);
            matches!((start, end), (Some(start), Some(end)) if start <= end)
        }
        "stream" => {
            note.date(PROJECT_START_FIELD).is_none() && note.date(PROJECT_END_FIELD).is_none()
        }
        _ => true,
    }
}

fn project_prefix(note: &Note, _cache: &NoteCache) -> Option<String> {
    let icon = match note.text(PROJECT_STATUS_FIELD)? {
        "planned" => "○",
        "active" => "▶",
        "stream" => "∞",
        "paused" => "⏸",
        "done" => "✔",
        "cancelled" => "✘",
        _ => return None,
    };
    Some(icon.to_string())
}

fn project_color(note: &Note, _cache: &NoteCache) -> Option<&'static str> {
    match note.text(PROJECT_STATUS_FIELD)? {
        "active" => Some("green"),
        "paused" => Some("orange"),
        "done" | "cancelled" => Some("gray"),
        _ => None,
    }
}

fn format_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<String> {
    let side = |date: Option<NaiveDate>| {
        date.map(|date| date.format(ISO_DATE_FORMAT).to_string())
            .unwrap_or_else(|| "?".to_string())
    };
    if start.is_none() && end.is_none() {
        return None;
    }
    Some(format!("({} → {})", side(start), side(end)))
}

fn project_suffix(note: &Note, cache: &NoteCache) -> Option<String> {
    let (start, end) = project_dates(note, cache);
    format_range(start, end)
}

pub(super) fn project() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new(PROJECT_TYPE, "Project", PARENTABLE_TYPE)
        .icon("folder-kanban")
        .fields(project_fields)
        .behavior(NoteBehavior {
            validate: Some(project_validate),
            title_prefix: Some(project_prefix),
            title_prefix_color: Some(project_color),
            title_suffix: Some(project_suffix),
            ..Default::default()
        })
}

fn module_fields() -> FrontmatterSpec {
    FrontmatterSpec::new()
        .field(MODULE_START_FIELD, FieldSpec::date())
        .field(MODULE_END_FIELD, FieldSpec::date())
}

/// Modules always belong to a project, so the inherited parent is written at creation.
fn module_refine(spec: FrontmatterSpec) -> FrontmatterSpec {
    spec.patch(PARENT_FIELD, |parent| parent.skip_creation_if_absent = false)
}

fn module_validate(note: &Note, cache: &NoteCache) -> bool {
    let in_project = note
        .parent(cache)
        .map(|parent| parent.notetype() == PROJECT_TYPE)
        .unwrap_or(false);
    if !in_project {
        return false;
    }
    match (note.date(MODULE_START_FIELD), note.date(MODULE_END_FIELD)) {
        (Some(start), Some(end)) => start <= end,
        _ => true,
    }
}

fn module_suffix(note: &Note, _cache: &NoteCache) -> Option<String> {
    format_range(note.date(MODULE_START_FIELD), note.date(MODULE_END_FIELD))
}

pub(super) fn module() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new(MODULE_TYPE, "Module", PARENTABLE_TYPE)
        .icon("puzzle")
        .fields(module_fields)
        .refine(module_refine)
        .behavior(NoteBehavior {
            validate: Some(module_validate),
            title_suffix: Some(module_suffix),
            ..Default::default()
        })
}
