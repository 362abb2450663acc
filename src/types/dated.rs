use chrono::Datelike;
use serde_yaml::Value;

use crate::{
    cache::NoteCache,
    creation::{CreationContext, NoteDraft},
    dates::{leading_date, parse_date_range, parse_iso_date, parse_natural_date, ISO_DATE_FORMAT},
    frontmatter::{get_str, FieldSpec, FrontmatterSpec},
    note::Note,
    registry::{NoteBehavior, NoteTypeDescriptor, ROOT_TYPE},
};

pub const DATED_TYPE: &str = "dated";

pub const LOG_CONS_FIELD: &str = "cons";
pub const LOG_CONS_HP_FIELD: &str = "cons-hp";
pub const PLANNER_START_FIELD: &str = "planner-start";
pub const PLANNER_END_FIELD: &str = "planner-end";

/// Extra draft field holding the user's date input for logs.
pub const DATE_EXTRA: &str = "date";
/// Extra draft field holding the user's range input for planners.
pub const RANGE_EXTRA: &str = "range";
/// Longest range a planner may cover, in days.
pub const PLANNER_MAX_DAYS: i64 = 366;

fn dated_validate(note: &Note, _cache: &NoteCache) -> bool {
    leading_date(note.basename()).is_some()
}

fn weekday_prefix(note: &Note, _cache: &NoteCache) -> Option<String> {
    leading_date(note.basename()).map(|date| date.format("%a").to_string())
}

pub(super) fn dated() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new(DATED_TYPE, "Dated", ROOT_TYPE)
        .abstract_type()
        .behavior(NoteBehavior {
            validate: Some(dated_validate),
            title_prefix: Some(weekday_prefix),
            ..Default::default()
        })
}

fn log_fields() -> FrontmatterSpec {
    FrontmatterSpec::new()
        .field(LOG_CONS_FIELD, FieldSpec::flag(false))
        .field(LOG_CONS_HP_FIELD, FieldSpec::flag(true))
}

/// Prefixes the title with the ISO date the user asked for. No date input means today;
/// input that does not parse rejects the draft.
fn log_process(draft: &mut NoteDraft, ctx: &CreationContext<'_>) -> bool {
    let date = match draft.extra.get(DATE_EXTRA).map(|input| input.trim()) {
        None | Some("") => ctx.today(),
        Some(input) => match parse_natural_date(input, ctx.today()) {
            Some(date) => date,
            None => {
                tracing::warn!("[log_process] unparseable date input '{input}'");
                return false;
            }
        },
    };
    let stamp = date.format(ISO_DATE_FORMAT).to_string();
    draft.title = format!("{stamp} {}", draft.title.trim()).trim_end().to_string();
    draft.extra.insert(DATE_EXTRA.to_string(), stamp);
    true
}

fn log_suffix(note: &Note, _cache: &NoteCache) -> Option<String> {
    (note.flag(LOG_CONS_FIELD) == Some(true)).then(|| "✓".to_string())
}

pub(super) fn log() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new("log", "Log", DATED_TYPE)
        .icon("calendar")
        .fields(log_fields)
        .behavior(NoteBehavior {
            title_suffix: Some(log_suffix),
            process_note_data: Some(log_process),
            ..Default::default()
        })
}

fn planner_fields() -> FrontmatterSpec {
    FrontmatterSpec::new()
        .field(PLANNER_START_FIELD, FieldSpec::date())
        .field(PLANNER_END_FIELD, FieldSpec::date())
}

fn planner_process(draft: &mut NoteDraft, ctx: &CreationContext<'_>) -> bool {
    let Some(input) = draft.extra.get(RANGE_EXTRA) else {
        tracing::warn!("[planner_process] planner drafts need a date range");
        return false;
    };
    let Some(range) = parse_date_range(input, ctx.today()) else {
        tracing::warn!("[planner_process] unparseable date range '{input}'");
        return false;
    };
    if range.days() > PLANNER_MAX_DAYS {
        tracing::warn!(
            "[planner_process] range '{input}' spans {} days, at most {PLANNER_MAX_DAYS} allowed",
            range.days()
        );
        return false;
    }
    let start = range.start.format(ISO_DATE_FORMAT).to_string();
    let end = range.end.format(ISO_DATE_FORMAT).to_string();
    draft
        .frontmatter
        .insert(Value::from(PLANNER_START_FIELD), Value::from(start.as_str()));
    draft
        .frontmatter
        .insert(Value::from(PLANNER_END_FIELD), Value::from(end.as_str()));
    draft.extra.insert(RANGE_EXTRA.to_string(), range.normalized());
    let title = match draft.title.trim() {
        "" => "Planner",
        title => title,
    };
    draft.title = format!("{start} {title}");
    true
}

/// One heading with an empty checklist per day of the planned range.
fn planner_content(draft: &NoteDraft, title: &str) -> String {
    let mut content = format!("# {title}\n\n");
    let bound = |field: &str| get_str(&draft.frontmatter, field).and_then(parse_iso_date);
    let (Some(start), Some(end)) = (bound(PLANNER_START_FIELD), bound(PLANNER_END_FIELD)) else {
        return content;
    };
    let days = start
        .iter_days()
        .take_while(|day| *day <= end)
        .take(PLANNER_MAX_DAYS as usize);
    for day in days {
        content.push_str(&format!(
            "## {} {}\n\n- [ ] \n\n",
            day.format(ISO_DATE_FORMAT),
            day.weekday()
        ));
    }
    content
}

fn planner_validate(note: &Note, cache: &NoteCache) -> bool {
    if !dated_validate(note, cache) {
        return false;
    }
    match (note.date(PLANNER_START_FIELD), note.date(PLANNER_END_FIELD)) {
        (Some(start), Some(end)) => start <= end,
        _ => false,
    }
}

fn planner_suffix(note: &Note, _cache: &NoteCache) -> Option<String> {
    let start = note.date(PLANNER_START_FIELD)?;
    let end = note.date(PLANNER_END_FIELD)?;
    let days = (end - start).num_days() + 1;
    Some(format!("({days}d)"))
}

pub(super) fn planner() -> NoteTypeDescriptor {
    NoteTypeDescriptor::new("planner", "Planner", DATED_TYPE)
        .icon("calendar-range")
        .fields(planner_fields)
        .behavior(NoteBehavior {
            validate: Some(planner_validate),
            title_suffix: Some(planner_suffix),
            process_note_data: Some(planner_process),
            default_content: Some(planner_content),
            ..Default::default()
        })
}
