//! Built-in note types.
//!
//! ```text
//! base (abstract)
//! ├── note                      generic fallback
//! ├── archived
//! ├── capture
//! ├── repo, reference, source, memo, pad
//! ├── dated (abstract)
//! │   ├── log
//! │   └── planner
//! └── parentable (abstract)
//!     ├── zettel, concept, box, doc, entity
//!     ├── project
//!     └── module
//! ```

mod base;
mod dated;
mod library;
mod parentable;
mod project;

use crate::registry::NoteTypeDescriptor;

pub use base::ARCHIVED_FROM_FIELD;
pub use dated::{
    DATED_TYPE, DATE_EXTRA, LOG_CONS_FIELD, LOG_CONS_HP_FIELD, PLANNER_END_FIELD, PLANNER_MAX_DAYS,
    PLANNER_START_FIELD, RANGE_EXTRA,
};
pub use library::{
    AUTHOR_EXTRA, CAPTURE_PROCESSED_FIELD, CAPTURE_SOURCE_FIELD, MEMO_TO_FIELD,
    REFERENCE_AUTHOR_FIELD, REFERENCE_URL_FIELD, REPO_URL_FIELD, SOURCE_AUTHOR_FIELD,
    SOURCE_URL_FIELD, SOURCE_YEAR_FIELD, URL_EXTRA,
};
pub use parentable::{
    DOC_STATUSES, DOC_STATUS_FIELD, ENTITY_KINDS, ENTITY_KIND_FIELD, PARENTABLE_TYPE,
};
pub use project::{
    project_dates, MODULE_END_FIELD, MODULE_TYPE, MODULE_START_FIELD, PROJECT_END_FIELD, PROJECT_START_FIELD,
    PROJECT_STATUSES, PROJECT_STATUS_FIELD, PROJECT_TYPE,
};

/// The built-in types in registration order. Ancestors always precede their descendants.
pub fn builtin_types() -> Vec<NoteTypeDescriptor> {
    vec![
        base::base(),
        parentable::parentable(),
        dated::dated(),
        base::note(),
        base::archived(),
        parentable::zettel(),
        parentable::concept(),
        parentable::note_box(),
        parentable::doc(),
        parentable::entity(),
        dated::log(),
        dated::planner(),
        library::capture(),
        project::project(),
        project::module(),
        library::repo(),
        library::reference(),
        library::source(),
        library::memo(),
        library::pad(),
    ]
}
