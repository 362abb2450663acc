//! # notetype-core
//!
//! Typed notes for a vault of Markdown files.
//!
//! Every file in a vault is classified into a note type (zettel, log, planner, project,
//! capture, ...). A type carries a frontmatter schema with defaults and fixed values, validation
//! rules, title decorations and creation hooks. On top of that the crate keeps a live,
//! event-driven cache of notes and answers hierarchy questions over the vault's link graph.
//!
//! ## Overview
//!
//! - **Frontmatter schemas**: each type declares only its own fields; the effective
//!   [`frontmatter::FrontmatterSpec`] is composed from the ancestor chain, root first
//! - **Classification**: an `archived` flag, then the `notetype` field, then the configured
//!   type folders (first prefix match), then the generic `note` type
//! - **Hierarchy**: a note's children are the notes that both link to it and name it as their
//!   `parent`; descendant trees and lineages fail loudly on cycles instead of looping
//! - **Note cache**: one `Arc<Note>` per path, updated from host events, with tombstones for
//!   deleted paths and synchronous subscriber callbacks
//! - **Creation**: deterministic frontmatter ordering, per-type hooks, never overwrites
//!
//! ## Architecture
//!
//! - **[`vault`]**: the host as a [`vault::Vault`] trait, with in-memory and directory backends
//! - **[`registry`]** and **[`types`]**: note type descriptors and the built-in types
//! - **[`note`]**: the [`note::Note`] entity, links, parent/children, descendant trees
//! - **[`cache`]**: [`cache::NoteCache`], fed with [`event::VaultEvent`]s
//! - **[`creation`]**: the note creation pipeline
//! - **[`tasks`]**: checkbox tasks indexed from cache updates
//! - **`watch`** (feature `service`): keeps a cache in sync with a directory
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use notetype_core::{
//!     cache::NoteCache,
//!     config::Settings,
//!     creation::{create_note, NoteDraft},
//!     registry::TypeRegistry,
//!     vault::MemoryVault,
//! };
//!
//! let vault = Arc::new(MemoryVault::new().with_file(
//!     "Projects/Alpha.md",
//!     "---\nnotetype: project\nproj-status: active\n---\n",
//! ));
//! let settings = Settings::default().with_folder("module", "Projects");
//! let cache = NoteCache::new(vault.clone(), Arc::new(TypeRegistry::builtin()), settings);
//! cache.init();
//!
//! let draft = NoteDraft::new("Design")
//!     .with_type("module")
//!     .with_field("parent", "[[Alpha]]");
//! let created = create_note(&cache, draft).unwrap();
//! for event in vault.drain_events() {
//!     cache.handle_event(&event);
//! }
//!
//! let module = cache.get(created.path(), false).unwrap();
//! assert_eq!(module.notetype(), "module");
//! assert_eq!(module.parent(&cache).unwrap().path(), "Projects/Alpha.md");
//! ```

pub mod cache;
pub mod config;
pub mod creation;
pub mod dates;
pub mod error;
pub mod event;
pub mod frontmatter;
pub mod markdown;
pub mod note;
pub mod registry;
pub mod tasks;
#[cfg(test)]
mod tests;
pub mod types;
pub mod vault;
#[cfg(feature = "service")]
pub mod watch;

pub use error::*;
