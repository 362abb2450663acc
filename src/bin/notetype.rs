//! notetype CLI tool
//!
//! Command-line access to a vault directory's typed notes.
//!
//! ## Commands
//!
//! - `list`: every note with its type and decorations
//! - `classify <file>`: the type a file resolves to
//! - `tree <note>`: the descendant hierarchy below a note
//! - `lineage <note>`: the ancestors above a note
//! - `validate`: notes failing their type's validation
//! - `create <title>`: create a note through the creation pipeline
//! - `watch` (feature `service`): follow changes and log cache updates
//!
//! Settings are read from `.notetype.toml` at the vault root.

use clap::{Parser, Subcommand};
use notetype_core::{
    cache::NoteCache,
    config::{SettingsProvider, TomlSettingsProvider},
    creation::{create_note, NoteDraft},
    note::Note,
    registry::TypeRegistry,
    vault::FsVault,
    NotetypeError,
};
use serde_yaml::Value;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

#[derive(Parser)]
#[command(name = "notetype")]
#[command(author, version, about = "Typed notes for a vault of markdown files", long_about = None)]
struct Cli {
    /// Vault root directory
    #[arg(short, long, default_value = ".", global = true)]
    vault: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List notes with their type and decorations
    List {
        /// Only notes of this type or one of its descendants
        #[arg(short = 't', long = "type")]
        notetype: Option<String>,

        /// Include stubs for unresolved links
        #[arg(long)]
        stubs: bool,
    },

    /// Show the type a file classifies as
    Classify {
        /// Vault-relative path of the file
        file: String,
    },

    /// Print the descendant tree below a note
    Tree {
        /// Vault-relative path of the root note
        note: String,

        /// Only follow children of these types
        #[arg(short = 't', long = "type")]
        notetypes: Vec<String>,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the ancestors of a note, root first
    Lineage {
        /// Vault-relative path of the note
        note: String,
    },

    /// Report notes that fail their type's validation
    Validate,

    /// Create a note
    Create {
        /// Note title
        title: String,

        /// Note type tag (default: from the folder, else the generic type)
        #[arg(short = 't', long = "type")]
        notetype: Option<String>,

        /// Target folder, overriding the configured folder for the type
        #[arg(short, long)]
        folder: Option<String>,

        /// Frontmatter field as key=value; values are read as YAML scalars
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,

        /// Type-specific creation input as key=value (e.g. date=tomorrow, range=monday..friday)
        #[arg(long = "extra", value_parser = parse_key_value)]
        extras: Vec<(String, String)>,
    },

    /// Watch the vault and log cache updates until Enter is pressed
    #[cfg(feature = "service")]
    Watch {
        /// Debounce window in milliseconds
        #[arg(long, default_value = "300")]
        debounce_ms: u64,
    },
}

fn parse_key_value(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{input}'")),
    }
}

fn open_cache(root: &Path) -> Result<(Arc<FsVault>, Arc<NoteCache>), NotetypeError> {
    let provider = TomlSettingsProvider::for_vault(root);
    let settings = provider.get_settings()?;
    let vault = Arc::new(FsVault::open(root, &settings.markdown_extensions)?);
    let cache = Arc::new(NoteCache::new(
        vault.clone(),
        Arc::new(TypeRegistry::builtin()),
        settings,
    ));
    cache.init();
    Ok((vault, cache))
}

fn lookup(cache: &NoteCache, path: &str) -> Result<Arc<Note>, NotetypeError> {
    cache
        .get(path, false)
        .filter(|note| !note.is_stub())
        .ok_or_else(|| NotetypeError::NotFound(path.to_string()))
}

fn describe(note: &Note, cache: &NoteCache) -> String {
    let mut line = String::new();
    if let Some(prefix) = note.title_prefix(cache) {
        line.push_str(&prefix);
        line.push(' ');
    }
    line.push_str(note.basename());
    if let Some(suffix) = note.title_suffix(cache) {
        line.push(' ');
        line.push_str(&suffix);
    }
    let color = note
        .title_prefix_color(cache)
        .map(|color| format!(" {{{color}}}"))
        .unwrap_or_default();
    format!("{:<10} {line}{color}  ({})", note.notetype(), note.path())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let (vault, cache) = open_cache(&cli.vault)?;

    match cli.command {
        Commands::List { notetype, stubs } => {
            let mut notes = match notetype.as_deref() {
                Some(tag) => cache.all_notes_of_type(tag),
                None => cache.all_notes(),
            };
            if stubs {
                notes.extend(cache.stubs());
            }
            for note in notes.iter() {
                println!("{}", describe(note, &cache));
            }
        }
        Commands::Classify { file } => {
            let note = lookup(&cache, &file)?;
            let lineage: Vec<&str> = cache
                .registry()
                .ancestors(note.notetype())
                .iter()
                .map(|descriptor| descriptor.tag)
                .collect();
            println!("{}  ({})", note.notetype(), lineage.join(" > "));
        }
        Commands::Tree {
            note,
            notetypes,
            json,
        } => {
            let root = lookup(&cache, &note)?;
            let filter: Vec<&str> = notetypes.iter().map(String::as_str).collect();
            let tree = root.descendants(&cache, &filter)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tree.outline())?);
            } else {
                print!("{}", tree.outline().render());
            }
        }
        Commands::Lineage { note } => {
            let note = lookup(&cache, &note)?;
            for (depth, ancestor) in note.lineage(&cache)?.iter().enumerate() {
                println!("{}{}", "  ".repeat(depth), describe(ancestor, &cache));
            }
        }
        Commands::Validate => {
            let invalid: Vec<Arc<Note>> = cache
                .all_notes()
                .into_iter()
                .filter(|note| !note.validate(&cache))
                .collect();
            for note in invalid.iter() {
                println!("{}", describe(note, &cache));
            }
            if !invalid.is_empty() {
                eprintln!("{} invalid note(s)", invalid.len());
                std::process::exit(1);
            }
        }
        Commands::Create {
            title,
            notetype,
            folder,
            fields,
            extras,
        } => {
            let mut draft = NoteDraft::new(&title);
            if let Some(tag) = notetype.as_deref() {
                draft = draft.with_type(tag);
            }
            if let Some(folder) = folder.as_deref() {
                draft = draft.with_folder(folder);
            }
            for (key, value) in fields.iter() {
                let value = serde_yaml::from_str::<Value>(value)
                    .unwrap_or_else(|_| Value::from(value.as_str()));
                draft = draft.with_field(key, value);
            }
            for (key, value) in extras.iter() {
                draft = draft.with_extra(key, value);
            }
            let created = create_note(&cache, draft)?;
            for notice in vault.notices() {
                eprintln!("{notice}");
            }
            println!("{}", created.path());
        }
        #[cfg(feature = "service")]
        Commands::Watch { debounce_ms } => {
            use notetype_core::{event::CacheUpdate, watch::VaultWatcher};
            use std::time::Duration;

            let _subscription = cache.subscribe(|update: &CacheUpdate| {
                println!("{update}: {}", update.path().unwrap_or("*"));
            });
            let watcher =
                VaultWatcher::start(vault.clone(), cache.clone(), Duration::from_millis(debounce_ms))?;
            eprintln!("Watching {:?}, press Enter to stop", cli.vault);
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            watcher.stop()?;
        }
    }
    Ok(())
}
