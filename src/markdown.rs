//! Markdown plumbing shared by the vault implementations and the creation pipeline.
//!
//! - Frontmatter block detection and YAML (de)serialization
//! - Obsidian-style `[[target|alias]]` links: extraction from text and strict parsing of a
//!   single link value
//! - Checkbox task extraction via pulldown-cmark

use once_cell::sync::Lazy;
use pulldown_cmark::{Event as MdEvent, Options, Parser as MdParser, Tag as MdTag, TagEnd as MdTagEnd};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::NotetypeError;

/// Any wikilink occurrence inside a larger text, embeds included.
static WIKILINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\[\]]+?)\]\]").expect("static wikilink regex compiles"));

/// A frontmatter value consisting of exactly one wikilink and nothing else.
static STRICT_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\[([^\[\]]+)\]\]$").expect("static link regex compiles"));

pub fn notetype_md_options() -> Options {
    let mut md_options = Options::empty();
    md_options.insert(Options::ENABLE_GFM);
    md_options.insert(Options::ENABLE_STRIKETHROUGH);
    md_options.insert(Options::ENABLE_TABLES);
    md_options.insert(Options::ENABLE_TASKLISTS);
    md_options.insert(Options::ENABLE_WIKILINKS);
    md_options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
    md_options
}

/// Splits a note into its raw frontmatter block (without fences) and body.
///
/// The block must open on the very first line with `---` and close with a line holding only
/// `---` or `...`. Anything else is treated as body-only.
pub fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let rest = if let Some(rest) = text.strip_prefix("---\n") {
        rest
    } else if let Some(rest) = text.strip_prefix("---\r\n") {
        rest
    } else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == "---" || trimmed == "..." {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, text)
}

/// Parses the frontmatter block of a note. `Ok(None)` when there is no block, an empty
/// mapping when the block is empty.
pub fn parse_frontmatter(text: &str) -> Result<Option<Mapping>, NotetypeError> {
    let (Some(yaml), _) = split_frontmatter(text) else {
        return Ok(None);
    };
    if yaml.trim().is_empty() {
        return Ok(Some(Mapping::new()));
    }
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Mapping(mapping) => Ok(Some(mapping)),
        Value::Null => Ok(Some(Mapping::new())),
        other => Err(NotetypeError::Serialization(format!(
            "Frontmatter is not a mapping: {other:?}"
        ))),
    }
}

/// Renders a frontmatter mapping as a fenced block, keys in mapping order.
pub fn render_frontmatter(frontmatter: &Mapping) -> Result<String, NotetypeError> {
    if frontmatter.is_empty() {
        return Ok("---\n---\n".to_string());
    }
    let yaml = serde_yaml::to_string(frontmatter)?;
    Ok(format!("---\n{yaml}---\n"))
}

/// Assembles a full note: frontmatter, blank line, body.
pub fn render_note(frontmatter: &Mapping, body: &str) -> Result<String, NotetypeError> {
    Ok(format!("{}\n{}", render_frontmatter(frontmatter)?, body))
}

/// Replaces the frontmatter of `text`, keeping its body untouched.
pub fn replace_frontmatter(text: &str, frontmatter: &Mapping) -> Result<String, NotetypeError> {
    let (_, body) = split_frontmatter(text);
    Ok(format!("{}{}", render_frontmatter(frontmatter)?, body))
}

/// A parsed `[[target#heading|alias]]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    pub target: String,
    pub heading: Option<String>,
    pub alias: Option<String>,
}

impl WikiLink {
    fn from_inner(inner: &str) -> Option<WikiLink> {
        let (reference, alias) = match inner.split_once('|') {
            Some((reference, alias)) => (reference, Some(alias.trim().to_string())),
            None => (inner, None),
        };
        let (target, heading) = match reference.split_once('#') {
            Some((target, heading)) => (target, Some(heading.trim().to_string())),
            None => (reference, None),
        };
        let target = target.trim();
        if target.is_empty() {
            return None;
        }
        Some(WikiLink {
            target: target.to_string(),
            heading,
            alias,
        })
    }
}

/// Strictly parses a value that must be exactly one wikilink, e.g. a `parent` field. Plain
/// strings and malformed brackets give `None`.
pub fn parse_link(value: &str) -> Option<WikiLink> {
    STRICT_LINK
        .captures(value.trim())
        .and_then(|captures| captures.get(1))
        .and_then(|inner| WikiLink::from_inner(inner.as_str()))
}

/// Every wikilink occurring in `text`, in document order.
pub fn extract_links(text: &str) -> Vec<WikiLink> {
    WIKILINK
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .filter_map(|inner| WikiLink::from_inner(inner.as_str()))
        .collect()
}

/// Every wikilink found in string values of a frontmatter mapping, nested lists included.
pub fn extract_frontmatter_links(frontmatter: &Mapping) -> Vec<WikiLink> {
    fn walk(value: &Value, links: &mut Vec<WikiLink>) {
        match value {
            Value::String(text) => links.extend(extract_links(text)),
            Value::Sequence(items) => items.iter().for_each(|item| walk(item, links)),
            Value::Mapping(mapping) => mapping.values().for_each(|item| walk(item, links)),
            Value::Tagged(tagged) => walk(&tagged.value, links),
            _ => {}
        }
    }
    let mut links = Vec::new();
    frontmatter.values().for_each(|value| walk(value, &mut links));
    links
}

/// Formats a link to a vault path the way the host writes them into frontmatter.
pub fn format_link(path: &str, alias: Option<&str>) -> String {
    let target = path.strip_suffix(".md").unwrap_or(path);
    match alias {
        Some(alias) => format!("[[{target}|{alias}]]"),
        None => format!("[[{target}]]"),
    }
}

/// A checkbox list item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub text: String,
    pub done: bool,
    /// 1-based line of the list item within the text that was scanned
    pub line: usize,
}

/// Extracts `- [ ]` / `- [x]` tasks from a markdown body.
pub fn extract_tasks(text: &str) -> Vec<Task> {
    let mut tasks = Vec::new();
    let mut current: Option<Task> = None;

    for (event, range) in MdParser::new_ext(text, notetype_md_options()).into_offset_iter() {
        match event {
            MdEvent::TaskListMarker(done) => {
                if let Some(task) = current.take() {
                    tasks.push(task);
                }
                let line = text[..range.start].matches('\n').count() + 1;
                current = Some(Task {
                    text: String::new(),
                    done,
                    line,
                });
            }
            MdEvent::Text(fragment) | MdEvent::Code(fragment) => {
                if let Some(task) = current.as_mut() {
                    task.text.push_str(&fragment);
                }
            }
            MdEvent::SoftBreak | MdEvent::HardBreak => {
                if let Some(task) = current.as_mut() {
                    task.text.push(' ');
                }
            }
            MdEvent::Start(MdTag::List(_)) | MdEvent::End(MdTagEnd::Item) => {
                if let Some(mut task) = current.take() {
                    task.text = task.text.trim().to_string();
                    tasks.push(task);
                }
            }
            _ => {}
        }
    }
    if let Some(mut task) = current.take() {
        task.text = task.text.trim().to_string();
        tasks.push(task);
    }
    tasks
}
