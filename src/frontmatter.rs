//! Frontmatter schemas for note types.
//!
//! A [FrontmatterSpec] is an ordered list of field names and their [FieldSpec]s. The effective
//! spec of a note type is composed by the [crate::registry::TypeRegistry] from its ancestor
//! chain; this module only knows how a spec is overlaid onto another and how it is applied to
//! raw frontmatter.

use chrono::{NaiveDate, NaiveDateTime};
use serde_yaml::{Mapping, Value};

use crate::{
    dates::{parse_iso_date, ISO_DATE_FORMAT},
    markdown::{parse_link, WikiLink},
};

/// Raw frontmatter as parsed from disk, in file order.
pub type Frontmatter = Mapping;

pub const NOTETYPE_FIELD: &str = "notetype";
pub const CREATED_AT_FIELD: &str = "createdat";
pub const PARENT_FIELD: &str = "parent";
pub const ARCHIVED_FIELD: &str = "archived";

pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// The declared kind of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Bool,
    Date,
    DateTime,
    List,
    Link,
    Any,
}

/// A frontmatter value read according to its declared [FieldKind].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    List(Vec<String>),
    Link(WikiLink),
    Other(Value),
}

impl FieldValue {
    /// Reads `value` as `kind`. Values that do not fit the kind give `None`; empty strings and
    /// nulls are "unset" for every kind but `Text` and `Any`.
    pub fn read(kind: FieldKind, value: &Value) -> Option<FieldValue> {
        match (kind, value) {
            (FieldKind::Any, value) => Some(FieldValue::Other(value.clone())),
            (FieldKind::Text, Value::String(text)) => Some(FieldValue::Text(text.clone())),
            (FieldKind::Text, Value::Number(number)) => Some(FieldValue::Text(number.to_string())),
            (FieldKind::Text, Value::Bool(flag)) => Some(FieldValue::Text(flag.to_string())),
            (FieldKind::Bool, Value::Bool(flag)) => Some(FieldValue::Bool(*flag)),
            (FieldKind::Bool, Value::String(text)) => match text.trim().to_lowercase().as_str() {
                "true" | "yes" => Some(FieldValue::Bool(true)),
                "false" | "no" => Some(FieldValue::Bool(false)),
                _ => None,
            },
            (FieldKind::Date, Value::String(text)) => parse_iso_date(text).map(FieldValue::Date),
            (FieldKind::DateTime, Value::String(text)) => {
                NaiveDateTime::parse_from_str(text.trim(), DATETIME_FORMAT)
                    .ok()
                    .or_else(|| {
                        parse_iso_date(text).and_then(|date| date.and_hms_opt(0, 0, 0))
                    })
                    .map(FieldValue::DateTime)
            }
            (FieldKind::List, Value::Sequence(items)) => Some(FieldValue::List(
                items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(text) => Some(text.clone()),
                        Value::Number(number) => Some(number.to_string()),
                        _ => None,
                    })
                    .collect(),
            )),
            (FieldKind::List, Value::String(text)) if !text.trim().is_empty() => {
                Some(FieldValue::List(vec![text.clone()]))
            }
            (FieldKind::Link, Value::String(text)) => parse_link(text).map(FieldValue::Link),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(date) => Some(*date),
            FieldValue::DateTime(stamp) => Some(stamp.date()),
            _ => None,
        }
    }

    pub fn to_yaml(&self) -> Value {
        match self {
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Bool(flag) => Value::Bool(*flag),
            FieldValue::Date(date) => Value::String(date.format(ISO_DATE_FORMAT).to_string()),
            FieldValue::DateTime(stamp) => Value::String(stamp.format(DATETIME_FORMAT).to_string()),
            FieldValue::List(items) => {
                Value::Sequence(items.iter().cloned().map(Value::String).collect())
            }
            FieldValue::Link(link) => {
                let mut text = format!("[[{}", link.target);
                if let Some(heading) = &link.heading {
                    text.push('#');
                    text.push_str(heading);
                }
                if let Some(alias) = &link.alias {
                    text.push('|');
                    text.push_str(alias);
                }
                text.push_str("]]");
                Value::String(text)
            }
            FieldValue::Other(value) => value.clone(),
        }
    }
}

/// Declaration of one frontmatter key.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub default: Value,
    /// The value is always forced to `default`, whatever is on disk.
    pub fixed_value: bool,
    /// At creation, an absent field is omitted instead of defaulted.
    pub skip_creation_if_absent: bool,
    pub hide_in_creation_modal: bool,
}

impl FieldSpec {
    pub fn new(kind: FieldKind, default: impl Into<Value>) -> Self {
        FieldSpec {
            kind,
            default: default.into(),
            fixed_value: false,
            skip_creation_if_absent: false,
            hide_in_creation_modal: false,
        }
    }

    pub fn text(default: &str) -> Self {
        FieldSpec::new(FieldKind::Text, default)
    }

    pub fn flag(default: bool) -> Self {
        FieldSpec::new(FieldKind::Bool, default)
    }

    pub fn date() -> Self {
        FieldSpec::new(FieldKind::Date, "")
    }

    pub fn list() -> Self {
        FieldSpec::new(FieldKind::List, Value::Sequence(Vec::new()))
    }

    pub fn link() -> Self {
        FieldSpec::new(FieldKind::Link, "")
    }

    pub fn fixed(mut self) -> Self {
        self.fixed_value = true;
        self
    }

    pub fn skip_if_absent(mut self) -> Self {
        self.skip_creation_if_absent = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hide_in_creation_modal = true;
        self
    }

    /// Reads `value` according to this field's kind.
    pub fn read(&self, value: &Value) -> Option<FieldValue> {
        FieldValue::read(self.kind, value)
    }
}

/// An ordered mapping of field name to [FieldSpec].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontmatterSpec {
    fields: Vec<(String, FieldSpec)>,
}

impl FrontmatterSpec {
    pub fn new() -> Self {
        FrontmatterSpec::default()
    }

    /// Builder-style [FrontmatterSpec::insert].
    pub fn field(mut self, name: &str, spec: FieldSpec) -> Self {
        self.insert(name, spec);
        self
    }

    /// Adds a field at the end, or replaces the whole spec of an existing field in place.
    pub fn insert(&mut self, name: &str, spec: FieldSpec) {
        if let Some(entry) = self.fields.iter_mut().find(|(key, _)| key == name) {
            entry.1 = spec;
        } else {
            self.fields.push((name.to_string(), spec));
        }
    }

    /// Overlays `other` onto self: new fields are appended, redeclared fields replace the
    /// inherited [FieldSpec] wholesale and keep their inherited position.
    pub fn overlay(&mut self, other: &FrontmatterSpec) {
        for (name, spec) in other.iter() {
            self.insert(name, spec.clone());
        }
    }

    /// Copy-then-patch: mutates one inherited field without redeclaring it. Unknown fields are
    /// left alone.
    pub fn patch<F: FnOnce(&mut FieldSpec)>(mut self, name: &str, f: F) -> Self {
        if let Some(spec) = self.get_mut(name) {
            f(spec);
        }
        self
    }

    pub fn with_default(self, name: &str, default: impl Into<Value>) -> Self {
        let default = default.into();
        self.patch(name, |spec| spec.default = default)
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, spec)| spec)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldSpec> {
        self.fields
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, spec)| spec)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(key, spec)| (key.as_str(), spec))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields shown in an interactive creation form.
    pub fn creation_fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.iter().filter(|(_, spec)| !spec.hide_in_creation_modal)
    }
}

/// Applies a spec to raw frontmatter.
///
/// Every spec field takes the raw value when present and not fixed, otherwise its default.
/// Keys unknown to the spec pass through unchanged after the spec fields. With
/// `is_creation`, absent `skip_creation_if_absent` fields are dropped instead of defaulted.
pub fn process_frontmatter(raw: &Frontmatter, spec: &FrontmatterSpec, is_creation: bool) -> Frontmatter {
    let mut processed = Mapping::new();
    for (name, field) in spec.iter() {
        let key = Value::from(name);
        match raw.get(&key) {
            Some(value) if !field.fixed_value => {
                processed.insert(key, value.clone());
            }
            None if is_creation && field.skip_creation_if_absent => {}
            _ => {
                processed.insert(key, field.default.clone());
            }
        }
    }
    for (key, value) in raw.iter() {
        let known = key.as_str().map(|name| spec.contains(name)).unwrap_or(false);
        if !known {
            processed.insert(key.clone(), value.clone());
        }
    }
    processed
}

/// Orders frontmatter for writing: spec fields first in spec order, then whatever remains in
/// its own order.
pub fn order_frontmatter(frontmatter: &Frontmatter, spec: &FrontmatterSpec) -> Frontmatter {
    let mut ordered = Mapping::new();
    for name in spec.keys() {
        if let Some(value) = frontmatter.get(name) {
            ordered.insert(Value::from(name), value.clone());
        }
    }
    for (key, value) in frontmatter.iter() {
        if !ordered.contains_key(key) {
            ordered.insert(key.clone(), value.clone());
        }
    }
    ordered
}

/// Frontmatter string value, `None` for missing, non-string or empty values.
pub fn get_str<'a>(frontmatter: &'a Frontmatter, key: &str) -> Option<&'a str> {
    frontmatter
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

/// YAML truthiness as the host applies it to flags like `archived`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => {
            let text = text.trim().to_lowercase();
            !(text.is_empty() || text == "false" || text == "no" || text == "0")
        }
        Value::Sequence(items) => !items.is_empty(),
        Value::Mapping(mapping) => !mapping.is_empty(),
        Value::Tagged(tagged) => is_truthy(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_spec() -> FrontmatterSpec {
        FrontmatterSpec::new()
            .field(NOTETYPE_FIELD, FieldSpec::text("zettel").fixed().hidden())
            .field(CREATED_AT_FIELD, FieldSpec::new(FieldKind::DateTime, "").hidden())
            .field("tags", FieldSpec::list().skip_if_absent())
    }

    fn raw(pairs: &[(&str, Value)]) -> Frontmatter {
        let mut mapping = Mapping::new();
        for (key, value) in pairs {
            mapping.insert(Value::from(*key), value.clone());
        }
        mapping
    }

    #[test]
    fn test_fixed_value_wins_over_raw() {
        let fm = raw(&[("notetype", Value::from("foo"))]);
        let processed = process_frontmatter(&fm, &base_spec(), false);
        assert_eq!(processed.get("notetype"), Some(&Value::from("zettel")));
    }

    #[test]
    fn test_process_is_deterministic_and_passes_extras() {
        let fm = raw(&[
            ("legacy", Value::from("keep me")),
            ("createdat", Value::from("2024-01-01T10:00:00")),
        ]);
        let first = process_frontmatter(&fm, &base_spec(), false);
        let second = process_frontmatter(&fm, &base_spec(), false);
        assert_eq!(first, second);
        let keys: Vec<&str> = first.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["notetype", "createdat", "tags", "legacy"]);
        assert_eq!(first.get("createdat"), Some(&Value::from("2024-01-01T10:00:00")));
        assert_eq!(first.get("tags"), Some(&Value::Sequence(Vec::new())));
    }

    #[test]
    fn test_skip_creation_if_absent() {
        let processed = process_frontmatter(&Mapping::new(), &base_spec(), true);
        assert!(processed.get("tags").is_none());
        assert!(processed.get("notetype").is_some());

        let fm = raw(&[("tags", Value::Sequence(vec![Value::from("a")]))]);
        let processed = process_frontmatter(&fm, &base_spec(), true);
        assert_eq!(processed.get("tags"), Some(&Value::Sequence(vec![Value::from("a")])));
    }

    #[test]
    fn test_overlay_replaces_whole_field_in_place() {
        let mut spec = base_spec();
        let descendant = FrontmatterSpec::new()
            .field("tags", FieldSpec::text("x"))
            .field("extra", FieldSpec::flag(true));
        spec.overlay(&descendant);
        let keys: Vec<&str> = spec.keys().collect();
        assert_eq!(keys, vec!["notetype", "createdat", "tags", "extra"]);
        // Full replace: skip_if_absent from the ancestor is gone
        assert_eq!(spec.get("tags"), Some(&FieldSpec::text("x")));
    }

    #[test]
    fn test_patch_keeps_other_attributes() {
        let spec = base_spec().with_default("notetype", "log");
        let notetype = spec.get("notetype").unwrap();
        assert_eq!(notetype.default, Value::from("log"));
        assert!(notetype.fixed_value);
        assert!(notetype.hide_in_creation_modal);
        // Independent copy
        assert_eq!(base_spec().get("notetype").unwrap().default, Value::from("zettel"));
    }

    #[test]
    fn test_order_frontmatter() {
        let fm = raw(&[
            ("c", Value::from(3)),
            ("tags", Value::Null),
            ("notetype", Value::from("zettel")),
        ]);
        let ordered = order_frontmatter(&fm, &base_spec());
        let keys: Vec<&str> = ordered.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["notetype", "tags", "c"]);
    }

    #[test]
    fn test_field_value_reads_by_kind() {
        assert_eq!(
            FieldValue::read(FieldKind::Date, &Value::from("2024-01-01")),
            Some(FieldValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()))
        );
        assert_eq!(FieldValue::read(FieldKind::Date, &Value::from("")), None);
        assert_eq!(FieldValue::read(FieldKind::Bool, &Value::from("yes")), Some(FieldValue::Bool(true)));
        assert_eq!(FieldValue::read(FieldKind::Bool, &Value::from(3)), None);
        assert_eq!(FieldValue::read(FieldKind::Link, &Value::from("Alpha")), None);
        let link = FieldValue::read(FieldKind::Link, &Value::from("[[Alpha|A]]")).unwrap();
        assert_eq!(link.to_yaml(), Value::from("[[Alpha|A]]"));
        assert_eq!(
            FieldValue::read(FieldKind::List, &Value::from("solo")),
            Some(FieldValue::List(vec!["solo".to_string()]))
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&Value::Bool(true)));
        assert!(is_truthy(&Value::from("yes")));
        assert!(!is_truthy(&Value::from("false")));
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&Value::from(0)));
    }
}
