//! The note type registry.
//!
//! Note types form a single-inheritance tree rooted at the abstract `base` type. Each
//! [NoteTypeDescriptor] declares only its own frontmatter fields and the behaviors it
//! overrides; the registry composes the effective [FrontmatterSpec] and behavior table by
//! walking the ancestor chain, root first, the way a list of mixins is applied in sequence.
//!
//! Classification of a file into its concrete type is [TypeRegistry::classify].

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use serde_yaml::Value;

use crate::{
    cache::NoteCache,
    config::Settings,
    creation::{CreationContext, NoteDraft},
    error::NotetypeError,
    frontmatter::{is_truthy, Frontmatter, FrontmatterSpec, ARCHIVED_FIELD, NOTETYPE_FIELD},
    note::Note,
};

pub const ROOT_TYPE: &str = "base";
pub const GENERIC_TYPE: &str = "note";
pub const ARCHIVED_TYPE: &str = "archived";

pub type ValidateFn = fn(&Note, &NoteCache) -> bool;
pub type DecorateFn = fn(&Note, &NoteCache) -> Option<String>;
pub type ColorFn = fn(&Note, &NoteCache) -> Option<&'static str>;
pub type ProcessNoteDataFn = fn(&mut NoteDraft, &CreationContext<'_>) -> bool;
pub type DefaultContentFn = fn(&NoteDraft, &str) -> String;
pub type RefineSpecFn = fn(FrontmatterSpec) -> FrontmatterSpec;

/// Per-type behavior overrides. `None` inherits from the nearest ancestor that sets the slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteBehavior {
    pub validate: Option<ValidateFn>,
    pub title_prefix: Option<DecorateFn>,
    pub title_prefix_color: Option<ColorFn>,
    pub title_suffix: Option<DecorateFn>,
    pub process_note_data: Option<ProcessNoteDataFn>,
    pub default_content: Option<DefaultContentFn>,
}

/// Static registration entry for one note type.
#[derive(Debug, Clone)]
pub struct NoteTypeDescriptor {
    pub tag: &'static str,
    pub display_name: &'static str,
    pub icon: &'static str,
    pub is_abstract: bool,
    /// Tag of the parent type; `None` only for the root.
    pub parent: Option<&'static str>,
    /// Fields declared by this type itself.
    pub fields: fn() -> FrontmatterSpec,
    /// Copy-then-patch hook run on the spec accumulated so far, after `fields` is overlaid.
    pub refine: Option<RefineSpecFn>,
    pub behavior: NoteBehavior,
}

impl NoteTypeDescriptor {
    pub fn new(tag: &'static str, display_name: &'static str, parent: &'static str) -> Self {
        NoteTypeDescriptor {
            tag,
            display_name,
            icon: "file",
            is_abstract: false,
            parent: Some(parent),
            fields: FrontmatterSpec::new,
            refine: None,
            behavior: NoteBehavior::default(),
        }
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn icon(mut self, icon: &'static str) -> Self {
        self.icon = icon;
        self
    }

    pub fn fields(mut self, fields: fn() -> FrontmatterSpec) -> Self {
        self.fields = fields;
        self
    }

    pub fn refine(mut self, refine: RefineSpecFn) -> Self {
        self.refine = Some(refine);
        self
    }

    pub fn behavior(mut self, behavior: NoteBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

fn default_validate(_note: &Note, _cache: &NoteCache) -> bool {
    true
}

fn no_decoration(_note: &Note, _cache: &NoteCache) -> Option<String> {
    None
}

fn no_color(_note: &Note, _cache: &NoteCache) -> Option<&'static str> {
    None
}

fn accept_draft(_draft: &mut NoteDraft, _ctx: &CreationContext<'_>) -> bool {
    true
}

fn empty_content(_draft: &NoteDraft, _title: &str) -> String {
    String::new()
}

/// The ordered catalogue of note types.
///
/// Every registry holds a concrete generic type, so classification always has a fallback.
#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<Arc<NoteTypeDescriptor>>,
    by_tag: HashMap<&'static str, Arc<NoteTypeDescriptor>>,
}

impl TypeRegistry {
    /// Registry holding exactly `types`, which must include a concrete [GENERIC_TYPE].
    pub fn with_types(types: Vec<NoteTypeDescriptor>) -> Result<Self, NotetypeError> {
        let mut registry = TypeRegistry {
            types: Vec::new(),
            by_tag: HashMap::new(),
        };
        registry.register_types(types)?;
        if !registry.is_concrete(GENERIC_TYPE) {
            return Err(NotetypeError::Config(format!(
                "a note type registry needs a concrete '{GENERIC_TYPE}' type"
            )));
        }
        Ok(registry)
    }

    /// Registry holding the built-in note types.
    pub fn builtin() -> Self {
        TypeRegistry::with_types(crate::types::builtin_types())
            .expect("built-in note types to be a valid registry")
    }

    /// Appends types to the registry. Tags must be unique and every parent must be registered
    /// by the end of the batch; the registry is left unchanged on error.
    pub fn register_types(&mut self, types: Vec<NoteTypeDescriptor>) -> Result<(), NotetypeError> {
        let mut batch_tags = BTreeSet::new();
        for descriptor in types.iter() {
            if self.by_tag.contains_key(descriptor.tag) || !batch_tags.insert(descriptor.tag) {
                return Err(NotetypeError::DuplicateType(descriptor.tag.to_string()));
            }
        }
        for descriptor in types.iter() {
            match descriptor.parent {
                Some(parent) if !self.by_tag.contains_key(parent) && !batch_tags.contains(parent) => {
                    return Err(NotetypeError::Config(format!(
                        "note type '{}' declares unknown parent '{parent}'",
                        descriptor.tag
                    )));
                }
                None if descriptor.tag != ROOT_TYPE => {
                    return Err(NotetypeError::Config(format!(
                        "note type '{}' has no parent, only '{ROOT_TYPE}' may be a root",
                        descriptor.tag
                    )));
                }
                _ => {}
            }
        }
        for descriptor in types {
            tracing::debug!(
                "[TypeRegistry::register_types] registering '{}' (abstract: {})",
                descriptor.tag,
                descriptor.is_abstract
            );
            let descriptor = Arc::new(descriptor);
            self.by_tag.insert(descriptor.tag, descriptor.clone());
            self.types.push(descriptor);
        }
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Option<&Arc<NoteTypeDescriptor>> {
        self.by_tag.get(tag)
    }

    pub fn types(&self) -> impl Iterator<Item = &Arc<NoteTypeDescriptor>> {
        self.types.iter()
    }

    pub fn concrete_types(&self) -> impl Iterator<Item = &Arc<NoteTypeDescriptor>> {
        self.types.iter().filter(|descriptor| !descriptor.is_abstract)
    }

    pub fn abstract_types(&self) -> impl Iterator<Item = &Arc<NoteTypeDescriptor>> {
        self.types.iter().filter(|descriptor| descriptor.is_abstract)
    }

    pub fn is_concrete(&self, tag: &str) -> bool {
        self.get(tag).map(|descriptor| !descriptor.is_abstract).unwrap_or(false)
    }

    /// The generic fallback type every unclassifiable file ends up as.
    pub fn generic(&self) -> &Arc<NoteTypeDescriptor> {
        self.get(GENERIC_TYPE)
            .expect("registries are built with a generic type")
    }

    /// Ancestor chain of `tag`, root first and `tag` last. Unknown tags give an empty chain.
    pub fn ancestors(&self, tag: &str) -> Vec<&Arc<NoteTypeDescriptor>> {
        let mut chain = Vec::new();
        let mut seen = BTreeSet::new();
        let mut current = self.get(tag);
        while let Some(descriptor) = current {
            if !seen.insert(descriptor.tag) {
                tracing::warn!(
                    "[TypeRegistry::ancestors] parent loop at '{}', truncating chain",
                    descriptor.tag
                );
                break;
            }
            chain.push(descriptor);
            current = descriptor.parent.and_then(|parent| self.get(parent));
        }
        chain.reverse();
        chain
    }

    /// True if `tag` is `ancestor` or descends from it.
    pub fn is_a(&self, tag: &str, ancestor: &str) -> bool {
        self.ancestors(tag)
            .iter()
            .any(|descriptor| descriptor.tag == ancestor)
    }

    /// Effective frontmatter spec of a type: the ancestors' declared fields overlaid root
    /// first, each level's `refine` hook applied after its own overlay, and the `notetype`
    /// default pinned to the type's tag. Unknown tags resolve to the generic type.
    pub fn frontmatter_spec(&self, tag: &str) -> FrontmatterSpec {
        let chain = match self.get(tag) {
            Some(_) => self.ancestors(tag),
            None => self.ancestors(GENERIC_TYPE),
        };
        let mut spec = FrontmatterSpec::new();
        for descriptor in chain.iter() {
            spec.overlay(&(descriptor.fields)());
            if let Some(refine) = descriptor.refine {
                spec = refine(spec);
            }
        }
        let resolved_tag = chain.last().map(|descriptor| descriptor.tag).unwrap_or(GENERIC_TYPE);
        spec.with_default(NOTETYPE_FIELD, resolved_tag)
    }

    /// Resolves the concrete type of a file.
    ///
    /// 1. A truthy `archived` flag forces the archived type.
    /// 2. A `notetype` naming a registered concrete type wins.
    /// 3. The first configured type folder that prefixes the path.
    /// 4. The generic type.
    pub fn classify(
        &self,
        path: &str,
        frontmatter: Option<&Frontmatter>,
        settings: &Settings,
    ) -> &Arc<NoteTypeDescriptor> {
        if let Some(frontmatter) = frontmatter {
            if frontmatter.get(ARCHIVED_FIELD).map(is_truthy).unwrap_or(false) {
                if let Some(archived) = self.get(ARCHIVED_TYPE).filter(|d| !d.is_abstract) {
                    return archived;
                }
            }
            if let Some(Value::String(tag)) = frontmatter.get(NOTETYPE_FIELD) {
                if let Some(descriptor) = self.get(tag.trim()).filter(|d| !d.is_abstract) {
                    return descriptor;
                }
                tracing::debug!(
                    "[TypeRegistry::classify] {path}: notetype '{tag}' is not a concrete type"
                );
            }
        }
        if let Some(descriptor) = settings
            .type_for_path(path)
            .and_then(|tag| self.get(tag))
            .filter(|d| !d.is_abstract)
        {
            return descriptor;
        }
        self.generic()
    }

    fn resolve_behavior<T>(&self, tag: &str, slot: impl Fn(&NoteBehavior) -> Option<T>) -> Option<T> {
        self.ancestors(tag)
            .iter()
            .rev()
            .find_map(|descriptor| slot(&descriptor.behavior))
    }

    pub fn validate_fn(&self, tag: &str) -> ValidateFn {
        self.resolve_behavior(tag, |b| b.validate)
            .unwrap_or(default_validate)
    }

    pub fn title_prefix_fn(&self, tag: &str) -> DecorateFn {
        self.resolve_behavior(tag, |b| b.title_prefix)
            .unwrap_or(no_decoration)
    }

    pub fn title_prefix_color_fn(&self, tag: &str) -> ColorFn {
        self.resolve_behavior(tag, |b| b.title_prefix_color)
            .unwrap_or(no_color)
    }

    pub fn title_suffix_fn(&self, tag: &str) -> DecorateFn {
        self.resolve_behavior(tag, |b| b.title_suffix)
            .unwrap_or(no_decoration)
    }

    pub fn process_note_data_fn(&self, tag: &str) -> ProcessNoteDataFn {
        self.resolve_behavior(tag, |b| b.process_note_data)
            .unwrap_or(accept_draft)
    }

    pub fn default_content_fn(&self, tag: &str) -> DefaultContentFn {
        self.resolve_behavior(tag, |b| b.default_content)
            .unwrap_or(empty_content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::{FieldSpec, CREATED_AT_FIELD};
    use serde_yaml::Mapping;

    fn fm(pairs: &[(&str, Value)]) -> Frontmatter {
        let mut mapping = Mapping::new();
        for (key, value) in pairs {
            mapping.insert(Value::from(*key), value.clone());
        }
        mapping
    }

    #[test]
    fn test_classification_precedence() {
        let registry = TypeRegistry::builtin();
        let settings = Settings::default()
            .with_folder("zettel", "Zettels")
            .with_folder("log", "Zettels/Logs");

        let archived_log = fm(&[
            ("notetype", Value::from("log")),
            ("archived", Value::Bool(true)),
        ]);
        assert_eq!(
            registry.classify("Logs/x.md", Some(&archived_log), &settings).tag,
            ARCHIVED_TYPE
        );

        let log = fm(&[("notetype", Value::from("log"))]);
        assert_eq!(registry.classify("Zettels/x.md", Some(&log), &settings).tag, "log");

        // First folder prefix wins, not the longest
        assert_eq!(
            registry.classify("Zettels/Logs/2024-01-01 x.md", None, &settings).tag,
            "zettel"
        );

        let unknown = fm(&[("notetype", Value::from("banana"))]);
        assert_eq!(registry.classify("x.md", Some(&unknown), &settings).tag, GENERIC_TYPE);

        // Abstract tags never classify
        let abstract_tag = fm(&[("notetype", Value::from("parentable"))]);
        assert_eq!(
            registry.classify("x.md", Some(&abstract_tag), &settings).tag,
            GENERIC_TYPE
        );

        let not_archived = fm(&[
            ("notetype", Value::from("zettel")),
            ("archived", Value::Bool(false)),
        ]);
        assert_eq!(registry.classify("x.md", Some(&not_archived), &settings).tag, "zettel");
    }

    #[test]
    fn test_spec_contains_root_fields_and_pins_notetype() {
        let registry = TypeRegistry::builtin();
        for descriptor in registry.concrete_types() {
            let spec = registry.frontmatter_spec(descriptor.tag);
            let keys: Vec<&str> = spec.keys().take(2).collect();
            assert_eq!(keys, vec![NOTETYPE_FIELD, CREATED_AT_FIELD], "{}", descriptor.tag);
            let notetype = spec.get(NOTETYPE_FIELD).unwrap();
            assert!(notetype.fixed_value);
            assert_eq!(notetype.default, Value::from(descriptor.tag));
        }
    }

    #[test]
    fn test_spec_is_idempotent_and_ancestor_independent() {
        let registry = TypeRegistry::builtin();
        assert_eq!(registry.frontmatter_spec("log"), registry.frontmatter_spec("log"));
        assert_eq!(
            registry.frontmatter_spec("banana"),
            registry.frontmatter_spec(GENERIC_TYPE)
        );
        // module patches the inherited parent field; project keeps its own
        let module = registry.frontmatter_spec("module");
        let project = registry.frontmatter_spec("project");
        assert!(!module.get("parent").unwrap().skip_creation_if_absent);
        assert!(project.get("parent").unwrap().skip_creation_if_absent);
    }

    #[test]
    fn test_duplicate_tags_are_rejected() {
        let mut registry = TypeRegistry::builtin();
        let count = registry.types().count();
        let result = registry.register_types(vec![
            NoteTypeDescriptor::new("recipe", "Recipe", GENERIC_TYPE),
            NoteTypeDescriptor::new("zettel", "Zettel again", ROOT_TYPE),
        ]);
        assert_eq!(result, Err(NotetypeError::DuplicateType("zettel".to_string())));
        assert_eq!(registry.types().count(), count);

        let result = registry.register_types(vec![
            NoteTypeDescriptor::new("recipe", "Recipe", GENERIC_TYPE),
            NoteTypeDescriptor::new("recipe", "Recipe", GENERIC_TYPE),
        ]);
        assert!(matches!(result, Err(NotetypeError::DuplicateType(_))));
    }

    #[test]
    fn test_registry_requires_a_concrete_generic_type() {
        assert!(matches!(
            TypeRegistry::with_types(Vec::new()),
            Err(NotetypeError::Config(_))
        ));

        let abstract_generic: Vec<NoteTypeDescriptor> = crate::types::builtin_types()
            .into_iter()
            .map(|descriptor| {
                if descriptor.tag == GENERIC_TYPE {
                    descriptor.abstract_type()
                } else {
                    descriptor
                }
            })
            .collect();
        assert!(matches!(
            TypeRegistry::with_types(abstract_generic),
            Err(NotetypeError::Config(_))
        ));

        let registry = TypeRegistry::with_types(crate::types::builtin_types()).unwrap();
        assert_eq!(registry.generic().tag, GENERIC_TYPE);
        let settings = crate::config::Settings::default();
        assert_eq!(registry.classify("loose.md", None, &settings).tag, GENERIC_TYPE);
    }

    #[test]
    fn test_downstream_types_inherit() {
        let mut registry = TypeRegistry::builtin();
        registry
            .register_types(vec![NoteTypeDescriptor::new("recipe", "Recipe", "zettel")
                .fields(|| FrontmatterSpec::new().field("servings", FieldSpec::text("2")))])
            .unwrap();
        let spec = registry.frontmatter_spec("recipe");
        assert!(spec.contains("parent"));
        assert!(spec.contains("servings"));
        assert!(registry.is_a("recipe", "parentable"));
        assert!(!registry.is_a("recipe", "dated"));

        let orphan = registry.register_types(vec![NoteTypeDescriptor::new("x", "X", "nowhere")]);
        assert!(matches!(orphan, Err(NotetypeError::Config(_))));
    }
}
