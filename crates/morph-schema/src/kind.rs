//! # Entity Kinds and Schema Descriptor Maps
//!
//! An [`EntityKind`] is the schema-time identity of one typed, versioned,
//! named entity: its wire tag, version, supertype link, declared field
//! descriptors, and kind-level hooks. Kinds are declared once at startup
//! through [`EntityKind::builder`] and shared behind `Arc` ever after.
//!
//! The [`SchemaMap`] for a kind merges its declared descriptors with every
//! field inherited down the supertype chain (the most-derived declaration
//! wins) and adds the three always-present meta descriptors. It is built on
//! first use and cached on the kind for the process lifetime; iteration
//! order is lexicographic by field key, deliberately not declaration order.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use morph_core::meta::{self, CONTEXT_KEY, DEFAULT_VERSION, TYPE_KEY, VERSION_KEY};
use morph_core::{MorphError, SchemaError};

use crate::descriptor::PropertyDescriptor;
use crate::entity::Entity;

/// Hook run once before field resolution, allowed to normalize or rewrite
/// the input tree. The caller's original value is never mutated.
pub type PreConstruct = Arc<dyn Fn(&Value) -> Result<Value, MorphError> + Send + Sync>;

/// Hook run once after field resolution, for post-decode normalization.
pub type PostConstruct = Arc<dyn Fn(&mut Entity) -> Result<(), MorphError> + Send + Sync>;

/// Kind-level string-decoding entry point: turns a string-encoded wire
/// value into a tree for this kind.
pub type KindStringDecoder = Arc<dyn Fn(&str) -> Result<Value, MorphError> + Send + Sync>;

/// The schema-time identity of one entity kind.
pub struct EntityKind {
    name: String,
    tag: String,
    version: u32,
    supertype: Option<Arc<EntityKind>>,
    declared: Vec<Arc<PropertyDescriptor>>,
    serialize_only: Option<String>,
    pre_construct: Option<PreConstruct>,
    post_construct: Option<PostConstruct>,
    string_decoder: Option<KindStringDecoder>,
    schema: OnceLock<Arc<SchemaMap>>,
}

impl EntityKind {
    /// Start declaring a kind. The name doubles as the wire tag unless
    /// [`EntityKindBuilder::tag`] overrides it.
    pub fn builder(name: impl Into<String>) -> EntityKindBuilder {
        let name = name.into();
        EntityKindBuilder {
            tag: name.clone(),
            name,
            version: DEFAULT_VERSION,
            supertype: None,
            declared: Vec::new(),
            serialize_only: None,
            pre_construct: None,
            post_construct: None,
            string_decoder: None,
        }
    }

    /// The kind's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wire type tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The schema revision.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The supertype, if any.
    pub fn supertype(&self) -> Option<&Arc<EntityKind>> {
        self.supertype.as_ref()
    }

    /// The versioned registry lookup key, e.g. `"Person@2"`.
    pub fn versioned_key(&self) -> String {
        meta::versioned_key(&self.tag, self.version)
    }

    /// The field a serialize-only override emits in place of the whole
    /// object, if the kind declares one.
    pub fn serialize_only(&self) -> Option<&str> {
        self.serialize_only.as_deref()
    }

    /// The pre-construction normalization hook, if any.
    pub fn pre_construct(&self) -> Option<&PreConstruct> {
        self.pre_construct.as_ref()
    }

    /// The post-construction normalization hook, if any.
    pub fn post_construct(&self) -> Option<&PostConstruct> {
        self.post_construct.as_ref()
    }

    /// The kind-level string-decoding entry point, if any.
    pub fn string_decoder(&self) -> Option<&KindStringDecoder> {
        self.string_decoder.as_ref()
    }

    /// Whether this kind is `name` or has `name` anywhere up its
    /// supertype chain.
    pub fn conforms_to(&self, name: &str) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind.name == name {
                return true;
            }
            current = kind.supertype.as_deref();
        }
        false
    }

    /// The kind's schema descriptor map, built on first use and cached
    /// for the process lifetime.
    pub fn schema(&self) -> &Arc<SchemaMap> {
        self.schema.get_or_init(|| Arc::new(SchemaMap::build(self)))
    }
}

impl fmt::Debug for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityKind")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("version", &self.version)
            .field("supertype", &self.supertype.as_ref().map(|s| s.name()))
            .field("declared", &self.declared.len())
            .field("serialize_only", &self.serialize_only)
            .finish_non_exhaustive()
    }
}

impl PartialEq for EntityKind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.tag == other.tag && self.version == other.version
    }
}

impl Eq for EntityKind {}

/// Builder for [`EntityKind`]. `build()` checks every declared descriptor
/// against the shape invariant before the kind can exist.
pub struct EntityKindBuilder {
    name: String,
    tag: String,
    version: u32,
    supertype: Option<Arc<EntityKind>>,
    declared: Vec<Arc<PropertyDescriptor>>,
    serialize_only: Option<String>,
    pre_construct: Option<PreConstruct>,
    post_construct: Option<PostConstruct>,
    string_decoder: Option<KindStringDecoder>,
}

impl EntityKindBuilder {
    /// Override the wire tag (defaults to the kind name).
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Set the schema revision (defaults to 1).
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Inherit all fields of `supertype` not re-declared here.
    pub fn supertype(mut self, supertype: Arc<EntityKind>) -> Self {
        self.supertype = Some(supertype);
        self
    }

    /// Declare one field.
    pub fn field(mut self, descriptor: PropertyDescriptor) -> Self {
        self.declared.push(Arc::new(descriptor));
        self
    }

    /// Serialize this kind as the named field's value instead of as an
    /// object. The field must exist in the descriptor map; a miss is a
    /// fatal schema error surfaced at first serialization.
    pub fn serialize_only(mut self, field: impl Into<String>) -> Self {
        self.serialize_only = Some(field.into());
        self
    }

    /// Normalize the input tree before field resolution.
    pub fn pre_construct(mut self, hook: PreConstruct) -> Self {
        self.pre_construct = Some(hook);
        self
    }

    /// Normalize the entity after field resolution.
    pub fn post_construct(mut self, hook: PostConstruct) -> Self {
        self.post_construct = Some(hook);
        self
    }

    /// Provide the kind's own string-decoding entry point.
    pub fn string_decoder(mut self, hook: KindStringDecoder) -> Self {
        self.string_decoder = Some(hook);
        self
    }

    /// Check descriptor shapes and produce the kind.
    pub fn build(self) -> Result<Arc<EntityKind>, SchemaError> {
        for descriptor in &self.declared {
            descriptor.ensure_well_formed(&self.name)?;
        }
        Ok(Arc::new(EntityKind {
            name: self.name,
            tag: self.tag,
            version: self.version,
            supertype: self.supertype,
            declared: self.declared,
            serialize_only: self.serialize_only,
            pre_construct: self.pre_construct,
            post_construct: self.post_construct,
            string_decoder: self.string_decoder,
            schema: OnceLock::new(),
        }))
    }
}

/// Ordered map from field key to descriptor for one entity kind, merged
/// down the supertype chain.
#[derive(Debug)]
pub struct SchemaMap {
    kind_name: String,
    fields: BTreeMap<String, Arc<PropertyDescriptor>>,
}

impl SchemaMap {
    /// Merge a kind's declared descriptors with its inherited ones.
    /// A field declared on a subtype always overrides one inherited from
    /// a supertype of the same name.
    fn build(kind: &EntityKind) -> SchemaMap {
        let mut fields: BTreeMap<String, Arc<PropertyDescriptor>> = BTreeMap::new();
        let mut current = Some(kind);
        while let Some(k) = current {
            for descriptor in &k.declared {
                fields
                    .entry(descriptor.key().to_string())
                    .or_insert_with(|| Arc::clone(descriptor));
            }
            current = k.supertype.as_deref();
        }
        // The always-present meta descriptors.
        for descriptor in [
            PropertyDescriptor::string(TYPE_KEY).optional(),
            PropertyDescriptor::number(VERSION_KEY).optional(),
            PropertyDescriptor::string(CONTEXT_KEY).optional(),
        ] {
            fields
                .entry(descriptor.key().to_string())
                .or_insert_with(|| Arc::new(descriptor));
        }
        SchemaMap {
            kind_name: kind.name.clone(),
            fields,
        }
    }

    /// The kind this map belongs to.
    pub fn kind_name(&self) -> &str {
        &self.kind_name
    }

    /// Look up a descriptor by field key.
    pub fn get(&self, key: &str) -> Option<&Arc<PropertyDescriptor>> {
        self.fields.get(key)
    }

    /// All descriptors in lexicographic key order, meta fields included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<PropertyDescriptor>)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Data-field descriptors in lexicographic key order, meta fields
    /// excluded.
    pub fn data_fields(&self) -> impl Iterator<Item = (&str, &Arc<PropertyDescriptor>)> {
        self.iter().filter(|(key, _)| !meta::is_meta_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PropertyDescriptor;

    fn base_kind() -> Arc<EntityKind> {
        EntityKind::builder("Base")
            .field(PropertyDescriptor::string("id"))
            .field(PropertyDescriptor::string("label").optional())
            .build()
            .unwrap()
    }

    #[test]
    fn test_subtype_overrides_inherited_field() {
        let base = base_kind();
        let derived = EntityKind::builder("Derived")
            .supertype(base)
            .field(PropertyDescriptor::string("label").optional().with_max_length(3))
            .build()
            .unwrap();

        let schema = derived.schema();
        let label = schema.get("label").unwrap();
        // The subtype's re-declaration wins over the inherited one.
        assert_eq!(label.max_length(), Some(3));
        // Inherited fields still present.
        assert!(schema.get("id").is_some());
    }

    #[test]
    fn test_meta_fields_always_present() {
        let schema = base_kind().schema().clone();
        assert!(schema.get("@type").is_some());
        assert!(schema.get("@version").is_some());
        assert!(schema.get("@context").is_some());
        // Meta fields are excluded from data-field iteration.
        let keys: Vec<&str> = schema.data_fields().map(|(k, _)| k).collect();
        assert_eq!(keys, ["id", "label"]);
    }

    #[test]
    fn test_schema_map_is_cached() {
        let kind = base_kind();
        let first = Arc::as_ptr(kind.schema());
        let second = Arc::as_ptr(kind.schema());
        assert_eq!(first, second);
    }

    #[test]
    fn test_iteration_is_lexicographic_not_declaration_order() {
        let kind = EntityKind::builder("Widget")
            .field(PropertyDescriptor::string("zeta"))
            .field(PropertyDescriptor::string("alpha"))
            .build()
            .unwrap();
        let keys: Vec<&str> = kind.schema().data_fields().map(|(k, _)| k).collect();
        assert_eq!(keys, ["alpha", "zeta"]);
    }

    #[test]
    fn test_conforms_to_walks_chain() {
        let base = base_kind();
        let derived = EntityKind::builder("Derived").supertype(base).build().unwrap();
        assert!(derived.conforms_to("Derived"));
        assert!(derived.conforms_to("Base"));
        assert!(!derived.conforms_to("Other"));
    }

    #[test]
    fn test_versioned_key() {
        let kind = EntityKind::builder("Person").version(2).build().unwrap();
        assert_eq!(kind.versioned_key(), "Person@2");
    }

    #[test]
    fn test_builder_rejects_malformed_descriptor() {
        let result = EntityKind::builder("Bad")
            .field(PropertyDescriptor::union("u", Vec::<String>::new()))
            .build();
        assert!(result.is_err());
    }
}
