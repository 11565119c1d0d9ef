//! # Parse Engine
//!
//! Resolves loosely-typed wire trees into typed [`Entity`] instances by
//! walking each kind's schema descriptor map. Entry points hang off
//! [`TypeRegistry`]: `from_text` and `from_tree` dispatch through the
//! type tag, `from_tree_as` constructs a known kind directly.
//!
//! ## Dispatch
//!
//! A tree carrying a `@type` tag resolves through the registry under its
//! `"{tag}@{version}"` key; a tag without a registration is a hard miss,
//! never a silent fallback. A tree without a tag resolves to the built-in
//! passthrough kind.
//!
//! ## Failure
//!
//! Parsing is fail-fast: the first offending field aborts the whole call
//! with a [`ParseError`] carrying the entity kind and the dotted/indexed
//! path of the failure. No partial entity is ever returned.

use std::borrow::Cow;

use serde_json::{Map, Value};

use morph_core::meta;
use morph_core::{tree, FieldPath, MorphError, ParseError, SchemaError, TreeKind};
use morph_schema::{validate, Entity, EntityKind, FieldValue, PrimitiveKind, PropertyDescriptor};

use crate::registry::TypeRegistry;

use std::sync::Arc;

impl TypeRegistry {
    /// Decode wire text and resolve it into an entity.
    pub fn from_text(&self, text: &str) -> Result<Entity, MorphError> {
        let value = tree::from_text(text).map_err(|e| {
            MorphError::from(ParseError::new("(untyped)", "malformed wire text").with_cause(e))
        })?;
        self.from_tree(&value)
    }

    /// Resolve a wire tree into an entity, dispatching on its type tag.
    ///
    /// # Errors
    ///
    /// [`RegistryMissError`](morph_core::RegistryMissError) when the tag
    /// and version have no registration, [`ParseError`] when a field fails
    /// structurally.
    pub fn from_tree(&self, value: &Value) -> Result<Entity, MorphError> {
        let tag = meta::type_tag(value)?;
        // The version tag is read strictly even when no type tag is
        // present, so a malformed version is never silently stripped by
        // the passthrough fallthrough.
        let version = meta::version_tag(value)?;
        match tag {
            None => {
                tracing::trace!("untagged tree resolved to passthrough");
                self.from_tree_as(value, self.passthrough_kind().clone())
            }
            Some(tag) => {
                tracing::trace!(tag, version, "registry dispatch");
                let kind = self.lookup(tag, version)?.clone();
                self.from_tree_as(value, kind)
            }
        }
    }

    /// Construct an entity of a known kind from a wire tree, without tag
    /// dispatch at the top level. Nested fields still dispatch through
    /// the registry.
    pub fn from_tree_as(&self, value: &Value, kind: Arc<EntityKind>) -> Result<Entity, MorphError> {
        let mut value: Cow<'_, Value> = Cow::Borrowed(value);

        // Kind-level normalization sees the tree before anything else.
        if let Some(hook) = kind.pre_construct() {
            value = Cow::Owned(hook(&value)?);
        }

        // A kind serialized as a single field accepts that field's bare
        // value on the wire.
        if !value.is_object() {
            if let Some(field) = kind.serialize_only() {
                let mut wrapped = Map::new();
                wrapped.insert(field.to_string(), value.into_owned());
                value = Cow::Owned(Value::Object(wrapped));
            }
        }

        let fields = value.as_object().ok_or_else(|| {
            ParseError::new(
                kind.name(),
                format!("expected object, found {}", TreeKind::of(&value)),
            )
        })?;

        let mut entity = Entity::new(Arc::clone(&kind));
        if let Some(context) = meta::context_tag(&value)? {
            entity.set_context(context);
        }

        for (key, descriptor) in kind.schema().data_fields() {
            let raw = fields
                .get(key)
                .or_else(|| descriptor.alias().and_then(|alias| fields.get(alias)));
            let path = FieldPath::field(key);
            if let Some(parsed) = self.parse_property(kind.name(), &path, raw, descriptor)? {
                entity.insert_unchecked(key, parsed);
            }
        }

        if let Some(hook) = kind.post_construct() {
            hook(&mut entity)?;
        }
        Ok(entity)
    }

    /// Resolve one field's raw wire value against its descriptor.
    /// `Ok(None)` means the field is optional and absent.
    fn parse_property(
        &self,
        entity_kind: &str,
        path: &FieldPath,
        raw: Option<&Value>,
        descriptor: &PropertyDescriptor,
    ) -> Result<Option<FieldValue>, MorphError> {
        let raw = match raw {
            None | Some(Value::Null) if !descriptor.is_optional() => {
                return Err(ParseError::at(
                    entity_kind,
                    path.clone(),
                    format!("required value '{}' not defined", descriptor.key()),
                )
                .into());
            }
            None => return Ok(None),
            Some(Value::Null) => return Ok(Some(FieldValue::Null)),
            Some(raw) => raw,
        };

        // A custom parser substitutes the whole per-field algorithm.
        if let Some(hook) = descriptor.custom_parser() {
            return hook(raw, descriptor).map(Some);
        }

        if descriptor.is_any() {
            return Ok(Some(FieldValue::Any(raw.clone())));
        }

        if !descriptor.allowed_types().is_empty() {
            return self.parse_multi_typed(entity_kind, path, raw, descriptor);
        }

        match descriptor.primitive() {
            PrimitiveKind::Boolean | PrimitiveKind::Number | PrimitiveKind::String => {
                parse_scalar(entity_kind, path, raw, descriptor).map(Some)
            }
            PrimitiveKind::Array => self
                .parse_array(entity_kind, path, raw, descriptor)
                .map(Some),
            PrimitiveKind::Object => self.parse_object(entity_kind, path, raw, descriptor),
        }
    }

    /// A multi-typed field accepts any wire value whose primitive kind is
    /// whitelisted: scalars convert directly, arrays recurse when an item
    /// descriptor is present, everything else is kept opaque.
    fn parse_multi_typed(
        &self,
        entity_kind: &str,
        path: &FieldPath,
        raw: &Value,
        descriptor: &PropertyDescriptor,
    ) -> Result<Option<FieldValue>, MorphError> {
        let found = match PrimitiveKind::of_tree(raw) {
            Some(found) => found,
            None => return Ok(Some(FieldValue::Null)),
        };
        if !descriptor.allowed_types().contains(&found) {
            return Err(ParseError::at(
                entity_kind,
                path.clone(),
                format!(
                    "type {found} is not among the allowed types of '{}'",
                    descriptor.key()
                ),
            )
            .into());
        }
        match raw {
            Value::Array(_) if descriptor.item().is_some() => self
                .parse_array(entity_kind, path, raw, descriptor)
                .map(Some),
            Value::Array(_) | Value::Object(_) => Ok(Some(FieldValue::Any(raw.clone()))),
            scalar => Ok(FieldValue::from_scalar(scalar)),
        }
    }

    fn parse_array(
        &self,
        entity_kind: &str,
        path: &FieldPath,
        raw: &Value,
        descriptor: &PropertyDescriptor,
    ) -> Result<FieldValue, MorphError> {
        let Value::Array(items) = raw else {
            return Err(ParseError::at(
                entity_kind,
                path.clone(),
                format!("expected array, found {}", TreeKind::of(raw)),
            )
            .into());
        };
        validate::check_length_bounds(items.len(), descriptor)
            .map_err(|reason| ParseError::at(entity_kind, path.clone(), reason))?;
        let item_descriptor = descriptor
            .item()
            .ok_or_else(|| SchemaError::MalformedDescriptor {
                kind: entity_kind.to_string(),
                field: descriptor.key().to_string(),
                reason: "array field has no item descriptor".to_string(),
            })?;
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let element_path = path.join_index(index);
            match self.parse_property(entity_kind, &element_path, Some(item), item_descriptor)? {
                Some(value) => out.push(value),
                None => out.push(FieldValue::Null),
            }
        }
        Ok(FieldValue::Array(out))
    }

    fn parse_object(
        &self,
        entity_kind: &str,
        path: &FieldPath,
        raw: &Value,
        descriptor: &PropertyDescriptor,
    ) -> Result<Option<FieldValue>, MorphError> {
        if let Value::String(text) = raw {
            if descriptor.decodes_string() {
                return self.parse_string_object(entity_kind, path, text, descriptor);
            }
        }

        // A tagged value dispatches through the registry, so a subtype of
        // the declared kind (or any union member) resolves to its own
        // schema. An explicit subclass ban parses as the declared kind.
        let tag = meta::type_tag(raw)?;
        let dispatch = tag.is_some()
            && (descriptor.parses_as_polymorphic() || descriptor.allow_subclasses() != Some(false));
        if dispatch {
            let nested = self.from_tree(raw)?;
            ensure_instance_allowed(entity_kind, path, &nested, descriptor)?;
            return Ok(Some(FieldValue::from(nested)));
        }

        if !descriptor.union_types().is_empty() {
            // An untagged union value cannot be resolved to a member.
            return Err(ParseError::at(
                entity_kind,
                path.clone(),
                validate::union_mismatch(descriptor),
            )
            .into());
        }

        let declared = descriptor.declared_type();
        let kind = self
            .find_kind(declared)
            .ok_or_else(|| SchemaError::UnknownDeclaredKind {
                kind: declared.to_string(),
                path: path.clone(),
            })?
            .clone();
        let nested = self.from_tree_as(raw, kind)?;
        Ok(Some(FieldValue::from(nested)))
    }

    /// Decode a string-encoded nested tree, preferring the field's own
    /// decoder, then the declared kind's, then the generic text decode.
    fn parse_string_object(
        &self,
        entity_kind: &str,
        path: &FieldPath,
        text: &str,
        descriptor: &PropertyDescriptor,
    ) -> Result<Option<FieldValue>, MorphError> {
        if let Some(hook) = descriptor.custom_string_decoder() {
            return hook(text, descriptor).map(Some);
        }
        if let Some(kind) = self.find_kind(descriptor.declared_type()) {
            if let Some(decoder) = kind.string_decoder().cloned() {
                let decoded = decoder(text)?;
                return self.parse_decoded(entity_kind, path, &decoded, descriptor);
            }
        }
        let decoded = tree::from_text(text).map_err(|e| {
            ParseError::at(entity_kind, path.clone(), "malformed string-encoded tree").with_cause(e)
        })?;
        self.parse_decoded(entity_kind, path, &decoded, descriptor)
    }

    /// Resolve a decoded tree without re-entering string decoding.
    fn parse_decoded(
        &self,
        entity_kind: &str,
        path: &FieldPath,
        decoded: &Value,
        descriptor: &PropertyDescriptor,
    ) -> Result<Option<FieldValue>, MorphError> {
        if decoded.is_null() {
            return Ok(Some(FieldValue::Null));
        }
        self.parse_object(entity_kind, path, decoded, descriptor)
    }
}

/// Convert a scalar wire value, rejecting kind mismatches.
pub(crate) fn parse_scalar(
    entity_kind: &str,
    path: &FieldPath,
    raw: &Value,
    descriptor: &PropertyDescriptor,
) -> Result<FieldValue, MorphError> {
    let expected = descriptor.primitive();
    match (expected, raw) {
        (PrimitiveKind::Boolean, Value::Bool(b)) => Ok(FieldValue::Bool(*b)),
        (PrimitiveKind::Number, Value::Number(n)) => Ok(FieldValue::Number(n.clone())),
        (PrimitiveKind::String, Value::String(s)) => Ok(FieldValue::String(s.clone())),
        _ => Err(ParseError::at(
            entity_kind,
            path.clone(),
            format!("expected {expected}, found {}", TreeKind::of(raw)),
        )
        .into()),
    }
}

/// Check a dispatched nested entity against the field's declared kind or
/// union members, in declaration order.
pub(crate) fn ensure_instance_allowed(
    entity_kind: &str,
    path: &FieldPath,
    nested: &Entity,
    descriptor: &PropertyDescriptor,
) -> Result<(), MorphError> {
    if !descriptor.union_types().is_empty() {
        if descriptor
            .union_types()
            .iter()
            .any(|member| nested.is_instance_of(member))
        {
            return Ok(());
        }
        return Err(ParseError::at(
            entity_kind,
            path.clone(),
            validate::union_mismatch(descriptor),
        )
        .into());
    }
    if descriptor.declared_type().is_empty() || nested.is_instance_of(descriptor.declared_type()) {
        return Ok(());
    }
    Err(ParseError::at(
        entity_kind,
        path.clone(),
        format!(
            "parsed object of kind '{}' is not an instance of '{}'",
            nested.kind().name(),
            descriptor.declared_type()
        ),
    )
    .into())
}
