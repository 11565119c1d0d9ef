//! # Suspension-Capable Parsing
//!
//! Async mirror of the parse engine for callers that resolve nested
//! values out-of-band, typically by reference lookup against a store or
//! a network service. A [`NestedResolver`] is consulted before every
//! nested-object construction; returning `Ok(None)` falls back to the
//! regular in-band algorithm, so a resolver that never resolves anything
//! produces output byte-identical to the synchronous engine.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{Map, Value};

use morph_core::meta;
use morph_core::{tree, FieldPath, MorphError, ParseError, SchemaError, TreeKind};
use morph_schema::{validate, Entity, EntityKind, FieldValue, PrimitiveKind, PropertyDescriptor};

use crate::parse::{ensure_instance_allowed, parse_scalar};
use crate::registry::TypeRegistry;

/// Out-of-band resolution hook for nested object values.
#[async_trait]
pub trait NestedResolver: Send + Sync {
    /// Produce the field value for a nested wire tree, or `Ok(None)` to
    /// let the engine construct it in-band.
    async fn resolve(
        &self,
        value: &Value,
        descriptor: &PropertyDescriptor,
    ) -> Result<Option<FieldValue>, MorphError>;
}

/// Resolver that never resolves anything, for callers that only need the
/// async entry points.
pub struct NoResolution;

#[async_trait]
impl NestedResolver for NoResolution {
    async fn resolve(
        &self,
        _value: &Value,
        _descriptor: &PropertyDescriptor,
    ) -> Result<Option<FieldValue>, MorphError> {
        Ok(None)
    }
}

impl TypeRegistry {
    /// Async variant of [`TypeRegistry::from_tree`], consulting `resolver`
    /// before each nested-object construction.
    pub fn from_tree_suspendable<'a>(
        &'a self,
        value: &'a Value,
        resolver: &'a dyn NestedResolver,
    ) -> BoxFuture<'a, Result<Entity, MorphError>> {
        async move {
            let tag = meta::type_tag(value)?;
            // Same strict version read as the sync engine, before the
            // passthrough fallthrough.
            let version = meta::version_tag(value)?;
            match tag {
                None => {
                    let kind = self.passthrough_kind().clone();
                    self.from_tree_as_suspendable(value, kind, resolver).await
                }
                Some(tag) => {
                    let kind = self.lookup(tag, version)?.clone();
                    self.from_tree_as_suspendable(value, kind, resolver).await
                }
            }
        }
        .boxed()
    }

    /// Async variant of [`TypeRegistry::from_tree_as`].
    pub fn from_tree_as_suspendable<'a>(
        &'a self,
        value: &'a Value,
        kind: Arc<EntityKind>,
        resolver: &'a dyn NestedResolver,
    ) -> BoxFuture<'a, Result<Entity, MorphError>> {
        async move {
            let mut value: Cow<'_, Value> = Cow::Borrowed(value);

            if let Some(hook) = kind.pre_construct() {
                value = Cow::Owned(hook(&value)?);
            }

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
                let parsed = self
                    .parse_property_suspendable(kind.name(), path, raw, descriptor, resolver)
                    .await?;
                if let Some(parsed) = parsed {
                    entity.insert_unchecked(key, parsed);
                }
            }

            if let Some(hook) = kind.post_construct() {
                hook(&mut entity)?;
            }
            Ok(entity)
        }
        .boxed()
    }

    fn parse_property_suspendable<'a>(
        &'a self,
        entity_kind: &'a str,
        path: FieldPath,
        raw: Option<&'a Value>,
        descriptor: &'a PropertyDescriptor,
        resolver: &'a dyn NestedResolver,
    ) -> BoxFuture<'a, Result<Option<FieldValue>, MorphError>> {
        async move {
            let raw = match raw {
                None | Some(Value::Null) if !descriptor.is_optional() => {
                    return Err(ParseError::at(
                        entity_kind,
                        path,
                        format!("required value '{}' not defined", descriptor.key()),
                    )
                    .into());
                }
                None => return Ok(None),
                Some(Value::Null) => return Ok(Some(FieldValue::Null)),
                Some(raw) => raw,
            };

            if let Some(hook) = descriptor.custom_parser() {
                return hook(raw, descriptor).map(Some);
            }

            if descriptor.is_any() {
                return Ok(Some(FieldValue::Any(raw.clone())));
            }

            if !descriptor.allowed_types().is_empty() {
                let found = match PrimitiveKind::of_tree(raw) {
                    Some(found) => found,
                    None => return Ok(Some(FieldValue::Null)),
                };
                if !descriptor.allowed_types().contains(&found) {
                    return Err(ParseError::at(
                        entity_kind,
                        path,
                        format!(
                            "type {found} is not among the allowed types of '{}'",
                            descriptor.key()
                        ),
                    )
                    .into());
                }
                return match raw {
                    Value::Array(_) if descriptor.item().is_some() => self
                        .parse_array_suspendable(entity_kind, path, raw, descriptor, resolver)
                        .await
                        .map(Some),
                    Value::Array(_) | Value::Object(_) => Ok(Some(FieldValue::Any(raw.clone()))),
                    scalar => Ok(FieldValue::from_scalar(scalar)),
                };
            }

            match descriptor.primitive() {
                PrimitiveKind::Boolean | PrimitiveKind::Number | PrimitiveKind::String => {
                    parse_scalar(entity_kind, &path, raw, descriptor).map(Some)
                }
                PrimitiveKind::Array => self
                    .parse_array_suspendable(entity_kind, path, raw, descriptor, resolver)
                    .await
                    .map(Some),
                PrimitiveKind::Object => {
                    self.parse_object_suspendable(entity_kind, path, raw, descriptor, resolver)
                        .await
                }
            }
        }
        .boxed()
    }

    fn parse_array_suspendable<'a>(
        &'a self,
        entity_kind: &'a str,
        path: FieldPath,
        raw: &'a Value,
        descriptor: &'a PropertyDescriptor,
        resolver: &'a dyn NestedResolver,
    ) -> BoxFuture<'a, Result<FieldValue, MorphError>> {
        async move {
            let Value::Array(items) = raw else {
                return Err(ParseError::at(
                    entity_kind,
                    path,
                    format!("expected array, found {}", TreeKind::of(raw)),
                )
                .into());
            };
            validate::check_length_bounds(items.len(), descriptor)
                .map_err(|reason| ParseError::at(entity_kind, path.clone(), reason))?;
            let item_descriptor =
                descriptor
                    .item()
                    .ok_or_else(|| SchemaError::MalformedDescriptor {
                        kind: entity_kind.to_string(),
                        field: descriptor.key().to_string(),
                        reason: "array field has no item descriptor".to_string(),
                    })?;
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let element_path = path.join_index(index);
                let parsed = self
                    .parse_property_suspendable(
                        entity_kind,
                        element_path,
                        Some(item),
                        item_descriptor,
                        resolver,
                    )
                    .await?;
                match parsed {
                    Some(value) => out.push(value),
                    None => out.push(FieldValue::Null),
                }
            }
            Ok(FieldValue::Array(out))
        }
        .boxed()
    }

    fn parse_object_suspendable<'a>(
        &'a self,
        entity_kind: &'a str,
        path: FieldPath,
        raw: &'a Value,
        descriptor: &'a PropertyDescriptor,
        resolver: &'a dyn NestedResolver,
    ) -> BoxFuture<'a, Result<Option<FieldValue>, MorphError>> {
        async move {
            // The suspension point: the resolver sees the raw nested tree
            // before any in-band construction happens.
            if let Some(resolved) = resolver.resolve(raw, descriptor).await? {
                return Ok(Some(resolved));
            }

            if let Value::String(text) = raw {
                if descriptor.decodes_string() {
                    if let Some(hook) = descriptor.custom_string_decoder() {
                        return hook(text, descriptor).map(Some);
                    }
                    let decoded = match self
                        .find_kind(descriptor.declared_type())
                        .and_then(|kind| kind.string_decoder().cloned())
                    {
                        Some(decoder) => decoder(text)?,
                        None => tree::from_text(text).map_err(|e| {
                            ParseError::at(
                                entity_kind,
                                path.clone(),
                                "malformed string-encoded tree",
                            )
                            .with_cause(e)
                        })?,
                    };
                    if decoded.is_null() {
                        return Ok(Some(FieldValue::Null));
                    }
                    return self
                        .parse_object_suspendable(
                            entity_kind,
                            path,
                            &decoded,
                            descriptor,
                            resolver,
                        )
                        .await;
                }
            }

            let tag = meta::type_tag(raw)?;
            let dispatch = tag.is_some()
                && (descriptor.parses_as_polymorphic()
                    || descriptor.allow_subclasses() != Some(false));
            if dispatch {
                let nested = self.from_tree_suspendable(raw, resolver).await?;
                ensure_instance_allowed(entity_kind, &path, &nested, descriptor)?;
                return Ok(Some(FieldValue::from(nested)));
            }

            if !descriptor.union_types().is_empty() {
                return Err(ParseError::at(
                    entity_kind,
                    path,
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
            let nested = self.from_tree_as_suspendable(raw, kind, resolver).await?;
            Ok(Some(FieldValue::from(nested)))
        }
        .boxed()
    }
}
