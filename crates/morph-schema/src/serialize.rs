//! # Serialization Engine
//!
//! Converts entity instances back into the loosely-typed wire tree.
//!
//! ## Determinism
//!
//! Output field order is always lexicographic, never declaration order:
//! the schema map iterates in key order and the default `serde_json::Map`
//! is BTreeMap-backed, so equivalent entities always produce byte-identical
//! trees and text.
//!
//! ## Verbosity
//!
//! Meta fields are emitted only when `verbose` is requested, with the
//! version omitted at its default of 1 — except that a nested value whose
//! concrete kind is narrower than the field's declared kind, a union-typed
//! field, and an `any` field are always emitted verbose so the wire tree
//! stays self-describing.

use serde_json::{Map, Value};

use morph_core::meta::{CONTEXT_KEY, DEFAULT_VERSION, TYPE_KEY, VERSION_KEY};
use morph_core::{tree, FieldPath, MorphError, SchemaError, SerializationError};

use crate::descriptor::PropertyDescriptor;
use crate::entity::Entity;
use crate::value::FieldValue;

impl Entity {
    /// Emit this entity as a wire tree.
    ///
    /// A kind-level serialize-only override short-circuits the whole
    /// object shape and wins over `verbose`; an override naming a field
    /// absent from the schema map is a fatal schema error.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] for a malformed serialize-only override or
    /// descriptor, [`SerializationError`] when a value cannot be emitted.
    pub fn to_tree(&self, verbose: bool) -> Result<Value, MorphError> {
        let schema = self.kind().schema();

        if let Some(field) = self.kind().serialize_only() {
            let descriptor = schema.get(field).ok_or_else(|| SchemaError::MissingOverrideField {
                kind: self.kind().name().to_string(),
                field: field.to_string(),
            })?;
            return match self.get(field) {
                None => Ok(Value::Null),
                Some(value) => serialize_field(
                    self.kind().name(),
                    value,
                    descriptor,
                    verbose,
                    &FieldPath::field(field),
                ),
            };
        }

        let mut map = Map::new();
        if verbose {
            map.insert(
                TYPE_KEY.to_string(),
                Value::String(self.kind().tag().to_string()),
            );
            if self.kind().version() != DEFAULT_VERSION {
                map.insert(VERSION_KEY.to_string(), Value::from(self.kind().version()));
            }
            if let Some(context) = self.context() {
                map.insert(CONTEXT_KEY.to_string(), Value::String(context.to_string()));
            }
        }

        for (key, descriptor) in schema.data_fields() {
            match self.get(key) {
                // Optional absent fields are omitted entirely.
                None if descriptor.is_optional() => continue,
                // A defined-but-absent value is emitted as null.
                None | Some(FieldValue::Null) => {
                    map.insert(key.to_string(), Value::Null);
                }
                Some(value) => {
                    let tree = serialize_field(
                        self.kind().name(),
                        value,
                        descriptor,
                        verbose,
                        &FieldPath::field(key),
                    )?;
                    map.insert(key.to_string(), tree);
                }
            }
        }
        Ok(Value::Object(map))
    }

    /// Emit this entity as wire text.
    pub fn to_text(&self, verbose: bool) -> Result<String, MorphError> {
        let value = self.to_tree(verbose)?;
        tree::to_text(&value).map_err(|e| {
            MorphError::from(
                SerializationError::at(
                    self.kind().name(),
                    FieldPath::root(),
                    "cannot encode wire text",
                )
                .with_cause(e),
            )
        })
    }
}

/// Emit one field value according to its descriptor.
fn serialize_field(
    entity_kind: &str,
    value: &FieldValue,
    descriptor: &PropertyDescriptor,
    verbose: bool,
    path: &FieldPath,
) -> Result<Value, MorphError> {
    // Hooks take precedence over the generic algorithm: the string
    // serializer when string serialization is requested for the field,
    // otherwise the tree serializer.
    if descriptor.enforces_string() {
        if let Some(hook) = descriptor.custom_string_serializer() {
            return Ok(Value::String(hook(value, descriptor)?));
        }
    }
    if let Some(hook) = descriptor.custom_serializer() {
        return hook(value, descriptor);
    }

    match value {
        FieldValue::Null => Ok(Value::Null),
        FieldValue::Bool(b) => Ok(Value::Bool(*b)),
        FieldValue::Number(n) => Ok(Value::Number(n.clone())),
        FieldValue::String(s) => Ok(Value::String(s.clone())),
        FieldValue::Any(tree) => Ok(tree.clone()),
        FieldValue::Array(items) => {
            let item_descriptor =
                descriptor.item().ok_or_else(|| SchemaError::MalformedDescriptor {
                    kind: entity_kind.to_string(),
                    field: descriptor.key().to_string(),
                    reason: "array field has no item descriptor".to_string(),
                })?;
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                out.push(serialize_field(
                    entity_kind,
                    item,
                    item_descriptor,
                    verbose,
                    &path.join_index(index),
                )?);
            }
            Ok(Value::Array(out))
        }
        FieldValue::Entity(nested) => {
            // A subtype narrower than the declared kind, a union member,
            // or an any value must stay self-describing on the wire.
            let forced = descriptor.is_any()
                || !descriptor.union_types().is_empty()
                || nested.kind().name() != descriptor.declared_type();
            let nested_tree = nested.to_tree(verbose || forced)?;
            if descriptor.enforces_string() {
                let text = tree::to_text(&nested_tree).map_err(|e| {
                    MorphError::from(
                        SerializationError::at(
                            entity_kind,
                            path.clone(),
                            "cannot string-encode nested tree",
                        )
                        .with_cause(e),
                    )
                })?;
                Ok(Value::String(text))
            } else {
                Ok(nested_tree)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PropertyDescriptor;
    use crate::kind::EntityKind;
    use serde_json::json;
    use std::sync::Arc;

    fn address_kind() -> Arc<EntityKind> {
        EntityKind::builder("Address")
            .field(PropertyDescriptor::string("city"))
            .build()
            .unwrap()
    }

    fn po_box_kind(address: Arc<EntityKind>) -> Arc<EntityKind> {
        EntityKind::builder("PoBox")
            .supertype(address)
            .field(PropertyDescriptor::number("box"))
            .build()
            .unwrap()
    }

    fn person_kind() -> Arc<EntityKind> {
        EntityKind::builder("Person")
            .field(PropertyDescriptor::string("zname").with_alias("z"))
            .field(PropertyDescriptor::string("aname").optional())
            .field(PropertyDescriptor::object("home", "Address").optional())
            .build()
            .unwrap()
    }

    #[test]
    fn test_output_keys_are_lexicographic() {
        let mut person = Entity::new(person_kind());
        person.insert_unchecked("zname", FieldValue::from("Ada"));
        person.insert_unchecked("aname", FieldValue::from("Lovelace"));
        let tree = person.to_tree(false).unwrap();
        let keys: Vec<&String> = tree.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["aname", "zname"]);
    }

    #[test]
    fn test_meta_only_when_verbose_and_version_default_omitted() {
        let mut person = Entity::new(person_kind());
        person.insert_unchecked("zname", FieldValue::from("Ada"));

        let terse = person.to_tree(false).unwrap();
        assert!(terse.get("@type").is_none());

        let verbose = person.to_tree(true).unwrap();
        assert_eq!(verbose["@type"], json!("Person"));
        // Version 1 is the default and stays off the wire.
        assert!(verbose.get("@version").is_none());
    }

    #[test]
    fn test_versioned_kind_emits_version() {
        let kind = EntityKind::builder("Person").version(2).build().unwrap();
        let person = Entity::new(kind);
        let tree = person.to_tree(true).unwrap();
        assert_eq!(tree["@version"], json!(2));
    }

    #[test]
    fn test_optional_absent_omitted_required_absent_null() {
        let person = Entity::new(person_kind());
        let tree = person.to_tree(false).unwrap();
        // Required without a value: explicit null.
        assert_eq!(tree["zname"], Value::Null);
        // Optional without a value: no key at all.
        assert!(tree.get("aname").is_none());
        assert!(tree.get("home").is_none());
    }

    #[test]
    fn test_subtype_forces_verbose_emission() {
        let address = address_kind();
        let po_box = po_box_kind(Arc::clone(&address));

        let mut home = Entity::new(po_box);
        home.insert_unchecked("city", FieldValue::from("Berlin"));
        home.insert_unchecked("box", FieldValue::from(99i64));

        let mut person = Entity::new(person_kind());
        person.insert_unchecked("zname", FieldValue::from("Ada"));
        person.insert_unchecked("home", FieldValue::from(home));

        // Outer emission is terse, but the narrower nested kind still
        // carries its tag.
        let tree = person.to_tree(false).unwrap();
        assert_eq!(tree["home"]["@type"], json!("PoBox"));
    }

    #[test]
    fn test_declared_kind_honors_outer_flag() {
        let mut home = Entity::new(address_kind());
        home.insert_unchecked("city", FieldValue::from("Berlin"));

        let mut person = Entity::new(person_kind());
        person.insert_unchecked("zname", FieldValue::from("Ada"));
        person.insert_unchecked("home", FieldValue::from(home));

        let tree = person.to_tree(false).unwrap();
        assert!(tree["home"].get("@type").is_none());

        let tree = person.to_tree(true).unwrap();
        assert_eq!(tree["home"]["@type"], json!("Address"));
    }

    #[test]
    fn test_serialize_only_override_emits_bare_value() {
        let kind = EntityKind::builder("Ref")
            .field(PropertyDescriptor::string("id"))
            .serialize_only("id")
            .build()
            .unwrap();
        let mut entity = Entity::new(kind);
        entity.insert_unchecked("id", FieldValue::from("ref-1"));
        // The override wins over verbose meta emission.
        assert_eq!(entity.to_tree(true).unwrap(), json!("ref-1"));
    }

    #[test]
    fn test_serialize_only_missing_field_is_schema_error() {
        let kind = EntityKind::builder("Broken")
            .field(PropertyDescriptor::string("id"))
            .serialize_only("no_such_field")
            .build()
            .unwrap();
        let err = Entity::new(kind).to_tree(false).unwrap_err();
        assert!(matches!(err, MorphError::Schema(_)), "got: {err}");
    }

    #[test]
    fn test_string_encoded_field_emits_text() {
        let kind = EntityKind::builder("Person")
            .field(PropertyDescriptor::object("home", "Address").string_encoded())
            .build()
            .unwrap();
        let mut home = Entity::new(address_kind());
        home.insert_unchecked("city", FieldValue::from("Berlin"));
        let mut person = Entity::new(kind);
        person.insert_unchecked("home", FieldValue::from(home));

        let tree = person.to_tree(false).unwrap();
        let encoded = tree["home"].as_str().unwrap();
        assert_eq!(tree::from_text(encoded).unwrap(), json!({"city": "Berlin"}));
    }

    #[test]
    fn test_custom_serializer_takes_precedence() {
        let kind = EntityKind::builder("Stamp")
            .field(
                PropertyDescriptor::number("when").with_custom_serializer(Arc::new(|_, _| {
                    Ok(json!("redacted"))
                })),
            )
            .build()
            .unwrap();
        let mut entity = Entity::new(kind);
        entity.insert_unchecked("when", FieldValue::from(12345i64));
        assert_eq!(entity.to_tree(false).unwrap()["when"], json!("redacted"));
    }

    #[test]
    fn test_array_recurses_with_item_descriptor() {
        let kind = EntityKind::builder("Bag")
            .field(PropertyDescriptor::array(
                "tags",
                PropertyDescriptor::string("tag"),
            ))
            .build()
            .unwrap();
        let mut entity = Entity::new(kind);
        entity.insert_unchecked(
            "tags",
            FieldValue::Array(vec![FieldValue::from("a"), FieldValue::from("b")]),
        );
        assert_eq!(entity.to_tree(false).unwrap()["tags"], json!(["a", "b"]));
    }

    #[test]
    fn test_any_field_round_trips_raw_tree() {
        let kind = EntityKind::builder("Holder")
            .field(PropertyDescriptor::any("extra"))
            .build()
            .unwrap();
        let raw = json!({"@type": "Whatever", "deep": [1, null, {"x": true}]});
        let mut entity = Entity::new(kind);
        entity.insert_unchecked("extra", FieldValue::Any(raw.clone()));
        assert_eq!(entity.to_tree(false).unwrap()["extra"], raw);
    }

    #[test]
    fn test_text_emission_is_deterministic() {
        let mut person = Entity::new(person_kind());
        person.insert_unchecked("zname", FieldValue::from("Ada"));
        person.insert_unchecked("aname", FieldValue::from("Lovelace"));
        assert_eq!(
            person.to_text(true).unwrap(),
            person.to_text(true).unwrap()
        );
    }
}
