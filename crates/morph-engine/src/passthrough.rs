//! # Passthrough Kind
//!
//! The built-in kind an untyped wire tree resolves to. It preserves the
//! whole tree (minus the type and version meta keys) opaquely in a single
//! field and emits it back unchanged, so unknown or schemaless payloads
//! survive a parse/serialize cycle byte-for-byte.

use std::sync::Arc;

use serde_json::{Map, Value};

use morph_core::meta::{TYPE_KEY, VERSION_KEY};
use morph_schema::{EntityKind, PropertyDescriptor};

/// Kind name and wire tag of the built-in passthrough kind.
pub const PASSTHROUGH_KIND: &str = "Passthrough";

/// The field holding the preserved tree.
pub const PASSTHROUGH_FIELD: &str = "value";

/// Build the passthrough kind: one opaque field, emitted bare through a
/// serialize-only override, populated by wrapping the incoming tree
/// before field resolution.
pub(crate) fn passthrough_kind() -> Arc<EntityKind> {
    EntityKind::builder(PASSTHROUGH_KIND)
        .field(PropertyDescriptor::any(PASSTHROUGH_FIELD).optional())
        .serialize_only(PASSTHROUGH_FIELD)
        .pre_construct(Arc::new(|tree: &Value| {
            let stripped = match tree {
                Value::Object(fields) => {
                    let mut fields = fields.clone();
                    fields.remove(TYPE_KEY);
                    fields.remove(VERSION_KEY);
                    Value::Object(fields)
                }
                other => other.clone(),
            };
            let mut wrapped = Map::new();
            wrapped.insert(PASSTHROUGH_FIELD.to_string(), stripped);
            Ok(Value::Object(wrapped))
        }))
        .build()
        // Build can only fail on a malformed descriptor; a single optional
        // any-typed field always passes the shape check.
        .expect("passthrough kind descriptors are well-formed")
}
