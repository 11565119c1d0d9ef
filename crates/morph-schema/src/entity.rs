//! # Entity Instances
//!
//! A strongly-typed in-memory object: a kind identity plus field values.
//! Instances are owned exclusively by whoever holds them; the only shared
//! state they touch is the kind's cached schema map, which is read-only
//! after schema definition.
//!
//! Field assignment goes through [`Entity::set`], which runs the full
//! constraint check, or [`Entity::insert_unchecked`], which the parsing
//! engine uses after its own structural checks.

use std::collections::BTreeMap;
use std::sync::Arc;

use morph_core::{FieldPath, ValidationError};

use crate::kind::EntityKind;
use crate::validate;
use crate::value::FieldValue;

/// One entity instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    kind: Arc<EntityKind>,
    context: Option<String>,
    fields: BTreeMap<String, FieldValue>,
}

impl Entity {
    /// A blank instance of `kind` with no fields set.
    pub fn new(kind: Arc<EntityKind>) -> Self {
        Self {
            kind,
            context: None,
            fields: BTreeMap::new(),
        }
    }

    /// The kind this instance belongs to.
    pub fn kind(&self) -> &Arc<EntityKind> {
        &self.kind
    }

    /// The pass-through `@context` marker, if the wire tree carried one.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Set the pass-through `@context` marker.
    pub fn set_context(&mut self, context: impl Into<String>) {
        self.context = Some(context.into());
    }

    /// Read one field. `None` means the field is absent (distinct from an
    /// explicit [`FieldValue::Null`]).
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Iterate all set fields in lexicographic key order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Assign one field, running the full constraint check first.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the field is unknown to the
    /// kind's schema map or the value violates the field's constraints.
    pub fn set(
        &mut self,
        field: impl Into<String>,
        value: FieldValue,
    ) -> Result<(), ValidationError> {
        let field = field.into();
        let schema = Arc::clone(self.kind.schema());
        let Some(descriptor) = schema.get(&field) else {
            return Err(ValidationError::new(
                self.kind.name(),
                FieldPath::field(&field),
                "(undeclared)",
                "field is not declared on this kind",
            ));
        };
        validate::check(Some(&value), descriptor).map_err(|reason| {
            ValidationError::new(
                self.kind.name(),
                FieldPath::field(&field),
                descriptor.declared_type(),
                reason,
            )
        })?;
        self.fields.insert(field, value);
        Ok(())
    }

    /// Assign one field without constraint checking. Used by the parsing
    /// engine after its structural checks; callers that want business
    /// rules enforced use [`Entity::set`].
    pub fn insert_unchecked(&mut self, field: impl Into<String>, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    /// Check every field against its descriptor, returning the first
    /// failure with its field path and declared type.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (key, descriptor) in self.kind.schema().data_fields() {
            let value = self.fields.get(key);
            validate::check(value, descriptor).map_err(|reason| {
                ValidationError::new(
                    self.kind.name(),
                    FieldPath::field(key),
                    descriptor.declared_type(),
                    reason,
                )
            })?;
        }
        Ok(())
    }

    /// Whether this instance's kind is `kind_name` or a subtype of it.
    pub fn is_instance_of(&self, kind_name: &str) -> bool {
        self.kind.conforms_to(kind_name)
    }
}
