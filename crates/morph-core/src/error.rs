//! # Error Types — Structured Error Hierarchy
//!
//! Defines the five error kinds used throughout the Morph Stack. All errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - The kinds are flat: schema definition errors, registry lookup misses,
//!   structural parse failures, business-rule validation failures, and
//!   serialization failures. Callers distinguish "malformed data"
//!   ([`ParseError`]) from "policy violation" ([`ValidationError`]) by kind.
//! - Every kind carries the entity kind and [`FieldPath`] where it occurred.
//! - Causes are chained through `#[source]`, so a low-level decode failure
//!   surfaces alongside the higher-level field that triggered it.
//! - No partial object is ever returned alongside an error.

use thiserror::Error;

use crate::path::FieldPath;

/// Boxed cause for chaining lower-level failures under an engine error.
pub type ErrorCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for the Morph Stack.
#[derive(Error, Debug)]
pub enum MorphError {
    /// Malformed schema definition, surfaced at first use.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Tag+version lookup found no registration.
    #[error(transparent)]
    RegistryMiss(#[from] RegistryMissError),

    /// A field failed structural parsing.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A business-rule constraint was violated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A value could not be emitted to the wire tree.
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// Malformed schema definition. Always fatal.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Two registrations claimed the same `"{tag}@{version}"` key.
    ///
    /// The append-only module list would otherwise let the earlier entry
    /// silently shadow the later one; duplicate registration is rejected at
    /// startup instead.
    #[error("duplicate registration for '{key}' in module '{module}'")]
    DuplicateRegistration {
        /// The versioned lookup key that was already taken.
        key: String,
        /// The module that attempted the second registration.
        module: String,
    },

    /// A serialize-only override names a field absent from the kind's
    /// descriptor map. This is a malformed schema, not a data error.
    #[error("serialize-only override on kind '{kind}' names unknown field '{field}'")]
    MissingOverrideField {
        /// The entity kind carrying the override.
        kind: String,
        /// The field the override names.
        field: String,
    },

    /// A property descriptor violates the descriptor shape invariant
    /// (scalar, array-with-item, or object-with-declared-type).
    #[error("malformed descriptor '{field}' on kind '{kind}': {reason}")]
    MalformedDescriptor {
        /// The entity kind declaring the descriptor.
        kind: String,
        /// The descriptor's field key.
        field: String,
        /// What is wrong with the descriptor.
        reason: String,
    },

    /// A field's declared entity kind is not known to the registry.
    #[error("declared kind '{kind}' is not registered (field {path})")]
    UnknownDeclaredKind {
        /// The declared kind name that could not be resolved.
        kind: String,
        /// The field whose declaration references it.
        path: FieldPath,
    },
}

/// A tag+version pair had no matching registration.
#[derive(Error, Debug)]
#[error("unknown type: no registration for '{tag}' at version {version}")]
pub struct RegistryMissError {
    /// The wire type tag that was looked up.
    pub tag: String,
    /// The version that was looked up (1 when absent on the wire).
    pub version: u32,
}

/// A field failed structural parsing: wrong shape, missing required value,
/// decode failure of a string-encoded nested tree, or an array element
/// failure. Fatal for the whole parse call.
#[derive(Error, Debug)]
#[error("parse error [{entity_kind}] at {path}: {reason}")]
pub struct ParseError {
    /// The entity kind being constructed when the failure occurred.
    pub entity_kind: String,
    /// Dotted/indexed position of the offending field.
    pub path: FieldPath,
    /// Human-readable description of the failure.
    pub reason: String,
    /// Lower-level failure that triggered this one, if any.
    #[source]
    pub cause: Option<ErrorCause>,
}

impl ParseError {
    /// A parse failure at a specific field path.
    pub fn at(entity_kind: impl Into<String>, path: FieldPath, reason: impl Into<String>) -> Self {
        Self {
            entity_kind: entity_kind.into(),
            path,
            reason: reason.into(),
            cause: None,
        }
    }

    /// A parse failure at the entity root.
    pub fn new(entity_kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::at(entity_kind, FieldPath::root(), reason)
    }

    /// Attach a lower-level cause.
    pub fn with_cause(mut self, cause: impl Into<ErrorCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Re-raise from the context of an enclosing field.
    pub fn in_field(mut self, name: impl Into<String>) -> Self {
        self.path = self.path.prefixed_with_field(name);
        self
    }

    /// Re-raise from the context of an enclosing array element.
    pub fn at_index(mut self, index: usize) -> Self {
        self.path = self.path.prefixed_with_index(index);
        self
    }
}

/// A business-rule constraint was violated: bounds, pattern, disallowed
/// value, or inheritance requirement.
#[derive(Error, Debug)]
#[error("validation error [{entity_kind}] at {path} ({declared_type}): {reason}")]
pub struct ValidationError {
    /// The entity kind whose field failed validation.
    pub entity_kind: String,
    /// Position of the offending field.
    pub path: FieldPath,
    /// The field's declared type name.
    pub declared_type: String,
    /// Which rule failed, and how.
    pub reason: String,
}

impl ValidationError {
    /// A validation failure for one field.
    pub fn new(
        entity_kind: impl Into<String>,
        path: FieldPath,
        declared_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            entity_kind: entity_kind.into(),
            path,
            declared_type: declared_type.into(),
            reason: reason.into(),
        }
    }
}

/// A value could not be emitted to the wire tree.
#[derive(Error, Debug)]
#[error("serialization error [{entity_kind}] at {path}: {reason}")]
pub struct SerializationError {
    /// The entity kind being serialized when the failure occurred.
    pub entity_kind: String,
    /// Position of the offending field.
    pub path: FieldPath,
    /// Human-readable description of the failure.
    pub reason: String,
    /// Lower-level failure that triggered this one, if any.
    #[source]
    pub cause: Option<ErrorCause>,
}

impl SerializationError {
    /// A serialization failure at a specific field path.
    pub fn at(entity_kind: impl Into<String>, path: FieldPath, reason: impl Into<String>) -> Self {
        Self {
            entity_kind: entity_kind.into(),
            path,
            reason: reason.into(),
            cause: None,
        }
    }

    /// Attach a lower-level cause.
    pub fn with_cause(mut self, cause: impl Into<ErrorCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_includes_path_and_kind() {
        let err = ParseError::at("Person", FieldPath::field("name"), "value not defined");
        let display = err.to_string();
        assert!(display.contains("Person"));
        assert!(display.contains("name"));
        assert!(display.contains("not defined"));
    }

    #[test]
    fn test_parse_error_index_wrapping() {
        let inner = ParseError::at("Address", FieldPath::field("city"), "expected string");
        let wrapped = inner.at_index(1).in_field("addresses");
        assert_eq!(wrapped.path.to_string(), "addresses[1].city");
    }

    #[test]
    fn test_cause_chain_is_reachable() {
        let decode: serde_json::Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ParseError::new("Person", "malformed string-encoded tree").with_cause(decode);
        let source = std::error::Error::source(&err);
        assert!(source.is_some());
    }

    #[test]
    fn test_registry_miss_names_tag_and_version() {
        let err = RegistryMissError {
            tag: "Person".into(),
            version: 2,
        };
        let display = err.to_string();
        assert!(display.contains("Person"));
        assert!(display.contains('2'));
    }

    #[test]
    fn test_morph_error_is_transparent() {
        let err: MorphError = ValidationError::new(
            "Person",
            FieldPath::field("age"),
            "number",
            "value 200 above maximum 150",
        )
        .into();
        assert!(err.to_string().contains("above maximum"));
    }
}
