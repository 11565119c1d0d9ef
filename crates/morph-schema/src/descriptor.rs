//! # Property Descriptors
//!
//! Per-field metadata records. A descriptor says what one field of one
//! entity kind looks like on the wire, which constraints its values must
//! satisfy, and which custom hooks (if any) replace the generic parse,
//! serialize, or validate algorithm for exactly that field.
//!
//! Descriptors are declared explicitly at schema-registration time through
//! the builder methods on [`PropertyDescriptor`]; there is no derive or
//! attribute magic populating them.
//!
//! ## Shape Invariant
//!
//! Exactly one of the following holds per descriptor, checked by
//! [`PropertyDescriptor::ensure_well_formed`] when a kind is built:
//!
//! - the primitive kind is a scalar (boolean, number, string);
//! - the primitive kind is array and an item descriptor is present;
//! - the primitive kind is object with a declared type, union members,
//!   or the `any` marker.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use morph_core::{MorphError, SchemaError, TreeKind};

use crate::value::FieldValue;

/// The coarse wire-level type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `true`/`false`.
    Boolean,
    /// JSON number.
    Number,
    /// JSON string.
    String,
    /// JSON array; element shape comes from the item descriptor.
    Array,
    /// Nested entity or opaque map.
    Object,
}

impl PrimitiveKind {
    /// The primitive kind of a non-null tree value.
    pub fn of_tree(value: &Value) -> Option<PrimitiveKind> {
        match TreeKind::of(value) {
            TreeKind::Null => None,
            TreeKind::Boolean => Some(PrimitiveKind::Boolean),
            TreeKind::Number => Some(PrimitiveKind::Number),
            TreeKind::String => Some(PrimitiveKind::String),
            TreeKind::Array => Some(PrimitiveKind::Array),
            TreeKind::Object => Some(PrimitiveKind::Object),
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Number => "number",
            PrimitiveKind::String => "string",
            PrimitiveKind::Array => "array",
            PrimitiveKind::Object => "object",
        };
        write!(f, "{name}")
    }
}

/// Hook replacing the generic property-level parse for one field.
///
/// Receives the raw wire value and the field's descriptor; returns the
/// in-memory value to assign.
pub type CustomParser =
    Arc<dyn Fn(&Value, &PropertyDescriptor) -> Result<FieldValue, MorphError> + Send + Sync>;

/// Hook replacing the generic tree emission for one field.
pub type CustomSerializer =
    Arc<dyn Fn(&FieldValue, &PropertyDescriptor) -> Result<Value, MorphError> + Send + Sync>;

/// Hook producing the string encoding of one field, used when string
/// serialization is requested for it.
pub type CustomStringSerializer =
    Arc<dyn Fn(&FieldValue, &PropertyDescriptor) -> Result<String, MorphError> + Send + Sync>;

/// Hook decoding a string-encoded nested tree for one field.
pub type CustomStringDecoder =
    Arc<dyn Fn(&str, &PropertyDescriptor) -> Result<FieldValue, MorphError> + Send + Sync>;

/// Hook adding a field-specific failure reason after the built-in checks.
pub type CustomValidator =
    Arc<dyn Fn(&FieldValue, &PropertyDescriptor) -> Result<(), String> + Send + Sync>;

/// Per-field metadata: wire key, nominal type, constraints, and hooks.
#[derive(Clone)]
pub struct PropertyDescriptor {
    key: String,
    declared_type: String,
    primitive: PrimitiveKind,
    optional: bool,
    alias: Option<String>,
    union_types: Vec<String>,
    item: Option<Box<PropertyDescriptor>>,
    any: bool,
    enforce_string: bool,
    decode_string: bool,
    allow_subclasses: Option<bool>,
    parse_as_polymorphic: bool,
    // Hooks.
    custom_parser: Option<CustomParser>,
    custom_serializer: Option<CustomSerializer>,
    custom_string_serializer: Option<CustomStringSerializer>,
    custom_string_decoder: Option<CustomStringDecoder>,
    custom_validator: Option<CustomValidator>,
    // Validation bounds.
    min_value: Option<f64>,
    max_value: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    allowed_chars: Option<String>,
    disallowed_chars: Option<String>,
    allowed_values: Vec<Value>,
    disallowed_values: Vec<Value>,
    pattern: Option<Regex>,
    allowed_types: Vec<PrimitiveKind>,
    required_inheritance: Vec<Vec<String>>,
}

impl PropertyDescriptor {
    fn base(key: impl Into<String>, declared_type: impl Into<String>, primitive: PrimitiveKind) -> Self {
        Self {
            key: key.into(),
            declared_type: declared_type.into(),
            primitive,
            optional: false,
            alias: None,
            union_types: Vec::new(),
            item: None,
            any: false,
            enforce_string: false,
            decode_string: false,
            allow_subclasses: None,
            parse_as_polymorphic: false,
            custom_parser: None,
            custom_serializer: None,
            custom_string_serializer: None,
            custom_string_decoder: None,
            custom_validator: None,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            allowed_chars: None,
            disallowed_chars: None,
            allowed_values: Vec::new(),
            disallowed_values: Vec::new(),
            pattern: None,
            allowed_types: Vec::new(),
            required_inheritance: Vec::new(),
        }
    }

    /// A required boolean field.
    pub fn boolean(key: impl Into<String>) -> Self {
        Self::base(key, "boolean", PrimitiveKind::Boolean)
    }

    /// A required number field.
    pub fn number(key: impl Into<String>) -> Self {
        Self::base(key, "number", PrimitiveKind::Number)
    }

    /// A required string field.
    pub fn string(key: impl Into<String>) -> Self {
        Self::base(key, "string", PrimitiveKind::String)
    }

    /// A required array field whose elements are described by `item`.
    pub fn array(key: impl Into<String>, item: PropertyDescriptor) -> Self {
        let mut desc = Self::base(key, "array", PrimitiveKind::Array);
        desc.item = Some(Box::new(item));
        desc
    }

    /// A required nested-entity field of the given declared kind.
    pub fn object(key: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let declared = declared_type.into();
        Self::base(key, declared, PrimitiveKind::Object)
    }

    /// A required field holding one of several named entity kinds.
    /// Declaration order is preserved for resolution-failure reporting.
    pub fn union<I, S>(key: impl Into<String>, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut desc = Self::base(key, "", PrimitiveKind::Object);
        desc.union_types = kinds.into_iter().map(Into::into).collect();
        desc
    }

    /// A field whose content is stored and emitted opaquely, without
    /// validation or recursive typing.
    pub fn any(key: impl Into<String>) -> Self {
        let mut desc = Self::base(key, "any", PrimitiveKind::Object);
        desc.any = true;
        desc
    }

    // ─── Builder methods ─────────────────────────────────────────────

    /// Tolerate absence of this field.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Alternate wire key, consulted only when the primary key is absent.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Emit this field's nested tree encoded as a JSON string, and accept
    /// a string-encoded tree on the wire.
    pub fn string_encoded(mut self) -> Self {
        self.enforce_string = true;
        self.decode_string = true;
        self
    }

    /// Accept a string-encoded nested tree on parse without forcing the
    /// string encoding on serialize.
    pub fn decode_string_encoded(mut self) -> Self {
        self.decode_string = true;
        self
    }

    /// Explicitly allow or forbid registered subtypes for this field.
    /// Unset means subtypes are permitted.
    pub fn with_subclasses(mut self, allow: bool) -> Self {
        self.allow_subclasses = Some(allow);
        self
    }

    /// Force polymorphic dispatch through the registry whenever the wire
    /// value carries a type tag, regardless of the declared type.
    pub fn polymorphic(mut self) -> Self {
        self.parse_as_polymorphic = true;
        self
    }

    /// Minimum numeric value (inclusive).
    pub fn with_min_value(mut self, min: f64) -> Self {
        self.min_value = Some(min);
        self
    }

    /// Maximum numeric value (inclusive).
    pub fn with_max_value(mut self, max: f64) -> Self {
        self.max_value = Some(max);
        self
    }

    /// Minimum length for strings and arrays.
    pub fn with_min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    /// Maximum length for strings and arrays.
    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Characters a string value may consist of.
    pub fn with_allowed_chars(mut self, chars: impl Into<String>) -> Self {
        self.allowed_chars = Some(chars.into());
        self
    }

    /// Characters a string value must not contain.
    pub fn with_disallowed_chars(mut self, chars: impl Into<String>) -> Self {
        self.disallowed_chars = Some(chars.into());
        self
    }

    /// Whitelist of exact values.
    pub fn with_allowed_values(mut self, values: Vec<Value>) -> Self {
        self.allowed_values = values;
        self
    }

    /// Blacklist of exact values.
    pub fn with_disallowed_values(mut self, values: Vec<Value>) -> Self {
        self.disallowed_values = values;
        self
    }

    /// Regex a string value must match.
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Coarse primitive-kind whitelist for multi-typed fields.
    pub fn with_allowed_types(mut self, kinds: Vec<PrimitiveKind>) -> Self {
        self.allowed_types = kinds;
        self
    }

    /// OR-of-AND subtype requirements: the value's kind must satisfy every
    /// member of at least one inner list.
    pub fn with_required_inheritance(mut self, requirements: Vec<Vec<String>>) -> Self {
        self.required_inheritance = requirements;
        self
    }

    /// Replace the generic parse algorithm for this field.
    pub fn with_custom_parser(mut self, parser: CustomParser) -> Self {
        self.custom_parser = Some(parser);
        self
    }

    /// Replace the generic tree emission for this field.
    pub fn with_custom_serializer(mut self, serializer: CustomSerializer) -> Self {
        self.custom_serializer = Some(serializer);
        self
    }

    /// Produce this field's string encoding instead of the generic one.
    pub fn with_custom_string_serializer(mut self, serializer: CustomStringSerializer) -> Self {
        self.custom_string_serializer = Some(serializer);
        self
    }

    /// Decode this field's string-encoded wire value instead of the
    /// generic tree decode.
    pub fn with_custom_string_decoder(mut self, decoder: CustomStringDecoder) -> Self {
        self.custom_string_decoder = Some(decoder);
        self
    }

    /// Add a field-specific check that runs after all built-in checks.
    pub fn with_custom_validator(mut self, validator: CustomValidator) -> Self {
        self.custom_validator = Some(validator);
        self
    }

    // ─── Accessors ───────────────────────────────────────────────────

    /// The field name, also the default wire key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The field's nominal type name.
    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    /// The field's coarse wire-level type.
    pub fn primitive(&self) -> PrimitiveKind {
        self.primitive
    }

    /// Whether absence is tolerated.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Alternate wire key, if any.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Acceptable entity kinds for union fields, in declaration order.
    pub fn union_types(&self) -> &[String] {
        &self.union_types
    }

    /// Element descriptor for array fields.
    pub fn item(&self) -> Option<&PropertyDescriptor> {
        self.item.as_deref()
    }

    /// Whether content is stored and emitted opaquely.
    pub fn is_any(&self) -> bool {
        self.any
    }

    /// Whether the wire representation is a string-encoded nested tree.
    pub fn enforces_string(&self) -> bool {
        self.enforce_string
    }

    /// Whether a string wire value should be decoded as a nested tree.
    pub fn decodes_string(&self) -> bool {
        self.decode_string
    }

    /// Explicit subtype permission; `None` means subtypes are allowed.
    pub fn allow_subclasses(&self) -> Option<bool> {
        self.allow_subclasses
    }

    /// Whether a present type tag forces registry dispatch.
    pub fn parses_as_polymorphic(&self) -> bool {
        self.parse_as_polymorphic
    }

    /// The multi-typed whitelist; empty means single-typed.
    pub fn allowed_types(&self) -> &[PrimitiveKind] {
        &self.allowed_types
    }

    /// OR-of-AND subtype requirements; empty means none.
    pub fn required_inheritance(&self) -> &[Vec<String>] {
        &self.required_inheritance
    }

    /// The parse hook replacing the generic algorithm, if any.
    pub fn custom_parser(&self) -> Option<&CustomParser> {
        self.custom_parser.as_ref()
    }

    pub(crate) fn custom_serializer(&self) -> Option<&CustomSerializer> {
        self.custom_serializer.as_ref()
    }

    pub(crate) fn custom_string_serializer(&self) -> Option<&CustomStringSerializer> {
        self.custom_string_serializer.as_ref()
    }

    /// The string-decoding hook for this field, if any.
    pub fn custom_string_decoder(&self) -> Option<&CustomStringDecoder> {
        self.custom_string_decoder.as_ref()
    }

    pub(crate) fn custom_validator(&self) -> Option<&CustomValidator> {
        self.custom_validator.as_ref()
    }

    pub(crate) fn min_value(&self) -> Option<f64> {
        self.min_value
    }

    pub(crate) fn max_value(&self) -> Option<f64> {
        self.max_value
    }

    pub(crate) fn min_length(&self) -> Option<usize> {
        self.min_length
    }

    pub(crate) fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    pub(crate) fn allowed_chars(&self) -> Option<&str> {
        self.allowed_chars.as_deref()
    }

    pub(crate) fn disallowed_chars(&self) -> Option<&str> {
        self.disallowed_chars.as_deref()
    }

    pub(crate) fn allowed_values(&self) -> &[Value] {
        &self.allowed_values
    }

    pub(crate) fn disallowed_values(&self) -> &[Value] {
        &self.disallowed_values
    }

    pub(crate) fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    /// Check the descriptor shape invariant for a kind being built.
    pub fn ensure_well_formed(&self, kind: &str) -> Result<(), SchemaError> {
        let malformed = |reason: &str| SchemaError::MalformedDescriptor {
            kind: kind.to_string(),
            field: self.key.clone(),
            reason: reason.to_string(),
        };
        match self.primitive {
            PrimitiveKind::Boolean | PrimitiveKind::Number | PrimitiveKind::String => {
                if self.item.is_some() {
                    return Err(malformed("scalar field carries an item descriptor"));
                }
                if !self.union_types.is_empty() {
                    return Err(malformed("scalar field carries union types"));
                }
            }
            PrimitiveKind::Array => {
                if self.item.is_none() {
                    return Err(malformed("array field has no item descriptor"));
                }
            }
            PrimitiveKind::Object => {
                if self.item.is_some() {
                    return Err(malformed("object field carries an item descriptor"));
                }
                if !self.any && self.declared_type.is_empty() && self.union_types.is_empty() {
                    return Err(malformed(
                        "object field needs a declared type, union types, or the any marker",
                    ));
                }
            }
        }
        if let Some(item) = &self.item {
            item.ensure_well_formed(kind)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("key", &self.key)
            .field("declared_type", &self.declared_type)
            .field("primitive", &self.primitive)
            .field("optional", &self.optional)
            .field("alias", &self.alias)
            .field("union_types", &self.union_types)
            .field("any", &self.any)
            .field("has_custom_parser", &self.custom_parser.is_some())
            .field("has_custom_serializer", &self.custom_serializer.is_some())
            .field("has_custom_validator", &self.custom_validator.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_builder_defaults() {
        let desc = PropertyDescriptor::string("name");
        assert_eq!(desc.key(), "name");
        assert_eq!(desc.declared_type(), "string");
        assert_eq!(desc.primitive(), PrimitiveKind::String);
        assert!(!desc.is_optional());
        assert!(desc.ensure_well_formed("Person").is_ok());
    }

    #[test]
    fn test_array_requires_item() {
        let good = PropertyDescriptor::array("tags", PropertyDescriptor::string("tag"));
        assert!(good.ensure_well_formed("Person").is_ok());

        // A hand-rolled array without an item descriptor is rejected.
        let mut bad = PropertyDescriptor::string("tags");
        bad.primitive = PrimitiveKind::Array;
        let err = bad.ensure_well_formed("Person").unwrap_err();
        assert!(err.to_string().contains("item descriptor"));
    }

    #[test]
    fn test_object_requires_target() {
        let mut bad = PropertyDescriptor::object("home", "Address");
        bad.declared_type = String::new();
        assert!(bad.ensure_well_formed("Person").is_err());

        assert!(PropertyDescriptor::any("extra").ensure_well_formed("Person").is_ok());
        assert!(PropertyDescriptor::union("home", ["Address", "PoBox"])
            .ensure_well_formed("Person")
            .is_ok());
    }

    #[test]
    fn test_union_declaration_order_preserved() {
        let desc = PropertyDescriptor::union("home", ["B", "A"]);
        assert_eq!(desc.union_types(), ["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn test_primitive_kind_of_tree() {
        use serde_json::json;
        assert_eq!(PrimitiveKind::of_tree(&json!(null)), None);
        assert_eq!(PrimitiveKind::of_tree(&json!(1)), Some(PrimitiveKind::Number));
        assert_eq!(PrimitiveKind::of_tree(&json!({})), Some(PrimitiveKind::Object));
    }
}
