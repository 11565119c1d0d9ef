//! # Field Values
//!
//! The tagged-union value type entities store per field. Keeping `Null` as
//! its own variant (distinct from an absent map entry) preserves the
//! null-vs-absent distinction across round trips exactly.

use serde_json::{Number, Value};

use crate::descriptor::PrimitiveKind;
use crate::entity::Entity;

/// One in-memory field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Present on the wire as an explicit `null`.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar; `serde_json::Number` keeps the exact wire form.
    Number(Number),
    /// String scalar.
    String(String),
    /// Ordered elements.
    Array(Vec<FieldValue>),
    /// Nested strongly-typed entity.
    Entity(Box<Entity>),
    /// Opaque passthrough tree, stored without validation or typing.
    Any(Value),
}

impl FieldValue {
    /// The value's runtime primitive kind; `None` for explicit null.
    pub fn kind(&self) -> Option<PrimitiveKind> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(_) => Some(PrimitiveKind::Boolean),
            FieldValue::Number(_) => Some(PrimitiveKind::Number),
            FieldValue::String(_) => Some(PrimitiveKind::String),
            FieldValue::Array(_) => Some(PrimitiveKind::Array),
            FieldValue::Entity(_) => Some(PrimitiveKind::Object),
            FieldValue::Any(value) => PrimitiveKind::of_tree(value),
        }
    }

    /// Convert a scalar wire value; `None` for arrays, objects, and null.
    pub fn from_scalar(value: &Value) -> Option<FieldValue> {
        match value {
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => Some(FieldValue::Number(n.clone())),
            Value::String(s) => Some(FieldValue::String(s.clone())),
            _ => None,
        }
    }

    /// The scalar wire form of this value, used for exact-value constraint
    /// comparisons. `None` for arrays and entities.
    pub fn to_scalar_tree(&self) -> Option<Value> {
        match self {
            FieldValue::Null => Some(Value::Null),
            FieldValue::Bool(b) => Some(Value::Bool(*b)),
            FieldValue::Number(n) => Some(Value::Number(n.clone())),
            FieldValue::String(s) => Some(Value::String(s.clone())),
            _ => None,
        }
    }

    /// Borrow as a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Read as a float for bound comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Borrow as a boolean scalar.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the elements of an array value.
    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow a nested entity.
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            FieldValue::Entity(entity) => Some(entity),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(Number::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Number(Number::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<Entity> for FieldValue {
    fn from(value: Entity) -> Self {
        FieldValue::Entity(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_runtime_kind() {
        assert_eq!(FieldValue::Null.kind(), None);
        assert_eq!(FieldValue::from(true).kind(), Some(PrimitiveKind::Boolean));
        assert_eq!(FieldValue::from(1i64).kind(), Some(PrimitiveKind::Number));
        assert_eq!(FieldValue::from("x").kind(), Some(PrimitiveKind::String));
        assert_eq!(
            FieldValue::Any(json!({"a": 1})).kind(),
            Some(PrimitiveKind::Object)
        );
    }

    #[test]
    fn test_scalar_conversion_round_trip() {
        let wire = json!("hello");
        let value = FieldValue::from_scalar(&wire).unwrap();
        assert_eq!(value.to_scalar_tree().unwrap(), wire);
    }

    #[test]
    fn test_null_distinct_from_absent() {
        // Null is a value; absence is the lack of a map entry. The two
        // must never compare equal.
        assert_ne!(FieldValue::Null, FieldValue::from(false));
        assert_eq!(FieldValue::Null.to_scalar_tree().unwrap(), Value::Null);
    }
}
