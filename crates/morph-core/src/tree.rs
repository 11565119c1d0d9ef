//! # Wire Tree Helpers
//!
//! Classification of loosely-typed tree values and the single definition of
//! the wire text format (JSON via `serde_json`).

use std::fmt;

use serde_json::Value;

/// The runtime shape of a wire-tree value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeKind {
    /// JSON `null`.
    Null,
    /// JSON `true`/`false`.
    Boolean,
    /// JSON number.
    Number,
    /// JSON string.
    String,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
}

impl TreeKind {
    /// Classify a tree value.
    pub fn of(value: &Value) -> TreeKind {
        match value {
            Value::Null => TreeKind::Null,
            Value::Bool(_) => TreeKind::Boolean,
            Value::Number(_) => TreeKind::Number,
            Value::String(_) => TreeKind::String,
            Value::Array(_) => TreeKind::Array,
            Value::Object(_) => TreeKind::Object,
        }
    }
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TreeKind::Null => "null",
            TreeKind::Boolean => "boolean",
            TreeKind::Number => "number",
            TreeKind::String => "string",
            TreeKind::Array => "array",
            TreeKind::Object => "object",
        };
        write!(f, "{name}")
    }
}

/// Encode a tree as wire text.
pub fn to_text(tree: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(tree)
}

/// Decode wire text into a tree.
pub fn from_text(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    /// Strategy for generating arbitrary wire trees with integer numbers.
    fn tree_strategy() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| serde_json::json!(n)),
            "[a-zA-Z0-9_ ]{0,24}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,8}", inner, 0..6).prop_map(|m| {
                    Value::Object(m.into_iter().collect())
                }),
            ]
        })
    }

    proptest! {
        /// Text encoding round-trips any tree exactly.
        #[test]
        fn text_round_trip_is_lossless(tree in tree_strategy()) {
            let text = to_text(&tree).unwrap();
            prop_assert_eq!(from_text(&text).unwrap(), tree);
        }

        /// Text encoding is deterministic.
        #[test]
        fn text_encoding_deterministic(tree in tree_strategy()) {
            prop_assert_eq!(to_text(&tree).unwrap(), to_text(&tree).unwrap());
        }
    }
}
