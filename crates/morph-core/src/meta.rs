//! # Wire-Tree Meta Fields
//!
//! The three meta keys every wire tree may carry, and the strict readers
//! for them. All are optional on the wire:
//!
//! - `"@type"` — string, the entity kind tag.
//! - `"@version"` — unsigned integer, schema revision, 1 when absent.
//! - `"@context"` — string, free-form namespace marker, purely pass-through.
//!
//! ## Strictness
//!
//! Readers reject wrong-typed meta values instead of coercing them. A
//! `"@version"` of `"2"` (string) or `2.0` (float) is a [`ParseError`],
//! never a silent 2.

use serde_json::Value;

use crate::error::ParseError;

/// Wire key for the entity kind tag.
pub const TYPE_KEY: &str = "@type";

/// Wire key for the schema revision.
pub const VERSION_KEY: &str = "@version";

/// Wire key for the pass-through namespace marker.
pub const CONTEXT_KEY: &str = "@context";

/// The version assumed when `"@version"` is absent.
pub const DEFAULT_VERSION: u32 = 1;

/// Returns true for the keys handled by the meta layer rather than by
/// field descriptors.
pub fn is_meta_key(key: &str) -> bool {
    key == TYPE_KEY || key == VERSION_KEY || key == CONTEXT_KEY
}

/// The versioned registry lookup key, e.g. `"Person@2"`.
pub fn versioned_key(tag: &str, version: u32) -> String {
    format!("{tag}@{version}")
}

/// Read the `"@type"` tag from a tree.
///
/// Returns `None` when absent (including non-object trees). Fails when the
/// tag is present but not a string.
pub fn type_tag(tree: &Value) -> Result<Option<&str>, ParseError> {
    match tree.get(TYPE_KEY) {
        None => Ok(None),
        Some(Value::String(tag)) => Ok(Some(tag)),
        Some(other) => Err(ParseError::new(
            "(untyped)",
            format!("{TYPE_KEY} must be a string, got {}", crate::tree::TreeKind::of(other)),
        )),
    }
}

/// Read the `"@version"` tag from a tree, defaulting to [`DEFAULT_VERSION`].
///
/// Strict: the value must be a JSON unsigned integer fitting in `u32`.
/// Strings, floats, and negative numbers are rejected.
pub fn version_tag(tree: &Value) -> Result<u32, ParseError> {
    match tree.get(VERSION_KEY) {
        None => Ok(DEFAULT_VERSION),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) if v <= u64::from(u32::MAX) => Ok(v as u32),
            _ => Err(ParseError::new(
                "(untyped)",
                format!("{VERSION_KEY} must be an unsigned integer, got {n}"),
            )),
        },
        Some(other) => Err(ParseError::new(
            "(untyped)",
            format!(
                "{VERSION_KEY} must be an unsigned integer, got {}",
                crate::tree::TreeKind::of(other)
            ),
        )),
    }
}

/// Read the `"@context"` marker from a tree.
///
/// Returns `None` when absent. Fails when present but not a string.
pub fn context_tag(tree: &Value) -> Result<Option<&str>, ParseError> {
    match tree.get(CONTEXT_KEY) {
        None => Ok(None),
        Some(Value::String(context)) => Ok(Some(context)),
        Some(other) => Err(ParseError::new(
            "(untyped)",
            format!("{CONTEXT_KEY} must be a string, got {}", crate::tree::TreeKind::of(other)),
        )),
    }
}
