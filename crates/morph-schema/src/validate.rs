//! # Constraint Checker
//!
//! Pure functions that check one field value against one descriptor. No
//! recursion into nested entities beyond a single-level "is this the right
//! kind" check for object-typed fields; deep checking happens field by
//! field when an entity is validated.
//!
//! ## Rule Order
//!
//! Scalar constraints run in a fixed order and the first failing rule
//! short-circuits: type check, length/value bounds, pattern,
//! allowed/disallowed characters (strings only), allowed values,
//! disallowed values. A custom validator, if present, runs after all
//! built-in checks.

use crate::descriptor::{PrimitiveKind, PropertyDescriptor};
use crate::value::FieldValue;

/// Check that a value is present, unless the descriptor tolerates absence.
///
/// Absence and explicit null are both "not defined". (`NaN` cannot occur:
/// `serde_json::Number` has no NaN representation.)
pub fn check_defined(
    value: Option<&FieldValue>,
    descriptor: &PropertyDescriptor,
) -> Result<(), String> {
    match value {
        None | Some(FieldValue::Null) if !descriptor.is_optional() => {
            Err("value not defined".to_string())
        }
        _ => Ok(()),
    }
}

/// Full business-rule check: defined-check, type check, scalar constraints
/// in fixed order, object kind conformance, then the custom validator.
pub fn check(value: Option<&FieldValue>, descriptor: &PropertyDescriptor) -> Result<(), String> {
    check_defined(value, descriptor)?;
    let value = match value {
        None | Some(FieldValue::Null) => return Ok(()), // optional and absent
        Some(value) => value,
    };

    if !descriptor.allowed_types().is_empty() {
        check_multi_typed(value, descriptor)?;
    } else {
        match descriptor.primitive() {
            PrimitiveKind::Boolean => check_boolean(value, descriptor)?,
            PrimitiveKind::Number => check_number(value, descriptor)?,
            PrimitiveKind::String => check_string(value, descriptor)?,
            PrimitiveKind::Array => check_array(value, descriptor)?,
            PrimitiveKind::Object => check_object(value, descriptor)?,
        }
    }

    if let Some(validator) = descriptor.custom_validator() {
        validator(value, descriptor)?;
    }
    Ok(())
}

/// Dispatch a multi-typed field to the checker matching the value's
/// runtime kind; a kind outside the whitelist fails.
fn check_multi_typed(value: &FieldValue, descriptor: &PropertyDescriptor) -> Result<(), String> {
    let Some(kind) = value.kind() else {
        return Ok(());
    };
    if !descriptor.allowed_types().contains(&kind) {
        return Err(format!(
            "type {kind} is not one of the allowed types ({})",
            join_kinds(descriptor.allowed_types())
        ));
    }
    match kind {
        PrimitiveKind::Boolean => check_boolean(value, descriptor),
        PrimitiveKind::Number => check_number(value, descriptor),
        PrimitiveKind::String => check_string(value, descriptor),
        PrimitiveKind::Array => check_array(value, descriptor),
        // Opaque trees carry no per-kind rules of their own.
        PrimitiveKind::Object => Ok(()),
    }
}

fn check_boolean(value: &FieldValue, descriptor: &PropertyDescriptor) -> Result<(), String> {
    if value.as_bool().is_none() {
        return Err(format!("expected boolean, got {}", kind_name(value)));
    }
    check_value_lists(value, descriptor)
}

fn check_number(value: &FieldValue, descriptor: &PropertyDescriptor) -> Result<(), String> {
    let Some(number) = value.as_f64() else {
        return Err(format!("expected number, got {}", kind_name(value)));
    };
    if let Some(min) = descriptor.min_value() {
        if number < min {
            return Err(format!("value {number} below minimum {min}"));
        }
    }
    if let Some(max) = descriptor.max_value() {
        if number > max {
            return Err(format!("value {number} above maximum {max}"));
        }
    }
    check_value_lists(value, descriptor)
}

fn check_string(value: &FieldValue, descriptor: &PropertyDescriptor) -> Result<(), String> {
    let Some(text) = value.as_str() else {
        return Err(format!("expected string, got {}", kind_name(value)));
    };
    let length = text.chars().count();
    if let Some(min) = descriptor.min_length() {
        if length < min {
            return Err(format!("length {length} below minimum {min}"));
        }
    }
    if let Some(max) = descriptor.max_length() {
        if length > max {
            return Err(format!("length {length} above maximum {max}"));
        }
    }
    if let Some(pattern) = descriptor.pattern() {
        if !pattern.is_match(text) {
            return Err(format!("value does not match pattern {}", pattern.as_str()));
        }
    }
    if let Some(allowed) = descriptor.allowed_chars() {
        if let Some(bad) = text.chars().find(|c| !allowed.contains(*c)) {
            return Err(format!("character '{bad}' is not allowed"));
        }
    }
    if let Some(disallowed) = descriptor.disallowed_chars() {
        if let Some(bad) = text.chars().find(|c| disallowed.contains(*c)) {
            return Err(format!("character '{bad}' is disallowed"));
        }
    }
    check_value_lists(value, descriptor)
}

fn check_array(value: &FieldValue, descriptor: &PropertyDescriptor) -> Result<(), String> {
    let Some(items) = value.as_array() else {
        return Err(format!("expected array, got {}", kind_name(value)));
    };
    check_length_bounds(items.len(), descriptor)
}

/// Single-level kind conformance for object-typed fields. `any` always
/// passes; otherwise the value must be an entity of the declared kind or
/// a subtype, subject to union membership and inheritance requirements.
fn check_object(value: &FieldValue, descriptor: &PropertyDescriptor) -> Result<(), String> {
    if descriptor.is_any() {
        return Ok(());
    }
    let Some(entity) = value.as_entity() else {
        return Err(format!("expected object, got {}", kind_name(value)));
    };
    if !descriptor.union_types().is_empty() {
        if descriptor
            .union_types()
            .iter()
            .any(|member| entity.kind().conforms_to(member))
        {
            return Ok(());
        }
        return Err(union_mismatch(descriptor));
    }
    if !descriptor.required_inheritance().is_empty() {
        let satisfied = descriptor.required_inheritance().iter().any(|all_of| {
            all_of
                .iter()
                .all(|required| entity.kind().conforms_to(required))
        });
        if satisfied {
            return Ok(());
        }
        return Err(format!(
            "kind '{}' does not satisfy the inheritance requirements",
            entity.kind().name()
        ));
    }
    if entity.kind().conforms_to(descriptor.declared_type()) {
        Ok(())
    } else {
        Err(format!(
            "expected instance of '{}', got '{}'",
            descriptor.declared_type(),
            entity.kind().name()
        ))
    }
}

/// The union-resolution failure message, naming all allowed kinds in
/// declaration order.
pub fn union_mismatch(descriptor: &PropertyDescriptor) -> String {
    format!(
        "Parsed object is not an instance of any allowed types ({}).",
        descriptor.union_types().join("|")
    )
}

/// Shared length-bound check for arrays; the parsing engine applies it to
/// item counts before recursing into elements.
pub fn check_length_bounds(length: usize, descriptor: &PropertyDescriptor) -> Result<(), String> {
    if let Some(min) = descriptor.min_length() {
        if length < min {
            return Err(format!("length {length} below minimum {min}"));
        }
    }
    if let Some(max) = descriptor.max_length() {
        if length > max {
            return Err(format!("length {length} above maximum {max}"));
        }
    }
    Ok(())
}

fn check_value_lists(value: &FieldValue, descriptor: &PropertyDescriptor) -> Result<(), String> {
    let Some(scalar) = value.to_scalar_tree() else {
        return Ok(());
    };
    if !descriptor.allowed_values().is_empty()
        && !descriptor.allowed_values().contains(&scalar)
    {
        return Err(format!("value {scalar} is not in the allowed values"));
    }
    if descriptor.disallowed_values().contains(&scalar) {
        return Err(format!("value {scalar} is disallowed"));
    }
    Ok(())
}

fn kind_name(value: &FieldValue) -> String {
    match value.kind() {
        Some(kind) => kind.to_string(),
        None => "null".to_string(),
    }
}

fn join_kinds(kinds: &[PrimitiveKind]) -> String {
    kinds
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PropertyDescriptor;
    use crate::kind::EntityKind;
    use crate::entity::Entity;
    use regex::Regex;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_defined_check() {
        let required = PropertyDescriptor::string("name");
        assert!(check_defined(None, &required).is_err());
        assert!(check_defined(Some(&FieldValue::Null), &required).is_err());

        let optional = PropertyDescriptor::string("name").optional();
        assert!(check_defined(None, &optional).is_ok());
        assert!(check_defined(Some(&FieldValue::Null), &optional).is_ok());
    }

    #[test]
    fn test_number_bounds_order() {
        let desc = PropertyDescriptor::number("age")
            .with_min_value(0.0)
            .with_max_value(150.0);
        assert!(check(Some(&FieldValue::from(42i64)), &desc).is_ok());
        let low = check(Some(&FieldValue::from(-1i64)), &desc).unwrap_err();
        assert!(low.contains("below minimum"));
        let high = check(Some(&FieldValue::from(200i64)), &desc).unwrap_err();
        assert!(high.contains("above maximum"));
    }

    #[test]
    fn test_type_check_runs_first() {
        let desc = PropertyDescriptor::number("age").with_min_value(0.0);
        let err = check(Some(&FieldValue::from("forty")), &desc).unwrap_err();
        assert!(err.contains("expected number"));
    }

    #[test]
    fn test_string_rules_in_fixed_order() {
        let desc = PropertyDescriptor::string("code")
            .with_min_length(2)
            .with_pattern(Regex::new("^[a-z]+$").unwrap())
            .with_allowed_chars("abcdefgh")
            .with_disallowed_values(vec![json!("abba")]);

        // Length bound fails before the pattern gets a chance.
        let err = check(Some(&FieldValue::from("A")), &desc).unwrap_err();
        assert!(err.contains("length"));

        // Pattern fails before the character whitelist.
        let err = check(Some(&FieldValue::from("AB")), &desc).unwrap_err();
        assert!(err.contains("pattern"));

        // Character whitelist fails before the disallowed-values list.
        let err = check(Some(&FieldValue::from("xyz")), &desc).unwrap_err();
        assert!(err.contains("not allowed"));

        // Disallowed value caught last.
        let err = check(Some(&FieldValue::from("abba")), &desc).unwrap_err();
        assert!(err.contains("disallowed"));

        assert!(check(Some(&FieldValue::from("abc")), &desc).is_ok());
    }

    #[test]
    fn test_allowed_values_whitelist() {
        let desc = PropertyDescriptor::string("color")
            .with_allowed_values(vec![json!("red"), json!("green")]);
        assert!(check(Some(&FieldValue::from("red")), &desc).is_ok());
        assert!(check(Some(&FieldValue::from("blue")), &desc).is_err());
    }

    #[test]
    fn test_multi_typed_dispatch() {
        let desc = PropertyDescriptor::string("flex")
            .with_allowed_types(vec![PrimitiveKind::String, PrimitiveKind::Number])
            .with_min_length(2)
            .with_min_value(10.0);

        // String values hit the string rules.
        assert!(check(Some(&FieldValue::from("ok")), &desc).is_ok());
        assert!(check(Some(&FieldValue::from("x")), &desc).is_err());

        // Number values hit the number rules.
        assert!(check(Some(&FieldValue::from(11i64)), &desc).is_ok());
        assert!(check(Some(&FieldValue::from(5i64)), &desc).is_err());

        // A kind outside the whitelist fails outright.
        let err = check(Some(&FieldValue::from(true)), &desc).unwrap_err();
        assert!(err.contains("allowed types"));
    }

    #[test]
    fn test_any_always_passes() {
        let desc = PropertyDescriptor::any("extra");
        assert!(check(Some(&FieldValue::Any(json!({"weird": [1, null]}))), &desc).is_ok());
        assert!(check(Some(&FieldValue::from(7i64)), &desc).is_ok());
    }

    #[test]
    fn test_object_kind_conformance() {
        let base = EntityKind::builder("Shape").build().unwrap();
        let circle = EntityKind::builder("Circle")
            .supertype(Arc::clone(&base))
            .build()
            .unwrap();
        let other = EntityKind::builder("Color").build().unwrap();

        let desc = PropertyDescriptor::object("shape", "Shape");
        let ok = FieldValue::from(Entity::new(circle));
        assert!(check(Some(&ok), &desc).is_ok());

        let bad = FieldValue::from(Entity::new(other));
        let err = check(Some(&bad), &desc).unwrap_err();
        assert!(err.contains("Shape"));
    }

    #[test]
    fn test_union_mismatch_names_kinds_in_order() {
        let desc = PropertyDescriptor::union("home", ["A", "B"]);
        let stray = EntityKind::builder("C").build().unwrap();
        let err = check(Some(&FieldValue::from(Entity::new(stray))), &desc).unwrap_err();
        assert_eq!(
            err,
            "Parsed object is not an instance of any allowed types (A|B)."
        );
    }

    #[test]
    fn test_required_inheritance_or_of_and() {
        let a = EntityKind::builder("A").build().unwrap();
        let b = EntityKind::builder("B").supertype(Arc::clone(&a)).build().unwrap();
        let c = EntityKind::builder("C").supertype(Arc::clone(&b)).build().unwrap();

        let desc = PropertyDescriptor::object("x", "A").with_required_inheritance(vec![
            vec!["A".to_string(), "B".to_string()],
            vec!["Z".to_string()],
        ]);

        // C conforms to both A and B: first AND-branch satisfied.
        assert!(check(Some(&FieldValue::from(Entity::new(c))), &desc).is_ok());
        // A alone does not satisfy either branch.
        assert!(check(Some(&FieldValue::from(Entity::new(a))), &desc).is_err());
    }

    #[test]
    fn test_custom_validator_runs_after_builtins() {
        let desc = PropertyDescriptor::string("word")
            .with_min_length(2)
            .with_custom_validator(Arc::new(|value, _| {
                if value.as_str() == Some("veto") {
                    Err("vetoed by custom rule".to_string())
                } else {
                    Ok(())
                }
            }));
        // Built-in failure wins when both would fail.
        let err = check(Some(&FieldValue::from("v")), &desc).unwrap_err();
        assert!(err.contains("length"));
        // Custom failure surfaces once built-ins pass.
        let err = check(Some(&FieldValue::from("veto")), &desc).unwrap_err();
        assert!(err.contains("vetoed"));
    }
}
