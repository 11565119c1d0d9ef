//! # morph-schema — Descriptors, Kinds, and Entities
//!
//! The schema layer of the Morph Stack: explicit per-field metadata
//! ([`PropertyDescriptor`]), named versioned entity kinds with supertype
//! chains ([`EntityKind`]), the merged per-kind descriptor map
//! ([`SchemaMap`]), the in-memory instance representation ([`Entity`] and
//! [`FieldValue`]), business-rule validation (the [`validate`] module),
//! and deterministic tree/text emission (`Entity::to_tree`,
//! `Entity::to_text`).
//!
//! Parsing lives one layer up in `morph-engine`, because resolving a wire
//! tree into typed entities needs the type registry; emission does not,
//! so it lives here.
//!
//! ## Crate Policy
//!
//! - Depends only on `morph-core` internally.
//! - Descriptor maps iterate in lexicographic key order, never declaration
//!   order; emitted trees and text are byte-deterministic.
//! - Constraint checks report the first failing rule in a fixed order and
//!   never mutate the value under inspection.

pub mod descriptor;
pub mod entity;
pub mod kind;
pub mod serialize;
pub mod validate;
pub mod value;

pub use descriptor::{
    CustomParser, CustomSerializer, CustomStringDecoder, CustomStringSerializer, CustomValidator,
    PrimitiveKind, PropertyDescriptor,
};
pub use entity::Entity;
pub use kind::{EntityKind, EntityKindBuilder, KindStringDecoder, PostConstruct, PreConstruct, SchemaMap};
pub use value::FieldValue;
