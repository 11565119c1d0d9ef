//! # morph-core — Foundational Types for the Morph Stack
//!
//! This crate is the bedrock of the Morph Stack. It defines the types every
//! other crate in the workspace builds on; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **One wire format.** The loosely-typed wire tree is `serde_json::Value`
//!    everywhere. Its text form is produced and consumed only through
//!    [`tree::to_text`] / [`tree::from_text`], so there is exactly one place
//!    that defines what "the wire text format" means.
//!
//! 2. **Structured, chainable errors.** Every failure carries the entity kind
//!    it occurred in, a [`FieldPath`] to the offending field, a reason, and an
//!    optional `#[source]` cause. Nothing is silently recovered; a failure at
//!    any depth aborts the whole call and surfaces with full path context.
//!
//! 3. **Strict meta-field reading.** `@type` must be a string, `@version`
//!    must be a JSON unsigned integer (absent means 1). There is no
//!    permissive numeric coercion anywhere.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `morph-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod meta;
pub mod path;
pub mod tree;

// Re-export primary types for ergonomic imports.
pub use error::{
    MorphError, ParseError, RegistryMissError, SchemaError, SerializationError, ValidationError,
};
pub use path::{FieldPath, PathSegment};
pub use tree::TreeKind;
