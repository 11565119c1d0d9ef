//! # morph-engine — Type Registry & Parse Engine
//!
//! The dispatch layer of the Morph Stack. A [`TypeRegistry`] maps
//! `"{tag}@{version}"` keys to the entity kinds declared in `morph-schema`;
//! the parse engine resolves loosely-typed wire trees into typed entities
//! through it.
//!
//! ## Entry Points
//!
//! - [`TypeRegistry::from_text`] / [`TypeRegistry::from_tree`] — dispatch
//!   on the wire type tag; untagged trees resolve to the built-in
//!   passthrough kind.
//! - [`TypeRegistry::from_tree_as`] — construct a known kind directly.
//! - [`TypeRegistry::from_tree_suspendable`] — async variant consulting a
//!   [`NestedResolver`] before each nested-object construction.
//!
//! ## Crate Policy
//!
//! - Registration is append-only and happens at startup; duplicate
//!   `"{tag}@{version}"` keys are rejected, never shadowed.
//! - Parsing is fail-fast and never returns a partial entity.
//! - Serialization lives in `morph-schema`; this crate only resolves.

pub mod parse;
pub mod passthrough;
pub mod registry;
pub mod suspend;

pub use passthrough::{PASSTHROUGH_FIELD, PASSTHROUGH_KIND};
pub use registry::{TypeModule, TypeRegistry};
pub use suspend::{NestedResolver, NoResolution};
