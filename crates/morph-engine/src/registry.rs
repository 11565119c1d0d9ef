//! # Type Registry
//!
//! Maps `"{tag}@{version}"` registration keys to entity kinds. Modules are
//! registered append-only at startup; duplicate keys are rejected at
//! registration time rather than silently shadowed by scan order.
//!
//! Lookups scan the module list in registration order. The registry is
//! seeded with a built-in module holding the passthrough kind, so an
//! untyped tree always has somewhere to land.

use std::collections::BTreeSet;
use std::sync::Arc;

use morph_core::{RegistryMissError, SchemaError};
use morph_schema::EntityKind;

use crate::passthrough;

/// A named group of kinds registered together.
pub struct TypeModule {
    name: String,
    entries: Vec<Arc<EntityKind>>,
}

impl TypeModule {
    /// An empty module with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Add one kind to the module.
    pub fn with_kind(mut self, kind: Arc<EntityKind>) -> Self {
        self.entries.push(kind);
        self
    }

    /// The module's name, used in duplicate-registration errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kinds this module registers, in declaration order.
    pub fn kinds(&self) -> &[Arc<EntityKind>] {
        &self.entries
    }
}

/// The process-wide table of registered entity kinds.
pub struct TypeRegistry {
    modules: Vec<TypeModule>,
    passthrough: Arc<EntityKind>,
}

impl TypeRegistry {
    /// A registry holding only the built-in passthrough module.
    pub fn new() -> Self {
        let passthrough = passthrough::passthrough_kind();
        let builtin = TypeModule::new("builtin").with_kind(Arc::clone(&passthrough));
        Self {
            modules: vec![builtin],
            passthrough,
        }
    }

    /// Append a module.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateRegistration`] when any of the
    /// module's kinds claims a `"{tag}@{version}"` key that is already
    /// taken, either by an earlier module or within the module itself.
    pub fn register(&mut self, module: TypeModule) -> Result<(), SchemaError> {
        let mut incoming = BTreeSet::new();
        for kind in module.kinds() {
            let key = kind.versioned_key();
            let taken =
                self.lookup(kind.tag(), kind.version()).is_ok() || !incoming.insert(key.clone());
            if taken {
                return Err(SchemaError::DuplicateRegistration {
                    key,
                    module: module.name().to_string(),
                });
            }
        }
        tracing::debug!(
            module = module.name(),
            kinds = module.kinds().len(),
            "registered type module"
        );
        self.modules.push(module);
        Ok(())
    }

    /// Resolve a wire tag and version to a kind.
    pub fn lookup(&self, tag: &str, version: u32) -> Result<&Arc<EntityKind>, RegistryMissError> {
        self.modules
            .iter()
            .flat_map(|module| module.kinds())
            .find(|kind| kind.tag() == tag && kind.version() == version)
            .ok_or_else(|| RegistryMissError {
                tag: tag.to_string(),
                version,
            })
    }

    /// Resolve a kind by its unique name, across all versions.
    pub fn find_kind(&self, name: &str) -> Option<&Arc<EntityKind>> {
        self.modules
            .iter()
            .flat_map(|module| module.kinds())
            .find(|kind| kind.name() == name)
    }

    /// The built-in kind untyped trees resolve to.
    pub fn passthrough_kind(&self) -> &Arc<EntityKind> {
        &self.passthrough
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
