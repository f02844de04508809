//! Persistent metadata lookup.
//!
//! The resolver only needs one thing from the mapping model: the default
//! collection of a target type. [`MappingContext`] is that contract, and
//! [`EntityRegistry`] is the in-process implementation.
//!
//! A process-wide registry is available for applications that prefer not to
//! thread a context through every reader. It is initialized on first use and
//! can be reset for test isolation.

use crate::entity::{Entity, EntityInfo};
use crate::error::{Result, UnknownTargetTypeError};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Metadata provider consulted during reference resolution.
pub trait MappingContext: Send + Sync {
    /// Look up the metadata entry for a target type.
    fn persistent_entity(&self, type_name: &str) -> Option<EntityInfo>;

    /// Look up the metadata entry for a target type, failing if absent.
    fn required_entity(&self, type_name: &str) -> Result<EntityInfo> {
        self.persistent_entity(type_name).ok_or_else(|| {
            UnknownTargetTypeError {
                type_name: type_name.to_string(),
            }
            .into()
        })
    }
}

/// Registry of entity metadata keyed by logical type name.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: HashMap<&'static str, EntityInfo>,
}

impl EntityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the entity `E` (builder form).
    #[must_use]
    pub fn with<E: Entity>(mut self) -> Self {
        self.register::<E>();
        self
    }

    /// Register the entity `E`.
    pub fn register<E: Entity>(&mut self) -> &mut Self {
        self.register_info(E::entity_info())
    }

    /// Register a metadata entry directly.
    ///
    /// A later registration for the same type name replaces the earlier one.
    pub fn register_info(&mut self, info: EntityInfo) -> &mut Self {
        tracing::debug!(
            entity = info.name,
            collection = info.collection,
            "Registered entity mapping"
        );
        self.entities.insert(info.name, info);
        self
    }

    /// Check whether a type is registered.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.entities.contains_key(type_name)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if no types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl MappingContext for EntityRegistry {
    fn persistent_entity(&self, type_name: &str) -> Option<EntityInfo> {
        self.entities.get(type_name).copied()
    }
}

impl<M: MappingContext + ?Sized> MappingContext for Arc<M> {
    fn persistent_entity(&self, type_name: &str) -> Option<EntityInfo> {
        (**self).persistent_entity(type_name)
    }
}

static GLOBAL_MAPPING_CONTEXT: RwLock<Option<Arc<EntityRegistry>>> = RwLock::new(None);

/// Get the process-wide registry, creating an empty one on first use.
#[must_use]
pub fn global_mapping_context() -> Arc<EntityRegistry> {
    if let Some(registry) = GLOBAL_MAPPING_CONTEXT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        return Arc::clone(registry);
    }

    let mut slot = GLOBAL_MAPPING_CONTEXT
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    Arc::clone(slot.get_or_insert_with(|| Arc::new(EntityRegistry::new())))
}

/// Install the process-wide registry.
///
/// Returns `false` (and leaves the current registry in place) if one was
/// already initialized, either explicitly or by first use.
pub fn init_global_mapping_context(registry: EntityRegistry) -> bool {
    let mut slot = GLOBAL_MAPPING_CONTEXT
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return false;
    }
    tracing::debug!(entities = registry.len(), "Initialized global mapping context");
    *slot = Some(Arc::new(registry));
    true
}

/// Drop the process-wide registry so the next use starts fresh.
pub fn reset_global_mapping_context() {
    let mut slot = GLOBAL_MAPPING_CONTEXT
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *slot = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct Publisher;

    impl Entity for Publisher {
        const ENTITY_NAME: &'static str = "Publisher";
        const COLLECTION_NAME: &'static str = "publishers";
    }

    #[test]
    fn test_registry_lookup() {
        let registry = EntityRegistry::new().with::<Publisher>();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("Publisher"));

        let info = registry.required_entity("Publisher").unwrap();
        assert_eq!(info.collection, "publishers");
    }

    #[test]
    fn test_missing_entity_is_unknown_target_type() {
        let registry = EntityRegistry::new();
        let err = registry.required_entity("Ghost").unwrap_err();
        assert!(matches!(err, Error::UnknownTargetType(ref e) if e.type_name == "Ghost"));
    }

    #[test]
    fn test_register_info_replaces_previous_entry() {
        let mut registry = EntityRegistry::new();
        registry
            .register::<Publisher>()
            .register_info(EntityInfo::new("Publisher", "publishing_houses"));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.persistent_entity("Publisher").map(|e| e.collection),
            Some("publishing_houses")
        );
    }

    // Single test so parallel test threads never observe each other's global state.
    #[test]
    fn test_global_mapping_context_lifecycle() {
        reset_global_mapping_context();

        let first = global_mapping_context();
        assert!(first.is_empty());
        assert!(!init_global_mapping_context(
            EntityRegistry::new().with::<Publisher>()
        ));

        reset_global_mapping_context();
        assert!(init_global_mapping_context(
            EntityRegistry::new().with::<Publisher>()
        ));
        assert!(global_mapping_context().contains("Publisher"));

        reset_global_mapping_context();
        assert!(global_mapping_context().is_empty());
        reset_global_mapping_context();
    }
}
