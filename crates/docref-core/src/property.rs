//! Reference property metadata.
//!
//! A property's reference configuration is resolved once when the mapping
//! model is built and attached to its `PropertyDescriptor` as an explicit
//! tagged value. Nothing is looked up per access.

use crate::entity::Entity;

/// Lookup template used when a manual reference does not declare one.
pub const DEFAULT_LOOKUP: &str = "{ '_id' : ?#{#target} }";

/// Whether a property holds one reference or many.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cardinality {
    /// A single referenced entity (or none).
    #[default]
    Single,
    /// A list of referenced entities.
    Collection,
}

/// Configuration of a manual (templated) reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualReference {
    /// Lookup filter template, e.g. `{ '_id' : '?#{#target}' }`.
    pub lookup: &'static str,
    /// Optional target-collection expression, e.g. `?#{collection}`.
    pub collection: Option<&'static str>,
    /// Defer the fetch until first use.
    pub lazy: bool,
}

impl ManualReference {
    /// Create an eager manual reference with the given lookup template.
    #[must_use]
    pub const fn new(lookup: &'static str) -> Self {
        Self {
            lookup,
            collection: None,
            lazy: false,
        }
    }

    /// Manual reference looking targets up by `_id`.
    #[must_use]
    pub const fn by_id() -> Self {
        Self::new(DEFAULT_LOOKUP)
    }

    /// Set the target-collection expression.
    #[must_use]
    pub const fn collection(mut self, expression: &'static str) -> Self {
        self.collection = Some(expression);
        self
    }

    /// Set the lazy flag.
    #[must_use]
    pub const fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }
}

impl Default for ManualReference {
    fn default() -> Self {
        Self::by_id()
    }
}

/// How a property refers to other documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferenceConfig {
    /// Not a reference.
    #[default]
    None,
    /// Templated lookup, see [`ManualReference`].
    Manual(ManualReference),
    /// Driver-style pointer (`$ref` / `$id` / `$db`).
    Native {
        /// Defer the fetch until first use.
        lazy: bool,
    },
}

impl ReferenceConfig {
    /// Check whether the property is a reference at all.
    #[must_use]
    pub const fn is_reference(&self) -> bool {
        !matches!(self, ReferenceConfig::None)
    }

    /// Check whether the configuration asks for deferred resolution.
    #[must_use]
    pub const fn is_lazy(&self) -> bool {
        match self {
            ReferenceConfig::None => false,
            ReferenceConfig::Manual(manual) => manual.lazy,
            ReferenceConfig::Native { lazy } => *lazy,
        }
    }

    /// Get the manual reference configuration, if any.
    #[must_use]
    pub const fn manual(&self) -> Option<&ManualReference> {
        match self {
            ReferenceConfig::Manual(manual) => Some(manual),
            _ => None,
        }
    }
}

/// Metadata about a reference-typed property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Rust property name
    pub name: &'static str,
    /// Stored field name (may differ from the property name)
    pub field_name: &'static str,
    /// Single or collection-like
    pub cardinality: Cardinality,
    /// Logical name of the declared target type
    pub target_type: &'static str,
    /// Reference configuration
    pub reference: ReferenceConfig,
}

impl PropertyDescriptor {
    /// Create a singular, non-reference property pointing at `target_type`.
    #[must_use]
    pub const fn new(name: &'static str, target_type: &'static str) -> Self {
        Self {
            name,
            field_name: name,
            cardinality: Cardinality::Single,
            target_type,
            reference: ReferenceConfig::None,
        }
    }

    /// Create a property whose target type is the entity `E`.
    #[must_use]
    pub const fn to<E: Entity>(name: &'static str) -> Self {
        Self::new(name, E::ENTITY_NAME)
    }

    /// Set the stored field name.
    #[must_use]
    pub const fn field_name(mut self, field_name: &'static str) -> Self {
        self.field_name = field_name;
        self
    }

    /// Mark the property as collection-like.
    #[must_use]
    pub const fn collection_like(mut self) -> Self {
        self.cardinality = Cardinality::Collection;
        self
    }

    /// Configure a manual reference.
    #[must_use]
    pub const fn manual(mut self, manual: ManualReference) -> Self {
        self.reference = ReferenceConfig::Manual(manual);
        self
    }

    /// Configure a native driver-style reference.
    #[must_use]
    pub const fn native(mut self, lazy: bool) -> Self {
        self.reference = ReferenceConfig::Native { lazy };
        self
    }

    /// Check if the property holds a collection of references.
    #[must_use]
    pub const fn is_collection_like(&self) -> bool {
        matches!(self.cardinality, Cardinality::Collection)
    }

    /// Check if the property is configured for lazy resolution.
    #[must_use]
    pub const fn is_lazy(&self) -> bool {
        self.reference.is_lazy()
    }

    /// Get the lookup template of a manual reference.
    #[must_use]
    pub const fn lookup(&self) -> Option<&'static str> {
        match self.reference {
            ReferenceConfig::Manual(manual) => Some(manual.lookup),
            _ => None,
        }
    }

    /// Get the target-collection expression of a manual reference.
    #[must_use]
    pub const fn collection_expression(&self) -> Option<&'static str> {
        match self.reference {
            ReferenceConfig::Manual(manual) => manual.collection,
            _ => None,
        }
    }
}
