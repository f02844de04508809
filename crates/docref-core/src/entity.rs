//! Entity trait for document-mapped types.
//!
//! The `Entity` trait carries the static mapping metadata the reference
//! resolver needs about a target type: its logical name and the collection
//! its documents live in when a reference does not name one.

/// A type whose documents are stored in a collection.
///
/// # Example
///
/// ```ignore
/// struct Publisher {
///     id: String,
///     name: String,
/// }
///
/// impl Entity for Publisher {
///     const ENTITY_NAME: &'static str = "Publisher";
///     const COLLECTION_NAME: &'static str = "publishers";
/// }
/// ```
pub trait Entity {
    /// Logical type name used as the metadata key.
    const ENTITY_NAME: &'static str;

    /// Default collection for documents of this type.
    const COLLECTION_NAME: &'static str;

    /// Name of the identifier field in stored documents.
    const ID_FIELD: &'static str = "_id";

    /// Metadata entry for this type.
    fn entity_info() -> EntityInfo {
        EntityInfo::new(Self::ENTITY_NAME, Self::COLLECTION_NAME).id_field(Self::ID_FIELD)
    }
}

/// Mapping metadata for one persistent type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityInfo {
    /// Logical type name (e.g., `"Publisher"`).
    pub name: &'static str,
    /// Default collection (e.g., `"publishers"`).
    pub collection: &'static str,
    /// Identifier field (e.g., `"_id"`).
    pub id_field: &'static str,
}

impl EntityInfo {
    /// Create metadata for a type stored in `collection`.
    #[must_use]
    pub const fn new(name: &'static str, collection: &'static str) -> Self {
        Self {
            name,
            collection,
            id_field: "_id",
        }
    }

    /// Override the identifier field.
    #[must_use]
    pub const fn id_field(mut self, id_field: &'static str) -> Self {
        self.id_field = id_field;
        self
    }
}
