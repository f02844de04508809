//! Stored reference descriptors.
//!
//! A reference property is persisted as one of:
//!
//! - a bare scalar identifier (`"ref-1"`, `42`, an ObjectId)
//! - a structured document (`{ id, collection?, db?, ... }`)
//! - a native pointer (`{ $ref, $id, $db? }`)
//! - a sequence of any of the above
//!
//! [`RawReference::classify`] gives a borrowed view over the stored value so
//! callers can dispatch on its shape without copying.

use bson::{Bson, Document};

/// Field naming the target collection of a native pointer.
pub const NATIVE_REF_FIELD: &str = "$ref";
/// Field holding the target id of a native pointer.
pub const NATIVE_ID_FIELD: &str = "$id";
/// Field naming the target database of a native pointer.
pub const NATIVE_DB_FIELD: &str = "$db";

/// Field of a structured descriptor naming the target collection.
pub const COLLECTION_FIELD: &str = "collection";
/// Field of a structured descriptor naming the target database.
pub const DATABASE_FIELD: &str = "db";

/// Borrowed view of a stored reference value.
#[derive(Debug, Clone, PartialEq)]
pub enum RawReference<'a> {
    /// No reference stored.
    Null,
    /// A bare identifier.
    Scalar(&'a Bson),
    /// A structured descriptor document.
    Document(&'a Document),
    /// A driver-style pointer.
    Native(NativeReference),
    /// Several references (collection-like properties).
    Sequence(&'a [Bson]),
}

impl<'a> RawReference<'a> {
    /// Classify a stored value by shape.
    pub fn classify(value: &'a Bson) -> Self {
        match value {
            Bson::Null | Bson::Undefined => RawReference::Null,
            Bson::Array(items) => RawReference::Sequence(items),
            Bson::Document(doc) => match NativeReference::from_document(doc) {
                Some(native) => RawReference::Native(native),
                None => RawReference::Document(doc),
            },
            other => RawReference::Scalar(other),
        }
    }

    /// Check whether nothing is stored.
    pub fn is_null(&self) -> bool {
        matches!(self, RawReference::Null)
    }
}

/// A driver-style pointer embedding collection, id and optional database.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeReference {
    /// Target collection (`$ref`).
    pub collection: String,
    /// Target identifier (`$id`).
    pub id: Bson,
    /// Target database (`$db`), if not the default one.
    pub database: Option<String>,
}

impl NativeReference {
    /// Create a pointer into `collection` for `id`.
    pub fn new(collection: impl Into<String>, id: impl Into<Bson>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            database: None,
        }
    }

    /// Set the target database.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Read a pointer from its stored document form.
    ///
    /// Returns `None` unless `$ref` is a non-empty string and `$id` is present.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let collection = doc.get(NATIVE_REF_FIELD)?.as_str()?;
        if collection.is_empty() {
            return None;
        }
        let id = doc.get(NATIVE_ID_FIELD)?.clone();
        let database = doc
            .get(NATIVE_DB_FIELD)
            .and_then(Bson::as_str)
            .map(str::to_string);

        Some(Self {
            collection: collection.to_string(),
            id,
            database,
        })
    }

    /// Convert to the stored document form.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(NATIVE_REF_FIELD, self.collection.clone());
        doc.insert(NATIVE_ID_FIELD, self.id.clone());
        if let Some(database) = &self.database {
            doc.insert(NATIVE_DB_FIELD, database.clone());
        }
        doc
    }
}

impl From<NativeReference> for Bson {
    fn from(reference: NativeReference) -> Self {
        Bson::Document(reference.to_document())
    }
}
