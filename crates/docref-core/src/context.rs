//! Where a reference lookup runs.

use crate::error::{BindingError, BindingErrorKind, Result};
use crate::reference::NativeReference;
use std::fmt;

/// Target of a reference lookup: an optional database and a collection.
///
/// A context is built fresh for every resolution and never mutated. The
/// collection is never empty; a missing database means "the caller's
/// configured default".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceContext {
    database: Option<String>,
    collection: String,
}

impl ReferenceContext {
    /// Create a context for `collection` in the default database.
    pub fn new(collection: impl Into<String>) -> Result<Self> {
        let collection = collection.into();
        if collection.trim().is_empty() {
            return Err(BindingError::new(
                BindingErrorKind::Type,
                "reference target collection must not be empty",
            )
            .into());
        }
        Ok(Self {
            database: None,
            collection,
        })
    }

    /// Take database and collection from a native pointer.
    pub fn from_native(reference: &NativeReference) -> Result<Self> {
        Ok(Self::new(reference.collection.clone())?.with_database(reference.database.clone()))
    }

    /// Set (or clear) the database.
    #[must_use]
    pub fn with_database(mut self, database: Option<String>) -> Self {
        self.database = database.filter(|db| !db.is_empty());
        self
    }

    /// Fill in `default` when no database was named.
    #[must_use]
    pub fn or_database(self, default: Option<&str>) -> Self {
        if self.database.is_some() {
            return self;
        }
        let database = default.map(str::to_string);
        self.with_database(database)
    }

    /// The target database, if one was named.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// The target collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl fmt::Display for ReferenceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.database {
            Some(database) => write!(f, "{}.{}", database, self.collection),
            None => write!(f, "{}", self.collection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_collection_is_rejected() {
        assert!(ReferenceContext::new("").is_err());
        assert!(ReferenceContext::new("   ").is_err());
    }

    #[test]
    fn test_database_defaults() {
        let ctx = ReferenceContext::new("books").unwrap();
        assert_eq!(ctx.database(), None);
        assert_eq!(ctx.to_string(), "books");

        let ctx = ctx.or_database(Some("library"));
        assert_eq!(ctx.database(), Some("library"));
        assert_eq!(ctx.to_string(), "library.books");

        let ctx = ctx.or_database(Some("other"));
        assert_eq!(ctx.database(), Some("library"));
    }

    #[test]
    fn test_blank_database_is_treated_as_default() {
        let ctx = ReferenceContext::new("books")
            .unwrap()
            .with_database(Some(String::new()));
        assert_eq!(ctx.database(), None);
    }

    #[test]
    fn test_from_native() {
        let native = NativeReference::new("publishers", 1).database("catalog");
        let ctx = ReferenceContext::from_native(&native).unwrap();
        assert_eq!(ctx.collection(), "publishers");
        assert_eq!(ctx.database(), Some("catalog"));
    }
}
