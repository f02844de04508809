//! Document to object conversion.

use bson::Document;
use docref_core::{MappingError, MappingErrorKind, PropertyDescriptor, Result};
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;

/// Turns a raw referenced document into the property's target type.
///
/// Any `Fn(&PropertyDescriptor, Document) -> Result<T>` is a converter.
pub trait DocumentConverter: Send + Sync {
    /// The materialized target type.
    type Output;

    /// Convert one raw document read for `property`.
    fn convert(&self, property: &PropertyDescriptor, document: Document) -> Result<Self::Output>;
}

impl<F, T> DocumentConverter for F
where
    F: Fn(&PropertyDescriptor, Document) -> Result<T> + Send + Sync,
{
    type Output = T;

    fn convert(&self, property: &PropertyDescriptor, document: Document) -> Result<T> {
        self(property, document)
    }
}

/// Converter backed by serde.
pub struct SerdeConverter<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> SerdeConverter<T> {
    /// Create the converter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for SerdeConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SerdeConverter<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeConverter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeConverter")
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DeserializeOwned> DocumentConverter for SerdeConverter<T> {
    type Output = T;

    fn convert(&self, property: &PropertyDescriptor, document: Document) -> Result<T> {
        bson::from_document(document).map_err(|e| {
            MappingError::new(
                MappingErrorKind::Conversion,
                property.name,
                format!("cannot read {}: {}", property.target_type, e),
            )
            .with_source(e)
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docref_core::Error;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Author {
        #[serde(rename = "_id")]
        id: String,
        name: String,
    }

    #[test]
    fn test_serde_converter() {
        let property = PropertyDescriptor::new("author", "Author");
        let converter = SerdeConverter::<Author>::new();

        let author = converter
            .convert(&property, doc! { "_id": "a-1", "name": "Ursula", "extra": 1 })
            .unwrap();
        assert_eq!(
            author,
            Author {
                id: "a-1".to_string(),
                name: "Ursula".to_string(),
            }
        );
    }

    #[test]
    fn test_serde_converter_failure_is_mapping_error() {
        let property = PropertyDescriptor::new("author", "Author");
        let err = SerdeConverter::<Author>::new()
            .convert(&property, doc! { "_id": "a-1" })
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Mapping(ref e) if e.kind == MappingErrorKind::Conversion
        ));
        assert_eq!(err.property(), Some("author"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_closure_converter() {
        let property = PropertyDescriptor::new("author", "Author");
        let names = |_: &PropertyDescriptor, doc: Document| -> Result<String> {
            Ok(doc.get_str("name").unwrap_or_default().to_string())
        };
        assert_eq!(
            names.convert(&property, doc! { "name": "Ada" }).unwrap(),
            "Ada"
        );
    }
}
