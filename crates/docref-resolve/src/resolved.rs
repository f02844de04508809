//! Materialized reference values.

use docref_core::{Error, MappingError, MappingErrorKind, Result};
use serde::{Serialize, Serializer};

/// The result of reading a reference.
///
/// Singular properties resolve to the first match (or nothing); collection
/// properties resolve to every match in loader order.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<T> {
    /// A singular reference.
    Single(Option<T>),
    /// A collection reference.
    Many(Vec<T>),
}

impl<T> Resolved<T> {
    /// Check whether nothing was found.
    pub fn is_empty(&self) -> bool {
        match self {
            Resolved::Single(value) => value.is_none(),
            Resolved::Many(values) => values.is_empty(),
        }
    }

    /// Number of resolved targets.
    pub fn len(&self) -> usize {
        match self {
            Resolved::Single(value) => usize::from(value.is_some()),
            Resolved::Many(values) => values.len(),
        }
    }

    /// Borrow the singular target.
    pub fn as_single(&self) -> Option<&T> {
        match self {
            Resolved::Single(value) => value.as_ref(),
            Resolved::Many(_) => None,
        }
    }

    /// Borrow every target as a slice.
    pub fn as_slice(&self) -> &[T] {
        match self {
            Resolved::Single(value) => value.as_slice(),
            Resolved::Many(values) => values,
        }
    }

    /// Take the singular target, failing on a collection.
    pub fn into_single(self, property: &str) -> Result<Option<T>> {
        match self {
            Resolved::Single(value) => Ok(value),
            Resolved::Many(_) => Err(read_many_as_single(property)),
        }
    }

    /// Take every target, failing on a singular reference.
    pub fn into_many(self, property: &str) -> Result<Vec<T>> {
        match self {
            Resolved::Many(values) => Ok(values),
            Resolved::Single(_) => Err(read_single_as_many(property)),
        }
    }

    /// Transform every target.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Resolved<U> {
        match self {
            Resolved::Single(value) => Resolved::Single(value.map(f)),
            Resolved::Many(values) => Resolved::Many(values.into_iter().map(&mut f).collect()),
        }
    }

    /// Transform every target, stopping at the first failure.
    pub fn try_map<U>(self, mut f: impl FnMut(T) -> Result<U>) -> Result<Resolved<U>> {
        Ok(match self {
            Resolved::Single(value) => Resolved::Single(value.map(f).transpose()?),
            Resolved::Many(values) => Resolved::Many(
                values
                    .into_iter()
                    .map(&mut f)
                    .collect::<Result<Vec<_>>>()?,
            ),
        })
    }
}

pub(crate) fn read_many_as_single(property: &str) -> Error {
    MappingError::new(
        MappingErrorKind::Cardinality,
        property,
        "collection reference read as a single value",
    )
    .into()
}

pub(crate) fn read_single_as_many(property: &str) -> Error {
    MappingError::new(
        MappingErrorKind::Cardinality,
        property,
        "single reference read as a collection",
    )
    .into()
}

impl<T> Serialize for Resolved<T>
where
    T: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Resolved::Single(value) => value.serialize(serializer),
            Resolved::Many(values) => values.serialize(serializer),
        }
    }
}
