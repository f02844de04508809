//! Deferred reference resolution.

use crate::resolved::{Resolved, read_many_as_single, read_single_as_many};
use bson::Bson;
use docref_core::{Error, NullTargetError, PropertyDescriptor, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::{Arc, OnceLock};

type ResolveFn<T> = dyn Fn() -> Result<Resolved<T>> + Send + Sync;

/// A reference whose targets are fetched on first use.
///
/// The proxy holds the stored reference value and a callback that reads it.
/// The first forcing access ([`resolve`](Self::resolve), [`get`](Self::get),
/// [`get_all`](Self::get_all), [`try_map`](Self::try_map)) runs the callback
/// and caches its result, including a result of "nothing found". Later
/// accesses never fetch again.
///
/// A failed read is not cached: the error goes to the caller and the next
/// access tries again. If two threads race on the first access, both may
/// fetch but only the first stored result is kept and returned to both.
///
/// Clones share the cache, so resolving one clone resolves them all.
///
/// # Typing
///
/// The proxy does not pretend to be `T`. Forwarding is explicit and
/// fallible: `get()` fails with `NullTargetError` when nothing was found.
/// To pass a proxy where a trait object is expected, implement the trait for
/// `LazyReference<T>` with methods that forward through `try_map`.
///
/// # Example
///
/// ```ignore
/// let publisher: LazyReference<Publisher> = resolver.resolve_lazy(&PUBLISHER, &stored)?;
/// assert!(!publisher.is_resolved());
/// let name = publisher.try_map(|p| p.name.clone())?;
/// assert!(publisher.is_resolved());
/// ```
pub struct LazyReference<T> {
    property: PropertyDescriptor,
    source: Bson,
    value: Arc<OnceLock<Resolved<T>>>,
    resolver: Arc<ResolveFn<T>>,
}

impl<T> LazyReference<T> {
    /// Create an unresolved proxy for `source`.
    pub fn new<F>(property: PropertyDescriptor, source: Bson, resolver: F) -> Self
    where
        F: Fn() -> Result<Resolved<T>> + Send + Sync + 'static,
    {
        tracing::debug!(property = property.name, "Created lazy reference");
        Self {
            property,
            source,
            value: Arc::new(OnceLock::new()),
            resolver: Arc::new(resolver),
        }
    }

    /// Create a proxy that is already resolved to `value`.
    pub fn from_resolved(property: PropertyDescriptor, source: Bson, value: Resolved<T>) -> Self
    where
        T: 'static,
    {
        Self {
            property,
            source,
            value: Arc::new(OnceLock::from(value)),
            resolver: Arc::new(|| -> Result<Resolved<T>> {
                Err(Error::Custom("resolved reference has no lookup".to_string()))
            }),
        }
    }

    /// Check whether the targets have been fetched (including "nothing found").
    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }

    /// Peek at the cached result without fetching.
    pub fn current_value(&self) -> Option<&Resolved<T>> {
        self.value.get()
    }

    /// The stored reference value this proxy reads.
    pub fn source(&self) -> &Bson {
        &self.source
    }

    /// The property this proxy stands in for.
    pub fn property(&self) -> &PropertyDescriptor {
        &self.property
    }

    /// Check whether two proxies are the same proxy.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }

    /// Fetch the targets if needed and return the cached result.
    pub fn resolve(&self) -> Result<&Resolved<T>> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let fetched = (self.resolver)()?;
        tracing::debug!(
            property = self.property.name,
            found = fetched.len(),
            "Resolved lazy reference"
        );
        Ok(self.value.get_or_init(|| fetched))
    }

    /// Get the single target.
    ///
    /// Fails with `NullTargetError` when nothing was found, and with a
    /// cardinality error on a collection reference.
    pub fn get(&self) -> Result<&T> {
        match self.resolve()? {
            Resolved::Single(Some(value)) => Ok(value),
            Resolved::Single(None) => Err(NullTargetError {
                property: self.property.name.to_string(),
            }
            .into()),
            Resolved::Many(_) => Err(read_many_as_single(self.property.name)),
        }
    }

    /// Get every target of a collection reference.
    pub fn get_all(&self) -> Result<&[T]> {
        match self.resolve()? {
            Resolved::Many(values) => Ok(values),
            Resolved::Single(_) => Err(read_single_as_many(self.property.name)),
        }
    }

    /// Forward a call to the single target.
    pub fn try_map<U>(&self, f: impl FnOnce(&T) -> U) -> Result<U> {
        self.get().map(f)
    }
}

impl<T> Clone for LazyReference<T> {
    fn clone(&self) -> Self {
        Self {
            property: self.property,
            source: self.source.clone(),
            value: Arc::clone(&self.value),
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyReference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_resolved() {
            "resolved"
        } else {
            "unresolved"
        };

        f.debug_struct("LazyReference")
            .field("property", &self.property.name)
            .field("state", &state)
            .field("source", &self.source)
            .field("value", &self.current_value())
            .finish()
    }
}

/// Serializes the cached targets when resolved, otherwise the stored
/// reference value. Serializing never fetches.
impl<T> Serialize for LazyReference<T>
where
    T: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.current_value() {
            Some(value) => value.serialize(serializer),
            None => self.source.serialize(serializer),
        }
    }
}

/// Value equality after resolving both sides. A side that fails to resolve
/// compares unequal.
impl<T: PartialEq> PartialEq for LazyReference<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.resolve(), other.resolve()) {
            (Ok(left), Ok(right)) => left == right,
            _ => false,
        }
    }
}
