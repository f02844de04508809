//! Eager vs. lazy resolution policy.

use crate::config::ResolverConfig;
use crate::convert::DocumentConverter;
use crate::lazy::LazyReference;
use crate::loader::{ReferenceLoader, default_lookup};
use crate::order::SourceOrder;
use crate::reader::{ReferenceReader, not_a_reference};
use crate::resolved::Resolved;
use bson::{Bson, Document};
use docref_core::{PropertyDescriptor, ReferenceContext, Result};
use std::fmt;
use std::sync::Arc;

/// What resolving a reference property produced.
pub enum Resolution<T> {
    /// Targets were fetched immediately.
    Eager(Resolved<T>),
    /// Targets will be fetched on first use.
    Lazy(LazyReference<T>),
}

impl<T> Resolution<T> {
    /// Check whether a proxy was produced.
    pub fn is_lazy(&self) -> bool {
        matches!(self, Resolution::Lazy(_))
    }

    /// Borrow the proxy, if one was produced.
    pub fn as_lazy(&self) -> Option<&LazyReference<T>> {
        match self {
            Resolution::Lazy(lazy) => Some(lazy),
            Resolution::Eager(_) => None,
        }
    }

    /// Take the proxy, if one was produced.
    pub fn into_lazy(self) -> Option<LazyReference<T>> {
        match self {
            Resolution::Lazy(lazy) => Some(lazy),
            Resolution::Eager(_) => None,
        }
    }

    /// Get the targets, forcing a proxy if needed.
    pub fn resolved(&self) -> Result<&Resolved<T>> {
        match self {
            Resolution::Eager(resolved) => Ok(resolved),
            Resolution::Lazy(lazy) => lazy.resolve(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolution<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Eager(resolved) => f.debug_tuple("Eager").field(resolved).finish(),
            Resolution::Lazy(lazy) => f.debug_tuple("Lazy").field(lazy).finish(),
        }
    }
}

/// Resolves reference properties of loaded documents.
pub trait ReferenceResolver {
    /// The materialized target type.
    type Output;

    /// Resolve `source`, the stored value of `property`.
    ///
    /// Lazy properties produce a proxy without fetching anything.
    fn resolve_reference(
        &self,
        property: &PropertyDescriptor,
        source: &Bson,
    ) -> Result<Resolution<Self::Output>>;
}

/// Resolver running lookups through a [`ReferenceLoader`].
pub struct DefaultReferenceResolver<L, C> {
    loader: Arc<L>,
    reader: Arc<ReferenceReader<C>>,
    config: ResolverConfig,
}

impl<L, C> Clone for DefaultReferenceResolver<L, C> {
    fn clone(&self) -> Self {
        Self {
            loader: Arc::clone(&self.loader),
            reader: Arc::clone(&self.reader),
            config: self.config.clone(),
        }
    }
}

impl<L, C> fmt::Debug for DefaultReferenceResolver<L, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultReferenceResolver")
            .field("reader", &self.reader)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<L, C> DefaultReferenceResolver<L, C>
where
    L: ReferenceLoader + 'static,
    C: DocumentConverter + 'static,
{
    /// Create a resolver with the default configuration.
    pub fn new(loader: L, reader: ReferenceReader<C>) -> Self {
        Self::with_config(loader, reader, ResolverConfig::default())
    }

    /// Create a resolver with an explicit configuration.
    pub fn with_config(loader: L, reader: ReferenceReader<C>, config: ResolverConfig) -> Self {
        let reader = if config.restore_source_order && !reader.has_order_function() {
            reader.order_function(Arc::new(SourceOrder))
        } else {
            reader
        };
        Self {
            loader: Arc::new(loader),
            reader: Arc::new(reader),
            config,
        }
    }

    /// The loader lookups run through.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// The reader lookups are computed by.
    pub fn reader(&self) -> &ReferenceReader<C> {
        &self.reader
    }

    /// The active configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Check whether `property` resolves to a proxy under this configuration.
    pub fn is_lazy_reference(&self, property: &PropertyDescriptor) -> bool {
        self.config.lazy_policy.honors_lazy() && property.is_lazy()
    }

    /// Resolve through a caller-supplied lookup instead of the loader.
    ///
    /// The configured default database is filled in before `lookup` runs.
    #[tracing::instrument(level = "debug", skip_all, fields(property = property.name))]
    pub fn resolve_with<F>(
        &self,
        property: &PropertyDescriptor,
        source: &Bson,
        lookup: F,
    ) -> Result<Resolution<C::Output>>
    where
        F: Fn(&ReferenceContext, &Document) -> Result<Vec<Document>> + Send + Sync + 'static,
    {
        if !property.reference.is_reference() {
            return Err(not_a_reference(property));
        }

        let default_database = self.config.default_database.clone();
        let lookup = move |context: &ReferenceContext, filter: &Document| {
            let context = context.clone().or_database(default_database.as_deref());
            lookup(&context, filter)
        };

        if !self.is_lazy_reference(property) {
            return self
                .reader
                .read_reference(property, source, lookup)
                .map(Resolution::Eager);
        }

        let reader = Arc::clone(&self.reader);
        let property = *property;
        let stored = source.clone();
        Ok(Resolution::Lazy(LazyReference::new(
            property,
            source.clone(),
            move || reader.read_reference(&property, &stored, &lookup),
        )))
    }

    /// Resolve a property as a proxy.
    ///
    /// Eager properties resolve now and come back as an already-resolved
    /// proxy, so callers can hold one type regardless of configuration.
    pub fn resolve_lazy(&self, property: &PropertyDescriptor, source: &Bson) -> Result<LazyReference<C::Output>> {
        match self.resolve_reference(property, source)? {
            Resolution::Lazy(lazy) => Ok(lazy),
            Resolution::Eager(resolved) => Ok(LazyReference::from_resolved(
                *property,
                source.clone(),
                resolved,
            )),
        }
    }
}

impl<L, C> ReferenceResolver for DefaultReferenceResolver<L, C>
where
    L: ReferenceLoader + 'static,
    C: DocumentConverter + 'static,
{
    type Output = C::Output;

    fn resolve_reference(
        &self,
        property: &PropertyDescriptor,
        source: &Bson,
    ) -> Result<Resolution<C::Output>> {
        let loader = Arc::clone(&self.loader);
        let target = *property;
        self.resolve_with(property, source, move |context, filter| {
            default_lookup(loader.as_ref(), &target, context, filter)
        })
    }
}
