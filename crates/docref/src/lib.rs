//! docref - manual and lazy document references for Rust document mappers.
//!
//! A document may store a pointer to other documents instead of embedding
//! them: a bare id, a compound key, a `{ id, collection, db }` descriptor or a
//! driver-style `{ $ref, $id, $db }` pointer. docref turns such stored values
//! back into the referenced entities:
//!
//! - lookup filters are written as templates, `{ '_id' : ?#{#target} }`,
//!   bound against the stored value
//! - collection references fan out into one `$or` query
//! - lazy references hand out a `LazyReference` that fetches on first use and
//!   caches the result, including "nothing found"
//!
//! # Quick Start
//!
//! ```ignore
//! use docref::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! struct Publisher {
//!     #[serde(rename = "_id")]
//!     id: String,
//!     name: String,
//! }
//!
//! impl Entity for Publisher {
//!     const ENTITY_NAME: &'static str = "Publisher";
//!     const COLLECTION_NAME: &'static str = "publishers";
//! }
//!
//! const PUBLISHER: PropertyDescriptor = PropertyDescriptor::to::<Publisher>("publisher")
//!     .manual(ManualReference::by_id().lazy(true));
//!
//! let mapping = Arc::new(EntityRegistry::new().with::<Publisher>());
//! let reader = ReferenceReader::new(mapping, SerdeConverter::<Publisher>::new());
//! let resolver = DefaultReferenceResolver::new(store, reader);
//!
//! let publisher = resolver.resolve_lazy(&PUBLISHER, &Bson::String("p-1".into()))?;
//! println!("{}", publisher.try_map(|p| p.name.clone())?);
//! ```

// Re-export all public types from sub-crates
pub use docref_core::{
    BindingError, BindingErrorKind, Bson, Cardinality, DEFAULT_LOOKUP, Document, Entity,
    EntityInfo, EntityRegistry, Error, FetchError, ManualReference, MappingContext, MappingError,
    MappingErrorKind, NativeReference, NullTargetError, PropertyDescriptor, RawReference,
    ReferenceConfig, ReferenceContext, Result, UnknownTargetTypeError, global_mapping_context,
    init_global_mapping_context, reset_global_mapping_context,
};
pub use docref_expr::{
    BindingContext, BindingVariables, Expression, ExpressionEvaluator, PathEvaluator,
    TemplateCodec, to_text,
};
pub use docref_resolve::{
    AsyncReferenceLoader, DefaultReferenceResolver, DocumentConverter, LazyPolicy,
    LazyReference, OrderFunction, ReferenceLoader, ReferenceQuery, ReferenceReader,
    ReferenceResolver, Resolution, Resolved, ResolverConfig, SerdeConverter, SourceOrder,
    default_lookup, default_lookup_async, matches_filter,
};

// asupersync re-exports for async loaders
pub use asupersync::{Cx, Outcome};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        // Documents
        Bson,
        Document,
        // Metadata
        Entity,
        EntityRegistry,
        ManualReference,
        PropertyDescriptor,
        // Resolution
        DefaultReferenceResolver,
        DocumentConverter,
        LazyReference,
        ReferenceContext,
        ReferenceLoader,
        ReferenceReader,
        ReferenceResolver,
        Resolution,
        Resolved,
        ResolverConfig,
        SerdeConverter,
        // Errors
        Error,
        FetchError,
        Result,
        // asupersync
        Cx,
        Outcome,
    };
    pub use bson::{bson, doc};
    pub use serde::Deserialize;
    pub use std::sync::Arc;
}
