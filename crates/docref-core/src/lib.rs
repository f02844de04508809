//! Core types for docref.
//!
//! This crate provides the foundational pieces shared by the binding and
//! resolution layers:
//!
//! - `Error` and its payload types for every resolution failure
//! - `PropertyDescriptor` and `ReferenceConfig` for per-property reference metadata
//! - `Entity`, `EntityRegistry` and `MappingContext` for target-type metadata
//! - `RawReference` and `NativeReference` for stored reference descriptors
//! - `ReferenceContext` for the database/collection a lookup runs against

// Re-export the document model
pub use bson::{Bson, Document};

pub mod context;
pub mod entity;
pub mod error;
pub mod mapping;
pub mod property;
pub mod reference;

pub use context::ReferenceContext;
pub use entity::{Entity, EntityInfo};
pub use error::{
    BindingError, BindingErrorKind, Error, FetchError, MappingError, MappingErrorKind,
    NullTargetError, Result, UnknownTargetTypeError,
};
pub use mapping::{
    EntityRegistry, MappingContext, global_mapping_context, init_global_mapping_context,
    reset_global_mapping_context,
};
pub use property::{Cardinality, DEFAULT_LOOKUP, ManualReference, PropertyDescriptor, ReferenceConfig};
pub use reference::{NativeReference, RawReference};
