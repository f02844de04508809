//! Reference reading, lazy proxies and resolution policy.
//!
//! - `ReferenceReader` computes filter and context for a stored reference and
//!   materializes what the lookup returns
//! - `DefaultReferenceResolver` decides between fetching now and handing out
//!   a `LazyReference`
//! - `ReferenceLoader` / `AsyncReferenceLoader` are the store contracts
//! - `DocumentConverter` turns raw documents into target values
//! - `OrderFunction` optionally reorders collection results

pub mod config;
pub mod convert;
pub mod lazy;
pub mod loader;
pub mod order;
pub mod reader;
pub mod resolved;
pub mod resolver;

pub use config::{LazyPolicy, ResolverConfig};
pub use convert::{DocumentConverter, SerdeConverter};
pub use lazy::LazyReference;
pub use loader::{AsyncReferenceLoader, ReferenceLoader, default_lookup, default_lookup_async};
pub use order::{OrderFunction, SourceOrder, matches_filter};
pub use reader::{ReferenceQuery, ReferenceReader};
pub use resolved::Resolved;
pub use resolver::{DefaultReferenceResolver, ReferenceResolver, Resolution};
