//! Query execution contracts.
//!
//! The resolver never talks to a store directly. A [`ReferenceLoader`] runs
//! the computed filter against the computed context; its failures are wrapped
//! in [`FetchError`](docref_core::FetchError) by the implementation and passed
//! through untouched.

use asupersync::{Cx, Outcome};
use bson::Document;
use docref_core::{Error, PropertyDescriptor, ReferenceContext, Result};
use std::sync::Arc;

/// Synchronous loader for referenced documents.
pub trait ReferenceLoader: Send + Sync {
    /// Fetch at most one document matching `filter`.
    fn fetch_one(&self, filter: &Document, context: &ReferenceContext) -> Result<Option<Document>>;

    /// Fetch every document matching `filter`.
    fn fetch_many(&self, filter: &Document, context: &ReferenceContext) -> Result<Vec<Document>>;
}

impl<L: ReferenceLoader + ?Sized> ReferenceLoader for Arc<L> {
    fn fetch_one(&self, filter: &Document, context: &ReferenceContext) -> Result<Option<Document>> {
        (**self).fetch_one(filter, context)
    }

    fn fetch_many(&self, filter: &Document, context: &ReferenceContext) -> Result<Vec<Document>> {
        (**self).fetch_many(filter, context)
    }
}

/// Run the default lookup for a property.
///
/// Collection-like properties fetch in bulk; singular properties issue one
/// single-document fetch.
pub fn default_lookup<L>(
    loader: &L,
    property: &PropertyDescriptor,
    context: &ReferenceContext,
    filter: &Document,
) -> Result<Vec<Document>>
where
    L: ReferenceLoader + ?Sized,
{
    if property.is_collection_like() {
        loader.fetch_many(filter, context)
    } else {
        Ok(loader.fetch_one(filter, context)?.into_iter().collect())
    }
}

/// Asynchronous loader for referenced documents.
///
/// Cancellation is owned by the implementation and surfaces as
/// `Outcome::Cancelled`.
pub trait AsyncReferenceLoader: Send + Sync {
    /// Fetch at most one document matching `filter`.
    fn fetch_one(
        &self,
        cx: &Cx,
        filter: &Document,
        context: &ReferenceContext,
    ) -> impl Future<Output = Outcome<Option<Document>, Error>> + Send;

    /// Fetch every document matching `filter`.
    fn fetch_many(
        &self,
        cx: &Cx,
        filter: &Document,
        context: &ReferenceContext,
    ) -> impl Future<Output = Outcome<Vec<Document>, Error>> + Send;
}

/// Async counterpart of [`default_lookup`].
pub async fn default_lookup_async<L>(
    cx: &Cx,
    loader: &L,
    property: &PropertyDescriptor,
    context: &ReferenceContext,
    filter: &Document,
) -> Outcome<Vec<Document>, Error>
where
    L: AsyncReferenceLoader + ?Sized,
{
    if property.is_collection_like() {
        return loader.fetch_many(cx, filter, context).await;
    }

    match loader.fetch_one(cx, filter, context).await {
        Outcome::Ok(found) => Outcome::Ok(found.into_iter().collect()),
        Outcome::Err(e) => Outcome::Err(e),
        Outcome::Cancelled(r) => Outcome::Cancelled(r),
        Outcome::Panicked(p) => Outcome::Panicked(p),
    }
}
