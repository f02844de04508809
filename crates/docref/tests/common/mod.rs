//! In-memory document store shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use docref::prelude::*;
use docref::{AsyncReferenceLoader, Entity, Outcome, matches_filter};
use serde::Serialize;

pub const DEFAULT_DB: &str = "manual-reference-tests";

/// Documents keyed by database and collection.
///
/// Understands plain equality filters and a top-level `$or` of them. Every
/// fetch is counted and recorded so tests can assert on what was queried.
#[derive(Default)]
pub struct InMemoryStore {
    collections: Mutex<HashMap<(String, String), Vec<Document>>>,
    fetches: AtomicUsize,
    queries: Mutex<Vec<(String, String, Document)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, collection: &str, document: Document) {
        self.insert_into(DEFAULT_DB, collection, document);
    }

    pub fn insert_into(&self, database: &str, collection: &str, document: Document) {
        self.collections
            .lock()
            .unwrap()
            .entry((database.to_string(), collection.to_string()))
            .or_default()
            .push(document);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// (database, collection, filter) of every fetch, in call order.
    pub fn queries(&self) -> Vec<(String, String, Document)> {
        self.queries.lock().unwrap().clone()
    }

    fn find(&self, filter: &Document, context: &ReferenceContext) -> Vec<Document> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let database = context.database().unwrap_or(DEFAULT_DB).to_string();
        let collection = context.collection().to_string();
        self.queries
            .lock()
            .unwrap()
            .push((database.clone(), collection.clone(), filter.clone()));

        let collections = self.collections.lock().unwrap();
        collections
            .get(&(database, collection))
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| satisfies(filter, document))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn satisfies(filter: &Document, document: &Document) -> bool {
    match filter.get_array("$or") {
        Ok(branches) => branches
            .iter()
            .filter_map(Bson::as_document)
            .any(|branch| matches_filter(branch, document)),
        Err(_) => matches_filter(filter, document),
    }
}

impl ReferenceLoader for InMemoryStore {
    fn fetch_one(&self, filter: &Document, context: &ReferenceContext) -> Result<Option<Document>> {
        Ok(self.find(filter, context).into_iter().next())
    }

    fn fetch_many(&self, filter: &Document, context: &ReferenceContext) -> Result<Vec<Document>> {
        Ok(self.find(filter, context))
    }
}

impl AsyncReferenceLoader for InMemoryStore {
    fn fetch_one(
        &self,
        _cx: &Cx,
        filter: &Document,
        context: &ReferenceContext,
    ) -> impl Future<Output = Outcome<Option<Document>, Error>> + Send {
        let found = self.find(filter, context).into_iter().next();
        async move { Outcome::Ok(found) }
    }

    fn fetch_many(
        &self,
        _cx: &Cx,
        filter: &Document,
        context: &ReferenceContext,
    ) -> impl Future<Output = Outcome<Vec<Document>, Error>> + Send {
        let found = self.find(filter, context);
        async move { Outcome::Ok(found) }
    }
}

pub fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

// Referenced types

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleObjectRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub value: String,
}

impl Entity for SimpleObjectRef {
    const ENTITY_NAME: &'static str = "SimpleObjectRef";
    const COLLECTION_NAME: &'static str = "simple-object-ref";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRefOfDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub value: String,
}

impl Entity for ObjectRefOfDocument {
    const ENTITY_NAME: &'static str = "ObjectRefOfDocument";
    const COLLECTION_NAME: &'static str = "object-ref-of-document";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRefOnNonIdField {
    #[serde(rename = "_id")]
    pub id: String,
    pub value: String,
    #[serde(rename = "refKey1")]
    pub ref_key1: String,
    #[serde(rename = "refKey2")]
    pub ref_key2: String,
}

impl Entity for ObjectRefOnNonIdField {
    const ENTITY_NAME: &'static str = "ObjectRefOnNonIdField";
    const COLLECTION_NAME: &'static str = "object-ref-on-non-id-field";
}

pub fn mapping() -> Arc<EntityRegistry> {
    Arc::new(
        EntityRegistry::new()
            .with::<SimpleObjectRef>()
            .with::<ObjectRefOfDocument>()
            .with::<ObjectRefOnNonIdField>(),
    )
}

pub fn resolver<T>(store: Arc<InMemoryStore>) -> DefaultReferenceResolver<Arc<InMemoryStore>, SerdeConverter<T>>
where
    T: serde::de::DeserializeOwned + 'static,
{
    let reader = ReferenceReader::new(mapping(), SerdeConverter::<T>::new());
    DefaultReferenceResolver::new(store, reader)
}
