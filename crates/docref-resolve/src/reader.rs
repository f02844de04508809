//! Reference reading.
//!
//! `ReferenceReader` turns a stored reference value into materialized
//! targets:
//!
//! 1. bind the lookup template against the stored value (once per element
//!    for collection references, combined under `$or`)
//! 2. compute the database and collection to query
//! 3. hand context and filter to the lookup function
//! 4. convert every returned document
//!
//! The reader holds no per-call state and may be shared freely.

use crate::convert::DocumentConverter;
use crate::loader::{AsyncReferenceLoader, default_lookup_async};
use crate::order::OrderFunction;
use crate::resolved::Resolved;
use asupersync::{Cx, Outcome};
use bson::{Bson, Document, doc};
use docref_core::reference::{COLLECTION_FIELD, DATABASE_FIELD};
use docref_core::{
    Error, MappingContext, MappingError, MappingErrorKind, PropertyDescriptor, RawReference,
    ReferenceConfig, ReferenceContext, Result, global_mapping_context,
};
use docref_expr::{BindingContext, BindingVariables, ExpressionEvaluator, PathEvaluator, to_text};
use std::fmt;
use std::sync::Arc;

/// Filter and context for one reference read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceQuery {
    /// Where to look.
    pub context: ReferenceContext,
    /// What to look for.
    pub filter: Document,
    /// Per-element filters of a collection reference, in source order.
    pub elements: Vec<Document>,
}

/// Reads references through a mapping context, an evaluator and a converter.
#[derive(Clone)]
pub struct ReferenceReader<C> {
    mapping: Arc<dyn MappingContext>,
    converter: C,
    evaluator: Arc<dyn ExpressionEvaluator>,
    order: Option<Arc<dyn OrderFunction>>,
}

impl<C> fmt::Debug for ReferenceReader<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceReader")
            .field("converter", &std::any::type_name::<C>())
            .field("ordered", &self.order.is_some())
            .finish_non_exhaustive()
    }
}

impl<C: DocumentConverter> ReferenceReader<C> {
    /// Create a reader using the default path evaluator.
    pub fn new(mapping: Arc<dyn MappingContext>, converter: C) -> Self {
        Self {
            mapping,
            converter,
            evaluator: Arc::new(PathEvaluator::new()),
            order: None,
        }
    }

    /// Create a reader backed by the process-wide mapping context.
    pub fn with_global_mapping(converter: C) -> Self {
        Self::new(global_mapping_context(), converter)
    }

    /// Replace the expression evaluator.
    #[must_use]
    pub fn evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Install an ordering hook for collection references.
    #[must_use]
    pub fn order_function(mut self, order: Arc<dyn OrderFunction>) -> Self {
        self.order = Some(order);
        self
    }

    /// Check whether an ordering hook is installed.
    pub fn has_order_function(&self) -> bool {
        self.order.is_some()
    }

    /// The document converter.
    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// The metadata provider.
    pub fn mapping_context(&self) -> &dyn MappingContext {
        self.mapping.as_ref()
    }

    /// Read a reference through `lookup`.
    ///
    /// `lookup` receives the computed context and filter and returns raw
    /// documents. A null source, or an empty sequence on a collection
    /// property, resolves to nothing without calling it.
    #[tracing::instrument(level = "debug", skip_all, fields(property = property.name))]
    pub fn read_reference<F>(
        &self,
        property: &PropertyDescriptor,
        source: &Bson,
        lookup: F,
    ) -> Result<Resolved<C::Output>>
    where
        F: FnOnce(&ReferenceContext, &Document) -> Result<Vec<Document>>,
    {
        let Some(query) = self.prepare(property, source)? else {
            tracing::trace!("Nothing stored, skipping lookup");
            return Ok(empty(property));
        };
        let documents = lookup(&query.context, &query.filter)?;
        self.materialize(property, &query, documents)
    }

    /// Read a reference through an async loader.
    ///
    /// Binding happens before the first suspension point. Loader outcomes
    /// other than success pass through untouched.
    #[tracing::instrument(level = "debug", skip_all, fields(property = property.name))]
    pub async fn read_reference_async<L>(
        &self,
        cx: &Cx,
        property: &PropertyDescriptor,
        source: &Bson,
        loader: &L,
    ) -> Outcome<Resolved<C::Output>, Error>
    where
        L: AsyncReferenceLoader + ?Sized,
    {
        let query = match self.prepare(property, source) {
            Ok(Some(query)) => query,
            Ok(None) => return Outcome::Ok(empty(property)),
            Err(e) => return Outcome::Err(e),
        };

        match default_lookup_async(cx, loader, property, &query.context, &query.filter).await {
            Outcome::Ok(documents) => match self.materialize(property, &query, documents) {
                Ok(resolved) => Outcome::Ok(resolved),
                Err(e) => Outcome::Err(e),
            },
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Compute filter and context without running a lookup.
    ///
    /// Returns `None` when nothing needs fetching.
    pub fn prepare(&self, property: &PropertyDescriptor, source: &Bson) -> Result<Option<ReferenceQuery>> {
        ensure_reference(property)?;
        if RawReference::classify(source).is_null() {
            return Ok(None);
        }

        let (filter, elements) = match fan_out(property, source) {
            Some([]) => return Ok(None),
            Some(items) => {
                let elements = self.element_filters(property, items)?;
                (doc! { "$or": elements.clone() }, elements)
            }
            None => (self.element_filter(property, source)?, Vec::new()),
        };
        let context = self.compute_context(property, source)?;

        tracing::trace!(context = %context, filter = ?filter, "Computed reference query");
        Ok(Some(ReferenceQuery {
            context,
            filter,
            elements,
        }))
    }

    /// Compute the lookup filter for a stored reference value.
    ///
    /// Collection properties holding a sequence get one filter per element,
    /// bound separately and combined as `{ $or : [ ... ] }` in source order.
    pub fn compute_filter(&self, property: &PropertyDescriptor, source: &Bson) -> Result<Document> {
        ensure_reference(property)?;
        match fan_out(property, source) {
            Some(items) => {
                let elements = self.element_filters(property, items)?;
                Ok(doc! { "$or": elements })
            }
            None => self.element_filter(property, source),
        }
    }

    /// Compute the database and collection to query.
    pub fn compute_context(&self, property: &PropertyDescriptor, source: &Bson) -> Result<ReferenceContext> {
        let value = match source {
            Bson::Array(items) => match items.first() {
                Some(first) => first,
                None => return self.default_context(property),
            },
            other => other,
        };

        match RawReference::classify(value) {
            RawReference::Native(native) => ReferenceContext::from_native(&native),
            RawReference::Document(stored) => self.document_context(property, value, stored),
            _ => self.default_context(property),
        }
    }

    fn element_filters(&self, property: &PropertyDescriptor, items: &[Bson]) -> Result<Vec<Document>> {
        items
            .iter()
            .map(|item| self.element_filter(property, item))
            .collect()
    }

    fn element_filter(&self, property: &PropertyDescriptor, value: &Bson) -> Result<Document> {
        match property.reference {
            ReferenceConfig::Manual(manual) => {
                let variables = BindingVariables::for_property(property.name, value);
                BindingContext::new(&variables, self.evaluator.as_ref()).decode(manual.lookup)
            }
            ReferenceConfig::Native { .. } => {
                let id = match RawReference::classify(value) {
                    RawReference::Native(native) => native.id,
                    _ => value.clone(),
                };
                let id_field = self
                    .mapping
                    .persistent_entity(property.target_type)
                    .map_or("_id", |info| info.id_field);
                let mut filter = Document::new();
                filter.insert(id_field, id);
                Ok(filter)
            }
            ReferenceConfig::None => Err(not_a_reference(property)),
        }
    }

    fn document_context(
        &self,
        property: &PropertyDescriptor,
        value: &Bson,
        stored: &Document,
    ) -> Result<ReferenceContext> {
        let database = stored.get_str(DATABASE_FIELD).ok().map(str::to_string);

        if let Some(expression) = property
            .collection_expression()
            .filter(|expression| !expression.trim().is_empty())
        {
            let variables = BindingVariables::for_property(property.name, value);
            let bound = BindingContext::new(&variables, self.evaluator.as_ref())
                .bind_collection(expression)?;
            if let Some(collection) = collection_name(&bound) {
                return Ok(ReferenceContext::new(collection)?.with_database(database));
            }
        }

        if let Some(collection) = stored
            .get_str(COLLECTION_FIELD)
            .ok()
            .filter(|collection| !collection.trim().is_empty())
        {
            return Ok(ReferenceContext::new(collection)?.with_database(database));
        }

        Ok(self.default_context(property)?.with_database(database))
    }

    fn default_context(&self, property: &PropertyDescriptor) -> Result<ReferenceContext> {
        let info = self.mapping.required_entity(property.target_type)?;
        if info.collection.trim().is_empty() {
            return Err(MappingError::new(
                MappingErrorKind::MissingCollection,
                property.name,
                format!("entity '{}' maps to no collection", property.target_type),
            )
            .into());
        }
        ReferenceContext::new(info.collection)
    }

    fn materialize(
        &self,
        property: &PropertyDescriptor,
        query: &ReferenceQuery,
        mut documents: Vec<Document>,
    ) -> Result<Resolved<C::Output>> {
        tracing::trace!(count = documents.len(), "Lookup returned documents");

        if !property.is_collection_like() {
            return documents
                .into_iter()
                .next()
                .map(|document| self.converter.convert(property, document))
                .transpose()
                .map(Resolved::Single);
        }

        if let (Some(order), false) = (&self.order, query.elements.is_empty()) {
            documents = order.order(&query.elements, documents);
        }
        documents
            .into_iter()
            .map(|document| self.converter.convert(property, document))
            .collect::<Result<Vec<_>>>()
            .map(Resolved::Many)
    }
}

fn fan_out<'a>(property: &PropertyDescriptor, source: &'a Bson) -> Option<&'a [Bson]> {
    match source {
        Bson::Array(items) if property.is_collection_like() => Some(items),
        _ => None,
    }
}

fn empty<T>(property: &PropertyDescriptor) -> Resolved<T> {
    if property.is_collection_like() {
        Resolved::Many(Vec::new())
    } else {
        Resolved::Single(None)
    }
}

fn collection_name(bound: &Bson) -> Option<String> {
    match bound {
        Bson::Null | Bson::Undefined => None,
        other => Some(to_text(other)).filter(|name| !name.trim().is_empty()),
    }
}

fn ensure_reference(property: &PropertyDescriptor) -> Result<()> {
    if property.reference.is_reference() {
        Ok(())
    } else {
        Err(not_a_reference(property))
    }
}

pub(crate) fn not_a_reference(property: &PropertyDescriptor) -> Error {
    MappingError::new(
        MappingErrorKind::NotAReference,
        property.name,
        "property carries no reference configuration",
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::SourceOrder;
    use asupersync::runtime::RuntimeBuilder;
    use bson::bson;
    use docref_core::{BindingErrorKind, EntityInfo, EntityRegistry, FetchError, ManualReference};
    use std::cell::Cell;

    fn registry() -> Arc<dyn MappingContext> {
        let mut registry = EntityRegistry::new();
        registry
            .register_info(EntityInfo::new("Book", "books"))
            .register_info(EntityInfo::new("Publisher", "publishers").id_field("code"))
            .register_info(EntityInfo::new("Draft", ""));
        Arc::new(registry)
    }

    fn names(_: &PropertyDescriptor, doc: Document) -> Result<String> {
        Ok(doc.get_str("name").unwrap_or_default().to_string())
    }

    fn reader() -> ReferenceReader<fn(&PropertyDescriptor, Document) -> Result<String>> {
        ReferenceReader::new(registry(), names as fn(&PropertyDescriptor, Document) -> Result<String>)
    }

    fn by_id(name: &'static str) -> PropertyDescriptor {
        PropertyDescriptor::new(name, "Book").manual(ManualReference::new("{ '_id' : '?#{#target}' }"))
    }

    #[test]
    fn test_scalar_filter_and_default_collection() {
        let property = by_id("book");
        let source = Bson::String("b-1".into());
        let reader = reader();

        assert_eq!(reader.compute_filter(&property, &source).unwrap(), doc! { "_id": "b-1" });
        let ctx = reader.compute_context(&property, &source).unwrap();
        assert_eq!(ctx.collection(), "books");
        assert_eq!(ctx.database(), None);
    }

    #[test]
    fn test_collection_filter_is_or_in_source_order() {
        let property = by_id("books").collection_like();
        let filter = reader()
            .compute_filter(&property, &bson!(["b-2", "b-1"]))
            .unwrap();
        assert_eq!(filter, doc! { "$or": [{ "_id": "b-2" }, { "_id": "b-1" }] });
    }

    #[test]
    fn test_document_context_uses_collection_field_and_db() {
        let property = PropertyDescriptor::new("book", "Book")
            .manual(ManualReference::new("{ '_id' : '?#{id}' }"));
        let source = bson!({ "id": "b-1", "collection": "archived_books", "db": "archive" });
        let reader = reader();

        assert_eq!(reader.compute_filter(&property, &source).unwrap(), doc! { "_id": "b-1" });
        let ctx = reader.compute_context(&property, &source).unwrap();
        assert_eq!(ctx.collection(), "archived_books");
        assert_eq!(ctx.database(), Some("archive"));

        let ctx = reader
            .compute_context(&property, &bson!({ "id": "b-1", "db": "archive" }))
            .unwrap();
        assert_eq!(ctx.collection(), "books");
        assert_eq!(ctx.database(), Some("archive"));
    }

    #[test]
    fn test_collection_expression_forms() {
        let source = bson!({ "id": "b-1", "kind": "novels" });
        let reader = reader();

        for expression in ["?#{kind}", "#target.kind", "kind", "{ 'target-collection' : ?#{kind} }"] {
            let property = PropertyDescriptor::new("book", "Book")
                .manual(ManualReference::by_id().collection(expression));
            let ctx = reader.compute_context(&property, &source).unwrap();
            assert_eq!(ctx.collection(), "novels", "{expression}");
        }

        for (expression, expected) in [
            ("archived-?#{kind}", "archived-novels"),
            ("?#{kind}-archive", "novels-archive"),
        ] {
            let property = PropertyDescriptor::new("book", "Book")
                .manual(ManualReference::by_id().collection(expression));
            let ctx = reader.compute_context(&property, &source).unwrap();
            assert_eq!(ctx.collection(), expected, "{expression}");
        }

        let property = PropertyDescriptor::new("book", "Book")
            .manual(ManualReference::by_id().collection("?#{missing}"));
        let ctx = reader.compute_context(&property, &source).unwrap();
        assert_eq!(ctx.collection(), "books");
    }

    #[test]
    fn test_native_pointer_context_and_filter() {
        let property = PropertyDescriptor::new("publisher", "Publisher").native(false);
        let source = bson!({ "$ref": "imprints", "$id": "p-9", "$db": "catalog" });
        let reader = reader();

        assert_eq!(reader.compute_filter(&property, &source).unwrap(), doc! { "code": "p-9" });
        let ctx = reader.compute_context(&property, &source).unwrap();
        assert_eq!(ctx.collection(), "imprints");
        assert_eq!(ctx.database(), Some("catalog"));
    }

    #[test]
    fn test_entity_without_collection_is_a_mapping_error() {
        let property = PropertyDescriptor::new("draft", "Draft").manual(ManualReference::by_id());
        let err = reader()
            .compute_context(&property, &Bson::String("d-1".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Mapping(ref e) if e.kind == MappingErrorKind::MissingCollection
        ));
        assert!(err.is_configuration_error());
        assert_eq!(err.property(), Some("draft"));
    }

    #[test]
    fn test_unknown_target_type() {
        let property = PropertyDescriptor::new("ghost", "Ghost").manual(ManualReference::by_id());
        let err = reader()
            .compute_context(&property, &Bson::Int32(1))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTargetType(ref e) if e.type_name == "Ghost"));
    }

    #[test]
    fn test_not_a_reference() {
        let property = PropertyDescriptor::new("title", "Book");
        let err = reader()
            .read_reference(&property, &Bson::Int32(1), |_, _| Ok(Vec::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Mapping(ref e) if e.kind == MappingErrorKind::NotAReference
        ));
    }

    #[test]
    fn test_read_single_takes_first() {
        let property = by_id("book");
        let calls = Cell::new(0);
        let resolved = reader()
            .read_reference(&property, &Bson::String("b-1".into()), |ctx, filter| {
                calls.set(calls.get() + 1);
                assert_eq!(ctx.collection(), "books");
                assert_eq!(filter, &doc! { "_id": "b-1" });
                Ok(vec![doc! { "name": "first" }, doc! { "name": "second" }])
            })
            .unwrap();
        assert_eq!(resolved, Resolved::Single(Some("first".to_string())));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_null_and_empty_sources_skip_lookup() {
        let reader = reader();
        let single = by_id("book");
        let many = by_id("books").collection_like();

        let fail = |_: &ReferenceContext, _: &Document| -> Result<Vec<Document>> {
            Err(Error::Custom("lookup must not run".to_string()))
        };
        assert_eq!(
            reader.read_reference(&single, &Bson::Null, fail).unwrap(),
            Resolved::Single(None)
        );
        assert_eq!(
            reader.read_reference(&many, &bson!([]), fail).unwrap(),
            Resolved::Many(Vec::new())
        );
    }

    #[test]
    fn test_loader_and_binding_errors_propagate() {
        let reader = reader();
        let property = by_id("book");
        let err = reader
            .read_reference(&property, &Bson::Int32(1), |_, _| {
                Err(FetchError::new("connection reset").into())
            })
            .unwrap_err();
        assert!(err.is_fetch_error());

        let broken = PropertyDescriptor::new("book", "Book").manual(ManualReference::new("{ '_id' : ?3 }"));
        let err = reader
            .read_reference(&broken, &Bson::Int32(1), |_, _| Ok(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::Binding(ref e) if e.kind == BindingErrorKind::Positional));
    }

    #[test]
    fn test_order_function_restores_source_order() {
        let property = by_id("books").collection_like();
        let source = bson!(["b-2", "b-1"]);
        let loader_order = |_: &ReferenceContext, _: &Document| {
            Ok(vec![
                doc! { "_id": "b-1", "name": "one" },
                doc! { "_id": "b-2", "name": "two" },
            ])
        };

        let unordered = reader().read_reference(&property, &source, loader_order).unwrap();
        assert_eq!(
            unordered,
            Resolved::Many(vec!["one".to_string(), "two".to_string()])
        );

        let ordered = reader()
            .order_function(Arc::new(SourceOrder))
            .read_reference(&property, &source, loader_order)
            .unwrap();
        assert_eq!(ordered, Resolved::Many(vec!["two".to_string(), "one".to_string()]));
    }

    struct NoLoader;

    impl AsyncReferenceLoader for NoLoader {
        fn fetch_one(
            &self,
            _cx: &Cx,
            filter: &Document,
            _context: &ReferenceContext,
        ) -> impl Future<Output = Outcome<Option<Document>, Error>> + Send {
            let found = filter.get_str("_id").ok().map(|id| doc! { "name": id });
            async move { Outcome::Ok(found) }
        }

        fn fetch_many(
            &self,
            _cx: &Cx,
            _filter: &Document,
            _context: &ReferenceContext,
        ) -> impl Future<Output = Outcome<Vec<Document>, Error>> + Send {
            async { Outcome::Err(Error::Custom("bulk unsupported".to_string())) }
        }
    }

    #[test]
    fn test_read_reference_async() {
        let rt = RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        let cx = Cx::for_testing();

        rt.block_on(async {
            let reader = reader();
            let outcome = reader
                .read_reference_async(&cx, &by_id("book"), &Bson::String("b-7".into()), &NoLoader)
                .await;
            assert!(matches!(
                outcome,
                Outcome::Ok(Resolved::Single(Some(ref name))) if name == "b-7"
            ));

            let many = by_id("books").collection_like();
            let outcome = reader
                .read_reference_async(&cx, &many, &bson!(["b-1"]), &NoLoader)
                .await;
            assert!(matches!(outcome, Outcome::Err(Error::Custom(_))));
        });
    }
}
