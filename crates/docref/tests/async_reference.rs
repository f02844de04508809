mod common;

use asupersync::runtime::RuntimeBuilder;

use common::{InMemoryStore, ObjectRefOfDocument, SimpleObjectRef, mapping, unwrap_outcome};
use docref::prelude::*;

const SIMPLE_VALUE_REF: PropertyDescriptor =
    PropertyDescriptor::to::<SimpleObjectRef>("simpleValueRef").manual(ManualReference::by_id());

const EMBEDDED_COLLECTION_REFS: PropertyDescriptor =
    PropertyDescriptor::to::<ObjectRefOfDocument>("objectValueRefWithEmbeddedCollectionName")
        .collection_like()
        .manual(ManualReference::new("{ '_id' : '?#{id}' }").collection("?#{collection}"));

#[test]
fn async_read_of_single_and_collection_references() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let store = InMemoryStore::new();
        store.insert("simple-object-ref", doc! { "_id": "ref-1", "value": "first" });
        store.insert("archived", doc! { "_id": "a-1", "value": "one" });
        store.insert("archived", doc! { "_id": "a-2", "value": "two" });

        let simple_reader = ReferenceReader::new(mapping(), SerdeConverter::<SimpleObjectRef>::new());
        let single = unwrap_outcome(
            simple_reader
                .read_reference_async(&cx, &SIMPLE_VALUE_REF, &Bson::String("ref-1".into()), &store)
                .await,
        );
        assert_eq!(single.as_single().map(|r| r.value.as_str()), Some("first"));

        let document_reader = ReferenceReader::new(mapping(), SerdeConverter::<ObjectRefOfDocument>::new());
        let stored = bson!([
            { "id": "a-2", "collection": "archived" },
            { "id": "a-1", "collection": "archived" }
        ]);
        let many = unwrap_outcome(
            document_reader
                .read_reference_async(&cx, &EMBEDDED_COLLECTION_REFS, &stored, &store)
                .await,
        );
        assert_eq!(many.len(), 2);

        let missing = unwrap_outcome(
            simple_reader
                .read_reference_async(&cx, &SIMPLE_VALUE_REF, &Bson::Null, &store)
                .await,
        );
        assert_eq!(missing, Resolved::Single(None));
        assert_eq!(store.fetch_count(), 2);
    });
}

#[test]
fn async_read_reports_binding_errors() {
    const BROKEN: PropertyDescriptor =
        PropertyDescriptor::to::<SimpleObjectRef>("broken").manual(ManualReference::new("{ '_id' : ?3 }"));

    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let store = InMemoryStore::new();
        let reader = ReferenceReader::new(mapping(), SerdeConverter::<SimpleObjectRef>::new());

        match reader
            .read_reference_async(&cx, &BROKEN, &Bson::String("ref-1".into()), &store)
            .await
        {
            Outcome::Err(e) => assert!(e.is_configuration_error()),
            _ => panic!("expected a binding error"),
        }
        assert_eq!(store.fetch_count(), 0);
    });
}
