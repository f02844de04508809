//! Ordering of bulk lookup results.
//!
//! A collection reference is fetched with one `$or` query, and stores are free
//! to return matches in any order. Results are kept in loader order unless an
//! [`OrderFunction`] is installed on the reader.

use bson::{Bson, Document};

/// Reorders the documents returned for a collection reference.
pub trait OrderFunction: Send + Sync {
    /// Reorder `results`, given the per-element filters in source order.
    fn order(&self, filters: &[Document], results: Vec<Document>) -> Vec<Document>;
}

impl<F> OrderFunction for F
where
    F: Fn(&[Document], Vec<Document>) -> Vec<Document> + Send + Sync,
{
    fn order(&self, filters: &[Document], results: Vec<Document>) -> Vec<Document> {
        self(filters, results)
    }
}

/// Restores the order of the stored references.
///
/// Each result is placed at the position of the first element filter it
/// matches. Results matching no filter keep their relative order at the end.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceOrder;

impl OrderFunction for SourceOrder {
    fn order(&self, filters: &[Document], results: Vec<Document>) -> Vec<Document> {
        let mut ranked: Vec<(usize, Document)> = results
            .into_iter()
            .map(|doc| {
                let rank = filters
                    .iter()
                    .position(|filter| matches_filter(filter, &doc))
                    .unwrap_or(filters.len());
                (rank, doc)
            })
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        ranked.into_iter().map(|(_, doc)| doc).collect()
    }
}

/// Check whether a document satisfies an equality filter.
///
/// Only plain field equality is understood. Dotted keys address nested
/// fields; operator keys (`$...`) never match.
pub fn matches_filter(filter: &Document, document: &Document) -> bool {
    filter.iter().all(|(key, expected)| {
        !key.starts_with('$') && lookup_path(document, key).is_some_and(|actual| actual == expected)
    })
}

fn lookup_path<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    if let Some(value) = document.get(path) {
        return Some(value);
    }
    let (head, rest) = path.split_once('.')?;
    match document.get(head)? {
        Bson::Document(inner) => lookup_path(inner, rest),
        _ => None,
    }
}
