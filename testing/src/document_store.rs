//! In-memory document store
//!
//! `HashMap`-backed implementation of [`DocumentStore`] with knobs for the
//! failure modes the workflow has to survive:
//!
//! - [`InMemoryDocumentStore::set_unavailable`]: every call fails
//! - [`InMemoryDocumentStore::fail_next_writes`]: the next N writes fail
//! - [`InMemoryDocumentStore::fail_next_reads`]: the next N reads fail
//! - [`InMemoryDocumentStore::set_latency`]: every call sleeps first
//! - [`InMemoryDocumentStore::delay_query_results`]: queries read at once but
//!   answer late, so writes can land in between

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use eventhub_core::document_store::{
    Document, DocumentStore, DocumentStoreError, Query, StoreFuture, StoredDocument,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

type Collection = BTreeMap<String, Document>;

/// In-memory document store for tests and the demo binary.
///
/// Keys assigned by [`DocumentStore::add`] are random UUIDs. Query results
/// come back in key order.
///
/// # Example
///
/// ```
/// use eventhub_testing::InMemoryDocumentStore;
/// use eventhub_core::document_store::{DocumentStore, Query};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let store = InMemoryDocumentStore::new();
/// store.insert("users", "o1", json!({ "role": "organizer" }));
///
/// let organizers = store.query("users", Query::field_eq("role", "organizer")).await.unwrap();
/// assert_eq!(organizers.len(), 1);
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
    unavailable: Arc<AtomicBool>,
    failing_writes: Arc<AtomicUsize>,
    failing_reads: Arc<AtomicUsize>,
    latency_ms: Arc<AtomicU64>,
    query_delay_ms: Arc<AtomicU64>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryDocumentStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document directly, bypassing failure injection.
    ///
    /// `value` must be a JSON object; anything else is stored as an empty document.
    pub fn insert(&self, collection: &str, key: &str, value: serde_json::Value) {
        let document = match value {
            serde_json::Value::Object(map) => map,
            _ => Document::new(),
        };
        self.collections
            .write()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), document);
    }

    /// Read a document directly, bypassing failure injection.
    #[must_use]
    pub fn document(&self, collection: &str, key: &str) -> Option<Document> {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .and_then(|docs| docs.get(key).cloned())
    }

    /// Number of documents in a collection.
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Whether a collection holds no documents.
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Number of write calls (`set`, `update`, `add`) that reached the store,
    /// including injected failures.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every call fail with `Unavailable` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next `count` write calls.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Fail the next `count` read calls (`get`, `query`).
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(u64::try_from(latency.as_millis()).unwrap_or(u64::MAX), Ordering::SeqCst);
    }

    /// Hold every query result for `delay` after the documents were read.
    pub fn delay_query_results(&self, delay: Duration) {
        self.query_delay_ms
            .store(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), Ordering::SeqCst);
    }

    async fn enter(&self, write: bool) -> Result<(), DocumentStoreError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if write {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DocumentStoreError::Unavailable("store offline".to_string()));
        }

        let budget = if write { &self.failing_writes } else { &self.failing_reads };
        if budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(DocumentStoreError::Unavailable("injected failure".to_string()));
        }

        Ok(())
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get<'a>(&'a self, collection: &'a str, key: &'a str) -> StoreFuture<'a, Option<Document>> {
        Box::pin(async move {
            self.enter(false).await?;
            Ok(self.document(collection, key))
        })
    }

    fn set<'a>(&'a self, collection: &'a str, key: &'a str, document: Document) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.enter(true).await?;
            self.collections
                .write()
                .unwrap()
                .entry(collection.to_string())
                .or_default()
                .insert(key.to_string(), document);
            Ok(())
        })
    }

    fn update<'a>(&'a self, collection: &'a str, key: &'a str, partial: Document) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.enter(true).await?;
            let mut collections = self.collections.write().unwrap();
            let existing = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(key))
                .ok_or_else(|| DocumentStoreError::NotFound {
                    collection: collection.to_string(),
                    key: key.to_string(),
                })?;
            existing.extend(partial);
            Ok(())
        })
    }

    fn add<'a>(&'a self, collection: &'a str, document: Document) -> StoreFuture<'a, String> {
        Box::pin(async move {
            self.enter(true).await?;
            let key = uuid::Uuid::new_v4().to_string();
            self.collections
                .write()
                .unwrap()
                .entry(collection.to_string())
                .or_default()
                .insert(key.clone(), document);
            tracing::trace!(collection, key = %key, "Document added");
            Ok(key)
        })
    }

    fn query<'a>(&'a self, collection: &'a str, query: Query) -> StoreFuture<'a, Vec<StoredDocument>> {
        Box::pin(async move {
            self.enter(false).await?;
            let found: Vec<StoredDocument> = self
                .collections
                .read()
                .unwrap()
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|(_, doc)| query.matches(doc))
                        .map(|(key, doc)| StoredDocument::new(key.clone(), doc.clone()))
                        .collect()
                })
                .unwrap_or_default();

            let delay = self.query_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Ok(found)
        })
    }
}
