//! Document store trait and related types.
//!
//! The marketplace persists every entity in a managed collection-of-documents
//! database. This module defines the narrow contract the rest of the system
//! relies on:
//!
//! - `get` / `set` / `update` by collection + key
//! - `add` a document and let the store assign its key
//! - `query` a collection, optionally filtered by equality on one field
//!
//! # Implementations
//!
//! - `InMemoryDocumentStore` (in `eventhub-testing`): fast, deterministic testing
//!   and the demo binary
//!
//! # Example
//!
//! ```no_run
//! use eventhub_core::document_store::{DocumentStore, DocumentStoreError, Query};
//! use serde_json::json;
//!
//! async fn example<S: DocumentStore>(store: &S) -> Result<(), DocumentStoreError> {
//!     let key = store
//!         .add("eventPackages", json!({ "title": "Gala Dinner" }).as_object().cloned().unwrap_or_default())
//!         .await?;
//!
//!     let organizers = store
//!         .query("users", Query::field_eq("role", "organizer"))
//!         .await?;
//!
//!     let package = store.get("eventPackages", &key).await?;
//!     assert!(package.is_some());
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Field map of a single document.
pub type Document = Map<String, Value>;

/// Boxed future returned by [`DocumentStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DocumentStoreError>> + Send + 'a>>;

/// Name of the field that carries the document key once decoded.
pub const ID_FIELD: &str = "id";

/// Errors that can occur during document store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentStoreError {
    /// `update` targeted a key that does not exist.
    #[error("Document not found: {collection}/{key}")]
    NotFound {
        /// Collection that was searched.
        collection: String,
        /// Key that was missing.
        key: String,
    },

    /// The backend could not be reached or rejected the request.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// A document could not be converted to or from its typed form.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Filter applied by [`DocumentStore::query`].
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Every document in the collection.
    All,

    /// Documents whose `field` equals `value`.
    FieldEquals {
        /// Field name.
        field: String,
        /// Expected value.
        value: Value,
    },
}

impl Query {
    /// Equality filter on a single field.
    #[must_use]
    pub fn field_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether a document satisfies this filter.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::All => true,
            Self::FieldEquals { field, value } => document.get(field) == Some(value),
        }
    }
}

/// A document together with the key it is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Key within the collection.
    pub key: String,
    /// Document fields (the key is not repeated here).
    pub data: Document,
}

impl StoredDocument {
    /// Creates a new `StoredDocument`
    #[must_use]
    pub const fn new(key: String, data: Document) -> Self {
        Self { key, data }
    }

    /// Decode into a typed record, exposing the key as the `id` field.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Serialization`] if the fields do not
    /// match the target type.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, DocumentStoreError> {
        let mut data = self.data;
        data.insert(ID_FIELD.to_string(), Value::String(self.key));
        serde_json::from_value(Value::Object(data))
            .map_err(|e| DocumentStoreError::Serialization(e.to_string()))
    }
}

/// Encode a typed record into document fields, dropping its `id` field.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Serialization`] if the value does not
/// serialize to a JSON object.
pub fn encode<T: Serialize>(value: &T) -> Result<Document, DocumentStoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(mut map)) => {
            map.remove(ID_FIELD);
            Ok(map)
        },
        Ok(other) => Err(DocumentStoreError::Serialization(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(DocumentStoreError::Serialization(e.to_string())),
    }
}

/// Document store abstraction.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so they can be shared as
/// `Arc<dyn DocumentStore>` between the workflow effects and the lookups.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures instead of using `async fn` so the trait can
/// be used as a trait object inside effects.
pub trait DocumentStore: Send + Sync {
    /// Fetch one document. A missing key is `Ok(None)`, not an error.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: backend failure
    fn get<'a>(&'a self, collection: &'a str, key: &'a str) -> StoreFuture<'a, Option<Document>>;

    /// Create or replace the document at `key`.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: backend failure
    fn set<'a>(&'a self, collection: &'a str, key: &'a str, document: Document) -> StoreFuture<'a, ()>;

    /// Merge `partial` into the existing document at `key`.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no document at `key`
    /// - `Unavailable`: backend failure
    fn update<'a>(&'a self, collection: &'a str, key: &'a str, partial: Document) -> StoreFuture<'a, ()>;

    /// Insert a new document and return the key the store assigned to it.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: backend failure
    fn add<'a>(&'a self, collection: &'a str, document: Document) -> StoreFuture<'a, String>;

    /// Return the documents of `collection` matching `query`.
    ///
    /// Order is stable for a given snapshot of the collection; callers sort
    /// as needed.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: backend failure
    fn query<'a>(&'a self, collection: &'a str, query: Query) -> StoreFuture<'a, Vec<StoredDocument>>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Package {
        id: String,
        title: String,
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn field_eq_matches_only_equal_values() {
        let query = Query::field_eq("role", "organizer");
        assert!(query.matches(&doc(json!({ "role": "organizer" }))));
        assert!(!query.matches(&doc(json!({ "role": "requester" }))));
        assert!(!query.matches(&doc(json!({ "name": "x" }))));
        assert!(Query::All.matches(&Document::new()));
    }

    #[test]
    fn decode_exposes_key_as_id() {
        let stored = StoredDocument::new("p-1".to_string(), doc(json!({ "title": "Gala" })));
        let package: Package = stored.decode().unwrap();
        assert_eq!(package.id, "p-1");
        assert_eq!(package.title, "Gala");
    }

    #[test]
    fn encode_drops_id_field() {
        let package = Package {
            id: "p-1".to_string(),
            title: "Gala".to_string(),
        };
        let fields = encode(&package).unwrap();
        assert!(!fields.contains_key(ID_FIELD));
        assert_eq!(fields.get("title"), Some(&json!("Gala")));
    }

    #[test]
    fn encode_rejects_non_objects() {
        let result = encode(&42);
        assert!(matches!(result, Err(DocumentStoreError::Serialization(_))));
    }

    #[test]
    fn not_found_error_display() {
        let error = DocumentStoreError::NotFound {
            collection: "bookingRequests".to_string(),
            key: "missing".to_string(),
        };
        assert_eq!(format!("{error}"), "Document not found: bookingRequests/missing");
    }
}
