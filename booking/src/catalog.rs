//! Event package lookups over the `eventPackages` collection.
//!
//! Lookups are display helpers: a miss or an upstream failure is logged and
//! comes back as `None` or an empty list.

use crate::metrics::DocumentStoreMetrics;
use crate::types::{EVENT_PACKAGES, EventPackage, PackageDraft, PackageId, Role, USERS, UserId};
use eventhub_core::document_store::{DocumentStore, DocumentStoreError, Query, StoredDocument, encode};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Title shown when a package cannot be resolved.
pub const UNKNOWN_PACKAGE: &str = "Unknown Package";

/// Read access to published packages, plus publishing.
#[derive(Clone)]
pub struct EventCatalog {
    documents: Arc<dyn DocumentStore>,
}

impl EventCatalog {
    /// Catalog over `documents`.
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    /// One package.
    #[tracing::instrument(skip(self), fields(package_id = %id))]
    pub async fn package(&self, id: &PackageId) -> Option<EventPackage> {
        let started = Instant::now();
        let result = self.documents.get(EVENT_PACKAGES, id.as_str()).await;
        DocumentStoreMetrics::record_operation(EVENT_PACKAGES, "get", started.elapsed());

        match result {
            Ok(Some(document)) => StoredDocument::new(id.as_str().to_string(), document)
                .decode()
                .map_err(|e| tracing::warn!(error = %e, "Skipping malformed package"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Package lookup failed");
                None
            },
        }
    }

    /// Packages published by `organizer`.
    pub async fn packages_by_organizer(&self, organizer: &UserId) -> Vec<EventPackage> {
        self.query(Query::field_eq("organizerId", organizer.as_str())).await
    }

    /// Every package, keeping only the first of several sharing a title.
    pub async fn all_packages(&self) -> Vec<EventPackage> {
        let mut seen = HashSet::new();
        self.query(Query::All)
            .await
            .into_iter()
            .filter(|package| seen.insert(package.title.clone()))
            .collect()
    }

    /// Packages whose title contains `term`, ignoring case.
    ///
    /// A blank term matches everything.
    pub async fn search(&self, term: &str) -> Vec<EventPackage> {
        let packages = self.all_packages().await;
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return packages;
        }

        packages
            .into_iter()
            .filter(|package| package.title.to_lowercase().contains(&needle))
            .collect()
    }

    /// Title of a package, or [`UNKNOWN_PACKAGE`].
    pub async fn package_title(&self, id: &PackageId) -> String {
        self.package(id)
            .await
            .map_or_else(|| UNKNOWN_PACKAGE.to_string(), |package| package.title)
    }

    /// Publish a package for `organizer`.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::NotFound`]: `organizer` is not an organizer
    /// - [`DocumentStoreError::Unavailable`]: the store failed
    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_package(
        &self,
        organizer: &UserId,
        draft: PackageDraft,
    ) -> Result<EventPackage, DocumentStoreError> {
        let owner = self.documents.get(USERS, organizer.as_str()).await?;
        let is_organizer = owner
            .as_ref()
            .and_then(|doc| doc.get("role"))
            .and_then(Value::as_str)
            == Some(Role::Organizer.as_str());
        if !is_organizer {
            return Err(DocumentStoreError::NotFound {
                collection: USERS.to_string(),
                key: organizer.to_string(),
            });
        }

        let mut fields = encode(&draft)?;
        fields.insert("organizerId".to_string(), Value::String(organizer.to_string()));

        let started = Instant::now();
        let key = self.documents.add(EVENT_PACKAGES, fields).await?;
        DocumentStoreMetrics::record_operation(EVENT_PACKAGES, "add", started.elapsed());
        tracing::info!(package_id = %key, "Package published");

        Ok(EventPackage {
            id: key.into(),
            organizer_id: organizer.clone(),
            title: draft.title,
            price: draft.price,
            location: draft.location,
            description: draft.description,
            image_url: draft.image_url,
        })
    }

    async fn query(&self, query: Query) -> Vec<EventPackage> {
        let started = Instant::now();
        let result = self.documents.query(EVENT_PACKAGES, query).await;
        DocumentStoreMetrics::record_operation(EVENT_PACKAGES, "query", started.elapsed());

        match result {
            Ok(documents) => documents
                .into_iter()
                .filter_map(|doc| {
                    doc.decode()
                        .map_err(|e| tracing::warn!(error = %e, "Skipping malformed package"))
                        .ok()
                })
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Package query failed");
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use eventhub_testing::InMemoryDocumentStore;
    use serde_json::json;

    fn seeded() -> (InMemoryDocumentStore, EventCatalog) {
        let store = InMemoryDocumentStore::new();
        store.insert(USERS, "o1", json!({ "role": "organizer", "username": "Org", "organizationName": "Org Ltd", "mobileNumber": "1" }));
        store.insert(EVENT_PACKAGES, "p1", json!({ "organizerId": "o1", "title": "Gala Dinner", "price": 100.0 }));
        store.insert(EVENT_PACKAGES, "p2", json!({ "organizerId": "o1", "title": "Garden Party" }));
        store.insert(EVENT_PACKAGES, "p3", json!({ "organizerId": "o2", "title": "Gala Dinner" }));
        let catalog = EventCatalog::new(Arc::new(store.clone()));
        (store, catalog)
    }

    #[tokio::test]
    async fn title_falls_back_to_sentinel() {
        let (_, catalog) = seeded();
        assert_eq!(catalog.package_title(&PackageId::from("p1")).await, "Gala Dinner");
        assert_eq!(catalog.package_title(&PackageId::from("nope")).await, UNKNOWN_PACKAGE);
    }

    #[tokio::test]
    async fn all_packages_keeps_first_of_each_title() {
        let (_, catalog) = seeded();
        let packages = catalog.all_packages().await;
        let ids: Vec<&str> = packages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn search_ignores_case_and_blank_matches_all() {
        let (_, catalog) = seeded();
        let hits = catalog.search("gArDeN").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Garden Party");
        assert_eq!(catalog.search("  ").await.len(), 2);
        assert!(catalog.search("wedding").await.is_empty());
    }

    #[tokio::test]
    async fn packages_by_organizer_filters_on_owner() {
        let (_, catalog) = seeded();
        assert_eq!(catalog.packages_by_organizer(&UserId::from("o1")).await.len(), 2);
        assert!(catalog.packages_by_organizer(&UserId::from("ghost")).await.is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_degrades_to_empty() {
        let (store, catalog) = seeded();
        store.set_unavailable(true);
        assert!(catalog.all_packages().await.is_empty());
        assert_eq!(catalog.package_title(&PackageId::from("p1")).await, UNKNOWN_PACKAGE);
    }

    #[tokio::test]
    async fn create_package_requires_an_organizer() {
        let (store, catalog) = seeded();
        let draft = PackageDraft {
            title: "Wedding".to_string(),
            price: 2500.0,
            location: "Lakeside".to_string(),
            description: "Full service".to_string(),
            image_url: String::new(),
        };

        let created = catalog.create_package(&UserId::from("o1"), draft.clone()).await.unwrap();
        assert_eq!(created.organizer_id.as_str(), "o1");
        assert_eq!(store.len(EVENT_PACKAGES), 4);

        let refused = catalog.create_package(&UserId::from("nobody"), draft).await;
        assert!(matches!(refused, Err(DocumentStoreError::NotFound { .. })));
    }
}
