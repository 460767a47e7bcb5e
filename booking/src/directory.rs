//! Organizer and requester profiles over the `users` collection.

use crate::metrics::DocumentStoreMetrics;
use crate::types::{OrganizerDetails, Role, RoleDetails, USERS, UserId, UserProfile};
use eventhub_core::document_store::{Document, DocumentStore, DocumentStoreError, Query, StoredDocument, encode};
use eventhub_core::environment::Clock;
use std::sync::Arc;
use std::time::Instant;

/// Key of the organizer seeded into an empty directory.
pub const DEMO_ORGANIZER_ID: &str = "demo-organizer-id";

/// Profile storage and the organizer directory.
#[derive(Clone)]
pub struct UserDirectory {
    documents: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    seed_demo_organizer: bool,
}

impl UserDirectory {
    /// Directory over `documents`; `clock` stamps seeded profiles.
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, seed_demo_organizer: bool) -> Self {
        Self {
            documents,
            clock,
            seed_demo_organizer,
        }
    }

    /// Fetch a profile.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::Unavailable`]: the store failed
    /// - [`DocumentStoreError::Serialization`]: the stored profile is malformed
    pub async fn load_profile(&self, id: &UserId) -> Result<Option<UserProfile>, DocumentStoreError> {
        let started = Instant::now();
        let result = self.documents.get(USERS, id.as_str()).await;
        DocumentStoreMetrics::record_operation(USERS, "get", started.elapsed());

        result?
            .map(|document| StoredDocument::new(id.as_str().to_string(), document).decode())
            .transpose()
    }

    /// A profile, or `None` on a miss or a failure.
    pub async fn profile(&self, id: &UserId) -> Option<UserProfile> {
        self.load_profile(id).await.unwrap_or_else(|e| {
            tracing::warn!(user_id = %id, error = %e, "Profile lookup failed");
            None
        })
    }

    /// A profile, only if it belongs to an organizer.
    pub async fn organizer(&self, id: &UserId) -> Option<UserProfile> {
        if id.is_blank() {
            tracing::warn!("Organizer lookup with a blank id");
            return None;
        }
        self.profile(id)
            .await
            .filter(|profile| profile.role() == Role::Organizer)
    }

    /// Every organizer, best rated first.
    ///
    /// An empty directory is seeded with a demo organizer first, when
    /// seeding is enabled.
    #[tracing::instrument(skip(self))]
    pub async fn organizers(&self) -> Vec<UserProfile> {
        match self.try_organizers().await {
            Ok(organizers) => organizers,
            Err(e) => {
                tracing::warn!(error = %e, "Organizer directory unavailable");
                Vec::new()
            },
        }
    }

    async fn try_organizers(&self) -> Result<Vec<UserProfile>, DocumentStoreError> {
        let mut stored = self.query_organizers().await?;
        if stored.is_empty() && self.seed_demo_organizer {
            self.seed_demo().await?;
            stored = self.query_organizers().await?;
        }

        let mut organizers: Vec<UserProfile> = stored
            .into_iter()
            .filter_map(|doc| {
                doc.decode()
                    .map_err(|e| tracing::warn!(error = %e, "Skipping malformed profile"))
                    .ok()
            })
            .collect();
        organizers.sort_by(|a, b| b.rating().total_cmp(&a.rating()));
        Ok(organizers)
    }

    async fn query_organizers(&self) -> Result<Vec<StoredDocument>, DocumentStoreError> {
        let started = Instant::now();
        let result = self
            .documents
            .query(USERS, Query::field_eq("role", Role::Organizer.as_str()))
            .await;
        DocumentStoreMetrics::record_operation(USERS, "query", started.elapsed());
        result
    }

    async fn seed_demo(&self) -> Result<(), DocumentStoreError> {
        let demo = UserProfile {
            id: UserId::from(DEMO_ORGANIZER_ID),
            email: Some("eventpro@example.com".to_string()),
            created_at: Some(self.clock.now()),
            details: RoleDetails::Organizer(OrganizerDetails {
                username: "EventPro".to_string(),
                organization_name: "EventPro Planning Services".to_string(),
                mobile_number: "555-123-4567".to_string(),
                rating: 4.8,
                review_count: 24,
            }),
        };
        self.documents
            .set(USERS, DEMO_ORGANIZER_ID, encode(&demo)?)
            .await?;
        tracing::info!("Seeded demo organizer");
        Ok(())
    }

    /// Write a new profile document at `profile.id`.
    ///
    /// # Errors
    ///
    /// Returns the store error if the write fails.
    pub async fn create_profile(&self, profile: &UserProfile) -> Result<(), DocumentStoreError> {
        let started = Instant::now();
        let result = self
            .documents
            .set(USERS, profile.id.as_str(), encode(profile)?)
            .await;
        DocumentStoreMetrics::record_operation(USERS, "set", started.elapsed());
        result
    }

    /// Merge `fields` into the profile at `id` and return the result.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::NotFound`]: no profile at `id`
    /// - [`DocumentStoreError::Serialization`]: the merge broke the profile shape
    /// - [`DocumentStoreError::Unavailable`]: the store failed
    pub async fn merge_profile(&self, id: &UserId, fields: Document) -> Result<UserProfile, DocumentStoreError> {
        let started = Instant::now();
        let result = self.documents.update(USERS, id.as_str(), fields).await;
        DocumentStoreMetrics::record_operation(USERS, "update", started.elapsed());
        result?;

        self.load_profile(id).await?.ok_or_else(|| DocumentStoreError::NotFound {
            collection: USERS.to_string(),
            key: id.to_string(),
        })
    }
}
