//! Application state: every component, built once and passed by handle.

use crate::catalog::EventCatalog;
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::directory::UserDirectory;
use crate::error::BookingError;
use crate::session::AuthSession;
use crate::types::{BookingRequest, PackageId, UserId};
use crate::workflow::{BookingEnvironment, BookingService};
use eventhub_core::document_store::DocumentStore;
use eventhub_core::environment::Clock;
use eventhub_core::identity::IdentityService;
use eventhub_core::notification::Notifier;
use eventhub_runtime::StoreError;
use eventhub_runtime::retry::RetryPolicy;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// External services the application runs against.
#[derive(Clone)]
pub struct Backends {
    /// Time source
    pub clock: Arc<dyn Clock>,
    /// Persistence
    pub documents: Arc<dyn DocumentStore>,
    /// Credentials
    pub identity: Arc<dyn IdentityService>,
    /// Email delivery
    pub notifier: Arc<dyn Notifier>,
}

/// The running application.
#[derive(Clone)]
pub struct App {
    /// Settings the app was built with
    pub config: Config,
    /// Booking workflow
    pub bookings: BookingService,
    /// Package lookups and publishing
    pub catalog: EventCatalog,
    /// Profiles and the organizer directory
    pub directory: UserDirectory,
    /// Current user
    pub session: AuthSession,
    clock: Arc<dyn Clock>,
}

impl App {
    /// Wire every component over `backends`.
    #[must_use]
    pub fn new(config: Config, backends: Backends) -> Self {
        let refresh_policy = RetryPolicy::builder()
            .max_retries(config.workflow.refresh_max_retries)
            .initial_delay(Duration::from_millis(config.workflow.refresh_initial_delay_ms))
            .build();

        let env = BookingEnvironment::new(
            Arc::clone(&backends.clock),
            Arc::clone(&backends.documents),
            Arc::clone(&backends.notifier),
        )
        .with_notification_template(config.notification.template_id.clone())
        .with_refresh_policy(refresh_policy);

        let bookings = BookingService::new(
            env,
            config.workflow.response_timeout(),
            config.workflow.broadcast_capacity,
        );
        let catalog = EventCatalog::new(Arc::clone(&backends.documents));
        let directory = UserDirectory::new(
            Arc::clone(&backends.documents),
            Arc::clone(&backends.clock),
            config.directory.seed_demo_organizer,
        );
        let session = AuthSession::new(
            Arc::clone(&backends.identity),
            directory.clone(),
            Arc::clone(&backends.clock),
        );

        tracing::info!(
            notifications = !config.notification.template_id.is_empty(),
            "Application wired"
        );

        Self {
            config,
            bookings,
            catalog,
            directory,
            session,
            clock: backends.clock,
        }
    }

    /// Reload a requester's requests and summarise them.
    ///
    /// # Errors
    ///
    /// Returns the refresh error; a superseded refresh still builds from
    /// whatever is cached.
    pub async fn requester_dashboard(&self, requester: &UserId) -> Result<Dashboard, BookingError> {
        self.bookings.refresh_for_requester(requester).await?;
        let requests: Vec<BookingRequest> = self.bookings.list_by_requester(requester).await.collect();
        Ok(self.dashboard(&requests).await)
    }

    /// Reload an organizer's requests and summarise them.
    ///
    /// # Errors
    ///
    /// Returns the refresh error; a superseded refresh still builds from
    /// whatever is cached.
    pub async fn organizer_dashboard(&self, organizer: &UserId) -> Result<Dashboard, BookingError> {
        self.bookings.refresh_for_organizer(organizer).await?;
        let requests: Vec<BookingRequest> = self.bookings.list_by_organizer(organizer).await.collect();
        Ok(self.dashboard(&requests).await)
    }

    async fn dashboard(&self, requests: &[BookingRequest]) -> Dashboard {
        let mut titles: HashMap<PackageId, String> = HashMap::new();
        for package_id in Dashboard::shown_packages(requests, &self.config.dashboard) {
            let title = self.catalog.package_title(&package_id).await;
            titles.insert(package_id, title);
        }

        Dashboard::build(requests, &self.config.dashboard, self.clock.now(), |id| {
            titles.get(id).cloned().unwrap_or_default()
        })
    }

    /// Drain the workflow before exit.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects outlive the
    /// configured shutdown timeout.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        self.bookings
            .shutdown(Duration::from_secs(self.config.server.shutdown_timeout))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::types::{BookingStatus, EVENT_PACKAGES, NewBookingRequest, USERS};
    use eventhub_testing::{
        InMemoryDocumentStore, InMemoryIdentityService, RecordingNotifier, test_clock, utc_date,
    };
    use serde_json::json;

    fn app(store: &InMemoryDocumentStore) -> App {
        App::new(
            Config::default(),
            Backends {
                clock: Arc::new(test_clock()),
                documents: Arc::new(store.clone()),
                identity: Arc::new(InMemoryIdentityService::new()),
                notifier: Arc::new(RecordingNotifier::new()),
            },
        )
    }

    #[tokio::test]
    async fn dashboards_reflect_both_sides() {
        let store = InMemoryDocumentStore::new();
        store.insert(USERS, "r1", json!({ "role": "requester", "name": "Rita" }));
        store.insert(USERS, "o1", json!({ "role": "organizer", "username": "Olivia", "organizationName": "Lakeside", "mobileNumber": "555" }));
        store.insert(EVENT_PACKAGES, "p1", json!({ "organizerId": "o1", "title": "Gala Dinner" }));
        let app = app(&store);

        let first = app
            .bookings
            .create_request(NewBookingRequest::new("r1", "o1", "p1", utc_date(2025, 6, 1)))
            .await
            .unwrap();
        app.bookings
            .create_request(NewBookingRequest::new("r1", "o1", "p1", utc_date(2025, 7, 1)))
            .await
            .unwrap();
        app.bookings.transition(&first.id, BookingStatus::Confirmed).await.unwrap();

        let organizer = app.organizer_dashboard(&UserId::from("o1")).await.unwrap();
        assert_eq!(organizer.stats.total, 2);
        assert_eq!(organizer.stats.confirmed, 1);
        assert_eq!(organizer.upcoming.len(), 1);
        assert_eq!(organizer.upcoming[0].package_title, "Gala Dinner");
        assert_eq!(organizer.recent[0].requested, "Just now");

        let requester = app.requester_dashboard(&UserId::from("r1")).await.unwrap();
        assert_eq!(requester.stats, organizer.stats);

        let stranger = app.requester_dashboard(&UserId::from("nobody")).await.unwrap();
        assert_eq!(stranger.stats.total, 0);
        assert!(stranger.recent.is_empty());

        app.shutdown().await.unwrap();
    }
}
