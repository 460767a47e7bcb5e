//! Injected dependencies of the booking workflow.

use eventhub_core::document_store::DocumentStore;
use eventhub_core::environment::Clock;
use eventhub_core::notification::Notifier;
use eventhub_runtime::retry::RetryPolicy;
use std::sync::Arc;

/// Environment for the booking reducer.
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Time source for request dates and the past-date check
    pub clock: Arc<dyn Clock>,
    /// Persistence for requests, profiles and packages
    pub documents: Arc<dyn DocumentStore>,
    /// Email delivery for new-request notifications
    pub notifier: Arc<dyn Notifier>,
    /// Template for new-request emails; empty disables notifications
    pub notification_template: String,
    /// Backoff for refresh queries
    pub refresh_policy: RetryPolicy,
}

impl BookingEnvironment {
    /// Environment with notifications disabled and the default refresh policy
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        documents: Arc<dyn DocumentStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            clock,
            documents,
            notifier,
            notification_template: String::new(),
            refresh_policy: RetryPolicy::default(),
        }
    }

    /// Send new-request emails with `template_id`
    #[must_use]
    pub fn with_notification_template(mut self, template_id: impl Into<String>) -> Self {
        self.notification_template = template_id.into();
        self
    }

    /// Use `policy` for refresh queries
    #[must_use]
    pub fn with_refresh_policy(mut self, policy: RetryPolicy) -> Self {
        self.refresh_policy = policy;
        self
    }
}
