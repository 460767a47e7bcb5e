//! Request/response façade over the workflow store.

use super::actions::{BookingAction, CorrelationId, RefreshScope};
use super::environment::BookingEnvironment;
use super::reducer::BookingReducer;
use super::state::BookingState;
use crate::catalog::EventCatalog;
use crate::error::BookingError;
use crate::types::{BookingRequest, BookingStatus, NewBookingRequest, PackageId, RequestId, UserId};
use eventhub_runtime::{Store, StoreConfig, StoreError};
use std::time::Duration;

/// Store type running the booking workflow.
pub type BookingStore = Store<BookingState, BookingAction, BookingEnvironment, BookingReducer>;

/// Result of a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The refresh loaded this many requests; writes made while it ran are
    /// kept on top of them
    Applied(usize),
    /// A later refresh or a cancel superseded this one; nothing was applied
    Superseded,
}

/// Booking workflow operations.
///
/// Every call sends a command with a fresh correlation id and waits for the
/// matching answer, up to the configured response timeout.
#[derive(Clone)]
pub struct BookingService {
    store: BookingStore,
    catalog: EventCatalog,
    response_timeout: Duration,
}

impl BookingService {
    /// Start the workflow over `env`.
    #[must_use]
    pub fn new(env: BookingEnvironment, response_timeout: Duration, broadcast_capacity: usize) -> Self {
        let catalog = EventCatalog::new(std::sync::Arc::clone(&env.documents));
        let store = Store::with_config(
            BookingState::default(),
            BookingReducer::new(),
            env,
            StoreConfig::default().with_broadcast_capacity(broadcast_capacity),
        );
        Self {
            store,
            catalog,
            response_timeout,
        }
    }

    async fn request(&self, command: BookingAction, id: CorrelationId) -> Result<BookingAction, BookingError> {
        self.store
            .send_and_wait_for(command, |action| action.answers(id), self.response_timeout)
            .await
            .map_err(BookingError::from)
    }

    /// Create a `Pending` request dated now.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`]: a reference is missing or the date is past
    /// - [`BookingError::Upstream`]: the document store failed
    /// - [`BookingError::Timeout`]: no answer within the response timeout
    #[tracing::instrument(skip(self, draft), fields(requester = %draft.requester_id, package = %draft.package_id))]
    pub async fn create_request(&self, draft: NewBookingRequest) -> Result<BookingRequest, BookingError> {
        let correlation_id = CorrelationId::new();
        let answer = self
            .request(BookingAction::CreateRequest { correlation_id, draft }, correlation_id)
            .await?;

        match answer {
            BookingAction::RequestCreated { request, .. } => Ok(request),
            BookingAction::RequestRejected { error, .. } => Err(error),
            other => Err(unexpected(&other)),
        }
    }

    /// Move a request to `target`, returning the updated record.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`]: the request is not cached
    /// - [`BookingError::TransitionInFlight`]: a change for it is outstanding
    /// - [`BookingError::InvalidTransition`]: the status table forbids it
    /// - [`BookingError::Upstream`]: the write failed
    /// - [`BookingError::Timeout`]: no answer within the response timeout
    #[tracing::instrument(skip(self, request_id), fields(request_id = %request_id))]
    pub async fn transition(&self, request_id: &RequestId, target: BookingStatus) -> Result<BookingRequest, BookingError> {
        let correlation_id = CorrelationId::new();
        let command = BookingAction::TransitionStatus {
            correlation_id,
            request_id: request_id.clone(),
            target,
        };

        match self.request(command, correlation_id).await? {
            BookingAction::StatusChanged { request, .. } => Ok(request),
            BookingAction::TransitionRejected { error, .. } | BookingAction::TransitionFailed { error, .. } => Err(error),
            other => Err(unexpected(&other)),
        }
    }

    /// Cached requests made by `requester`, in insertion order.
    ///
    /// Iterates over a copy taken at call time.
    pub async fn list_by_requester(&self, requester: &UserId) -> impl Iterator<Item = BookingRequest> {
        let requester = requester.clone();
        self.snapshot()
            .await
            .into_iter()
            .filter(move |r| r.requester_id == requester)
    }

    /// Cached requests addressed to `organizer`, in insertion order.
    ///
    /// Iterates over a copy taken at call time.
    pub async fn list_by_organizer(&self, organizer: &UserId) -> impl Iterator<Item = BookingRequest> {
        let organizer = organizer.clone();
        self.snapshot()
            .await
            .into_iter()
            .filter(move |r| r.organizer_id == organizer)
    }

    /// Copy of every cached request.
    pub async fn snapshot(&self) -> Vec<BookingRequest> {
        self.store.state(|s| s.requests().to_vec()).await
    }

    /// One cached request.
    pub async fn get(&self, request_id: &RequestId) -> Option<BookingRequest> {
        self.store.state(|s| s.get(request_id).cloned()).await
    }

    /// Last error raised by a command.
    pub async fn last_error(&self) -> Option<BookingError> {
        self.store.state(|s| s.last_error.clone()).await
    }

    /// Replace the cache with the requests made by `requester`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Upstream`]: the query failed after retries
    /// - [`BookingError::Timeout`]: no answer within the response timeout
    pub async fn refresh_for_requester(&self, requester: &UserId) -> Result<RefreshOutcome, BookingError> {
        self.refresh(RefreshScope::Requester(requester.clone())).await
    }

    /// Replace the cache with the requests addressed to `organizer`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Upstream`]: the query failed after retries
    /// - [`BookingError::Timeout`]: no answer within the response timeout
    pub async fn refresh_for_organizer(&self, organizer: &UserId) -> Result<RefreshOutcome, BookingError> {
        self.refresh(RefreshScope::Organizer(organizer.clone())).await
    }

    #[tracing::instrument(skip(self))]
    async fn refresh(&self, scope: RefreshScope) -> Result<RefreshOutcome, BookingError> {
        let correlation_id = CorrelationId::new();
        let command = BookingAction::RefreshRequests { correlation_id, scope };

        match self.request(command, correlation_id).await? {
            BookingAction::RequestsLoaded { generation, requests, .. } => {
                let applied = self.store.state(|s| s.loaded_generation() == generation).await;
                Ok(if applied {
                    RefreshOutcome::Applied(requests.len())
                } else {
                    RefreshOutcome::Superseded
                })
            },
            BookingAction::RefreshFailed { error, .. } => Err(error),
            other => Err(unexpected(&other)),
        }
    }

    /// Abandon any refresh in progress; its results will be discarded.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Upstream`] if the store is shutting down.
    pub async fn cancel_refresh(&self) -> Result<(), BookingError> {
        self.store.send(BookingAction::CancelRefresh).await?;
        Ok(())
    }

    /// Title of a package, or `"Unknown Package"`.
    pub async fn find_package_title(&self, package_id: &PackageId) -> String {
        self.catalog.package_title(package_id).await
    }

    /// Subscribe to workflow events as they are applied.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<BookingAction> {
        self.store.subscribe_actions()
    }

    /// Stop accepting commands and wait for outstanding effects.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when `timeout` elapses.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}

fn unexpected(action: &BookingAction) -> BookingError {
    tracing::error!(?action, "Unexpected workflow answer");
    BookingError::Upstream("unexpected workflow answer".to_string())
}
