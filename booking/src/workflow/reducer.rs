//! Booking workflow reducer.
//!
//! Commands are validated against the cached state; anything that needs the
//! document store runs as an effect and comes back as an event:
//!
//! | command            | effect                              | answer                                   |
//! |--------------------|-------------------------------------|------------------------------------------|
//! | `CreateRequest`    | check references, `add`             | `RequestCreated` / `RequestRejected`     |
//! | `TransitionStatus` | `update` the status field           | `StatusChanged` / `TransitionFailed`     |
//! | `RefreshRequests`  | `query` by owner, with retries      | `RequestsLoaded` / `RefreshFailed`       |
//!
//! Commands rejected by validation are answered with `RequestRejected` or
//! `TransitionRejected` through a ready effect, so they reach callers
//! waiting on the store like any other answer.

use super::actions::{BookingAction, CorrelationId, RefreshScope};
use super::environment::BookingEnvironment;
use super::state::BookingState;
use crate::catalog::UNKNOWN_PACKAGE;
use crate::error::BookingError;
use crate::metrics::{DocumentStoreMetrics, WorkflowMetrics};
use crate::types::{
    BOOKING_REQUESTS, BookingRequest, BookingStatus, EVENT_PACKAGES, NewBookingRequest, RequestId,
    Role, USERS,
};
use chrono::{DateTime, Utc};
use eventhub_core::document_store::{
    Document, DocumentStore, DocumentStoreError, Query, StoredDocument, encode,
};
use eventhub_core::notification::TemplateVariables;
use eventhub_core::{SmallVec, async_effect, effect::Effect, reducer::Reducer, reply, smallvec};
use eventhub_runtime::retry::retry_with_predicate;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

type Effects = SmallVec<[Effect<BookingAction>; 4]>;

/// Reducer for the booking-request workflow.
#[derive(Clone, Debug, Default)]
pub struct BookingReducer;

impl BookingReducer {
    /// Creates a new `BookingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Checks that need no I/O: ids present, event not in the past.
///
/// # Errors
///
/// Returns [`BookingError::Validation`] describing the first failed check.
pub fn validate_new_request(draft: &NewBookingRequest, now: DateTime<Utc>) -> Result<(), BookingError> {
    if draft.requester_id.is_blank() {
        return Err(BookingError::Validation("requester id is required".to_string()));
    }
    if draft.organizer_id.is_blank() {
        return Err(BookingError::Validation("organizer id is required".to_string()));
    }
    if draft.package_id.is_blank() {
        return Err(BookingError::Validation("package id is required".to_string()));
    }
    if draft.event_date < now {
        return Err(BookingError::Validation(format!(
            "event date {} is in the past",
            draft.event_date.date_naive()
        )));
    }
    Ok(())
}

/// Checks a status change against the cache and the transition table.
///
/// # Errors
///
/// - [`BookingError::NotFound`]: the request is not cached
/// - [`BookingError::TransitionInFlight`]: another change is outstanding
/// - [`BookingError::InvalidTransition`]: the table forbids the move
pub fn validate_transition<'s>(
    state: &'s BookingState,
    request_id: &RequestId,
    target: BookingStatus,
) -> Result<&'s BookingRequest, BookingError> {
    let current = state
        .get(request_id)
        .ok_or_else(|| BookingError::NotFound(request_id.to_string()))?;

    if state.is_in_flight(request_id) {
        return Err(BookingError::TransitionInFlight(request_id.clone()));
    }

    if !current.status.can_transition_to(target) {
        return Err(BookingError::InvalidTransition {
            from: current.status,
            to: target,
        });
    }

    Ok(current)
}

// ============================================================================
// Effects
// ============================================================================

async fn timed<T>(
    operation: &'static str,
    collection: &'static str,
    call: impl std::future::Future<Output = Result<T, DocumentStoreError>>,
) -> Result<T, DocumentStoreError> {
    let started = Instant::now();
    let result = call.await;
    DocumentStoreMetrics::record_operation(collection, operation, started.elapsed());
    result
}

/// Resolve the draft's references; returns the package title.
async fn check_references(
    documents: &dyn DocumentStore,
    draft: &NewBookingRequest,
) -> Result<String, BookingError> {
    let requester = timed("get", USERS, documents.get(USERS, draft.requester_id.as_str())).await?;
    if requester.is_none() {
        return Err(BookingError::Validation(format!(
            "requester {} does not exist",
            draft.requester_id
        )));
    }

    let organizer = timed("get", USERS, documents.get(USERS, draft.organizer_id.as_str())).await?;
    let is_organizer = organizer
        .as_ref()
        .and_then(|doc| doc.get("role"))
        .and_then(Value::as_str)
        == Some(Role::Organizer.as_str());
    if !is_organizer {
        return Err(BookingError::Validation(format!(
            "organizer {} does not exist",
            draft.organizer_id
        )));
    }

    let package = timed(
        "get",
        EVENT_PACKAGES,
        documents.get(EVENT_PACKAGES, draft.package_id.as_str()),
    )
    .await?
    .ok_or_else(|| BookingError::Validation(format!("package {} does not exist", draft.package_id)))?;

    if package.get("organizerId").and_then(Value::as_str) != Some(draft.organizer_id.as_str()) {
        return Err(BookingError::Validation(format!(
            "package {} is not offered by organizer {}",
            draft.package_id, draft.organizer_id
        )));
    }

    Ok(package
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_PACKAGE)
        .to_string())
}

async fn store_request(
    documents: &dyn DocumentStore,
    draft: NewBookingRequest,
    request_date: DateTime<Utc>,
) -> Result<(BookingRequest, String), BookingError> {
    let package_title = check_references(documents, &draft).await?;

    let mut request = BookingRequest {
        id: RequestId::new(String::new()),
        requester_id: draft.requester_id,
        organizer_id: draft.organizer_id,
        package_id: draft.package_id,
        status: BookingStatus::Pending,
        request_date,
        event_date: draft.event_date,
        notes: draft.notes,
    };

    let key = timed(
        "add",
        BOOKING_REQUESTS,
        documents.add(BOOKING_REQUESTS, encode(&request)?),
    )
    .await?;
    request.id = key.into();

    Ok((request, package_title))
}

fn create_request(
    correlation_id: CorrelationId,
    draft: NewBookingRequest,
    env: &BookingEnvironment,
) -> Effect<BookingAction> {
    let documents = Arc::clone(&env.documents);
    let request_date = env.clock.now();

    async_effect! {
        match store_request(documents.as_ref(), draft, request_date).await {
            Ok((request, package_title)) => Some(BookingAction::RequestCreated {
                correlation_id,
                request,
                package_title,
            }),
            Err(error) => Some(BookingAction::RequestRejected { correlation_id, error }),
        }
    }
}

fn write_status(
    correlation_id: CorrelationId,
    current: BookingRequest,
    target: BookingStatus,
    env: &BookingEnvironment,
) -> Effect<BookingAction> {
    let documents = Arc::clone(&env.documents);

    async_effect! {
        let key = current.id.to_string();
        let mut partial = Document::new();
        partial.insert("status".to_string(), Value::String(target.as_str().to_string()));

        let result = timed("update", BOOKING_REQUESTS, documents.update(BOOKING_REQUESTS, &key, partial)).await;

        match result {
            Ok(()) => {
                let from = current.status;
                let mut request = current;
                request.status = target;
                Some(BookingAction::StatusChanged { correlation_id, request, from })
            },
            Err(error) => Some(BookingAction::TransitionFailed {
                correlation_id,
                request_id: current.id,
                error: error.into(),
            }),
        }
    }
}

fn decode_requests(documents: Vec<StoredDocument>) -> Vec<BookingRequest> {
    let mut requests: Vec<BookingRequest> = documents
        .into_iter()
        .filter_map(|doc| {
            let key = doc.key.clone();
            doc.decode()
                .map_err(|error| tracing::warn!(key = %key, error = %error, "Skipping malformed booking request"))
                .ok()
        })
        .collect();
    requests.sort_by_key(|r| r.request_date);
    requests
}

fn load_requests(
    correlation_id: CorrelationId,
    scope: RefreshScope,
    generation: u64,
    env: &BookingEnvironment,
) -> Effect<BookingAction> {
    let documents = Arc::clone(&env.documents);
    let policy = env.refresh_policy.clone();

    async_effect! {
        let field = scope.field();
        let owner = scope.owner().to_string();

        let result = retry_with_predicate(
            policy,
            "list_requests",
            || {
                let documents = Arc::clone(&documents);
                let owner = owner.clone();
                async move {
                    timed(
                        "query",
                        BOOKING_REQUESTS,
                        documents.query(BOOKING_REQUESTS, Query::field_eq(field, owner)),
                    )
                    .await
                }
            },
            |error: &DocumentStoreError| matches!(error, DocumentStoreError::Unavailable(_)),
        )
        .await;

        match result {
            Ok(documents) => Some(BookingAction::RequestsLoaded {
                correlation_id,
                generation,
                requests: decode_requests(documents),
            }),
            Err(error) => Some(BookingAction::RefreshFailed {
                correlation_id,
                generation,
                error: error.into(),
            }),
        }
    }
}

fn notification_variables(request: &BookingRequest, package_title: &str) -> TemplateVariables {
    let mut variables = TemplateVariables::new();
    variables.insert("request_id".to_string(), request.id.to_string());
    variables.insert("requester_id".to_string(), request.requester_id.to_string());
    variables.insert("organizer_id".to_string(), request.organizer_id.to_string());
    variables.insert("package_id".to_string(), request.package_id.to_string());
    variables.insert("package_title".to_string(), package_title.to_string());
    variables.insert("event_date".to_string(), request.event_date.date_naive().to_string());
    variables.insert("status".to_string(), request.status.to_string());
    variables.insert("notes".to_string(), request.notes.clone().unwrap_or_default());
    variables
}

fn notify_created(request: &BookingRequest, package_title: &str, env: &BookingEnvironment) -> Effect<BookingAction> {
    if env.notification_template.is_empty() {
        return Effect::None;
    }

    let notifier = Arc::clone(&env.notifier);
    let template = env.notification_template.clone();
    let variables = notification_variables(request, package_title);
    let request_id = request.id.clone();

    async_effect! {
        match notifier.send(&template, variables).await {
            Ok(()) => tracing::debug!(request_id = %request_id, "Booking notification sent"),
            Err(error) => tracing::warn!(request_id = %request_id, error = %error, "Booking notification failed"),
        }
        None::<BookingAction>
    }
}

// ============================================================================
// Reducer
// ============================================================================

impl Reducer for BookingReducer {
    type State = BookingState;
    type Action = BookingAction;
    type Environment = BookingEnvironment;

    fn reduce(&self, state: &mut BookingState, action: BookingAction, env: &BookingEnvironment) -> Effects {
        match action {
            // Commands
            BookingAction::CreateRequest { correlation_id, draft } => {
                if let Err(error) = validate_new_request(&draft, env.clock.now()) {
                    return smallvec![reply!(BookingAction::RequestRejected { correlation_id, error })];
                }
                tracing::debug!(%correlation_id, requester = %draft.requester_id, "Creating booking request");
                smallvec![create_request(correlation_id, draft, env)]
            },

            BookingAction::TransitionStatus { correlation_id, request_id, target } => {
                let current = match validate_transition(state, &request_id, target) {
                    Ok(current) => current.clone(),
                    Err(error) => {
                        return smallvec![reply!(BookingAction::TransitionRejected {
                            correlation_id,
                            request_id,
                            error,
                        })];
                    },
                };
                tracing::debug!(%correlation_id, request_id = %request_id, from = %current.status, to = %target, "Changing status");
                state.in_flight.insert(request_id);
                smallvec![write_status(correlation_id, current, target, env)]
            },

            BookingAction::RefreshRequests { correlation_id, scope } => {
                state.begin_refresh(scope.clone());
                tracing::debug!(%correlation_id, generation = state.generation, ?scope, "Refreshing requests");
                smallvec![load_requests(correlation_id, scope, state.generation, env)]
            },

            BookingAction::CancelRefresh => {
                state.generation += 1;
                state.end_refresh();
                tracing::debug!(generation = state.generation, "Refresh cancelled");
                smallvec![Effect::None]
            },

            // Events
            BookingAction::RequestCreated { request, package_title, .. } => {
                tracing::info!(request_id = %request.id, package = %package_title, "Booking request created");
                WorkflowMetrics::record_created();
                let notify = notify_created(&request, &package_title, env);
                state.record_write(&request);
                state.upsert(request);
                state.last_error = None;
                smallvec![notify]
            },

            BookingAction::RequestRejected { error, .. } => {
                tracing::warn!(error = %error, "Booking request rejected");
                WorkflowMetrics::record_rejection(error.kind());
                state.last_error = Some(error);
                smallvec![Effect::None]
            },

            BookingAction::StatusChanged { request, from, .. } => {
                tracing::info!(request_id = %request.id, %from, to = %request.status, "Status changed");
                WorkflowMetrics::record_transition(request.status.as_str());
                state.in_flight.remove(&request.id);
                state.record_write(&request);
                state.upsert(request);
                state.last_error = None;
                smallvec![Effect::None]
            },

            BookingAction::TransitionRejected { request_id, error, .. } => {
                tracing::warn!(request_id = %request_id, error = %error, "Status change rejected");
                WorkflowMetrics::record_rejection(error.kind());
                state.last_error = Some(error);
                smallvec![Effect::None]
            },

            BookingAction::TransitionFailed { request_id, error, .. } => {
                tracing::warn!(request_id = %request_id, error = %error, "Status write failed");
                WorkflowMetrics::record_rejection(error.kind());
                state.in_flight.remove(&request_id);
                state.last_error = Some(error);
                smallvec![Effect::None]
            },

            BookingAction::RequestsLoaded { generation, requests, .. } => {
                if generation != state.generation {
                    tracing::debug!(generation, current = state.generation, "Discarding stale refresh");
                    return smallvec![Effect::None];
                }
                tracing::debug!(
                    generation,
                    count = requests.len(),
                    replayed = state.written_during_refresh.len(),
                    "Requests loaded"
                );
                state.apply_refresh(generation, requests);
                smallvec![Effect::None]
            },

            BookingAction::RefreshFailed { generation, error, .. } => {
                tracing::warn!(generation, error = %error, "Refresh failed");
                if generation == state.generation {
                    state.end_refresh();
                    state.last_error = Some(error);
                }
                smallvec![Effect::None]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::types::{PackageId, UserId};
    use eventhub_testing::reducer_test::assertions;
    use eventhub_testing::{InMemoryDocumentStore, RecordingNotifier, ReducerTest, test_clock, utc_date};

    fn env() -> BookingEnvironment {
        BookingEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(RecordingNotifier::new()),
        )
    }

    fn request(id: &str, status: BookingStatus) -> BookingRequest {
        BookingRequest {
            id: RequestId::from(id),
            requester_id: UserId::from("r1"),
            organizer_id: UserId::from("o1"),
            package_id: PackageId::from("p1"),
            status,
            request_date: utc_date(2025, 1, 1),
            event_date: utc_date(2025, 6, 1),
            notes: None,
        }
    }

    fn transition(id: &str, target: BookingStatus) -> BookingAction {
        BookingAction::TransitionStatus {
            correlation_id: CorrelationId::new(),
            request_id: RequestId::from(id),
            target,
        }
    }

    #[test]
    fn past_event_date_fails_validation() {
        let draft = NewBookingRequest::new("r1", "o1", "p1", utc_date(2024, 12, 31));
        let result = validate_new_request(&draft, utc_date(2025, 1, 1));
        assert!(matches!(result, Err(BookingError::Validation(_))));
    }

    #[test]
    fn blank_package_fails_validation() {
        let draft = NewBookingRequest::new("r1", "o1", " ", utc_date(2025, 6, 1));
        let result = validate_new_request(&draft, utc_date(2025, 1, 1));
        assert_eq!(
            result,
            Err(BookingError::Validation("package id is required".to_string()))
        );
    }

    #[test]
    fn valid_create_produces_persistence_effect() {
        ReducerTest::new(BookingReducer::new())
            .with_env(env())
            .given_state(BookingState::default())
            .when_action(BookingAction::CreateRequest {
                correlation_id: CorrelationId::new(),
                draft: NewBookingRequest::new("r1", "o1", "p1", utc_date(2025, 6, 1)),
            })
            .then_state(|state| assert!(state.is_empty()))
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn transition_marks_request_in_flight() {
        ReducerTest::new(BookingReducer::new())
            .with_env(env())
            .given_state(BookingState::with_requests(vec![request("b1", BookingStatus::Pending)]))
            .when_action(transition("b1", BookingStatus::Confirmed))
            .then_state(|state| {
                assert!(state.is_in_flight(&RequestId::from("b1")));
                assert_eq!(state.get(&RequestId::from("b1")).unwrap().status, BookingStatus::Pending);
            })
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .run();
    }

    #[test]
    fn duplicate_transition_is_rejected_while_in_flight() {
        let mut state = BookingState::with_requests(vec![request("b1", BookingStatus::Pending)]);
        let env = env();
        let reducer = BookingReducer::new();

        let _ = reducer.reduce(&mut state, transition("b1", BookingStatus::Confirmed), &env);
        let result = validate_transition(&state, &RequestId::from("b1"), BookingStatus::Confirmed);

        assert_eq!(result, Err(BookingError::TransitionInFlight(RequestId::from("b1"))));
    }

    #[test]
    fn terminal_statuses_reject_every_target() {
        for from in [BookingStatus::Completed, BookingStatus::Cancelled] {
            let state = BookingState::with_requests(vec![request("b1", from)]);
            for to in BookingStatus::ALL {
                let result = validate_transition(&state, &RequestId::from("b1"), to);
                assert_eq!(result, Err(BookingError::InvalidTransition { from, to }));
            }
        }
    }

    #[test]
    fn unknown_request_is_not_found() {
        let state = BookingState::default();
        let result = validate_transition(&state, &RequestId::from("ghost"), BookingStatus::Confirmed);
        assert_eq!(result, Err(BookingError::NotFound("ghost".to_string())));
    }

    #[test]
    fn status_changed_applies_and_clears_in_flight() {
        let mut confirmed = request("b1", BookingStatus::Pending);
        confirmed.status = BookingStatus::Confirmed;

        ReducerTest::new(BookingReducer::new())
            .with_env(env())
            .given_state(BookingState::with_requests(vec![request("b1", BookingStatus::Pending)]))
            .when_action(transition("b1", BookingStatus::Confirmed))
            .when_action(BookingAction::StatusChanged {
                correlation_id: CorrelationId::new(),
                request: confirmed,
                from: BookingStatus::Pending,
            })
            .then_state(|state| {
                assert!(!state.is_in_flight(&RequestId::from("b1")));
                assert_eq!(state.get(&RequestId::from("b1")).unwrap().status, BookingStatus::Confirmed);
                assert_eq!(state.len(), 1);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn failed_write_releases_request() {
        ReducerTest::new(BookingReducer::new())
            .with_env(env())
            .given_state(BookingState::with_requests(vec![request("b1", BookingStatus::Pending)]))
            .when_action(transition("b1", BookingStatus::Confirmed))
            .when_action(BookingAction::TransitionFailed {
                correlation_id: CorrelationId::new(),
                request_id: RequestId::from("b1"),
                error: BookingError::Upstream("down".to_string()),
            })
            .then_state(|state| {
                assert!(!state.is_in_flight(&RequestId::from("b1")));
                assert_eq!(state.get(&RequestId::from("b1")).unwrap().status, BookingStatus::Pending);
                assert!(state.last_error.is_some());
            })
            .run();
    }

    #[test]
    fn stale_refresh_results_are_discarded() {
        let scope = RefreshScope::Requester(UserId::from("r1"));

        ReducerTest::new(BookingReducer::new())
            .with_env(env())
            .given_state(BookingState::default())
            .when_action(BookingAction::RefreshRequests {
                correlation_id: CorrelationId::new(),
                scope: scope.clone(),
            })
            .when_action(BookingAction::RefreshRequests {
                correlation_id: CorrelationId::new(),
                scope,
            })
            .when_action(BookingAction::RequestsLoaded {
                correlation_id: CorrelationId::new(),
                generation: 1,
                requests: vec![request("stale", BookingStatus::Pending)],
            })
            .then_state(|state| {
                assert!(state.is_empty());
                assert_eq!(state.generation(), 2);
                assert_eq!(state.loaded_generation(), 0);
            })
            .run();
    }

    #[test]
    fn cancel_refresh_invalidates_outstanding_load() {
        ReducerTest::new(BookingReducer::new())
            .with_env(env())
            .given_state(BookingState::default())
            .when_action(BookingAction::RefreshRequests {
                correlation_id: CorrelationId::new(),
                scope: RefreshScope::Organizer(UserId::from("o1")),
            })
            .when_action(BookingAction::CancelRefresh)
            .when_action(BookingAction::RequestsLoaded {
                correlation_id: CorrelationId::new(),
                generation: 1,
                requests: vec![request("b1", BookingStatus::Pending)],
            })
            .then_state(|state| assert!(state.is_empty()))
            .run();
    }

    #[test]
    fn writes_during_refresh_survive_its_result() {
        let mut confirmed = request("b1", BookingStatus::Pending);
        confirmed.status = BookingStatus::Confirmed;
        let mut elsewhere = request("b2", BookingStatus::Pending);
        elsewhere.requester_id = UserId::from("r2");

        ReducerTest::new(BookingReducer::new())
            .with_env(env())
            .given_state(BookingState::with_requests(vec![request("b1", BookingStatus::Pending)]))
            .when_action(BookingAction::RefreshRequests {
                correlation_id: CorrelationId::new(),
                scope: RefreshScope::Requester(UserId::from("r1")),
            })
            .when_action(transition("b1", BookingStatus::Confirmed))
            .when_action(BookingAction::StatusChanged {
                correlation_id: CorrelationId::new(),
                request: confirmed,
                from: BookingStatus::Pending,
            })
            .when_action(BookingAction::RequestCreated {
                correlation_id: CorrelationId::new(),
                request: elsewhere,
                package_title: "Gala".to_string(),
            })
            .when_action(BookingAction::RequestsLoaded {
                correlation_id: CorrelationId::new(),
                generation: 1,
                requests: vec![request("b1", BookingStatus::Pending)],
            })
            .then_state(|state| {
                assert_eq!(state.loaded_generation(), 1);
                assert_eq!(state.len(), 1);
                assert_eq!(state.get(&RequestId::from("b1")).unwrap().status, BookingStatus::Confirmed);
                assert!(state.written_during_refresh.is_empty());
            })
            .run();
    }

    #[test]
    fn created_request_is_cached_without_notification_template() {
        ReducerTest::new(BookingReducer::new())
            .with_env(env())
            .given_state(BookingState::default())
            .when_action(BookingAction::RequestCreated {
                correlation_id: CorrelationId::new(),
                request: request("b1", BookingStatus::Pending),
                package_title: "Gala".to_string(),
            })
            .then_state(|state| assert_eq!(state.len(), 1))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn created_request_schedules_notification_with_template() {
        ReducerTest::new(BookingReducer::new())
            .with_env(env().with_notification_template("template_new_request"))
            .given_state(BookingState::default())
            .when_action(BookingAction::RequestCreated {
                correlation_id: CorrelationId::new(),
                request: request("b1", BookingStatus::Pending),
                package_title: "Gala".to_string(),
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn notification_variables_carry_request_details() {
        let vars = notification_variables(&request("b1", BookingStatus::Pending), "Gala");
        assert_eq!(vars.get("package_title").unwrap(), "Gala");
        assert_eq!(vars.get("event_date").unwrap(), "2025-06-01");
        assert_eq!(vars.get("status").unwrap(), "Pending");
    }
}
