//! Error types for the booking crate.

use crate::types::{BookingStatus, RequestId};
use eventhub_core::document_store::DocumentStoreError;
use eventhub_core::identity::IdentityError;
use eventhub_runtime::StoreError;
use thiserror::Error;

/// Errors returned by booking workflow operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Input failed a check (missing reference, past date, blank id)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The status table does not allow this move
    #[error("Cannot move a {from} request to {to}")]
    InvalidTransition {
        /// Current status
        from: BookingStatus,
        /// Requested status
        to: BookingStatus,
    },

    /// No such booking request
    #[error("Booking request not found: {0}")]
    NotFound(String),

    /// Another status change for this request has not settled yet
    #[error("A status change for request {0} is already in progress")]
    TransitionInFlight(RequestId),

    /// The document store failed
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// No result arrived within the response timeout
    #[error("Timed out waiting for the workflow")]
    Timeout,
}

impl BookingError {
    /// Short label for metrics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::NotFound(_) => "not_found",
            Self::TransitionInFlight(_) => "in_flight",
            Self::Upstream(_) => "upstream",
            Self::Timeout => "timeout",
        }
    }
}

impl From<DocumentStoreError> for BookingError {
    fn from(error: DocumentStoreError) -> Self {
        Self::Upstream(error.to_string())
    }
}

impl From<StoreError> for BookingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Timeout => Self::Timeout,
            other => Self::Upstream(other.to_string()),
        }
    }
}

/// Errors returned by session operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Wrong email or password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The principal exists but has no profile document
    #[error("User account not found in database")]
    ProfileMissing,

    /// The operation needs a signed-in user
    #[error("No authenticated user")]
    NotAuthenticated,

    /// Registration input was rejected
    #[error("Registration rejected: {0}")]
    Rejected(String),

    /// Identity provider or document store failed
    #[error("Upstream failure: {0}")]
    Upstream(String),
}

impl From<IdentityError> for SessionError {
    fn from(error: IdentityError) -> Self {
        match error {
            IdentityError::InvalidCredentials => Self::InvalidCredentials,
            IdentityError::EmailInUse(_) | IdentityError::WeakPassword(_) => {
                Self::Rejected(error.to_string())
            },
            IdentityError::Unavailable(_) => Self::Upstream(error.to_string()),
        }
    }
}

impl From<DocumentStoreError> for SessionError {
    fn from(error: DocumentStoreError) -> Self {
        Self::Upstream(error.to_string())
    }
}
