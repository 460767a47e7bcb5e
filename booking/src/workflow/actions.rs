//! Commands and events of the booking workflow.

use crate::error::BookingError;
use crate::types::{BookingRequest, BookingStatus, NewBookingRequest, RequestId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Ties a command to the event that answers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Fresh random id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whose requests a refresh loads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefreshScope {
    /// Requests made by this requester
    Requester(UserId),
    /// Requests addressed to this organizer
    Organizer(UserId),
}

impl RefreshScope {
    /// Stored field the scope filters on
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Requester(_) => "requesterId",
            Self::Organizer(_) => "organizerId",
        }
    }

    /// Owner id
    #[must_use]
    pub const fn owner(&self) -> &UserId {
        match self {
            Self::Requester(id) | Self::Organizer(id) => id,
        }
    }

    /// Whether `request` belongs to this scope's owner
    #[must_use]
    pub fn covers(&self, request: &BookingRequest) -> bool {
        match self {
            Self::Requester(id) => &request.requester_id == id,
            Self::Organizer(id) => &request.organizer_id == id,
        }
    }
}

/// Actions of the booking workflow.
///
/// Commands come from callers; events come back from effects (or from the
/// reducer itself, for synchronous rejections).
#[derive(Debug, Clone, PartialEq)]
pub enum BookingAction {
    // Commands
    /// Submit a new booking request
    CreateRequest {
        /// Reply routing
        correlation_id: CorrelationId,
        /// What to create
        draft: NewBookingRequest,
    },

    /// Move a request to another status
    TransitionStatus {
        /// Reply routing
        correlation_id: CorrelationId,
        /// Target request
        request_id: RequestId,
        /// Desired status
        target: BookingStatus,
    },

    /// Reload the cached requests for one owner
    RefreshRequests {
        /// Reply routing
        correlation_id: CorrelationId,
        /// Whose requests to load
        scope: RefreshScope,
    },

    /// Abandon any refresh in progress
    CancelRefresh,

    // Events
    /// A request was persisted
    RequestCreated {
        /// Reply routing
        correlation_id: CorrelationId,
        /// The stored request
        request: BookingRequest,
        /// Title of the booked package, for the notification email
        package_title: String,
    },

    /// A create was refused, before or during persistence
    RequestRejected {
        /// Reply routing
        correlation_id: CorrelationId,
        /// Why
        error: BookingError,
    },

    /// A status change was persisted
    StatusChanged {
        /// Reply routing
        correlation_id: CorrelationId,
        /// The request with its new status
        request: BookingRequest,
        /// Status before the change
        from: BookingStatus,
    },

    /// A status change was refused before anything was written
    TransitionRejected {
        /// Reply routing
        correlation_id: CorrelationId,
        /// Target request
        request_id: RequestId,
        /// Why
        error: BookingError,
    },

    /// Writing a status change failed; the request keeps its old status
    TransitionFailed {
        /// Reply routing
        correlation_id: CorrelationId,
        /// Target request
        request_id: RequestId,
        /// Why
        error: BookingError,
    },

    /// A refresh query returned
    RequestsLoaded {
        /// Reply routing
        correlation_id: CorrelationId,
        /// Generation the refresh was started under
        generation: u64,
        /// Loaded requests
        requests: Vec<BookingRequest>,
    },

    /// A refresh query failed after retries
    RefreshFailed {
        /// Reply routing
        correlation_id: CorrelationId,
        /// Generation the refresh was started under
        generation: u64,
        /// Why
        error: BookingError,
    },
}

impl BookingAction {
    /// Correlation id, for actions that carry one
    #[must_use]
    pub const fn correlation_id(&self) -> Option<CorrelationId> {
        match self {
            Self::CreateRequest { correlation_id, .. }
            | Self::TransitionStatus { correlation_id, .. }
            | Self::RefreshRequests { correlation_id, .. }
            | Self::RequestCreated { correlation_id, .. }
            | Self::RequestRejected { correlation_id, .. }
            | Self::StatusChanged { correlation_id, .. }
            | Self::TransitionRejected { correlation_id, .. }
            | Self::TransitionFailed { correlation_id, .. }
            | Self::RequestsLoaded { correlation_id, .. }
            | Self::RefreshFailed { correlation_id, .. } => Some(*correlation_id),
            Self::CancelRefresh => None,
        }
    }

    /// Whether this is a caller-issued command
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::CreateRequest { .. }
                | Self::TransitionStatus { .. }
                | Self::RefreshRequests { .. }
                | Self::CancelRefresh
        )
    }

    /// Whether this event answers the command with `id`
    #[must_use]
    pub fn answers(&self, id: CorrelationId) -> bool {
        !self.is_command() && self.correlation_id() == Some(id)
    }
}
