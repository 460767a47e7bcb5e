//! Domain types for the booking marketplace.
//!
//! Records mirror the documents stored in the `bookingRequests`, `users` and
//! `eventPackages` collections. Field names serialize in camelCase to match
//! the stored documents; the document key travels as `id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collection holding booking requests.
pub const BOOKING_REQUESTS: &str = "bookingRequests";
/// Collection holding user profiles, keyed by principal uid.
pub const USERS: &str = "users";
/// Collection holding event packages.
pub const EVENT_PACKAGES: &str = "eventPackages";

macro_rules! document_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a key assigned by the document store
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The raw key
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the key is empty or whitespace
            #[must_use]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

document_id!(
    /// Key of a booking request document
    RequestId
);
document_id!(
    /// Key of a user profile document (the principal uid)
    UserId
);
document_id!(
    /// Key of an event package document
    PackageId
);

/// Lifecycle status of a booking request.
///
/// ```text
/// Pending ──► Confirmed ──► Completed
///    │            │
///    └──────┬─────┘
///           ▼
///       Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Submitted, awaiting the organizer
    Pending,
    /// Accepted by the organizer
    Confirmed,
    /// The event took place
    Completed,
    /// Withdrawn or declined
    Cancelled,
}

impl BookingStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Confirmed, Self::Completed, Self::Cancelled];

    /// Statuses reachable in one step from `self`.
    #[must_use]
    pub const fn allowed_targets(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Cancelled],
            Self::Confirmed => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    /// Whether `self → target` is an allowed transition.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// No further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Stored label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requester's request to book an organizer's package for a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    /// Document key
    pub id: RequestId,
    /// Who asked
    pub requester_id: UserId,
    /// Who is asked
    pub organizer_id: UserId,
    /// What is booked
    pub package_id: PackageId,
    /// Current lifecycle status
    pub status: BookingStatus,
    /// When the request was made; never changes
    pub request_date: DateTime<Utc>,
    /// When the event should take place
    pub event_date: DateTime<Utc>,
    /// Free text from the requester
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Input for creating a booking request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBookingRequest {
    /// Who asks
    pub requester_id: UserId,
    /// Who is asked
    pub organizer_id: UserId,
    /// What is booked
    pub package_id: PackageId,
    /// When the event should take place
    pub event_date: DateTime<Utc>,
    /// Free text from the requester
    pub notes: Option<String>,
}

impl NewBookingRequest {
    /// Request without notes
    #[must_use]
    pub fn new(
        requester_id: impl Into<UserId>,
        organizer_id: impl Into<UserId>,
        package_id: impl Into<PackageId>,
        event_date: DateTime<Utc>,
    ) -> Self {
        Self {
            requester_id: requester_id.into(),
            organizer_id: organizer_id.into(),
            package_id: package_id.into(),
            event_date,
            notes: None,
        }
    }

    /// Attach notes
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Which side of the marketplace a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Publishes packages, receives requests
    Organizer,
    /// Browses packages, sends requests
    Requester,
}

impl Role {
    /// Stored label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organizer => "organizer",
            Self::Requester => "requester",
        }
    }
}

/// Fields only organizers have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerDetails {
    /// Public handle
    pub username: String,
    /// Company or team name
    pub organization_name: String,
    /// Contact number
    pub mobile_number: String,
    /// Average review score; absent means 0
    #[serde(default)]
    pub rating: f64,
    /// Number of reviews
    #[serde(default)]
    pub review_count: u32,
}

/// Fields only requesters have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequesterDetails {
    /// Full name
    pub name: String,
    /// Job title; may be empty
    #[serde(default)]
    pub position: String,
}

/// Role-specific part of a profile, tagged by the stored `role` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum RoleDetails {
    /// Organizer profile
    Organizer(OrganizerDetails),
    /// Requester profile
    Requester(RequesterDetails),
}

/// A user document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Principal uid
    pub id: UserId,
    /// Sign-in email, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Registration time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Role and role-specific fields
    #[serde(flatten)]
    pub details: RoleDetails,
}

impl UserProfile {
    /// The user's role
    #[must_use]
    pub const fn role(&self) -> Role {
        match self.details {
            RoleDetails::Organizer(_) => Role::Organizer,
            RoleDetails::Requester(_) => Role::Requester,
        }
    }

    /// Organizer fields, if this is an organizer
    #[must_use]
    pub const fn as_organizer(&self) -> Option<&OrganizerDetails> {
        match &self.details {
            RoleDetails::Organizer(details) => Some(details),
            RoleDetails::Requester(_) => None,
        }
    }

    /// Name shown in listings
    #[must_use]
    pub fn display_name(&self) -> &str {
        match &self.details {
            RoleDetails::Organizer(details) => &details.username,
            RoleDetails::Requester(details) => &details.name,
        }
    }

    /// Rating used for directory ordering; requesters rank as 0
    #[must_use]
    pub fn rating(&self) -> f64 {
        self.as_organizer().map_or(0.0, |details| details.rating)
    }
}

/// An organizer's bookable offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPackage {
    /// Document key
    pub id: PackageId,
    /// Owner
    pub organizer_id: UserId,
    /// Listing title
    pub title: String,
    /// Asking price
    #[serde(default)]
    pub price: f64,
    /// Where the event happens
    #[serde(default)]
    pub location: String,
    /// Long description
    #[serde(default)]
    pub description: String,
    /// Cover image
    #[serde(default)]
    pub image_url: String,
}

/// Input for publishing a package.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDraft {
    /// Listing title
    pub title: String,
    /// Asking price
    pub price: f64,
    /// Where the event happens
    pub location: String,
    /// Long description
    pub description: String,
    /// Cover image
    pub image_url: String,
}
