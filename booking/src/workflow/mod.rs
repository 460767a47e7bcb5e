//! Booking-request workflow: creation, status transitions and the cached
//! per-owner request lists.

pub mod actions;
pub mod environment;
pub mod reducer;
pub mod service;
pub mod state;

pub use actions::{BookingAction, CorrelationId, RefreshScope};
pub use environment::BookingEnvironment;
pub use reducer::{BookingReducer, validate_new_request, validate_transition};
pub use service::{BookingService, BookingStore, RefreshOutcome};
pub use state::BookingState;
