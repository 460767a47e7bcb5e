//! EventHub booking marketplace
//!
//! Organizers publish event packages, requesters browse them and submit
//! booking requests, and every record lives in a document store behind the
//! [`DocumentStore`](eventhub_core::document_store::DocumentStore) trait.
//!
//! # Architecture
//!
//! ```text
//!   caller ──► BookingService ──► Store<BookingState, BookingAction, ..>
//!                   ▲                        │ reduce (validate, mark in-flight)
//!                   │                        ▼
//!                   │                 Effect::Future ──► DocumentStore
//!                   │                        │
//!                   └─── answer event ◄──────┘ (RequestCreated, StatusChanged, ..)
//!
//!   snapshot ──► dashboard::aggregate / upcoming_events / recent_requests
//! ```
//!
//! # Status workflow
//!
//! ```text
//! Pending ──► Confirmed ──► Completed
//!    │            │
//!    └────────────┴──► Cancelled
//! ```
//!
//! `Completed` and `Cancelled` are terminal. A second status change for a
//! request while one is outstanding is rejected, and refresh results that a
//! later refresh (or a cancel) has superseded are dropped.
//!
//! # Usage
//!
//! See [`app::App`] for wiring and the `eventhub-demo` binary for a walkthrough.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod directory;
pub mod error;
pub mod metrics;
pub mod session;
pub mod types;
pub mod workflow;

pub use app::{App, Backends};
pub use config::Config;
pub use error::{BookingError, SessionError};
pub use workflow::{BookingService, RefreshOutcome};
pub use types::*;
