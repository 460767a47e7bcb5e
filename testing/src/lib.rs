//! # EventHub Testing
//!
//! Testing utilities and in-memory backends for the EventHub booking marketplace.
//!
//! This crate provides:
//! - A fixed clock for deterministic timestamps
//! - In-memory implementations of the external service traits
//!   (document store, identity provider, email notifier)
//! - A Given-When-Then harness for reducers
//!
//! The in-memory backends are also what the demo binary runs against.
//!
//! ## Example
//!
//! ```ignore
//! use eventhub_testing::{InMemoryDocumentStore, test_clock};
//!
//! #[tokio::test]
//! async fn creates_pending_request() {
//!     let documents = Arc::new(InMemoryDocumentStore::new());
//!     let env = BookingEnvironment::new(Arc::new(test_clock()), documents.clone(), notifier);
//!     let service = BookingService::new(env, WorkflowConfig::default());
//!
//!     let request = service.create_request(draft).await?;
//!     assert_eq!(request.status, BookingStatus::Pending);
//! }
//! ```

use chrono::{DateTime, TimeZone, Utc};
use eventhub_core::environment::Clock;

pub mod document_store;
pub mod identity;
pub mod notifier;
pub mod reducer_test;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, TimeZone, Utc};
    use std::sync::RwLock;

    /// Clock pinned to a settable instant
    ///
    /// # Example
    ///
    /// ```
    /// use eventhub_testing::mocks::FixedClock;
    /// use eventhub_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let before = clock.now();
    /// assert_eq!(before, clock.now());
    ///
    /// clock.advance(Duration::minutes(5));
    /// assert_eq!(clock.now() - before, Duration::minutes(5));
    /// ```
    #[derive(Debug)]
    pub struct FixedClock {
        time: RwLock<DateTime<Utc>>,
    }

    impl FixedClock {
        /// Create a clock pinned at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: RwLock::new(time),
            }
        }

        /// Move the clock to `time`
        pub fn set(&self, time: DateTime<Utc>) {
            if let Ok(mut current) = self.time.write() {
                *current = time;
            }
        }

        /// Move the clock forward by `by`
        pub fn advance(&self, by: chrono::Duration) {
            if let Ok(mut current) = self.time.write() {
                *current += by;
            }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
                .read()
                .map_or_else(|poisoned| *poisoned.into_inner(), |time| *time)
        }
    }

    /// Clock pinned at 2025-01-01 00:00:00 UTC
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default())
    }
}

/// Midnight UTC on the given date, for building event dates in tests
///
/// Returns the Unix epoch for an invalid date.
#[must_use]
pub fn utc_date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

// Re-export commonly used items
pub use document_store::InMemoryDocumentStore;
pub use identity::InMemoryIdentityService;
pub use mocks::{FixedClock, test_clock};
pub use notifier::{RecordingNotifier, SentMessage};
pub use reducer_test::ReducerTest;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_new_year_2025() {
        let clock = test_clock();
        assert_eq!(clock.now(), utc_date(2025, 1, 1));
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn set_moves_the_clock() {
        let clock = test_clock();
        clock.set(utc_date(2025, 6, 1));
        assert_eq!(clock.now(), utc_date(2025, 6, 1));
    }
}
