//! Property tests for the dashboard derivations and the status table.

use chrono::{DateTime, TimeZone, Utc};
use eventhub_booking::dashboard::{aggregate, recent_requests, upcoming_events};
use eventhub_booking::types::{BookingRequest, BookingStatus, PackageId, RequestId, UserId};
use proptest::prelude::*;

fn status() -> impl Strategy<Value = BookingStatus> {
    prop::sample::select(BookingStatus::ALL.to_vec())
}

fn timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    // 2025-01-01 plus up to a year, at one-hour resolution
    (0_i64..24 * 365).prop_map(|hours| {
        Utc.timestamp_opt(1_735_689_600 + hours * 3600, 0)
            .single()
            .unwrap_or_default()
    })
}

fn requests() -> impl Strategy<Value = Vec<BookingRequest>> {
    prop::collection::vec((status(), timestamp(), timestamp()), 0..40).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (status, request_date, event_date))| BookingRequest {
                id: RequestId::new(format!("req-{i}")),
                requester_id: UserId::from("r1"),
                organizer_id: UserId::from("o1"),
                package_id: PackageId::from("p1"),
                status,
                request_date,
                event_date,
                notes: None,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn aggregate_categories_sum_to_total(requests in requests()) {
        let stats = aggregate(&requests);
        prop_assert_eq!(stats.total, requests.len());
        prop_assert_eq!(
            stats.pending + stats.confirmed + stats.completed + stats.cancelled,
            stats.total
        );
    }

    #[test]
    fn upcoming_only_confirmed_and_ordered(requests in requests(), limit in 0_usize..10) {
        let upcoming = upcoming_events(&requests, limit);
        prop_assert!(upcoming.len() <= limit);
        prop_assert!(upcoming.iter().all(|r| r.status == BookingStatus::Confirmed));
        prop_assert!(upcoming.windows(2).all(|w| w[0].event_date <= w[1].event_date));

        let confirmed = requests.iter().filter(|r| r.status == BookingStatus::Confirmed).count();
        prop_assert_eq!(upcoming.len(), confirmed.min(limit));
    }

    #[test]
    fn recent_is_newest_first(requests in requests(), limit in 0_usize..10) {
        let recent = recent_requests(&requests, limit);
        prop_assert_eq!(recent.len(), requests.len().min(limit));
        prop_assert!(recent.windows(2).all(|w| w[0].request_date >= w[1].request_date));
    }

    #[test]
    fn terminal_statuses_never_move(from in status(), to in status()) {
        if from.is_terminal() {
            prop_assert!(!from.can_transition_to(to));
        }
    }
}

#[test]
fn transition_table_is_exact() {
    use BookingStatus::{Cancelled, Completed, Confirmed, Pending};

    for from in BookingStatus::ALL {
        for to in BookingStatus::ALL {
            let expected = matches!(
                (from, to),
                (Pending, Confirmed | Cancelled) | (Confirmed, Completed | Cancelled)
            );
            assert_eq!(from.can_transition_to(to), expected, "{from} -> {to}");
        }
    }
}
