//! Dashboard derivations over a snapshot of booking requests.
//!
//! Everything here is pure: callers copy the requests out of the workflow
//! first, so a refresh replacing the cache mid-computation cannot tear the
//! result.

use crate::config::DashboardConfig;
use crate::types::{BookingRequest, BookingStatus, PackageId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-status request counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    /// Every request
    pub total: usize,
    /// Awaiting the organizer
    pub pending: usize,
    /// Accepted
    pub confirmed: usize,
    /// Held
    pub completed: usize,
    /// Withdrawn or declined
    pub cancelled: usize,
}

/// Count requests by status.
#[must_use]
pub fn aggregate(requests: &[BookingRequest]) -> DashboardStats {
    requests.iter().fold(DashboardStats::default(), |mut stats, request| {
        stats.total += 1;
        match request.status {
            BookingStatus::Pending => stats.pending += 1,
            BookingStatus::Confirmed => stats.confirmed += 1,
            BookingStatus::Completed => stats.completed += 1,
            BookingStatus::Cancelled => stats.cancelled += 1,
        }
        stats
    })
}

/// Confirmed requests, soonest event first, at most `limit`.
///
/// Requests for the same date keep their input order.
#[must_use]
pub fn upcoming_events(requests: &[BookingRequest], limit: usize) -> Vec<BookingRequest> {
    let mut confirmed: Vec<BookingRequest> = requests
        .iter()
        .filter(|r| r.status == BookingStatus::Confirmed)
        .cloned()
        .collect();
    confirmed.sort_by_key(|r| r.event_date);
    confirmed.truncate(limit);
    confirmed
}

/// All requests, newest first, at most `limit`.
#[must_use]
pub fn recent_requests(requests: &[BookingRequest], limit: usize) -> Vec<BookingRequest> {
    let mut recent = requests.to_vec();
    recent.sort_by(|a, b| b.request_date.cmp(&a.request_date));
    recent.truncate(limit);
    recent
}

/// Human-readable age of a request: "Just now", "5 minutes ago", "1 day ago".
#[must_use]
pub fn time_elapsed(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(since);
    let (amount, unit) = if elapsed.num_days() > 0 {
        (elapsed.num_days(), "day")
    } else if elapsed.num_hours() > 0 {
        (elapsed.num_hours(), "hour")
    } else if elapsed.num_minutes() > 0 {
        (elapsed.num_minutes(), "minute")
    } else {
        return "Just now".to_string();
    };

    let plural = if amount > 1 { "s" } else { "" };
    format!("{amount} {unit}{plural} ago")
}

/// A request with the details a dashboard row shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardEntry {
    /// The request
    pub request: BookingRequest,
    /// Resolved package title
    pub package_title: String,
    /// Relative age of the request
    pub requested: String,
}

/// Everything one dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    /// Status counts
    pub stats: DashboardStats,
    /// Next confirmed events
    pub upcoming: Vec<DashboardEntry>,
    /// Latest requests
    pub recent: Vec<DashboardEntry>,
}

impl Dashboard {
    /// Packages whose titles [`Dashboard::build`] will ask for, each once.
    #[must_use]
    pub fn shown_packages(requests: &[BookingRequest], limits: &DashboardConfig) -> Vec<PackageId> {
        let mut ids: Vec<PackageId> = Vec::new();
        let upcoming = upcoming_events(requests, limits.upcoming_limit);
        let recent = recent_requests(requests, limits.recent_limit);
        for request in upcoming.iter().chain(&recent) {
            if !ids.contains(&request.package_id) {
                ids.push(request.package_id.clone());
            }
        }
        ids
    }

    /// Build a dashboard from one owner's requests.
    ///
    /// `title_of` resolves package titles; it is only called for requests
    /// that end up on the dashboard.
    #[must_use]
    pub fn build<F>(requests: &[BookingRequest], limits: &DashboardConfig, now: DateTime<Utc>, title_of: F) -> Self
    where
        F: Fn(&PackageId) -> String,
    {
        let entry = |request: BookingRequest| DashboardEntry {
            package_title: title_of(&request.package_id),
            requested: time_elapsed(request.request_date, now),
            request,
        };

        Self {
            stats: aggregate(requests),
            upcoming: upcoming_events(requests, limits.upcoming_limit)
                .into_iter()
                .map(&entry)
                .collect(),
            recent: recent_requests(requests, limits.recent_limit)
                .into_iter()
                .map(&entry)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RequestId, UserId};
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).single().unwrap_or_default()
    }

    fn request(id: &str, status: BookingStatus, requested: DateTime<Utc>, event: DateTime<Utc>) -> BookingRequest {
        BookingRequest {
            id: RequestId::from(id),
            requester_id: UserId::from("r1"),
            organizer_id: UserId::from("o1"),
            package_id: PackageId::from(format!("pkg-{id}")),
            status,
            request_date: requested,
            event_date: event,
            notes: None,
        }
    }

    #[test]
    fn aggregate_counts_each_status() {
        let requests = vec![
            request("a", BookingStatus::Pending, at(1, 0), at(20, 0)),
            request("b", BookingStatus::Confirmed, at(1, 0), at(20, 0)),
            request("c", BookingStatus::Confirmed, at(1, 0), at(20, 0)),
            request("d", BookingStatus::Cancelled, at(1, 0), at(20, 0)),
        ];
        let stats = aggregate(&requests);
        assert_eq!(
            stats,
            DashboardStats {
                total: 4,
                pending: 1,
                confirmed: 2,
                completed: 0,
                cancelled: 1,
            }
        );
    }

    #[test]
    fn upcoming_is_confirmed_ascending_and_stable_on_ties() {
        let requests = vec![
            request("late", BookingStatus::Confirmed, at(1, 0), at(25, 0)),
            request("tie-1", BookingStatus::Confirmed, at(1, 0), at(15, 0)),
            request("pending", BookingStatus::Pending, at(1, 0), at(2, 0)),
            request("tie-2", BookingStatus::Confirmed, at(1, 0), at(15, 0)),
            request("later", BookingStatus::Confirmed, at(1, 0), at(28, 0)),
        ];
        let ids: Vec<String> = upcoming_events(&requests, 3)
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(ids, vec!["tie-1", "tie-2", "late"]);
    }

    #[test]
    fn recent_is_newest_first() {
        let requests = vec![
            request("old", BookingStatus::Pending, at(1, 0), at(20, 0)),
            request("new", BookingStatus::Completed, at(3, 0), at(20, 0)),
            request("mid", BookingStatus::Confirmed, at(2, 0), at(20, 0)),
        ];
        let ids: Vec<String> = recent_requests(&requests, 2)
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(ids, vec!["new", "mid"]);
    }

    #[test]
    fn time_elapsed_picks_largest_unit() {
        let now = at(10, 12);
        assert_eq!(time_elapsed(now, now), "Just now");
        assert_eq!(time_elapsed(now - Duration::seconds(59), now), "Just now");
        assert_eq!(time_elapsed(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(time_elapsed(now - Duration::minutes(45), now), "45 minutes ago");
        assert_eq!(time_elapsed(now - Duration::hours(3), now), "3 hours ago");
        assert_eq!(time_elapsed(now - Duration::days(1), now), "1 day ago");
        assert_eq!(time_elapsed(now - Duration::days(9), now), "9 days ago");
    }

    #[test]
    fn build_resolves_titles_for_shown_rows_only() {
        let requests = vec![
            request("a", BookingStatus::Confirmed, at(1, 0), at(20, 0)),
            request("b", BookingStatus::Pending, at(2, 0), at(21, 0)),
        ];
        let limits = DashboardConfig {
            upcoming_limit: 3,
            recent_limit: 1,
        };
        let calls = std::cell::Cell::new(0);
        let dashboard = Dashboard::build(&requests, &limits, at(2, 6), |id| {
            calls.set(calls.get() + 1);
            format!("title of {id}")
        });

        assert_eq!(dashboard.stats.total, 2);
        assert_eq!(dashboard.upcoming.len(), 1);
        assert_eq!(dashboard.upcoming[0].package_title, "title of pkg-a");
        assert_eq!(dashboard.recent.len(), 1);
        assert_eq!(dashboard.recent[0].request.id.as_str(), "b");
        assert_eq!(dashboard.recent[0].requested, "6 hours ago");
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn shown_packages_skip_rows_past_the_limits() {
        let mut requests = vec![
            request("a", BookingStatus::Confirmed, at(1, 0), at(20, 0)),
            request("b", BookingStatus::Pending, at(2, 0), at(21, 0)),
            request("c", BookingStatus::Pending, at(3, 0), at(22, 0)),
            request("hidden", BookingStatus::Pending, at(1, 0), at(22, 0)),
        ];
        requests[2].package_id = PackageId::from("pkg-a");
        let limits = DashboardConfig {
            upcoming_limit: 1,
            recent_limit: 2,
        };

        let ids = Dashboard::shown_packages(&requests, &limits);
        assert_eq!(ids, vec![PackageId::from("pkg-a"), PackageId::from("pkg-b")]);
    }
}
