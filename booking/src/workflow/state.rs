//! In-memory state of the booking workflow.

use super::actions::RefreshScope;
use crate::error::BookingError;
use crate::types::{BookingRequest, RequestId, UserId};
use std::collections::HashSet;

/// Cached booking requests plus the bookkeeping that keeps writes and
/// refreshes from racing each other.
#[derive(Debug, Clone, Default)]
pub struct BookingState {
    /// Known requests in insertion order
    pub(crate) requests: Vec<BookingRequest>,
    /// Requests with a status write outstanding
    pub(crate) in_flight: HashSet<RequestId>,
    /// Bumped by every refresh and cancel
    pub(crate) generation: u64,
    /// Generation of the last refresh result applied
    pub(crate) loaded_generation: u64,
    /// Scope of the refresh still outstanding
    pub(crate) refreshing: Option<RefreshScope>,
    /// Writes applied while that refresh was outstanding; its result may
    /// predate them
    pub(crate) written_during_refresh: Vec<BookingRequest>,
    /// Last error raised by a command, for display
    pub last_error: Option<BookingError>,
}

impl BookingState {
    /// State seeded with already-known requests
    #[must_use]
    pub fn with_requests(requests: Vec<BookingRequest>) -> Self {
        Self {
            requests,
            ..Self::default()
        }
    }

    /// All cached requests, in insertion order
    #[must_use]
    pub fn requests(&self) -> &[BookingRequest] {
        &self.requests
    }

    /// Look up one request
    #[must_use]
    pub fn get(&self, id: &RequestId) -> Option<&BookingRequest> {
        self.requests.iter().find(|r| &r.id == id)
    }

    /// Requests made by `requester`
    pub fn by_requester<'a>(&'a self, requester: &'a UserId) -> impl Iterator<Item = &'a BookingRequest> + 'a {
        self.requests.iter().filter(move |r| &r.requester_id == requester)
    }

    /// Requests addressed to `organizer`
    pub fn by_organizer<'a>(&'a self, organizer: &'a UserId) -> impl Iterator<Item = &'a BookingRequest> + 'a {
        self.requests.iter().filter(move |r| &r.organizer_id == organizer)
    }

    /// Whether a status write for `id` is outstanding
    #[must_use]
    pub fn is_in_flight(&self, id: &RequestId) -> bool {
        self.in_flight.contains(id)
    }

    /// Current refresh generation
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Generation of the refresh whose results are cached
    #[must_use]
    pub const fn loaded_generation(&self) -> u64 {
        self.loaded_generation
    }

    /// Number of cached requests
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether nothing is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Record a write so an outstanding refresh cannot roll it back
    pub(crate) fn record_write(&mut self, request: &BookingRequest) {
        if self.refreshing.is_some() {
            self.written_during_refresh.push(request.clone());
        }
    }

    /// Start tracking writes for a new refresh
    pub(crate) fn begin_refresh(&mut self, scope: RefreshScope) {
        self.generation += 1;
        self.refreshing = Some(scope);
        self.written_during_refresh.clear();
    }

    /// Stop tracking writes; nothing outstanding will be applied
    pub(crate) fn end_refresh(&mut self) {
        self.refreshing = None;
        self.written_during_refresh.clear();
    }

    /// Replace the cache with a refresh result, then replay the writes that
    /// landed after the store was read.
    pub(crate) fn apply_refresh(&mut self, generation: u64, requests: Vec<BookingRequest>) {
        let scope = self.refreshing.take();
        let written = std::mem::take(&mut self.written_during_refresh);

        self.requests = requests;
        self.loaded_generation = generation;
        for request in written {
            if scope.as_ref().is_none_or(|scope| scope.covers(&request)) {
                self.upsert(request);
            }
        }
    }

    /// Insert or replace by id, keeping the original position
    pub(crate) fn upsert(&mut self, request: BookingRequest) {
        match self.requests.iter_mut().find(|r| r.id == request.id) {
            Some(existing) => *existing = request,
            None => self.requests.push(request),
        }
    }
}
