//! Business metrics for the booking workflow.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `booking_requests_created_total`: requests persisted
//! - `booking_transitions_total{to}`: status changes persisted, by target
//! - `booking_rejections_total{kind}`: commands refused, by error kind
//!
//! ## Histograms
//! - `document_store_operation_duration_seconds{collection, operation}`

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Register descriptions for every booking metric.
///
/// Call once at startup, after the recorder is installed.
pub fn register_booking_metrics() {
    describe_counter!(
        "booking_requests_created_total",
        "Booking requests persisted"
    );
    describe_counter!(
        "booking_transitions_total",
        "Status transitions persisted, labelled by target status"
    );
    describe_counter!(
        "booking_rejections_total",
        "Commands rejected, labelled by error kind"
    );
    describe_histogram!(
        "document_store_operation_duration_seconds",
        "Latency of document store calls"
    );

    tracing::info!("Booking metrics registered");
}

/// Workflow metrics recorder.
pub struct WorkflowMetrics;

impl WorkflowMetrics {
    /// A booking request was persisted.
    pub fn record_created() {
        counter!("booking_requests_created_total").increment(1);
    }

    /// A status change was persisted.
    pub fn record_transition(to: &'static str) {
        counter!("booking_transitions_total", "to" => to).increment(1);
    }

    /// A command was rejected. `kind` is a short error label.
    pub fn record_rejection(kind: &'static str) {
        counter!("booking_rejections_total", "kind" => kind).increment(1);
    }
}

/// Document store metrics recorder.
pub struct DocumentStoreMetrics;

impl DocumentStoreMetrics {
    /// Record one call.
    pub fn record_operation(collection: &'static str, operation: &'static str, duration: Duration) {
        histogram!(
            "document_store_operation_duration_seconds",
            "collection" => collection,
            "operation" => operation
        )
        .record(duration.as_secs_f64());
    }
}
