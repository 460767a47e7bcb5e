//! Prometheus exporter and runtime metrics.
//!
//! The runtime records retry attempts, recoveries and exhaustion, plus
//! `store.*` counters on every send. Applications describe and record their
//! own business metrics on top of the same recorder.
//!
//! # Example
//!
//! ```rust,no_run
//! use eventhub_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Scrape http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::describe_counter;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;

pub use metrics::{counter, histogram};

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// The exporter could not be configured
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// A global recorder could not be installed
    #[error("Failed to install metrics recorder: {0}")]
    Install(String),
}

/// Prometheus exporter with an HTTP scrape endpoint.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create an exporter bound to `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the global recorder and spawn the scrape listener.
    ///
    /// Must be called from within a Tokio runtime. Installing twice in one
    /// process (tests) is tolerated: the second call logs and returns `Ok`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or installed.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let handle = recorder.handle();

        if let Err(e) = metrics::set_global_recorder(recorder) {
            tracing::warn!(error = %e, "Metrics recorder already installed, skipping");
            return Ok(());
        }

        let addr = self.addr;
        tokio::spawn(async move {
            if exporter.await.is_err() {
                tracing::error!(addr = %addr, "Metrics listener stopped");
            }
        });

        tracing::info!(addr = %self.addr, "Metrics available at http://{}/metrics", self.addr);
        self.handle = Some(handle);
        Ok(())
    }

    /// Handle to the installed recorder, if this server installed it.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    describe_counter!("retry_attempts_total", "Retries scheduled after a failure");
    describe_counter!("retry_recovered_total", "Operations that succeeded after retrying");
    describe_counter!("retry_exhausted_total", "Operations that failed after every retry");
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// A retry was scheduled.
    pub fn record_attempt(operation: &'static str) {
        counter!("retry_attempts_total", "operation" => operation).increment(1);
    }

    /// An operation succeeded after at least one retry.
    pub fn record_recovered(operation: &'static str) {
        counter!("retry_recovered_total", "operation" => operation).increment(1);
    }

    /// An operation failed after exhausting its retries.
    pub fn record_exhausted(operation: &'static str) {
        counter!("retry_exhausted_total", "operation" => operation).increment(1);
    }
}
