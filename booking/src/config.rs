//! Configuration management for the booking application.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Workflow store settings
    pub workflow: WorkflowConfig,
    /// Dashboard list sizes
    pub dashboard: DashboardConfig,
    /// Organizer directory settings
    pub directory: DirectoryConfig,
    /// Email notification settings
    pub notification: NotificationConfig,
    /// Process-level settings
    pub server: ServerConfig,
}

/// Workflow store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// How long a caller waits for a command result, in milliseconds
    pub response_timeout_ms: u64,
    /// Buffered actions per observer
    pub broadcast_capacity: usize,
    /// Retries for list refresh queries
    pub refresh_max_retries: usize,
    /// First backoff delay for refresh retries, in milliseconds
    pub refresh_initial_delay_ms: u64,
}

impl WorkflowConfig {
    /// Response timeout as a `Duration`
    #[must_use]
    pub const fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: 5000,
            broadcast_capacity: 64,
            refresh_max_retries: 3,
            refresh_initial_delay_ms: 100,
        }
    }
}

/// Dashboard list sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Confirmed events shown as upcoming
    pub upcoming_limit: usize,
    /// Requests shown as recent
    pub recent_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            upcoming_limit: 3,
            recent_limit: 5,
        }
    }
}

/// Organizer directory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Write a demo organizer when the directory is empty
    pub seed_demo_organizer: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            seed_demo_organizer: true,
        }
    }
}

/// Email notification settings
///
/// Notifications are skipped when `template_id` is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Template used for new-request emails
    pub template_id: String,
}

/// Process-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Log filter (trace, debug, info, warn, error, or an `EnvFilter` directive)
    pub log_level: String,
    /// Start the Prometheus exporter
    pub metrics_enabled: bool,
    /// Prometheus scrape address
    pub metrics_addr: SocketAddr,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info,eventhub_booking=debug".to_string(),
            metrics_enabled: false,
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
            shutdown_timeout: 10,
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            workflow: WorkflowConfig {
                response_timeout_ms: parsed(
                    "WORKFLOW_RESPONSE_TIMEOUT_MS",
                    defaults.workflow.response_timeout_ms,
                ),
                broadcast_capacity: parsed(
                    "WORKFLOW_BROADCAST_CAPACITY",
                    defaults.workflow.broadcast_capacity,
                ),
                refresh_max_retries: parsed(
                    "WORKFLOW_REFRESH_MAX_RETRIES",
                    defaults.workflow.refresh_max_retries,
                ),
                refresh_initial_delay_ms: parsed(
                    "WORKFLOW_REFRESH_INITIAL_DELAY_MS",
                    defaults.workflow.refresh_initial_delay_ms,
                ),
            },
            dashboard: DashboardConfig {
                upcoming_limit: parsed("DASHBOARD_UPCOMING_LIMIT", defaults.dashboard.upcoming_limit),
                recent_limit: parsed("DASHBOARD_RECENT_LIMIT", defaults.dashboard.recent_limit),
            },
            directory: DirectoryConfig {
                seed_demo_organizer: parsed(
                    "SEED_DEMO_ORGANIZER",
                    defaults.directory.seed_demo_organizer,
                ),
            },
            notification: NotificationConfig {
                template_id: env::var("EMAIL_TEMPLATE_ID").unwrap_or_default(),
            },
            server: ServerConfig {
                log_level: env::var("RUST_LOG").unwrap_or(defaults.server.log_level),
                metrics_enabled: parsed("METRICS_ENABLED", defaults.server.metrics_enabled),
                metrics_addr: parsed("METRICS_ADDR", defaults.server.metrics_addr),
                shutdown_timeout: parsed("SHUTDOWN_TIMEOUT", defaults.server.shutdown_timeout),
            },
        }
    }
}
