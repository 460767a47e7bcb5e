//! Email notification trait.
//!
//! Templated delivery: the caller names a template and supplies the
//! variables the template interpolates. Delivery is fire-and-forget from the
//! workflow's point of view.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Template variables, ordered for stable logging.
pub type TemplateVariables = BTreeMap<String, String>;

/// Boxed future returned by [`Notifier::send`].
pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send + 'a>>;

/// Errors reported by the notification service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The service rejected the message (unknown template, bad variables).
    #[error("Notification rejected: {0}")]
    Rejected(String),

    /// The service could not be reached.
    #[error("Notification service unavailable: {0}")]
    Unavailable(String),
}

/// Email notification abstraction.
pub trait Notifier: Send + Sync {
    /// Send one templated message.
    ///
    /// # Errors
    ///
    /// - `Rejected`: the service refused the message
    /// - `Unavailable`: network or provider failure
    fn send<'a>(&'a self, template_id: &'a str, variables: TemplateVariables) -> NotifyFuture<'a>;
}
