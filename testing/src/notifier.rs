//! Email notifier that records instead of sending

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on a poisoned lock

use eventhub_core::notification::{NotificationError, Notifier, NotifyFuture, TemplateVariables};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One message handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Template the message was rendered with
    pub template_id: String,
    /// Variables passed to the template
    pub variables: TemplateVariables,
}

/// Notifier that keeps every message in memory.
///
/// With [`RecordingNotifier::set_failing`] on, sends are rejected and
/// nothing is recorded.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotifier {
    /// Create a notifier with an empty outbox
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first
    #[must_use]
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Reject every send until switched back
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Notifier for RecordingNotifier {
    fn send<'a>(&'a self, template_id: &'a str, variables: TemplateVariables) -> NotifyFuture<'a> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                return Err(NotificationError::Unavailable("mail relay down".to_string()));
            }
            self.sent.lock().unwrap().push(SentMessage {
                template_id: template_id.to_string(),
                variables,
            });
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_messages_in_order() {
        let notifier = RecordingNotifier::new();
        let mut vars = TemplateVariables::new();
        vars.insert("package_title".to_string(), "Gala".to_string());

        notifier.send("t1", vars.clone()).await.unwrap();
        notifier.send("t2", TemplateVariables::new()).await.unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].template_id, "t1");
        assert_eq!(sent[0].variables, vars);
    }

    #[tokio::test]
    async fn failing_notifier_records_nothing() {
        let notifier = RecordingNotifier::new();
        notifier.set_failing(true);

        assert!(notifier.send("t1", TemplateVariables::new()).await.is_err());
        assert!(notifier.sent().is_empty());
    }
}
