//! Notifiers that do not leave the process

use std::sync::{Mutex, MutexGuard};

use tracing::info;

use super::{NotificationError, NotificationKind, NotificationPayload, Notifier};

/// Keeps every payload it is asked to send
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<NotificationPayload>>,
    attempted: Mutex<Vec<NotificationPayload>>,
    /// Failure message, optionally limited to one category
    failing: Mutex<Option<(Option<NotificationKind>, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later send fail with `message`
    pub fn fail_with(&self, message: impl Into<String>) {
        *lock(&self.failing) = Some((None, message.into()));
    }

    /// Make later sends of `kind` fail with `message`
    pub fn fail_kind(&self, kind: NotificationKind, message: impl Into<String>) {
        *lock(&self.failing) = Some((Some(kind), message.into()));
    }

    /// Payloads delivered successfully
    pub fn sent(&self) -> Vec<NotificationPayload> {
        lock(&self.sent).clone()
    }

    /// Every payload handed to the notifier, delivered or not
    pub fn attempted(&self) -> Vec<NotificationPayload> {
        lock(&self.attempted).clone()
    }

    /// Payloads of one category
    pub fn sent_of(&self, kind: NotificationKind) -> Vec<NotificationPayload> {
        lock(&self.sent)
            .iter()
            .filter(|p| p.kind == kind)
            .cloned()
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, payload: &NotificationPayload) -> Result<(), NotificationError> {
        lock(&self.attempted).push(payload.clone());
        if let Some((kind, message)) = lock(&self.failing).clone()
            && kind.is_none_or(|kind| kind == payload.kind)
        {
            return Err(NotificationError::Delivery {
                topic: payload.topic_arn.clone(),
                message,
            });
        }
        lock(&self.sent).push(payload.clone());
        Ok(())
    }
}

/// Writes notifications to the log instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, payload: &NotificationPayload) -> Result<(), NotificationError> {
        info!(
            topic = %payload.topic_arn,
            status = %payload.status,
            recipients = %payload.email_to.join(","),
            subject = %payload.subject,
            body = %payload.text,
            "Notification"
        );
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
