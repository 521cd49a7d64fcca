//! Pipeline notifications
//!
//! Messages are rendered by [`messages`], wrapped into a
//! [`NotificationPayload`] addressed to a topic and a distribution list by
//! [`PayloadBuilder`], and delivered by a [`Notifier`].
//!
//! Success goes to the business list on the success topic; every failure
//! category goes to the support list on the error topic.

pub mod messages;
pub mod recording;
#[cfg(feature = "aws")]
pub mod sns;

use serde::Serialize;
use thiserror::Error;

use crate::config::Settings;
use crate::models::{NotificationStatus, Topic};
use crate::pipeline::ProcessContext;

pub use messages::{ErrorReport, Message, NotificationKind};
pub use recording::{LogNotifier, RecordingNotifier};
#[cfg(feature = "aws")]
pub use sns::SnsNotifier;

/// Errors raised while delivering a notification
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to deliver notification to {topic}: {message}")]
    Delivery { topic: String, message: String },
}

/// Message published to a notification topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    pub topic_arn: String,
    pub process: String,
    pub pipeline_name: String,
    pub email_to: Vec<String>,
    pub correlation_id: String,
    pub status: String,
    pub subject: String,
    pub html: String,
    pub text: String,
    #[serde(skip)]
    pub kind: NotificationKind,
}

/// Delivers notification payloads
pub trait Notifier: Send + Sync {
    fn send(&self, payload: &NotificationPayload) -> Result<(), NotificationError>;
}

/// Addresses messages to topics and distribution lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadBuilder {
    region: String,
    success_topic: String,
    error_topic: String,
}

impl PayloadBuilder {
    pub fn new(
        region: impl Into<String>,
        success_topic: impl Into<String>,
        error_topic: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            success_topic: success_topic.into(),
            error_topic: error_topic.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.region.clone(),
            settings.topic_name(Topic::Success),
            settings.topic_name(Topic::Error),
        )
    }

    /// `arn:aws:sns:{region}:{account}:{topic}`
    pub fn topic_arn(&self, account_number: &str, topic: Topic) -> String {
        let name = match topic {
            Topic::Success => &self.success_topic,
            Topic::Error => &self.error_topic,
        };
        format!("arn:aws:sns:{}:{}:{}", self.region, account_number, name)
    }

    pub fn build(&self, context: &ProcessContext, message: Message) -> NotificationPayload {
        let (topic, emails, status) = if message.kind.is_success() {
            (Topic::Success, &context.business_email, NotificationStatus::Success)
        } else {
            (Topic::Error, &context.support_email, NotificationStatus::Failed)
        };

        NotificationPayload {
            topic_arn: self.topic_arn(&context.account_number, topic),
            process: context.business_process.clone(),
            pipeline_name: context.pipeline_name.clone(),
            email_to: split_emails(emails),
            correlation_id: context.correlation_id.clone(),
            status: status.as_str().to_string(),
            html: format!(
                "<html><head></head><body><h1>{}</h1><p>{}</body></html>",
                message.subject, message.body
            ),
            text: format!("{}\r\n{}", message.subject, message.body),
            subject: message.subject,
            kind: message.kind,
        }
    }
}

/// Split a `,` or `;` separated address list
pub fn split_emails(list: &str) -> Vec<String> {
    list.split([',', ';'])
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}
