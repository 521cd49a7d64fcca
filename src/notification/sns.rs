//! Amazon SNS notifier
//!
//! Publishes the JSON encoded payload to its topic; a subscriber turns it into
//! e-mail.

use std::sync::Arc;

use aws_sdk_sns::Client as SnsClient;
use aws_sdk_sns::error::DisplayErrorContext;
use tracing::debug;

use super::{NotificationError, NotificationPayload, Notifier};
use crate::aws::AwsContext;

/// SNS rejects longer subjects
const MAX_SUBJECT_CHARS: usize = 100;

pub struct SnsNotifier {
    context: Arc<AwsContext>,
    client: SnsClient,
}

impl SnsNotifier {
    pub fn new(context: Arc<AwsContext>) -> Self {
        let client = SnsClient::new(context.sdk_config());
        Self { context, client }
    }
}

impl Notifier for SnsNotifier {
    fn send(&self, payload: &NotificationPayload) -> Result<(), NotificationError> {
        let message = serde_json::to_string(payload)?;
        let subject: String = payload.subject.chars().take(MAX_SUBJECT_CHARS).collect();

        let response = self
            .context
            .block_on(
                self.client
                    .publish()
                    .topic_arn(&payload.topic_arn)
                    .subject(subject)
                    .message(message)
                    .send(),
            )
            .map_err(|e| NotificationError::Delivery {
                topic: payload.topic_arn.clone(),
                message: DisplayErrorContext(e).to_string(),
            })?;

        debug!(
            topic = %payload.topic_arn,
            message_id = response.message_id().unwrap_or_default(),
            "Published notification"
        );
        Ok(())
    }
}
