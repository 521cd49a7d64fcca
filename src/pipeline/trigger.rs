//! Run parameters from an object-created notification
//!
//! A landed file announces itself through a storage event. The file location
//! and landing time come from the first event record; everything describing
//! the pipeline comes from the environment the trigger runs in.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::context::ProcessContext;
use super::error::{PipelineError, PipelineResult};
use crate::storage::FileLocation;

pub const BUSINESS_PROCESS_VAR: &str = "BUSINESS_PROCESS";
pub const PIPELINE_NAME_VAR: &str = "PIPELINE_NAME";
pub const BUSINESS_EMAIL_VAR: &str = "BUSINESS_EMAIL";
pub const SUPPORT_EMAIL_VAR: &str = "SUPPORT_EMAIL";
pub const TARGET_BUCKET_VAR: &str = "TARGET_BUCKET";
pub const ACCOUNT_NUMBER_VAR: &str = "AWS_ACCOUNT_NO";
pub const ERROR_DETAILS_CRAWLER_VAR: &str = "ERROR_DETAILS_CRAWLER_NAME";
pub const ERROR_SUMMARY_CRAWLER_VAR: &str = "ERROR_SUMMARY_CRAWLER_NAME";
pub const LOG_LEVEL_VAR: &str = "LOG_LEVEL";

#[derive(Debug, Deserialize)]
struct StorageEvent {
    #[serde(rename = "Records", default)]
    records: Vec<EventRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventRecord {
    #[serde(default)]
    event_time: Option<String>,
    #[serde(default)]
    s3: Option<S3Entity>,
}

#[derive(Debug, Default, Deserialize)]
struct S3Entity {
    #[serde(default)]
    bucket: Option<BucketEntity>,
    #[serde(default)]
    object: Option<ObjectEntity>,
}

#[derive(Debug, Deserialize)]
struct BucketEntity {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectEntity {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    version_id: Option<String>,
}

/// Pipeline description read from environment variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerEnvironment {
    pub business_process: Option<String>,
    pub pipeline_name: Option<String>,
    pub business_email: Option<String>,
    pub support_email: Option<String>,
    pub target_bucket: Option<String>,
    pub account_number: Option<String>,
    pub error_details_crawler: Option<String>,
    pub error_summary_crawler: Option<String>,
    pub log_level: Option<String>,
}

impl TriggerEnvironment {
    /// Read every variable through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            business_process: get(BUSINESS_PROCESS_VAR),
            pipeline_name: get(PIPELINE_NAME_VAR),
            business_email: get(BUSINESS_EMAIL_VAR),
            support_email: get(SUPPORT_EMAIL_VAR),
            target_bucket: get(TARGET_BUCKET_VAR),
            account_number: get(ACCOUNT_NUMBER_VAR),
            error_details_crawler: get(ERROR_DETAILS_CRAWLER_VAR),
            error_summary_crawler: get(ERROR_SUMMARY_CRAWLER_VAR),
            log_level: get(LOG_LEVEL_VAR),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Log filter for `LOG_LEVEL`, `info` when unset or unknown
    pub fn log_filter(&self) -> &'static str {
        match self
            .log_level
            .as_deref()
            .map(|level| level.trim().to_ascii_uppercase())
            .as_deref()
        {
            Some("DEBUG") => "debug",
            Some("WARNING") | Some("WARN") => "warn",
            Some("ERROR") | Some("CRITICAL") => "error",
            _ => "info",
        }
    }

    fn required(value: &Option<String>, name: &str) -> PipelineResult<String> {
        value
            .clone()
            .ok_or_else(|| PipelineError::MissingValue(format!("environment variable {name}")))
    }
}

impl ProcessContext {
    /// Build the run parameters of the file announced by `event`
    ///
    /// `request_id` of the triggering invocation becomes the correlation id
    /// and the event time the processed-on timestamp. A record without a
    /// version id addresses the latest version.
    pub fn from_event(
        event: &Value,
        environment: &TriggerEnvironment,
        request_id: &str,
    ) -> PipelineResult<Self> {
        let event = StorageEvent::deserialize(event).map_err(PipelineError::Event)?;
        let record = event
            .records
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::MissingValue("Records[0]".to_string()))?;

        let s3 = record.s3.unwrap_or_default();
        let bucket = s3
            .bucket
            .and_then(|b| b.name)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| PipelineError::MissingValue("Records[0].s3.bucket.name".to_string()))?;
        let (key, version_id) = match s3.object {
            Some(object) => (object.key, object.version_id),
            None => (None, None),
        };
        let key = key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| PipelineError::MissingValue("Records[0].s3.object.key".to_string()))?;
        let processed_on = record
            .event_time
            .ok_or_else(|| PipelineError::MissingValue("Records[0].eventTime".to_string()))?;

        debug!(bucket = %bucket, key = %key, version = ?version_id, "Parsed object-created event");

        Ok(Self {
            correlation_id: request_id.to_string(),
            file: FileLocation::new(bucket, key).with_version(version_id),
            target_bucket: TriggerEnvironment::required(&environment.target_bucket, TARGET_BUCKET_VAR)?,
            processed_on,
            business_process: TriggerEnvironment::required(
                &environment.business_process,
                BUSINESS_PROCESS_VAR,
            )?,
            pipeline_name: TriggerEnvironment::required(&environment.pipeline_name, PIPELINE_NAME_VAR)?,
            business_email: environment.business_email.clone().unwrap_or_default(),
            support_email: environment.support_email.clone().unwrap_or_default(),
            account_number: TriggerEnvironment::required(
                &environment.account_number,
                ACCOUNT_NUMBER_VAR,
            )?,
            error_details_crawler: environment.error_details_crawler.clone().unwrap_or_default(),
            error_summary_crawler: environment.error_summary_crawler.clone().unwrap_or_default(),
        })
    }
}
