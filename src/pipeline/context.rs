//! Invocation parameters of one pipeline run

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::error::{PipelineError, PipelineResult};
use crate::storage::FileLocation;

/// Format of the `processed_on` parameter, e.g. `2020-02-05T23:31:43.000Z`
pub const PROCESSED_ON_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Immutable description of the file being ingested and where results go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessContext {
    pub correlation_id: String,
    /// The landed file
    pub file: FileLocation,
    pub target_bucket: String,
    pub processed_on: String,
    pub business_process: String,
    pub pipeline_name: String,
    /// `,` or `;` separated
    pub business_email: String,
    /// `,` or `;` separated
    pub support_email: String,
    pub account_number: String,
    pub error_details_crawler: String,
    pub error_summary_crawler: String,
}

impl ProcessContext {
    /// Location of the landed file
    pub fn source(&self) -> FileLocation {
        self.file.clone()
    }

    pub fn processed_on_timestamp(&self) -> PipelineResult<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.processed_on, PROCESSED_ON_FORMAT).map_err(|source| {
            PipelineError::ProcessedOn {
                value: self.processed_on.clone(),
                source,
            }
        })
    }

    /// Fail on parameters the run cannot do without
    pub fn validate(&self) -> PipelineResult<()> {
        let required = [
            ("correlation_id", &self.correlation_id),
            ("target_bucket", &self.target_bucket),
            ("processed_on", &self.processed_on),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(PipelineError::MissingValue(name.to_string()));
        }
        self.file.ensure_complete()?;
        Ok(())
    }
}
