//! Enumerations shared across the pipeline

use std::fmt;

use serde::{Deserialize, Serialize};

/// Object tag keys the pipeline is allowed to write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKey {
    Hash,
    #[serde(rename = "overall_quality_score")]
    QualityScore,
    Status,
    CorrelationId,
    QualityScoreSummary,
    QualityStatusSummary,
}

impl TagKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKey::Hash => "hash",
            TagKey::QualityScore => "overall_quality_score",
            TagKey::Status => "status",
            TagKey::CorrelationId => "correlation_id",
            TagKey::QualityScoreSummary => "quality_score_summary",
            TagKey::QualityStatusSummary => "quality_status_summary",
        }
    }

    pub fn all() -> &'static [TagKey] {
        &[
            TagKey::Hash,
            TagKey::QualityScore,
            TagKey::Status,
            TagKey::CorrelationId,
            TagKey::QualityScoreSummary,
            TagKey::QualityStatusSummary,
        ]
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values written under the `status` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Processed,
    Failed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Processed => "processed",
            FileStatus::Failed => "failed",
        }
    }
}

/// Granularity of a data quality error report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Detailed,
    Summary,
}

impl ReportLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportLevel::Detailed => "detailed",
            ReportLevel::Summary => "summary",
        }
    }
}

impl fmt::Display for ReportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery status carried by a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationStatus {
    Success,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Success => "Success",
            NotificationStatus::Failed => "Failed",
        }
    }
}

/// Notification topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Success,
    Error,
}
