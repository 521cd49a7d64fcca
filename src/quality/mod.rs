//! Data quality checks
//!
//! The rules themselves are evaluated by an external engine behind the
//! [`QualityEngine`] trait. This module defines the request handed to the
//! engine and the [`CheckResult`] it returns, plus the summaries the pipeline
//! derives from a result (tag values, error reports, erroring rules).
//!
//! Whether a check passed is decided by the engine; [`CheckResult::has_passed`]
//! reports that decision without recomputing it.

#[cfg(feature = "http-quality")]
pub mod http;
pub mod scripted;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::{ROW_INDEX_COLUMN, RawConfig};
use crate::frame::Frame;
use crate::storage::FileLocation;

#[cfg(feature = "http-quality")]
pub use http::HttpQualityEngine;
pub use scripted::ScriptedQualityEngine;

/// Errors raised by a quality engine
#[derive(Error, Debug)]
pub enum QualityError {
    #[error("Quality engine failed: {0}")]
    Engine(String),

    #[error("Quality engine unreachable: {0}")]
    Transport(String),

    #[error("Invalid quality engine response: {0}")]
    InvalidResponse(String),
}

/// Outcome of one rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleStatus {
    /// The rule ran and its threshold was met
    Pass,
    /// The rule ran and found violations
    Fail,
    /// The rule could not run
    Error,
}

impl RuleStatus {
    /// One letter code used in tag summaries
    pub fn code(&self) -> &'static str {
        match self {
            RuleStatus::Pass => "P",
            RuleStatus::Fail => "F",
            RuleStatus::Error => "E",
        }
    }
}

/// Why a rule could not run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleException {
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub trace: String,
}

impl RuleException {
    /// `Kind: message`
    pub fn describe(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub name: String,
    pub status: RuleStatus,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub exception: Option<RuleException>,
    /// Offending rows, with a `row_index` column
    #[serde(default)]
    pub errors: Option<Frame>,
}

impl RuleResult {
    pub fn new(name: impl Into<String>, status: RuleStatus, score: Option<f64>) -> Self {
        Self {
            name: name.into(),
            status,
            score,
            exception: None,
            errors: None,
        }
    }

    pub fn with_errors(mut self, errors: Frame) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_exception(mut self, exception: RuleException) -> Self {
        self.exception = Some(exception);
        self
    }
}

/// Result of a quality check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub overall_score: f64,
    pub passed: bool,
    /// In rule declaration order
    pub rules: Vec<RuleResult>,
    #[serde(default)]
    pub summary: Frame,
}

impl CheckResult {
    /// Decode an engine's JSON answer
    ///
    /// Frames whose rows do not match their columns are rejected here.
    pub fn from_json(body: &[u8]) -> Result<Self, QualityError> {
        serde_json::from_slice(body).map_err(|e| QualityError::InvalidResponse(e.to_string()))
    }

    pub fn has_passed(&self) -> bool {
        self.passed
    }

    /// `rule=score` pairs joined by `:`; rules without a score are left out
    pub fn score_summary(&self) -> String {
        self.rules
            .iter()
            .filter_map(|r| r.score.map(|score| format!("{}={:?}", r.name, score)))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// `rule=P|F|E` pairs joined by `:`
    pub fn status_summary(&self) -> String {
        self.rules
            .iter()
            .map(|r| format!("{}={}", r.name, r.status.code()))
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Rules that could not run
    pub fn rule_errors(&self) -> Vec<&RuleResult> {
        self.rules
            .iter()
            .filter(|r| r.status == RuleStatus::Error)
            .collect()
    }

    /// Offending rows of every rule stacked together, `None` when there are none
    pub fn detailed_report(&self) -> Option<Frame> {
        let frames: Vec<&Frame> = self
            .rules
            .iter()
            .filter_map(|r| r.errors.as_ref())
            .filter(|f| !f.is_empty())
            .collect();
        if frames.is_empty() {
            None
        } else {
            Some(Frame::concat(frames))
        }
    }

    /// Row positions listed in the detailed report
    pub fn error_rows(&self) -> Vec<usize> {
        let Some(report) = self.detailed_report() else {
            return Vec::new();
        };
        let Ok(values) = report.column(ROW_INDEX_COLUMN) else {
            return Vec::new();
        };
        values.into_iter().filter_map(row_position).collect()
    }
}

fn row_position(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Everything a quality engine needs to check one file
#[derive(Debug, Clone, Serialize)]
pub struct QualityRequest<'a> {
    pub location: &'a FileLocation,
    pub correlation_id: &'a str,
    pub processed_on: NaiveDateTime,
    pub frame: &'a Frame,
    pub rule_set: &'a RawConfig,
}

/// Evaluates quality rules against a frame
pub trait QualityEngine: Send + Sync {
    fn check(&self, request: &QualityRequest<'_>) -> Result<CheckResult, QualityError>;
}
