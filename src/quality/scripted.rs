//! Quality engine answering from a script
//!
//! Used by tests and by local runs without a quality service. The script is a
//! function of the request; every request is recorded for inspection.

use std::sync::Mutex;

use serde_json::json;

use super::{CheckResult, QualityEngine, QualityError, QualityRequest, RuleResult, RuleStatus};
use crate::frame::Frame;
use crate::storage::FileLocation;

type Script = dyn Fn(&QualityRequest<'_>) -> Result<CheckResult, QualityError> + Send + Sync;

/// A checked request as seen by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCheck {
    pub location: FileLocation,
    pub correlation_id: String,
    pub frame: Frame,
}

pub struct ScriptedQualityEngine {
    script: Box<Script>,
    checks: Mutex<Vec<RecordedCheck>>,
}

impl ScriptedQualityEngine {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&QualityRequest<'_>) -> Result<CheckResult, QualityError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            checks: Mutex::new(Vec::new()),
        }
    }

    /// Every configured rule passes with score 1.0
    pub fn passing() -> Self {
        Self::new(|request| all_rules(request, RuleStatus::Pass, true))
    }

    /// Every configured rule fails with score 0.0
    pub fn failing() -> Self {
        Self::new(|request| all_rules(request, RuleStatus::Fail, false))
    }

    /// The engine itself fails
    pub fn broken(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |_| Err(QualityError::Engine(message.clone())))
    }

    /// Requests checked so far
    pub fn checks(&self) -> Vec<RecordedCheck> {
        self.checks
            .lock()
            .map(|checks| checks.clone())
            .unwrap_or_default()
    }
}

impl QualityEngine for ScriptedQualityEngine {
    fn check(&self, request: &QualityRequest<'_>) -> Result<CheckResult, QualityError> {
        if let Ok(mut checks) = self.checks.lock() {
            checks.push(RecordedCheck {
                location: request.location.clone(),
                correlation_id: request.correlation_id.to_string(),
                frame: request.frame.clone(),
            });
        }
        (self.script)(request)
    }
}

fn all_rules(
    request: &QualityRequest<'_>,
    status: RuleStatus,
    passed: bool,
) -> Result<CheckResult, QualityError> {
    let score = if passed { 1.0 } else { 0.0 };
    let names: Vec<String> = request
        .rule_set
        .rules
        .iter()
        .filter_map(|entry| entry.keys().next().cloned())
        .collect();

    let summary = Frame::from_rows(
        ["rule", "status", "score"],
        names
            .iter()
            .map(|name| vec![json!(name), json!(status.code()), json!(score)])
            .collect(),
    )
    .map_err(|e| QualityError::InvalidResponse(e.to_string()))?;

    Ok(CheckResult {
        overall_score: score,
        passed,
        rules: names
            .into_iter()
            .map(|name| RuleResult::new(name, status, Some(score)))
            .collect(),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::NaiveDate;

    #[test]
    fn test_passing_reports_every_rule() {
        let config = Config::from_json_str(
            r#"{"schema": [{"name": "asofdate", "type": "DATE"}],
                "rules": [{"blank": {}}, {"duplicates": {}}]}"#,
        )
        .unwrap();
        let rule_set = config.rule_set();
        let frame = Frame::new(["asofdate"]);
        let location = FileLocation::new("raw", "a/b/c/Automated/f.csv");
        let request = QualityRequest {
            location: &location,
            correlation_id: "1",
            processed_on: NaiveDate::from_ymd_opt(2020, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            frame: &frame,
            rule_set: &rule_set,
        };

        let engine = ScriptedQualityEngine::passing();
        let result = engine.check(&request).unwrap();
        assert!(result.has_passed());
        assert_eq!(result.status_summary(), "blank=P:duplicates=P");
        assert_eq!(result.summary.len(), 2);
        assert_eq!(engine.checks().len(), 1);
        assert_eq!(engine.checks()[0].correlation_id, "1");
    }
}
