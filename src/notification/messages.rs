//! Subjects and bodies of pipeline notifications

use std::error::Error;
use std::fmt::Display;

use crate::quality::RuleResult;

/// Category of a notification, which also decides its audience
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    PipelineFailed,
    UnknownError,
    CatalogError,
    RuleErrors,
}

impl NotificationKind {
    pub fn is_success(&self) -> bool {
        matches!(self, NotificationKind::Success)
    }
}

/// Printable form of an error: kind, message and source chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub kind: String,
    pub message: String,
    pub trace: String,
}

impl ErrorReport {
    pub fn new(kind: impl Display, error: &dyn Error) -> Self {
        let mut trace = vec![error.to_string()];
        let mut source = error.source();
        while let Some(cause) = source {
            trace.push(format!("Caused by: {}", cause));
            source = cause.source();
        }
        Self {
            kind: kind.to_string(),
            message: error.to_string(),
            trace: trace.join("\n"),
        }
    }

    /// `Kind: message`
    pub fn describe(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }
}

/// Subject and message body of one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: NotificationKind,
    pub subject: String,
    pub body: String,
}

pub fn success(process: &str, pipeline_name: &str, uri: &str) -> Message {
    Message {
        kind: NotificationKind::Success,
        subject: format!("{} Successful", process),
        body: format!(
            "Successfully processed '{}' - '{}' data is now available at '{}'. ",
            pipeline_name, process, uri
        ),
    }
}

pub fn pipeline_failed(process: &str, pipeline_name: &str, uri: &str) -> Message {
    Message {
        kind: NotificationKind::PipelineFailed,
        subject: format!("{} Failed", process),
        body: format!(
            "The business_process '{}' has reported a failure for data provider '{}'.\r\n Please review file at '{}'.",
            process, pipeline_name, uri
        ),
    }
}

pub fn unknown_error(process: &str, pipeline_name: &str, uri: &str, error: &ErrorReport) -> Message {
    Message {
        kind: NotificationKind::UnknownError,
        subject: format!("{} Failed", process),
        body: format!(
            "The '{}' has reported an unknown failure for data provider '{}' and file '{}'. <br /> Please see the exception below.<br /><br />{}<br /><br />Traceback (most recent call last):<br /><pre>{}</pre>",
            process,
            pipeline_name,
            uri,
            error.describe(),
            error.trace
        ),
    }
}

pub fn catalog_error(process: &str, pipeline_name: &str, uri: &str, error: &ErrorReport) -> Message {
    Message {
        kind: NotificationKind::CatalogError,
        subject: format!("{} Failed", process),
        body: format!(
            "Successfully processed '{}' - '{}' data is now available at '{}'. However, it's unable to create Parquet/Catalog.<br /> Please see the exception below.<br /><br />{}<br /><br />Traceback (most recent call last):<br /><pre>{}</pre>",
            pipeline_name,
            process,
            uri,
            error.describe(),
            error.trace
        ),
    }
}

/// One message listing every rule that could not run
pub fn rule_errors(process: &str, pipeline_name: &str, uri: &str, rules: &[&RuleResult]) -> Message {
    let details = rules
        .iter()
        .map(|rule| {
            let (exception, trace) = match &rule.exception {
                Some(e) => (e.describe(), e.trace.as_str()),
                None => ("Unknown".to_string(), ""),
            };
            format!("Rule: {}\nError:{}\n\nDetails:{}", rule.name, exception, trace)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Message {
        kind: NotificationKind::RuleErrors,
        subject: format!("{} rule errors", process),
        body: format!(
            "For {} and file {}<br/>the following quality rules failed due to program error <br/><pre>{}</pre>",
            pipeline_name, uri, details
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::{RuleException, RuleStatus};

    #[derive(Debug, thiserror::Error)]
    #[error("outer")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn test_success_message() {
        let message = success("Everest", "holdings", "s3://curated/a.csv");
        assert_eq!(message.subject, "Everest Successful");
        assert_eq!(
            message.body,
            "Successfully processed 'holdings' - 'Everest' data is now available at 's3://curated/a.csv'. "
        );
    }

    #[test]
    fn test_error_report_walks_sources() {
        let error = Outer(std::io::Error::other("disk full"));
        let report = ErrorReport::new("Publication", &error);
        assert_eq!(report.describe(), "Publication: outer");
        assert_eq!(report.trace, "outer\nCaused by: disk full");

        let message = unknown_error("Everest", "holdings", "s3://raw/a.csv", &report);
        assert!(message.body.contains("Publication: outer"));
        assert!(message.body.contains("<pre>outer\nCaused by: disk full</pre>"));
    }

    #[test]
    fn test_rule_errors_name_every_rule() {
        let first = RuleResult::new("lookup", RuleStatus::Error, None).with_exception(RuleException {
            kind: "KeyError".to_string(),
            message: "'code'".to_string(),
            trace: "line 1".to_string(),
        });
        let second = RuleResult::new("regex", RuleStatus::Error, None);
        let message = rule_errors("Everest", "holdings", "s3://raw/a.csv", &[&first, &second]);

        assert_eq!(message.subject, "Everest rule errors");
        assert!(message.body.contains(
            "Rule: lookup\nError:KeyError: 'code'\n\nDetails:line 1\n\nRule: regex\nError:Unknown"
        ));
    }
}
