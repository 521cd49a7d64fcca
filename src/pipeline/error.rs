//! Error types for pipeline runs
//!
//! Every stage returns a [`PipelineError`]. The orchestrator does not inspect
//! variants directly; it matches on [`PipelineError::kind`] to pick the
//! compensation path.

use std::fmt;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::columnar::WriterError;
use crate::config::ConfigError;
use crate::frame::FrameError;
use crate::notification::NotificationError;
use crate::paths::PathError;
use crate::quality::QualityError;
use crate::storage::StorageError;
use crate::tagging::TaggingError;

/// How the orchestrator reacts to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid pipeline configuration; fatal before the run starts
    Configuration,
    /// Compensated by moving the file to the error area
    Tagging,
    /// Compensated by moving the file to the error area
    Quality,
    /// Fatal, no safe location to move the file to
    MissingValue,
    /// Publication after a passed check failed; already compensated
    Publication,
    /// Columnar copy or catalog registration failed; best effort
    Catalog,
    /// Anything else
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "ConfigurationError",
            Self::Tagging => "TaggingError",
            Self::Quality => "QualityError",
            Self::MissingValue => "MissingValueError",
            Self::Publication => "PublicationError",
            Self::Catalog => "CatalogError",
            Self::Unknown => "UnknownError",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tagging failed: {0}")]
    Tagging(#[from] TaggingError),

    #[error("Quality check failed: {0}")]
    Quality(#[from] QualityError),

    #[error("Unable to read file for quality check: {0}")]
    QualityInput(#[source] FrameError),

    #[error("Missing required value: {0}")]
    MissingValue(String),

    #[error("Publishing {location} failed")]
    Publication {
        location: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Columnar copy failed: {0}")]
    Columnar(#[from] WriterError),

    #[error("Catalog registration failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Failed to write {report} report: {source}")]
    Report {
        report: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid processed-on timestamp '{value}': {source}")]
    ProcessedOn {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Failed to hash {location}: {source}")]
    Hash {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Notification failed: {0}")]
    Notification(#[from] NotificationError),

    #[error("Invalid object-created event: {0}")]
    Event(#[source] serde_json::Error),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Tagging(e) => match e.storage_error() {
                Some(StorageError::MissingValue(_)) => ErrorKind::MissingValue,
                _ => ErrorKind::Tagging,
            },
            Self::Quality(_) | Self::QualityInput(_) => ErrorKind::Quality,
            Self::MissingValue(_) | Self::Storage(StorageError::MissingValue(_)) => {
                ErrorKind::MissingValue
            }
            Self::Publication { .. } => ErrorKind::Publication,
            Self::Columnar(_) | Self::Catalog(_) => ErrorKind::Catalog,
            _ => ErrorKind::Unknown,
        }
    }

    pub fn publication(location: impl ToString, source: PipelineError) -> Self {
        Self::Publication {
            location: location.to_string(),
            source: Box::new(source),
        }
    }

    pub fn report<E>(report: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Report {
            report: report.into(),
            source: Box::new(source),
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::MissingValue(value) => format!(
                "Missing required value: {value}\n\nHint: Check the invocation parameters; bucket and key must not be empty."
            ),
            Self::ProcessedOn { value, .. } => format!(
                "Invalid processed-on timestamp '{value}'\n\nHint: Use an ISO-8601 UTC timestamp such as 2020-02-05T23:31:43.000Z."
            ),
            Self::Path(PathError::Timestamp { format, file_name }) => format!(
                "{self}\n\nHint: The file name of '{file_name}' must embed a 14 digit timestamp matching \"{format}\"."
            ),
            Self::Publication { location, source } => format!(
                "Publishing {location} failed: {source}\n\nHint: The file was moved to the error area; check the target bucket permissions."
            ),
            Self::Event(e) => format!(
                "Invalid object-created event: {e}\n\nHint: Pass the storage notification as received, with a non-empty 'Records' list."
            ),
            _ => self.to_string(),
        }
    }
}
