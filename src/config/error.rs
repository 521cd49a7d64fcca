//! Configuration errors

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while parsing pipeline configuration or runtime settings
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A referenced column is not declared in the schema
    #[error("Column '{column}' not found in configured schema with columns: {available:?}")]
    UnknownColumn {
        column: String,
        available: Vec<String>,
    },

    /// Neither an explicit as-of-date column nor an `asofdate` schema column exists
    #[error("Cannot find configuration for as of date column")]
    MissingAsOfDate,

    /// A rule entry declares zero or several rule names
    #[error("Data quality rule entry must declare exactly one rule name, found {0:?}")]
    InvalidRuleEntry(Vec<String>),

    /// Threshold or weight is not numeric
    #[error("Invalid {field} for rule '{rule}': expected a number")]
    InvalidRuleValue { rule: String, field: String },

    /// Reporting column collides with a different schema column
    #[error(
        "Reporting column '{destination}' (from '{source_column}') is also found in configured schema with columns: {available:?}"
    )]
    ReportingConflict {
        destination: String,
        source_column: String,
        available: Vec<String>,
    },

    /// Two schema columns resolve to the same name
    #[error("Duplicate column '{0}' in schema")]
    DuplicateColumn(String),

    /// Data type not recognised
    #[error("Invalid data type for column '{column}': {message}")]
    InvalidDataType { column: String, message: String },

    /// Delimiter must be a single byte
    #[error("Invalid delimiter '{0}': expected a single byte character")]
    InvalidDelimiter(String),

    /// Invalid runtime setting
    #[error("Invalid setting '{field}': {message}")]
    InvalidSetting { field: String, message: String },

    /// Unsupported file extension
    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(PathBuf),

    /// IO error with path context
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ConfigError {
    pub(crate) fn unknown_column<'a>(
        column: impl Into<String>,
        available: impl Iterator<Item = &'a str>,
    ) -> Self {
        Self::UnknownColumn {
            column: column.into(),
            available: available.map(str::to_string).collect(),
        }
    }

    /// Get a user-friendly error message with hints
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::MissingAsOfDate => format!(
                "{}\n\nHint: Add an 'asofdate' column to the schema or set 'asofdate' to a schema column name.",
                self
            ),
            ConfigError::InvalidRuleEntry(_) => format!(
                "{}\n\nHint: Each entry under 'rules' is a map with a single rule name, e.g. '- blank: {{threshold: 0, weight: 0}}'.",
                self
            ),
            ConfigError::UnsupportedFormat(_) => format!(
                "{}\n\nHint: Use a .json, .yaml or .yml file.",
                self
            ),
            _ => self.to_string(),
        }
    }
}
