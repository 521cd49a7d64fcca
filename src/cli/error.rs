//! CLI error type

use std::path::PathBuf;

use file_ingest_pipeline::{ConfigError, PipelineError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read {0}: {1}")]
    FileReadError(PathBuf, String),

    #[error("Failed to write {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Failed to set up {component}: {message}")]
    Setup { component: String, message: String },
}

impl CliError {
    pub fn setup(component: impl Into<String>, message: impl ToString) -> Self {
        Self::Setup {
            component: component.into(),
            message: message.to_string(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Pipeline(e) => e.user_message(),
            _ => self.to_string(),
        }
    }

    /// Process exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) => 2,
            Self::Config(_) => 3,
            Self::Pipeline(_) => 4,
            _ => 1,
        }
    }
}
