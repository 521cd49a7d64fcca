//! Runtime settings
//!
//! Deployment-level values that are the same for every file a pipeline
//! processes: cloud region, notification topics, catalog database and the
//! location of the quality service. Loaded from TOML; every field has a default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::models::Topic;

/// Runtime settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Cloud region used for topic ARNs and SDK clients
    pub region: String,
    /// Topic receiving success notifications
    pub success_topic: String,
    /// Topic receiving every failure notification
    pub error_topic: String,
    /// Catalog database holding published tables and error report tables
    pub catalog_database: String,
    /// Base URL of the quality service
    pub quality_service_url: Option<String>,
    /// Request timeout for the quality service, in seconds
    pub quality_timeout_secs: u64,
    /// Root directory of the local object store
    pub storage_root: Option<PathBuf>,
    /// Custom endpoint for S3-compatible storage
    pub s3_endpoint: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: "eu-west-1".to_string(),
            success_topic: "success-notifications".to_string(),
            error_topic: "error-notifications".to_string(),
            catalog_database: "curated".to_string(),
            quality_service_url: None,
            quality_timeout_secs: 30,
            storage_root: None,
            s3_endpoint: None,
        }
    }
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn topic_name(&self, topic: Topic) -> &str {
        match topic {
            Topic::Success => &self.success_topic,
            Topic::Error => &self.error_topic,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("region", &self.region),
            ("success_topic", &self.success_topic),
            ("error_topic", &self.error_topic),
            ("catalog_database", &self.catalog_database),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidSetting {
                    field: field.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}
