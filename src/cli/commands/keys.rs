//! Keys command implementation

use file_ingest_pipeline::models::ReportLevel;
use file_ingest_pipeline::paths::{self, PipelineProcessFolder};
use serde::Serialize;

use crate::error::CliError;
use crate::output;

/// Staging locations of a landed file
#[derive(Debug, Serialize)]
pub struct StagingKeys {
    pub to_be_processed: String,
    pub processed: String,
    pub error: String,
    pub error_file: String,
}

/// Every key the pipeline derives for one file
#[derive(Debug, Serialize)]
pub struct KeyReport {
    pub file_key: String,
    pub target_key: String,
    pub parquet_key: String,
    pub partition_values: Vec<String>,
    pub summary_report_key: String,
    pub detailed_report_key: String,
    pub error_partition_values: Vec<String>,
    pub staging: Option<StagingKeys>,
}

impl KeyReport {
    pub fn derive(file_key: &str, format: &str, processed_on: Option<&str>) -> Result<Self, CliError> {
        let path_error = |e: paths::PathError| CliError::InvalidArgument(e.to_string());

        let staging = match processed_on {
            Some(processed_on) => {
                let folder = PipelineProcessFolder::new(file_key, processed_on).map_err(path_error)?;
                Some(StagingKeys {
                    to_be_processed: folder.to_be_processed(),
                    processed: folder.processed(),
                    error: folder.error(),
                    error_file: folder.error_file(),
                })
            }
            None => None,
        };

        Ok(Self {
            file_key: file_key.to_string(),
            target_key: paths::target_key(file_key, format).map_err(path_error)?,
            parquet_key: paths::parquet_key(file_key, format).map_err(path_error)?,
            partition_values: paths::partition_values(file_key, format)
                .map_err(path_error)?
                .to_vec(),
            summary_report_key: paths::error_key(file_key, format, ReportLevel::Summary)
                .map_err(path_error)?,
            detailed_report_key: paths::error_key(file_key, format, ReportLevel::Detailed)
                .map_err(path_error)?,
            error_partition_values: paths::error_partition_values(file_key, format)
                .map_err(path_error)?,
            staging,
        })
    }
}

/// Handle the `keys` command
pub fn handle_keys(
    file_key: &str,
    format: &str,
    processed_on: Option<&str>,
    json: bool,
) -> Result<(), CliError> {
    let report = KeyReport::derive(file_key, format, processed_on)?;
    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
        println!("{}", rendered);
    } else {
        print!("{}", output::format_keys(&report));
    }
    Ok(())
}
