//! Output formatting for CLI

use std::path::Path;

use file_ingest_pipeline::Config;
use file_ingest_pipeline::config::AsOfDateSource;
use serde::Serialize;

use crate::commands::keys::KeyReport;
use crate::error::CliError;

/// Write `value` as pretty printed JSON
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::FileWriteError(path.to_path_buf(), e.to_string()))?;
    std::fs::write(path, json).map_err(|e| CliError::FileWriteError(path.to_path_buf(), e.to_string()))
}

/// Human readable summary of a pipeline configuration
pub fn format_config_summary(config: &Config) -> String {
    let mut output = String::new();

    output.push_str(&format!("\n✅ Parsed {} column(s):\n", config.schema().len()));
    for column in config.schema() {
        let mut line = format!("  - {}: {}", column.name, column.data_type);
        if column.name_in_file != column.name {
            line.push_str(&format!(" (file: {:?})", column.name_in_file));
        }
        if column.is_calculated {
            line.push_str(" [calculated]");
        }
        output.push_str(&line);
        output.push('\n');
    }

    let as_of_date = match config.as_of_date() {
        AsOfDateSource::FileTimestamp => "file name timestamp".to_string(),
        AsOfDateSource::DataframeColumn(column) => format!("column {:?}", column),
    };
    output.push_str(&format!("\nAs-of-date:  {}\n", as_of_date));
    output.push_str(&format!(
        "Delimiter:   {:?}\n",
        char::from(config.delimiter)
    ));
    output.push_str(&format!("Timestamp:   {}\n", config.file_name_timestamp));

    output.push_str(&format!("\nRules ({}):\n", config.rules().len()));
    for rule in config.rules() {
        output.push_str(&format!(
            "  - {} (threshold {}, weight {})\n",
            rule.name, rule.threshold, rule.weight
        ));
    }

    if !config.error_reporting().is_empty() {
        output.push_str("\nError reporting:\n");
        for column in config.error_reporting() {
            output.push_str(&format!("  - {} <- {}\n", column.destination, column.source));
        }
    }

    let published: Vec<String> = config
        .published_columns()
        .iter()
        .map(|c| format!("{}:{}", c.name, c.data_type.catalog_type()))
        .collect();
    output.push_str(&format!("\nPublished columns: {}\n", published.join(", ")));
    output
}

/// Derived keys of a landed file
pub fn format_keys(report: &KeyReport) -> String {
    let mut output = String::new();
    output.push_str(&format!("File:              {}\n", report.file_key));
    output.push_str(&format!("Target key:        {}\n", report.target_key));
    output.push_str(&format!("Parquet key:       {}\n", report.parquet_key));
    output.push_str(&format!("Partition values:  {}\n", report.partition_values.join(", ")));
    output.push_str(&format!("Summary report:    {}\n", report.summary_report_key));
    output.push_str(&format!("Detailed report:   {}\n", report.detailed_report_key));
    output.push_str(&format!(
        "Report partitions: {}\n",
        report.error_partition_values.join(", ")
    ));
    if let Some(folders) = &report.staging {
        output.push_str(&format!("To be processed:   {}\n", folders.to_be_processed));
        output.push_str(&format!("Processed:         {}\n", folders.processed));
        output.push_str(&format!("Error:             {}\n", folders.error));
        output.push_str(&format!("Error details:     {}\n", folders.error_file));
    }
    output
}
