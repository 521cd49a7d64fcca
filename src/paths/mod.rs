//! Object key derivation
//!
//! Every key the pipeline writes is derived from the landed file key and the
//! timestamp embedded in its file name. Landed keys look like
//! `{area}/{process}/{source}/Automated/{file}`; the first three segments form
//! the *root folder* and name the business area, business process and data
//! source.
//!
//! All functions here are pure string transforms.

mod process_folder;

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::ReportLevel;

pub use process_folder::PipelineProcessFolder;

static TIMESTAMP_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{14}").unwrap());

/// Errors raised while deriving keys
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error(
        "Unable to parse timestamp from file name. Expected format is \"{format}\" and the file name is \"{file_name}\""
    )]
    Timestamp { format: String, file_name: String },

    #[error("Key '{0}' must start with area/process/source folders")]
    TooShallow(String),

    #[error("Key '{0}' is not under an 'Automated' folder")]
    NotAutomated(String),

    #[error("Invalid processed-on timestamp '{0}': expected it to start with YYYY-MM")]
    ProcessedOn(String),
}

/// Year, year-month and year-month-day partition values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionValues {
    pub year: String,
    pub year_month: String,
    pub year_month_day: String,
}

impl PartitionValues {
    pub fn from_timestamp(timestamp: &NaiveDateTime) -> Self {
        Self {
            year: timestamp.format("%Y").to_string(),
            year_month: timestamp.format("%Y%m").to_string(),
            year_month_day: timestamp.format("%Y%m%d").to_string(),
        }
    }

    pub fn to_vec(&self) -> Vec<String> {
        vec![
            self.year.clone(),
            self.year_month.clone(),
            self.year_month_day.clone(),
        ]
    }
}

/// Business area, process and data source named by the root folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessDetails {
    pub area: String,
    pub process: String,
    pub source: String,
}

/// Non-empty `/` separated segments of a key
fn segments(key: &str) -> impl Iterator<Item = &str> {
    key.split('/').filter(|p| !p.is_empty())
}

/// First three segments of the key
pub fn root_folder(key: &str) -> String {
    segments(key).take(3).collect::<Vec<_>>().join("/")
}

/// Last segment of the key; without extension everything from the first `.` is dropped
pub fn file_name(key: &str, with_extension: bool) -> &str {
    let name = key.rsplit('/').next().unwrap_or(key);
    if with_extension {
        name
    } else {
        name.split('.').next().unwrap_or(name)
    }
}

/// File name with only its last extension removed
pub fn file_stem(key: &str) -> &str {
    let name = file_name(key, true);
    match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    }
}

/// Timestamp embedded in the file name as a 14 digit run
pub fn embedded_timestamp(key: &str, format: &str) -> Result<NaiveDateTime, PathError> {
    let error = || PathError::Timestamp {
        format: format.to_string(),
        file_name: key.to_string(),
    };
    let digits = TIMESTAMP_PATTERN
        .find(file_name(key, true))
        .ok_or_else(error)?;
    NaiveDateTime::parse_from_str(digits.as_str(), format).map_err(|_| error())
}

pub fn partition_values(key: &str, format: &str) -> Result<PartitionValues, PathError> {
    Ok(PartitionValues::from_timestamp(&embedded_timestamp(key, format)?))
}

/// `{root}/{year}/{year}{month}/{file}`
pub fn target_key(key: &str, format: &str) -> Result<String, PathError> {
    let partitions = partition_values(key, format)?;
    Ok(format!(
        "{}/{}/{}/{}",
        root_folder(key),
        partitions.year,
        partitions.year_month,
        file_name(key, true)
    ))
}

pub fn business_details(key: &str) -> Result<BusinessDetails, PathError> {
    let mut parts = segments(key);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(area), Some(process), Some(source)) => Ok(BusinessDetails {
            area: area.to_string(),
            process: process.to_string(),
            source: source.to_string(),
        }),
        _ => Err(PathError::TooShallow(key.to_string())),
    }
}

/// Key of a data quality error report
///
/// `{area}/error_reporting/{level}/year={y}/year_month={y}{m}/process={process}/data_source={source}/{stem}.parquet.snappy`
pub fn error_key(key: &str, format: &str, level: ReportLevel) -> Result<String, PathError> {
    let details = business_details(key)?;
    let partitions = partition_values(key, format)?;
    Ok(format!(
        "{}/error_reporting/{}/year={}/year_month={}/process={}/data_source={}/{}.parquet.snappy",
        details.area,
        level,
        partitions.year,
        partitions.year_month,
        details.process,
        details.source,
        file_stem(key)
    ))
}

/// Partition values of an error report table: year, year-month, process, source
pub fn error_partition_values(key: &str, format: &str) -> Result<Vec<String>, PathError> {
    let details = business_details(key)?;
    let partitions = partition_values(key, format)?;
    Ok(vec![
        partitions.year,
        partitions.year_month,
        details.process,
        details.source,
    ])
}

/// Catalog table holding error reports of one business area
pub fn error_table_name(area: &str, level: ReportLevel) -> String {
    format!("{}_errors_{}", area.to_lowercase(), level)
}

/// `{root}/parquet/year={y}/year_month={ym}/year_month_day={ymd}/{name}.parquet`
pub fn parquet_key(key: &str, format: &str) -> Result<String, PathError> {
    let partitions = partition_values(key, format)?;
    Ok(format!(
        "{}/parquet/year={}/year_month={}/year_month_day={}/{}.parquet",
        root_folder(key),
        partitions.year,
        partitions.year_month,
        partitions.year_month_day,
        file_name(key, false)
    ))
}

/// `s3://{bucket}/{key}`
pub fn object_uri(bucket: &str, key: &str) -> String {
    format!("s3://{}/{}", bucket, key)
}

/// Storage root of the published table
pub fn parquet_table_location(bucket: &str, key: &str) -> String {
    format!("s3://{}/{}/parquet/", bucket, root_folder(key))
}

/// Storage location of the partition holding this file's Parquet output
pub fn parquet_partition_location(bucket: &str, key: &str, format: &str) -> Result<String, PathError> {
    let uri = object_uri(bucket, &parquet_key(key, format)?);
    Ok(match uri.rfind('/') {
        Some(pos) => uri[..pos].to_string(),
        None => uri,
    })
}
