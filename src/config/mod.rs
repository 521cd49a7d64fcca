//! Pipeline configuration
//!
//! A pipeline is described by a declarative document (JSON or YAML) listing the
//! file delimiter, the timestamp format embedded in file names, the column
//! schema, the as-of-date source, the data quality rules and the columns copied
//! into error reports. [`Config::parse`] validates that document once; the
//! result is immutable and queried by every later stage.

pub mod error;
pub mod sanitize;
pub mod settings;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::models::{CatalogColumn, DataType};

pub use error::ConfigError;
pub use sanitize::sanitize_column_name;
pub use settings::Settings;

/// Name of the as-of-date output column
pub const AS_OF_DATE_COLUMN: &str = "asofdate";
/// Name of the 0-based row position column
pub const ROW_INDEX_COLUMN: &str = "row_index";
/// Name of the correlation id column
pub const CORRELATION_ID_COLUMN: &str = "correlation_id";
/// Name of the per-row confidence column
pub const CONFIDENCE_LEVEL_COLUMN: &str = "confidence_level";

const THRESHOLD_KEY: &str = "threshold";
const WEIGHT_KEY: &str = "weight";

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_timestamp_format() -> String {
    "%Y%m%d%H%M%S".to_string()
}

fn default_true() -> bool {
    true
}

/// Pipeline configuration document as written by users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_timestamp_format")]
    pub file_name_timestamp: String,
    #[serde(default)]
    pub sanitize_columns: bool,
    #[serde(default = "default_true")]
    pub error_reporting_enabled: bool,
    pub schema: Vec<RawColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asofdate: Option<String>,
    #[serde(default)]
    pub rules: Vec<Map<String, Value>>,
    #[serde(default)]
    pub error_reporting: Map<String, Value>,
}

/// One schema entry of a [`RawConfig`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_calculated: bool,
}

/// Accept `true`, `"true"` and `"True"` alike
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) => Ok(text.trim().eq_ignore_ascii_case("true")),
    }
}

/// A schema column keyed by its logical (optionally sanitized) name
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnConfig {
    /// Logical name; the sanitized file name when sanitization is enabled
    pub name: String,
    /// Name as it appears in the source file header
    pub name_in_file: String,
    pub data_type: DataType,
    /// Derived by the pipeline rather than read from the file
    pub is_calculated: bool,
}

/// Where the as-of-date of each row comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsOfDateSource {
    /// Timestamp embedded in the file name
    FileTimestamp,
    /// A column of the file, renamed to `asofdate`
    DataframeColumn(String),
}

/// Threshold and weight of one quality rule plus its rule-specific settings
#[derive(Debug, Clone, PartialEq)]
pub struct DataQualityRuleConfig {
    pub name: String,
    pub config: Map<String, Value>,
    pub threshold: f64,
    pub weight: f64,
}

/// A column copied into quality error reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingColumn {
    pub destination: String,
    pub source: String,
}

/// Validated pipeline configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub delimiter: u8,
    pub file_name_timestamp: String,
    pub sanitize_columns: bool,
    /// Add row_index/correlation_id/confidence_level to published data
    pub error_reporting_enabled: bool,
    schema: Vec<ColumnConfig>,
    as_of_date: AsOfDateSource,
    rules: Vec<DataQualityRuleConfig>,
    error_reporting: Vec<ReportingColumn>,
    raw: RawConfig,
}

impl Config {
    /// Validate a raw configuration document
    pub fn parse(raw: RawConfig) -> Result<Self, ConfigError> {
        let delimiter = match raw.delimiter.as_bytes() {
            [byte] => *byte,
            _ => return Err(ConfigError::InvalidDelimiter(raw.delimiter.clone())),
        };

        let schema = Self::parse_schema(&raw)?;
        let as_of_date = Self::parse_as_of_date(&raw, &schema)?;
        let rules = Self::parse_rules(&raw)?;
        let error_reporting = Self::parse_error_reporting(&raw, &schema)?;

        Ok(Self {
            delimiter,
            file_name_timestamp: raw.file_name_timestamp.clone(),
            sanitize_columns: raw.sanitize_columns,
            error_reporting_enabled: raw.error_reporting_enabled,
            schema,
            as_of_date,
            rules,
            error_reporting,
            raw,
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(serde_json::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(serde_yaml::from_str(content)?)
    }

    /// Load a `.json`, `.yaml` or `.yml` configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    fn parse_schema(raw: &RawConfig) -> Result<Vec<ColumnConfig>, ConfigError> {
        let mut schema: Vec<ColumnConfig> = Vec::with_capacity(raw.schema.len());
        for column in &raw.schema {
            let name = if raw.sanitize_columns {
                sanitize_column_name(&column.name)
            } else {
                column.name.clone()
            };
            if schema.iter().any(|c| c.name == name) {
                return Err(ConfigError::DuplicateColumn(name));
            }
            let data_type =
                column
                    .data_type
                    .parse()
                    .map_err(|message| ConfigError::InvalidDataType {
                        column: column.name.clone(),
                        message,
                    })?;
            schema.push(ColumnConfig {
                name,
                name_in_file: column.name.clone(),
                data_type,
                is_calculated: column.is_calculated,
            });
        }
        Ok(schema)
    }

    fn parse_as_of_date(
        raw: &RawConfig,
        schema: &[ColumnConfig],
    ) -> Result<AsOfDateSource, ConfigError> {
        if let Some(column) = &raw.asofdate {
            if !schema.iter().any(|c| &c.name == column) {
                return Err(ConfigError::unknown_column(
                    column,
                    schema.iter().map(|c| c.name.as_str()),
                ));
            }
            return Ok(AsOfDateSource::DataframeColumn(column.clone()));
        }

        if schema.iter().any(|c| c.name == AS_OF_DATE_COLUMN) {
            return Ok(AsOfDateSource::FileTimestamp);
        }

        Err(ConfigError::MissingAsOfDate)
    }

    fn parse_rules(raw: &RawConfig) -> Result<Vec<DataQualityRuleConfig>, ConfigError> {
        let mut rules = Vec::with_capacity(raw.rules.len());
        for entry in &raw.rules {
            if entry.len() != 1 {
                return Err(ConfigError::InvalidRuleEntry(entry.keys().cloned().collect()));
            }
            let Some((name, body)) = entry.iter().next() else {
                continue;
            };

            let mut config = match body {
                Value::Object(map) => map.clone(),
                Value::Null => Map::new(),
                _ => {
                    return Err(ConfigError::InvalidRuleValue {
                        rule: name.clone(),
                        field: "configuration".to_string(),
                    });
                }
            };
            let threshold = take_number(&mut config, name, THRESHOLD_KEY)?;
            let weight = take_number(&mut config, name, WEIGHT_KEY)?;

            rules.push(DataQualityRuleConfig {
                name: name.clone(),
                config,
                threshold,
                weight,
            });
        }
        Ok(rules)
    }

    fn parse_error_reporting(
        raw: &RawConfig,
        schema: &[ColumnConfig],
    ) -> Result<Vec<ReportingColumn>, ConfigError> {
        let names = || schema.iter().map(|c| c.name.as_str());
        let mut columns = Vec::with_capacity(raw.error_reporting.len());

        for (destination, source) in &raw.error_reporting {
            let source = match source {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if !names().any(|n| n == source) {
                return Err(ConfigError::unknown_column(source, names()));
            }
            if names().any(|n| n == destination.as_str()) && destination != &source {
                return Err(ConfigError::ReportingConflict {
                    destination: destination.clone(),
                    source_column: source,
                    available: names().map(str::to_string).collect(),
                });
            }
            columns.push(ReportingColumn {
                destination: destination.clone(),
                source,
            });
        }
        Ok(columns)
    }

    /// Schema columns in declaration order, optionally without calculated ones
    pub fn filtered_schema(&self, include_calculated: bool) -> Vec<&ColumnConfig> {
        self.schema
            .iter()
            .filter(|c| include_calculated || !c.is_calculated)
            .collect()
    }

    /// Columns as registered in the catalog
    pub fn catalog_columns(&self, include_calculated: bool) -> Vec<CatalogColumn> {
        self.filtered_schema(include_calculated)
            .into_iter()
            .map(|c| {
                let name = if self.sanitize_columns {
                    c.name.as_str()
                } else {
                    c.name_in_file.as_str()
                };
                CatalogColumn::new(name, c.data_type)
            })
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnConfig> {
        self.schema.iter().find(|c| c.name == name)
    }

    /// Ordinal position of a column in the full schema
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|c| c.name == name)
    }

    pub fn schema(&self) -> &[ColumnConfig] {
        &self.schema
    }

    pub fn as_of_date(&self) -> &AsOfDateSource {
        &self.as_of_date
    }

    pub fn rules(&self) -> &[DataQualityRuleConfig] {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&DataQualityRuleConfig> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn error_reporting(&self) -> &[ReportingColumn] {
        &self.error_reporting
    }

    /// Configuration handed to the quality engine
    ///
    /// Same document as the input, with the schema restricted to columns read
    /// from the file.
    pub fn rule_set(&self) -> RawConfig {
        let mut raw = self.raw.clone();
        raw.schema.retain(|c| !c.is_calculated);
        raw
    }

    /// Columns of the published dataset, in output order
    ///
    /// The full catalog schema with the as-of-date source column renamed to
    /// `asofdate` (or dropped when `asofdate` is declared itself) and without
    /// the row context columns when error reporting is disabled.
    pub fn published_columns(&self) -> Vec<CatalogColumn> {
        let renamed = match &self.as_of_date {
            AsOfDateSource::DataframeColumn(source) if source != AS_OF_DATE_COLUMN => {
                Some(source.as_str())
            }
            _ => None,
        };
        let declares_as_of_date = self.column(AS_OF_DATE_COLUMN).is_some();

        self.catalog_columns(true)
            .into_iter()
            .zip(&self.schema)
            .filter_map(|(mut column, config)| {
                if !self.error_reporting_enabled && is_context_column(&config.name) {
                    return None;
                }
                if Some(config.name.as_str()) == renamed {
                    if declares_as_of_date {
                        return None;
                    }
                    column.name = AS_OF_DATE_COLUMN.to_string();
                }
                Some(column)
            })
            .collect()
    }
}

/// Row context columns added for error reporting
pub fn is_context_column(name: &str) -> bool {
    matches!(
        name,
        ROW_INDEX_COLUMN | CORRELATION_ID_COLUMN | CONFIDENCE_LEVEL_COLUMN
    )
}

fn take_number(config: &mut Map<String, Value>, rule: &str, field: &str) -> Result<f64, ConfigError> {
    match config.remove(field) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| ConfigError::InvalidRuleValue {
            rule: rule.to_string(),
            field: field.to_string(),
        }),
        Some(Value::String(s)) => s.trim().parse().map_err(|_| ConfigError::InvalidRuleValue {
            rule: rule.to_string(),
            field: field.to_string(),
        }),
        Some(_) => Err(ConfigError::InvalidRuleValue {
            rule: rule.to_string(),
            field: field.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "delimiter": ",",
        "file_name_timestamp": "%Y%m%d%H%M%S",
        "schema": [
            {"name": "asofdate", "type": "DATE", "is_calculated": "true"},
            {"name": "Portfolio_Name", "type": "STRING"},
            {"name": "Portfolio_ID", "type": "INT"},
            {"name": "MarketValue", "type": "DECIMAL"},
            {"name": "row_index", "type": "INT", "is_calculated": "true"},
            {"name": "correlation_id", "type": "STRING", "is_calculated": true},
            {"name": "confidence_level", "type": "DECIMAL(3,2)", "is_calculated": "true"}
        ],
        "rules": [
            {"blank": {"columns_to_check": ["Portfolio_Name"], "threshold": 0, "weight": 0}},
            {"column_count": {"expected_column_count": 3, "threshold": 1.0, "weight": 0.4}}
        ],
        "error_reporting": {"asofdate": "asofdate", "portfolio": "Portfolio_Name"}
    }"#;

    #[test]
    fn test_parse_defaults() {
        let config = Config::from_json_str(r#"{"schema": [{"name": "asofdate", "type": "DATE"}]}"#)
            .unwrap();
        assert_eq!(config.delimiter, b',');
        assert_eq!(config.file_name_timestamp, "%Y%m%d%H%M%S");
        assert!(!config.sanitize_columns);
        assert!(config.error_reporting_enabled);
        assert!(config.rules().is_empty());
        assert_eq!(config.as_of_date(), &AsOfDateSource::FileTimestamp);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = Config::from_json_str(SAMPLE).unwrap();
        let b = Config::from_json_str(SAMPLE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rules_keep_declaration_order_and_split_weights() {
        let config = Config::from_json_str(SAMPLE).unwrap();
        let names: Vec<_> = config.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["blank", "column_count"]);

        let count = config.rule("column_count").unwrap();
        assert_eq!(count.threshold, 1.0);
        assert_eq!(count.weight, 0.4);
        assert!(!count.config.contains_key("threshold"));
        assert_eq!(count.config["expected_column_count"], serde_json::json!(3));
    }

    #[test]
    fn test_rule_entry_with_two_names_is_rejected() {
        let raw = r#"{"schema": [{"name": "asofdate", "type": "DATE"}],
            "rules": [{"blank": {}, "duplicates": {}}]}"#;
        let err = Config::from_json_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRuleEntry(names) if names.len() == 2));
    }

    #[test]
    fn test_explicit_as_of_date_column() {
        let raw = r#"{"schema": [{"name": "BusinessDate", "type": "DATE"}], "asofdate": "BusinessDate"}"#;
        let config = Config::from_json_str(raw).unwrap();
        assert_eq!(
            config.as_of_date(),
            &AsOfDateSource::DataframeColumn("BusinessDate".to_string())
        );
    }

    #[test]
    fn test_explicit_as_of_date_column_must_exist() {
        let raw = r#"{"schema": [{"name": "asofdate", "type": "DATE"}], "asofdate": "BusinessDate"}"#;
        let err = Config::from_json_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownColumn { column, .. } if column == "BusinessDate"));
    }

    #[test]
    fn test_missing_as_of_date() {
        let raw = r#"{"schema": [{"name": "Value", "type": "INT"}]}"#;
        assert!(matches!(
            Config::from_json_str(raw).unwrap_err(),
            ConfigError::MissingAsOfDate
        ));
    }

    #[test]
    fn test_reporting_source_must_exist() {
        let raw = r#"{"schema": [{"name": "asofdate", "type": "DATE"}],
            "error_reporting": {"company": "Issuer_Name"}}"#;
        assert!(matches!(
            Config::from_json_str(raw).unwrap_err(),
            ConfigError::UnknownColumn { .. }
        ));
    }

    #[test]
    fn test_reporting_destination_conflict() {
        let raw = r#"{"schema": [
                {"name": "asofdate", "type": "DATE"},
                {"name": "a", "type": "STRING"},
                {"name": "b", "type": "STRING"}],
            "error_reporting": {"a": "b"}}"#;
        assert!(matches!(
            Config::from_json_str(raw).unwrap_err(),
            ConfigError::ReportingConflict { .. }
        ));
    }

    #[test]
    fn test_duplicate_after_sanitization() {
        let raw = r#"{"sanitize_columns": true, "schema": [
                {"name": "asofdate", "type": "DATE"},
                {"name": "MarketValue", "type": "DECIMAL"},
                {"name": "Market_Value", "type": "DECIMAL"}]}"#;
        assert!(matches!(
            Config::from_json_str(raw).unwrap_err(),
            ConfigError::DuplicateColumn(name) if name == "market_value"
        ));
    }

    #[test]
    fn test_filtered_schema_and_catalog_columns() {
        let config = Config::from_json_str(SAMPLE).unwrap();
        let file_columns: Vec<_> = config
            .filtered_schema(false)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(file_columns, vec!["Portfolio_Name", "Portfolio_ID", "MarketValue"]);

        let all = config.catalog_columns(true);
        assert_eq!(all.len(), 7);
        assert_eq!(all[0].name, "asofdate");
        assert_eq!(all[6].catalog_type(), "decimal(3,2)");
    }

    #[test]
    fn test_catalog_columns_use_sanitized_names() {
        let raw = r#"{"sanitize_columns": true, "schema": [
                {"name": "asofdate", "type": "DATE", "is_calculated": true},
                {"name": "Portfolio_ID", "type": "INT"}]}"#;
        let config = Config::from_json_str(raw).unwrap();
        let columns = config.catalog_columns(false);
        assert_eq!(columns[0].name, "portfolio_id");
        assert_eq!(config.schema()[1].name_in_file, "Portfolio_ID");
    }

    #[test]
    fn test_rule_set_drops_calculated_columns() {
        let config = Config::from_json_str(SAMPLE).unwrap();
        let quality = config.rule_set();
        assert_eq!(quality.schema.len(), 3);
        assert_eq!(quality.rules.len(), 2);
    }

    #[test]
    fn test_published_columns_rename_as_of_date_source() {
        let raw = r#"{"schema": [
                {"name": "BusinessDate", "type": "DATE"},
                {"name": "Value", "type": "INT"},
                {"name": "row_index", "type": "INT", "is_calculated": true}],
            "asofdate": "BusinessDate"}"#;
        let config = Config::from_json_str(raw).unwrap();
        let names: Vec<_> = config
            .published_columns()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["asofdate", "Value", "row_index"]);
    }

    #[test]
    fn test_published_columns_without_context_columns() {
        let mut raw: RawConfig = serde_json::from_str(SAMPLE).unwrap();
        raw.error_reporting_enabled = false;
        let config = Config::parse(raw).unwrap();
        let names: Vec<_> = config
            .published_columns()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            vec!["asofdate", "Portfolio_Name", "Portfolio_ID", "MarketValue"]
        );
    }

    #[test]
    fn test_yaml_config() {
        let yaml = r#"
delimiter: "|"
schema:
  - name: asofdate
    type: DATE
    is_calculated: true
  - name: Value
    type: DOUBLE
rules:
  - duplicates:
      columns_to_check: []
      threshold: 0.5
      weight: 1
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.delimiter, b'|');
        assert_eq!(config.rules()[0].threshold, 0.5);
        assert_eq!(config.rules()[0].weight, 1.0);
    }

    #[test]
    fn test_invalid_delimiter() {
        let raw = r#"{"delimiter": "||", "schema": [{"name": "asofdate", "type": "DATE"}]}"#;
        assert!(matches!(
            Config::from_json_str(raw).unwrap_err(),
            ConfigError::InvalidDelimiter(_)
        ));
    }
}
