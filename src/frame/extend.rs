//! Derived columns added to a frame before it is checked or published

use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::{Value, json};

use super::{Frame, FrameError};
use crate::config::{
    AS_OF_DATE_COLUMN, AsOfDateSource, CONFIDENCE_LEVEL_COLUMN, CORRELATION_ID_COLUMN, Config,
    ROW_INDEX_COLUMN,
};

/// How the frame's columns are named
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnNaming {
    /// Header as found in the file
    InFile,
    /// Schema names (sanitized when the configuration asks for it)
    Logical,
}

/// Apply the configured as-of-date source
///
/// `file_date` is the date embedded in the file name; it is only used for
/// [`AsOfDateSource::FileTimestamp`].
pub fn with_as_of_date(
    frame: &Frame,
    config: &Config,
    naming: ColumnNaming,
    file_date: NaiveDate,
) -> Result<Frame, FrameError> {
    match config.as_of_date() {
        AsOfDateSource::FileTimestamp => Ok(with_as_of_date_from_timestamp(frame, file_date)),
        AsOfDateSource::DataframeColumn(column) => {
            let source = match (naming, config.column(column)) {
                (ColumnNaming::InFile, Some(c)) => c.name_in_file.as_str(),
                _ => column.as_str(),
            };
            with_as_of_date_from_column(frame, source)
        }
    }
}

/// Prepend `asofdate` holding `date`, replacing any existing column of that name
pub fn with_as_of_date_from_timestamp(frame: &Frame, date: NaiveDate) -> Frame {
    let value = json!(date.format("%Y-%m-%d").to_string());
    let frame = frame.drop_column(AS_OF_DATE_COLUMN);
    let mut columns = vec![AS_OF_DATE_COLUMN.to_string()];
    columns.extend(frame.columns().iter().cloned());
    let rows = frame
        .rows()
        .iter()
        .map(|row| {
            let mut extended = Vec::with_capacity(row.len() + 1);
            extended.push(value.clone());
            extended.extend(row.iter().cloned());
            extended
        })
        .collect();
    Frame { columns, rows }
}

/// Rename `source` to `asofdate`, replacing any existing column of that name
pub fn with_as_of_date_from_column(frame: &Frame, source: &str) -> Result<Frame, FrameError> {
    if source == AS_OF_DATE_COLUMN {
        frame.select(&[AS_OF_DATE_COLUMN])?;
        return Ok(frame.clone());
    }
    frame.select(&[source])?;
    frame
        .drop_column(AS_OF_DATE_COLUMN)
        .rename_column(source, AS_OF_DATE_COLUMN)
}

/// Add the row context columns used by error reporting
///
/// `row_index` holds the 0-based row position, `correlation_id` the run's id
/// and `confidence_level` is 0 for rows listed in `error_rows` and 1
/// otherwise. Each column is inserted at its schema position; columns the
/// schema does not declare are not added.
pub fn with_error_columns(
    frame: &Frame,
    error_rows: &[usize],
    correlation_id: &str,
    config: &Config,
) -> Result<Frame, FrameError> {
    let flagged: HashSet<usize> = error_rows.iter().copied().collect();
    let correlation_id = json!(correlation_id);

    let mut columns: Vec<(usize, &str)> = [
        ROW_INDEX_COLUMN,
        CORRELATION_ID_COLUMN,
        CONFIDENCE_LEVEL_COLUMN,
    ]
    .into_iter()
    .filter_map(|name| config.column_position(name).map(|position| (position, name)))
    .collect();
    columns.sort();

    let mut extended = frame.clone();
    for (position, name) in columns {
        let value = |row: usize| -> Value {
            match name {
                ROW_INDEX_COLUMN => json!(row),
                CORRELATION_ID_COLUMN => correlation_id.clone(),
                _ if flagged.contains(&row) => json!(0),
                _ => json!(1),
            }
        };
        extended = extended
            .drop_column(name)
            .insert_column(position, name, value)?;
    }
    Ok(extended)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(raw: &str) -> Config {
        Config::from_json_str(raw).unwrap()
    }

    fn holdings() -> Frame {
        Frame::read_csv("Portfolio,Value\nA,1\nB,2\nC,3\n".as_bytes(), b',').unwrap()
    }

    #[test]
    fn test_as_of_date_from_timestamp_replaces_existing_column() {
        let frame = Frame::read_csv("asofdate,Value\n2001-01-01,1\n".as_bytes(), b',').unwrap();
        let date = NaiveDate::from_ymd_opt(2020, 2, 5).unwrap();
        let extended = with_as_of_date_from_timestamp(&frame, date);
        assert_eq!(extended.columns(), &["asofdate", "Value"]);
        assert_eq!(extended.rows()[0][0], json!("2020-02-05"));
    }

    #[test]
    fn test_as_of_date_from_column() {
        let frame = Frame::read_csv("asofdate,BusinessDate\nx,2020-01-31\n".as_bytes(), b',').unwrap();
        let extended = with_as_of_date_from_column(&frame, "BusinessDate").unwrap();
        assert_eq!(extended.columns(), &["asofdate"]);
        assert_eq!(extended.rows()[0][0], json!("2020-01-31"));

        assert!(with_as_of_date_from_column(&holdings(), "BusinessDate").is_err());
    }

    #[test]
    fn test_as_of_date_uses_header_names_for_raw_frames() {
        let config = config(
            r#"{"sanitize_columns": true, "asofdate": "business_date",
                "schema": [{"name": "BusinessDate", "type": "DATE"}]}"#,
        );
        let frame = Frame::read_csv("BusinessDate\n2020-01-31\n".as_bytes(), b',').unwrap();
        let date = NaiveDate::from_ymd_opt(2020, 2, 5).unwrap();
        let extended = with_as_of_date(&frame, &config, ColumnNaming::InFile, date).unwrap();
        assert_eq!(extended.columns(), &["asofdate"]);
    }

    #[test]
    fn test_error_columns_at_schema_positions() {
        let config = config(
            r#"{"schema": [
                {"name": "asofdate", "type": "DATE", "is_calculated": true},
                {"name": "row_index", "type": "INT", "is_calculated": true},
                {"name": "Portfolio", "type": "STRING"},
                {"name": "Value", "type": "INT"},
                {"name": "correlation_id", "type": "STRING", "is_calculated": true},
                {"name": "confidence_level", "type": "DECIMAL(3,2)", "is_calculated": true}]}"#,
        );
        let frame = with_as_of_date_from_timestamp(
            &holdings(),
            NaiveDate::from_ymd_opt(2020, 2, 5).unwrap(),
        );
        let extended = with_error_columns(&frame, &[2, 0, 2], "run-1", &config).unwrap();

        assert_eq!(
            extended.columns(),
            &["asofdate", "row_index", "Portfolio", "Value", "correlation_id", "confidence_level"]
        );
        let confidence: Vec<_> = extended.column("confidence_level").unwrap();
        assert_eq!(confidence, vec![&json!(0), &json!(1), &json!(0)]);
        assert_eq!(extended.column("row_index").unwrap()[2], &json!(2));
        assert_eq!(extended.column("correlation_id").unwrap()[1], &json!("run-1"));
        assert_eq!(frame.columns().len(), 3);
    }

    #[test]
    fn test_undeclared_error_columns_are_skipped() {
        let config = config(r#"{"schema": [{"name": "asofdate", "type": "DATE"}]}"#);
        let extended = with_error_columns(&holdings(), &[1], "run-1", &config).unwrap();
        assert_eq!(extended, holdings());
    }
}
