use super::{PathError, file_name, file_stem};

const AUTOMATED: &str = "Automated";
const TO_BE_PROCESSED: &str = "AutomatedStatus/ToBeProcessed";
const PROCESSED: &str = "AutomatedStatus/Processed";
const PROCESS_FAILED: &str = "AutomatedStatus/ProcessFailed";

/// Staging locations of a landed file
///
/// Derived from the key prefix in front of its `Automated` folder and the
/// year/month of the processing timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineProcessFolder {
    prefix: String,
    file_name: String,
    file_stem: String,
    year: String,
    month: String,
}

impl PipelineProcessFolder {
    /// `processed_on` is an ISO-8601 timestamp such as `2019-07-30T10:00:54.129Z`
    pub fn new(key: &str, processed_on: &str) -> Result<Self, PathError> {
        let prefix = match key.find(AUTOMATED) {
            Some(pos) if pos > 0 && key[..pos].ends_with('/') => &key[..pos - 1],
            _ => return Err(PathError::NotAutomated(key.to_string())),
        };

        let mut parts = processed_on.split('-');
        let (year, month) = match (parts.next(), parts.next()) {
            (Some(y), Some(m))
                if y.len() == 4
                    && m.len() == 2
                    && y.chars().all(|c| c.is_ascii_digit())
                    && m.chars().all(|c| c.is_ascii_digit()) =>
            {
                (y, m)
            }
            _ => return Err(PathError::ProcessedOn(processed_on.to_string())),
        };

        Ok(Self {
            prefix: prefix.to_string(),
            file_name: file_name(key, true).to_string(),
            file_stem: file_stem(key).to_string(),
            year: year.to_string(),
            month: month.to_string(),
        })
    }

    pub fn to_be_processed(&self) -> String {
        format!("{}/{}/{}", self.prefix, TO_BE_PROCESSED, self.file_name)
    }

    pub fn processed(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.prefix,
            PROCESSED,
            self.date_folders(),
            self.file_name
        )
    }

    pub fn error(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.prefix,
            PROCESS_FAILED,
            self.date_folders(),
            self.file_name
        )
    }

    /// Sidecar describing why the file failed
    pub fn error_file(&self) -> String {
        format!(
            "{}/{}/{}/error_{}.txt",
            self.prefix,
            PROCESS_FAILED,
            self.date_folders(),
            self.file_stem
        )
    }

    fn date_folders(&self) -> String {
        format!("{}/{}{}", self.year, self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "BusinessArea/BusinessProcess/DataSource/Automated/test1_20191003103000.txt";

    #[test]
    fn test_staging_paths() {
        let folder = PipelineProcessFolder::new(KEY, "2019-07-30T10:00:54.129Z").unwrap();
        assert_eq!(
            folder.to_be_processed(),
            "BusinessArea/BusinessProcess/DataSource/AutomatedStatus/ToBeProcessed/test1_20191003103000.txt"
        );
        assert_eq!(
            folder.processed(),
            "BusinessArea/BusinessProcess/DataSource/AutomatedStatus/Processed/2019/201907/test1_20191003103000.txt"
        );
        assert_eq!(
            folder.error(),
            "BusinessArea/BusinessProcess/DataSource/AutomatedStatus/ProcessFailed/2019/201907/test1_20191003103000.txt"
        );
        assert_eq!(
            folder.error_file(),
            "BusinessArea/BusinessProcess/DataSource/AutomatedStatus/ProcessFailed/2019/201907/error_test1_20191003103000.txt"
        );
    }

    #[test]
    fn test_requires_automated_folder() {
        let err = PipelineProcessFolder::new("a/b/c/landing/f.csv", "2019-07-30").unwrap_err();
        assert!(matches!(err, PathError::NotAutomated(_)));
    }

    #[test]
    fn test_rejects_malformed_processed_on() {
        let err = PipelineProcessFolder::new(KEY, "30/07/2019").unwrap_err();
        assert!(matches!(err, PathError::ProcessedOn(_)));
    }
}
