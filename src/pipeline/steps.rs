//! Atomic pipeline steps
//!
//! Each step wraps a single collaborator call (or a short fixed sequence of
//! them) and converts its failure into a [`PipelineError`]. Steps never look
//! at the run's state; the orchestrator decides what runs next.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::context::ProcessContext;
use super::error::{PipelineError, PipelineResult};
use crate::catalog::{CatalogService, CatalogSync};
use crate::columnar::{ColumnarSerializer, ColumnarWriter};
use crate::config::{Config, Settings};
use crate::frame::extend::ColumnNaming;
use crate::frame::{Frame, with_as_of_date, with_as_of_date_from_timestamp};
use crate::hashing::ContentHasher;
use crate::models::{FileStatus, ReportLevel, TagKey};
use crate::notification::{Message, Notifier, PayloadBuilder};
use crate::paths;
use crate::quality::{CheckResult, QualityEngine, QualityRequest};
use crate::storage::{FileLocation, ObjectStore, TagStore};
use crate::tagging::Tagger;

/// External collaborators a run talks to
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn ObjectStore>,
    pub tags: Arc<dyn TagStore>,
    pub hasher: Arc<dyn ContentHasher>,
    pub quality: Arc<dyn QualityEngine>,
    pub serializer: Arc<dyn ColumnarSerializer>,
    pub catalog: Arc<dyn CatalogService>,
    pub notifier: Arc<dyn Notifier>,
}

/// Executes single pipeline steps against the collaborators
pub struct StageExecutor {
    store: Arc<dyn ObjectStore>,
    tagger: Tagger,
    hasher: Arc<dyn ContentHasher>,
    quality: Arc<dyn QualityEngine>,
    serializer: Arc<dyn ColumnarSerializer>,
    writer: ColumnarWriter,
    catalog: CatalogSync,
    notifier: Arc<dyn Notifier>,
    payloads: PayloadBuilder,
}

impl StageExecutor {
    pub fn new(collaborators: Collaborators, settings: &Settings) -> Self {
        let Collaborators {
            store,
            tags,
            hasher,
            quality,
            serializer,
            catalog,
            notifier,
        } = collaborators;
        Self {
            writer: ColumnarWriter::new(store.clone(), serializer.clone()),
            catalog: CatalogSync::new(catalog, settings.catalog_database.clone()),
            tagger: Tagger::new(tags),
            payloads: PayloadBuilder::from_settings(settings),
            store,
            hasher,
            quality,
            serializer,
            notifier,
        }
    }

    /// Content digest of the object
    pub fn hash(&self, location: &FileLocation) -> PipelineResult<String> {
        let mut reader = self.store.open_object(location)?;
        let digest = self
            .hasher
            .hash(&mut reader)
            .map_err(|source| PipelineError::Hash {
                location: location.to_string(),
                source,
            })?;
        debug!(location = %location, hash = %digest, "Hashed object");
        Ok(digest)
    }

    pub fn tag<K, V, I>(&self, location: &FileLocation, tags: I) -> PipelineResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tagger.tag(location, tags)?;
        Ok(())
    }

    pub fn tag_status(&self, location: &FileLocation, status: FileStatus) -> PipelineResult<()> {
        self.tagger.tag_one(location, TagKey::Status, status.as_str())?;
        Ok(())
    }

    pub fn copy(&self, from: &FileLocation, bucket: &str, key: &str) -> PipelineResult<FileLocation> {
        let copied = self.store.copy_object(from, bucket, key)?;
        info!(from = %from, to = %copied, "Copied file");
        Ok(copied)
    }

    pub fn move_to(&self, from: &FileLocation, bucket: &str, key: &str) -> PipelineResult<FileLocation> {
        let moved = self.store.move_object(from, bucket, key)?;
        info!(from = %from, to = %moved, "Moved file");
        Ok(moved)
    }

    /// Delete `key` from `bucket` when it exists
    pub fn delete_if_exists(&self, bucket: &str, key: &str) -> PipelineResult<bool> {
        if !self.store.object_exists(bucket, key)? {
            return Ok(false);
        }
        self.store.delete_object(&FileLocation::new(bucket, key))?;
        info!(bucket, key, "Deleted object");
        Ok(true)
    }

    /// Run the quality rules against the file at `location`
    ///
    /// The frame keeps the file's own header; only the as-of-date column is
    /// added.
    pub fn quality_check(
        &self,
        context: &ProcessContext,
        location: &FileLocation,
        config: &Config,
    ) -> PipelineResult<CheckResult> {
        let processed_on = context.processed_on_timestamp()?;
        let file_date = paths::embedded_timestamp(&location.key, &config.file_name_timestamp)?.date();

        let reader = self.store.open_object(location)?;
        let frame = Frame::read_csv(reader, config.delimiter).map_err(PipelineError::QualityInput)?;
        let frame = with_as_of_date(&frame, config, ColumnNaming::InFile, file_date)
            .map_err(PipelineError::QualityInput)?;

        let rule_set = config.rule_set();
        let request = QualityRequest {
            location,
            correlation_id: &context.correlation_id,
            processed_on,
            frame: &frame,
            rule_set: &rule_set,
        };
        let result = self.quality.check(&request)?;

        info!(
            location = %location,
            rows = frame.len(),
            overall_score = result.overall_score,
            passed = result.has_passed(),
            statuses = %result.status_summary(),
            "Quality check finished"
        );
        Ok(result)
    }

    /// Tag the file with the scores of a quality check
    pub fn tag_scores(&self, location: &FileLocation, result: &CheckResult) -> PipelineResult<()> {
        self.tag(
            location,
            [
                (TagKey::QualityScore.as_str(), format!("{:?}", result.overall_score)),
                (TagKey::QualityScoreSummary.as_str(), result.score_summary()),
                (TagKey::QualityStatusSummary.as_str(), result.status_summary()),
            ],
        )
    }

    /// Write the per-rule summary of a quality check, prefixed with the as-of-date
    ///
    /// Returns the report key.
    pub fn write_summary_report(
        &self,
        context: &ProcessContext,
        file_key: &str,
        config: &Config,
        result: &CheckResult,
    ) -> PipelineResult<String> {
        let file_date = paths::embedded_timestamp(file_key, &config.file_name_timestamp)?.date();
        let report = with_as_of_date_from_timestamp(&result.summary, file_date);
        self.write_report(context, file_key, config, ReportLevel::Summary, &report)
    }

    /// Write the offending rows of every rule, if there are any
    ///
    /// Returns the positions of the offending rows.
    pub fn write_detailed_report(
        &self,
        context: &ProcessContext,
        file_key: &str,
        config: &Config,
        result: &CheckResult,
    ) -> PipelineResult<Vec<usize>> {
        let Some(report) = result.detailed_report() else {
            debug!("No rule reported error rows, skipping detailed report");
            return Ok(Vec::new());
        };
        self.write_report(context, file_key, config, ReportLevel::Detailed, &report)?;
        Ok(result.error_rows())
    }

    fn write_report(
        &self,
        context: &ProcessContext,
        file_key: &str,
        config: &Config,
        level: ReportLevel,
        report: &Frame,
    ) -> PipelineResult<String> {
        let format = &config.file_name_timestamp;
        let key = paths::error_key(file_key, format, level)?;
        let bytes = self
            .serializer
            .write(report, None)
            .map_err(|e| PipelineError::report(level.as_str(), e))?;
        self.store
            .put_object(&context.target_bucket, &key, &bytes)
            .map_err(|e| PipelineError::report(level.as_str(), e))?;
        info!(
            report = level.as_str(),
            bucket = %context.target_bucket,
            key = %key,
            rows = report.len(),
            "Wrote quality report"
        );

        if !report.is_empty() {
            let area = paths::business_details(file_key)?.area;
            let table = paths::error_table_name(&area, level);
            let partition_values = paths::error_partition_values(file_key, format)?;
            let crawler = match level {
                ReportLevel::Summary => &context.error_summary_crawler,
                ReportLevel::Detailed => &context.error_details_crawler,
            };
            self.refresh_catalog(&table, report.columns(), &partition_values, crawler)?;
        }
        Ok(key)
    }

    /// Start `crawler` when the registered table lacks these columns or this partition
    pub fn refresh_catalog(
        &self,
        table: &str,
        columns: &[String],
        partition_values: &[String],
        crawler: &str,
    ) -> PipelineResult<bool> {
        let database = self.catalog.database();
        if !self
            .catalog
            .needs_schema_update(database, table, columns, partition_values)?
        {
            debug!(database, table, "Catalog schema up to date");
            return Ok(false);
        }
        info!(database, table, crawler, "Catalog schema drifted, starting crawler");
        self.catalog.start_crawler(crawler)?;
        Ok(true)
    }

    /// Write the columnar copy of a published file, returning its key
    pub fn write_columnar(
        &self,
        context: &ProcessContext,
        target_key: &str,
        config: &Config,
        error_rows: &[usize],
    ) -> PipelineResult<String> {
        Ok(self.writer.create(
            &context.target_bucket,
            target_key,
            config,
            error_rows,
            &context.correlation_id,
        )?)
    }

    /// Register the published table and this file's partition
    pub fn sync_catalog(
        &self,
        context: &ProcessContext,
        target_key: &str,
        config: &Config,
    ) -> PipelineResult<()> {
        self.catalog
            .sync(&context.target_bucket, target_key, &context.pipeline_name, config)?;
        Ok(())
    }

    /// Address and deliver one notification
    pub fn notify(&self, context: &ProcessContext, message: Message) -> PipelineResult<()> {
        let payload = self.payloads.build(context, message);
        match self.notifier.send(&payload) {
            Ok(()) => {
                info!(kind = ?payload.kind, subject = %payload.subject, "Sent notification");
                Ok(())
            }
            Err(e) => {
                warn!(kind = ?payload.kind, error = %e, "Failed to send notification");
                Err(e.into())
            }
        }
    }
}
