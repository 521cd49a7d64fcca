//! Pipeline orchestration
//!
//! [`PipelineOrchestrator::run`] drives one landed file through hashing,
//! staging, the quality check, publication and cataloging, and compensates
//! when a step fails. The file ends in exactly one terminal location and every
//! failure category sends exactly one notification.

use serde::Serialize;
use tracing::{error, info, info_span, warn};

use super::context::ProcessContext;
use super::error::{ErrorKind, PipelineError, PipelineResult};
use super::steps::{Collaborators, StageExecutor};
use super::trace::{PipelineState, RunTrace};
use crate::config::{Config, Settings};
use crate::models::{FileStatus, TagKey};
use crate::notification::{ErrorReport, messages};
use crate::paths::{self, PipelineProcessFolder};
use crate::quality::CheckResult;
use crate::storage::FileLocation;

/// Final disposition of an ingested file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    /// Passed and published to the target bucket
    Processed,
    /// Moved to the error area
    Failed,
}

/// Quality figures of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualitySummary {
    pub overall_score: f64,
    pub passed: bool,
    pub score_summary: String,
    pub status_summary: String,
}

impl From<&CheckResult> for QualitySummary {
    fn from(result: &CheckResult) -> Self {
        Self {
            overall_score: result.overall_score,
            passed: result.has_passed(),
            score_summary: result.score_summary(),
            status_summary: result.status_summary(),
        }
    }
}

/// Pipeline run report
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub correlation_id: String,
    pub outcome: RunOutcome,
    /// Where the ingested file ended up
    pub final_location: FileLocation,
    /// Published copy in the target bucket
    pub published: Option<FileLocation>,
    /// Key of the columnar copy in the target bucket
    pub columnar_key: Option<String>,
    pub quality: Option<QualitySummary>,
    /// Error that stopped cataloging of a published file
    pub catalog_error: Option<String>,
    pub trace: RunTrace,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Processed
    }

    /// Get formatted duration
    pub fn duration_formatted(&self) -> String {
        let millis = self.trace.duration().num_milliseconds().max(0);
        if millis >= 1000 {
            format!("{}.{:03}s", millis / 1000, millis % 1000)
        } else {
            format!("{}ms", millis)
        }
    }

    /// Print summary to stderr
    pub fn print_summary(&self) {
        eprintln!();
        eprintln!("Pipeline Run Summary");
        eprintln!("====================");
        eprintln!("Correlation ID: {}", self.correlation_id);
        eprintln!("Outcome:        {:?}", self.outcome);
        eprintln!("Duration:       {}", self.duration_formatted());
        eprintln!("File:           {}", self.final_location.uri());
        if let Some(published) = &self.published {
            eprintln!("Published:      {}", published.uri());
        }
        if let Some(key) = &self.columnar_key {
            eprintln!("Columnar copy:  {}", key);
        }
        if let Some(quality) = &self.quality {
            eprintln!();
            eprintln!("Quality score:  {:?}", quality.overall_score);
            eprintln!("Rule statuses:  {}", quality.status_summary);
        }
        eprintln!();
        eprintln!("States:");
        for entry in self.trace.entries() {
            eprintln!("  - {} ({})", entry.state, entry.at.format("%H:%M:%S%.3f"));
        }
        if let Some(error) = self.catalog_error.as_ref().or(self.trace.error.as_ref()) {
            eprintln!();
            eprintln!("Error: {}", error);
        }
    }
}

/// Results gathered while a run progresses
#[derive(Debug, Default)]
struct RunState {
    quality: Option<QualitySummary>,
    published: Option<FileLocation>,
    columnar_key: Option<String>,
    catalog_error: Option<String>,
}

/// Drives landed files through the ingestion pipeline
pub struct PipelineOrchestrator {
    steps: StageExecutor,
}

impl PipelineOrchestrator {
    pub fn new(collaborators: Collaborators, settings: &Settings) -> Self {
        Self {
            steps: StageExecutor::new(collaborators, settings),
        }
    }

    pub fn steps(&self) -> &StageExecutor {
        &self.steps
    }

    /// Ingest the file described by `context`
    ///
    /// Returns a report when the file reached a terminal location, including
    /// files that failed their quality check or were compensated after a
    /// tagging or quality error. Other errors are returned after the matching
    /// notification was sent.
    pub fn run(&self, context: &ProcessContext, config: &Config) -> PipelineResult<PipelineReport> {
        let _span = info_span!(
            "pipeline_run",
            correlation_id = %context.correlation_id,
            pipeline = %context.pipeline_name,
        )
        .entered();

        info!(
            file = %context.file,
            target_bucket = %context.target_bucket,
            processed_on = %context.processed_on,
            "Starting pipeline run"
        );

        let mut trace = RunTrace::new(&context.correlation_id, context.source());
        let mut state = RunState::default();

        let folder = match context
            .validate()
            .and_then(|()| context.processed_on_timestamp())
            .and_then(|_| {
                PipelineProcessFolder::new(&context.file.key, &context.processed_on)
                    .map_err(PipelineError::from)
            }) {
            Ok(folder) => folder,
            Err(e) => return self.handle_error(context, None, trace, state, e),
        };

        match self.execute(context, config, &folder, &mut trace, &mut state) {
            Ok(outcome) => {
                trace.enter(PipelineState::Done);
                info!(
                    outcome = ?outcome,
                    location = %trace.current_location(),
                    states = trace.states().len(),
                    "Pipeline run finished"
                );
                Ok(Self::report(context, outcome, trace, state))
            }
            Err(e) => self.handle_error(context, Some(&folder), trace, state, e),
        }
    }

    fn execute(
        &self,
        context: &ProcessContext,
        config: &Config,
        folder: &PipelineProcessFolder,
        trace: &mut RunTrace,
        state: &mut RunState,
    ) -> PipelineResult<RunOutcome> {
        let source = context.source();

        let hash = self.steps.hash(&source)?;
        self.steps.tag(&source, [(TagKey::Hash.as_str(), hash)])?;
        trace.enter(PipelineState::Hashed);

        let staged = self
            .steps
            .copy(&source, &source.bucket, &folder.to_be_processed())?;
        let staged = trace.record_location(staged);
        trace.enter(PipelineState::Staged);

        self.steps.tag(
            &staged,
            [(TagKey::CorrelationId.as_str(), context.correlation_id.as_str())],
        )?;

        let result = self.steps.quality_check(context, &staged, config)?;
        state.quality = Some(QualitySummary::from(&result));
        trace.enter(PipelineState::QualityChecked);

        self.steps.tag_scores(&staged, &result)?;
        self.steps
            .write_summary_report(context, &staged.key, config, &result)?;
        let error_rows = self
            .steps
            .write_detailed_report(context, &staged.key, config, &result)?;

        let outcome = if result.has_passed() {
            trace.enter(PipelineState::Passed);
            self.publish(context, config, folder, &staged, &error_rows, trace, state)?;
            RunOutcome::Processed
        } else {
            trace.enter(PipelineState::Failed);
            self.reject(context, folder, trace)?;
            RunOutcome::Failed
        };

        let rule_errors = result.rule_errors();
        if !rule_errors.is_empty() {
            warn!(rules = rule_errors.len(), "Quality rules failed to run");
            let message = messages::rule_errors(
                &context.business_process,
                &context.pipeline_name,
                &trace.current_location().uri(),
                &rule_errors,
            );
            if let Err(e) = self.steps.notify(context, message) {
                error!(error = %e, "Unable to deliver rule-errors notification");
            }
        }

        Ok(outcome)
    }

    /// Move a passed file to the processed area and the target bucket, then catalog it
    #[allow(clippy::too_many_arguments)]
    fn publish(
        &self,
        context: &ProcessContext,
        config: &Config,
        folder: &PipelineProcessFolder,
        staged: &FileLocation,
        error_rows: &[usize],
        trace: &mut RunTrace,
        state: &mut RunState,
    ) -> PipelineResult<()> {
        let target_key = paths::target_key(&staged.key, &config.file_name_timestamp)?;

        let published = match self.publish_file(context, folder, staged, &target_key, trace) {
            Ok(published) => published,
            Err(e) => {
                error!(error = %e, "Publishing failed, moving file to the error area");
                let report = ErrorReport::new(ErrorKind::Publication, &e);
                if let Err(compensation) = self.move_to_error(folder, trace) {
                    error!(error = %compensation, "Failed to move unpublished file to the error area");
                }
                let location = trace.current_location().clone();
                self.notify_unknown(context, &location, &report);
                return Err(PipelineError::publication(location, e));
            }
        };
        state.published = Some(published.clone());

        match self.catalog(context, config, &target_key, error_rows) {
            Ok(columnar_key) => {
                state.columnar_key = Some(columnar_key);
                trace.enter(PipelineState::CatalogUpdated);
                let message =
                    messages::success(&context.business_process, &context.pipeline_name, &published.uri());
                if let Err(e) = self.steps.notify(context, message) {
                    error!(error = %e, "Unable to deliver success notification");
                }
            }
            Err(e) => {
                error!(error = %e, "Cataloging failed, the file stays processed");
                let columnar_key = paths::parquet_key(&target_key, &config.file_name_timestamp)?;
                if let Err(cleanup) = self.steps.delete_if_exists(&context.target_bucket, &columnar_key) {
                    warn!(key = %columnar_key, error = %cleanup, "Failed to delete partial columnar copy");
                }
                let report = ErrorReport::new(e.kind(), &e);
                state.catalog_error = Some(report.describe());
                let message = messages::catalog_error(
                    &context.business_process,
                    &context.pipeline_name,
                    &published.uri(),
                    &report,
                );
                if let Err(e) = self.steps.notify(context, message) {
                    error!(error = %e, "Unable to deliver catalog-error notification");
                }
            }
        }
        Ok(())
    }

    /// Returns the copy in the target bucket
    fn publish_file(
        &self,
        context: &ProcessContext,
        folder: &PipelineProcessFolder,
        staged: &FileLocation,
        target_key: &str,
        trace: &mut RunTrace,
    ) -> PipelineResult<FileLocation> {
        let processed = self
            .steps
            .move_to(staged, &staged.bucket, &folder.processed())?;
        let processed = trace.record_location(processed);
        trace.enter(PipelineState::Moved);

        self.steps.tag_status(&processed, FileStatus::Processed)?;
        self.steps
            .copy(&processed, &context.target_bucket, target_key)
    }

    /// Write the columnar copy and register it; returns the columnar key
    fn catalog(
        &self,
        context: &ProcessContext,
        config: &Config,
        target_key: &str,
        error_rows: &[usize],
    ) -> PipelineResult<String> {
        let columnar_key = self
            .steps
            .write_columnar(context, target_key, config, error_rows)?;
        self.steps.sync_catalog(context, target_key, config)?;
        Ok(columnar_key)
    }

    /// Handle a file that failed its quality check
    fn reject(
        &self,
        context: &ProcessContext,
        folder: &PipelineProcessFolder,
        trace: &mut RunTrace,
    ) -> PipelineResult<()> {
        self.move_to_error(folder, trace)?;
        let message = messages::pipeline_failed(
            &context.business_process,
            &context.pipeline_name,
            &trace.current_location().uri(),
        );
        if let Err(e) = self.steps.notify(context, message) {
            error!(error = %e, "Unable to deliver pipeline-failed notification");
            let report = ErrorReport::new(e.kind(), &e);
            self.notify_unknown(context, trace.current_location(), &report);
        }
        Ok(())
    }

    /// Move the in-flight file to the error area and tag it failed
    ///
    /// A file already in the error area is only tagged.
    fn move_to_error(&self, folder: &PipelineProcessFolder, trace: &mut RunTrace) -> PipelineResult<()> {
        let current = trace.current_location().clone();
        let errored = if current.key == folder.error() {
            current
        } else {
            let moved = self
                .steps
                .move_to(&current, &current.bucket, &folder.error())?;
            let moved = trace.record_location(moved);
            trace.enter(PipelineState::MovedToError);
            moved
        };
        self.steps.tag_status(&errored, FileStatus::Failed)
    }

    fn handle_error(
        &self,
        context: &ProcessContext,
        folder: Option<&PipelineProcessFolder>,
        mut trace: RunTrace,
        state: RunState,
        error: PipelineError,
    ) -> PipelineResult<PipelineReport> {
        let kind = error.kind();
        trace.fail(error.to_string());

        match (kind, folder) {
            (ErrorKind::Tagging | ErrorKind::Quality, Some(folder)) => {
                warn!(kind = %kind, error = %error, "Step failed, moving file to the error area");
                if let Err(compensation) = self.compensate(context, folder, &mut trace) {
                    error!(error = %compensation, "Compensation failed");
                    trace.enter(PipelineState::UnknownError);
                    let report = ErrorReport::new(compensation.kind(), &compensation);
                    self.notify_unknown(context, trace.current_location(), &report);
                }
                trace.enter(PipelineState::Done);
                Ok(Self::report(context, RunOutcome::Failed, trace, state))
            }
            (ErrorKind::MissingValue, _) => {
                error!(error = %error, "Missing required value, leaving file in place");
                Err(error)
            }
            (ErrorKind::Publication, _) => {
                trace.enter(PipelineState::Done);
                error!(error = %error, location = %trace.current_location(), "Publication failed");
                Err(error)
            }
            _ => {
                error!(kind = %kind, error = %error, "Pipeline run failed");
                trace.enter(PipelineState::UnknownError);
                let report = ErrorReport::new(kind, &error);
                self.notify_unknown(context, trace.current_location(), &report);
                trace.enter(PipelineState::Done);
                Err(error)
            }
        }
    }

    /// Treat the file like one that failed its quality check
    fn compensate(
        &self,
        context: &ProcessContext,
        folder: &PipelineProcessFolder,
        trace: &mut RunTrace,
    ) -> PipelineResult<()> {
        if !trace.has_entered(PipelineState::Failed) {
            trace.enter(PipelineState::Failed);
        }
        self.reject(context, folder, trace)
    }

    /// Send an unknown-error notification; delivery failures are only logged
    fn notify_unknown(&self, context: &ProcessContext, location: &FileLocation, report: &ErrorReport) {
        let message = messages::unknown_error(
            &context.business_process,
            &context.pipeline_name,
            &location.uri(),
            report,
        );
        if let Err(e) = self.steps.notify(context, message) {
            error!(error = %e, "Unable to deliver unknown-error notification");
        }
    }

    fn report(
        context: &ProcessContext,
        outcome: RunOutcome,
        trace: RunTrace,
        state: RunState,
    ) -> PipelineReport {
        PipelineReport {
            correlation_id: context.correlation_id.clone(),
            outcome,
            final_location: trace.current_location().clone(),
            published: state.published,
            columnar_key: state.columnar_key,
            quality: state.quality,
            catalog_error: state.catalog_error,
            trace,
        }
    }
}
