//! End-to-end runs of the orchestrator against in-memory collaborators

use std::sync::Arc;

use file_ingest_pipeline::hashing::{ContentHasher, Sha256Hasher};
use file_ingest_pipeline::notification::{NotificationKind, RecordingNotifier};
use file_ingest_pipeline::pipeline::{
    Collaborators, ErrorKind, PipelineOrchestrator, PipelineState, ProcessContext, RunOutcome,
};
use file_ingest_pipeline::quality::{
    CheckResult, QualityError, QualityRequest, RuleException, RuleResult, RuleStatus,
    ScriptedQualityEngine,
};
use file_ingest_pipeline::storage::memory::StoreOperation;
use file_ingest_pipeline::storage::{FileLocation, MemoryObjectStore, ObjectStore, TagStore};
use file_ingest_pipeline::{Config, Frame, InMemoryCatalog, ParquetSerializer, Settings};
use serde_json::json;

const SOURCE_KEY: &str = "CFM/Everest/Holdings/Automated/Holdings20200205233143.csv";
const STAGED_KEY: &str = "CFM/Everest/Holdings/AutomatedStatus/ToBeProcessed/Holdings20200205233143.csv";
const PROCESSED_KEY: &str =
    "CFM/Everest/Holdings/AutomatedStatus/Processed/2020/202002/Holdings20200205233143.csv";
const ERROR_KEY: &str =
    "CFM/Everest/Holdings/AutomatedStatus/ProcessFailed/2020/202002/Holdings20200205233143.csv";
const TARGET_KEY: &str = "CFM/Everest/Holdings/2020/202002/Holdings20200205233143.csv";
const PARQUET_KEY: &str = "CFM/Everest/Holdings/parquet/year=2020/year_month=202002/year_month_day=20200205/Holdings20200205233143.parquet";
const SUMMARY_KEY: &str = "CFM/error_reporting/summary/year=2020/year_month=202002/process=Everest/data_source=Holdings/Holdings20200205233143.parquet.snappy";
const DETAILED_KEY: &str = "CFM/error_reporting/detailed/year=2020/year_month=202002/process=Everest/data_source=Holdings/Holdings20200205233143.parquet.snappy";

const CSV: &str = "Portfolio_Name,Portfolio_ID,MarketValue\nAlpha,1,100.50\nBeta,2,200.25\n,3,300.00\n";

const CONFIG: &str = r#"{
    "delimiter": ",",
    "file_name_timestamp": "%Y%m%d%H%M%S",
    "schema": [
        {"name": "asofdate", "type": "DATE", "is_calculated": "true"},
        {"name": "Portfolio_Name", "type": "STRING"},
        {"name": "Portfolio_ID", "type": "INT"},
        {"name": "MarketValue", "type": "DECIMAL(18,2)"},
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

struct Harness {
    store: Arc<MemoryObjectStore>,
    catalog: Arc<InMemoryCatalog>,
    notifier: Arc<RecordingNotifier>,
    quality: Arc<ScriptedQualityEngine>,
    orchestrator: PipelineOrchestrator,
    context: ProcessContext,
    config: Config,
}

impl Harness {
    fn new(quality: ScriptedQualityEngine) -> Self {
        Self::with_file(quality, CSV)
    }

    fn with_file(quality: ScriptedQualityEngine, content: &str) -> Self {
        let store = Arc::new(MemoryObjectStore::with_buckets(["raw", "curated"]));
        let landed = store
            .put_object("raw", SOURCE_KEY, content.as_bytes())
            .unwrap();

        let catalog = Arc::new(InMemoryCatalog::new(
            ["curated"],
            ["details-crawler", "summary-crawler"],
        ));
        let notifier = Arc::new(RecordingNotifier::new());
        let quality = Arc::new(quality);

        let collaborators = Collaborators {
            store: store.clone(),
            tags: store.clone(),
            hasher: Arc::new(Sha256Hasher),
            quality: quality.clone(),
            serializer: Arc::new(ParquetSerializer::default()),
            catalog: catalog.clone(),
            notifier: notifier.clone(),
        };
        let orchestrator = PipelineOrchestrator::new(collaborators, &Settings::default());

        let context = ProcessContext {
            correlation_id: "3f1c-run".to_string(),
            file: landed,
            target_bucket: "curated".to_string(),
            processed_on: "2020-02-06T08:15:00.000Z".to_string(),
            business_process: "Everest".to_string(),
            pipeline_name: "holdings".to_string(),
            business_email: "desk@example.com; ops@example.com".to_string(),
            support_email: "support@example.com".to_string(),
            account_number: "123456789012".to_string(),
            error_details_crawler: "details-crawler".to_string(),
            error_summary_crawler: "summary-crawler".to_string(),
        };

        Self {
            store,
            catalog,
            notifier,
            quality,
            orchestrator,
            context,
            config: Config::from_json_str(CONFIG).unwrap(),
        }
    }

    fn tags(&self, bucket: &str, key: &str) -> std::collections::BTreeMap<String, String> {
        self.store.get_tags(&FileLocation::new(bucket, key)).unwrap()
    }

    fn kinds(&self) -> Vec<NotificationKind> {
        self.notifier.sent().iter().map(|p| p.kind).collect()
    }
}

fn summary(rules: &[RuleResult]) -> Frame {
    Frame::from_rows(
        ["rule", "status", "score"],
        rules
            .iter()
            .map(|r| vec![json!(r.name), json!(r.status.code()), json!(r.score)])
            .collect(),
    )
    .unwrap()
}

fn result(passed: bool, rules: Vec<RuleResult>) -> Result<CheckResult, QualityError> {
    Ok(CheckResult {
        overall_score: if passed { 1.0 } else { 0.0 },
        passed,
        summary: summary(&rules),
        rules,
    })
}

/// Fails the file when a column of the rule set's schema is absent
fn column_check(request: &QualityRequest<'_>) -> Result<CheckResult, QualityError> {
    let missing: Vec<&str> = request
        .rule_set
        .schema
        .iter()
        .map(|c| c.name.as_str())
        .filter(|name| !request.frame.has_column(name))
        .collect();
    let status = if missing.is_empty() {
        RuleStatus::Pass
    } else {
        RuleStatus::Fail
    };
    let score = if missing.is_empty() { 1.0 } else { 0.0 };
    result(
        missing.is_empty(),
        vec![RuleResult::new("column_count", status, Some(score))],
    )
}

#[test]
fn test_passed_file_is_published_and_cataloged() {
    let harness = Harness::new(ScriptedQualityEngine::passing());
    let report = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Processed);
    assert!(report.is_success());
    assert_eq!(report.final_location.key, PROCESSED_KEY);
    assert_eq!(report.columnar_key.as_deref(), Some(PARQUET_KEY));
    assert_eq!(
        report.trace.states(),
        vec![
            PipelineState::Received,
            PipelineState::Hashed,
            PipelineState::Staged,
            PipelineState::QualityChecked,
            PipelineState::Passed,
            PipelineState::Moved,
            PipelineState::CatalogUpdated,
            PipelineState::Done,
        ]
    );

    let raw = harness.store.keys("raw");
    assert!(raw.contains(&SOURCE_KEY.to_string()));
    assert!(raw.contains(&PROCESSED_KEY.to_string()));
    assert!(!raw.contains(&STAGED_KEY.to_string()));

    let curated = harness.store.keys("curated");
    assert!(curated.contains(&TARGET_KEY.to_string()));
    assert!(curated.contains(&PARQUET_KEY.to_string()));
    assert!(curated.contains(&SUMMARY_KEY.to_string()));
    assert!(!curated.contains(&DETAILED_KEY.to_string()));

    let expected_hash = Sha256Hasher.hash(&mut CSV.as_bytes()).unwrap();
    let tags = harness.tags("raw", PROCESSED_KEY);
    assert_eq!(tags["hash"], expected_hash);
    assert_eq!(tags["correlation_id"], "3f1c-run");
    assert_eq!(tags["status"], "processed");
    assert_eq!(tags["overall_quality_score"], "1.0");
    assert_eq!(tags["quality_score_summary"], "blank=1.0:column_count=1.0");
    assert_eq!(tags["quality_status_summary"], "blank=P:column_count=P");

    let table = harness.catalog.table("curated", "holdings").unwrap();
    assert_eq!(
        table.location,
        "s3://curated/CFM/Everest/Holdings/parquet/"
    );
    let partitions = harness.catalog.partitions("curated", "holdings");
    assert_eq!(partitions.len(), 1);
    assert_eq!(partitions[0].values, vec!["2020", "202002", "20200205"]);
    assert_eq!(harness.catalog.crawler_runs(), vec!["summary-crawler"]);

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::Success);
    assert_eq!(
        sent[0].topic_arn,
        "arn:aws:sns:eu-west-1:123456789012:success-notifications"
    );
    assert_eq!(sent[0].email_to, vec!["desk@example.com", "ops@example.com"]);
    assert!(sent[0].text.contains(&format!("s3://curated/{}", TARGET_KEY)));
}

#[test]
fn test_quality_check_sees_file_header_and_as_of_date() {
    let harness = Harness::new(ScriptedQualityEngine::passing());
    harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap();

    let checks = harness.quality.checks();
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].location.key, STAGED_KEY);
    assert_eq!(checks[0].correlation_id, "3f1c-run");
    assert_eq!(
        checks[0].frame.columns(),
        &["asofdate", "Portfolio_Name", "Portfolio_ID", "MarketValue"]
    );
    assert_eq!(checks[0].frame.rows()[0][0], json!("2020-02-05"));
}

#[test]
fn test_missing_columns_fail_the_file() {
    let csv = "Portfolio_Name,Portfolio_ID\nAlpha,1\n";
    let harness = Harness::with_file(ScriptedQualityEngine::new(column_check), csv);
    let report = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert_eq!(report.final_location.key, ERROR_KEY);
    assert!(report.trace.has_entered(PipelineState::Failed));
    assert!(report.trace.has_entered(PipelineState::MovedToError));
    assert_eq!(report.trace.state(), PipelineState::Done);

    let raw = harness.store.keys("raw");
    assert!(raw.contains(&ERROR_KEY.to_string()));
    assert!(!raw.contains(&STAGED_KEY.to_string()));
    assert_eq!(harness.tags("raw", ERROR_KEY)["status"], "failed");
    assert_eq!(harness.tags("raw", ERROR_KEY)["quality_status_summary"], "column_count=F");

    let curated = harness.store.keys("curated");
    assert_eq!(curated, vec![SUMMARY_KEY.to_string()]);
    assert!(harness.catalog.table("curated", "holdings").is_none());

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::PipelineFailed);
    assert_eq!(sent[0].subject, "Everest Failed");
    assert_eq!(sent[0].email_to, vec!["support@example.com"]);
    assert!(sent[0].text.contains(&format!("s3://raw/{}", ERROR_KEY)));
}

#[test]
fn test_rule_errors_send_one_notification() {
    let engine = ScriptedQualityEngine::new(|_| {
        result(
            true,
            vec![
                RuleResult::new("blank", RuleStatus::Pass, Some(1.0)),
                RuleResult::new("lookup", RuleStatus::Error, None).with_exception(RuleException {
                    kind: "KeyError".to_string(),
                    message: "'code'".to_string(),
                    trace: "lookup.rs:12".to_string(),
                }),
                RuleResult::new("regex", RuleStatus::Error, None),
            ],
        )
    });
    let harness = Harness::new(engine);
    let report = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Processed);
    assert_eq!(
        harness.kinds(),
        vec![NotificationKind::Success, NotificationKind::RuleErrors]
    );

    let rule_errors = harness.notifier.sent_of(NotificationKind::RuleErrors);
    assert_eq!(rule_errors.len(), 1);
    assert_eq!(rule_errors[0].subject, "Everest rule errors");
    assert!(rule_errors[0].text.contains("Rule: lookup\nError:KeyError: 'code'"));
    assert!(rule_errors[0].text.contains("Rule: regex"));

    let tags = harness.tags("raw", PROCESSED_KEY);
    assert_eq!(tags["quality_status_summary"], "blank=P:lookup=E:regex=E");
    assert_eq!(tags["quality_score_summary"], "blank=1.0");
}

#[test]
fn test_detailed_report_written_for_error_rows() {
    let engine = ScriptedQualityEngine::new(|_| {
        let errors = Frame::from_rows(
            ["row_index", "Portfolio_Name"],
            vec![vec![json!(2), json!(null)]],
        )
        .unwrap();
        result(
            true,
            vec![RuleResult::new("blank", RuleStatus::Fail, Some(0.67)).with_errors(errors)],
        )
    });
    let harness = Harness::new(engine);
    let report = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Processed);
    let curated = harness.store.keys("curated");
    assert!(curated.contains(&DETAILED_KEY.to_string()));
    assert!(curated.contains(&SUMMARY_KEY.to_string()));
    assert!(curated.contains(&PARQUET_KEY.to_string()));
    assert_eq!(
        harness.catalog.crawler_runs(),
        vec!["summary-crawler", "details-crawler"]
    );
}

#[test]
fn test_publication_failure_moves_file_to_error() {
    let harness = Harness::new(ScriptedQualityEngine::passing());
    harness.store.fail_on(StoreOperation::Copy, "Holdings/2020/");

    let err = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Publication);

    let raw = harness.store.keys("raw");
    assert!(raw.contains(&ERROR_KEY.to_string()));
    assert!(!raw.contains(&PROCESSED_KEY.to_string()));
    assert_eq!(harness.tags("raw", ERROR_KEY)["status"], "failed");

    let curated = harness.store.keys("curated");
    assert!(!curated.contains(&TARGET_KEY.to_string()));
    assert!(!curated.contains(&PARQUET_KEY.to_string()));

    assert_eq!(harness.kinds(), vec![NotificationKind::UnknownError]);
    let sent = harness.notifier.sent();
    assert!(sent[0].text.contains("PublicationError"));
    assert!(sent[0].text.contains("injected Copy failure"));
}

#[test]
fn test_tagging_failure_is_compensated() {
    let harness = Harness::new(ScriptedQualityEngine::passing());
    harness.store.fail_on(StoreOperation::PutTags, "ToBeProcessed");

    let report = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert_eq!(report.final_location.key, ERROR_KEY);
    assert!(report.trace.error.as_deref().unwrap().contains("Tagging failed"));
    assert!(harness.quality.checks().is_empty());

    let raw = harness.store.keys("raw");
    assert!(raw.contains(&ERROR_KEY.to_string()));
    assert!(!raw.contains(&STAGED_KEY.to_string()));
    assert_eq!(harness.tags("raw", ERROR_KEY)["status"], "failed");
    assert_eq!(harness.kinds(), vec![NotificationKind::PipelineFailed]);
}

#[test]
fn test_quality_engine_failure_is_compensated() {
    let harness = Harness::new(ScriptedQualityEngine::broken("rule engine unavailable"));
    let report = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert_eq!(report.final_location.key, ERROR_KEY);
    assert!(report.quality.is_none());
    assert_eq!(harness.kinds(), vec![NotificationKind::PipelineFailed]);
    assert!(harness.store.keys("curated").is_empty());
}

#[test]
fn test_failed_compensation_sends_unknown_error() {
    let harness = Harness::new(ScriptedQualityEngine::passing());
    harness.store.fail_on(StoreOperation::PutTags, "ToBeProcessed");
    harness.store.fail_on(StoreOperation::Copy, "ProcessFailed");

    let report = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert_eq!(report.final_location.key, STAGED_KEY);
    assert!(report.trace.has_entered(PipelineState::UnknownError));
    assert_eq!(harness.kinds(), vec![NotificationKind::UnknownError]);
}

#[test]
fn test_invalid_processed_on_is_unknown_error() {
    let mut harness = Harness::new(ScriptedQualityEngine::passing());
    harness.context.processed_on = "yesterday".to_string();

    let err = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);

    assert_eq!(harness.store.keys("raw"), vec![SOURCE_KEY.to_string()]);
    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::UnknownError);
    assert!(sent[0].text.contains("Invalid processed-on timestamp 'yesterday'"));
    assert!(sent[0].text.contains(&format!("s3://raw/{}", SOURCE_KEY)));
}

#[test]
fn test_catalog_failure_keeps_file_processed() {
    let harness = Harness::new(ScriptedQualityEngine::passing());
    harness.catalog.fail_registrations("catalog unavailable");

    let report = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap();

    assert_eq!(report.outcome, RunOutcome::Processed);
    assert_eq!(report.final_location.key, PROCESSED_KEY);
    assert!(report.columnar_key.is_none());
    assert!(report.catalog_error.as_deref().unwrap().contains("catalog unavailable"));
    assert!(!report.trace.has_entered(PipelineState::CatalogUpdated));

    let curated = harness.store.keys("curated");
    assert!(curated.contains(&TARGET_KEY.to_string()));
    assert!(!curated.contains(&PARQUET_KEY.to_string()));
    assert_eq!(harness.tags("raw", PROCESSED_KEY)["status"], "processed");

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::CatalogError);
    assert_eq!(sent[0].email_to, vec!["support@example.com"]);
    assert!(sent[0].text.contains("unable to create Parquet/Catalog"));
}

#[test]
fn test_missing_bucket_is_fatal_without_notification() {
    let mut harness = Harness::new(ScriptedQualityEngine::passing());
    harness.context.file = FileLocation::new("", SOURCE_KEY);

    let err = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingValue);
    assert!(harness.notifier.sent().is_empty());
    assert_eq!(harness.store.keys("raw"), vec![SOURCE_KEY.to_string()]);
}

#[test]
fn test_notification_outage_does_not_lose_the_file() {
    let harness = Harness::new(ScriptedQualityEngine::failing());
    harness.notifier.fail_with("topic unavailable");

    let report = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap();
    assert_eq!(report.outcome, RunOutcome::Failed);
    assert_eq!(report.final_location.key, ERROR_KEY);
    assert!(harness.store.keys("raw").contains(&ERROR_KEY.to_string()));
    assert_eq!(harness.tags("raw", ERROR_KEY)["status"], "failed");

    assert!(harness.notifier.sent().is_empty());
    let attempted: Vec<NotificationKind> =
        harness.notifier.attempted().iter().map(|p| p.kind).collect();
    assert_eq!(
        attempted,
        vec![NotificationKind::PipelineFailed, NotificationKind::UnknownError]
    );
}

#[test]
fn test_undelivered_failure_notice_is_reported_as_unknown_error() {
    let harness = Harness::new(ScriptedQualityEngine::failing());
    harness
        .notifier
        .fail_kind(NotificationKind::PipelineFailed, "topic unavailable");

    let report = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap();
    assert_eq!(report.outcome, RunOutcome::Failed);
    assert!(!report.trace.has_entered(PipelineState::UnknownError));

    let sent = harness.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::UnknownError);
    assert!(sent[0].text.contains("topic unavailable"));
    assert!(sent[0].text.contains(&format!("s3://raw/{}", ERROR_KEY)));
}

#[test]
fn test_success_notification_outage_keeps_run_processed() {
    let harness = Harness::new(ScriptedQualityEngine::passing());
    harness
        .notifier
        .fail_kind(NotificationKind::Success, "topic unavailable");

    let report = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap();
    assert_eq!(report.outcome, RunOutcome::Processed);
    assert!(report.trace.has_entered(PipelineState::CatalogUpdated));
    assert!(!report.trace.has_entered(PipelineState::UnknownError));
    assert!(harness.store.keys("curated").contains(&PARQUET_KEY.to_string()));
    assert!(harness.notifier.sent().is_empty());
    assert_eq!(harness.notifier.attempted().len(), 1);
}

#[test]
fn test_ragged_engine_answer_is_compensated() {
    let engine = ScriptedQualityEngine::new(|_| {
        let body = json!({
            "overall_score": 0.5,
            "passed": true,
            "rules": [{
                "name": "blank",
                "status": "Fail",
                "score": 0.5,
                "errors": {"columns": ["row_index", "Portfolio_Name"], "rows": [[1]]}
            }]
        });
        CheckResult::from_json(body.to_string().as_bytes())
    });
    let harness = Harness::new(engine);

    let report = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap();
    assert_eq!(report.outcome, RunOutcome::Failed);
    assert_eq!(report.final_location.key, ERROR_KEY);
    assert!(report.trace.error.as_deref().unwrap().contains("expected 2"));
    assert_eq!(harness.kinds(), vec![NotificationKind::PipelineFailed]);
    assert!(harness.store.keys("curated").is_empty());
}

#[test]
fn test_run_from_object_created_event() {
    let mut harness = Harness::new(ScriptedQualityEngine::passing());
    let environment = file_ingest_pipeline::TriggerEnvironment {
        business_process: Some("Everest".to_string()),
        pipeline_name: Some("holdings".to_string()),
        business_email: Some("desk@example.com".to_string()),
        support_email: Some("support@example.com".to_string()),
        target_bucket: Some("curated".to_string()),
        account_number: Some("123456789012".to_string()),
        error_details_crawler: Some("details-crawler".to_string()),
        error_summary_crawler: Some("summary-crawler".to_string()),
        log_level: None,
    };
    let event = json!({
        "Records": [{
            "eventTime": "2020-02-06T08:15:00.000Z",
            "s3": {
                "bucket": {"name": "raw"},
                "object": {"key": SOURCE_KEY, "versionId": harness.context.file.version_id}
            }
        }]
    });
    harness.context = ProcessContext::from_event(&event, &environment, "request-1").unwrap();

    let report = harness
        .orchestrator
        .run(&harness.context, &harness.config)
        .unwrap();
    assert_eq!(report.correlation_id, "request-1");
    assert_eq!(report.outcome, RunOutcome::Processed);
    assert_eq!(harness.tags("raw", PROCESSED_KEY)["correlation_id"], "request-1");
    assert_eq!(harness.kinds(), vec![NotificationKind::Success]);
}
