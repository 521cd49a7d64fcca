//! Run command implementation

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, ValueEnum};
use file_ingest_pipeline::notification::LogNotifier;
use file_ingest_pipeline::quality::QualityEngine;
use file_ingest_pipeline::{
    Collaborators, Config, FileLocation, FileSystemObjectStore, InMemoryCatalog,
    ParquetSerializer, PipelineOrchestrator, ProcessContext, ScriptedQualityEngine, Settings,
    Sha256Hasher,
};
use tracing::{info, warn};

use crate::error::CliError;
use crate::output;

/// Environment variable holding the bearer token of the quality service
#[cfg(feature = "http-quality")]
const QUALITY_TOKEN_VAR: &str = "QUALITY_SERVICE_TOKEN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Local directories as buckets, in-memory catalog, log notifications
    Local,
    /// S3, Glue and SNS
    Aws,
}

/// Arguments for the `run` command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Correlation id of the run (random when omitted)
    #[arg(long)]
    pub correlation_id: Option<String>,
    #[arg(long)]
    pub file_bucket: String,
    #[arg(long)]
    pub file_key: String,
    #[arg(long)]
    pub file_version_id: Option<String>,
    #[arg(long)]
    pub target_bucket: String,
    /// ISO-8601 UTC timestamp, defaults to now
    #[arg(long)]
    pub processed_on: Option<String>,
    #[arg(long)]
    pub business_process: String,
    #[arg(long)]
    pub pipeline_name: String,
    /// `,` or `;` separated
    #[arg(long, default_value = "")]
    pub business_email: String,
    /// `,` or `;` separated
    #[arg(long, default_value = "")]
    pub support_email: String,
    #[arg(long, default_value = "000000000000")]
    pub account_number: String,
    #[arg(long)]
    pub error_details_crawler: String,
    #[arg(long)]
    pub error_summary_crawler: String,
    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

/// Options shared by every command that runs the pipeline
#[derive(Debug, Args)]
pub struct RuntimeArgs {
    /// Pipeline configuration (JSON or YAML)
    #[arg(long)]
    pub config: PathBuf,
    /// Runtime settings (TOML)
    #[arg(long)]
    pub settings: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Backend::Local)]
    pub backend: Backend,
    /// Root directory of the local backend's buckets
    #[arg(long)]
    pub storage_root: Option<PathBuf>,
    /// Base URL of the quality service
    #[arg(long)]
    pub quality_url: Option<String>,
    /// Write the run report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl RunArgs {
    fn context(&self) -> ProcessContext {
        let correlation_id = self
            .correlation_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let processed_on = self.processed_on.clone().unwrap_or_else(|| {
            chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string()
        });

        ProcessContext {
            correlation_id,
            file: FileLocation::new(&self.file_bucket, &self.file_key)
                .with_version(self.file_version_id.clone()),
            target_bucket: self.target_bucket.clone(),
            processed_on,
            business_process: self.business_process.clone(),
            pipeline_name: self.pipeline_name.clone(),
            business_email: self.business_email.clone(),
            support_email: self.support_email.clone(),
            account_number: self.account_number.clone(),
            error_details_crawler: self.error_details_crawler.clone(),
            error_summary_crawler: self.error_summary_crawler.clone(),
        }
    }
}

/// Handle the `run` command
pub fn handle_run(args: &RunArgs) -> Result<(), CliError> {
    execute(&args.runtime, args.context())
}

/// Run the pipeline once for `context`
pub fn execute(args: &RuntimeArgs, context: ProcessContext) -> Result<(), CliError> {
    let settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let config = Config::from_path(&args.config)?;

    let collaborators = match args.backend {
        Backend::Local => local_collaborators(args, &settings, &context)?,
        Backend::Aws => aws_collaborators(args, &settings)?,
    };
    let orchestrator = PipelineOrchestrator::new(collaborators, &settings);

    eprintln!("Starting pipeline run: {}", context.correlation_id);
    let report = orchestrator.run(&context, &config)?;
    report.print_summary();

    if let Some(path) = &args.report {
        output::write_json(path, &report)?;
        info!(path = %path.display(), "Wrote run report");
    }
    Ok(())
}

fn local_collaborators(
    args: &RuntimeArgs,
    settings: &Settings,
    context: &ProcessContext,
) -> Result<Collaborators, CliError> {
    let root = args
        .storage_root
        .clone()
        .or_else(|| settings.storage_root.clone())
        .ok_or_else(|| {
            CliError::InvalidArgument(
                "the local backend needs --storage-root or a storage_root setting".to_string(),
            )
        })?;
    info!(root = %root.display(), "Using local storage");

    let store = Arc::new(FileSystemObjectStore::new(root));
    Ok(Collaborators {
        store: store.clone(),
        tags: store,
        hasher: Arc::new(Sha256Hasher),
        quality: quality_engine(args, settings)?,
        serializer: Arc::new(ParquetSerializer::default()),
        catalog: Arc::new(InMemoryCatalog::new(
            [settings.catalog_database.clone()],
            [
                context.error_details_crawler.clone(),
                context.error_summary_crawler.clone(),
            ],
        )),
        notifier: Arc::new(LogNotifier),
    })
}

#[cfg(feature = "aws")]
fn aws_collaborators(args: &RuntimeArgs, settings: &Settings) -> Result<Collaborators, CliError> {
    use file_ingest_pipeline::aws::AwsContext;
    use file_ingest_pipeline::catalog::GlueCatalog;
    use file_ingest_pipeline::notification::SnsNotifier;
    use file_ingest_pipeline::storage::S3ObjectStore;

    let aws = AwsContext::load(Some(&settings.region), settings.s3_endpoint.as_deref())
        .map_err(|e| CliError::setup("AWS runtime", e))?;
    info!(region = ?aws.region(), endpoint = ?aws.endpoint_url(), "Using AWS backend");

    let store = Arc::new(S3ObjectStore::new(aws.clone()));
    Ok(Collaborators {
        store: store.clone(),
        tags: store,
        hasher: Arc::new(Sha256Hasher),
        quality: quality_engine(args, settings)?,
        serializer: Arc::new(ParquetSerializer::default()),
        catalog: Arc::new(GlueCatalog::new(aws.clone())),
        notifier: Arc::new(SnsNotifier::new(aws)),
    })
}

#[cfg(not(feature = "aws"))]
fn aws_collaborators(_args: &RuntimeArgs, _settings: &Settings) -> Result<Collaborators, CliError> {
    Err(CliError::InvalidArgument(
        "the aws backend requires the 'aws' feature".to_string(),
    ))
}

fn quality_engine(args: &RuntimeArgs, settings: &Settings) -> Result<Arc<dyn QualityEngine>, CliError> {
    let url = args
        .quality_url
        .as_deref()
        .or(settings.quality_service_url.as_deref());

    match url {
        #[cfg(feature = "http-quality")]
        Some(url) => {
            let timeout = std::time::Duration::from_secs(settings.quality_timeout_secs);
            let mut engine = file_ingest_pipeline::quality::HttpQualityEngine::new(url, timeout)
                .map_err(|e| CliError::setup("quality engine", e))?;
            if let Ok(token) = std::env::var(QUALITY_TOKEN_VAR) {
                engine = engine.with_auth_token(token);
            }
            info!(url, timeout_secs = timeout.as_secs(), "Using quality service");
            Ok(Arc::new(engine))
        }
        #[cfg(not(feature = "http-quality"))]
        Some(_) => Err(CliError::InvalidArgument(
            "a quality service URL requires the 'http-quality' feature".to_string(),
        )),
        None => {
            warn!("No quality service configured, every rule passes");
            Ok(Arc::new(ScriptedQualityEngine::passing()))
        }
    }
}
