//! Trigger command implementation

use std::path::PathBuf;

use clap::Args;
use file_ingest_pipeline::{ProcessContext, TriggerEnvironment};
use tracing::info;

use super::run::{self, RuntimeArgs};
use crate::error::CliError;

/// Arguments for the `trigger` command
#[derive(Debug, Args)]
pub struct TriggerArgs {
    /// Object-created event as delivered by the storage service (JSON)
    #[arg(long)]
    pub event: PathBuf,
    /// Request id of the invocation, used as correlation id (random when omitted)
    #[arg(long)]
    pub request_id: Option<String>,
    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

/// Handle the `trigger` command
///
/// The pipeline description comes from the environment, see
/// [`TriggerEnvironment`].
pub fn handle_trigger(args: &TriggerArgs, environment: &TriggerEnvironment) -> Result<(), CliError> {
    let content = std::fs::read_to_string(&args.event)
        .map_err(|e| CliError::FileReadError(args.event.clone(), e.to_string()))?;
    let event: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| CliError::FileReadError(args.event.clone(), e.to_string()))?;

    let request_id = args
        .request_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let context = ProcessContext::from_event(&event, environment, &request_id)?;
    info!(
        correlation_id = %context.correlation_id,
        file = %context.file,
        pipeline = %context.pipeline_name,
        "Triggered by object-created event"
    );

    run::execute(&args.runtime, context)
}
