//! ingest-pipeline - run and inspect the file ingestion pipeline

mod commands;
mod error;
mod logging;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::run::RunArgs;
use commands::trigger::TriggerArgs;
use file_ingest_pipeline::TriggerEnvironment;
use error::CliError;
use logging::LogFormat;

#[derive(Parser)]
#[command(name = "ingest-pipeline")]
#[command(about = "Staged ingestion of delimited files landed in an object store", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter, overridden by RUST_LOG; defaults to LOG_LEVEL for `trigger`, else info
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one landed file
    Run(Box<RunArgs>),
    /// Ingest the file announced by an object-created event
    Trigger(Box<TriggerArgs>),
    /// Parse and validate a pipeline configuration
    ValidateConfig {
        /// Configuration file (JSON or YAML)
        config: PathBuf,
        /// Only report success or failure
        #[arg(long)]
        quiet: bool,
    },
    /// Show the keys derived for a landed file
    Keys {
        #[arg(long)]
        file_key: String,
        /// Format of the timestamp embedded in the file name
        #[arg(long, default_value = "%Y%m%d%H%M%S")]
        format: String,
        /// Processing timestamp, adds the staging folders
        #[arg(long)]
        processed_on: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let environment = TriggerEnvironment::from_env();

    let level = match (&cli.log_level, &cli.command) {
        (Some(level), _) => level.clone(),
        (None, Commands::Trigger(_)) => environment.log_filter().to_string(),
        (None, _) => "info".to_string(),
    };
    let _guard = match logging::init(&level, cli.log_format) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    match execute(cli.command, &environment) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn execute(command: Commands, environment: &TriggerEnvironment) -> Result<(), CliError> {
    match command {
        Commands::Run(args) => commands::run::handle_run(&args),
        Commands::Trigger(args) => commands::trigger::handle_trigger(&args, environment),
        Commands::ValidateConfig { config, quiet } => {
            commands::validate::handle_validate_config(&config, quiet)
        }
        Commands::Keys {
            file_key,
            format,
            processed_on,
            json,
        } => commands::keys::handle_keys(&file_key, &format, processed_on.as_deref(), json),
    }
}
