//! Validate-config command implementation

use std::path::Path;

use file_ingest_pipeline::Config;

use crate::error::CliError;
use crate::output;

/// Handle the `validate-config` command
pub fn handle_validate_config(path: &Path, quiet: bool) -> Result<(), CliError> {
    if !path.exists() {
        return Err(CliError::FileReadError(
            path.to_path_buf(),
            "file does not exist".to_string(),
        ));
    }

    let config = Config::from_path(path)?;
    if !quiet {
        print!("{}", output::format_config_summary(&config));
    }
    println!("Validation successful");
    Ok(())
}
