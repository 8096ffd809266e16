//! CLI command implementations
//!
//! Every command loads the configuration, installs logging and opens the
//! configured database before doing its work.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use super::args::Command;
use super::errors::{CliError, CliResult};
use crate::config::AppConfig;
use crate::observability::{self, LogFormat};
use crate::rest_api::RestServer;
use crate::store::Database;
use crate::tours::TourService;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { env_file } => serve(env_file.as_deref()),
        Command::Import { file, env_file } => import(&file, env_file.as_deref()),
        Command::DeleteAll { env_file } => delete_all(env_file.as_deref()),
    }
}

/// Loads configuration and logging, then opens the tour collection.
fn boot(env_file: Option<&Path>) -> CliResult<(AppConfig, TourService)> {
    let config = AppConfig::load(env_file)?;
    observability::init(LogFormat::from_env());
    let service = open_service(&config)?;
    Ok((config, service))
}

/// Opens the configured database and its tours collection.
pub fn open_service(config: &AppConfig) -> CliResult<TourService> {
    let database = Database::connect(&config.database)?;
    let service = TourService::open(&database)?
        .with_monthly_plan_range(config.monthly_plan_range());
    debug!(environment = %config.environment, "tours collection opened");
    Ok(service)
}

/// Start the HTTP server and block until shutdown
pub fn serve(env_file: Option<&Path>) -> CliResult<()> {
    let (config, service) = boot(env_file)?;
    let server = RestServer::new(config, service);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Import tours from a JSON file
pub fn import(file: &Path, env_file: Option<&Path>) -> CliResult<()> {
    let (_config, service) = boot(env_file)?;
    let count = import_file(&service, file)?;
    println!("Data successfully loaded! ({} tours)", count);
    Ok(())
}

/// Delete every tour
pub fn delete_all(env_file: Option<&Path>) -> CliResult<()> {
    let (_config, service) = boot(env_file)?;
    let count = service.delete_all()?;
    println!("Data successfully deleted! ({} tours)", count);
    Ok(())
}

/// Reads a JSON array of tours from `path`.
pub fn read_tours(path: &Path) -> CliResult<Vec<Value>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("Failed to read {}: {}", path.display(), e)))?;
    match serde_json::from_str(&raw)? {
        Value::Array(tours) => Ok(tours),
        _ => Err(CliError::io_error(format!(
            "{} must contain a JSON array of tours",
            path.display()
        ))),
    }
}

/// Validates and inserts every tour in `path`; all or nothing.
pub fn import_file(service: &TourService, path: &Path) -> CliResult<usize> {
    let tours = read_tours(path)?;
    Ok(service.import(&tours)?)
}
