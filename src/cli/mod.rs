//! CLI module for Natours
//!
//! Provides command-line interface for:
//! - serve: Start the HTTP server
//! - import: Load tours from a JSON file
//! - delete-all: Empty the tours collection

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{
    delete_all, import, import_file, open_service, read_tours, run, run_command, serve,
};
pub use errors::{CliError, CliErrorCode, CliResult};
