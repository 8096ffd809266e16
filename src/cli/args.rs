//! CLI argument definitions using clap
//!
//! Commands:
//! - natours serve [--env-file <path>]
//! - natours import --file <json> [--env-file <path>]
//! - natours delete-all [--env-file <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Natours - tours REST API
#[derive(Parser, Debug)]
#[command(name = "natours")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Env file read before the process environment
        #[arg(long)]
        env_file: Option<PathBuf>,
    },

    /// Load a JSON array of tours into the configured database
    Import {
        /// Path to the JSON file
        #[arg(long)]
        file: PathBuf,

        /// Env file read before the process environment
        #[arg(long)]
        env_file: Option<PathBuf>,
    },

    /// Delete every tour in the configured database
    DeleteAll {
        /// Env file read before the process environment
        #[arg(long)]
        env_file: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import() {
        let cli = Cli::try_parse_from(["natours", "import", "--file", "tours.json"]).unwrap();
        match cli.command {
            Command::Import { file, env_file } => {
                assert_eq!(file, PathBuf::from("tours.json"));
                assert!(env_file.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_delete_all_with_env_file() {
        let cli =
            Cli::try_parse_from(["natours", "delete-all", "--env-file", "prod.env"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::DeleteAll { env_file: Some(ref p) } if p == &PathBuf::from("prod.env")
        ));
    }

    #[test]
    fn test_import_requires_file() {
        assert!(Cli::try_parse_from(["natours", "import"]).is_err());
    }
}
