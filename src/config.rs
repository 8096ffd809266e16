//! Application configuration
//!
//! Settings come from environment variables. An env file (`config.env` by
//! default) is loaded first; variables already set in the process win.
//!
//! | variable | default |
//! |---|---|
//! | `NODE_ENV` / `APP_ENV` | `development` |
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `3000` |
//! | `DATABASE` | `memory://` |
//! | `PUBLIC_DIR` | `./public` |
//! | `CORS_ORIGINS` | empty (any origin) |
//! | `MONTHLY_PLAN_FULL_YEAR` | `false` |

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::aggregate::MonthlyPlanRange;

/// Env file read when none is given
pub const DEFAULT_ENV_FILE: &str = "config.env";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Runtime environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("expected development or production, got {}", other)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// `memory://` or `file://<dir>`
    pub database: String,
    /// Directory served for unmatched GET requests
    pub public_dir: PathBuf,
    /// Allowed CORS origins; empty allows any
    pub cors_origins: Vec<String>,
    /// Whether the monthly plan uses both year bounds
    pub monthly_plan_full_year: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            database: "memory://".to_string(),
            public_dir: PathBuf::from("./public"),
            cors_origins: Vec::new(),
            monthly_plan_full_year: false,
        }
    }
}

impl AppConfig {
    /// Loads the env file, then reads the process environment.
    ///
    /// A missing default env file is fine; a missing explicit one is not.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match env_file {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_ENV_FILE), false),
        };
        match dotenvy::from_path(&path) {
            Ok(()) => debug!(path = %path.display(), "loaded env file"),
            Err(e) if !explicit && e.not_found() => {}
            Err(source) => return Err(ConfigError::EnvFile { path, source }),
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let environment = match var("NODE_ENV").or_else(|| var("APP_ENV")) {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                key: "NODE_ENV",
                value: raw,
                reason,
            })?,
            None => defaults.environment,
        };

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw.clone(),
                reason: "expected a port number".to_string(),
            })?,
            None => defaults.port,
        };

        let monthly_plan_full_year = match var("MONTHLY_PLAN_FULL_YEAR") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "MONTHLY_PLAN_FULL_YEAR",
                value: raw.clone(),
                reason: "expected true or false".to_string(),
            })?,
            None => defaults.monthly_plan_full_year,
        };

        let cors_origins = var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or(defaults.cors_origins);

        Ok(Self {
            environment,
            host: var("HOST").unwrap_or(defaults.host),
            port,
            database: var("DATABASE").unwrap_or(defaults.database),
            public_dir: var("PUBLIC_DIR").map(PathBuf::from).unwrap_or(defaults.public_dir),
            cors_origins,
            monthly_plan_full_year,
        })
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn monthly_plan_range(&self) -> MonthlyPlanRange {
        if self.monthly_plan_full_year {
            MonthlyPlanRange::FullYear
        } else {
            MonthlyPlanRange::UpperBoundOnly
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
