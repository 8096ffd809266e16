//! Database handle
//!
//! A database is addressed by URL:
//! - `memory://` keeps every collection in memory only
//! - `file://<dir>` persists each collection to `<dir>/<collection>.json`

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::info;

use super::collection::Collection;
use super::errors::{StoreError, StoreResult};
use super::snapshot::SnapshotFile;

/// Parsed database location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    Memory,
    File(PathBuf),
}

impl FromStr for DatabaseUrl {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "memory://" || s == "memory" {
            return Ok(DatabaseUrl::Memory);
        }
        match s.strip_prefix("file://") {
            Some(path) if !path.is_empty() => Ok(DatabaseUrl::File(PathBuf::from(path))),
            _ => Err(StoreError::UnsupportedUrl(s.to_string())),
        }
    }
}

impl fmt::Display for DatabaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseUrl::Memory => write!(f, "memory://"),
            DatabaseUrl::File(path) => write!(f, "file://{}", path.display()),
        }
    }
}

/// Entry point to the document store
#[derive(Debug, Clone)]
pub struct Database {
    url: DatabaseUrl,
}

impl Database {
    /// Connects to the database at `url`.
    pub fn connect(url: &str) -> StoreResult<Self> {
        let url: DatabaseUrl = url.parse()?;
        info!(database = %url, "database connection successful");
        Ok(Self { url })
    }

    pub fn url(&self) -> &DatabaseUrl {
        &self.url
    }

    /// Opens the collection `name` with unique indexes on `unique_fields`.
    pub fn collection(&self, name: &str, unique_fields: &[&str]) -> StoreResult<Collection> {
        match &self.url {
            DatabaseUrl::Memory => Ok(Collection::in_memory(name, unique_fields)),
            DatabaseUrl::File(dir) => {
                Collection::open(name, unique_fields, SnapshotFile::new(dir, name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_urls() {
        assert_eq!("memory://".parse::<DatabaseUrl>().unwrap(), DatabaseUrl::Memory);
        assert_eq!(
            "file:///var/lib/natours".parse::<DatabaseUrl>().unwrap(),
            DatabaseUrl::File(PathBuf::from("/var/lib/natours"))
        );
        assert!("mongodb://0.0.0.0:27017/natours"
            .parse::<DatabaseUrl>()
            .is_err());
        assert!("file://".parse::<DatabaseUrl>().is_err());
    }

    #[test]
    fn test_file_database_persists_collections() {
        let tmp = TempDir::new().unwrap();
        let url = format!("file://{}", tmp.path().display());

        let db = Database::connect(&url).unwrap();
        let tours = db.collection("tours", &["name"]).unwrap();
        tours.insert(json!({"name": "The Wine Taster"})).unwrap();

        let reopened = Database::connect(&url)
            .unwrap()
            .collection("tours", &["name"])
            .unwrap();
        assert_eq!(reopened.len().unwrap(), 1);
        assert!(tmp.path().join("tours.json").exists());
    }
}
