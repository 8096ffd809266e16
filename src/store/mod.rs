//! # Document Store
//!
//! Embedded JSON document store that executes composed queries and
//! aggregation pipelines. Collections live in memory and can be persisted
//! to checksummed snapshot files.

pub mod checksum;
pub mod collection;
pub mod database;
pub mod errors;
pub mod snapshot;
pub mod value;

pub use collection::{check_id, Collection, ID_FIELD, VERSION_FIELD};
pub use database::{Database, DatabaseUrl};
pub use errors::{StoreError, StoreResult};
pub use snapshot::SnapshotFile;
