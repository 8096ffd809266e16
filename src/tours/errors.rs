//! Tour service errors

use thiserror::Error;

use crate::model::ValidationError;
use crate::query::QueryError;
use crate::store::StoreError;

/// Result type for tour operations
pub type TourResult<T> = Result<T, TourError>;

#[derive(Debug, Error)]
pub enum TourError {
    /// No tour has the given id
    #[error("No tour exists with that {0} id")]
    NotFound(String),

    /// An explicitly requested page starts past the last match
    #[error("This page does not exist")]
    PageNotFound,

    /// Monthly plan year is not a usable year
    #[error("Invalid year: {0}")]
    InvalidYear(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
