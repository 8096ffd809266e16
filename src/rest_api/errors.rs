//! # REST API Errors
//!
//! Every failure a handler can hit ends up as an [`ApiError`] and is
//! rendered as a `{status, message}` envelope. 4xx errors are `fail`,
//! 5xx errors are `error`.
//!
//! The rendered body is always safe to show in production: internal errors
//! carry a generic message. The full report (kind, detail, source chain)
//! travels in a response extension and is rendered by
//! [`super::middleware::render_errors`] in development.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::model::ValidationError;
use crate::query::QueryError;
use crate::store::StoreError;
use crate::tours::TourError;

/// Result type for REST operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Message shown in production for internal errors
pub const GENERIC_ERROR_MESSAGE: &str = "Something went very wrong!";

/// REST API errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Schema constraint violated
    #[error("{0}")]
    Validation(ValidationError),

    /// Malformed identifier or parameter
    #[error("{0}")]
    Cast(String),

    /// Unique index rejected the write
    #[error("Duplicate field value: {value}. Please use another value!")]
    DuplicateKey { field: String, value: String },

    /// Invalid query parameter
    #[error("{0}")]
    InvalidQuery(String),

    /// Invalid request body
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Resource or route not found
    #[error("{0}")]
    NotFound(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Storage or engine failure
    #[error("{message}")]
    Internal { message: String, chain: Vec<String> },
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Cast(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateKey { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,

            // 404 Not Found
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `fail` for client errors, `error` for server errors
    pub fn status_label(&self) -> &'static str {
        if self.status_code().is_server_error() {
            "error"
        } else {
            "fail"
        }
    }

    /// Error class name shown in development reports
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "ValidationError",
            ApiError::Cast(_) => "CastError",
            ApiError::DuplicateKey { .. } => "DuplicateKeyError",
            ApiError::InvalidQuery(_) => "InvalidQueryError",
            ApiError::InvalidBody(_) => "InvalidBodyError",
            ApiError::NotFound(_) => "NotFoundError",
            ApiError::Internal { .. } => "InternalError",
        }
    }

    /// Errors the client caused, as opposed to failures of the service
    pub fn is_operational(&self) -> bool {
        !self.status_code().is_server_error()
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn internal(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        ApiError::Internal {
            message: err.to_string(),
            chain,
        }
    }

    /// Full report of the error
    pub fn report(&self) -> ErrorReport {
        let detail = match self {
            ApiError::Validation(v) => json!({ "errors": v.errors }),
            ApiError::DuplicateKey { field, value } => json!({ "keyValue": { field: value } }),
            _ => Value::Null,
        };
        let mut stack = vec![format!("{}: {}", self.kind(), self)];
        if let ApiError::Internal { chain, .. } = self {
            stack.extend(chain.iter().map(|c| format!("caused by: {}", c)));
        }
        ErrorReport {
            status: self.status_label(),
            status_code: self.status_code().as_u16(),
            kind: self.kind(),
            message: self.to_string(),
            detail,
            stack,
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<String>>,
}

/// Everything known about a failed request
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: &'static str,
    pub status_code: u16,
    pub kind: &'static str,
    pub message: String,
    pub detail: Value,
    pub stack: Vec<String>,
}

impl ErrorReport {
    /// Body shown in production: internal errors get a generic message.
    pub fn production_body(&self) -> ErrorBody {
        let message = if self.status_code >= 500 {
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            self.message.clone()
        };
        ErrorBody {
            status: self.status,
            message,
            error: None,
            stack: None,
        }
    }

    /// Body shown in development: the message plus the whole report.
    pub fn development_body(&self) -> ErrorBody {
        let mut error = json!({
            "name": self.kind,
            "statusCode": self.status_code,
            "status": self.status,
        });
        if let (Value::Object(fields), Value::Object(detail)) = (&mut error, &self.detail) {
            fields.extend(detail.clone());
        }
        ErrorBody {
            status: self.status,
            message: self.message.clone(),
            error: Some(error),
            stack: Some(self.stack.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if !self.is_operational() {
            error!(kind = self.kind(), error = %self, "request failed");
        }
        let report = self.report();
        let mut response = (status, Json(report.production_body())).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidQuery(_) => ApiError::InvalidQuery(err.to_string()),
            QueryError::Cast { .. } => ApiError::Cast(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidId(_) => ApiError::Cast(err.to_string()),
            StoreError::DuplicateKey { field, value } => ApiError::DuplicateKey { field, value },
            StoreError::NotAnObject => ApiError::InvalidBody(err.to_string()),
            other => ApiError::internal(&other),
        }
    }
}

impl From<TourError> for ApiError {
    fn from(err: TourError) -> Self {
        match err {
            TourError::NotFound(_) | TourError::PageNotFound => ApiError::NotFound(err.to_string()),
            TourError::InvalidYear(_) => ApiError::Cast(err.to_string()),
            TourError::Validation(e) => e.into(),
            TourError::Query(e) => e.into(),
            TourError::Store(e) => e.into(),
        }
    }
}
