//! # REST API
//!
//! HTTP surface of the tours service: routing, extractors, the success
//! envelope and environment-aware error rendering.

pub mod errors;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod server;

pub use errors::{ApiError, ApiResult, ErrorBody, ErrorReport, GENERIC_ERROR_MESSAGE};
pub use extract::{ApiJson, ApiQuery};
pub use handlers::alias_top_tours;
pub use response::Envelope;
pub use server::{build_router, AppState, RestServer, API_PREFIX};
