//! # Observability
//!
//! Process-wide `tracing` setup. Request logging itself is done by
//! `tower_http::trace::TraceLayer` in the HTTP server.

pub mod logger;

pub use logger::{init, LogFormat, DEFAULT_FILTER};
