//! # Tours
//!
//! The tour catalog operations the HTTP handlers and the CLI call.

pub mod errors;
pub mod service;

pub use errors::{TourError, TourResult};
pub use service::TourService;
