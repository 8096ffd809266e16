//! # Tour Model
//!
//! The shape of a tour record, its field-level constraints and the type
//! information the query builder uses to cast filter values.

pub mod schema;
pub mod tour;
pub mod validation;

pub use schema::{TourSchema, HIDDEN_FIELDS, TOURS_COLLECTION, TOUR_SCHEMA, UNIQUE_FIELDS};
pub use tour::{with_duration_weeks, Difficulty, Tour};
pub use validation::{validate_new, validate_update, FieldError, ValidationError};
