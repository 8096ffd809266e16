//! # Aggregation Module
//!
//! Typed aggregation pipelines and the fixed tour reports built on them.
//! Pipelines bypass the query builder and run directly on a collection via
//! [`crate::store::Collection::aggregate`].

pub mod pipeline;
pub mod reports;

pub use pipeline::{Accumulator, Expr, GroupKey, Pipeline, Stage};
pub use reports::{monthly_plan, tour_stats, MonthlyPlanRange, TOP_RATED_THRESHOLD};
