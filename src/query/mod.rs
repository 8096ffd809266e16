//! # Query Module
//!
//! Translates the URL query string of a list request into a structured
//! read query: a typed filter, a multi-key sort, a field projection and
//! pagination.
//!
//! The translation is pure. Nothing here touches a collection; the
//! [`ComposedQuery`] produced by [`QueryBuilder`] is executed by
//! [`crate::store::Collection::find`].

pub mod builder;
pub mod cast;
pub mod errors;
pub mod filter;
pub mod params;
pub mod projection;
pub mod sort;

pub use builder::{
    ComposedQuery, QueryBuilder, DEFAULT_LIMIT, DEFAULT_PAGE, DEFAULT_SORT, RESERVED_KEYS,
};
pub use cast::{FieldKind, FieldTypes};
pub use errors::{QueryError, QueryResult};
pub use filter::{FilterExpr, FilterOperator, FilterSet};
pub use params::{QueryString, QueryValue};
pub use projection::Projection;
pub use sort::{parse_sort, sort_documents, SortDirection, SortKey};
