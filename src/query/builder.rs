//! # Query Builder
//!
//! Turns a query-string mapping into a composed read query. The steps run
//! in a fixed order and each consumes the builder and returns a new one:
//!
//! ```ignore
//! let query = QueryBuilder::new(&query_string)
//!     .with_schema(&TOUR_SCHEMA)
//!     .filter()?
//!     .sort()
//!     .limit_fields()?
//!     .paginate()
//!     .build();
//! ```
//!
//! The builder never executes anything; the composed query can be inspected
//! (or rendered with [`ComposedQuery::to_document`]) before a collection
//! runs it.

use std::fmt;

use serde_json::{json, Value};

use super::cast::{cast_for, FieldTypes};
use super::errors::QueryResult;
use super::filter::{FilterExpr, FilterOperator, FilterSet};
use super::params::{QueryString, QueryValue};
use super::projection::Projection;
use super::sort::{parse_sort, sort_document, SortKey};
use crate::store::VERSION_FIELD;

/// Keys that control the query instead of filtering it
pub const RESERVED_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Page used when none (or garbage) is given
pub const DEFAULT_PAGE: usize = 1;

/// Page size used when none (or garbage) is given
pub const DEFAULT_LIMIT: usize = 100;

/// Sort applied when the query string has no `sort`
pub const DEFAULT_SORT: &str = "-createdAt";

/// A fully composed, not yet executed, read query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposedQuery {
    pub filter: FilterSet,
    pub sort: Vec<SortKey>,
    pub projection: Projection,
    pub skip: usize,
    pub limit: Option<usize>,
    /// Whether the caller asked for a specific page
    pub page_requested: bool,
}

impl ComposedQuery {
    /// True when an explicitly requested page starts past the last match.
    pub fn page_out_of_range(&self, total_matches: usize) -> bool {
        self.page_requested && self.skip >= total_matches
    }

    /// Renders the query in native syntax.
    pub fn to_document(&self) -> Value {
        json!({
            "filter": self.filter.to_document(),
            "sort": sort_document(&self.sort),
            "projection": self.projection.to_document(),
            "skip": self.skip,
            "limit": self.limit,
        })
    }
}

/// Builds a [`ComposedQuery`] from a query-string mapping
#[derive(Clone)]
pub struct QueryBuilder {
    query_string: QueryString,
    schema: Option<&'static dyn FieldTypes>,
    composed: ComposedQuery,
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("query_string", &self.query_string)
            .field("typed", &self.schema.is_some())
            .field("composed", &self.composed)
            .finish()
    }
}

impl QueryBuilder {
    /// Starts a builder over a copy of `query_string`.
    pub fn new(query_string: &QueryString) -> Self {
        Self {
            query_string: query_string.clone(),
            schema: None,
            composed: ComposedQuery::default(),
        }
    }

    /// Casts filter values to the field types declared by `schema`.
    pub fn with_schema(self, schema: &'static dyn FieldTypes) -> Self {
        Self {
            schema: Some(schema),
            ..self
        }
    }

    /// Turns every non-reserved key into a filter condition.
    ///
    /// `price[gte]=100` becomes `price >= 100`, `difficulty=easy` becomes an
    /// equality, a repeated key becomes an "in" condition. A bracketed key
    /// that is not a comparison (`location[address]=Miami`) is an equality
    /// on the dotted path `location.address`.
    pub fn filter(self) -> QueryResult<Self> {
        let schema = self.schema;
        let mut filter = FilterSet::new();

        for (field, value) in self.query_string.iter() {
            if RESERVED_KEYS.contains(&field.as_str()) {
                continue;
            }
            match value {
                QueryValue::Single(raw) => {
                    filter = filter.and(FilterExpr::eq(field, cast_for(schema, field, raw)?));
                }
                QueryValue::Many(raws) => {
                    let values = raws
                        .iter()
                        .map(|raw| cast_for(schema, field, raw))
                        .collect::<QueryResult<Vec<_>>>()?;
                    filter = filter.and(FilterExpr::in_list(field, values));
                }
                QueryValue::Nested(ops) => {
                    for (keyword, raw) in ops {
                        let expr = match FilterOperator::from_comparison(keyword) {
                            Some(op) => FilterExpr::new(field, op, cast_for(schema, field, raw)?),
                            None => {
                                let path = format!("{}.{}", field, keyword);
                                let value = cast_for(schema, &path, raw)?;
                                FilterExpr::eq(path, value)
                            }
                        };
                        filter = filter.and(expr);
                    }
                }
            }
        }

        Ok(self.map(|q| ComposedQuery { filter, ..q }))
    }

    /// Applies `sort`, or newest-first when absent.
    pub fn sort(self) -> Self {
        let mut keys = self
            .query_string
            .scalar("sort")
            .map(|s| parse_sort(&s))
            .unwrap_or_default();
        if keys.is_empty() {
            keys = parse_sort(DEFAULT_SORT);
        }
        self.map(|q| ComposedQuery { sort: keys, ..q })
    }

    /// Applies `fields`, or hides the version marker when absent.
    ///
    /// Fields the schema marks hidden stay hidden unless listed explicitly.
    pub fn limit_fields(self) -> QueryResult<Self> {
        let requested = self
            .query_string
            .scalar("fields")
            .filter(|s| !s.trim().is_empty())
            .map(|s| Projection::parse(&s))
            .transpose()?;

        let hidden: Vec<String> = self
            .schema
            .map(|s| s.hidden_fields().iter().map(|f| f.to_string()).collect())
            .unwrap_or_default();

        let projection = match requested {
            Some(Projection::Include { fields, with_id }) => {
                Projection::Include { fields, with_id }
            }
            Some(Projection::Exclude(mut fields)) => {
                extend_unique(&mut fields, hidden);
                Projection::Exclude(fields)
            }
            Some(Projection::All) | None => {
                let mut fields = vec![VERSION_FIELD.to_string()];
                extend_unique(&mut fields, hidden);
                Projection::Exclude(fields)
            }
        };

        Ok(self.map(|q| ComposedQuery { projection, ..q }))
    }

    /// Applies `page` and `limit`.
    ///
    /// Non-numeric or non-positive values fall back to the defaults.
    pub fn paginate(self) -> Self {
        let page = positive_or(self.query_string.scalar("page").as_deref(), DEFAULT_PAGE);
        let limit = positive_or(self.query_string.scalar("limit").as_deref(), DEFAULT_LIMIT);
        let skip = (page - 1).saturating_mul(limit);
        let page_requested = self
            .query_string
            .scalar("page")
            .is_some_and(|p| !p.is_empty());

        self.map(|q| ComposedQuery {
            skip,
            limit: Some(limit),
            page_requested,
            ..q
        })
    }

    /// The query composed so far.
    pub fn query(&self) -> &ComposedQuery {
        &self.composed
    }

    pub fn build(self) -> ComposedQuery {
        self.composed
    }

    /// Runs every step in order.
    pub fn compose(
        query_string: &QueryString,
        schema: Option<&'static dyn FieldTypes>,
    ) -> QueryResult<ComposedQuery> {
        let builder = QueryBuilder::new(query_string);
        let builder = match schema {
            Some(schema) => builder.with_schema(schema),
            None => builder,
        };
        Ok(builder.filter()?.sort().limit_fields()?.paginate().build())
    }

    fn map(self, step: impl FnOnce(ComposedQuery) -> ComposedQuery) -> Self {
        Self {
            composed: step(self.composed),
            ..self
        }
    }
}

fn positive_or(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

fn extend_unique(fields: &mut Vec<String>, extra: Vec<String>) {
    for field in extra {
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::cast::FieldKind;
    use crate::query::sort::SortDirection;
    use serde_json::json;

    struct PriceSchema;

    impl FieldTypes for PriceSchema {
        fn kind_of(&self, path: &str) -> Option<FieldKind> {
            match path {
                "price" | "duration" => Some(FieldKind::Number),
                "name" | "difficulty" => Some(FieldKind::String),
                "createdAt" => Some(FieldKind::Date),
                _ => None,
            }
        }

        fn hidden_fields(&self) -> &[&'static str] {
            &["createdAt"]
        }
    }

    static PRICE_SCHEMA: PriceSchema = PriceSchema;

    fn compose(raw: &str) -> ComposedQuery {
        QueryBuilder::compose(&QueryString::parse(raw).unwrap(), None).unwrap()
    }

    #[test]
    fn test_reserved_keys_never_filter() {
        let query = compose("page=2&sort=price&limit=10&fields=name&difficulty=easy");
        assert_eq!(query.filter.filters.len(), 1);
        assert_eq!(query.filter.filters[0].field, "difficulty");
        for key in RESERVED_KEYS {
            assert_eq!(query.filter.conditions_on(key).count(), 0);
        }
    }

    #[test]
    fn test_comparison_operators() {
        let query = compose("price[gte]=100&duration[lt]=10&difficulty=easy");
        assert_eq!(
            query.filter.to_document(),
            json!({
                "difficulty": "easy",
                "duration": {"$lt": 10},
                "price": {"$gte": 100}
            })
        );
    }

    #[test]
    fn test_operator_words_as_field_names_are_plain_fields() {
        let query = compose("gte=5");
        assert_eq!(query.filter.filters, vec![FilterExpr::eq("gte", json!(5))]);
    }

    #[test]
    fn test_unknown_bracket_key_is_nested_equality() {
        let query = compose("location[address]=Miami");
        assert_eq!(
            query.filter.filters,
            vec![FilterExpr::eq("location.address", json!("Miami"))]
        );
    }

    #[test]
    fn test_repeated_key_is_in_condition() {
        let query = compose("difficulty=easy&difficulty=medium");
        assert_eq!(
            query.filter.filters,
            vec![FilterExpr::in_list(
                "difficulty",
                vec![json!("easy"), json!("medium")]
            )]
        );
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let query = compose("");
        assert_eq!(query.sort, vec![SortKey::descending("createdAt")]);
    }

    #[test]
    fn test_multi_key_sort() {
        let query = compose("sort=-price,name");
        assert_eq!(query.sort[0].direction, SortDirection::Desc);
        assert_eq!(query.sort[1], SortKey::ascending("name"));
    }

    #[test]
    fn test_default_projection_hides_version() {
        let query = compose("");
        assert_eq!(query.projection, Projection::exclude(["__v"]));
    }

    #[test]
    fn test_schema_hidden_fields() {
        let qs = QueryString::parse("").unwrap();
        let query = QueryBuilder::compose(&qs, Some(&PRICE_SCHEMA)).unwrap();
        assert_eq!(query.projection, Projection::exclude(["__v", "createdAt"]));

        let qs = QueryString::parse("fields=name,createdAt").unwrap();
        let query = QueryBuilder::compose(&qs, Some(&PRICE_SCHEMA)).unwrap();
        assert_eq!(query.projection, Projection::include(["name", "createdAt"]));
    }

    #[test]
    fn test_pagination() {
        let query = compose("page=2&limit=10");
        assert_eq!(query.skip, 10);
        assert_eq!(query.limit, Some(10));
        assert!(query.page_requested);
        assert!(query.page_out_of_range(10));
        assert!(!query.page_out_of_range(11));
    }

    #[test]
    fn test_pagination_falls_back_on_garbage() {
        let query = compose("page=abc&limit=-3");
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, Some(DEFAULT_LIMIT));
        assert!(query.page_requested);

        let query = compose("");
        assert!(!query.page_requested);
        assert!(!query.page_out_of_range(0));
    }

    #[test]
    fn test_schema_casts_values() {
        let qs = QueryString::parse("name=12345&price[lte]=500").unwrap();
        let query = QueryBuilder::compose(&qs, Some(&PRICE_SCHEMA)).unwrap();
        assert_eq!(
            query.filter.to_document(),
            json!({"name": "12345", "price": {"$lte": 500}})
        );

        let qs = QueryString::parse("price=cheap").unwrap();
        assert!(QueryBuilder::compose(&qs, Some(&PRICE_SCHEMA)).is_err());
    }

    #[test]
    fn test_builder_does_not_touch_input() {
        let qs = QueryString::parse("price[gte]=100&page=3").unwrap();
        let before = qs.clone();
        let _ = QueryBuilder::new(&qs).filter().unwrap().paginate().build();
        assert_eq!(qs, before);
    }

    #[test]
    fn test_steps_are_inspectable() {
        let qs = QueryString::parse("sort=price").unwrap();
        let builder = QueryBuilder::new(&qs).filter().unwrap();
        assert!(builder.query().sort.is_empty());
        let builder = builder.sort();
        assert_eq!(builder.query().sort, vec![SortKey::ascending("price")]);
    }
}
