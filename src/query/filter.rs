//! # Filter Expression AST
//!
//! Typed filter conditions `(field, operator, value)` combined with AND.
//! A condition set renders to the engine's native document syntax
//! (`{"price": {"$gte": 100}}`) and can be evaluated against documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::store::value::{compare_values, get_path, values_equal};

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Equals
    #[serde(rename = "eq")]
    Eq,

    /// Greater than
    #[serde(rename = "gt")]
    Gt,

    /// Greater than or equal
    #[serde(rename = "gte")]
    Gte,

    /// Less than
    #[serde(rename = "lt")]
    Lt,

    /// Less than or equal
    #[serde(rename = "lte")]
    Lte,

    /// Value in list
    #[serde(rename = "in")]
    In,
}

impl FilterOperator {
    /// Get the operator string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::In => "in",
        }
    }

    /// Operator name in native document syntax
    pub fn native(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "$eq",
            FilterOperator::Gt => "$gt",
            FilterOperator::Gte => "$gte",
            FilterOperator::Lt => "$lt",
            FilterOperator::Lte => "$lte",
            FilterOperator::In => "$in",
        }
    }

    /// Comparison operator for a bracketed query-string key (`price[gte]`).
    pub fn from_comparison(keyword: &str) -> Option<Self> {
        match keyword {
            "gt" => Some(FilterOperator::Gt),
            "gte" => Some(FilterOperator::Gte),
            "lt" => Some(FilterOperator::Lt),
            "lte" => Some(FilterOperator::Lte),
            _ => None,
        }
    }
}

/// A filter expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterExpr {
    /// Field to filter on (dotted paths reach into sub-documents)
    pub field: String,

    /// Comparison operator
    pub operator: FilterOperator,

    /// Value to compare against
    pub value: Value,
}

impl FilterExpr {
    /// Create a new filter expression
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Create an equality filter
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    pub fn gt(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, FilterOperator::Lte, value)
    }

    /// Create an "in list" filter
    pub fn in_list(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, FilterOperator::In, Value::Array(values))
    }

    /// Check if a document matches this filter.
    ///
    /// An array field matches when the array itself or any element does.
    /// Missing fields never match.
    pub fn matches(&self, doc: &Value) -> bool {
        match get_path(doc, &self.field) {
            None => false,
            Some(whole @ Value::Array(items)) => {
                self.test(whole) || items.iter().any(|item| self.test(item))
            }
            Some(field_value) => self.test(field_value),
        }
    }

    fn test(&self, field_value: &Value) -> bool {
        match self.operator {
            FilterOperator::Eq => values_equal(field_value, &self.value),
            FilterOperator::In => self
                .value
                .as_array()
                .is_some_and(|candidates| candidates.iter().any(|c| values_equal(field_value, c))),
            op => {
                if !comparable(field_value, &self.value) {
                    return false;
                }
                let ord = compare_values(Some(field_value), Some(&self.value));
                match op {
                    FilterOperator::Gt => ord.is_gt(),
                    FilterOperator::Gte => ord.is_ge(),
                    FilterOperator::Lt => ord.is_lt(),
                    FilterOperator::Lte => ord.is_le(),
                    FilterOperator::Eq | FilterOperator::In => false,
                }
            }
        }
    }
}

/// Range comparisons only apply between values of the same type.
fn comparable(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
            | (Value::Bool(_), Value::Bool(_))
    )
}

/// A set of filters combined with AND logic
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    pub filters: Vec<FilterExpr>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, filter: FilterExpr) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Conditions on `field`
    pub fn conditions_on<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FilterExpr> {
        self.filters.iter().filter(move |f| f.field == field)
    }

    /// Check if a document matches all filters
    pub fn matches(&self, doc: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Renders the set in native document syntax.
    ///
    /// A field with a single equality renders as `{field: value}`; anything
    /// else renders as an operator object `{field: {"$gte": .., "$lt": ..}}`.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        for filter in &self.filters {
            let only_equality = filter.operator == FilterOperator::Eq
                && self.conditions_on(&filter.field).count() == 1;
            if only_equality {
                doc.insert(filter.field.clone(), filter.value.clone());
                continue;
            }
            let entry = doc
                .entry(filter.field.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(ops) = entry {
                ops.insert(filter.operator.native().to_string(), filter.value.clone());
            }
        }
        Value::Object(doc)
    }
}
