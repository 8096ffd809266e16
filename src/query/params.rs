//! # Query-String Mapping
//!
//! Parses the raw text after `?` into a mapping of keys to values:
//!
//! - `difficulty=easy` → `Single("easy")`
//! - `difficulty=easy&difficulty=medium` → `Many(["easy", "medium"])`
//! - `price[gte]=100&price[lt]=500` → `Nested({"gte": "100", "lt": "500"})`
//! - `difficulty[]=easy` → `Many(["easy"])`

use std::borrow::Cow;
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::errors::{QueryError, QueryResult};

static BRACKET_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\[\]]+)\[([^\[\]]*)\]$").expect("static regex"));

/// Value bound to one key of the query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    Many(Vec<String>),
    Nested(BTreeMap<String, String>),
}

impl QueryValue {
    /// Scalar view of the value. Repeated values are joined with `,`;
    /// nested values have no scalar form.
    pub fn as_scalar(&self) -> Option<Cow<'_, str>> {
        match self {
            QueryValue::Single(s) => Some(Cow::Borrowed(s)),
            QueryValue::Many(values) => Some(Cow::Owned(values.join(","))),
            QueryValue::Nested(_) => None,
        }
    }
}

/// Parsed query-string mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    entries: BTreeMap<String, QueryValue>,
}

impl QueryString {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw, percent-encoded query string.
    pub fn parse(raw: &str) -> QueryResult<Self> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw)
            .map_err(|e| QueryError::InvalidQuery(e.to_string()))?;
        Self::from_pairs(pairs)
    }

    /// Builds the mapping from already-decoded pairs, in order.
    pub fn from_pairs<I, K, V>(pairs: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = Self::new();
        for (key, value) in pairs {
            query.push(key.as_ref(), value.into())?;
        }
        Ok(query)
    }

    fn push(&mut self, key: &str, value: String) -> QueryResult<()> {
        if let Some(caps) = BRACKET_KEY.captures(key) {
            let field = caps[1].to_string();
            let op = caps[2].to_string();
            if op.is_empty() {
                return self.push_plain(field, value);
            }
            return match self.entries.get_mut(&field) {
                None => {
                    self.entries
                        .insert(field, QueryValue::Nested(BTreeMap::from([(op, value)])));
                    Ok(())
                }
                Some(QueryValue::Nested(ops)) => {
                    ops.insert(op, value);
                    Ok(())
                }
                Some(_) => Err(conflict(&field)),
            };
        }

        if key.contains('[') || key.contains(']') {
            return Err(QueryError::InvalidQuery(format!("malformed key '{}'", key)));
        }
        self.push_plain(key.to_string(), value)
    }

    fn push_plain(&mut self, field: String, value: String) -> QueryResult<()> {
        match self.entries.remove(&field) {
            None => {
                self.entries.insert(field, QueryValue::Single(value));
            }
            Some(QueryValue::Single(first)) => {
                self.entries.insert(field, QueryValue::Many(vec![first, value]));
            }
            Some(QueryValue::Many(mut values)) => {
                values.push(value);
                self.entries.insert(field, QueryValue::Many(values));
            }
            Some(nested @ QueryValue::Nested(_)) => {
                let err = conflict(&field);
                self.entries.insert(field, nested);
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.get(key)
    }

    /// Scalar value for `key`, if present and not nested.
    pub fn scalar(&self, key: &str) -> Option<Cow<'_, str>> {
        self.entries.get(key).and_then(QueryValue::as_scalar)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns a copy with `key` forced to a single value.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.entries
            .insert(key.to_string(), QueryValue::Single(value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &QueryValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn conflict(field: &str) -> QueryError {
    QueryError::InvalidQuery(format!(
        "'{}' mixes plain and operator conditions",
        field
    ))
}
